// src/handlers/blog.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    extract::{AppJson, AppPath},
    models::{
        blog::{BlogResponse, CreateBlogRequest, UpdateBlogRequest},
        user::Role,
    },
    query::{BlogFilters, BlogPagination, ListBlogsParams, MyBlogsParams},
    state::AppState,
    utils::{access::ensure_can_mutate, jwt::CurrentUser},
};

fn blog_not_found() -> AppError {
    AppError::NotFound("Blog not found".to_string())
}

/// Public listing with filter, search, sort and pagination.
/// `filters.availableTags` covers every blog regardless of the current filter.
pub async fn list_blogs(
    State(state): State<AppState>,
    Query(params): Query<ListBlogsParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = params.into_query()?;

    let (blogs, total) = state.blogs.list_blogs(&query).await?;
    let available_tags = state.blogs.distinct_tags().await?;

    let pagination = BlogPagination::new(&query.page, blogs.len(), total);
    let filters = BlogFilters {
        available_tags,
        current_tag: query.tag,
        current_search: query.search,
    };
    let blogs: Vec<BlogResponse> = blogs.into_iter().map(BlogResponse::from).collect();

    Ok(Json(json!({
        "blogs": blogs,
        "pagination": pagination,
        "filters": filters,
    })))
}

/// Fetches one blog. Every successful read counts as a view.
pub async fn get_blog(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let blog = state.blogs.record_view(id).await?.ok_or_else(blog_not_found)?;
    Ok(Json(BlogResponse::from(blog)))
}

pub async fn create_blog(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppJson(payload): AppJson<CreateBlogRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_blog = payload.into_new_blog()?;
    let blog = state.blogs.create_blog(current.id, new_blog).await?;

    tracing::info!(blog_id = blog.id, user_id = current.id, "Blog created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Blog created successfully",
            "blog": BlogResponse::from(blog),
        })),
    ))
}

/// Partial update by the owner or an admin.
pub async fn update_blog(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateBlogRequest>,
) -> Result<impl IntoResponse, AppError> {
    let owner = state.blogs.blog_owner(id).await?.ok_or_else(blog_not_found)?;
    ensure_can_mutate(current.id, current.role, owner, "update")?;

    let changes = payload.into_changes()?;
    let blog = if changes.is_empty() {
        state.blogs.find_blog(id).await?
    } else {
        state.blogs.update_blog(id, &changes).await?
    }
    .ok_or_else(blog_not_found)?;

    Ok(Json(json!({
        "message": "Blog updated successfully",
        "blog": BlogResponse::from(blog),
    })))
}

/// Deletes the blog together with its likes and comments.
pub async fn delete_blog(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let owner = state.blogs.blog_owner(id).await?.ok_or_else(blog_not_found)?;
    ensure_can_mutate(current.id, current.role, owner, "delete")?;

    if !state.blogs.delete_blog(id).await? {
        return Err(blog_not_found());
    }

    tracing::info!(blog_id = id, user_id = current.id, "Blog deleted");

    Ok(Json(json!({ "message": "Blog deleted successfully" })))
}

/// The caller's own blogs, newest first, any status unless filtered.
pub async fn my_blogs(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<MyBlogsParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = params.into_query(current.id)?;
    let (blogs, total) = state.blogs.list_blogs(&query).await?;

    let pagination = BlogPagination::new(&query.page, blogs.len(), total);
    let blogs: Vec<BlogResponse> = blogs.into_iter().map(BlogResponse::from).collect();

    Ok(Json(json!({
        "blogs": blogs,
        "pagination": pagination,
    })))
}

/// Dashboard totals: every blog for admins, own blogs for everyone else.
pub async fn blog_stats(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let scope = match current.role {
        Role::Admin => None,
        Role::User => Some(current.id),
    };

    let stats = state.blogs.stats(scope).await?;
    Ok(Json(stats))
}
