// src/handlers/interaction.rs

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    extract::{AppJson, AppPath},
    models::comment::CreateCommentRequest,
    state::AppState,
    utils::{access::can_delete_comment, jwt::CurrentUser},
};

/// Toggle Like on a blog. Any authenticated user may like any blog, their own included.
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(blog_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .blogs
        .toggle_like(blog_id, current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog not found".to_string()))?;

    let message = if outcome.liked { "Blog liked" } else { "Blog unliked" };

    Ok(Json(json!({
        "message": message,
        "liked": outcome.liked,
        "likesCount": outcome.likes_count,
    })))
}

/// Add a comment to a blog.
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(blog_id): AppPath<i64>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    let comment = state
        .blogs
        .add_comment(blog_id, current.id, &payload.content)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog not found".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Comment added successfully",
            "comment": comment,
        })),
    ))
}

/// Delete a comment. Allowed for its author, the blog owner and admins.
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath((blog_id, comment_id)): AppPath<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let ownership = state
        .blogs
        .comment_ownership(blog_id, comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog not found".to_string()))?;

    let author = ownership
        .comment_author
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    if !can_delete_comment(current.id, current.role, ownership.blog_owner, author) {
        return Err(AppError::Forbidden(
            "Not authorized to delete this comment".to_string(),
        ));
    }

    if !state.blogs.delete_comment(blog_id, comment_id).await? {
        return Err(AppError::NotFound("Comment not found".to_string()));
    }

    Ok(Json(json!({ "message": "Comment deleted successfully" })))
}
