// src/routes.rs

use axum::{
    Json, Router,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, blog, contact, health, interaction},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found" })),
    )
}

/// Assembles the main application router.
///
/// * Public and protected routes of one resource are separate routers merged
///   together; protected ones carry `auth_middleware` as a route layer.
/// * `/blogs/my` and `/blogs/stats` are static segments and win over `/blogs/{id}`.
/// * Applies global middleware (Trace, CORS) and a JSON 404 fallback.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let authenticated = || middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/profile", get(auth::get_profile).put(auth::update_profile))
                .route_layer(authenticated()),
        )
        .merge(
            Router::new()
                .route("/users", get(admin::list_users))
                .route("/users/{id}/status", patch(admin::toggle_user_status))
                .route("/users/{id}/role", patch(admin::change_user_role))
                // Auth runs first (outer), then the admin check
                .route_layer(middleware::from_fn(admin_middleware))
                .route_layer(authenticated()),
        );

    let blog_routes = Router::new()
        .route("/", get(blog::list_blogs))
        .route("/{id}", get(blog::get_blog))
        .merge(
            Router::new()
                .route("/", post(blog::create_blog))
                .route("/my", get(blog::my_blogs))
                .route("/stats", get(blog::blog_stats))
                .route("/{id}", put(blog::update_blog).delete(blog::delete_blog))
                .route("/{id}/like", post(interaction::toggle_like))
                .route("/{id}/comments", post(interaction::add_comment))
                .route(
                    "/{blog_id}/comments/{comment_id}",
                    delete(interaction::delete_comment),
                )
                .route_layer(authenticated()),
        );

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/blogs", blog_routes)
        .route("/api/contact", post(contact::submit_contact))
        .route("/api/health", get(health::health_check))
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
