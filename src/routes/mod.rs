pub mod achievements;
pub mod analytics;
pub mod articles;
pub mod bookmarks;
pub mod comments;
pub mod follows;
pub mod notifications;
pub mod revisions;
pub mod search;
pub mod users;

use crate::{services::database::PaginatedResult, state::AppState, utils::middleware::request_logging_middleware};
use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// 构建应用路由，统一使用 /api/blog/ 前缀
pub fn create_app(state: Arc<AppState>) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_origin(origins);

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .nest("/api/blog/articles", articles::router())
        .nest("/api/blog/comments", comments::router())
        .nest("/api/blog/bookmarks", bookmarks::router())
        .nest("/api/blog/follows", follows::router())
        .nest("/api/blog/notifications", notifications::router())
        .nest("/api/blog/achievements", achievements::router())
        .nest("/api/blog/analytics", analytics::router())
        .nest("/api/blog/search", search::router())
        .nest("/api/blog/users", users::router())
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "WordFlow is running!"
}

/// 分页列表的统一响应结构
pub(crate) fn paginated<T: Serialize>(key: &str, result: PaginatedResult<T>) -> Value {
    json!({
        "success": true,
        "data": {
            key: result.data,
            "pagination": {
                "current_page": result.page,
                "total_pages": result.total_pages,
                "total_items": result.total,
                "items_per_page": result.per_page,
                "has_next": result.page < result.total_pages,
                "has_prev": result.page > 1,
            }
        }
    })
}
