use crate::{
    error::{AppError, Result},
    models::comment::*,
    services::auth::User,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/article/:article_id", get(list_comments).post(create_comment))
}

/// 获取文章的评论
/// GET /api/blog/comments/article/:article_id
async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(article_id): Path<String>,
) -> Result<Json<Value>> {
    debug!("Getting comments for article: {}", article_id);

    let comments = state.comment_service.list_comments(&article_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": comments
    })))
}

/// 创建评论或回复
/// POST /api/blog/comments/article/:article_id
async fn create_comment(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(article_id): Path<String>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    if !state.is_feature_enabled("comments") {
        return Err(AppError::forbidden("Comments are disabled"));
    }

    let comment = state
        .comment_service
        .create_comment(&article_id, &user.id, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": comment
        })),
    ))
}
