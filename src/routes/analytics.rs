use crate::{error::Result, services::auth::User, state::AppState};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/articles/:article_id", get(get_article_analytics))
        .route("/dashboard", get(get_my_dashboard))
        .route("/users/:user_id/dashboard", get(get_user_dashboard))
}

/// 文章分析
/// GET /api/blog/analytics/articles/:article_id
async fn get_article_analytics(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(article_id): Path<String>,
) -> Result<Json<Value>> {
    debug!("Getting analytics for article {} by {}", article_id, user.id);

    let report = state
        .analytics_service
        .get_article_analytics(&article_id, &user)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": report
    })))
}

/// 当前用户的仪表盘
/// GET /api/blog/analytics/dashboard
async fn get_my_dashboard(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Value>> {
    let dashboard = state.analytics_service.get_user_dashboard(&user.id, &user).await?;

    Ok(Json(json!({
        "success": true,
        "data": dashboard
    })))
}

/// GET /api/blog/analytics/users/:user_id/dashboard
async fn get_user_dashboard(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(user_id): Path<String>,
) -> Result<Json<Value>> {
    let dashboard = state.analytics_service.get_user_dashboard(&user_id, &user).await?;

    Ok(Json(json!({
        "success": true,
        "data": dashboard
    })))
}
