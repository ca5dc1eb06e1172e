use crate::{
    error::{AppError, Result},
    models::user::UpdateProfileRequest,
    services::auth::User,
    state::AppState,
};
use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/me", get(get_my_profile).put(update_my_profile))
}

/// GET /api/blog/users/me
async fn get_my_profile(State(state): State<Arc<AppState>>, user: User) -> Result<Json<Value>> {
    let profile = state
        .user_service
        .get_profile(&user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(Json(json!({
        "success": true,
        "data": profile
    })))
}

/// 更新个人资料（名字与简介）
/// PUT /api/blog/users/me
async fn update_my_profile(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>> {
    let profile = state.user_service.update_profile(&user.id, request).await?;
    info!("User {} updated their profile", user.id);

    Ok(Json(json!({
        "success": true,
        "data": profile
    })))
}
