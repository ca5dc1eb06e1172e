use crate::{
    error::Result,
    models::achievement::*,
    services::auth::User,
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_achievements).post(create_achievement))
        .route("/check", post(check_achievements))
        .route("/:id", put(update_achievement).delete(delete_achievement))
}

/// 成就目录；带 userId 时返回该用户已获得的成就
/// GET /api/blog/achievements
async fn list_achievements(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AchievementQuery>,
) -> Result<Json<Value>> {
    let data = match query.user_id {
        Some(user_id) => {
            serde_json::to_value(state.achievement_service.get_user_achievements(&user_id).await?)?
        }
        None => serde_json::to_value(state.achievement_service.list_achievements().await?)?,
    };

    Ok(Json(json!({
        "success": true,
        "data": data
    })))
}

/// 评估当前用户的成就
/// POST /api/blog/achievements/check
async fn check_achievements(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Value>> {
    let awarded = state.achievement_service.evaluate(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "awarded": awarded }
    })))
}

/// POST /api/blog/achievements
async fn create_achievement(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<CreateAchievementRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let achievement = state.achievement_service.create_achievement(&user, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": achievement
        })),
    ))
}

/// PUT /api/blog/achievements/:id
async fn update_achievement(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(request): Json<UpdateAchievementRequest>,
) -> Result<Json<Value>> {
    let achievement = state
        .achievement_service
        .update_achievement(&user, &id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": achievement
    })))
}

/// DELETE /api/blog/achievements/:id
async fn delete_achievement(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    state.achievement_service.delete_achievement(&user, &id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Achievement deleted successfully"
    })))
}
