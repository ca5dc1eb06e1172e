use crate::{
    error::{AppError, Result},
    models::notification::*,
    routes::paginated,
    services::auth::User,
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{delete, get, patch},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(list_notifications)
                .patch(mark_as_read)
                .delete(delete_notifications),
        )
        .route("/unread-count", get(unread_count))
        .route("/:id/read", patch(mark_one_as_read))
        .route("/:id", delete(delete_one))
}

/// 获取通知列表
/// GET /api/blog/notifications
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    user: User,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Value>> {
    debug!("Getting notifications for user: {}", user.id);

    let result = state
        .notification_service
        .list_notifications(&user.id, &query, state.get_page_size("notifications"))
        .await?;

    Ok(Json(paginated("notifications", result)))
}

/// GET /api/blog/notifications/unread-count
async fn unread_count(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Value>> {
    let count = state.notification_service.unread_count(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "unread_count": count }
    })))
}

/// 批量标记已读
/// PATCH /api/blog/notifications
async fn mark_as_read(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<MarkReadRequest>,
) -> Result<Json<Value>> {
    let selection = request
        .selection()
        .ok_or_else(|| AppError::bad_request("Provide notificationIds or markAll"))?;

    let updated = state
        .notification_service
        .mark_as_read(&user.id, &selection)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": { "updated": updated }
    })))
}

/// PATCH /api/blog/notifications/:id/read
async fn mark_one_as_read(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let updated = state
        .notification_service
        .mark_as_read(&user.id, &NotificationSelection::Single(id))
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": { "updated": updated }
    })))
}

/// 批量删除
/// DELETE /api/blog/notifications
async fn delete_notifications(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<DeleteNotificationsRequest>,
) -> Result<Json<Value>> {
    let selection = request
        .selection()
        .ok_or_else(|| AppError::bad_request("Provide notificationIds or deleteAllRead"))?;

    let deleted = state
        .notification_service
        .delete_notifications(&user.id, &selection)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": { "deleted": deleted }
    })))
}

/// DELETE /api/blog/notifications/:id
async fn delete_one(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let deleted = state
        .notification_service
        .delete_notifications(&user.id, &NotificationSelection::Single(id))
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": { "deleted": deleted }
    })))
}
