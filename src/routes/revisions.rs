use crate::{
    error::Result,
    models::revision::*,
    services::auth::User,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

/// 挂载在 /api/blog/articles 下
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:id/revisions", get(list_revisions).post(create_revision))
        .route("/:id/revisions/restore", post(restore_revision))
        .route("/:id/revisions/:revision_id", get(get_revision))
}

/// GET /api/blog/articles/:id/revisions
async fn list_revisions(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let revisions = state.revision_service.list_revisions(&id, &user).await?;

    Ok(Json(json!({
        "success": true,
        "data": revisions
    })))
}

/// GET /api/blog/articles/:id/revisions/:revision_id
async fn get_revision(
    State(state): State<Arc<AppState>>,
    user: User,
    Path((id, revision_id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let revision = state
        .revision_service
        .get_revision(&id, &revision_id, &user)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": revision
    })))
}

/// POST /api/blog/articles/:id/revisions
async fn create_revision(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(request): Json<CreateRevisionRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    request.validate()?;
    let (article, revision) = state
        .revision_service
        .create_revision(&id, &user, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": {
                "article": article,
                "revision": revision
            }
        })),
    ))
}

/// POST /api/blog/articles/:id/revisions/restore
async fn restore_revision(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(request): Json<RestoreRevisionRequest>,
) -> Result<Json<Value>> {
    let outcome = state
        .revision_service
        .restore(&id, &request.revision_id, &user)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": outcome
    })))
}
