use crate::{
    error::Result,
    models::bookmark::*,
    services::auth::User,
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(list_bookmarks)
                .post(add_bookmark)
                .delete(remove_bookmark_for_article),
        )
        .route("/:id", delete(remove_bookmark))
}

/// GET /api/blog/bookmarks
async fn list_bookmarks(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Value>> {
    debug!("Getting bookmarks for user: {}", user.id);

    let bookmarks = state.bookmark_service.list_bookmarks(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": bookmarks
    })))
}

/// POST /api/blog/bookmarks
async fn add_bookmark(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<CreateBookmarkRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let bookmark = state
        .bookmark_service
        .add_bookmark(&user.id, &request.article_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": bookmark
        })),
    ))
}

/// DELETE /api/blog/bookmarks?article_id=...
async fn remove_bookmark_for_article(
    State(state): State<Arc<AppState>>,
    user: User,
    Query(query): Query<RemoveBookmarkQuery>,
) -> Result<Json<Value>> {
    state
        .bookmark_service
        .remove_bookmark_for_article(&user.id, &query.article_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Bookmark removed successfully"
    })))
}

/// DELETE /api/blog/bookmarks/:id
async fn remove_bookmark(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    state.bookmark_service.remove_bookmark(&user.id, &id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Bookmark removed successfully"
    })))
}
