use crate::{
    error::Result,
    routes::paginated,
    services::{
        auth::{OptionalUser, User},
        database::PageRequest,
    },
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

const DEFAULT_FOLLOWS_PER_PAGE: usize = 20;

#[derive(Debug, Deserialize)]
pub struct FollowQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/:user_id/follow", post(follow_user).delete(unfollow_user))
        .route("/user/:user_id/toggle", post(toggle_follow))
        .route("/user/:user_id/followers", get(get_followers))
        .route("/user/:user_id/following", get(get_following))
        .route("/user/:user_id/stats", get(get_follow_stats))
}

/// 关注用户
/// POST /api/blog/follows/user/:user_id/follow
async fn follow_user(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(user_id): Path<String>,
) -> Result<Json<Value>> {
    debug!("User {} following user {}", user.id, user_id);

    let follow = state.follow_service.follow_user(&user.id, &user_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": follow,
        "message": "User followed successfully"
    })))
}

/// 取消关注用户
/// DELETE /api/blog/follows/user/:user_id/follow
async fn unfollow_user(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(user_id): Path<String>,
) -> Result<Json<Value>> {
    debug!("User {} unfollowing user {}", user.id, user_id);

    state.follow_service.unfollow_user(&user.id, &user_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "User unfollowed successfully"
    })))
}

/// POST /api/blog/follows/user/:user_id/toggle
async fn toggle_follow(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(user_id): Path<String>,
) -> Result<Json<Value>> {
    let following = state.follow_service.toggle_follow(&user.id, &user_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "following": following }
    })))
}

/// GET /api/blog/follows/user/:user_id/followers
async fn get_followers(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<FollowQuery>,
) -> Result<Json<Value>> {
    let page = PageRequest::new(query.page, query.limit, DEFAULT_FOLLOWS_PER_PAGE);
    let followers = state.follow_service.get_followers(&user_id, page).await?;

    Ok(Json(paginated("followers", followers)))
}

/// GET /api/blog/follows/user/:user_id/following
async fn get_following(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<FollowQuery>,
) -> Result<Json<Value>> {
    let page = PageRequest::new(query.page, query.limit, DEFAULT_FOLLOWS_PER_PAGE);
    let following = state.follow_service.get_following(&user_id, page).await?;

    Ok(Json(paginated("following", following)))
}

/// 获取用户的关注统计
/// GET /api/blog/follows/user/:user_id/stats
async fn get_follow_stats(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    OptionalUser(viewer): OptionalUser,
) -> Result<Json<Value>> {
    let stats = state
        .follow_service
        .get_follow_stats(&user_id, viewer.as_ref().map(|u| u.id.as_str()))
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": stats
    })))
}
