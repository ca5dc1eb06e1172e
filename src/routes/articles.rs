use crate::{
    error::{AppError, Result},
    models::{article::*, read_history::RecordReadRequest},
    routes::paginated,
    services::{
        article::ArticleService,
        auth::{OptionalUser, User},
    },
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_articles).post(create_article))
        .route("/mine", get(list_my_articles))
        .route("/slug/:slug", get(get_article_by_slug))
        .route(
            "/:id",
            get(get_article).put(update_article).delete(delete_article),
        )
        .route("/:id/publish", post(publish_article))
        .route("/:id/clap", get(get_clap_status).post(toggle_clap))
        .route("/:id/read", post(record_read))
        .merge(super::revisions::router())
}

/// 获取已发布文章列表
/// GET /api/blog/articles
async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ArticleQuery>,
) -> Result<Json<Value>> {
    debug!("Fetching articles list with query: {:?}", query);

    let result = state
        .article_service
        .list_articles(&query, state.get_page_size("articles"))
        .await?;

    Ok(Json(paginated("articles", result)))
}

/// 当前用户自己的文章，可按状态筛选
/// GET /api/blog/articles/mine?status=DRAFT
async fn list_my_articles(
    State(state): State<Arc<AppState>>,
    user: User,
    Query(query): Query<AuthorArticleQuery>,
) -> Result<Json<Value>> {
    let result = state
        .article_service
        .list_author_articles(&user.id, &query, state.get_page_size("articles"))
        .await?;

    Ok(Json(paginated("articles", result)))
}

/// 创建文章
/// POST /api/blog/articles
async fn create_article(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let article = state.article_service.create_article(&user.id, request).await?;
    info!("User {} created article {}", user.id, article.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": article
        })),
    ))
}

/// GET /api/blog/articles/:id
async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    OptionalUser(viewer): OptionalUser,
) -> Result<Json<Value>> {
    let article = state
        .article_service
        .get_article_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found("Article"))?;
    let article = ArticleService::ensure_visible(article, viewer.as_ref().map(|u| u.id.as_str()))?;

    Ok(Json(json!({
        "success": true,
        "data": article
    })))
}

/// GET /api/blog/articles/slug/:slug
async fn get_article_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    OptionalUser(viewer): OptionalUser,
) -> Result<Json<Value>> {
    let article = state
        .article_service
        .get_article_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::not_found("Article"))?;
    let article = ArticleService::ensure_visible(article, viewer.as_ref().map(|u| u.id.as_str()))?;

    Ok(Json(json!({
        "success": true,
        "data": article
    })))
}

/// PUT /api/blog/articles/:id
async fn update_article(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(request): Json<UpdateArticleRequest>,
) -> Result<Json<Value>> {
    let article = state.article_service.update_article(&id, &user.id, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": article
    })))
}

/// DELETE /api/blog/articles/:id
async fn delete_article(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    state.article_service.delete_article(&id, &user.id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Article deleted successfully"
    })))
}

/// POST /api/blog/articles/:id/publish
async fn publish_article(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let article = state.article_service.publish_article(&id, &user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": article
    })))
}

/// 鼓掌状态
/// GET /api/blog/articles/:id/clap
async fn get_clap_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    OptionalUser(viewer): OptionalUser,
) -> Result<Json<Value>> {
    let status = state
        .article_service
        .get_clap_status(&id, viewer.as_ref().map(|u| u.id.as_str()))
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": status
    })))
}

/// 切换鼓掌
/// POST /api/blog/articles/:id/clap
async fn toggle_clap(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let result = state.article_service.toggle_clap(&id, &user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": result
    })))
}

/// 记录阅读进度
/// POST /api/blog/articles/:id/read
async fn record_read(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(request): Json<RecordReadRequest>,
) -> Result<Json<Value>> {
    let outcome = state.reading_service.record_read(&user.id, &id, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": outcome
    })))
}
