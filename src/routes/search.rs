use crate::{error::Result, models::article::SearchQuery, routes::paginated, state::AppState};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(search_articles))
}

/// 搜索已发布文章
/// GET /api/blog/search?q=rust&author=...
async fn search_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>> {
    debug!("Search request: {:?}", query);

    let result = state
        .article_service
        .search_articles(&query, state.get_page_size("articles"))
        .await?;

    Ok(Json(paginated("articles", result)))
}
