use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub article_id: String,
    pub settings: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookmarkRequest {
    pub article_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveBookmarkQuery {
    pub article_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookmarkWithArticle {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub bookmark: Bookmark,
    pub article_title: String,
    pub article_slug: String,
    pub article_excerpt: Option<String>,
    pub article_author_id: String,
}
