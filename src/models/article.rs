use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub slug: String,
    pub status: ArticleStatus,
    pub author_id: String,
    pub view_count: i64,
    pub clap_count: i64,
    pub comment_count: i64,
    pub read_count: i64,
    pub metadata: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Article {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_published(&self) -> bool {
        self.status == ArticleStatus::Published && !self.is_deleted()
    }

    pub fn link(&self) -> String {
        format!("/article/{}", self.slug)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArticleStatus {
    Draft,
    Published,
    Archived,
}

impl Default for ArticleStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl ArticleStatus {
    pub fn can_be_viewed_by_public(&self) -> bool {
        matches!(self, Self::Published)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    pub publish: Option<bool>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateArticleRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Content cannot be empty"))]
    pub content: Option<String>,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    pub status: Option<ArticleStatus>,
    /// 本次修改的说明，写入修订记录
    #[validate(length(max = 500))]
    pub change_log: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl UpdateArticleRequest {
    /// 是否修改了需要留存修订记录的字段
    pub fn touches_content(&self) -> bool {
        self.title.is_some() || self.content.is_some() || self.excerpt.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub author: Option<String>,
}

/// 作者查看自己的文章（含草稿）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorArticleQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub status: Option<ArticleStatus>,
}

/// 按标题、正文或作者名搜索已发布文章
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub author: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}
