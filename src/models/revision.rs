use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use validator::Validate;

use super::article::Article;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ArticleRevision {
    pub id: String,
    pub article_id: String,
    pub version: i64,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub change_log: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 文章可被修订的部分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSnapshot {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
}

impl From<&Article> for ArticleSnapshot {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            content: article.content.clone(),
            excerpt: article.excerpt.clone(),
        }
    }
}

impl From<&ArticleRevision> for ArticleSnapshot {
    fn from(revision: &ArticleRevision) -> Self {
        Self {
            title: revision.title.clone(),
            content: revision.content.clone(),
            excerpt: revision.excerpt.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRevisionRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    pub excerpt: Option<String>,
    #[validate(length(max = 500))]
    pub change_log: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRevisionRequest {
    pub revision_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreOutcome {
    pub article: Article,
    /// 恢复前自动保存的修订
    pub backup: ArticleRevision,
    /// 标记恢复动作的修订
    pub restored: ArticleRevision,
}
