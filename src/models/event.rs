use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::{clap::Clap, comment::Comment, follow::Follow};

/// 主写入完成后需要执行副作用的领域事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    ClapCreated {
        clap: Clap,
    },
    ClapRemoved {
        article_id: String,
        user_id: String,
        count: i64,
    },
    CommentCreated {
        comment: Comment,
    },
    ReadRecorded {
        user_id: String,
        article_id: String,
        first_read: bool,
        newly_completed: bool,
    },
    FollowCreated {
        follow: Follow,
    },
    ArticlePublished {
        article_id: String,
        author_id: String,
    },
}

impl DomainEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClapCreated { .. } => "clap_created",
            Self::ClapRemoved { .. } => "clap_removed",
            Self::CommentCreated { .. } => "comment_created",
            Self::ReadRecorded { .. } => "read_recorded",
            Self::FollowCreated { .. } => "follow_created",
            Self::ArticlePublished { .. } => "article_published",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct OutboxRecord {
    pub id: String,
    pub event: String,
    pub created_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
}
