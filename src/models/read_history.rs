use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReadHistory {
    pub id: String,
    pub user_id: String,
    pub article_id: String,
    /// 秒
    pub read_time: i64,
    /// 0..=100
    pub progress: f64,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordReadRequest {
    #[validate(range(min = 0, max = 86400))]
    pub read_time: i64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub progress: f64,
    #[serde(default)]
    pub completed: bool,
}

/// 记录阅读后返回给调用方的状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadOutcome {
    pub history: ReadHistory,
    pub first_read: bool,
    pub newly_completed: bool,
}
