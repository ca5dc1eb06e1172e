use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Clap {
    pub id: String,
    pub article_id: String,
    pub user_id: String,
    pub count: i64,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClapResponse {
    /// 当前用户是否处于已鼓掌状态
    pub clapped: bool,
    /// 文章当前有效的鼓掌记录数
    pub claps: i64,
}
