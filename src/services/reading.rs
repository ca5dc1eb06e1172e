use crate::{
    error::{AppError, Result},
    models::{event::DomainEvent, read_history::*},
    services::{Database, TriggerService},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct ReadingService {
    db: Arc<Database>,
    triggers: TriggerService,
}

impl ReadingService {
    pub async fn new(db: Arc<Database>, triggers: TriggerService) -> Result<Self> {
        Ok(Self { db, triggers })
    }

    /// 记录阅读进度：保留最大阅读时长与进度，完成状态一旦置位不再回退
    pub async fn record_read(&self, user_id: &str, article_id: &str, request: RecordReadRequest) -> Result<ReadOutcome> {
        debug!("Recording read of article {} by {}", article_id, user_id);
        request.validate()?;

        let mut tx = self.db.begin().await?;

        // 草稿只允许作者本人记录阅读，其他人视为不存在
        let visible: Option<String> = sqlx::query_scalar(
            "SELECT id FROM articles WHERE id = ? AND deleted_at IS NULL AND (status = 'PUBLISHED' OR author_id = ?)",
        )
        .bind(article_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if visible.is_none() {
            return Err(AppError::not_found("Article"));
        }

        let previous: Option<bool> = sqlx::query_scalar(
            "SELECT completed FROM read_history WHERE user_id = ? AND article_id = ?",
        )
        .bind(user_id)
        .bind(article_id)
        .fetch_optional(&mut *tx)
        .await?;

        let now = Utc::now();
        let history = sqlx::query_as::<_, ReadHistory>(
            r#"
            INSERT INTO read_history (id, user_id, article_id, read_time, progress, completed, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, article_id) DO UPDATE SET
                read_time = MAX(read_history.read_time, excluded.read_time),
                progress = MAX(read_history.progress, excluded.progress),
                completed = MAX(read_history.completed, excluded.completed),
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(article_id)
        .bind(request.read_time)
        .bind(request.progress)
        .bind(request.completed)
        .bind(now)
        .bind(now)
        .fetch_all(&mut *tx)
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("Write did not return a row"))?;

        let first_read = previous.is_none();
        let newly_completed = history.completed && !previous.unwrap_or(false);

        let event = DomainEvent::ReadRecorded {
            user_id: user_id.to_string(),
            article_id: article_id.to_string(),
            first_read,
            newly_completed,
        };
        let event_id = TriggerService::enqueue(&mut tx, &event).await?;
        tx.commit().await?;

        self.triggers.dispatch(&event_id, &event).await;

        Ok(ReadOutcome {
            history,
            first_read,
            newly_completed,
        })
    }

    /// 用户最近的阅读记录
    pub async fn recent_history(&self, user_id: &str, limit: i64) -> Result<Vec<ReadHistory>> {
        let history = sqlx::query_as::<_, ReadHistory>(
            "SELECT * FROM read_history WHERE user_id = ? ORDER BY updated_at DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(history)
    }
}
