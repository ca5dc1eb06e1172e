//! 主写入之后的副作用处理
//!
//! 每次主写入在同一事务内把 `DomainEvent` 写入 `outbox_events`，提交后立即在请求内分发。
//! 分发前先原子地认领事件（设置 `dispatched_at`），只有一个调用者能认领成功；
//! 进程在提交与分发之间退出时，启动时的 `replay_pending` 会补发未认领的事件。
//! 每个副作用都有独立的错误边界：失败只记录日志，不影响主写入，也不影响其他副作用。

use crate::{
    error::Result,
    models::{
        article::Article,
        clap::Clap,
        comment::Comment,
        event::{DomainEvent, OutboxRecord},
        follow::Follow,
        notification::{CreateNotificationRequest, NotificationType},
    },
    services::{AchievementService, Database, NotificationService},
};
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct TriggerService {
    db: Arc<Database>,
    notification_service: NotificationService,
    achievement_service: AchievementService,
}

impl TriggerService {
    pub async fn new(
        db: Arc<Database>,
        notification_service: NotificationService,
        achievement_service: AchievementService,
    ) -> Result<Self> {
        Ok(Self {
            db,
            notification_service,
            achievement_service,
        })
    }

    /// 在主写入的事务中登记事件，返回事件ID
    pub async fn enqueue(conn: &mut SqliteConnection, event: &DomainEvent) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO outbox_events (id, event, created_at) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(serde_json::to_string(event)?)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

        debug!("Enqueued {} event {}", event.kind(), id);
        Ok(id)
    }

    /// 分发已提交的事件；从不返回错误
    pub async fn dispatch(&self, event_id: &str, event: &DomainEvent) {
        match self.claim(event_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Event {} already dispatched, skipping", event_id);
                return;
            }
            Err(e) => {
                error!("Failed to claim event {}: {}", event_id, e);
                return;
            }
        }

        debug!("Dispatching {} event {}", event.kind(), event_id);
        match event {
            DomainEvent::ClapCreated { clap } => self.on_clap_created(clap).await,
            DomainEvent::ClapRemoved {
                article_id,
                user_id,
                count,
            } => self.on_clap_removed(article_id, user_id, *count).await,
            DomainEvent::CommentCreated { comment } => self.on_comment_created(comment).await,
            DomainEvent::ReadRecorded {
                user_id,
                article_id,
                first_read,
                newly_completed,
            } => {
                self.on_read_recorded(user_id, article_id, *first_read, *newly_completed)
                    .await
            }
            DomainEvent::FollowCreated { follow } => self.on_follow_created(follow).await,
            DomainEvent::ArticlePublished {
                article_id,
                author_id,
            } => self.on_article_published(article_id, author_id).await,
        }
    }

    /// 补发从未被认领的事件，按创建顺序
    pub async fn replay_pending(&self) -> Result<usize> {
        let pending = sqlx::query_as::<_, OutboxRecord>(
            "SELECT * FROM outbox_events WHERE dispatched_at IS NULL ORDER BY created_at ASC",
        )
        .fetch_all(&self.db.pool)
        .await?;

        if pending.is_empty() {
            return Ok(0);
        }

        info!("Replaying {} pending outbox events", pending.len());
        let mut replayed = 0;
        for record in pending {
            match serde_json::from_str::<DomainEvent>(&record.event) {
                Ok(event) => {
                    self.dispatch(&record.id, &event).await;
                    replayed += 1;
                }
                Err(e) => {
                    warn!("Discarding unreadable outbox event {}: {}", record.id, e);
                    if let Err(e) = self.claim(&record.id).await {
                        error!("Failed to discard outbox event {}: {}", record.id, e);
                    }
                }
            }
        }

        Ok(replayed)
    }

    /// 清理分发时间早于保留期的事件，返回删除条数
    pub async fn prune_dispatched(&self, retention: Duration) -> Result<u64> {
        let cutoff = Utc::now() - retention;
        let pruned = sqlx::query(
            "DELETE FROM outbox_events WHERE dispatched_at IS NOT NULL AND dispatched_at < ?",
        )
        .bind(cutoff)
        .execute(&self.db.pool)
        .await?
        .rows_affected();

        if pruned > 0 {
            info!("Pruned {} dispatched outbox events", pruned);
        }
        Ok(pruned)
    }

    async fn claim(&self, event_id: &str) -> Result<bool> {
        let claimed = sqlx::query(
            "UPDATE outbox_events SET dispatched_at = ? WHERE id = ? AND dispatched_at IS NULL",
        )
        .bind(Utc::now())
        .bind(event_id)
        .execute(&self.db.pool)
        .await?
        .rows_affected();

        Ok(claimed == 1)
    }

    async fn on_clap_created(&self, clap: &Clap) {
        let Some(article) = self.find_live_article(&clap.article_id).await else {
            return;
        };

        if let Err(e) = self.add_clap_counters(&article, clap.count).await {
            error!("Failed to update clap counters for article {}: {}", article.id, e);
        }

        if article.author_id != clap.user_id {
            let actor = self.display_name(&clap.user_id).await;
            let notification = CreateNotificationRequest {
                recipient_id: article.author_id.clone(),
                notification_type: NotificationType::Clap,
                title: "New clap".to_string(),
                message: format!("{} clapped for your article \"{}\"", actor, article.title),
                link: Some(article.link()),
                metadata: json!({
                    "articleId": article.id,
                    "userId": clap.user_id,
                    "count": clap.count,
                }),
            };
            if let Err(e) = self.notification_service.create_notification(notification).await {
                error!("Failed to send clap notification for article {}: {}", article.id, e);
            }
        }

        self.evaluate_achievements(&article.author_id).await;
    }

    async fn on_clap_removed(&self, article_id: &str, user_id: &str, count: i64) {
        let result = sqlx::query(
            r#"
            UPDATE articles SET clap_count = MAX(clap_count - ?, 0)
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(count)
        .bind(article_id)
        .execute(&self.db.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                debug!("Article {} gone, skipping clap removal by {}", article_id, user_id);
            }
            Ok(_) => {}
            Err(e) => error!("Failed to decrement clap count for article {}: {}", article_id, e),
        }
    }

    async fn on_comment_created(&self, comment: &Comment) {
        let Some(article) = self.find_live_article(&comment.article_id).await else {
            return;
        };

        if let Err(e) = sqlx::query("UPDATE articles SET comment_count = comment_count + 1 WHERE id = ?")
            .bind(&article.id)
            .execute(&self.db.pool)
            .await
        {
            error!("Failed to update comment count for article {}: {}", article.id, e);
        }

        let actor = self.display_name(&comment.author_id).await;
        let link = format!("{}#comment-{}", article.link(), comment.id);

        if let Some(parent_id) = &comment.parent_id {
            match self.find_comment_author(parent_id).await {
                Ok(Some(parent_author)) if parent_author != comment.author_id => {
                    let notification = CreateNotificationRequest {
                        recipient_id: parent_author,
                        notification_type: NotificationType::Reply,
                        title: "New reply".to_string(),
                        message: format!("{} replied to your comment on \"{}\"", actor, article.title),
                        link: Some(link.clone()),
                        metadata: json!({
                            "articleId": article.id,
                            "commentId": comment.id,
                            "parentId": parent_id,
                        }),
                    };
                    if let Err(e) = self.notification_service.create_notification(notification).await {
                        error!("Failed to send reply notification for comment {}: {}", comment.id, e);
                    }
                }
                Ok(_) => {}
                Err(e) => error!("Failed to load parent comment {}: {}", parent_id, e),
            }
        }

        if article.author_id != comment.author_id {
            let notification = CreateNotificationRequest {
                recipient_id: article.author_id.clone(),
                notification_type: NotificationType::Comment,
                title: "New comment".to_string(),
                message: format!("{} commented on your article \"{}\"", actor, article.title),
                link: Some(link),
                metadata: json!({
                    "articleId": article.id,
                    "commentId": comment.id,
                }),
            };
            if let Err(e) = self.notification_service.create_notification(notification).await {
                error!("Failed to send comment notification for article {}: {}", article.id, e);
            }
        }
    }

    async fn on_read_recorded(&self, user_id: &str, article_id: &str, first_read: bool, newly_completed: bool) {
        let Some(article) = self.find_live_article(article_id).await else {
            return;
        };

        if let Err(e) = sqlx::query(
            "UPDATE articles SET view_count = view_count + 1, read_count = read_count + ? WHERE id = ?",
        )
        .bind(i64::from(newly_completed))
        .bind(&article.id)
        .execute(&self.db.pool)
        .await
        {
            error!("Failed to update read counters for article {}: {}", article.id, e);
        }

        if newly_completed {
            if let Err(e) = sqlx::query("UPDATE users SET total_reads = total_reads + 1 WHERE id = ?")
                .bind(user_id)
                .execute(&self.db.pool)
                .await
            {
                error!("Failed to update read total for user {}: {}", user_id, e);
            }
        }

        if let Err(e) = self.refresh_article_analytics(&article.id, first_read).await {
            error!("Failed to refresh analytics for article {}: {}", article.id, e);
        }
    }

    async fn on_follow_created(&self, follow: &Follow) {
        let actor = self.display_name(&follow.follower_id).await;
        let notification = CreateNotificationRequest {
            recipient_id: follow.following_id.clone(),
            notification_type: NotificationType::Follow,
            title: "New follower".to_string(),
            message: format!("{} started following you", actor),
            link: Some(format!("/profile/{}", follow.follower_id)),
            metadata: json!({ "followerId": follow.follower_id }),
        };
        if let Err(e) = self.notification_service.create_notification(notification).await {
            error!("Failed to send follow notification to {}: {}", follow.following_id, e);
        }

        self.evaluate_achievements(&follow.following_id).await;
    }

    async fn on_article_published(&self, article_id: &str, author_id: &str) {
        debug!("Article {} published by {}", article_id, author_id);
        self.evaluate_achievements(author_id).await;
    }

    async fn evaluate_achievements(&self, user_id: &str) {
        match self.achievement_service.evaluate(user_id).await {
            Ok(awarded) if !awarded.is_empty() => {
                info!("User {} earned {} new achievements", user_id, awarded.len());
            }
            Ok(_) => {}
            Err(e) => error!("Failed to evaluate achievements for user {}: {}", user_id, e),
        }
    }

    async fn add_clap_counters(&self, article: &Article, count: i64) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE articles SET clap_count = clap_count + ? WHERE id = ?")
            .bind(count)
            .bind(&article.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET total_claps = total_claps + ? WHERE id = ?")
            .bind(count)
            .bind(&article.author_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn refresh_article_analytics(&self, article_id: &str, first_read: bool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO article_analytics (article_id, total_views, unique_views, average_read_time, completion_rate, updated_at)
            VALUES (
                ?, 1, ?,
                (SELECT COALESCE(AVG(read_time), 0.0) FROM read_history WHERE article_id = ?),
                (SELECT COALESCE(AVG(completed) * 100.0, 0.0) FROM read_history WHERE article_id = ?),
                ?
            )
            ON CONFLICT(article_id) DO UPDATE SET
                total_views = article_analytics.total_views + 1,
                unique_views = article_analytics.unique_views + excluded.unique_views,
                average_read_time = excluded.average_read_time,
                completion_rate = excluded.completion_rate,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(article_id)
        .bind(i64::from(first_read))
        .bind(article_id)
        .bind(article_id)
        .bind(Utc::now())
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    /// 文章不存在或已删除时返回 None，处理器据此直接跳过
    async fn find_live_article(&self, article_id: &str) -> Option<Article> {
        let result = sqlx::query_as::<_, Article>(
            "SELECT * FROM articles WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(article_id)
        .fetch_optional(&self.db.pool)
        .await;

        match result {
            Ok(Some(article)) => Some(article),
            Ok(None) => {
                debug!("Article {} not found or deleted, skipping side effects", article_id);
                None
            }
            Err(e) => {
                error!("Failed to load article {}: {}", article_id, e);
                None
            }
        }
    }

    async fn find_comment_author(&self, comment_id: &str) -> Result<Option<String>> {
        let author = sqlx::query_scalar("SELECT author_id FROM comments WHERE id = ?")
            .bind(comment_id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(author)
    }

    async fn display_name(&self, user_id: &str) -> String {
        let name: Option<Option<String>> = sqlx::query_scalar("SELECT name FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.db.pool)
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to load display name for user {}: {}", user_id, e);
                None
            });

        name.flatten().unwrap_or_else(|| "Someone".to_string())
    }
}
