use crate::{
    error::{AppError, Result},
    models::notification::*,
    services::database::{Database, PageRequest, PaginatedResult},
};
use chrono::Utc;
use sqlx::{types::Json, Executor, QueryBuilder, Sqlite};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct NotificationService {
    db: Arc<Database>,
}

impl NotificationService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 创建通知，调用方负责跳过给自己的通知
    pub async fn create_notification(&self, request: CreateNotificationRequest) -> Result<Notification> {
        Self::insert(&self.db.pool, request).await
    }

    /// 在给定的连接或事务上写入一条通知
    pub async fn insert<'e, E>(executor: E, request: CreateNotificationRequest) -> Result<Notification>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(
            "Creating {:?} notification for user: {}",
            request.notification_type, request.recipient_id
        );

        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (id, user_id, type, title, message, link, is_read, metadata, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&request.recipient_id)
        .bind(request.notification_type)
        .bind(&request.title)
        .bind(&request.message)
        .bind(&request.link)
        .bind(Json(&request.metadata))
        .bind(Utc::now())
        .fetch_all(executor)
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("Write did not return a row"))?;

        Ok(notification)
    }

    /// 获取用户通知列表，按时间倒序
    pub async fn list_notifications(
        &self,
        user_id: &str,
        query: &NotificationQuery,
        default_per_page: usize,
    ) -> Result<PaginatedResult<Notification>> {
        debug!("Getting notifications for user: {}", user_id);

        let page = PageRequest::new(query.page, query.limit, default_per_page);

        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM notifications");
        push_filters(&mut count_query, user_id, query);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.db.pool)
            .await?;

        let mut list_query = QueryBuilder::<Sqlite>::new("SELECT * FROM notifications");
        push_filters(&mut list_query, user_id, query);
        list_query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let notifications = list_query
            .build_query_as::<Notification>()
            .fetch_all(&self.db.pool)
            .await?;

        Ok(PaginatedResult::new(notifications, total, page))
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(count)
    }

    /// 标记通知为已读，返回实际更新的条数
    pub async fn mark_as_read(&self, user_id: &str, selection: &NotificationSelection) -> Result<u64> {
        debug!("Marking notifications as read for user {}: {:?}", user_id, selection);
        self.ensure_owned(user_id, selection).await?;

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE notifications SET is_read = 1, read_at = ");
        query
            .push_bind(Utc::now())
            .push(" WHERE is_read = 0 AND user_id = ")
            .push_bind(user_id);
        push_selection(&mut query, selection);

        let updated = query.build().execute(&self.db.pool).await?.rows_affected();
        info!("Marked {} notifications as read for user {}", updated, user_id);
        Ok(updated)
    }

    /// 删除通知；`All` 只删除已读通知
    pub async fn delete_notifications(&self, user_id: &str, selection: &NotificationSelection) -> Result<u64> {
        debug!("Deleting notifications for user {}: {:?}", user_id, selection);
        self.ensure_owned(user_id, selection).await?;

        let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM notifications WHERE user_id = ");
        query.push_bind(user_id);
        match selection {
            NotificationSelection::All => {
                query.push(" AND is_read = 1");
            }
            other => push_selection(&mut query, other),
        }

        let deleted = query.build().execute(&self.db.pool).await?.rows_affected();
        info!("Deleted {} notifications for user {}", deleted, user_id);
        Ok(deleted)
    }

    /// 校验目标通知都属于当前用户，任一不属于则整体拒绝
    async fn ensure_owned(&self, user_id: &str, selection: &NotificationSelection) -> Result<()> {
        match selection {
            NotificationSelection::All => Ok(()),
            NotificationSelection::Single(id) => {
                let owner: Option<String> =
                    sqlx::query_scalar("SELECT user_id FROM notifications WHERE id = ?")
                        .bind(id)
                        .fetch_optional(&self.db.pool)
                        .await?;

                match owner {
                    None => Err(AppError::not_found("Notification")),
                    Some(owner) if owner != user_id => Err(AppError::forbidden(
                        "Cannot modify another user's notification",
                    )),
                    Some(_) => Ok(()),
                }
            }
            NotificationSelection::Many(ids) => {
                if ids.is_empty() {
                    return Ok(());
                }

                let mut query =
                    QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM notifications WHERE user_id <> ");
                query.push_bind(user_id).push(" AND id IN (");
                let mut separated = query.separated(", ");
                for id in ids {
                    separated.push_bind(id.as_str());
                }
                separated.push_unseparated(")");

                let foreign: i64 = query.build_query_scalar().fetch_one(&self.db.pool).await?;
                if foreign > 0 {
                    return Err(AppError::forbidden(
                        "Cannot modify another user's notifications",
                    ));
                }
                Ok(())
            }
        }
    }
}

fn push_filters<'a>(query: &mut QueryBuilder<'a, Sqlite>, user_id: &'a str, filters: &NotificationQuery) {
    query.push(" WHERE user_id = ").push_bind(user_id);
    if let Some(is_read) = filters.is_read {
        query.push(" AND is_read = ").push_bind(is_read);
    }
    if let Some(notification_type) = filters.notification_type {
        query.push(" AND type = ").push_bind(notification_type);
    }
}

fn push_selection<'a>(query: &mut QueryBuilder<'a, Sqlite>, selection: &'a NotificationSelection) {
    match selection {
        NotificationSelection::All => {}
        NotificationSelection::Single(id) => {
            query.push(" AND id = ").push_bind(id.as_str());
        }
        NotificationSelection::Many(ids) => {
            if ids.is_empty() {
                query.push(" AND 0");
                return;
            }
            query.push(" AND id IN (");
            let mut separated = query.separated(", ");
            for id in ids {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");
        }
    }
}
