use crate::{
    error::{AppError, Result},
    models::{event::DomainEvent, follow::*},
    services::{
        database::{Database, PageRequest, PaginatedResult},
        TriggerService,
    },
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct FollowService {
    db: Arc<Database>,
    triggers: TriggerService,
}

impl FollowService {
    pub async fn new(db: Arc<Database>, triggers: TriggerService) -> Result<Self> {
        Ok(Self { db, triggers })
    }

    /// 关注用户
    pub async fn follow_user(&self, follower_id: &str, following_id: &str) -> Result<Follow> {
        debug!("User {} following {}", follower_id, following_id);

        if follower_id == following_id {
            return Err(AppError::bad_request("Cannot follow yourself"));
        }
        self.ensure_user_exists(following_id).await?;

        let mut tx = self.db.begin().await?;

        let follow = sqlx::query_as::<_, Follow>(
            r#"
            INSERT INTO follows (id, follower_id, following_id, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(follower_id)
        .bind(following_id)
        .bind(Utc::now())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            let err = AppError::from(e);
            if err.is_unique_violation() {
                AppError::conflict("Already following this user")
            } else {
                err
            }
        })?
        .pop()
        .ok_or_else(|| AppError::internal("Write did not return a row"))?;

        let event = DomainEvent::FollowCreated {
            follow: follow.clone(),
        };
        let event_id = TriggerService::enqueue(&mut tx, &event).await?;
        tx.commit().await?;

        info!("User {} now follows {}", follower_id, following_id);
        self.triggers.dispatch(&event_id, &event).await;

        Ok(follow)
    }

    /// 取消关注；未关注时拒绝
    pub async fn unfollow_user(&self, follower_id: &str, following_id: &str) -> Result<()> {
        debug!("User {} unfollowing {}", follower_id, following_id);

        if follower_id == following_id {
            return Err(AppError::bad_request("Cannot unfollow yourself"));
        }
        self.ensure_user_exists(following_id).await?;

        let removed = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND following_id = ?")
            .bind(follower_id)
            .bind(following_id)
            .execute(&self.db.pool)
            .await?
            .rows_affected();

        if removed == 0 {
            return Err(AppError::bad_request("Not following this user"));
        }

        info!("User {} unfollowed {}", follower_id, following_id);
        Ok(())
    }

    /// 切换关注状态，返回切换后是否处于关注中
    pub async fn toggle_follow(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        if self.is_following(follower_id, following_id).await? {
            self.unfollow_user(follower_id, following_id).await?;
            Ok(false)
        } else {
            self.follow_user(follower_id, following_id).await?;
            Ok(true)
        }
    }

    pub async fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        let found: Option<String> = sqlx::query_scalar(
            "SELECT id FROM follows WHERE follower_id = ? AND following_id = ?",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(found.is_some())
    }

    /// 粉丝列表
    pub async fn get_followers(&self, user_id: &str, page: PageRequest) -> Result<PaginatedResult<FollowUserInfo>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE following_id = ?")
            .bind(user_id)
            .fetch_one(&self.db.pool)
            .await?;

        let followers = sqlx::query_as::<_, FollowUserInfo>(
            r#"
            SELECT u.id AS user_id, u.name, f.created_at AS followed_at
            FROM follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.following_id = ?
            ORDER BY f.created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db.pool)
        .await?;

        Ok(PaginatedResult::new(followers, total, page))
    }

    /// 关注列表
    pub async fn get_following(&self, user_id: &str, page: PageRequest) -> Result<PaginatedResult<FollowUserInfo>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = ?")
            .bind(user_id)
            .fetch_one(&self.db.pool)
            .await?;

        let following = sqlx::query_as::<_, FollowUserInfo>(
            r#"
            SELECT u.id AS user_id, u.name, f.created_at AS followed_at
            FROM follows f
            JOIN users u ON u.id = f.following_id
            WHERE f.follower_id = ?
            ORDER BY f.created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db.pool)
        .await?;

        Ok(PaginatedResult::new(following, total, page))
    }

    pub async fn get_follow_counts(&self, user_id: &str) -> Result<(i64, i64)> {
        let (followers, following): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM follows WHERE following_id = ?1),
                (SELECT COUNT(*) FROM follows WHERE follower_id = ?1)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db.pool)
        .await?;
        Ok((followers, following))
    }

    /// 关注统计；`viewer_id` 为当前访问者
    pub async fn get_follow_stats(&self, user_id: &str, viewer_id: Option<&str>) -> Result<FollowStats> {
        let (followers_count, following_count) = self.get_follow_counts(user_id).await?;

        let (is_following, is_followed_by) = match viewer_id {
            Some(viewer_id) if viewer_id != user_id => (
                self.is_following(viewer_id, user_id).await?,
                self.is_following(user_id, viewer_id).await?,
            ),
            _ => (false, false),
        };

        Ok(FollowStats {
            followers_count,
            following_count,
            is_following,
            is_followed_by,
        })
    }

    async fn ensure_user_exists(&self, user_id: &str) -> Result<()> {
        let found: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.db.pool)
            .await?;
        found.map(|_| ()).ok_or_else(|| AppError::not_found("User"))
    }
}
