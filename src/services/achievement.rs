use crate::{
    error::{AppError, Result},
    models::{achievement::*, notification::*},
    services::{auth::User, Database, NotificationService},
};
use chrono::Utc;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::convert::TryFrom;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AchievementService {
    db: Arc<Database>,
    notification_service: NotificationService,
}

impl AchievementService {
    pub async fn new(db: Arc<Database>, notification_service: NotificationService) -> Result<Self> {
        Ok(Self {
            db,
            notification_service,
        })
    }

    /// 加载成就目录，按积分倒序；条件无法解析的行会被跳过
    pub async fn list_achievements(&self) -> Result<Vec<Achievement>> {
        let rows = sqlx::query_as::<_, AchievementRow>(
            "SELECT * FROM achievements ORDER BY points DESC, created_at ASC",
        )
        .fetch_all(&self.db.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                match Achievement::try_from(row) {
                    Ok(achievement) => Some(achievement),
                    Err(e) => {
                        warn!("Skipping achievement {} with invalid criteria: {}", id, e);
                        None
                    }
                }
            })
            .collect())
    }

    pub async fn get_achievement(&self, achievement_id: &str) -> Result<Achievement> {
        let row = sqlx::query_as::<_, AchievementRow>("SELECT * FROM achievements WHERE id = ?")
            .bind(achievement_id)
            .fetch_optional(&self.db.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Achievement"))?;

        Achievement::try_from(row)
    }

    pub async fn create_achievement(&self, actor: &User, request: CreateAchievementRequest) -> Result<Achievement> {
        ensure_admin(actor)?;

        let name = require_text("name", &request.name)?;
        let description = require_text("description", &request.description)?;
        let badge = require_text("badge", &request.badge)?;
        let criteria = AchievementCriteria::from_value(request.criteria)?;
        let points = request.points.unwrap_or(0);
        if points < 0 {
            return Err(AppError::validation("Points must not be negative"));
        }

        let row = sqlx::query_as::<_, AchievementRow>(
            r#"
            INSERT INTO achievements (id, name, description, badge, criteria, points, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(description)
        .bind(badge)
        .bind(criteria.to_json()?)
        .bind(points)
        .bind(Utc::now())
        .fetch_all(&self.db.pool)
        .await
        .map_err(|e| {
            let err = AppError::from(e);
            if err.is_unique_violation() {
                AppError::conflict("An achievement with this name already exists")
            } else {
                err
            }
        })?
        .pop()
        .ok_or_else(|| AppError::internal("Write did not return a row"))?;

        info!("Created achievement {} ({})", row.name, row.id);
        Achievement::try_from(row)
    }

    pub async fn update_achievement(
        &self,
        actor: &User,
        achievement_id: &str,
        request: UpdateAchievementRequest,
    ) -> Result<Achievement> {
        ensure_admin(actor)?;
        let current = self.get_achievement(achievement_id).await?;

        let criteria = match request.criteria {
            Some(value) => AchievementCriteria::from_value(value)?,
            None => current.criteria,
        };
        let name = match request.name.as_deref() {
            Some(name) => require_text("name", name)?,
            None => current.name.as_str(),
        };
        let description = match request.description.as_deref() {
            Some(description) => require_text("description", description)?,
            None => current.description.as_str(),
        };
        let badge = match request.badge.as_deref() {
            Some(badge) => require_text("badge", badge)?,
            None => current.badge.as_str(),
        };
        let points = request.points.unwrap_or(current.points);
        if points < 0 {
            return Err(AppError::validation("Points must not be negative"));
        }

        let row = sqlx::query_as::<_, AchievementRow>(
            r#"
            UPDATE achievements
            SET name = ?, description = ?, badge = ?, criteria = ?, points = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(badge)
        .bind(criteria.to_json()?)
        .bind(points)
        .bind(achievement_id)
        .fetch_all(&self.db.pool)
        .await
        .map_err(|e| {
            let err = AppError::from(e);
            if err.is_unique_violation() {
                AppError::conflict("An achievement with this name already exists")
            } else {
                err
            }
        })?
        .pop()
        .ok_or_else(|| AppError::internal("Write did not return a row"))?;

        info!("Updated achievement {}", achievement_id);
        Achievement::try_from(row)
    }

    pub async fn delete_achievement(&self, actor: &User, achievement_id: &str) -> Result<()> {
        ensure_admin(actor)?;

        let deleted = sqlx::query("DELETE FROM achievements WHERE id = ?")
            .bind(achievement_id)
            .execute(&self.db.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::not_found("Achievement"));
        }

        info!("Deleted achievement {}", achievement_id);
        Ok(())
    }

    /// 用户已获得的成就，最新的在前
    pub async fn get_user_achievements(&self, user_id: &str) -> Result<Vec<UserAchievementWithDetails>> {
        let awarded = sqlx::query_as::<_, UserAchievement>(
            "SELECT * FROM user_achievements WHERE user_id = ? ORDER BY awarded_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;

        let catalog: HashMap<String, Achievement> = self
            .list_achievements()
            .await?
            .into_iter()
            .map(|achievement| (achievement.id.clone(), achievement))
            .collect();

        Ok(awarded
            .into_iter()
            .filter_map(|user_achievement| {
                catalog
                    .get(&user_achievement.achievement_id)
                    .cloned()
                    .map(|achievement| UserAchievementWithDetails {
                        user_achievement,
                        achievement,
                    })
            })
            .collect())
    }

    pub async fn get_user_stats(&self, user_id: &str) -> Result<UserStats> {
        let article_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM articles WHERE author_id = ? AND status = 'PUBLISHED' AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.db.pool)
        .await?;

        let follower_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE following_id = ?")
                .bind(user_id)
                .fetch_one(&self.db.pool)
                .await?;

        let clap_total: i64 =
            sqlx::query_scalar("SELECT COALESCE(total_claps, 0) FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.db.pool)
                .await?
                .unwrap_or(0);

        Ok(UserStats {
            article_count,
            follower_count,
            clap_total,
        })
    }

    /// 评估用户的成就并颁发新满足的成就，返回本次新颁发的列表
    ///
    /// 重复调用不会重复颁发或重复通知：唯一约束保证插入只成功一次，
    /// 只有插入成功的那一次才发送通知。
    pub async fn evaluate(&self, user_id: &str) -> Result<Vec<Achievement>> {
        debug!("Evaluating achievements for user: {}", user_id);

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.db.pool)
            .await?;
        if exists.is_none() {
            debug!("User {} not found, skipping achievement evaluation", user_id);
            return Ok(Vec::new());
        }

        let stats = self.get_user_stats(user_id).await?;
        let catalog = self.list_achievements().await?;

        let held: HashSet<String> = sqlx::query_scalar::<_, String>(
            "SELECT achievement_id FROM user_achievements WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?
        .into_iter()
        .collect();

        let mut awarded = Vec::new();
        for achievement in catalog {
            if held.contains(&achievement.id) || !achievement.criteria.is_met(&stats) {
                continue;
            }

            let inserted = sqlx::query(
                r#"
                INSERT INTO user_achievements (id, user_id, achievement_id, awarded_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(user_id, achievement_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(user_id)
            .bind(&achievement.id)
            .bind(Utc::now())
            .execute(&self.db.pool)
            .await?
            .rows_affected();

            if inserted == 0 {
                continue;
            }

            info!("Awarded achievement {} to user {}", achievement.name, user_id);

            let notification = CreateNotificationRequest {
                recipient_id: user_id.to_string(),
                notification_type: NotificationType::Achievement,
                title: "Achievement unlocked!".to_string(),
                message: format!(
                    "You earned the \"{}\" achievement (+{} points)",
                    achievement.name, achievement.points
                ),
                link: Some("/dashboard/achievements".to_string()),
                metadata: json!({
                    "achievementId": achievement.id,
                    "badge": achievement.badge,
                    "points": achievement.points,
                }),
            };
            if let Err(e) = self.notification_service.create_notification(notification).await {
                error!(
                    "Failed to notify user {} about achievement {}: {}",
                    user_id, achievement.id, e
                );
            }

            awarded.push(achievement);
        }

        Ok(awarded)
    }
}

fn ensure_admin(actor: &User) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden("Only admins can manage achievements"))
    }
}

fn require_text<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("Field '{}' is required", field)));
    }
    Ok(trimmed)
}
