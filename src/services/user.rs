use crate::{
    error::{AppError, Result},
    models::user::{UpdateProfileRequest, UserProfile},
    services::{auth::User, Database},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

#[derive(Clone)]
pub struct UserService {
    db: Arc<Database>,
}

impl UserService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 根据身份信息创建或刷新本地用户资料；本地已设置的名字优先于令牌中的名字
    pub async fn ensure_profile(&self, user: &User) -> Result<UserProfile> {
        debug!("Ensuring profile for user: {}", user.id);

        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO users (id, email, name, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                name = COALESCE(users.name, excluded.name),
                role = excluded.role
            RETURNING *
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role)
        .bind(Utc::now())
        .fetch_all(&self.db.pool)
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("Write did not return a row"))?;

        Ok(profile)
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(profile)
    }

    /// 更新个人资料：未提供的名字保持不变，未提供或为空的简介被清除
    pub async fn update_profile(&self, user_id: &str, request: UpdateProfileRequest) -> Result<UserProfile> {
        debug!("Updating profile for user: {}", user_id);
        request.validate()?;

        let name = request.name.as_deref().map(str::trim).filter(|name| !name.is_empty());
        let bio = request.bio.as_deref().map(str::trim).filter(|bio| !bio.is_empty());

        let profile = sqlx::query_as::<_, UserProfile>(
            "UPDATE users SET name = COALESCE(?, name), bio = ? WHERE id = ? RETURNING *",
        )
        .bind(name)
        .bind(bio)
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("User"))?;

        info!("Updated profile for user {}", user_id);
        Ok(profile)
    }
}
