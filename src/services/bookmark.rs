use crate::{
    error::{AppError, Result},
    models::bookmark::*,
    services::Database,
};
use chrono::Utc;
use serde_json::json;
use sqlx::types::Json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct BookmarkService {
    db: Arc<Database>,
}

impl BookmarkService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 添加书签；重复添加幂等，已删除的书签会被恢复
    pub async fn add_bookmark(&self, user_id: &str, article_id: &str) -> Result<Bookmark> {
        debug!("Adding bookmark on article {} for user {}", article_id, user_id);

        let exists: Option<String> =
            sqlx::query_scalar("SELECT id FROM articles WHERE id = ? AND deleted_at IS NULL")
                .bind(article_id)
                .fetch_optional(&self.db.pool)
                .await?;
        if exists.is_none() {
            return Err(AppError::not_found("Article"));
        }

        let now = Utc::now();
        let bookmark = sqlx::query_as::<_, Bookmark>(
            r#"
            INSERT INTO bookmarks (id, user_id, article_id, settings, created_at, deleted_at)
            VALUES (?, ?, ?, ?, ?, NULL)
            ON CONFLICT(user_id, article_id) DO UPDATE SET
                created_at = CASE WHEN bookmarks.deleted_at IS NULL THEN bookmarks.created_at ELSE excluded.created_at END,
                settings = CASE WHEN bookmarks.deleted_at IS NULL THEN bookmarks.settings ELSE excluded.settings END,
                deleted_at = NULL
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(article_id)
        .bind(Json(json!({ "addedAt": now, "source": "manual" })))
        .bind(now)
        .fetch_all(&self.db.pool)
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("Write did not return a row"))?;

        info!("Bookmarked article {} for user {}", article_id, user_id);
        Ok(bookmark)
    }

    /// 有效书签及文章信息，最新的在前
    pub async fn list_bookmarks(&self, user_id: &str) -> Result<Vec<BookmarkWithArticle>> {
        let bookmarks = sqlx::query_as::<_, BookmarkWithArticle>(
            r#"
            SELECT b.*, a.title AS article_title, a.slug AS article_slug,
                   a.excerpt AS article_excerpt, a.author_id AS article_author_id
            FROM bookmarks b
            JOIN articles a ON a.id = b.article_id
            WHERE b.user_id = ? AND b.deleted_at IS NULL AND a.deleted_at IS NULL
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(bookmarks)
    }

    pub async fn recent_bookmarks(&self, user_id: &str, limit: i64) -> Result<Vec<Bookmark>> {
        let bookmarks = sqlx::query_as::<_, Bookmark>(
            "SELECT * FROM bookmarks WHERE user_id = ? AND deleted_at IS NULL ORDER BY created_at DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(bookmarks)
    }

    /// 按ID移除书签，只能移除自己的
    pub async fn remove_bookmark(&self, user_id: &str, bookmark_id: &str) -> Result<()> {
        let bookmark = sqlx::query_as::<_, Bookmark>(
            "SELECT * FROM bookmarks WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(bookmark_id)
        .fetch_optional(&self.db.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Bookmark"))?;

        if bookmark.user_id != user_id {
            return Err(AppError::forbidden("Cannot remove another user's bookmark"));
        }

        self.soft_delete(&bookmark.id).await?;
        info!("Removed bookmark {} for user {}", bookmark_id, user_id);
        Ok(())
    }

    /// 按文章移除当前用户的书签
    pub async fn remove_bookmark_for_article(&self, user_id: &str, article_id: &str) -> Result<()> {
        let bookmark_id: String = sqlx::query_scalar(
            "SELECT id FROM bookmarks WHERE user_id = ? AND article_id = ? AND deleted_at IS NULL",
        )
        .bind(user_id)
        .bind(article_id)
        .fetch_optional(&self.db.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Bookmark"))?;

        self.soft_delete(&bookmark_id).await?;
        info!("Removed bookmark on article {} for user {}", article_id, user_id);
        Ok(())
    }

    pub async fn is_bookmarked(&self, user_id: &str, article_id: &str) -> Result<bool> {
        let found: Option<String> = sqlx::query_scalar(
            "SELECT id FROM bookmarks WHERE user_id = ? AND article_id = ? AND deleted_at IS NULL",
        )
        .bind(user_id)
        .bind(article_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(found.is_some())
    }

    async fn soft_delete(&self, bookmark_id: &str) -> Result<()> {
        sqlx::query("UPDATE bookmarks SET deleted_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(bookmark_id)
            .execute(&self.db.pool)
            .await?;
        Ok(())
    }
}
