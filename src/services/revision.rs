use crate::{
    error::{AppError, Result},
    models::{article::Article, revision::*},
    services::{auth::User, Database},
};
use chrono::Utc;
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const BACKUP_CHANGE_LOG: &str = "Auto-saved before restoration";

#[derive(Clone)]
pub struct RevisionService {
    db: Arc<Database>,
}

impl RevisionService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 在调用方的事务中追加一条修订，版本号为现有修订数 + 1
    pub async fn record_revision(
        conn: &mut SqliteConnection,
        article_id: &str,
        snapshot: &ArticleSnapshot,
        change_log: Option<&str>,
    ) -> Result<ArticleRevision> {
        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM article_revisions WHERE article_id = ?")
                .bind(article_id)
                .fetch_one(&mut *conn)
                .await?;

        let revision = sqlx::query_as::<_, ArticleRevision>(
            r#"
            INSERT INTO article_revisions (id, article_id, version, title, content, excerpt, change_log, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(article_id)
        .bind(existing + 1)
        .bind(&snapshot.title)
        .bind(&snapshot.content)
        .bind(&snapshot.excerpt)
        .bind(change_log)
        .bind(Utc::now())
        .fetch_all(&mut *conn)
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("Write did not return a row"))?;

        debug!("Recorded revision v{} for article {}", revision.version, article_id);
        Ok(revision)
    }

    /// 修订列表，版本倒序（作者或管理员）
    pub async fn list_revisions(&self, article_id: &str, actor: &User) -> Result<Vec<ArticleRevision>> {
        let article = load_article(&mut *self.db.pool.acquire().await?, article_id).await?;
        ensure_can_view(&article, actor)?;

        let revisions = sqlx::query_as::<_, ArticleRevision>(
            "SELECT * FROM article_revisions WHERE article_id = ? ORDER BY version DESC",
        )
        .bind(article_id)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(revisions)
    }

    pub async fn get_revision(&self, article_id: &str, revision_id: &str, actor: &User) -> Result<ArticleRevision> {
        let article = load_article(&mut *self.db.pool.acquire().await?, article_id).await?;
        ensure_can_view(&article, actor)?;

        sqlx::query_as::<_, ArticleRevision>(
            "SELECT * FROM article_revisions WHERE id = ? AND article_id = ?",
        )
        .bind(revision_id)
        .bind(article_id)
        .fetch_optional(&self.db.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Revision"))
    }

    /// 手动保存修订：先保存当前内容，再写入新内容（仅作者）
    pub async fn create_revision(
        &self,
        article_id: &str,
        actor: &User,
        request: CreateRevisionRequest,
    ) -> Result<(Article, ArticleRevision)> {
        let mut tx = self.db.begin().await?;

        let article = load_article(&mut tx, article_id).await?;
        ensure_author(&article, actor)?;

        let revision = Self::record_revision(
            &mut tx,
            article_id,
            &ArticleSnapshot::from(&article),
            request.change_log.as_deref(),
        )
        .await?;

        let next = ArticleSnapshot {
            title: request.title,
            content: request.content,
            excerpt: request.excerpt,
        };
        let article = overwrite_content(&mut tx, article_id, &next).await?;

        tx.commit().await?;
        info!("Created revision v{} for article {}", revision.version, article_id);
        Ok((article, revision))
    }

    /// 恢复到指定修订：自动备份当前内容、覆盖、再记录一次恢复修订
    pub async fn restore(&self, article_id: &str, revision_id: &str, actor: &User) -> Result<RestoreOutcome> {
        let mut tx = self.db.begin().await?;

        let article = load_article(&mut tx, article_id).await?;
        ensure_author(&article, actor)?;

        let target = sqlx::query_as::<_, ArticleRevision>(
            "SELECT * FROM article_revisions WHERE id = ? AND article_id = ?",
        )
        .bind(revision_id)
        .bind(article_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Revision"))?;

        let backup = Self::record_revision(
            &mut tx,
            article_id,
            &ArticleSnapshot::from(&article),
            Some(BACKUP_CHANGE_LOG),
        )
        .await?;

        let snapshot = ArticleSnapshot::from(&target);
        let article = overwrite_content(&mut tx, article_id, &snapshot).await?;

        let restored = Self::record_revision(
            &mut tx,
            article_id,
            &snapshot,
            Some(&format!("Restored from revision {}", target.version)),
        )
        .await?;

        tx.commit().await?;
        info!(
            "Restored article {} to revision v{} (backup v{}, marker v{})",
            article_id, target.version, backup.version, restored.version
        );

        Ok(RestoreOutcome {
            article,
            backup,
            restored,
        })
    }
}

async fn load_article(conn: &mut SqliteConnection, article_id: &str) -> Result<Article> {
    sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE id = ? AND deleted_at IS NULL")
        .bind(article_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Article"))
}

async fn overwrite_content(
    conn: &mut SqliteConnection,
    article_id: &str,
    snapshot: &ArticleSnapshot,
) -> Result<Article> {
    let article = sqlx::query_as::<_, Article>(
        r#"
        UPDATE articles SET title = ?, content = ?, excerpt = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&snapshot.title)
    .bind(&snapshot.content)
    .bind(&snapshot.excerpt)
    .bind(Utc::now())
    .bind(article_id)
    .fetch_all(&mut *conn)
    .await?
    .pop()
    .ok_or_else(|| AppError::internal("Write did not return a row"))?;
    Ok(article)
}

fn ensure_can_view(article: &Article, actor: &User) -> Result<()> {
    if article.author_id == actor.id || actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden("Not authorized to view revisions of this article"))
    }
}

fn ensure_author(article: &Article, actor: &User) -> Result<()> {
    if article.author_id == actor.id {
        Ok(())
    } else {
        Err(AppError::forbidden("Only the author can modify this article"))
    }
}
