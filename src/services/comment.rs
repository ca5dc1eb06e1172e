use crate::{
    error::{AppError, Result},
    models::{article::ArticleStatus, comment::*, event::DomainEvent},
    services::{Database, TriggerService},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct CommentService {
    db: Arc<Database>,
    triggers: TriggerService,
    max_comment_length: usize,
}

impl CommentService {
    pub async fn new(db: Arc<Database>, triggers: TriggerService, max_comment_length: usize) -> Result<Self> {
        Ok(Self {
            db,
            triggers,
            max_comment_length,
        })
    }

    /// 创建评论或回复
    pub async fn create_comment(&self, article_id: &str, author_id: &str, request: CreateCommentRequest) -> Result<Comment> {
        debug!("Creating comment on article {} by {}", article_id, author_id);
        request.validate()?;

        let content = request.content.trim();
        if content.is_empty() {
            return Err(AppError::validation("Comment content cannot be empty"));
        }
        if content.chars().count() > self.max_comment_length {
            return Err(AppError::Validation(format!(
                "Comment cannot exceed {} characters",
                self.max_comment_length
            )));
        }

        let mut tx = self.db.begin().await?;

        let status: Option<ArticleStatus> = sqlx::query_scalar(
            "SELECT status FROM articles WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(article_id)
        .fetch_optional(&mut *tx)
        .await?;

        match status {
            None => return Err(AppError::not_found("Article")),
            Some(status) if status != ArticleStatus::Published => {
                return Err(AppError::bad_request("Cannot comment on an unpublished article"));
            }
            Some(_) => {}
        }

        if let Some(parent_id) = &request.parent_id {
            let parent_article: Option<String> =
                sqlx::query_scalar("SELECT article_id FROM comments WHERE id = ?")
                    .bind(parent_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            match parent_article {
                None => return Err(AppError::not_found("Parent comment")),
                Some(parent_article) if parent_article != article_id => {
                    return Err(AppError::bad_request("Parent comment belongs to another article"));
                }
                Some(_) => {}
            }
        }

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, article_id, author_id, parent_id, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(article_id)
        .bind(author_id)
        .bind(&request.parent_id)
        .bind(content)
        .bind(Utc::now())
        .fetch_all(&mut *tx)
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("Write did not return a row"))?;

        let event = DomainEvent::CommentCreated {
            comment: comment.clone(),
        };
        let event_id = TriggerService::enqueue(&mut tx, &event).await?;
        tx.commit().await?;

        info!("Created comment {} on article {}", comment.id, article_id);
        self.triggers.dispatch(&event_id, &event).await;

        Ok(comment)
    }

    /// 文章的评论，按时间正序
    pub async fn list_comments(&self, article_id: &str) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE article_id = ? ORDER BY created_at ASC",
        )
        .bind(article_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(comments)
    }
}
