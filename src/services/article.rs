use crate::{
    error::{AppError, Result},
    models::{article::*, clap::*, event::DomainEvent, revision::ArticleSnapshot},
    services::{
        database::{Database, PageRequest, PaginatedResult},
        RevisionService, TriggerService,
    },
    utils::slug::{generate_slug, make_slug_unique},
};
use chrono::Utc;
use serde_json::json;
use sqlx::{types::Json, QueryBuilder, Sqlite, SqliteConnection};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct ArticleService {
    db: Arc<Database>,
    triggers: TriggerService,
}

impl ArticleService {
    pub async fn new(db: Arc<Database>, triggers: TriggerService) -> Result<Self> {
        Ok(Self { db, triggers })
    }

    /// 创建文章
    pub async fn create_article(&self, author_id: &str, request: CreateArticleRequest) -> Result<Article> {
        debug!("Creating article for author: {}", author_id);
        request.validate()?;

        let publish = request.publish.unwrap_or(false);
        let now = Utc::now();
        let (status, published_at) = if publish {
            (ArticleStatus::Published, Some(now))
        } else {
            (ArticleStatus::Draft, None)
        };

        let mut tx = self.db.begin().await?;
        let slug = unique_slug(&mut tx, &request.title, None).await?;

        let article = sqlx::query_as::<_, Article>(
            r#"
            INSERT INTO articles (id, title, content, excerpt, slug, status, author_id, metadata, created_at, updated_at, published_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&request.title)
        .bind(&request.content)
        .bind(&request.excerpt)
        .bind(&slug)
        .bind(status)
        .bind(author_id)
        .bind(Json(request.metadata.clone().unwrap_or_else(|| json!({}))))
        .bind(now)
        .bind(now)
        .bind(published_at)
        .fetch_all(&mut *tx)
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("Write did not return a row"))?;

        let event = if publish {
            let event = DomainEvent::ArticlePublished {
                article_id: article.id.clone(),
                author_id: article.author_id.clone(),
            };
            Some((TriggerService::enqueue(&mut tx, &event).await?, event))
        } else {
            None
        };

        tx.commit().await?;
        info!("Created article {} ({})", article.id, article.slug);

        if let Some((event_id, event)) = event {
            self.triggers.dispatch(&event_id, &event).await;
        }

        Ok(article)
    }

    pub async fn get_article_by_id(&self, article_id: &str) -> Result<Option<Article>> {
        let article = sqlx::query_as::<_, Article>(
            "SELECT * FROM articles WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(article_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(article)
    }

    pub async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let article = sqlx::query_as::<_, Article>(
            "SELECT * FROM articles WHERE slug = ? AND deleted_at IS NULL",
        )
        .bind(slug)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(article)
    }

    /// 按访问者可见性过滤：草稿与归档只对作者可见
    pub fn ensure_visible(article: Article, viewer_id: Option<&str>) -> Result<Article> {
        if article.status.can_be_viewed_by_public() || viewer_id == Some(article.author_id.as_str()) {
            Ok(article)
        } else {
            Err(AppError::not_found("Article"))
        }
    }

    /// 已发布文章列表，按发布时间倒序
    pub async fn list_articles(&self, query: &ArticleQuery, default_per_page: usize) -> Result<PaginatedResult<Article>> {
        let page = PageRequest::new(query.page, query.limit, default_per_page);

        let mut count_query = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM articles WHERE status = 'PUBLISHED' AND deleted_at IS NULL",
        );
        let mut list_query = QueryBuilder::<Sqlite>::new(
            "SELECT * FROM articles WHERE status = 'PUBLISHED' AND deleted_at IS NULL",
        );
        if let Some(author) = query.author.as_deref() {
            count_query.push(" AND author_id = ").push_bind(author);
            list_query.push(" AND author_id = ").push_bind(author);
        }
        list_query
            .push(" ORDER BY published_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let total: i64 = count_query.build_query_scalar().fetch_one(&self.db.pool).await?;
        let articles = list_query
            .build_query_as::<Article>()
            .fetch_all(&self.db.pool)
            .await?;

        Ok(PaginatedResult::new(articles, total, page))
    }

    /// 作者自己的文章（含草稿与归档），按创建时间倒序
    pub async fn list_author_articles(
        &self,
        author_id: &str,
        query: &AuthorArticleQuery,
        default_per_page: usize,
    ) -> Result<PaginatedResult<Article>> {
        let page = PageRequest::new(query.page, query.limit, default_per_page);

        let mut count_query = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM articles WHERE deleted_at IS NULL AND author_id = ",
        );
        let mut list_query = QueryBuilder::<Sqlite>::new(
            "SELECT * FROM articles WHERE deleted_at IS NULL AND author_id = ",
        );
        count_query.push_bind(author_id);
        list_query.push_bind(author_id);
        if let Some(status) = query.status {
            count_query.push(" AND status = ").push_bind(status);
            list_query.push(" AND status = ").push_bind(status);
        }
        list_query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let total: i64 = count_query.build_query_scalar().fetch_one(&self.db.pool).await?;
        let articles = list_query
            .build_query_as::<Article>()
            .fetch_all(&self.db.pool)
            .await?;

        Ok(PaginatedResult::new(articles, total, page))
    }

    /// 搜索已发布文章：标题、正文或作者名包含关键词（不区分大小写）
    pub async fn search_articles(&self, query: &SearchQuery, default_per_page: usize) -> Result<PaginatedResult<Article>> {
        debug!("Searching articles for {:?}", query.q);
        let page = PageRequest::new(query.page, query.limit, default_per_page);
        let pattern = like_pattern(query.q.trim());

        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*)");
        let mut list_query = QueryBuilder::<Sqlite>::new("SELECT a.*");
        for builder in [&mut count_query, &mut list_query] {
            builder
                .push(
                    " FROM articles a JOIN users u ON u.id = a.author_id \
                     WHERE a.status = 'PUBLISHED' AND a.deleted_at IS NULL AND (a.title LIKE ",
                )
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR a.content LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR u.name LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\')");
            if let Some(author) = query.author.as_deref() {
                builder.push(" AND a.author_id = ").push_bind(author.to_string());
            }
        }
        list_query
            .push(" ORDER BY a.created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let total: i64 = count_query.build_query_scalar().fetch_one(&self.db.pool).await?;
        let articles = list_query
            .build_query_as::<Article>()
            .fetch_all(&self.db.pool)
            .await?;

        Ok(PaginatedResult::new(articles, total, page))
    }

    /// 更新文章；修改标题、正文或摘要时先保存修改前的修订
    pub async fn update_article(&self, article_id: &str, author_id: &str, request: UpdateArticleRequest) -> Result<Article> {
        debug!("Updating article {} by {}", article_id, author_id);
        request.validate()?;

        let mut tx = self.db.begin().await?;
        let current = load_owned_article(&mut tx, article_id, author_id).await?;

        if request.touches_content() {
            RevisionService::record_revision(
                &mut tx,
                article_id,
                &ArticleSnapshot::from(&current),
                request.change_log.as_deref(),
            )
            .await?;
        }

        let title = request.title.clone().unwrap_or_else(|| current.title.clone());
        let slug = if title != current.title {
            unique_slug(&mut tx, &title, Some(article_id)).await?
        } else {
            current.slug.clone()
        };
        let content = request.content.clone().unwrap_or_else(|| current.content.clone());
        let excerpt = request.excerpt.clone().or_else(|| current.excerpt.clone());
        let status = request.status.unwrap_or(current.status);
        let metadata = request.metadata.clone().unwrap_or_else(|| current.metadata.0.clone());

        let now = Utc::now();
        let first_publish = status == ArticleStatus::Published && current.published_at.is_none();
        let published_at = if first_publish { Some(now) } else { current.published_at };

        let article = sqlx::query_as::<_, Article>(
            r#"
            UPDATE articles
            SET title = ?, slug = ?, content = ?, excerpt = ?, status = ?, metadata = ?, updated_at = ?, published_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&title)
        .bind(&slug)
        .bind(&content)
        .bind(&excerpt)
        .bind(status)
        .bind(Json(metadata))
        .bind(now)
        .bind(published_at)
        .bind(article_id)
        .fetch_all(&mut *tx)
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("Write did not return a row"))?;

        let event = if first_publish {
            let event = DomainEvent::ArticlePublished {
                article_id: article.id.clone(),
                author_id: article.author_id.clone(),
            };
            Some((TriggerService::enqueue(&mut tx, &event).await?, event))
        } else {
            None
        };

        tx.commit().await?;
        info!("Updated article {}", article_id);

        if let Some((event_id, event)) = event {
            self.triggers.dispatch(&event_id, &event).await;
        }

        Ok(article)
    }

    /// 发布文章（已发布时直接返回）
    pub async fn publish_article(&self, article_id: &str, author_id: &str) -> Result<Article> {
        let mut tx = self.db.begin().await?;
        let current = load_owned_article(&mut tx, article_id, author_id).await?;

        if current.status == ArticleStatus::Published {
            return Ok(current);
        }

        let now = Utc::now();
        let article = sqlx::query_as::<_, Article>(
            r#"
            UPDATE articles SET status = 'PUBLISHED', published_at = COALESCE(published_at, ?), updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(article_id)
        .fetch_all(&mut *tx)
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("Write did not return a row"))?;

        let event = DomainEvent::ArticlePublished {
            article_id: article.id.clone(),
            author_id: article.author_id.clone(),
        };
        let event_id = TriggerService::enqueue(&mut tx, &event).await?;
        tx.commit().await?;

        info!("Published article {}", article_id);
        self.triggers.dispatch(&event_id, &event).await;

        Ok(article)
    }

    /// 软删除文章
    pub async fn delete_article(&self, article_id: &str, author_id: &str) -> Result<()> {
        let mut tx = self.db.begin().await?;
        load_owned_article(&mut tx, article_id, author_id).await?;

        sqlx::query("UPDATE articles SET deleted_at = ?, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(Utc::now())
            .bind(article_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("Deleted article {}", article_id);
        Ok(())
    }

    /// 切换鼓掌状态：没有有效记录时创建或恢复，否则软删除
    pub async fn toggle_clap(&self, article_id: &str, user_id: &str) -> Result<ClapResponse> {
        debug!("Toggling clap on article {} by {}", article_id, user_id);

        let mut tx = self.db.begin().await?;

        let article = sqlx::query_as::<_, Article>(
            "SELECT * FROM articles WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(article_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Article"))?;

        if article.status != ArticleStatus::Published {
            return Err(AppError::bad_request("Cannot clap an unpublished article"));
        }

        let active = sqlx::query_as::<_, Clap>(
            "SELECT * FROM claps WHERE article_id = ? AND user_id = ? AND deleted_at IS NULL",
        )
        .bind(article_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (clapped, event) = match active {
            Some(clap) => {
                sqlx::query("UPDATE claps SET deleted_at = ? WHERE id = ?")
                    .bind(Utc::now())
                    .bind(&clap.id)
                    .execute(&mut *tx)
                    .await?;

                let event = DomainEvent::ClapRemoved {
                    article_id: clap.article_id,
                    user_id: clap.user_id,
                    count: clap.count,
                };
                (false, Some(event))
            }
            None => {
                // 已有有效记录时（并发请求）不更新也不返回行
                let revived = sqlx::query_as::<_, Clap>(
                    r#"
                    INSERT INTO claps (id, article_id, user_id, count, created_at, deleted_at)
                    VALUES (?, ?, ?, 1, ?, NULL)
                    ON CONFLICT(article_id, user_id) DO UPDATE SET
                        count = excluded.count,
                        created_at = excluded.created_at,
                        deleted_at = NULL
                    WHERE claps.deleted_at IS NOT NULL
                    RETURNING *
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(article_id)
                .bind(user_id)
                .bind(Utc::now())
                .fetch_all(&mut *tx)
                .await?
                .pop();

                (true, revived.map(|clap| DomainEvent::ClapCreated { clap }))
            }
        };

        let event = match event {
            Some(event) => Some((TriggerService::enqueue(&mut tx, &event).await?, event)),
            None => None,
        };

        let claps = active_clap_count(&mut tx, article_id).await?;
        tx.commit().await?;

        if let Some((event_id, event)) = event {
            self.triggers.dispatch(&event_id, &event).await;
        }

        Ok(ClapResponse { clapped, claps })
    }

    /// 当前用户的鼓掌状态和有效鼓掌数
    pub async fn get_clap_status(&self, article_id: &str, user_id: Option<&str>) -> Result<ClapResponse> {
        let mut conn = self.db.pool.acquire().await?;
        let claps = active_clap_count(&mut conn, article_id).await?;

        let clapped = match user_id {
            Some(user_id) => {
                let found: Option<String> = sqlx::query_scalar(
                    "SELECT id FROM claps WHERE article_id = ? AND user_id = ? AND deleted_at IS NULL",
                )
                .bind(article_id)
                .bind(user_id)
                .fetch_optional(&mut *conn)
                .await?;
                found.is_some()
            }
            None => false,
        };

        Ok(ClapResponse { clapped, claps })
    }
}

async fn active_clap_count(conn: &mut SqliteConnection, article_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM claps WHERE article_id = ? AND deleted_at IS NULL",
    )
    .bind(article_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

async fn load_owned_article(conn: &mut SqliteConnection, article_id: &str, author_id: &str) -> Result<Article> {
    let article = sqlx::query_as::<_, Article>(
        "SELECT * FROM articles WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(article_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Article"))?;

    if article.author_id != author_id {
        return Err(AppError::forbidden("Only the author can modify this article"));
    }
    Ok(article)
}

/// 生成未被占用的 slug；`exclude_id` 为正在修改的文章
async fn unique_slug(conn: &mut SqliteConnection, title: &str, exclude_id: Option<&str>) -> Result<String> {
    let base = generate_slug(title);

    let taken: Vec<String> = sqlx::query_scalar(
        "SELECT slug FROM articles WHERE (slug = ? OR slug LIKE ?) AND id <> COALESCE(?, '')",
    )
    .bind(&base)
    .bind(format!("{}-%", base))
    .bind(exclude_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(make_slug_unique(&base, &taken))
}

/// 转义 LIKE 通配符后两侧加 %
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
        assert_eq!(like_pattern(""), "%%");
    }
}
