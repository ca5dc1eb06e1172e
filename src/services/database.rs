use crate::config::Config;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};

/// 数据库服务
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    /// 根据配置创建连接池并执行迁移
    pub async fn new(config: &Config) -> Result<Self> {
        Self::connect(&config.database_url, config.database_max_connections).await
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        info!("Initializing database connection to {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// 验证数据库连接
    pub async fn verify_connection(&self) -> Result<()> {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => {
                info!("Database connection verified successfully");
                Ok(())
            }
            Err(e) => {
                error!("Failed to verify database connection: {}", e);
                Err(e.into())
            }
        }
    }

    /// 开始写事务
    ///
    /// 首条语句即申请写锁（与 `BEGIN IMMEDIATE` 等价）：此时事务尚未读取快照，
    /// 锁被占用时由 busy_timeout 等待，而不是在先读后写时以 SQLITE_BUSY_SNAPSHOT 失败。
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE outbox_events SET dispatched_at = dispatched_at WHERE 0")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

/// 分页参数（已归一化）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

impl PageRequest {
    pub const MAX_PER_PAGE: usize = 100;

    /// 页码上限，保证 offset 不溢出 i64
    pub const MAX_PAGE: usize = (i64::MAX as usize) / Self::MAX_PER_PAGE;

    pub fn new(page: Option<usize>, limit: Option<usize>, default_per_page: usize) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, Self::MAX_PAGE),
            per_page: limit
                .unwrap_or(default_per_page)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page).min(i64::MAX as usize) as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// 分页结果结构
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

impl<T> PaginatedResult<T> {
    pub fn new(data: Vec<T>, total: i64, request: PageRequest) -> Self {
        let total = total.max(0) as usize;
        Self {
            data,
            total,
            page: request.page,
            per_page: request.per_page,
            total_pages: (total + request.per_page - 1) / request.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_normalizes_input() {
        let request = PageRequest::new(Some(0), Some(1000), 20);
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, PageRequest::MAX_PER_PAGE);
        assert_eq!(request.offset(), 0);

        let request = PageRequest::new(Some(3), None, 10);
        assert_eq!(request.offset(), 20);
        assert_eq!(request.limit(), 10);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let request = PageRequest::new(Some(usize::MAX), Some(100), 20);
        assert_eq!(request.page, PageRequest::MAX_PAGE);
        assert!(request.offset() >= 0);
        assert!(request.offset() <= i64::MAX - request.limit());
    }

    #[test]
    fn total_pages_rounds_up() {
        let result = PaginatedResult::new(vec![1, 2, 3], 21, PageRequest::new(None, Some(10), 10));
        assert_eq!(result.total_pages, 3);

        let empty: PaginatedResult<i32> = PaginatedResult::new(vec![], 0, PageRequest::new(None, None, 10));
        assert_eq!(empty.total_pages, 0);
    }

    #[tokio::test]
    async fn test_database_connection() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("connect.db").display());
        let db = Database::connect(&url, 2).await.unwrap();
        assert!(db.verify_connection().await.is_ok());
    }

    #[tokio::test]
    async fn write_transactions_queue_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("locks.db").display());
        let db = Database::connect(&url, 4).await.unwrap();

        let mut first = db.begin().await.unwrap();
        sqlx::query("INSERT INTO outbox_events (id, event, created_at) VALUES ('a', '{}', '2024-01-01')")
            .execute(&mut *first)
            .await
            .unwrap();

        let pending = {
            let db = db.clone();
            tokio::spawn(async move {
                let mut second = db.begin().await?;
                let seen: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM outbox_events")
                    .fetch_one(&mut *second)
                    .await?;
                sqlx::query("INSERT INTO outbox_events (id, event, created_at) VALUES ('b', '{}', '2024-01-01')")
                    .execute(&mut *second)
                    .await?;
                second.commit().await?;
                Ok::<i64, crate::error::AppError>(seen)
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        first.commit().await.unwrap();

        // 第二个事务等到第一个提交后才取得写锁，因此能看到它的写入
        let seen = pending.await.unwrap().unwrap();
        assert_eq!(seen, 1);
    }
}
