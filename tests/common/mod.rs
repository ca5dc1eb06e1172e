#![allow(dead_code)]

use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wordflow::{
    config::Config,
    models::{
        achievement::{Achievement, CreateAchievementRequest},
        article::{Article, CreateArticleRequest},
        user::UserRole,
    },
    services::{auth::User, Database},
    state::AppState,
};

pub struct TestApp {
    pub state: Arc<AppState>,
    // 保持临时目录存活直到测试结束
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = Config {
            database_url: format!("sqlite://{}", dir.path().join("wordflow-test.db").display()),
            database_max_connections: 4,
            replay_outbox_on_startup: false,
            ..Config::default()
        };

        let db = Database::new(&config).await.expect("connect test database");
        let state = AppState::new(config, Arc::new(db))
            .await
            .expect("build app state");

        Self {
            state: Arc::new(state),
            _dir: dir,
        }
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.state.db.pool
    }

    pub async fn user(&self, id: &str) -> User {
        self.user_with_role(id, UserRole::User).await
    }

    pub async fn admin(&self, id: &str) -> User {
        self.user_with_role(id, UserRole::Admin).await
    }

    async fn user_with_role(&self, id: &str, role: UserRole) -> User {
        let user = User {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            name: Some(format!("User {}", id)),
            role,
        };
        self.state
            .user_service
            .ensure_profile(&user)
            .await
            .expect("seed user");
        user
    }

    pub async fn published_article(&self, author: &User, title: &str) -> Article {
        self.state
            .article_service
            .create_article(
                &author.id,
                CreateArticleRequest {
                    title: title.to_string(),
                    content: format!("Body of {}", title),
                    excerpt: Some(format!("About {}", title)),
                    publish: Some(true),
                    metadata: None,
                },
            )
            .await
            .expect("seed article")
    }

    pub async fn draft_article(&self, author: &User, title: &str) -> Article {
        self.state
            .article_service
            .create_article(
                &author.id,
                CreateArticleRequest {
                    title: title.to_string(),
                    content: format!("Draft body of {}", title),
                    excerpt: None,
                    publish: None,
                    metadata: None,
                },
            )
            .await
            .expect("seed draft")
    }

    pub async fn achievement(&self, name: &str, kind: &str, count: i64, points: i64) -> Achievement {
        let admin = self.admin("catalog-admin").await;
        self.state
            .achievement_service
            .create_achievement(
                &admin,
                CreateAchievementRequest {
                    name: name.to_string(),
                    description: format!("{} description", name),
                    badge: "🏅".to_string(),
                    criteria: json!({ "type": kind, "count": count }),
                    points: Some(points),
                },
            )
            .await
            .expect("seed achievement")
    }

    pub async fn reload_article(&self, id: &str) -> Article {
        sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_one(self.pool())
            .await
            .expect("reload article")
    }

    pub async fn notifications_of(&self, user_id: &str, kind: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND type = ?")
            .bind(user_id)
            .bind(kind)
            .fetch_one(self.pool())
            .await
            .expect("count notifications")
    }

    pub async fn user_counter(&self, user_id: &str, column: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT {} FROM users WHERE id = ?", column))
            .bind(user_id)
            .fetch_one(self.pool())
            .await
            .expect("read user counter")
    }
}
