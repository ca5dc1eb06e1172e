use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub log_level: String,
    pub log_format: String,

    // Database configuration
    pub database_url: String,
    pub database_max_connections: u32,

    // Authentication configuration
    pub jwt_secret: String,

    // Content settings
    pub max_comment_length: usize,
    pub default_articles_per_page: usize,
    pub default_notifications_per_page: usize,

    // Feature flags
    pub enable_comments: bool,
    pub replay_outbox_on_startup: bool,
    /// 已分发事件的保留时长（小时）
    pub outbox_retention_hours: i64,

    // CORS configuration
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "wordflow=debug,tower_http=debug".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://wordflow.db".to_string()),
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,

            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?,

            max_comment_length: env::var("MAX_COMMENT_LENGTH")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,
            default_articles_per_page: env::var("DEFAULT_ARTICLES_PER_PAGE")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,
            default_notifications_per_page: env::var("DEFAULT_NOTIFICATIONS_PER_PAGE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,

            enable_comments: env::var("ENABLE_COMMENTS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            replay_outbox_on_startup: env::var("REPLAY_OUTBOX_ON_STARTUP")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            outbox_retention_hours: env::var("OUTBOX_RETENTION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            environment: "development".to_string(),
            log_level: "wordflow=debug".to_string(),
            log_format: "pretty".to_string(),
            database_url: "sqlite://wordflow.db".to_string(),
            database_max_connections: 5,
            jwt_secret: "development-secret".to_string(),
            max_comment_length: 5000,
            default_articles_per_page: 20,
            default_notifications_per_page: 10,
            enable_comments: true,
            replay_outbox_on_startup: true,
            outbox_retention_hours: 24,
            cors_allowed_origins: "http://localhost:3001".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_development() {
        let config = Config::default();
        assert!(config.is_development());
        assert!(!config.is_production());
        assert!(!config.json_logs());
    }

    #[test]
    fn json_log_format_is_case_insensitive() {
        let config = Config {
            log_format: "JSON".to_string(),
            ..Config::default()
        };
        assert!(config.json_logs());
    }
}
