pub mod achievement;
pub mod analytics;
pub mod article;
pub mod auth;
pub mod bookmark;
pub mod comment;
pub mod database;
pub mod follow;
pub mod notification;
pub mod reading;
pub mod revision;
pub mod triggers;
pub mod user;

// 重新导出常用类型
pub use achievement::AchievementService;
pub use analytics::AnalyticsService;
pub use article::ArticleService;
pub use auth::AuthService;
pub use bookmark::BookmarkService;
pub use comment::CommentService;
pub use database::Database;
pub use follow::FollowService;
pub use notification::NotificationService;
pub use reading::ReadingService;
pub use revision::RevisionService;
pub use triggers::TriggerService;
pub use user::UserService;
