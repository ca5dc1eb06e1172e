use crate::{
    config::Config,
    error::Result,
    services::{
        achievement::AchievementService,
        analytics::AnalyticsService,
        article::ArticleService,
        auth::AuthService,
        bookmark::BookmarkService,
        comment::CommentService,
        database::Database,
        follow::FollowService,
        notification::NotificationService,
        reading::ReadingService,
        revision::RevisionService,
        triggers::TriggerService,
        user::UserService,
    },
};
use std::sync::Arc;

/// 应用程序的共享状态
/// 包含所有服务和配置的引用
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 数据库连接
    pub db: Arc<Database>,

    pub auth_service: AuthService,
    pub user_service: UserService,
    pub article_service: ArticleService,
    pub comment_service: CommentService,
    pub reading_service: ReadingService,
    pub bookmark_service: BookmarkService,
    pub follow_service: FollowService,
    pub notification_service: NotificationService,
    pub achievement_service: AchievementService,
    pub revision_service: RevisionService,
    pub analytics_service: AnalyticsService,

    /// 副作用分发
    pub trigger_service: TriggerService,
}

impl AppState {
    /// 初始化所有服务
    pub async fn new(config: Config, db: Arc<Database>) -> Result<Self> {
        let auth_service = AuthService::new(&config).await?;
        let user_service = UserService::new(db.clone()).await?;
        let notification_service = NotificationService::new(db.clone()).await?;
        let achievement_service =
            AchievementService::new(db.clone(), notification_service.clone()).await?;
        let trigger_service = TriggerService::new(
            db.clone(),
            notification_service.clone(),
            achievement_service.clone(),
        )
        .await?;

        let article_service = ArticleService::new(db.clone(), trigger_service.clone()).await?;
        let comment_service =
            CommentService::new(db.clone(), trigger_service.clone(), config.max_comment_length).await?;
        let reading_service = ReadingService::new(db.clone(), trigger_service.clone()).await?;
        let bookmark_service = BookmarkService::new(db.clone()).await?;
        let follow_service = FollowService::new(db.clone(), trigger_service.clone()).await?;
        let revision_service = RevisionService::new(db.clone()).await?;
        let analytics_service = AnalyticsService::new(
            db.clone(),
            follow_service.clone(),
            reading_service.clone(),
            bookmark_service.clone(),
        )
        .await?;

        Ok(Self {
            config,
            db,
            auth_service,
            user_service,
            article_service,
            comment_service,
            reading_service,
            bookmark_service,
            follow_service,
            notification_service,
            achievement_service,
            revision_service,
            analytics_service,
            trigger_service,
        })
    }

    /// 检查功能是否启用
    pub fn is_feature_enabled(&self, feature: &str) -> bool {
        match feature {
            "comments" => self.config.enable_comments,
            _ => false,
        }
    }

    /// 获取分页配置
    pub fn get_page_size(&self, resource_type: &str) -> usize {
        match resource_type {
            "articles" => self.config.default_articles_per_page,
            "notifications" => self.config.default_notifications_per_page,
            _ => 20,
        }
    }
}
