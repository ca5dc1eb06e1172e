use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use super::{bookmark::Bookmark, read_history::ReadHistory};

/// 文章的累计统计（阅读记录写入时刷新）
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ArticleAnalytics {
    pub article_id: String,
    pub total_views: i64,
    pub unique_views: i64,
    /// 秒
    pub average_read_time: f64,
    /// 百分比 0..=100
    pub completion_rate: f64,
    pub referral_sources: Option<String>,
    pub device_breakdown: Option<String>,
    pub geographic_data: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// 参与度评分的原始输入
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngagementCounts {
    pub views: i64,
    pub reads: i64,
    pub comments: i64,
    pub claps: i64,
    pub bookmarks: i64,
}

/// 阅读时长分布，区间左闭右开
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadTimeDistribution {
    #[serde(rename = "0-30s")]
    pub under_30s: i64,
    #[serde(rename = "30s-1m")]
    pub from_30s_to_1m: i64,
    #[serde(rename = "1m-3m")]
    pub from_1m_to_3m: i64,
    #[serde(rename = "3m-5m")]
    pub from_3m_to_5m: i64,
    #[serde(rename = "5m-10m")]
    pub from_5m_to_10m: i64,
    #[serde(rename = "10m+")]
    pub over_10m: i64,
}

impl ReadTimeDistribution {
    pub fn total(&self) -> i64 {
        self.under_30s
            + self.from_30s_to_1m
            + self.from_1m_to_3m
            + self.from_3m_to_5m
            + self.from_5m_to_10m
            + self.over_10m
    }
}

/// 时间序列中的一天
///
/// `estimated_views` 由累计浏览量平均分摊得到，并非按天实测；
/// `reads` 与 `claps` 为按天分组的实际记录数。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub estimated_views: i64,
    pub reads: i64,
    pub claps: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewStats {
    pub total: i64,
    pub unique: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadMetrics {
    pub total_reads: i64,
    pub average_read_time: f64,
    pub completion_rate: f64,
    pub read_time_distribution: ReadTimeDistribution,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClapStats {
    pub total: i64,
    pub unique_clappers: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementStats {
    pub comments: i64,
    pub claps: ClapStats,
    pub bookmarks: i64,
    pub engagement_score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleAnalyticsReport {
    pub article: ArticleSummary,
    pub views: ViewStats,
    pub read_metrics: ReadMetrics,
    pub engagement: EngagementStats,
    pub referrals: serde_json::Value,
    pub devices: serde_json::Value,
    pub geography: serde_json::Value,
    /// 时间序列中的浏览量为估算值
    pub views_estimated: bool,
    pub time_series: Vec<TimeSeriesPoint>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_claps: i64,
    pub total_comments: i64,
    pub total_reads: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DashboardArticle {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub claps: i64,
    pub comments: i64,
    pub reads: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FollowCounts {
    pub followers: i64,
    pub following: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyEngagement {
    pub date: NaiveDate,
    pub claps: i64,
    pub reads: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDashboard {
    pub stats: DashboardStats,
    pub articles: Vec<DashboardArticle>,
    pub follow_counts: FollowCounts,
    pub read_history: Vec<ReadHistory>,
    pub bookmarks: Vec<Bookmark>,
    pub engagement_trends: Vec<DailyEngagement>,
}
