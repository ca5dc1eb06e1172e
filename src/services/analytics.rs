use crate::{
    error::{AppError, Result},
    models::{analytics::*, article::Article},
    services::{auth::User, BookmarkService, Database, FollowService, ReadingService},
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// 时间序列窗口：今天往前 30 天到今天（含）
pub const TIME_SERIES_DAYS: i64 = 30;

const DASHBOARD_RECENT_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct AnalyticsService {
    db: Arc<Database>,
    follow_service: FollowService,
    reading_service: ReadingService,
    bookmark_service: BookmarkService,
}

impl AnalyticsService {
    pub async fn new(
        db: Arc<Database>,
        follow_service: FollowService,
        reading_service: ReadingService,
        bookmark_service: BookmarkService,
    ) -> Result<Self> {
        Ok(Self {
            db,
            follow_service,
            reading_service,
            bookmark_service,
        })
    }

    /// 文章分析报告（作者或管理员）
    pub async fn get_article_analytics(&self, article_id: &str, viewer: &User) -> Result<ArticleAnalyticsReport> {
        debug!("Building analytics for article {}", article_id);

        let article = sqlx::query_as::<_, Article>(
            "SELECT * FROM articles WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(article_id)
        .fetch_optional(&self.db.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Article"))?;

        if article.author_id != viewer.id && !viewer.is_admin() {
            return Err(AppError::forbidden("Not authorized to view analytics for this article"));
        }

        let stored = sqlx::query_as::<_, ArticleAnalytics>(
            "SELECT * FROM article_analytics WHERE article_id = ?",
        )
        .bind(article_id)
        .fetch_optional(&self.db.pool)
        .await?;

        let reads: Vec<(i64, DateTime<Utc>)> = sqlx::query_as(
            "SELECT read_time, created_at FROM read_history WHERE article_id = ?",
        )
        .bind(article_id)
        .fetch_all(&self.db.pool)
        .await?;

        let claps: Vec<(i64, DateTime<Utc>)> = sqlx::query_as(
            "SELECT count, created_at FROM claps WHERE article_id = ? AND deleted_at IS NULL",
        )
        .bind(article_id)
        .fetch_all(&self.db.pool)
        .await?;

        let comments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE article_id = ?")
            .bind(article_id)
            .fetch_one(&self.db.pool)
            .await?;

        let bookmarks: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookmarks WHERE article_id = ? AND deleted_at IS NULL",
        )
        .bind(article_id)
        .fetch_one(&self.db.pool)
        .await?;

        let clap_total: i64 = claps.iter().map(|(count, _)| *count).sum();
        let counts = EngagementCounts {
            views: article.view_count,
            reads: reads.len() as i64,
            comments,
            claps: clap_total,
            bookmarks,
        };

        let read_dates: Vec<DateTime<Utc>> = reads.iter().map(|(_, at)| *at).collect();
        let clap_dates: Vec<DateTime<Utc>> = claps.iter().map(|(_, at)| *at).collect();
        let time_series = build_time_series(
            Utc::now().date_naive(),
            article.published_at,
            article.view_count,
            &read_dates,
            &clap_dates,
        );

        let (unique_views, average_read_time, completion_rate, referrals, devices, geography) = match &stored {
            Some(analytics) => (
                analytics.unique_views,
                analytics.average_read_time,
                analytics.completion_rate,
                parse_blob(article_id, "referral_sources", analytics.referral_sources.as_deref()),
                parse_blob(article_id, "device_breakdown", analytics.device_breakdown.as_deref()),
                parse_blob(article_id, "geographic_data", analytics.geographic_data.as_deref()),
            ),
            None => (0, 0.0, 0.0, json!({}), json!({}), json!({})),
        };

        Ok(ArticleAnalyticsReport {
            article: ArticleSummary {
                id: article.id.clone(),
                title: article.title.clone(),
                slug: article.slug.clone(),
                created_at: article.created_at,
                published_at: article.published_at,
            },
            views: ViewStats {
                total: article.view_count,
                unique: unique_views,
            },
            read_metrics: ReadMetrics {
                total_reads: counts.reads,
                average_read_time,
                completion_rate,
                read_time_distribution: read_time_distribution(reads.iter().map(|(secs, _)| *secs)),
            },
            engagement: EngagementStats {
                comments,
                claps: ClapStats {
                    total: clap_total,
                    unique_clappers: claps.len() as i64,
                },
                bookmarks,
                engagement_score: engagement_score(&counts),
            },
            referrals,
            devices,
            geography,
            views_estimated: true,
            time_series,
        })
    }

    /// 用户仪表盘，仅本人可见
    pub async fn get_user_dashboard(&self, user_id: &str, viewer: &User) -> Result<UserDashboard> {
        if viewer.id != user_id {
            return Err(AppError::forbidden("Not authorized to view this dashboard"));
        }

        let articles = sqlx::query_as::<_, DashboardArticle>(
            r#"
            SELECT a.id, a.title, a.slug, a.published_at, a.view_count,
                (SELECT COALESCE(SUM(c.count), 0) FROM claps c WHERE c.article_id = a.id AND c.deleted_at IS NULL) AS claps,
                (SELECT COUNT(*) FROM comments m WHERE m.article_id = a.id) AS comments,
                (SELECT COUNT(*) FROM read_history r WHERE r.article_id = a.id) AS reads
            FROM articles a
            WHERE a.author_id = ? AND a.status = 'PUBLISHED' AND a.deleted_at IS NULL
            ORDER BY a.published_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;

        let stats = articles.iter().fold(DashboardStats::default(), |mut stats, article| {
            stats.total_claps += article.claps;
            stats.total_comments += article.comments;
            stats.total_reads += article.reads;
            stats
        });

        let (followers, following) = self.follow_service.get_follow_counts(user_id).await?;
        let read_history = self.reading_service.recent_history(user_id, DASHBOARD_RECENT_LIMIT).await?;
        let bookmarks = self.bookmark_service.recent_bookmarks(user_id, DASHBOARD_RECENT_LIMIT).await?;

        let clap_rows: Vec<(i64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT c.count, c.created_at FROM claps c
            JOIN articles a ON a.id = c.article_id
            WHERE a.author_id = ? AND a.deleted_at IS NULL AND c.deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;

        let read_dates: Vec<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT r.created_at FROM read_history r
            JOIN articles a ON a.id = r.article_id
            WHERE a.author_id = ? AND a.deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(UserDashboard {
            stats,
            articles,
            follow_counts: FollowCounts { followers, following },
            read_history,
            bookmarks,
            engagement_trends: engagement_trends(Utc::now().date_naive(), &clap_rows, &read_dates),
        })
    }
}

/// 阅读时长分布，区间左闭右开
pub fn read_time_distribution(read_times: impl IntoIterator<Item = i64>) -> ReadTimeDistribution {
    let mut distribution = ReadTimeDistribution::default();
    for secs in read_times {
        let bucket = match secs {
            s if s < 30 => &mut distribution.under_30s,
            s if s < 60 => &mut distribution.from_30s_to_1m,
            s if s < 180 => &mut distribution.from_1m_to_3m,
            s if s < 300 => &mut distribution.from_3m_to_5m,
            s if s < 600 => &mut distribution.from_5m_to_10m,
            _ => &mut distribution.over_10m,
        };
        *bucket += 1;
    }
    distribution
}

/// 参与度评分 0..=100
///
/// 各项比率 = 次数 / 浏览量，权重为阅读 3、评论 5、鼓掌 2、收藏 4，
/// 加权和乘以 100 后截断到 [0, 100] 并四舍五入。浏览量为 0 时评分为 0。
pub fn engagement_score(counts: &EngagementCounts) -> i64 {
    if counts.views <= 0 {
        return 0;
    }

    let views = counts.views as f64;
    let rate = |n: i64| n.max(0) as f64 / views;
    let weighted = rate(counts.reads) * 3.0
        + rate(counts.comments) * 5.0
        + rate(counts.claps) * 2.0
        + rate(counts.bookmarks) * 4.0;

    (weighted * 100.0).clamp(0.0, 100.0).round() as i64
}

fn window(today: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let start = today - Duration::days(TIME_SERIES_DAYS);
    start.iter_days().take_while(move |day| *day <= today)
}

/// 最近 31 天的时间序列
///
/// 浏览量没有按天记录，用累计浏览量在发布日（或窗口起点）到今天之间整除平均分摊。
pub fn build_time_series(
    today: NaiveDate,
    published_at: Option<DateTime<Utc>>,
    total_views: i64,
    read_dates: &[DateTime<Utc>],
    clap_dates: &[DateTime<Utc>],
) -> Vec<TimeSeriesPoint> {
    let mut series: BTreeMap<NaiveDate, TimeSeriesPoint> = window(today)
        .map(|date| {
            (
                date,
                TimeSeriesPoint {
                    date,
                    estimated_views: 0,
                    reads: 0,
                    claps: 0,
                },
            )
        })
        .collect();

    if let Some(published_at) = published_at {
        let window_start = today - Duration::days(TIME_SERIES_DAYS);
        let spread_from = published_at.date_naive().max(window_start);
        if spread_from <= today {
            let days = (today - spread_from).num_days() + 1;
            let per_day = total_views.max(0) / days;
            for point in series.range_mut(spread_from..=today).map(|(_, point)| point) {
                point.estimated_views = per_day;
            }
        }
    }

    for at in read_dates {
        if let Some(point) = series.get_mut(&at.date_naive()) {
            point.reads += 1;
        }
    }
    for at in clap_dates {
        if let Some(point) = series.get_mut(&at.date_naive()) {
            point.claps += 1;
        }
    }

    series.into_values().collect()
}

/// 最近 31 天的每日鼓掌数（按次数求和）与阅读数
pub fn engagement_trends(
    today: NaiveDate,
    claps: &[(i64, DateTime<Utc>)],
    read_dates: &[DateTime<Utc>],
) -> Vec<DailyEngagement> {
    let mut trends: BTreeMap<NaiveDate, DailyEngagement> = window(today)
        .map(|date| (date, DailyEngagement { date, claps: 0, reads: 0 }))
        .collect();

    for (count, at) in claps {
        if let Some(day) = trends.get_mut(&at.date_naive()) {
            day.claps += count;
        }
    }
    for at in read_dates {
        if let Some(day) = trends.get_mut(&at.date_naive()) {
            day.reads += 1;
        }
    }

    trends.into_values().collect()
}

fn parse_blob(article_id: &str, field: &str, raw: Option<&str>) -> Value {
    match raw {
        None => json!({}),
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!("Invalid {} JSON for article {}: {}", field, article_id, e);
            json!({})
        }),
    }
}
