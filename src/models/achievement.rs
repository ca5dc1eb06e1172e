use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::convert::TryFrom;

use crate::error::AppError;

/// 成就达成条件
///
/// 存储格式为 `{"type": "ARTICLE_COUNT", "count": 5}`，
/// 在加载或创建时校验，评估阶段只面对合法的条件。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AchievementCriteria {
    ArticleCount { count: i64 },
    FollowerCount { count: i64 },
    ClapCount { count: i64 },
}

impl AchievementCriteria {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let criteria: Self = serde_json::from_str(raw)
            .map_err(|e| AppError::Validation(format!("Invalid achievement criteria: {}", e)))?;
        criteria.validate()
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, AppError> {
        let criteria: Self = serde_json::from_value(value)
            .map_err(|e| AppError::Validation(format!("Invalid achievement criteria: {}", e)))?;
        criteria.validate()
    }

    fn validate(self) -> Result<Self, AppError> {
        if self.threshold() < 0 {
            return Err(AppError::Validation(
                "Achievement threshold must not be negative".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn threshold(&self) -> i64 {
        match self {
            Self::ArticleCount { count }
            | Self::FollowerCount { count }
            | Self::ClapCount { count } => *count,
        }
    }

    pub fn is_met(&self, stats: &UserStats) -> bool {
        match self {
            Self::ArticleCount { count } => stats.article_count >= *count,
            Self::FollowerCount { count } => stats.follower_count >= *count,
            Self::ClapCount { count } => stats.clap_total >= *count,
        }
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// 数据库中的原始行，criteria 仍是文本
#[derive(Debug, Clone, FromRow)]
pub struct AchievementRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub badge: String,
    pub criteria: String,
    pub points: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub badge: String,
    pub criteria: AchievementCriteria,
    pub points: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AchievementRow> for Achievement {
    type Error = AppError;

    fn try_from(row: AchievementRow) -> Result<Self, Self::Error> {
        let criteria = AchievementCriteria::parse(&row.criteria)?;
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            badge: row.badge,
            criteria,
            points: row.points,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAchievement {
    pub id: String,
    pub user_id: String,
    pub achievement_id: String,
    pub awarded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAchievementWithDetails {
    #[serde(flatten)]
    pub user_achievement: UserAchievement,
    pub achievement: Achievement,
}

/// 成就评估所需的用户聚合数据
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStats {
    pub article_count: i64,
    pub follower_count: i64,
    pub clap_total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAchievementRequest {
    pub name: String,
    pub description: String,
    pub badge: String,
    pub criteria: serde_json::Value,
    pub points: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAchievementRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub badge: Option<String>,
    pub criteria: Option<serde_json::Value>,
    pub points: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementQuery {
    pub user_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_criteria() {
        let criteria = AchievementCriteria::parse(r#"{"type":"FOLLOWER_COUNT","count":10}"#).unwrap();
        assert_eq!(criteria, AchievementCriteria::FollowerCount { count: 10 });
        assert_eq!(criteria.threshold(), 10);
    }

    #[test]
    fn rejects_unknown_criteria_type() {
        let err = AchievementCriteria::parse(r#"{"type":"COMMENT_COUNT","count":3}"#).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_negative_threshold() {
        let err = AchievementCriteria::from_value(serde_json::json!({"type": "CLAP_COUNT", "count": -1}))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn evaluates_against_matching_counter() {
        let stats = UserStats {
            article_count: 3,
            follower_count: 0,
            clap_total: 50,
        };

        assert!(AchievementCriteria::ArticleCount { count: 3 }.is_met(&stats));
        assert!(!AchievementCriteria::ArticleCount { count: 4 }.is_met(&stats));
        assert!(!AchievementCriteria::FollowerCount { count: 1 }.is_met(&stats));
        assert!(AchievementCriteria::ClapCount { count: 50 }.is_met(&stats));
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = AchievementCriteria::ClapCount { count: 100 }.to_json().unwrap();
        assert_eq!(json, r#"{"type":"CLAP_COUNT","count":100}"#);
    }
}
