use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub metadata: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotificationRequest {
    pub recipient_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Clap,
    Comment,
    Reply,
    Follow,
    Achievement,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub is_read: Option<bool>,
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
}

/// 批量操作的作用范围
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationSelection {
    Single(String),
    Many(Vec<String>),
    /// 标记已读时表示“全部未读”，删除时表示“全部已读”
    All,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub notification_ids: Option<Vec<String>>,
    pub mark_all: Option<bool>,
}

impl MarkReadRequest {
    pub fn selection(self) -> Option<NotificationSelection> {
        if self.mark_all.unwrap_or(false) {
            return Some(NotificationSelection::All);
        }
        self.notification_ids.map(NotificationSelection::Many)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNotificationsRequest {
    pub notification_ids: Option<Vec<String>>,
    pub delete_all_read: Option<bool>,
}

impl DeleteNotificationsRequest {
    pub fn selection(self) -> Option<NotificationSelection> {
        if self.delete_all_read.unwrap_or(false) {
            return Some(NotificationSelection::All);
        }
        self.notification_ids.map(NotificationSelection::Many)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_all_wins_over_ids() {
        let request = MarkReadRequest {
            notification_ids: Some(vec!["a".into()]),
            mark_all: Some(true),
        };
        assert_eq!(request.selection(), Some(NotificationSelection::All));
    }

    #[test]
    fn empty_requests_select_nothing() {
        assert_eq!(MarkReadRequest::default().selection(), None);
        assert_eq!(DeleteNotificationsRequest::default().selection(), None);
    }

    #[test]
    fn delete_request_uses_camel_case_fields() {
        let request: DeleteNotificationsRequest =
            serde_json::from_str(r#"{"notificationIds": ["n1", "n2"]}"#).unwrap();
        assert_eq!(
            request.selection(),
            Some(NotificationSelection::Many(vec!["n1".into(), "n2".into()]))
        );
    }
}
