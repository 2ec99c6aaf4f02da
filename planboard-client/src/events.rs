/// Events a board session publishes to its observers.
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A non-blocking user-facing notification (toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "notice", rename_all = "snake_case")]
pub enum BoardEvent {
    /// The cached board changed; observers should re-render from a snapshot.
    Changed,
    Notice(Notice),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(BoardEvent::Changed).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "changed" }));

        let notice = Notice::error("Could not move the task");
        assert!(notice.is_error());
        let json = serde_json::to_value(BoardEvent::Notice(notice)).unwrap();
        assert_eq!(json["type"], "notice");
        assert_eq!(json["notice"]["level"], "error");
        assert_eq!(json["notice"]["message"], "Could not move the task");
    }
}
