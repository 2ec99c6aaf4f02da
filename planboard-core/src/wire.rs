/// JSON shapes exchanged with the remote board store and the chat endpoint.
///
/// Resource surface (relative to the configured API base):
///   GET    /columns                 -> [RemoteColumn]
///   POST   /columns                 <- ColumnUpdate
///   PUT    /columns/{id}            <- ColumnUpdate
///   DELETE /columns/{id}
///   GET    /tasks?column_id={id}    -> [RemoteTask]
///   POST   /tasks                   <- TaskUpdate
///   PUT    /tasks/{id}              <- TaskUpdate
///   DELETE /tasks/{id}
///   GET    /tasks/{id}/labels       -> [RemoteLabel]
///   POST   /tasks/{id}/labels       <- LabelsBody (replaces the set)
///   POST   /chat                    <- ChatRequest -> ChatReply
use serde::{Deserialize, Serialize};

use crate::types::Label;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteColumn {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTask {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub order: i64,
    pub column_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteLabel {
    pub id: u64,
    pub text: String,
    pub color: String,
}

impl From<RemoteLabel> for Label {
    fn from(remote: RemoteLabel) -> Self {
        Label {
            id: remote.id.to_string(),
            text: remote.text,
            color: remote.color,
        }
    }
}

/// Body for creating or updating a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnUpdate {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCreate {
    pub text: String,
    pub color: String,
}

impl From<&Label> for LabelCreate {
    fn from(label: &Label) -> Self {
        LabelCreate {
            text: label.text.clone(),
            color: label.color.clone(),
        }
    }
}

/// Body for creating or updating a task. Absent fields are left untouched by
/// the store; `labels: Some(vec![])` clears every label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<LabelCreate>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelsBody {
    pub labels: Vec<LabelCreate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub status: ChatStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenUsage>,
}

impl ChatReply {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ChatStatus::Error,
            message: message.into(),
            reasoning: None,
            tokens: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ChatStatus::Success
    }
}

/// One frame of a streamed chat reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub delta: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_update_skips_absent_fields() {
        let update = TaskUpdate {
            completed: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "completed": true }));
    }

    #[test]
    fn test_task_update_sends_empty_label_set() {
        let update = TaskUpdate {
            title: Some("A".to_string()),
            labels: Some(Vec::new()),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["labels"], serde_json::json!([]));
    }

    #[test]
    fn test_remote_task_tolerates_missing_optional_fields() {
        let task: RemoteTask =
            serde_json::from_str(r#"{"id": 3, "title": "T", "column_id": 1}"#).unwrap();
        assert_eq!(task.order, 0);
        assert!(!task.completed);
        assert_eq!(task.description, None);
    }

    #[test]
    fn test_chat_reply_decodes_backend_shape() {
        let reply: ChatReply = serde_json::from_str(
            r#"{"status":"success","message":"hi","tokens":{"prompt_tokens":1,"completion_tokens":2,"total_tokens":3}}"#,
        )
        .unwrap();
        assert!(reply.is_success());
        assert_eq!(reply.tokens.unwrap().total_tokens, 3);
    }
}
