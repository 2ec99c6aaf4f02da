/// Chat proxy client.
///
/// Sends the whole conversation to `{api}/chat` and returns one reply.
/// Streamed (`text/event-stream`) replies are accumulated frame by frame
/// before being surfaced. Failures never escape as errors: they come back
/// as a reply with `status = error` and a generic message.
use std::time::Duration;

use futures_util::StreamExt;
use planboard_core::wire::{ChatChunk, ChatMessage, ChatReply, ChatRequest, ChatRole, ChatStatus};

pub const UNAVAILABLE_MESSAGE: &str = "Unable to connect to AI assistant. Please try again later.";

#[derive(Debug, thiserror::Error)]
enum ChatError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("malformed reply: {0}")]
    Decode(String),
}

#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl ChatClient {
    pub fn new(api_base: &str, model: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat", api_base.trim_end_matches('/')),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn send(&self, messages: &[ChatMessage]) -> ChatReply {
        match self.try_send(messages).await {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("[planboard.chat] chat request failed: {}", e);
                ChatReply::error(UNAVAILABLE_MESSAGE)
            }
        }
    }

    async fn try_send(&self, messages: &[ChatMessage]) -> Result<ChatReply, ChatError> {
        let request = ChatRequest {
            messages: messages.to_vec(),
            model: self.model.clone(),
        };
        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(ChatError::Status(response.status().as_u16()));
        }

        let is_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        if is_stream {
            let mut accumulator = StreamAccumulator::default();
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                accumulator.push_bytes(&chunk?)?;
                if accumulator.finished {
                    break;
                }
            }
            accumulator.finish()
        } else {
            let bytes = response.bytes().await?;
            serde_json::from_slice::<ChatReply>(&bytes).map_err(|e| ChatError::Decode(e.to_string()))
        }
    }
}

/// Collects server-sent `data:` frames into a single reply.
#[derive(Default)]
struct StreamAccumulator {
    pending: Vec<u8>,
    message: String,
    reasoning: String,
    finished: bool,
}

impl StreamAccumulator {
    fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), ChatError> {
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            self.push_line(line.trim_end_matches(['\r', '\n']))?;
        }
        Ok(())
    }

    fn push_line(&mut self, line: &str) -> Result<(), ChatError> {
        let Some(data) = line.strip_prefix("data:") else {
            // comments, event names and blank separators carry no content
            return Ok(());
        };
        let data = data.trim();
        if data.is_empty() {
            return Ok(());
        }
        if data == "[DONE]" {
            self.finished = true;
            return Ok(());
        }
        let chunk: ChatChunk =
            serde_json::from_str(data).map_err(|e| ChatError::Decode(e.to_string()))?;
        if let Some(delta) = chunk.delta {
            self.message.push_str(&delta);
        }
        if let Some(reasoning) = chunk.reasoning {
            self.reasoning.push_str(&reasoning);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<ChatReply, ChatError> {
        if !self.pending.is_empty() {
            let rest = String::from_utf8_lossy(&std::mem::take(&mut self.pending)).into_owned();
            self.push_line(rest.trim())?;
        }
        Ok(ChatReply {
            status: ChatStatus::Success,
            message: self.message,
            reasoning: (!self.reasoning.is_empty()).then_some(self.reasoning),
            tokens: None,
        })
    }
}

/// Ordered chat history for the floating chat widget.
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn with_system_prompt(prompt: &str) -> Self {
        Self {
            messages: vec![ChatMessage::system(prompt)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send one user message and record the reply. Blank input is ignored
    /// and returns `None`. Failed replies are shown but kept out of the
    /// history sent on later turns.
    pub async fn ask(&mut self, client: &ChatClient, input: &str) -> Option<ChatReply> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        self.messages.push(ChatMessage::user(input));
        let reply = client.send(&self.messages).await;
        if reply.is_success() {
            self.messages.push(ChatMessage::assistant(reply.message.clone()));
        }
        Some(reply)
    }

    pub fn transcript(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.role != ChatRole::System)
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{spawn_mock, ChatMode};
    use planboard_core::storage::memory::MemoryStore;

    fn client(base: &str) -> ChatClient {
        ChatClient::new(base, "test-model", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_accumulator_handles_split_frames() {
        let mut acc = StreamAccumulator::default();
        acc.push_bytes(b"data: {\"delta\":\"Hel").unwrap();
        acc.push_bytes(b"lo\"}\n\ndata: {\"delta\":\" world\",\"reasoning\":\"why\"}\n").unwrap();
        acc.push_bytes(b": keep-alive\n\ndata: [DONE]\n\n").unwrap();
        assert!(acc.finished);
        let reply = acc.finish().unwrap();
        assert_eq!(reply.message, "Hello world");
        assert_eq!(reply.reasoning.as_deref(), Some("why"));
    }

    #[tokio::test]
    async fn test_json_reply() {
        let mock = spawn_mock(MemoryStore::new()).await;
        mock.state.set_chat(ChatMode::Json(serde_json::json!({
            "status": "success",
            "message": "Move it to Done.",
            "tokens": { "prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7 }
        })));

        let reply = client(&mock.base_url)
            .send(&[ChatMessage::user("what next?")])
            .await;
        assert!(reply.is_success());
        assert_eq!(reply.message, "Move it to Done.");
        assert_eq!(reply.tokens.unwrap().total_tokens, 7);

        let sent = mock.state.chat_requests();
        assert_eq!(sent[0].model, "test-model");
        assert_eq!(sent[0].messages, vec![ChatMessage::user("what next?")]);
    }

    #[tokio::test]
    async fn test_streamed_reply_is_accumulated() {
        let mock = spawn_mock(MemoryStore::new()).await;
        mock.state.set_chat(ChatMode::Stream(vec![
            r#"{"delta":"Split "}"#.to_string(),
            r#"{"delta":"the task.","reasoning":"too big"}"#.to_string(),
            "[DONE]".to_string(),
        ]));

        let reply = client(&mock.base_url).send(&[ChatMessage::user("help")]).await;
        assert!(reply.is_success());
        assert_eq!(reply.message, "Split the task.");
        assert_eq!(reply.reasoning.as_deref(), Some("too big"));
    }

    #[tokio::test]
    async fn test_failure_becomes_error_reply() {
        let mock = spawn_mock(MemoryStore::new()).await;
        mock.state.set_chat(ChatMode::Fail(500));

        let reply = client(&mock.base_url).send(&[ChatMessage::user("hi")]).await;
        assert_eq!(reply.status, ChatStatus::Error);
        assert_eq!(reply.message, UNAVAILABLE_MESSAGE);
    }

    #[tokio::test]
    async fn test_conversation_keeps_history() {
        let mock = spawn_mock(MemoryStore::new()).await;
        let chat = client(&mock.base_url);
        let mut conversation = Conversation::with_system_prompt("You help plan tasks.");

        assert!(conversation.ask(&chat, "   ").await.is_none());
        conversation.ask(&chat, "first").await.unwrap();
        conversation.ask(&chat, "second").await.unwrap();

        let sent = mock.state.chat_requests();
        assert_eq!(sent.len(), 2);
        // system + first + reply + second
        assert_eq!(sent[1].messages.len(), 4);
        assert_eq!(conversation.transcript().count(), 4);

        mock.state.set_chat(ChatMode::Fail(503));
        let reply = conversation.ask(&chat, "third").await.unwrap();
        assert!(!reply.is_success());
        assert_eq!(conversation.transcript().count(), 5);
    }
}
