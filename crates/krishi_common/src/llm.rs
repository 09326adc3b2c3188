//! Model backend abstraction.
//!
//! A single trait covers the two contact points with the generative model:
//! one-shot structured generation and the conversational turn used by the
//! tool-augmented assistant. Real traffic goes through
//! [`crate::ollama::OllamaBackend`]; tests script a [`FakeBackend`].

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AdvisoryError;
use crate::schema::InlineMedia;

/// One structured-generation request: instruction text plus any inline
/// media payloads for the backend's image channel.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub media: Vec<InlineMedia>,
}

/// Message roles in a conversational turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// One message in a conversational exchange. Assistant messages echo any
/// tool calls the backend made; tool messages carry the tool's name.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub tool_name: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_name: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_name: None,
            tool_calls: calls,
        }
    }

    pub fn tool(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_name: Some(name.into()),
            tool_calls: Vec::new(),
        }
    }
}

/// A tool invocation requested by the backend.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: Value,
}

/// What a conversational turn produced: either the final answer text or a
/// batch of tool calls the client must execute and report back.
#[derive(Debug, Clone)]
pub enum BackendTurn {
    Final(String),
    ToolCalls(Vec<ToolCallRequest>),
}

/// A callable side-function offered to the backend, described by name,
/// purpose, and a JSON Schema for its arguments.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// The single point of contact with the generative model.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// One-shot structured generation. Returns the raw reply text; the
    /// caller parses and validates it against the declared output schema.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, AdvisoryError>;

    /// One conversational turn over the message history, with the given
    /// tools on offer.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<BackendTurn, AdvisoryError>;
}

/// A scripted reply for [`FakeBackend::generate`].
#[derive(Debug, Clone)]
pub enum FakeReply {
    Text(String),
    BackendError(String),
    Empty,
}

/// A scripted turn for [`FakeBackend::chat`].
#[derive(Debug, Clone)]
pub enum FakeTurn {
    Final(String),
    ToolCalls(Vec<ToolCallRequest>),
    BackendError(String),
}

/// In-process backend double. Replies are consumed in order; the last one
/// repeats if calls outrun the script. Every request is recorded so tests
/// can assert call counts and inspect the exact prompts sent.
#[derive(Default)]
pub struct FakeBackend {
    replies: Mutex<VecDeque<FakeReply>>,
    turns: Mutex<VecDeque<FakeTurn>>,
    generate_requests: Mutex<Vec<GenerateRequest>>,
    chat_transcripts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: a backend that always replies with this JSON value.
    pub fn with_reply(reply: &Value) -> Self {
        let fake = Self::new();
        fake.push_reply(reply);
        fake
    }

    pub fn push_reply(&self, reply: &Value) {
        self.push_reply_text(reply.to_string());
    }

    pub fn push_reply_text(&self, text: impl Into<String>) {
        self.replies.lock().unwrap().push_back(FakeReply::Text(text.into()));
    }

    pub fn push_generate_error(&self, message: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(FakeReply::BackendError(message.into()));
    }

    pub fn push_empty_reply(&self) {
        self.replies.lock().unwrap().push_back(FakeReply::Empty);
    }

    pub fn push_turn(&self, turn: FakeTurn) {
        self.turns.lock().unwrap().push_back(turn);
    }

    /// Number of `generate` calls received.
    pub fn generate_calls(&self) -> usize {
        self.generate_requests.lock().unwrap().len()
    }

    /// Prompts from every `generate` call, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.generate_requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }

    /// Media attachments from every `generate` call, in order.
    pub fn media(&self) -> Vec<Vec<InlineMedia>> {
        self.generate_requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.media.clone())
            .collect()
    }

    /// Number of `chat` calls received.
    pub fn chat_calls(&self) -> usize {
        self.chat_transcripts.lock().unwrap().len()
    }

    /// The message history of each `chat` call, in order.
    pub fn chat_transcripts(&self) -> Vec<Vec<ChatMessage>> {
        self.chat_transcripts.lock().unwrap().clone()
    }

    fn next<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
        let mut queue = queue.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl GenerativeBackend for FakeBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, AdvisoryError> {
        self.generate_requests.lock().unwrap().push(request.clone());
        match Self::next(&self.replies) {
            Some(FakeReply::Text(text)) => Ok(text),
            Some(FakeReply::BackendError(message)) => Err(AdvisoryError::Backend(message)),
            Some(FakeReply::Empty) | None => Ok(String::new()),
        }
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolSpec],
    ) -> Result<BackendTurn, AdvisoryError> {
        self.chat_transcripts.lock().unwrap().push(messages.to_vec());
        match Self::next(&self.turns) {
            Some(FakeTurn::Final(text)) => Ok(BackendTurn::Final(text)),
            Some(FakeTurn::ToolCalls(calls)) => Ok(BackendTurn::ToolCalls(calls)),
            Some(FakeTurn::BackendError(message)) => Err(AdvisoryError::Backend(message)),
            None => Ok(BackendTurn::Final(String::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(prompt: &str) -> GenerateRequest {
        GenerateRequest {
            prompt: prompt.to_string(),
            media: Vec::new(),
        }
    }

    #[tokio::test]
    async fn replies_are_consumed_in_order_and_last_repeats() {
        let fake = FakeBackend::new();
        fake.push_reply(&json!({"n": 1}));
        fake.push_reply(&json!({"n": 2}));

        assert_eq!(fake.generate(&request("a")).await.unwrap(), r#"{"n":1}"#);
        assert_eq!(fake.generate(&request("b")).await.unwrap(), r#"{"n":2}"#);
        assert_eq!(fake.generate(&request("c")).await.unwrap(), r#"{"n":2}"#);
        assert_eq!(fake.generate_calls(), 3);
        assert_eq!(fake.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn scripted_backend_error_surfaces() {
        let fake = FakeBackend::new();
        fake.push_generate_error("connection refused");
        let err = fake.generate(&request("a")).await.unwrap_err();
        assert!(matches!(err, AdvisoryError::Backend(_)));
    }

    #[tokio::test]
    async fn chat_records_transcripts() {
        let fake = FakeBackend::new();
        fake.push_turn(FakeTurn::Final("namaste".into()));
        let turn = fake
            .chat(&[ChatMessage::user("hello")], &[])
            .await
            .unwrap();
        assert!(matches!(turn, BackendTurn::Final(text) if text == "namaste"));
        assert_eq!(fake.chat_calls(), 1);
        assert_eq!(fake.chat_transcripts()[0][0].content, "hello");
    }
}
