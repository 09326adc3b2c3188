//! Ollama HTTP backend.
//!
//! Speaks `/api/generate` for structured generation (JSON format, base64
//! images) and `/api/chat` for conversational turns with tools. Models are
//! loaded on demand and kept warm for a few minutes between requests.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::BackendConfig;
use crate::error::AdvisoryError;
use crate::llm::{
    BackendTurn, ChatMessage, GenerateRequest, GenerativeBackend, ToolCallRequest, ToolSpec,
};

/// How long the model stays loaded after the last request.
const KEEP_ALIVE: &str = "5m";

pub struct OllamaBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(config: BackendConfig) -> Result<Self, AdvisoryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AdvisoryError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, AdvisoryError> {
        let url = format!("{}{path}", self.config.endpoint.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = self.config.api_key() {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AdvisoryError::Backend(format!(
                    "request timed out after {}s",
                    self.config.timeout_secs
                ))
            } else {
                AdvisoryError::Backend(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdvisoryError::Backend(format!("HTTP {status} from {url}")));
        }

        response
            .json()
            .await
            .map_err(|e| AdvisoryError::Backend(format!("unreadable reply from {url}: {e}")))
    }
}

#[async_trait]
impl GenerativeBackend for OllamaBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, AdvisoryError> {
        let images: Vec<&str> = request.media.iter().map(|m| m.data.as_str()).collect();
        let body = GenerateBody {
            model: &self.config.model,
            prompt: &request.prompt,
            stream: false,
            format: Some("json"),
            images,
            keep_alive: KEEP_ALIVE,
        };
        debug!(
            model = %self.config.model,
            prompt_chars = request.prompt.len(),
            images = body.images.len(),
            "generate request"
        );

        let reply: GenerateReply = self.post("/api/generate", &body).await?;
        debug!(reply_chars = reply.response.len(), "generate reply");
        if reply.response.trim().is_empty() {
            return Err(AdvisoryError::NoResponse);
        }
        Ok(reply.response)
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<BackendTurn, AdvisoryError> {
        let body = ChatBody {
            model: &self.config.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            stream: false,
            tools: tools.iter().map(WireTool::from).collect(),
            keep_alive: KEEP_ALIVE,
        };
        debug!(
            model = %self.config.model,
            messages = messages.len(),
            tools = tools.len(),
            "chat request"
        );

        let reply: ChatReply = self.post("/api/chat", &body).await?;
        let message = reply.message.ok_or(AdvisoryError::NoResponse)?;
        if let Some(calls) = message.tool_calls {
            if !calls.is_empty() {
                let requests = calls
                    .into_iter()
                    .map(|call| ToolCallRequest {
                        name: call.function.name,
                        arguments: call.function.arguments,
                    })
                    .collect();
                return Ok(BackendTurn::ToolCalls(requests));
            }
        }
        Ok(BackendTurn::Final(message.content))
    }
}

// Wire types for the Ollama API.

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<&'a str>,
    keep_alive: &'a str,
}

#[derive(Deserialize)]
struct GenerateReply {
    #[serde(default)]
    response: String,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    keep_alive: &'a str,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        let tool_calls = if message.tool_calls.is_empty() {
            None
        } else {
            Some(
                message
                    .tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        function: WireCallFunction {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    })
                    .collect(),
            )
        };
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
            tool_name: message.tool_name.clone(),
            tool_calls,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    function: WireCallFunction,
}

#[derive(Serialize, Deserialize)]
struct WireCallFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireToolFunction,
}

#[derive(Serialize)]
struct WireToolFunction {
    name: String,
    description: String,
    parameters: Value,
}

impl From<&ToolSpec> for WireTool {
    fn from(spec: &ToolSpec) -> Self {
        Self {
            kind: "function",
            function: WireToolFunction {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters.clone(),
            },
        }
    }
}

#[derive(Deserialize)]
struct ChatReply {
    message: Option<WireMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use serde_json::json;

    #[test]
    fn generate_body_omits_empty_images() {
        let body = GenerateBody {
            model: "llama3.2-vision:11b",
            prompt: "hello",
            stream: false,
            format: Some("json"),
            images: Vec::new(),
            keep_alive: KEEP_ALIVE,
        };
        let wire = serde_json::to_value(&body).unwrap();
        assert!(wire.get("images").is_none());
        assert_eq!(wire["format"], "json");
    }

    #[test]
    fn tool_result_message_carries_tool_name() {
        let message = ChatMessage::tool("current_weather", "Sunny, 31 degrees");
        let wire = serde_json::to_value(WireMessage::from(&message)).unwrap();
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_name"], "current_weather");
        assert!(wire.get("tool_calls").is_none());
    }

    #[test]
    fn chat_reply_tool_calls_parse() {
        let reply: ChatReply = serde_json::from_value(json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "current_weather", "arguments": {"latitude": 25.9, "longitude": 85.7}}}
                ]
            }
        }))
        .unwrap();
        let message = reply.message.unwrap();
        let calls = message.tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "current_weather");
        assert_eq!(calls[0].function.arguments["latitude"], 25.9);
    }

    #[test]
    fn assistant_echo_serializes_tool_calls() {
        let message = ChatMessage::assistant_calls(vec![ToolCallRequest {
            name: "farming_tip".into(),
            arguments: json!({}),
        }]);
        assert_eq!(message.role, Role::Assistant);
        let wire = serde_json::to_value(WireMessage::from(&message)).unwrap();
        assert_eq!(wire["tool_calls"][0]["function"]["name"], "farming_tip");
    }
}
