//! The advisory engine: one object composing validation, prompt rendering,
//! and model invocation for every flow.
//!
//! Construction builds every prompt template once; a malformed template
//! fails here and no flow ever runs with one. Calls are independent and
//! stateless: no caching, no batching, no cross-request coordination.
//!
//! Failure policy: transport-level backend errors are retried a bounded
//! number of times with jittered exponential backoff. A reply that fails
//! the output schema is never retried; that points at a prompt or schema
//! defect, not transience.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::AdvisorConfig;
use crate::error::AdvisoryError;
use crate::flows;
use crate::llm::{
    BackendTurn, ChatMessage, GenerateRequest, GenerativeBackend, ToolCallRequest, ToolSpec,
};
use crate::prompt::{PromptTemplate, RenderedPrompt};
use crate::schema::Schema;
use crate::tools::{CurrentWeatherTool, FarmingTipTool, MarketAnalysisTool, ToolRegistry};

/// Upper bound on backend-directed tool rounds per conversational turn.
pub const MAX_TOOL_ROUNDS: usize = 5;

/// Every flow's prompt template, built once at engine construction.
pub(crate) struct Templates {
    pub crop_image: PromptTemplate,
    pub credit: PromptTemplate,
    pub field_health: PromptTemplate,
    pub schemes: PromptTemplate,
    pub harvest: PromptTemplate,
    pub market: PromptTemplate,
    pub watering: PromptTemplate,
    pub weather: PromptTemplate,
    pub assistant: PromptTemplate,
}

impl Templates {
    fn build() -> Result<Self, AdvisoryError> {
        Ok(Self {
            crop_image: flows::crop_image::template()?,
            credit: flows::credit::template()?,
            field_health: flows::field_health::template()?,
            schemes: flows::schemes::template()?,
            harvest: flows::harvest::template()?,
            market: flows::market::template()?,
            watering: flows::watering::template()?,
            weather: flows::weather::template()?,
            assistant: flows::assistant::template()?,
        })
    }
}

struct EngineInner {
    backend: Arc<dyn GenerativeBackend>,
    config: AdvisorConfig,
    templates: Templates,
    tools: ToolRegistry,
}

/// The orchestration surface. Cheap to clone; all state is shared and
/// immutable after construction.
#[derive(Clone)]
pub struct AdvisoryEngine {
    inner: Arc<EngineInner>,
}

impl AdvisoryEngine {
    /// Build an engine with the standard tool catalog. The tools that
    /// compose other flows get their own engine handle without tools, so a
    /// tool can never recurse into the conversational loop.
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        config: AdvisorConfig,
    ) -> Result<Self, AdvisoryError> {
        let core = Self::with_tools(backend.clone(), config.clone(), ToolRegistry::new())?;
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(CurrentWeatherTool::new(core.clone())));
        tools.register(Arc::new(MarketAnalysisTool::new(core.clone())));
        tools.register(Arc::new(FarmingTipTool::new()));
        Self::with_tools(backend, config, tools)
    }

    /// Build an engine with an explicit tool catalog.
    pub fn with_tools(
        backend: Arc<dyn GenerativeBackend>,
        config: AdvisorConfig,
        tools: ToolRegistry,
    ) -> Result<Self, AdvisoryError> {
        Ok(Self {
            inner: Arc::new(EngineInner {
                backend,
                config,
                templates: Templates::build()?,
                tools,
            }),
        })
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.inner.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.inner.tools
    }

    pub(crate) fn templates(&self) -> &Templates {
        &self.inner.templates
    }

    /// Structured invocation: append the output schema to the prompt, call
    /// the backend, and validate and decode the JSON reply.
    pub(crate) async fn structured<T: DeserializeOwned>(
        &self,
        rendered: RenderedPrompt,
        output: &Schema,
    ) -> Result<T, AdvisoryError> {
        let prompt = format!(
            "{}\n\nRespond with a single JSON object matching this schema:\n{}",
            rendered.text,
            serde_json::to_string_pretty(&output.json_schema())?
        );
        let request = GenerateRequest {
            prompt,
            media: rendered.media,
        };

        let raw = self.generate_with_retry(&request).await?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AdvisoryError::NoResponse);
        }
        let value = parse_json_reply(trimmed)?;
        output.validate_output(&value)?;
        serde_json::from_value(value).map_err(|e| AdvisoryError::SchemaMismatch(e.to_string()))
    }

    async fn generate_with_retry(&self, request: &GenerateRequest) -> Result<String, AdvisoryError> {
        let retry = &self.inner.config.retry;
        let mut attempt = 0;
        loop {
            match self.inner.backend.generate(request).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                    attempt += 1;
                    let delay = backoff_delay(retry.base_delay_ms, attempt);
                    warn!(attempt, ?delay, "backend error, retrying: {e}");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn chat_with_retry(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<BackendTurn, AdvisoryError> {
        let retry = &self.inner.config.retry;
        let mut attempt = 0;
        loop {
            match self.inner.backend.chat(messages, tools).await {
                Ok(turn) => return Ok(turn),
                Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                    attempt += 1;
                    let delay = backoff_delay(retry.base_delay_ms, attempt);
                    warn!(attempt, ?delay, "backend error, retrying: {e}");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// The conversational loop. The backend decides whether and which tools
    /// to call; this side only executes them and reports results back. The
    /// loop ends when the backend produces a final text answer, or errs
    /// after [`MAX_TOOL_ROUNDS`] rounds of tool calls.
    pub(crate) async fn converse(&self, prompt: String) -> Result<String, AdvisoryError> {
        let specs = self.inner.tools.specs();
        let mut messages = vec![ChatMessage::user(prompt)];
        let mut rounds = 0;
        loop {
            let turn = self.chat_with_retry(&messages, &specs).await?;
            match turn {
                BackendTurn::Final(text) => {
                    if text.trim().is_empty() {
                        return Err(AdvisoryError::NoResponse);
                    }
                    return Ok(text);
                }
                BackendTurn::ToolCalls(calls) => {
                    rounds += 1;
                    if rounds > MAX_TOOL_ROUNDS {
                        return Err(AdvisoryError::ToolLoopExceeded(MAX_TOOL_ROUNDS));
                    }
                    debug!(round = rounds, calls = calls.len(), "executing tool calls");
                    messages.push(ChatMessage::assistant_calls(calls.clone()));
                    for call in &calls {
                        let result = self.run_tool(call).await;
                        messages.push(ChatMessage::tool(call.name.clone(), result));
                    }
                }
            }
        }
    }

    /// Execute one requested tool call. A failing or misaddressed call does
    /// not abort the turn; the backend gets a synthetic failure string as
    /// the tool result and may correct itself on the next round.
    async fn run_tool(&self, call: &ToolCallRequest) -> String {
        let Some(tool) = self.inner.tools.get(&call.name) else {
            warn!(tool = %call.name, "backend requested an unknown tool");
            return format!("tool '{}' is not available", call.name);
        };

        let arguments = if call.arguments.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            call.arguments.clone()
        };
        if let Err(e) = tool.input_schema().validate_input(&arguments) {
            warn!(tool = %call.name, "tool arguments rejected: {e}");
            return format!("tool '{}' rejected its arguments: {e}", call.name);
        }

        match tool.run(&arguments).await {
            Ok(result) => result,
            Err(e) => {
                let failure = AdvisoryError::tool(call.name.clone(), e.to_string());
                warn!("{failure}");
                failure.to_string()
            }
        }
    }
}

/// Exponential backoff with jitter: base * 2^(attempt-1) plus up to half
/// the base on top.
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let shift = (attempt.saturating_sub(1)).min(6);
    let exponential = base_ms.saturating_mul(1 << shift);
    let jitter = if base_ms >= 2 {
        rand::thread_rng().gen_range(0..=base_ms / 2)
    } else {
        0
    };
    Duration::from_millis(exponential + jitter)
}

/// Parse the model's reply text as JSON, tolerating the markdown fences
/// and leading prose smaller models wrap their output in.
fn parse_json_reply(text: &str) -> Result<Value, AdvisoryError> {
    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }
    if let Some(fenced) = extract_fenced_block(text) {
        if let Ok(value) = serde_json::from_str(fenced) {
            return Ok(value);
        }
    }
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&text[start..=end]) {
                return Ok(value);
            }
        }
    }
    Err(AdvisoryError::SchemaMismatch(format!(
        "model reply is not valid JSON: {}",
        truncate(text, 120)
    )))
}

fn extract_fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let body_start = after.find('\n')? + 1;
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeBackend;
    use serde_json::json;

    #[test]
    fn engine_builds_with_standard_tools() {
        let engine = AdvisoryEngine::new(
            Arc::new(FakeBackend::new()),
            AdvisorConfig::default(),
        )
        .unwrap();
        assert_eq!(engine.tools().len(), 3);
        assert!(engine.tools().get("current_weather").is_some());
        assert!(engine.tools().get("market_analysis").is_some());
        assert!(engine.tools().get("farming_tip").is_some());
    }

    #[test]
    fn parses_plain_json() {
        let value = parse_json_reply(r#"{"recommendation": "water tomorrow"}"#).unwrap();
        assert_eq!(value["recommendation"], "water tomorrow");
    }

    #[test]
    fn parses_fenced_json() {
        let reply = "Here is the report:\n```json\n{\"ndvi\": 0.7}\n```\nDone.";
        let value = parse_json_reply(reply).unwrap();
        assert_eq!(value["ndvi"], 0.7);
    }

    #[test]
    fn parses_json_with_leading_prose() {
        let reply = "Sure! {\"daysToHarvest\": 42, \"estimatedHarvestDate\": \"October 15, 2024\"}";
        let value = parse_json_reply(reply).unwrap();
        assert_eq!(value["daysToHarvest"], 42);
    }

    #[test]
    fn garbage_reply_is_a_schema_mismatch() {
        let err = parse_json_reply("I am not sure about that.").unwrap_err();
        assert!(matches!(err, AdvisoryError::SchemaMismatch(_)));
    }

    #[test]
    fn backoff_grows_and_stays_bounded() {
        let first = backoff_delay(250, 1);
        let second = backoff_delay(250, 2);
        assert!(first >= Duration::from_millis(250));
        assert!(first <= Duration::from_millis(375));
        assert!(second >= Duration::from_millis(500));
        assert!(second <= Duration::from_millis(625));
    }

    #[tokio::test]
    async fn structured_rejects_empty_reply() {
        let fake = Arc::new(FakeBackend::new());
        fake.push_empty_reply();
        let engine = AdvisoryEngine::new(fake, AdvisorConfig::default()).unwrap();
        let err = engine
            .weather_forecast(&crate::flows::weather::ForecastQuery {
                latitude: 25.9,
                longitude: 85.7,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisoryError::NoResponse));
    }

    #[tokio::test]
    async fn schema_block_is_appended_to_generate_prompts() {
        let fake = Arc::new(FakeBackend::new());
        fake.push_reply(&json!({
            "estimatedHarvestDate": "October 15, 2024",
            "daysToHarvest": 42,
        }));
        let engine = AdvisoryEngine::new(fake.clone(), AdvisorConfig::default()).unwrap();
        engine
            .predict_harvest_time(&crate::flows::harvest::HarvestInput {
                crop_type: "Wheat".into(),
                planting_date: "2024-06-01".into(),
            })
            .await
            .unwrap();

        let prompt = &fake.prompts()[0];
        assert!(prompt.contains("Respond with a single JSON object matching this schema:"));
        assert!(prompt.contains("estimatedHarvestDate"));
        assert!(prompt.contains("The estimated number of days from today until the harvest."));
    }
}
