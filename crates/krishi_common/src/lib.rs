//! Krishi Sahayak core library.
//!
//! The advisory pipeline behind the farmer-facing surfaces: typed requests
//! are validated against declarative schemas, rendered into prompts, sent
//! to a generative model backend, and the structured reply is validated
//! before it reaches the caller. One orchestration method per advisory
//! domain hangs off [`AdvisoryEngine`]; the conversational assistant may
//! additionally call the tools in [`tools`].
//!
//! Nothing here persists state between calls. Each request is constructed,
//! validated, sent, and discarded within one call.

pub mod config;
pub mod engine;
pub mod error;
pub mod flows;
pub mod llm;
pub mod news;
pub mod ollama;
pub mod prompt;
pub mod schema;
pub mod tools;

pub use config::AdvisorConfig;
pub use engine::{AdvisoryEngine, MAX_TOOL_ROUNDS};
pub use error::AdvisoryError;
pub use llm::{BackendTurn, ChatMessage, FakeBackend, GenerativeBackend, ToolCallRequest};
pub use ollama::OllamaBackend;
pub use schema::{FieldKind, FieldSpec, InlineMedia, Schema};
