//! Krishi, the conversational assistant.
//!
//! The one tool-augmented flow: the backend may call the weather, market,
//! and farming-tip tools before producing its final answer. The loop that
//! executes those calls lives in [`crate::engine::AdvisoryEngine::converse`].

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::AdvisoryEngine;
use crate::error::AdvisoryError;
use crate::prompt::PromptTemplate;
use crate::schema::{FieldKind, FieldSpec, Schema};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantQuery {
    /// The user's query, in Tamil or English.
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantReply {
    /// The assistant's response, in the same language as the query.
    pub response: String,
}

pub(crate) fn input_schema() -> Schema {
    Schema::new(
        "assistant_input",
        vec![FieldSpec::required(
            "query",
            "The user's query in Tamil or English.",
            FieldKind::Text,
        )],
    )
}

const TEMPLATE: &str = "\
You are Krishi, a friendly and intelligent voice assistant designed to help \
Indian farmers. You speak in simple, clear Tamil or English based on the \
user's language. Your job is to answer questions about crop health, \
irrigation, weather, market prices, and farming tips. Be concise, \
respectful, and practical.

User Query: \"{{query}}\"

Respond in the same language as the query. If the query is in Tamil, reply \
in Tamil. If in English, reply in English. Keep your tone warm, helpful, and \
easy to understand. Avoid technical jargon unless asked.";

pub(crate) fn template() -> Result<PromptTemplate, AdvisoryError> {
    PromptTemplate::new("krishi_assistant", TEMPLATE, &input_schema())
}

impl AdvisoryEngine {
    /// Answer a farming question, consulting tools as the model sees fit.
    pub async fn ask_assistant(
        &self,
        input: &AssistantQuery,
    ) -> Result<AssistantReply, AdvisoryError> {
        info!(flow = "krishi_assistant", "answering query");
        let value = serde_json::to_value(input)?;
        input_schema().validate_input(&value)?;

        let rendered = self.templates().assistant.render(&value);
        let response = self.converse(rendered.text).await?;
        Ok(AssistantReply { response })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn template_builds_against_schema() {
        template().unwrap();
    }

    #[test]
    fn blank_query_is_rejected() {
        let err = input_schema()
            .validate_input(&json!({"query": ""}))
            .unwrap_err();
        assert!(err.to_string().contains("query"), "{err}");
    }
}
