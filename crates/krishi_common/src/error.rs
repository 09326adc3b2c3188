//! Error types for the advisory pipeline.

use thiserror::Error;

/// Every failure the pipeline can surface to a caller.
///
/// All variants propagate to the flow boundary unchanged; nothing is
/// recovered internally except the bounded backend retry (see
/// [`crate::engine::AdvisoryEngine`]) and the tool-failure report-back in
/// the conversational loop.
#[derive(Error, Debug)]
pub enum AdvisoryError {
    /// An input record failed its schema before any network call. Always
    /// recoverable by re-prompting the user for corrected input.
    #[error("invalid input field '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// A prompt template references a field its schema does not declare.
    /// Programmer error, fatal at engine construction.
    #[error("prompt template '{template}' is malformed: {reason}")]
    Template { template: String, reason: String },

    /// The model backend call failed at the transport or service level.
    #[error("model backend error: {0}")]
    Backend(String),

    /// The backend replied, but the reply does not parse into the declared
    /// output schema.
    #[error("model reply does not match the output schema: {0}")]
    SchemaMismatch(String),

    /// The backend returned an empty result.
    #[error("the model did not return a response")]
    NoResponse,

    /// A tool closure failed during a conversational turn.
    #[error("tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// The backend kept requesting tools past the per-turn round limit.
    #[error("conversation exceeded {0} tool rounds without a final answer")]
    ToolLoopExceeded(usize),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AdvisoryError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Only transport-level backend failures are worth retrying; a schema
    /// mismatch indicates a prompt or schema defect, not transience.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_are_retryable() {
        assert!(AdvisoryError::Backend("timeout".into()).is_retryable());
        assert!(!AdvisoryError::SchemaMismatch("missing field".into()).is_retryable());
        assert!(!AdvisoryError::NoResponse.is_retryable());
        assert!(!AdvisoryError::validation("cropType", "must not be empty").is_retryable());
    }

    #[test]
    fn validation_message_names_the_field() {
        let err = AdvisoryError::validation("plantingDate", "not a date");
        assert_eq!(
            err.to_string(),
            "invalid input field 'plantingDate': not a date"
        );
    }
}
