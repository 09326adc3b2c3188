//! Prompt templates with `{{placeholder}}` substitution.
//!
//! Templates are built once at engine construction against their input
//! schema; a placeholder that names an undeclared field is a programmer
//! error and fails construction. Rendering a validated input is pure and
//! total: no I/O, no failure path.

use serde_json::Value;

use crate::error::AdvisoryError;
use crate::schema::{FieldKind, InlineMedia, Schema};

/// An immutable instruction template for one advisory domain.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    name: &'static str,
    text: &'static str,
    placeholders: Vec<String>,
    media_fields: Vec<&'static str>,
}

/// A rendered prompt: instruction text plus any media payloads split out of
/// data-URI fields for the backend's image channel.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    pub text: String,
    pub media: Vec<InlineMedia>,
}

impl PromptTemplate {
    /// Parse placeholders out of `text` and verify each one names a field
    /// in `schema`. Data-URI fields are attached as media, never
    /// substituted, so a placeholder naming one is also rejected.
    pub fn new(name: &'static str, text: &'static str, schema: &Schema) -> Result<Self, AdvisoryError> {
        let placeholders = parse_placeholders(text)
            .map_err(|reason| AdvisoryError::Template {
                template: name.to_string(),
                reason,
            })?;
        for placeholder in &placeholders {
            match schema.field(placeholder) {
                None => {
                    return Err(AdvisoryError::Template {
                        template: name.to_string(),
                        reason: format!("placeholder '{{{{{placeholder}}}}}' is not a schema field"),
                    });
                }
                Some(field) if matches!(field.kind, FieldKind::DataUri) => {
                    return Err(AdvisoryError::Template {
                        template: name.to_string(),
                        reason: format!("media field '{placeholder}' cannot be substituted into text"),
                    });
                }
                Some(_) => {}
            }
        }
        let media_fields = schema
            .fields
            .iter()
            .filter(|f| matches!(f.kind, FieldKind::DataUri))
            .map(|f| f.name)
            .collect();
        Ok(Self {
            name,
            text,
            placeholders,
            media_fields,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Substitute each placeholder with the field's display value and
    /// collect media payloads. Input is assumed validated; an absent field
    /// renders as the empty string rather than failing.
    pub fn render(&self, input: &Value) -> RenderedPrompt {
        let mut text = self.text.to_string();
        for placeholder in &self.placeholders {
            let rendered = input
                .get(placeholder)
                .map(display_value)
                .unwrap_or_default();
            text = text.replace(&format!("{{{{{placeholder}}}}}"), &rendered);
        }
        let media = self
            .media_fields
            .iter()
            .filter_map(|name| input.get(*name).and_then(Value::as_str))
            .filter_map(|uri| InlineMedia::parse(uri).ok())
            .collect();
        RenderedPrompt { text, media }
    }
}

/// Scan for `{{name}}` sites. Rejects an unclosed `{{`.
fn parse_placeholders(text: &str) -> Result<Vec<String>, String> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| "unclosed '{{' placeholder".to_string())?;
        let name = &after[..end];
        if name.trim().is_empty() {
            return Err("empty placeholder".into());
        }
        if name.contains(char::is_whitespace) {
            return Err(format!("placeholder '{{{{{name}}}}}' contains whitespace"));
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        rest = &after[end + 2..];
    }
    Ok(names)
}

/// Display form of a field value inside prompt text. Whole numbers render
/// without a trailing `.0` so a day count appears verbatim as `10`.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                int.to_string()
            } else {
                number.to_string()
            }
        }
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}
