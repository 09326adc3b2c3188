//! Declarative field schemas for advisory requests and replies.
//!
//! A [`Schema`] serves three purposes at once: it validates caller input
//! before any model call (fail closed), it validates the model's JSON reply
//! before it reaches the caller, and its field descriptions are rendered
//! into the prompt as generation instructions.

use serde_json::{json, Map, Value};

use crate::error::AdvisoryError;

/// The shape of a single field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A non-empty string.
    Text,
    /// A floating-point number, optionally bounded on either side.
    Number { min: Option<f64>, max: Option<f64> },
    /// A whole number, optionally bounded on either side.
    Integer { min: Option<i64>, max: Option<i64> },
    Boolean,
    /// A string restricted to a closed set of literals.
    Choice(&'static [&'static str]),
    /// Base64 media with a `data:<mime>;base64,` prefix. Split off as an
    /// inline attachment at render time rather than substituted into text.
    DataUri,
    /// A homogeneous array.
    List(Box<FieldKind>),
    /// A nested object.
    Record(Vec<FieldSpec>),
}

impl FieldKind {
    pub fn number() -> Self {
        Self::Number { min: None, max: None }
    }

    pub fn number_in(min: f64, max: f64) -> Self {
        Self::Number {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn integer() -> Self {
        Self::Integer { min: None, max: None }
    }
}

/// One named field with the human-readable description that doubles as its
/// generation instruction.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn required(name: &'static str, description: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            description,
            required: true,
            kind,
        }
    }

    pub fn optional(name: &'static str, description: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            description,
            required: false,
            kind,
        }
    }
}

/// A named record schema: the unit of validation for one request or reply.
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: &'static str,
    pub fields: Vec<FieldSpec>,
}

/// A single constraint violation, located by its field path
/// (e.g. `priceTrend.change`).
struct Violation {
    path: String,
    reason: String,
}

impl Violation {
    fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

impl Schema {
    pub fn new(name: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self { name, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate a caller-supplied input record. Fails closed: a missing
    /// required field or out-of-range value prevents the pipeline from
    /// proceeding to invocation.
    pub fn validate_input(&self, value: &Value) -> Result<(), AdvisoryError> {
        self.check(value)
            .map_err(|v| AdvisoryError::Validation {
                field: v.path,
                reason: v.reason,
            })
    }

    /// Validate a model reply against this schema. The same walk as
    /// [`Self::validate_input`], surfaced as a schema mismatch because the
    /// defect is on the model side, not the caller's.
    pub fn validate_output(&self, value: &Value) -> Result<(), AdvisoryError> {
        self.check(value).map_err(|v| {
            AdvisoryError::SchemaMismatch(format!("field '{}': {}", v.path, v.reason))
        })
    }

    fn check(&self, value: &Value) -> Result<(), Violation> {
        let object = value
            .as_object()
            .ok_or_else(|| Violation::new(self.name, "expected a JSON object"))?;
        check_fields(&self.fields, object, "")
    }

    /// Render this schema as a JSON Schema object, descriptions included.
    /// Embedded in generate prompts and used verbatim as tool parameter
    /// schemas.
    pub fn json_schema(&self) -> Value {
        fields_schema(&self.fields)
    }
}

fn check_fields(fields: &[FieldSpec], object: &Map<String, Value>, prefix: &str) -> Result<(), Violation> {
    for field in fields {
        let path = if prefix.is_empty() {
            field.name.to_string()
        } else {
            format!("{prefix}.{}", field.name)
        };
        match object.get(field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    return Err(Violation::new(&path, "missing required field"));
                }
            }
            Some(value) => check_kind(&field.kind, &path, value)?,
        }
    }
    Ok(())
}

fn check_kind(kind: &FieldKind, path: &str, value: &Value) -> Result<(), Violation> {
    match kind {
        FieldKind::Text => {
            let text = value
                .as_str()
                .ok_or_else(|| Violation::new(path, "expected a string"))?;
            if text.trim().is_empty() {
                return Err(Violation::new(path, "must not be empty"));
            }
        }
        FieldKind::Number { min, max } => {
            let number = value
                .as_f64()
                .ok_or_else(|| Violation::new(path, "expected a number"))?;
            if let Some(min) = min {
                if number < *min {
                    return Err(Violation::new(path, format!("must be at least {min}")));
                }
            }
            if let Some(max) = max {
                if number > *max {
                    return Err(Violation::new(path, format!("must be at most {max}")));
                }
            }
        }
        FieldKind::Integer { min, max } => {
            let number = value
                .as_i64()
                .ok_or_else(|| Violation::new(path, "expected a whole number"))?;
            if let Some(min) = min {
                if number < *min {
                    return Err(Violation::new(path, format!("must be at least {min}")));
                }
            }
            if let Some(max) = max {
                if number > *max {
                    return Err(Violation::new(path, format!("must be at most {max}")));
                }
            }
        }
        FieldKind::Boolean => {
            if !value.is_boolean() {
                return Err(Violation::new(path, "expected true or false"));
            }
        }
        FieldKind::Choice(options) => {
            let text = value
                .as_str()
                .ok_or_else(|| Violation::new(path, "expected a string"))?;
            if !options.contains(&text) {
                return Err(Violation::new(
                    path,
                    format!("must be one of: {}", options.join(", ")),
                ));
            }
        }
        FieldKind::DataUri => {
            let text = value
                .as_str()
                .ok_or_else(|| Violation::new(path, "expected a data URI string"))?;
            InlineMedia::parse(text).map_err(|reason| Violation::new(path, reason))?;
        }
        FieldKind::List(item) => {
            let items = value
                .as_array()
                .ok_or_else(|| Violation::new(path, "expected an array"))?;
            for (index, element) in items.iter().enumerate() {
                check_kind(item, &format!("{path}[{index}]"), element)?;
            }
        }
        FieldKind::Record(fields) => {
            let object = value
                .as_object()
                .ok_or_else(|| Violation::new(path, "expected an object"))?;
            check_fields(fields, object, path)?;
        }
    }
    Ok(())
}

fn fields_schema(fields: &[FieldSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        let mut schema = kind_schema(&field.kind);
        if let Some(object) = schema.as_object_mut() {
            object.insert("description".into(), json!(field.description));
        }
        properties.insert(field.name.to_string(), schema);
        if field.required {
            required.push(json!(field.name));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn kind_schema(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Text => json!({"type": "string"}),
        FieldKind::Number { min, max } => {
            let mut schema = Map::new();
            schema.insert("type".into(), json!("number"));
            if let Some(min) = min {
                schema.insert("minimum".into(), json!(min));
            }
            if let Some(max) = max {
                schema.insert("maximum".into(), json!(max));
            }
            Value::Object(schema)
        }
        FieldKind::Integer { min, max } => {
            let mut schema = Map::new();
            schema.insert("type".into(), json!("integer"));
            if let Some(min) = min {
                schema.insert("minimum".into(), json!(min));
            }
            if let Some(max) = max {
                schema.insert("maximum".into(), json!(max));
            }
            Value::Object(schema)
        }
        FieldKind::Boolean => json!({"type": "boolean"}),
        FieldKind::Choice(options) => json!({"type": "string", "enum": options}),
        FieldKind::DataUri => json!({"type": "string", "contentEncoding": "base64"}),
        FieldKind::List(item) => json!({"type": "array", "items": kind_schema(item)}),
        FieldKind::Record(fields) => fields_schema(fields),
    }
}

/// A base64 media payload split out of a `data:` URI.
///
/// The mime type is kept even though the Ollama image channel only takes
/// the bare payload; other backends need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMedia {
    pub mime: String,
    pub data: String,
}

impl InlineMedia {
    /// Parse a `data:<mime>;base64,<payload>` URI, checking the payload
    /// actually decodes.
    pub fn parse(uri: &str) -> Result<Self, String> {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine as _;

        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| "expected a 'data:' URI".to_string())?;
        let (mime, data) = rest
            .split_once(";base64,")
            .ok_or_else(|| "expected base64-encoded data URI".to_string())?;
        if mime.is_empty() {
            return Err("data URI is missing its mime type".into());
        }
        if data.is_empty() {
            return Err("data URI payload is empty".into());
        }
        if STANDARD.decode(data).is_err() {
            return Err("data URI payload is not valid base64".into());
        }
        Ok(Self {
            mime: mime.to_string(),
            data: data.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn market_schema() -> Schema {
        Schema::new(
            "market_report",
            vec![
                FieldSpec::required("cropName", "The crop analyzed.", FieldKind::Text),
                FieldSpec::required(
                    "priceTrend",
                    "Current price trend.",
                    FieldKind::Record(vec![
                        FieldSpec::required("currentPrice", "Average price in INR.", FieldKind::number()),
                        FieldSpec::required(
                            "trend",
                            "Direction of the trend.",
                            FieldKind::Choice(&["up", "down", "stable"]),
                        ),
                    ]),
                ),
                FieldSpec::optional("note", "Optional analyst note.", FieldKind::Text),
            ],
        )
    }

    #[test]
    fn accepts_conformant_record() {
        let schema = market_schema();
        let value = json!({
            "cropName": "Wheat",
            "priceTrend": {"currentPrice": 2400.0, "trend": "up"},
        });
        assert!(schema.validate_input(&value).is_ok());
        assert!(schema.validate_output(&value).is_ok());
    }

    #[test]
    fn missing_required_field_names_it() {
        let schema = market_schema();
        let err = schema
            .validate_input(&json!({"cropName": "Wheat"}))
            .unwrap_err();
        match err {
            AdvisoryError::Validation { field, .. } => assert_eq!(field, "priceTrend"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nested_violation_reports_full_path() {
        let schema = market_schema();
        let err = schema
            .validate_output(&json!({
                "cropName": "Wheat",
                "priceTrend": {"currentPrice": 2400.0, "trend": "sideways"},
            }))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("priceTrend.trend"), "{message}");
        assert!(message.contains("up, down, stable"), "{message}");
    }

    #[test]
    fn empty_string_rejected_for_text() {
        let schema = Schema::new(
            "query",
            vec![FieldSpec::required("state", "State of residence.", FieldKind::Text)],
        );
        assert!(schema.validate_input(&json!({"state": "   "})).is_err());
    }

    #[test]
    fn number_range_is_enforced() {
        let schema = Schema::new(
            "report",
            vec![FieldSpec::required(
                "ndvi",
                "Vegetation index.",
                FieldKind::number_in(0.0, 1.0),
            )],
        );
        assert!(schema.validate_output(&json!({"ndvi": 0.62})).is_ok());
        assert!(schema.validate_output(&json!({"ndvi": 1.4})).is_err());
        assert!(schema.validate_output(&json!({"ndvi": -0.1})).is_err());
    }

    #[test]
    fn list_elements_are_checked_by_index() {
        let schema = Schema::new(
            "digest",
            vec![FieldSpec::required(
                "tags",
                "Topic tags.",
                FieldKind::List(Box::new(FieldKind::Text)),
            )],
        );
        let err = schema
            .validate_output(&json!({"tags": ["soil", ""]}))
            .unwrap_err();
        assert!(err.to_string().contains("tags[1]"));
    }

    #[test]
    fn json_schema_carries_descriptions_and_required() {
        let schema = market_schema();
        let rendered = schema.json_schema();
        assert_eq!(rendered["properties"]["cropName"]["description"], "The crop analyzed.");
        assert_eq!(
            rendered["properties"]["priceTrend"]["properties"]["trend"]["enum"],
            json!(["up", "down", "stable"])
        );
        assert_eq!(rendered["required"], json!(["cropName", "priceTrend"]));
    }

    #[test]
    fn data_uri_parsing() {
        let media = InlineMedia::parse("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(media.mime, "image/png");
        assert_eq!(media.data, "aGVsbG8=");

        assert!(InlineMedia::parse("http://example.com/a.png").is_err());
        assert!(InlineMedia::parse("data:image/png;base64,").is_err());
        assert!(InlineMedia::parse("data:;base64,aGVsbG8=").is_err());
        assert!(InlineMedia::parse("data:image/png;base64,!!!not-base64!!!").is_err());
    }
}
