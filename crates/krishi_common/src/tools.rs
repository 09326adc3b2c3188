//! Tool catalog for the conversational assistant.
//!
//! The registry is the single source of truth for what the backend may
//! call: it cannot invent tools, only select from these by name. Each tool
//! carries its own argument schema and returns a short natural-language
//! string, never structured data.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde_json::Value;

use crate::engine::AdvisoryEngine;
use crate::error::AdvisoryError;
use crate::flows::market::MarketQuery;
use crate::llm::ToolSpec;
use crate::schema::{FieldKind, FieldSpec, Schema};

/// A callable side-function offered to the backend during a conversation.
#[async_trait]
pub trait AdvisoryTool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> &Schema;
    async fn run(&self, arguments: &Value) -> Result<String, AdvisoryError>;
}

/// Tools registered at startup, keyed by name, immutable thereafter.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn AdvisoryTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn AdvisoryTool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn AdvisoryTool>> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The wire descriptions offered to the backend.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self
            .tools
            .values()
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.input_schema().json_schema(),
            })
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }
}

/// Current weather at a location, via the forecast flow.
pub struct CurrentWeatherTool {
    engine: AdvisoryEngine,
    schema: Schema,
}

impl CurrentWeatherTool {
    pub fn new(engine: AdvisoryEngine) -> Self {
        Self {
            engine,
            schema: Schema::new(
                "current_weather_args",
                vec![
                    FieldSpec::required(
                        "latitude",
                        "The latitude for the weather forecast.",
                        FieldKind::number_in(-90.0, 90.0),
                    ),
                    FieldSpec::required(
                        "longitude",
                        "The longitude for the weather forecast.",
                        FieldKind::number_in(-180.0, 180.0),
                    ),
                ],
            ),
        }
    }
}

#[async_trait]
impl AdvisoryTool for CurrentWeatherTool {
    fn name(&self) -> &'static str {
        "current_weather"
    }

    fn description(&self) -> &'static str {
        "Get the current weather for a specific location. This is a simulation and not real-time data."
    }

    fn input_schema(&self) -> &Schema {
        &self.schema
    }

    async fn run(&self, arguments: &Value) -> Result<String, AdvisoryError> {
        let latitude = number_arg(arguments, "latitude")?;
        let longitude = number_arg(arguments, "longitude")?;
        let weather = self.engine.current_weather(latitude, longitude).await?;
        Ok(format!(
            "The weather in {} is currently {} with a high of {}\u{b0}C.",
            weather.location_name,
            weather.condition.to_lowercase(),
            weather.temperature
        ))
    }
}

/// Market outlook for a crop in a region, via the market flow.
pub struct MarketAnalysisTool {
    engine: AdvisoryEngine,
    schema: Schema,
}

impl MarketAnalysisTool {
    pub fn new(engine: AdvisoryEngine) -> Self {
        Self {
            engine,
            schema: Schema::new(
                "market_analysis_args",
                vec![
                    FieldSpec::required(
                        "cropType",
                        "The crop for which to generate the market analysis.",
                        FieldKind::Text,
                    ),
                    FieldSpec::required(
                        "region",
                        "The geographical region for the analysis (e.g. a state or district in India).",
                        FieldKind::Text,
                    ),
                ],
            ),
        }
    }
}

#[async_trait]
impl AdvisoryTool for MarketAnalysisTool {
    fn name(&self) -> &'static str {
        "market_analysis"
    }

    fn description(&self) -> &'static str {
        "Get a simulated market analysis for a crop in a specific region of India."
    }

    fn input_schema(&self) -> &Schema {
        &self.schema
    }

    async fn run(&self, arguments: &Value) -> Result<String, AdvisoryError> {
        let crop_type = text_arg(arguments, "cropType")?;
        let region = text_arg(arguments, "region")?;
        let query = MarketQuery {
            crop_type: crop_type.clone(),
            region,
        };
        match self.engine.market_analysis(&query).await {
            Ok(report) => Ok(report.summary(&crop_type)),
            Err(AdvisoryError::SchemaMismatch(_)) | Err(AdvisoryError::NoResponse) => {
                Ok("I couldn't find any market data for that crop and region.".to_string())
            }
            Err(e) => Err(e),
        }
    }
}

const FARMING_TIPS: &[&str] = &[
    "Regularly test your soil's pH and nutrient levels to ensure optimal crop growth. Use organic compost to improve soil structure.",
    "Utilize drip irrigation or sprinkler systems to reduce water wastage. Mulching can also help retain soil moisture.",
    "Combine biological, cultural, and chemical practices to manage pests effectively while minimizing environmental impact.",
    "Practice crop rotation to prevent soil depletion and reduce the buildup of pests and diseases.",
    "Ensure proper spacing between plants to allow for adequate sunlight, air circulation, and growth.",
];

/// A general farming tip, picked at random from a fixed list.
pub struct FarmingTipTool {
    schema: Schema,
}

impl FarmingTipTool {
    pub fn new() -> Self {
        Self {
            schema: Schema::new("farming_tip_args", Vec::new()),
        }
    }
}

impl Default for FarmingTipTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdvisoryTool for FarmingTipTool {
    fn name(&self) -> &'static str {
        "farming_tip"
    }

    fn description(&self) -> &'static str {
        "Provides a general farming tip when the user asks for advice."
    }

    fn input_schema(&self) -> &Schema {
        &self.schema
    }

    async fn run(&self, _arguments: &Value) -> Result<String, AdvisoryError> {
        let tip = FARMING_TIPS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(FARMING_TIPS[0]);
        Ok(tip.to_string())
    }
}

fn number_arg(arguments: &Value, name: &str) -> Result<f64, AdvisoryError> {
    arguments
        .get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| AdvisoryError::validation(name, "expected a number"))
}

fn text_arg(arguments: &Value, name: &str) -> Result<String, AdvisoryError> {
    arguments
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AdvisoryError::validation(name, "expected a string"))
}
