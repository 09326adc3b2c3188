//! Simulated mandi market analysis for a crop in a region.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::engine::AdvisoryEngine;
use crate::error::AdvisoryError;
use crate::prompt::PromptTemplate;
use crate::schema::{FieldKind, FieldSpec, Schema};

use super::today_stamp;

pub const TREND_DIRECTIONS: &[&str] = &["up", "down", "stable"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketQuery {
    /// The crop for which to generate the market analysis.
    pub crop_type: String,
    /// A state or district in India.
    pub region: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTrend {
    /// The current average price in INR.
    pub current_price: f64,
    pub trend: TrendDirection,
    /// The percentage change over the last week.
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopBuyer {
    /// The mandi or major buyer.
    pub name: String,
    /// The offered price in INR at that location.
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketReport {
    pub crop_name: String,
    pub price_trend: PriceTrend,
    pub demand_forecast: String,
    pub top_buyers: Vec<TopBuyer>,
    pub recommendation: String,
}

impl MarketReport {
    /// The one-line summary returned by the assistant's market tool.
    pub fn summary(&self, crop_type: &str) -> String {
        format!(
            "The current average price for {crop_type} is \u{20b9}{} and the trend is {}. \
             The demand is expected to be {}. My recommendation is to {}.",
            self.price_trend.current_price,
            self.price_trend.trend.as_str(),
            self.demand_forecast.to_lowercase(),
            self.recommendation.to_lowercase(),
        )
    }
}

pub(crate) fn input_schema() -> Schema {
    Schema::new(
        "market_analysis_input",
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
    )
}

fn prompt_schema() -> Schema {
    let mut schema = input_schema();
    schema.fields.push(FieldSpec::required(
        "today",
        "Today's date.",
        FieldKind::Text,
    ));
    schema
}

pub(crate) fn output_schema() -> Schema {
    Schema::new(
        "market_report",
        vec![
            FieldSpec::required("cropName", "The name of the crop analyzed.", FieldKind::Text),
            FieldSpec::required(
                "priceTrend",
                "The current price trend.",
                FieldKind::Record(vec![
                    FieldSpec::required(
                        "currentPrice",
                        "The current average price in INR.",
                        FieldKind::number(),
                    ),
                    FieldSpec::required(
                        "trend",
                        "The price trend direction.",
                        FieldKind::Choice(TREND_DIRECTIONS),
                    ),
                    FieldSpec::required(
                        "change",
                        "The percentage change over the last week.",
                        FieldKind::number(),
                    ),
                ]),
            ),
            FieldSpec::required(
                "demandForecast",
                "A 1-2 sentence forecast of market demand for the next few weeks.",
                FieldKind::Text,
            ),
            FieldSpec::required(
                "topBuyers",
                "A list of the top 3-4 mandis or buyers with the best prices currently.",
                FieldKind::List(Box::new(FieldKind::Record(vec![
                    FieldSpec::required("name", "The name of the mandi or major buyer.", FieldKind::Text),
                    FieldSpec::required(
                        "price",
                        "The offered price in INR at that location.",
                        FieldKind::number(),
                    ),
                ]))),
            ),
            FieldSpec::required(
                "recommendation",
                "A clear, actionable recommendation for the farmer (e.g. 'Sell now', 'Hold for 2 weeks', 'Sell partially').",
                FieldKind::Text,
            ),
        ],
    )
}

const TEMPLATE: &str = "\
You are an expert agricultural market analyst AI.

Generate a concise, simulated market analysis report for the specified crop \
in the given region of India. Prices should be provided in INR.
If a district is provided, focus the analysis on that district and its \
nearest major mandis. If only a state is provided, give a state-level \
overview.

IMPORTANT: This is a simulation based on plausible market conditions. The \
data does not have to be real-time, but it should be realistic and \
internally consistent.

The analysis must include:
1. Current average price trend (up, down, or stable) with a weekly percentage change.
2. A brief demand forecast.
3. A list of the top 3-4 mandis (markets) or major buyers with the best simulated prices relevant to the specified region.
4. A clear, actionable recommendation for the farmer.

Crop: {{cropType}}
Region: {{region}}

Today's date is {{today}}.";

pub(crate) fn template() -> Result<PromptTemplate, AdvisoryError> {
    PromptTemplate::new("market_analysis", TEMPLATE, &prompt_schema())
}

impl AdvisoryEngine {
    /// Simulated market analysis for a crop in a region of India.
    pub async fn market_analysis(&self, input: &MarketQuery) -> Result<MarketReport, AdvisoryError> {
        info!(flow = "market_analysis", crop = %input.crop_type, region = %input.region, "analyzing market");
        let value = serde_json::to_value(input)?;
        input_schema().validate_input(&value)?;

        let prompt_value = json!({
            "cropType": input.crop_type,
            "region": input.region,
            "today": today_stamp(),
        });
        let rendered = self.templates().market.render(&prompt_value);
        self.structured(rendered, &output_schema()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_builds_against_schema() {
        template().unwrap();
    }

    #[test]
    fn trend_direction_round_trips() {
        let trend: TrendDirection = serde_json::from_str("\"stable\"").unwrap();
        assert_eq!(trend, TrendDirection::Stable);
        assert_eq!(serde_json::to_string(&TrendDirection::Up).unwrap(), "\"up\"");
    }

    #[test]
    fn summary_line_reads_naturally() {
        let report = MarketReport {
            crop_name: "Wheat".into(),
            price_trend: PriceTrend {
                current_price: 2400.0,
                trend: TrendDirection::Up,
                change: 3.2,
            },
            demand_forecast: "Strong".into(),
            top_buyers: vec![],
            recommendation: "Sell now".into(),
        };
        let summary = report.summary("Wheat");
        assert!(summary.contains("\u{20b9}2400"));
        assert!(summary.contains("trend is up"));
        assert!(summary.contains("sell now"));
    }
}
