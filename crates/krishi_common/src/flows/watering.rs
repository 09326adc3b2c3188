//! Watering recommendation for the next 24-48 hours.
//!
//! The one composed flow: it first fetches current conditions through the
//! weather flow, derives the crop's age in days from its planting date, and
//! only then invokes its own prompt.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::engine::AdvisoryEngine;
use crate::error::AdvisoryError;
use crate::prompt::PromptTemplate;
use crate::schema::{FieldKind, FieldSpec, Schema};

use super::{days_between, parse_planting_date};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WateringInput {
    /// The type of crop planted in the field.
    pub crop_type: String,
    /// The planting date of the crop, ISO format.
    pub planting_date: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WateringAdvice {
    pub recommendation: String,
}

pub(crate) fn input_schema() -> Schema {
    Schema::new(
        "watering_input",
        vec![
            FieldSpec::required("cropType", "The type of crop planted in the field.", FieldKind::Text),
            FieldSpec::required("plantingDate", "The planting date of the crop.", FieldKind::Text),
            FieldSpec::required(
                "latitude",
                "The latitude of the field.",
                FieldKind::number_in(-90.0, 90.0),
            ),
            FieldSpec::required(
                "longitude",
                "The longitude of the field.",
                FieldKind::number_in(-180.0, 180.0),
            ),
        ],
    )
}

fn prompt_schema() -> Schema {
    Schema::new(
        "watering_prompt_input",
        vec![
            FieldSpec::required("cropType", "The type of crop planted in the field.", FieldKind::Text),
            FieldSpec::required(
                "daysSincePlanting",
                "The number of days that have passed since the crop was planted.",
                FieldKind::integer(),
            ),
            FieldSpec::required(
                "weather",
                "A summary of the current weather conditions, including temperature, wind speed, and condition.",
                FieldKind::Text,
            ),
        ],
    )
}

pub(crate) fn output_schema() -> Schema {
    Schema::new(
        "watering_advice",
        vec![FieldSpec::required(
            "recommendation",
            "A concise watering recommendation for the next 24-48 hours.",
            FieldKind::Text,
        )],
    )
}

const TEMPLATE: &str = "\
You are an expert agronomist AI specializing in irrigation management.

Your goal is to provide a clear, actionable watering recommendation for the \
next 24-48 hours. Base your recommendation on the crop's specific needs at \
its current growth stage, determined by the days since planting, and the \
current weather conditions.

- A crop planted only a few days ago needs very little water.
- A crop in its peak growth phase will require more.
- Hot and windy conditions increase water needs.

Crop Type: {{cropType}}
Days Since Planting: {{daysSincePlanting}}
Current Weather: {{weather}}

Example recommendations:
- \"The crop is in its early seedling stage. The soil should be moist enough. No immediate watering is needed.\"
- \"The crop is in its peak vegetative growth phase. Watering is recommended within the next 24 hours to prevent stress due to high temperatures.\"
- \"Given the crop's maturity and the rainy forecast, withhold watering for at least 3 days.\"";

pub(crate) fn template() -> Result<PromptTemplate, AdvisoryError> {
    PromptTemplate::new("watering_recommendation", TEMPLATE, &prompt_schema())
}

impl AdvisoryEngine {
    /// Watering recommendation for a field, composed from the current
    /// weather and the crop's age.
    pub async fn watering_recommendation(
        &self,
        input: &WateringInput,
    ) -> Result<WateringAdvice, AdvisoryError> {
        info!(flow = "watering_recommendation", crop = %input.crop_type, "advising on irrigation");
        let value = serde_json::to_value(input)?;
        input_schema().validate_input(&value)?;
        let planting = parse_planting_date(&input.planting_date).ok_or_else(|| {
            AdvisoryError::validation("plantingDate", "expected an ISO date such as 2024-06-01")
        })?;

        let weather = self
            .current_weather(input.latitude, input.longitude)
            .await?;
        let days_since_planting =
            days_between(planting, chrono::Local::now().date_naive());

        let prompt_value = json!({
            "cropType": input.crop_type,
            "daysSincePlanting": days_since_planting,
            "weather": weather.summary(),
        });
        let rendered = self.templates().watering.render(&prompt_value);
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
    fn malformed_planting_date_is_a_validation_error() {
        assert!(parse_planting_date("last monsoon").is_none());
    }
}
