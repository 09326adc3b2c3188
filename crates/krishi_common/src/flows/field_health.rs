//! Field health assessment from satellite imagery and weather data.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::AdvisoryEngine;
use crate::error::AdvisoryError;
use crate::prompt::PromptTemplate;
use crate::schema::{FieldKind, FieldSpec, Schema};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldHealthInput {
    pub field_id: String,
    /// Satellite imagery of the field as a base64 data URI.
    pub satellite_imagery_data_uri: String,
    /// Weather data for the field, free form.
    pub weather_data: String,
    pub crop_type: String,
    pub planting_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldHealthReport {
    pub summary: String,
    /// Normalized Difference Vegetation Index, 0 to 1.
    pub ndvi: f64,
    /// Estimated soil moisture percentage.
    pub soil_moisture: f64,
    pub crop_stress: String,
    pub drought_risk: String,
    pub flood_risk: String,
    pub pest_disease_likelihood: String,
    pub yield_anomaly_prediction: String,
    pub suggested_actions: String,
}

pub(crate) fn input_schema() -> Schema {
    Schema::new(
        "field_health_input",
        vec![
            FieldSpec::required("fieldId", "The ID of the field to analyze.", FieldKind::Text),
            FieldSpec::required(
                "satelliteImageryDataUri",
                "Satellite imagery of the field, as a data URI that must include a MIME type and use Base64 encoding. Expected format: 'data:<mimetype>;base64,<encoded_data>'.",
                FieldKind::DataUri,
            ),
            FieldSpec::required("weatherData", "Weather data for the field.", FieldKind::Text),
            FieldSpec::required("cropType", "The type of crop planted in the field.", FieldKind::Text),
            FieldSpec::required("plantingDate", "The planting date of the crop.", FieldKind::Text),
        ],
    )
}

pub(crate) fn output_schema() -> Schema {
    Schema::new(
        "field_health_report",
        vec![
            FieldSpec::required(
                "summary",
                "A comprehensive, multi-sentence summary of the overall field health, including key findings and potential issues.",
                FieldKind::Text,
            ),
            FieldSpec::required(
                "ndvi",
                "The Normalized Difference Vegetation Index (NDVI) of the field, as a value between 0 and 1. This indicates vegetation density and health.",
                FieldKind::number_in(0.0, 1.0),
            ),
            FieldSpec::required(
                "soilMoisture",
                "The estimated soil moisture level of the field as a percentage.",
                FieldKind::number_in(0.0, 100.0),
            ),
            FieldSpec::required(
                "cropStress",
                "A qualitative assessment of crop stress (e.g. \"Low\", \"Moderate\", \"High\").",
                FieldKind::Text,
            ),
            FieldSpec::required(
                "droughtRisk",
                "The predicted drought risk for the field (e.g. \"Low\", \"Medium\", \"High\").",
                FieldKind::Text,
            ),
            FieldSpec::required(
                "floodRisk",
                "The predicted flood risk for the field (e.g. \"Low\", \"Medium\", \"High\").",
                FieldKind::Text,
            ),
            FieldSpec::required(
                "pestDiseaseLikelihood",
                "The likelihood of pest and disease infestation (e.g. \"Low\", \"Medium\", \"High\").",
                FieldKind::Text,
            ),
            FieldSpec::required(
                "yieldAnomalyPrediction",
                "The predicted yield anomaly for the field (e.g. \"Normal\", \"Slightly Below Average\", \"Above Average\").",
                FieldKind::Text,
            ),
            FieldSpec::required(
                "suggestedActions",
                "A bulleted or numbered list of clear, actionable, and prioritized suggestions for the farmer to improve field health.",
                FieldKind::Text,
            ),
        ],
    )
}

const TEMPLATE: &str = "\
You are a world-class agronomist AI assistant. Your purpose is to provide \
farmers with a detailed and accurate health assessment of their fields.

You will be given satellite imagery, weather data, the crop type, and its \
planting date. Analyze all the provided data to generate a robust and \
insightful field health summary.

Your analysis must include:
1. NDVI: A precise value between 0 and 1.
2. Soil Moisture: An estimated percentage.
3. Crop Stress: A qualitative assessment.
4. Risks: Evaluate drought, flood, and pest/disease likelihood.
5. Yield Prediction: Anomaly prediction.
6. Summary: A detailed paragraph explaining the key findings.
7. Suggested Actions: A clear, prioritized list of actions the farmer should take.

Field ID: {{fieldId}}
The satellite image of the field is attached.
Weather Data: {{weatherData}}
Crop Type: {{cropType}}
Planting Date: {{plantingDate}}

Generate the most accurate and comprehensive field health summary possible \
based on the provided information.";

pub(crate) fn template() -> Result<PromptTemplate, AdvisoryError> {
    PromptTemplate::new("field_health_summary", TEMPLATE, &input_schema())
}

impl AdvisoryEngine {
    /// Health assessment for a field from satellite imagery and weather.
    pub async fn field_health_summary(
        &self,
        input: &FieldHealthInput,
    ) -> Result<FieldHealthReport, AdvisoryError> {
        info!(flow = "field_health_summary", field = %input.field_id, "summarizing field health");
        let value = serde_json::to_value(input)?;
        input_schema().validate_input(&value)?;

        let rendered = self.templates().field_health.render(&value);
        self.structured(rendered, &output_schema()).await
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
    fn ndvi_above_one_is_a_mismatch() {
        let mut report = json!({
            "summary": "Healthy overall.",
            "ndvi": 0.7,
            "soilMoisture": 40.0,
            "cropStress": "Low",
            "droughtRisk": "Low",
            "floodRisk": "Low",
            "pestDiseaseLikelihood": "Low",
            "yieldAnomalyPrediction": "Normal",
            "suggestedActions": "1. Maintain current irrigation.",
        });
        assert!(output_schema().validate_output(&report).is_ok());

        report["ndvi"] = json!(1.4);
        let err = output_schema().validate_output(&report).unwrap_err();
        assert!(err.to_string().contains("ndvi"), "{err}");
    }
}
