//! Pest and disease diagnosis from an uploaded crop photo.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::AdvisoryEngine;
use crate::error::AdvisoryError;
use crate::prompt::PromptTemplate;
use crate::schema::{FieldKind, FieldSpec, Schema};

/// The closed set of risk classifications a diagnosis may carry.
pub const RISK_LEVELS: &[&str] = &["Good", "Ok", "Medium", "Risk", "High Risk"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropImageInput {
    /// A photo of the crop as a base64 data URI,
    /// `data:<mimetype>;base64,<encoded_data>`.
    pub photo_data_uri: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Good,
    Ok,
    Medium,
    Risk,
    #[serde(rename = "High Risk")]
    HighRisk,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Ok => "Ok",
            Self::Medium => "Medium",
            Self::Risk => "Risk",
            Self::HighRisk => "High Risk",
        }
    }

    /// Whether the diagnosis warrants prompt attention.
    pub fn needs_attention(&self) -> bool {
        matches!(self, Self::Medium | Self::Risk | Self::HighRisk)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropImageReport {
    /// The identified pest or disease, or "None" for a healthy crop.
    pub pest_or_disease: String,
    pub summary: String,
    pub recommended_actions: String,
    /// Estimated crop health, 0 to 100.
    pub health_percentage: f64,
    pub risk_level: RiskLevel,
}

pub(crate) fn input_schema() -> Schema {
    Schema::new(
        "crop_image_input",
        vec![FieldSpec::required(
            "photoDataUri",
            "A photo of the crop, as a data URI that must include a MIME type and use Base64 encoding. Expected format: 'data:<mimetype>;base64,<encoded_data>'.",
            FieldKind::DataUri,
        )],
    )
}

pub(crate) fn output_schema() -> Schema {
    Schema::new(
        "crop_image_report",
        vec![
            FieldSpec::required(
                "pestOrDisease",
                "The identified pest or disease affecting the crop, or \"None\" if the image shows a healthy crop.",
                FieldKind::Text,
            ),
            FieldSpec::required(
                "summary",
                "A one or two sentence summary of the recommended actions.",
                FieldKind::Text,
            ),
            FieldSpec::required(
                "recommendedActions",
                "Recommended actions to address the identified pest or disease. If no pest or disease is detected, suggest general crop health maintenance.",
                FieldKind::Text,
            ),
            FieldSpec::required(
                "healthPercentage",
                "The estimated health of the crop as a percentage from 0 to 100.",
                FieldKind::number_in(0.0, 100.0),
            ),
            FieldSpec::required(
                "riskLevel",
                "The risk level for the crop's health.",
                FieldKind::Choice(RISK_LEVELS),
            ),
        ],
    )
}

const TEMPLATE: &str = "\
You are an expert in agricultural plant pathology. A farmer has uploaded an \
image of their crops, and your task is to analyze the image for any signs of \
pests or diseases.

Based on the image, identify any potential pest or disease issues and provide \
recommended actions to address them. If the image shows a healthy crop, \
indicate that no issues were detected and provide general crop health \
maintenance tips.

Provide a one or two sentence summary of your recommended actions.

Also, provide an estimated health of the crop as a percentage from 0 to 100, \
where 100 is perfectly healthy.
Based on the health percentage and visible issues, classify the risk level as \
\"Good\", \"Ok\", \"Medium\", \"Risk\", or \"High Risk\".

The uploaded image is attached.

Respond with specific pest or disease names if identified, and practical, \
actionable steps the farmer can take.";

pub(crate) fn template() -> Result<PromptTemplate, AdvisoryError> {
    PromptTemplate::new("crop_image_analysis", TEMPLATE, &input_schema())
}

impl AdvisoryEngine {
    /// Diagnose pests or diseases from a crop photo.
    pub async fn analyze_crop_image(
        &self,
        input: &CropImageInput,
    ) -> Result<CropImageReport, AdvisoryError> {
        info!(flow = "crop_image_analysis", "analyzing crop photo");
        let value = serde_json::to_value(input)?;
        input_schema().validate_input(&value)?;

        let rendered = self.templates().crop_image.render(&value);
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
    fn risk_level_serde_uses_the_display_literals() {
        let level: RiskLevel = serde_json::from_str("\"High Risk\"").unwrap();
        assert_eq!(level, RiskLevel::HighRisk);
        assert_eq!(serde_json::to_string(&RiskLevel::Ok).unwrap(), "\"Ok\"");
        assert!(RiskLevel::HighRisk.needs_attention());
        assert!(!RiskLevel::Good.needs_attention());
    }

    #[test]
    fn plain_url_is_not_a_data_uri() {
        let err = input_schema()
            .validate_input(&json!({"photoDataUri": "https://example.in/leaf.jpg"}))
            .unwrap_err();
        assert!(err.to_string().contains("photoDataUri"), "{err}");
    }
}
