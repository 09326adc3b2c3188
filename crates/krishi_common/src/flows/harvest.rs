//! Harvest time prediction from crop type and planting date.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::engine::AdvisoryEngine;
use crate::error::AdvisoryError;
use crate::prompt::PromptTemplate;
use crate::schema::{FieldKind, FieldSpec, Schema};

use super::today_stamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestInput {
    pub crop_type: String,
    /// The planting date of the crop in ISO format.
    pub planting_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestPrediction {
    /// A readable date such as "October 15, 2024".
    pub estimated_harvest_date: String,
    pub days_to_harvest: i64,
}

pub(crate) fn input_schema() -> Schema {
    Schema::new(
        "harvest_input",
        vec![
            FieldSpec::required("cropType", "The type of crop planted in the field.", FieldKind::Text),
            FieldSpec::required(
                "plantingDate",
                "The planting date of the crop in ISO format.",
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
        "harvest_prediction",
        vec![
            FieldSpec::required(
                "estimatedHarvestDate",
                "The estimated harvest date in a readable format (e.g. \"October 15, 2024\").",
                FieldKind::Text,
            ),
            FieldSpec::required(
                "daysToHarvest",
                "The estimated number of days from today until the harvest.",
                FieldKind::integer(),
            ),
        ],
    )
}

const TEMPLATE: &str = "\
You are an agricultural expert. Based on the provided crop type and planting \
date, predict the estimated harvest date.

Today's date is {{today}}.

Crop Type: {{cropType}}
Planting Date: {{plantingDate}}

Calculate the estimated harvest date and the number of days from today until \
harvest. Provide a specific date for the harvest.";

pub(crate) fn template() -> Result<PromptTemplate, AdvisoryError> {
    PromptTemplate::new("harvest_time", TEMPLATE, &prompt_schema())
}

impl AdvisoryEngine {
    /// Estimated harvest date and days remaining for a planted crop.
    pub async fn predict_harvest_time(
        &self,
        input: &HarvestInput,
    ) -> Result<HarvestPrediction, AdvisoryError> {
        info!(flow = "harvest_time", crop = %input.crop_type, "predicting harvest window");
        let value = serde_json::to_value(input)?;
        input_schema().validate_input(&value)?;

        let prompt_value = json!({
            "cropType": input.crop_type,
            "plantingDate": input.planting_date,
            "today": today_stamp(),
        });
        let rendered = self.templates().harvest.render(&prompt_value);
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
}
