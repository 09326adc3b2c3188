//! Government scheme discovery for a farmer's state and crop.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::AdvisoryEngine;
use crate::error::AdvisoryError;
use crate::prompt::PromptTemplate;
use crate::schema::{FieldKind, FieldSpec, Schema};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeQuery {
    /// The state where the farmer resides.
    pub state: String,
    /// The primary crop the farmer cultivates.
    pub crop_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scheme {
    /// The official name of the government scheme.
    pub name: String,
    pub description: String,
    pub eligibility: String,
    pub benefit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeMatches {
    pub schemes: Vec<Scheme>,
}

pub(crate) fn input_schema() -> Schema {
    Schema::new(
        "find_schemes_input",
        vec![
            FieldSpec::required("state", "The state where the farmer resides.", FieldKind::Text),
            FieldSpec::required(
                "cropType",
                "The primary crop the farmer cultivates.",
                FieldKind::Text,
            ),
        ],
    )
}

pub(crate) fn output_schema() -> Schema {
    Schema::new(
        "scheme_matches",
        vec![FieldSpec::required(
            "schemes",
            "A list of 2-3 relevant government schemes for the farmer.",
            FieldKind::List(Box::new(FieldKind::Record(vec![
                FieldSpec::required(
                    "name",
                    "The official name of the government scheme.",
                    FieldKind::Text,
                ),
                FieldSpec::required(
                    "description",
                    "A brief, one or two-sentence description of the scheme's purpose and benefits.",
                    FieldKind::Text,
                ),
                FieldSpec::required(
                    "eligibility",
                    "A concise summary of the key eligibility criteria for a farmer to apply.",
                    FieldKind::Text,
                ),
                FieldSpec::required(
                    "benefit",
                    "A summary of the primary financial or material benefit provided by the scheme.",
                    FieldKind::Text,
                ),
            ]))),
        )],
    )
}

const TEMPLATE: &str = "\
You are an expert on Indian agricultural policies and government schemes.

A farmer has provided their state and primary crop type. Your task is to \
identify the top 2-3 most relevant and beneficial central and state-level \
government schemes available to them.

For each scheme, provide a clear and concise summary covering its name, \
description, eligibility, and key benefits. Focus on schemes related to crop \
insurance, credit access, subsidies for seeds/fertilizers, and equipment.

Farmer's State: {{state}}
Primary Crop: {{cropType}}

Generate a list of the most impactful schemes.";

pub(crate) fn template() -> Result<PromptTemplate, AdvisoryError> {
    PromptTemplate::new("find_schemes", TEMPLATE, &input_schema())
}

impl AdvisoryEngine {
    /// The most relevant government schemes for a state and crop.
    pub async fn find_schemes(&self, input: &SchemeQuery) -> Result<SchemeMatches, AdvisoryError> {
        info!(flow = "find_schemes", state = %input.state, "looking up schemes");
        let value = serde_json::to_value(input)?;
        input_schema().validate_input(&value)?;

        let rendered = self.templates().schemes.render(&value);
        self.structured(rendered, &output_schema()).await
    }
}
