//! Simulated creditworthiness assessment for agricultural loans.
//!
//! The partner bank list is fixed in the prompt; the model picks up to
//! three that fit the farmer's profile.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::AdvisoryEngine;
use crate::error::AdvisoryError;
use crate::prompt::PromptTemplate;
use crate::schema::{FieldKind, FieldSpec, Schema};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditInput {
    /// The farmer's full name.
    pub name: String,
    /// The state where the farmer resides.
    pub state: String,
    /// The primary crop the farmer cultivates.
    pub crop_type: String,
    /// The requested loan amount in INR.
    pub loan_amount: f64,
    /// The size of the farmer's land in acres.
    pub land_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerBank {
    pub name: String,
    /// The official website URL for the bank's agricultural loan section.
    pub website: String,
    /// A brief contact instruction, e.g. "Visit branch".
    pub contact_info: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditAssessment {
    pub is_eligible: bool,
    /// May be the same as or lower than the requested amount, in INR.
    pub approved_amount: f64,
    /// Simulated annual interest rate.
    pub interest_rate: f64,
    pub reasoning: String,
    pub next_steps: String,
    pub partner_banks: Vec<PartnerBank>,
}

pub(crate) fn input_schema() -> Schema {
    Schema::new(
        "credit_advisor_input",
        vec![
            FieldSpec::required("name", "The farmer's full name.", FieldKind::Text),
            FieldSpec::required("state", "The state where the farmer resides.", FieldKind::Text),
            FieldSpec::required(
                "cropType",
                "The primary crop the farmer cultivates.",
                FieldKind::Text,
            ),
            FieldSpec::required(
                "loanAmount",
                "The requested loan amount in INR.",
                FieldKind::Number {
                    min: Some(0.0),
                    max: None,
                },
            ),
            FieldSpec::required(
                "landSize",
                "The size of the farmer's land in acres.",
                FieldKind::Number {
                    min: Some(0.0),
                    max: None,
                },
            ),
        ],
    )
}

pub(crate) fn output_schema() -> Schema {
    Schema::new(
        "credit_assessment",
        vec![
            FieldSpec::required(
                "isEligible",
                "Whether the farmer is deemed eligible for the loan based on the assessment.",
                FieldKind::Boolean,
            ),
            FieldSpec::required(
                "approvedAmount",
                "The recommended loan amount in INR. This can be the same as or lower than the requested amount.",
                FieldKind::Number {
                    min: Some(0.0),
                    max: None,
                },
            ),
            FieldSpec::required(
                "interestRate",
                "A simulated annual interest rate for the loan.",
                FieldKind::Number {
                    min: Some(0.0),
                    max: None,
                },
            ),
            FieldSpec::required(
                "reasoning",
                "A brief, 1-2 sentence explanation for the decision, highlighting key positive or negative factors.",
                FieldKind::Text,
            ),
            FieldSpec::required(
                "nextSteps",
                "Clear, actionable next steps for the farmer to take, such as 'Prepare land ownership documents' or 'Contact a partner bank'.",
                FieldKind::Text,
            ),
            FieldSpec::required(
                "partnerBanks",
                "A list of up to 3 recommended partner banks that are a good fit for the farmer's profile and loan request.",
                FieldKind::List(Box::new(FieldKind::Record(vec![
                    FieldSpec::required("name", "The name of the partner bank.", FieldKind::Text),
                    FieldSpec::required(
                        "website",
                        "The official website URL for the bank's agricultural loan section.",
                        FieldKind::Text,
                    ),
                    FieldSpec::required(
                        "contactInfo",
                        "A brief contact instruction, e.g. 'Visit branch' or a (simulated) phone number.",
                        FieldKind::Text,
                    ),
                ]))),
            ),
        ],
    )
}

const TEMPLATE: &str = "\
You are an AI credit advisor for an agricultural finance company.

Your task is to perform a simulated creditworthiness assessment for a farmer \
based on the information provided. This is a simulation, so you should \
generate a realistic but not real assessment.

Consider the following factors in your decision:
- Loan Amount: Higher amounts might carry more risk.
- Crop Type: Certain crops might be considered more stable or profitable.
- Land Size: Larger land holdings may indicate a greater capacity for repayment.
- State: You can invent plausible risk factors based on simulated regional economic conditions.

Based on your assessment, decide if the farmer is eligible. Determine an \
appropriate approved loan amount (which may be less than requested) and a \
reasonable interest rate.

Provide a concise reasoning for your decision and clear next steps for the \
farmer.

Crucially, if the farmer is eligible, you must recommend up to 3 of the most \
suitable partner banks from the list below. Base your recommendation on the \
farmer's state, crop type, and loan amount.

List of Potential Partner Banks:
1. State Bank of India (SBI) - Website: https://sbi.co.in/web/agri-rural - Contact: Visit nearest branch - Specialty: Nationwide presence, wide range of agri loans. Good for all crop types.
2. HDFC Bank - Website: https://www.hdfcbank.com/agri - Contact: Online application - Specialty: Focus on technology-driven farming, horticulture, and high-value crops. Prefers medium to large land holdings.
3. Punjab National Bank (PNB) - Website: https://www.pnbindia.in/agriculture-banking.html - Contact: Visit nearest branch - Specialty: Strong presence in Northern India, good for staple crops like wheat and rice.
4. ICICI Bank - Website: https://www.icicibank.com/rural/agri-business/index.page - Contact: Online application or call virtual RM - Specialty: Agri-business loans, good for farmers with secondary income sources.
5. Bank of Baroda - Website: https://www.bankofbaroda.in/agriculture-banking - Contact: Visit nearest branch - Specialty: Strong in Western and Southern India, good for cotton, sugarcane, and spices.

Farmer's Name: {{name}}
State: {{state}}
Primary Crop: {{cropType}}
Requested Loan Amount: {{loanAmount}} INR
Land Size (acres): {{landSize}}";

pub(crate) fn template() -> Result<PromptTemplate, AdvisoryError> {
    PromptTemplate::new("credit_advisor", TEMPLATE, &input_schema())
}

impl AdvisoryEngine {
    /// Simulated credit assessment for a loan request.
    pub async fn assess_credit(&self, input: &CreditInput) -> Result<CreditAssessment, AdvisoryError> {
        info!(flow = "credit_advisor", state = %input.state, "assessing credit request");
        let value = serde_json::to_value(input)?;
        input_schema().validate_input(&value)?;

        let rendered = self.templates().credit.render(&value);
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
    fn negative_loan_amount_is_rejected() {
        let err = input_schema()
            .validate_input(&json!({
                "name": "Ravi Kumar",
                "state": "Bihar",
                "cropType": "Wheat",
                "loanAmount": -50000.0,
                "landSize": 3.5,
            }))
            .unwrap_err();
        assert!(err.to_string().contains("loanAmount"), "{err}");
    }
}
