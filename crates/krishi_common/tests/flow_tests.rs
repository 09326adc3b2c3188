//! End-to-end flow tests against a scripted backend.
//!
//! These exercise the full pipeline for each flow: input validation,
//! prompt rendering, invocation, and reply validation, with the backend
//! doubled so every prompt and call count can be inspected.

use std::sync::Arc;

use krishi_common::flows::credit::CreditInput;
use krishi_common::flows::crop_image::{CropImageInput, RISK_LEVELS};
use krishi_common::flows::field_health::FieldHealthInput;
use krishi_common::flows::harvest::{HarvestInput, HarvestPrediction};
use krishi_common::flows::market::MarketQuery;
use krishi_common::flows::schemes::{Scheme, SchemeQuery};
use krishi_common::flows::watering::WateringInput;
use krishi_common::{AdvisorConfig, AdvisoryEngine, AdvisoryError, FakeBackend};
use rand::distributions::{Alphanumeric, DistString};
use serde_json::json;

fn engine_with(fake: &Arc<FakeBackend>) -> AdvisoryEngine {
    let mut config = AdvisorConfig::default();
    config.retry.base_delay_ms = 1;
    AdvisoryEngine::new(fake.clone(), config).unwrap()
}

fn forecast_reply() -> serde_json::Value {
    json!({
        "forecast": [
            {
                "day": "Friday",
                "date": "August 7",
                "highTemp": 34.0,
                "lowTemp": 26.0,
                "condition": "Sunny",
                "precipitationChance": 10.0,
            }
        ],
        "locationName": "Pusa, Bihar, India",
    })
}

fn diagnosis_reply(risk_level: &str) -> serde_json::Value {
    json!({
        "pestOrDisease": "Leaf rust",
        "summary": "Treat with a recommended fungicide within the week.",
        "recommendedActions": "Apply propiconazole and remove affected leaves.",
        "healthPercentage": 58.0,
        "riskLevel": risk_level,
    })
}

#[tokio::test]
async fn validation_failure_never_reaches_the_backend() {
    let fake = Arc::new(FakeBackend::new());
    let engine = engine_with(&fake);

    let err = engine
        .market_analysis(&MarketQuery {
            crop_type: "".into(),
            region: "Bihar".into(),
        })
        .await
        .unwrap_err();
    match err {
        AdvisoryError::Validation { field, .. } => assert_eq!(field, "cropType"),
        other => panic!("unexpected error: {other}"),
    }

    let err = engine
        .assess_credit(&CreditInput {
            name: "Ravi Kumar".into(),
            state: "Bihar".into(),
            crop_type: "Wheat".into(),
            loan_amount: -50000.0,
            land_size: 3.5,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AdvisoryError::Validation { .. }));

    assert_eq!(fake.generate_calls(), 0);
    assert_eq!(fake.chat_calls(), 0);
}

#[tokio::test]
async fn prompt_contains_every_input_value() {
    let fake = Arc::new(FakeBackend::new());
    fake.push_reply(&json!({
        "estimatedHarvestDate": "October 15, 2024",
        "daysToHarvest": 45,
    }));
    let engine = engine_with(&fake);

    engine
        .predict_harvest_time(&HarvestInput {
            crop_type: "Wheat".into(),
            planting_date: "2024-06-01".into(),
        })
        .await
        .unwrap();

    let prompt = &fake.prompts()[0];
    assert!(prompt.contains("Wheat"), "{prompt}");
    assert!(prompt.contains("2024-06-01"), "{prompt}");
}

#[tokio::test]
async fn conformant_reply_round_trips_unchanged() {
    let fake = Arc::new(FakeBackend::new());
    fake.push_reply(&json!({
        "schemes": [
            {
                "name": "PM-KISAN",
                "description": "Income support of Rs 6000 per year to landholding farmer families.",
                "eligibility": "All landholding farmer families with cultivable land.",
                "benefit": "Rs 6000 per year in three installments.",
            },
            {
                "name": "PMFBY",
                "description": "Crop insurance against yield losses from natural calamities.",
                "eligibility": "Farmers growing notified crops in notified areas.",
                "benefit": "Insurance cover at a nominal premium.",
            }
        ]
    }));
    let engine = engine_with(&fake);

    let matches = engine
        .find_schemes(&SchemeQuery {
            state: "Bihar".into(),
            crop_type: "Wheat".into(),
        })
        .await
        .unwrap();

    assert_eq!(matches.schemes.len(), 2);
    assert_eq!(
        matches.schemes[0],
        Scheme {
            name: "PM-KISAN".into(),
            description: "Income support of Rs 6000 per year to landholding farmer families.".into(),
            eligibility: "All landholding farmer families with cultivable land.".into(),
            benefit: "Rs 6000 per year in three installments.".into(),
        }
    );
    assert_eq!(matches.schemes[1].name, "PMFBY");
}

#[tokio::test]
async fn missing_output_field_is_a_schema_mismatch() {
    let fake = Arc::new(FakeBackend::new());
    fake.push_reply(&json!({
        "estimatedHarvestDate": "October 15, 2024",
    }));
    let engine = engine_with(&fake);

    let err = engine
        .predict_harvest_time(&HarvestInput {
            crop_type: "Wheat".into(),
            planting_date: "2024-06-01".into(),
        })
        .await
        .unwrap_err();
    match err {
        AdvisoryError::SchemaMismatch(message) => {
            assert!(message.contains("daysToHarvest"), "{message}")
        }
        other => panic!("unexpected error: {other}"),
    }
    // A mismatched reply points at a prompt defect; it must not be retried.
    assert_eq!(fake.generate_calls(), 1);
}

#[tokio::test]
async fn risk_level_enumeration_is_closed() {
    let photo = CropImageInput {
        photo_data_uri: "data:image/jpeg;base64,Zm9v".into(),
    };

    for level in RISK_LEVELS {
        let fake = Arc::new(FakeBackend::new());
        fake.push_reply(&diagnosis_reply(level));
        let report = engine_with(&fake).analyze_crop_image(&photo).await.unwrap();
        assert_eq!(report.risk_level.as_str(), *level);
    }

    let mut rng = rand::thread_rng();
    let mut outsiders: Vec<String> = (0..16)
        .map(|len| Alphanumeric.sample_string(&mut rng, len + 1))
        .collect();
    outsiders.extend(["good", "HIGH RISK", "Critical", "Severe", ""].map(String::from));

    for outsider in outsiders {
        if RISK_LEVELS.contains(&outsider.as_str()) {
            continue;
        }
        let fake = Arc::new(FakeBackend::new());
        fake.push_reply(&diagnosis_reply(&outsider));
        let err = engine_with(&fake)
            .analyze_crop_image(&photo)
            .await
            .unwrap_err();
        assert!(
            matches!(err, AdvisoryError::SchemaMismatch(_)),
            "'{outsider}' was accepted"
        );
    }
}

#[tokio::test]
async fn watering_day_count_appears_verbatim_in_prompt() {
    let fake = Arc::new(FakeBackend::new());
    fake.push_reply(&forecast_reply());
    fake.push_reply(&json!({
        "recommendation": "Water within the next 24 hours to prevent heat stress.",
    }));
    let engine = engine_with(&fake);

    let planted = chrono::Local::now()
        .date_naive()
        .checked_sub_days(chrono::Days::new(10))
        .unwrap();
    let advice = engine
        .watering_recommendation(&WateringInput {
            crop_type: "Maize".into(),
            planting_date: planted.format("%Y-%m-%d").to_string(),
            latitude: 25.9,
            longitude: 85.7,
        })
        .await
        .unwrap();

    assert_eq!(
        advice.recommendation,
        "Water within the next 24 hours to prevent heat stress."
    );
    // First call is the weather flow, second is the watering prompt itself.
    assert_eq!(fake.generate_calls(), 2);
    let prompt = &fake.prompts()[1];
    assert!(prompt.contains("Days Since Planting: 10"), "{prompt}");
    assert!(prompt.contains("Condition: Sunny"), "{prompt}");
}

#[tokio::test]
async fn watering_rejects_malformed_planting_date_before_any_call() {
    let fake = Arc::new(FakeBackend::new());
    let engine = engine_with(&fake);

    let err = engine
        .watering_recommendation(&WateringInput {
            crop_type: "Maize".into(),
            planting_date: "last monsoon".into(),
            latitude: 25.9,
            longitude: 85.7,
        })
        .await
        .unwrap_err();
    match err {
        AdvisoryError::Validation { field, .. } => assert_eq!(field, "plantingDate"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fake.generate_calls(), 0);
}

#[tokio::test]
async fn backend_errors_are_retried_then_succeed() {
    let fake = Arc::new(FakeBackend::new());
    fake.push_generate_error("connection refused");
    fake.push_generate_error("connection refused");
    fake.push_reply(&json!({
        "estimatedHarvestDate": "October 15, 2024",
        "daysToHarvest": 45,
    }));
    let engine = engine_with(&fake);

    let prediction = engine
        .predict_harvest_time(&HarvestInput {
            crop_type: "Wheat".into(),
            planting_date: "2024-06-01".into(),
        })
        .await
        .unwrap();
    assert_eq!(
        prediction,
        HarvestPrediction {
            estimated_harvest_date: "October 15, 2024".into(),
            days_to_harvest: 45,
        }
    );
    assert_eq!(fake.generate_calls(), 3);
}

#[tokio::test]
async fn backend_errors_exhaust_the_retry_budget() {
    let fake = Arc::new(FakeBackend::new());
    fake.push_generate_error("connection refused");
    let engine = engine_with(&fake);

    let err = engine
        .predict_harvest_time(&HarvestInput {
            crop_type: "Wheat".into(),
            planting_date: "2024-06-01".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AdvisoryError::Backend(_)));
    // One initial attempt plus two retries.
    assert_eq!(fake.generate_calls(), 3);
}

#[tokio::test]
async fn field_health_forwards_the_satellite_image() {
    let fake = Arc::new(FakeBackend::new());
    fake.push_reply(&json!({
        "summary": "The field is in good condition with minor moisture stress at the northern edge.",
        "ndvi": 0.72,
        "soilMoisture": 38.0,
        "cropStress": "Low",
        "droughtRisk": "Medium",
        "floodRisk": "Low",
        "pestDiseaseLikelihood": "Low",
        "yieldAnomalyPrediction": "Normal",
        "suggestedActions": "1. Irrigate the northern edge.\n2. Re-check NDVI in a week.",
    }));
    let engine = engine_with(&fake);

    let report = engine
        .field_health_summary(&FieldHealthInput {
            field_id: "field-7".into(),
            satellite_imagery_data_uri: "data:image/png;base64,c2F0ZWxsaXRl".into(),
            weather_data: "32C, dry, light wind".into(),
            crop_type: "Rice".into(),
            planting_date: "2024-07-01".into(),
        })
        .await
        .unwrap();

    assert!((report.ndvi - 0.72).abs() < f64::EPSILON);
    let media = fake.media();
    assert_eq!(media[0].len(), 1);
    assert_eq!(media[0][0].mime, "image/png");
    assert_eq!(media[0][0].data, "c2F0ZWxsaXRl");
    // The raw data URI must not leak into the prompt text.
    assert!(!fake.prompts()[0].contains("c2F0ZWxsaXRl"));
}

#[tokio::test]
async fn fenced_model_reply_is_still_parsed() {
    let fake = Arc::new(FakeBackend::new());
    fake.push_reply_text(
        "Here is the prediction:\n```json\n{\"estimatedHarvestDate\": \"October 15, 2024\", \"daysToHarvest\": 45}\n```",
    );
    let engine = engine_with(&fake);

    let prediction = engine
        .predict_harvest_time(&HarvestInput {
            crop_type: "Wheat".into(),
            planting_date: "2024-06-01".into(),
        })
        .await
        .unwrap();
    assert_eq!(prediction.days_to_harvest, 45);
}

#[tokio::test]
async fn farming_news_serves_the_curated_digest_without_a_backend() {
    let fake = Arc::new(FakeBackend::new());
    let engine = engine_with(&fake);

    let digest = engine.farming_news().await.unwrap();
    assert_eq!(digest.articles.len(), 5);
    assert_eq!(
        digest.articles[0].title,
        "Government Increases MSP for Kharif Crops"
    );
    assert_eq!(fake.generate_calls(), 0);
}
