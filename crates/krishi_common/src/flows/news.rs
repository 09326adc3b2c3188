//! Curated farming news and best-practice digest.
//!
//! This flow deliberately serves a fixed digest instead of consulting the
//! live news collaborator, so it works without an external API key. The
//! collaborator client lives in [`crate::news`] for surfaces that want
//! live headlines.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::AdvisoryEngine;
use crate::error::AdvisoryError;
use crate::schema::{FieldKind, FieldSpec, Schema};

pub const CATEGORIES: &[&str] = &["News", "Best Practice", "New Scheme"];
pub const ICONS: &[&str] = &["newspaper", "lightbulb", "gift"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewsCategory {
    News,
    #[serde(rename = "Best Practice")]
    BestPractice,
    #[serde(rename = "New Scheme")]
    NewScheme,
}

impl NewsCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::News => "News",
            Self::BestPractice => "Best Practice",
            Self::NewScheme => "New Scheme",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsIcon {
    Newspaper,
    Lightbulb,
    Gift,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// The headline of the news article or tip.
    pub title: String,
    /// A one or two-sentence summary of the content.
    pub summary: String,
    pub category: NewsCategory,
    pub icon: NewsIcon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsDigest {
    pub articles: Vec<Article>,
}

pub(crate) fn output_schema() -> Schema {
    Schema::new(
        "news_digest",
        vec![FieldSpec::required(
            "articles",
            "A list of 3-5 summarized farming news articles and best practice tips.",
            FieldKind::List(Box::new(FieldKind::Record(vec![
                FieldSpec::required("title", "The headline of the news article or tip.", FieldKind::Text),
                FieldSpec::required(
                    "summary",
                    "A one or two-sentence summary of the content.",
                    FieldKind::Text,
                ),
                FieldSpec::required(
                    "category",
                    "The category of the content.",
                    FieldKind::Choice(CATEGORIES),
                ),
                FieldSpec::required(
                    "icon",
                    "An appropriate icon name (\"newspaper\" for News, \"lightbulb\" for Best Practice, \"gift\" for New Scheme).",
                    FieldKind::Choice(ICONS),
                ),
            ]))),
        )],
    )
}

fn article(title: &str, summary: &str, category: NewsCategory, icon: NewsIcon) -> Article {
    Article {
        title: title.to_string(),
        summary: summary.to_string(),
        category,
        icon,
    }
}

/// The fixed digest served to every caller.
pub fn curated_digest() -> NewsDigest {
    NewsDigest {
        articles: vec![
            article(
                "Government Increases MSP for Kharif Crops",
                "The central government has announced a hike in the Minimum Support Price for several key Kharif crops to boost farmer income.",
                NewsCategory::News,
                NewsIcon::Newspaper,
            ),
            article(
                "Pradhan Mantri Fasal Bima Yojana (PMFBY) Application Window Open",
                "Farmers can now apply for the government's flagship crop insurance scheme to protect against yield losses.",
                NewsCategory::NewScheme,
                NewsIcon::Gift,
            ),
            article(
                "Soil Health Management",
                "Regularly test your soil's pH and nutrient levels to ensure optimal crop growth. Use organic compost to improve soil structure.",
                NewsCategory::BestPractice,
                NewsIcon::Lightbulb,
            ),
            article(
                "Integrated Pest Management (IPM)",
                "Combine biological, cultural, and chemical practices to manage pests effectively while minimizing environmental impact.",
                NewsCategory::BestPractice,
                NewsIcon::Lightbulb,
            ),
            article(
                "Water Conservation Techniques",
                "Utilize drip irrigation or sprinkler systems to reduce water wastage. Mulching can also help retain soil moisture.",
                NewsCategory::BestPractice,
                NewsIcon::Lightbulb,
            ),
        ],
    }
}

impl AdvisoryEngine {
    /// The farming news digest. Serves the curated list; no model call.
    pub async fn farming_news(&self) -> Result<NewsDigest, AdvisoryError> {
        info!(flow = "farming_news", "serving curated digest");
        Ok(curated_digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curated_digest_conforms_to_its_schema() {
        let digest = curated_digest();
        assert!(digest.articles.len() >= 3 && digest.articles.len() <= 5);
        let value = serde_json::to_value(&digest).unwrap();
        output_schema().validate_output(&value).unwrap();
    }

    #[test]
    fn category_literals_match_display_names() {
        assert_eq!(
            serde_json::to_string(&NewsCategory::BestPractice).unwrap(),
            "\"Best Practice\""
        );
        assert_eq!(NewsCategory::NewScheme.as_str(), "New Scheme");
        assert_eq!(serde_json::to_string(&NewsIcon::Gift).unwrap(), "\"gift\"");
    }
}
