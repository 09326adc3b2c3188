//! Command handlers: one per advisory flow, plus config and headlines.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use indicatif::{ProgressBar, ProgressStyle};
use krishi_common::flows::assistant::AssistantQuery;
use krishi_common::flows::credit::CreditInput;
use krishi_common::flows::crop_image::CropImageInput;
use krishi_common::flows::field_health::FieldHealthInput;
use krishi_common::flows::harvest::HarvestInput;
use krishi_common::flows::market::MarketQuery;
use krishi_common::flows::schemes::SchemeQuery;
use krishi_common::flows::watering::WateringInput;
use krishi_common::flows::weather::ForecastQuery;
use krishi_common::news::NewsClient;
use krishi_common::{AdvisorConfig, AdvisoryEngine};
use owo_colors::OwoColorize;

/// Spinner shown while the model is thinking.
fn thinking(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "]),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Read an image file and encode it as a `data:` URI.
fn data_uri_from_path(path: &Path) -> Result<String> {
    let mime = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        other => bail!(
            "unsupported image extension {:?} for {}",
            other.unwrap_or("none"),
            path.display()
        ),
    };
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
}

fn header(title: &str) {
    println!("\n{}", title.bold().green());
    let width = console::measure_text_width(title).max(24);
    println!("{}", "─".repeat(width).dimmed());
}

fn line(label: &str, value: impl std::fmt::Display) {
    println!("{:<22} {value}", label.bold());
}

pub async fn diagnose(engine: &AdvisoryEngine, image: &Path) -> Result<()> {
    let photo_data_uri = data_uri_from_path(image)?;
    let spinner = thinking("Analyzing crop photo...");
    let report = engine
        .analyze_crop_image(&CropImageInput { photo_data_uri })
        .await;
    spinner.finish_and_clear();
    let report = report?;

    header("Crop Diagnosis");
    line("Pest / disease:", &report.pest_or_disease);
    line("Health:", format!("{}%", report.health_percentage));
    let risk = report.risk_level.as_str();
    if report.risk_level.needs_attention() {
        line("Risk level:", risk.red().bold());
    } else {
        line("Risk level:", risk.green());
    }
    println!("\n{}", report.summary);
    println!("\n{}\n{}", "Recommended actions:".bold(), report.recommended_actions);
    Ok(())
}

pub async fn credit(
    engine: &AdvisoryEngine,
    name: String,
    state: String,
    crop: String,
    amount: f64,
    land: f64,
) -> Result<()> {
    let spinner = thinking("Assessing creditworthiness...");
    let assessment = engine
        .assess_credit(&CreditInput {
            name,
            state,
            crop_type: crop,
            loan_amount: amount,
            land_size: land,
        })
        .await;
    spinner.finish_and_clear();
    let assessment = assessment?;

    header("Credit Assessment");
    if assessment.is_eligible {
        line("Decision:", "Eligible".green().bold());
    } else {
        line("Decision:", "Not eligible".red().bold());
    }
    line("Approved amount:", format!("₹{}", assessment.approved_amount));
    line("Interest rate:", format!("{}% p.a.", assessment.interest_rate));
    println!("\n{}", assessment.reasoning);
    println!("\n{}\n{}", "Next steps:".bold(), assessment.next_steps);
    if !assessment.partner_banks.is_empty() {
        println!("\n{}", "Partner banks:".bold());
        for bank in &assessment.partner_banks {
            println!("  • {} ({}) - {}", bank.name, bank.website.dimmed(), bank.contact_info);
        }
    }
    Ok(())
}

pub async fn field_health(
    engine: &AdvisoryEngine,
    field_id: String,
    image: &Path,
    weather: String,
    crop: String,
    planted: String,
) -> Result<()> {
    let satellite_imagery_data_uri = data_uri_from_path(image)?;
    let spinner = thinking("Assessing field health...");
    let report = engine
        .field_health_summary(&FieldHealthInput {
            field_id,
            satellite_imagery_data_uri,
            weather_data: weather,
            crop_type: crop,
            planting_date: planted,
        })
        .await;
    spinner.finish_and_clear();
    let report = report?;

    header("Field Health Summary");
    line("NDVI:", report.ndvi);
    line("Soil moisture:", format!("{}%", report.soil_moisture));
    line("Crop stress:", &report.crop_stress);
    line("Drought risk:", &report.drought_risk);
    line("Flood risk:", &report.flood_risk);
    line("Pest likelihood:", &report.pest_disease_likelihood);
    line("Yield outlook:", &report.yield_anomaly_prediction);
    println!("\n{}", report.summary);
    println!("\n{}\n{}", "Suggested actions:".bold(), report.suggested_actions);
    Ok(())
}

pub async fn schemes(engine: &AdvisoryEngine, state: String, crop: String) -> Result<()> {
    let spinner = thinking("Searching government schemes...");
    let matches = engine
        .find_schemes(&SchemeQuery {
            state,
            crop_type: crop,
        })
        .await;
    spinner.finish_and_clear();
    let matches = matches?;

    header("Relevant Schemes");
    for scheme in &matches.schemes {
        println!("\n{}", scheme.name.bold().cyan());
        println!("  {}", scheme.description);
        line("  Eligibility:", &scheme.eligibility);
        line("  Benefit:", &scheme.benefit);
    }
    Ok(())
}

pub async fn news(engine: &AdvisoryEngine) -> Result<()> {
    let digest = engine.farming_news().await?;
    header("Farming News & Tips");
    for article in &digest.articles {
        println!(
            "\n[{}] {}",
            article.category.as_str().yellow(),
            article.title.bold()
        );
        println!("  {}", article.summary);
    }
    Ok(())
}

pub async fn headlines(config: AdvisorConfig) -> Result<()> {
    let client = NewsClient::new(config.news)?;
    let spinner = thinking("Fetching headlines...");
    let headlines = client.latest().await;
    spinner.finish_and_clear();

    header("Agriculture Headlines");
    if headlines.is_empty() {
        println!("{}", "No headlines available (is the news API key set?)".dimmed());
        return Ok(());
    }
    for headline in &headlines {
        println!("\n{}", headline.title.bold());
        if !headline.description.is_empty() {
            println!("  {}", headline.description);
        }
        if !headline.url.is_empty() {
            println!("  {}", headline.url.dimmed());
        }
    }
    Ok(())
}

pub async fn harvest(engine: &AdvisoryEngine, crop: String, planted: String) -> Result<()> {
    let spinner = thinking("Predicting harvest window...");
    let prediction = engine
        .predict_harvest_time(&HarvestInput {
            crop_type: crop,
            planting_date: planted,
        })
        .await;
    spinner.finish_and_clear();
    let prediction = prediction?;

    header("Harvest Prediction");
    line("Estimated date:", prediction.estimated_harvest_date.bold());
    line("Days to harvest:", prediction.days_to_harvest);
    Ok(())
}

pub async fn ask(engine: &AdvisoryEngine, query: String) -> Result<()> {
    let spinner = thinking("Krishi is thinking...");
    let reply = engine.ask_assistant(&AssistantQuery { query }).await;
    spinner.finish_and_clear();
    let reply = reply?;

    println!("\n{} {}", "Krishi:".bold().green(), reply.response);
    Ok(())
}

pub async fn market(engine: &AdvisoryEngine, crop: String, region: String) -> Result<()> {
    let spinner = thinking("Analyzing the market...");
    let report = engine
        .market_analysis(&MarketQuery {
            crop_type: crop,
            region,
        })
        .await;
    spinner.finish_and_clear();
    let report = report?;

    header("Market Analysis");
    line("Crop:", &report.crop_name);
    line(
        "Current price:",
        format!(
            "₹{} ({}, {:+}% this week)",
            report.price_trend.current_price,
            report.price_trend.trend.as_str(),
            report.price_trend.change
        ),
    );
    println!("\n{}", report.demand_forecast);
    if !report.top_buyers.is_empty() {
        println!("\n{}", "Top buyers:".bold());
        for buyer in &report.top_buyers {
            println!("  • {:<28} ₹{}", buyer.name, buyer.price);
        }
    }
    println!("\n{} {}", "Recommendation:".bold(), report.recommendation.cyan());
    Ok(())
}

pub async fn water(
    engine: &AdvisoryEngine,
    crop: String,
    planted: String,
    lat: f64,
    lon: f64,
) -> Result<()> {
    let spinner = thinking("Checking weather and crop stage...");
    let advice = engine
        .watering_recommendation(&WateringInput {
            crop_type: crop,
            planting_date: planted,
            latitude: lat,
            longitude: lon,
        })
        .await;
    spinner.finish_and_clear();
    let advice = advice?;

    header("Watering Recommendation");
    println!("{}", advice.recommendation);
    Ok(())
}

pub async fn forecast(engine: &AdvisoryEngine, lat: f64, lon: f64) -> Result<()> {
    let spinner = thinking("Simulating the forecast...");
    let forecast = engine
        .weather_forecast(&ForecastQuery {
            latitude: lat,
            longitude: lon,
        })
        .await;
    spinner.finish_and_clear();
    let forecast = forecast?;

    header(&format!("5-Day Forecast: {}", forecast.location_name));
    for day in &forecast.forecast {
        println!(
            "{:<10} {:<12} {:>3}°/{:<3}°  {:<16} {}% rain",
            day.day.bold(),
            day.date,
            day.high_temp,
            day.low_temp,
            day.condition,
            day.precipitation_chance
        );
    }
    Ok(())
}

pub fn show_config(config: &AdvisorConfig) -> Result<()> {
    header("Configuration");
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
