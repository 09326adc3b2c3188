//! Krishi Control - CLI client for the Krishi Sahayak advisory engine.
//!
//! One subcommand per advisory flow, talking to an Ollama-compatible model
//! endpoint configured in `~/.config/krishi/config.toml`.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use krishi_common::{AdvisorConfig, AdvisoryEngine, OllamaBackend};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "krishictl")]
#[command(about = "Krishi Sahayak - AI advisory for Indian farmers", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (default: ~/.config/krishi/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diagnose pests or diseases from a crop photo
    Diagnose {
        /// Path to a JPEG, PNG, or WebP image of the crop
        image: PathBuf,
    },

    /// Simulated credit assessment for a loan request
    Credit {
        #[arg(long)]
        name: String,
        #[arg(long)]
        state: String,
        #[arg(long)]
        crop: String,
        /// Requested loan amount in INR
        #[arg(long)]
        amount: f64,
        /// Land size in acres
        #[arg(long)]
        land: f64,
    },

    /// Field health assessment from satellite imagery
    FieldHealth {
        #[arg(long)]
        field_id: String,
        /// Path to a satellite image of the field
        #[arg(long)]
        image: PathBuf,
        /// Free-form weather data for the field
        #[arg(long)]
        weather: String,
        #[arg(long)]
        crop: String,
        /// Planting date, ISO format
        #[arg(long)]
        planted: String,
    },

    /// Find relevant government schemes
    Schemes {
        #[arg(long)]
        state: String,
        #[arg(long)]
        crop: String,
    },

    /// Show the curated farming news digest
    News,

    /// Fetch live agriculture headlines (needs a news API key)
    Headlines,

    /// Predict the harvest window for a planted crop
    Harvest {
        #[arg(long)]
        crop: String,
        /// Planting date, ISO format
        #[arg(long)]
        planted: String,
    },

    /// Ask Krishi, the conversational assistant
    Ask {
        /// A farming question, in Tamil or English
        query: String,
    },

    /// Simulated mandi market analysis for a crop
    Market {
        #[arg(long)]
        crop: String,
        /// A state or district in India
        #[arg(long)]
        region: String,
    },

    /// Watering recommendation for the next 24-48 hours
    Water {
        #[arg(long)]
        crop: String,
        /// Planting date, ISO format
        #[arg(long)]
        planted: String,
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
    },

    /// Simulated 5-day weather forecast for a location
    Forecast {
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
    },

    /// Show the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AdvisorConfig::load(path)?,
        None => AdvisorConfig::load_or_default()?,
    };

    if let Commands::Config = cli.command {
        return commands::show_config(&config);
    }
    if let Commands::Headlines = cli.command {
        return commands::headlines(config).await;
    }

    let backend = Arc::new(OllamaBackend::new(config.backend.clone())?);
    let engine = AdvisoryEngine::new(backend, config)?;

    match cli.command {
        Commands::Diagnose { image } => commands::diagnose(&engine, &image).await,
        Commands::Credit {
            name,
            state,
            crop,
            amount,
            land,
        } => commands::credit(&engine, name, state, crop, amount, land).await,
        Commands::FieldHealth {
            field_id,
            image,
            weather,
            crop,
            planted,
        } => commands::field_health(&engine, field_id, &image, weather, crop, planted).await,
        Commands::Schemes { state, crop } => commands::schemes(&engine, state, crop).await,
        Commands::News => commands::news(&engine).await,
        Commands::Harvest { crop, planted } => commands::harvest(&engine, crop, planted).await,
        Commands::Ask { query } => commands::ask(&engine, query).await,
        Commands::Market { crop, region } => commands::market(&engine, crop, region).await,
        Commands::Water {
            crop,
            planted,
            lat,
            lon,
        } => commands::water(&engine, crop, planted, lat, lon).await,
        Commands::Forecast { lat, lon } => commands::forecast(&engine, lat, lon).await,
        Commands::Config | Commands::Headlines => unreachable!(),
    }
}
