// src/main.rs
// Roulette - spin through nearby restaurants from the command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use roulette::clock::SystemClock;
use roulette::config::{ApiKeys, RouletteConfig};
use roulette::search::{FixtureSearch, PlaceSearch, PlacesClient};
use roulette::{EngineError, SpinEngine, SpinOutcome};
use roulette_types::{LatLng, MealTime};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "roulette")]
#[command(about = "Restaurant roulette: random picks from what's open nearby")]
#[command(version)]
struct Cli {
    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Spin a few times and print each pick as a JSON line
    Spin {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        /// now, breakfast, lunch, dinner or late_night
        #[arg(short, long)]
        meal: Option<String>,

        /// Number of spins
        #[arg(short, long, default_value = "1")]
        count: usize,

        /// Serve candidates from a JSON file instead of the places API
        #[arg(long)]
        fixture: Option<PathBuf>,
    },
}

fn build_search(fixture: Option<PathBuf>, config: &RouletteConfig) -> Result<Arc<dyn PlaceSearch>> {
    if let Some(path) = fixture {
        let search = FixtureSearch::from_path(&path)
            .with_context(|| format!("failed to load fixture {}", path.display()))?;
        info!(path = %path.display(), candidates = search.len(), "Using fixture search");
        return Ok(Arc::new(search));
    }

    let Some(key) = ApiKeys::from_env().places else {
        return Err(EngineError::Config(
            "no places API key: set PLACES_API_KEY or pass --fixture <file>".to_string(),
        )
        .into());
    };
    Ok(Arc::new(PlacesClient::new(key, config.search_config())?))
}

async fn run_spin(
    location: LatLng,
    meal: Option<String>,
    count: usize,
    fixture: Option<PathBuf>,
) -> Result<()> {
    let meal_time = match meal.as_deref() {
        Some(name) => Some(
            MealTime::from_name(name)
                .ok_or_else(|| EngineError::Config(format!("unknown meal time '{}'", name)))?,
        ),
        None => None,
    };

    let config = RouletteConfig::load();
    let search = build_search(fixture, &config)?;
    let engine = SpinEngine::new(
        config.session_config(location, meal_time),
        config.engine_config(),
        search,
        Arc::new(SystemClock),
    );
    engine.start().await;

    for _ in 0..count {
        let line = match engine.spin().await {
            SpinOutcome::Presented(candidate) => json!({ "candidate": candidate }),
            SpinOutcome::Fallback { candidate, error } => {
                json!({ "candidate": candidate, "fallback": true, "error": error.to_string() })
            }
            SpinOutcome::Unavailable(error) => json!({ "error": error.to_string() }),
            SpinOutcome::Ignored => continue,
        };
        println!("{}", line);
    }

    let stats = engine.pool_stats();
    info!(
        pool_size = stats.pool_size,
        refills = stats.refills,
        failures = stats.failures,
        "Session finished"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Some(home) = dirs::home_dir() {
        let _ = dotenvy::from_path(home.join(".roulette/.env"));
    }
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Spin {
            lat,
            lng,
            meal,
            count,
            fixture,
        } => run_spin(LatLng::new(lat, lng), meal, count, fixture).await?,
    }

    Ok(())
}
