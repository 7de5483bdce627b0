mod config;
mod elements;
mod predict;
mod web;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;

use crate::config::Config;
use crate::elements::{ElementCache, SourceRegistry};
use crate::predict::{Observer, Prediction, PredictionRequest, Predictor, Sgp4Oracle};

#[derive(Parser)]
#[command(name = "skypass")]
#[command(about = "Satellite pass prediction")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict visible passes over an observer
    Predict {
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,
        /// Observer altitude in metres
        #[arg(long, allow_hyphen_values = true)]
        alt: Option<f64>,
        #[arg(long, default_value_t = 25544)]
        norad: u32,
        #[arg(long)]
        hours: Option<u32>,
        /// Minimum elevation in degrees
        #[arg(long, allow_hyphen_values = true)]
        min_elev: Option<f64>,
        /// Fine sampling step in minutes
        #[arg(long)]
        resolution: Option<f64>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Fetch and print the element set for a catalog number
    Elements {
        #[arg(long, default_value_t = 25544)]
        norad: u32,
    },
    /// Run the HTTP API
    Serve,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Predict {
            lat,
            lon,
            alt,
            norad,
            hours,
            min_elev,
            resolution,
            json,
        } => {
            let observer = match resolve_observer(&config, lat, lon, alt) {
                Ok(o) => o,
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::FAILURE;
                }
            };
            let request = PredictionRequest {
                observer,
                catalog_id: norad,
                hours: hours.unwrap_or(config.search.default_hours),
                min_elevation_deg: min_elev.unwrap_or(config.search.default_min_elevation),
                fine_resolution_minutes: Some(
                    resolution.unwrap_or(config.search.fine_resolution_minutes),
                ),
            };
            runtime.block_on(predict(&config, request, json))
        }
        Commands::Elements { norad } => runtime.block_on(elements(&config, norad)),
        Commands::Serve => match runtime.block_on(web::run_server(config)) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Server error: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn load_config(path: Option<&str>) -> Result<Config, config::ConfigError> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
}

fn resolve_observer(
    config: &Config,
    lat: Option<f64>,
    lon: Option<f64>,
    alt: Option<f64>,
) -> Result<Observer, String> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => {
            Observer::new(lat, lon, alt.unwrap_or(0.0)).map_err(|e| e.to_string())
        }
        (None, None) => match config.default_observer().map_err(|e| e.to_string())? {
            Some(o) => match alt {
                Some(alt) => Observer::new(o.latitude_deg, o.longitude_deg, alt)
                    .map_err(|e| e.to_string()),
                None => Ok(o),
            },
            None => Err("--lat and --lon are required without a configured observer".into()),
        },
        _ => Err("--lat and --lon must be given together".into()),
    }
}

fn build_predictor(config: &Config) -> Result<Predictor, String> {
    let registry = SourceRegistry::from_config(&config.sources()).map_err(|e| e.to_string())?;
    let cache = ElementCache::new(registry, config.cache_settings());
    Ok(Predictor::new(Arc::new(cache), config.search_settings()))
}

async fn predict(config: &Config, request: PredictionRequest, json: bool) -> ExitCode {
    let predictor = match build_predictor(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error building sources: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let prediction = match predictor.predict(&request).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Prediction failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if json {
        match serde_json::to_string_pretty(&prediction) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error encoding JSON: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    print_table(&prediction, request.observer);
    ExitCode::SUCCESS
}

fn print_table(prediction: &Prediction, observer: Observer) {
    println!(
        "{} (NORAD {}) from {}, {} passes",
        prediction.elements.name,
        prediction.elements.catalog_id,
        prediction.source,
        prediction.passes.len()
    );

    // Azimuths are informational; a propagation failure only blanks the column.
    let oracle = Sgp4Oracle::new(&prediction.elements, observer).ok();
    let azimuth = |t: chrono::DateTime<chrono::Utc>| {
        oracle
            .as_ref()
            .and_then(|o| o.look_angles(t).ok())
            .map(|a| format!("{:>5.0}", a.azimuth_deg))
            .unwrap_or_else(|| "    -".to_string())
    };

    println!(
        "  {:<20} {:>5}  {:<20} {:>6}  {:<20} {:>5}  {:>6}",
        "rise", "az", "peak", "el", "set", "az", "min"
    );
    for pass in &prediction.passes {
        println!(
            "  {:<20} {}  {:<20} {:>6.1}  {:<20} {}  {:>6.1}",
            pass.start.format("%Y-%m-%d %H:%M:%S"),
            azimuth(pass.start),
            pass.peak.format("%Y-%m-%d %H:%M:%S"),
            pass.max_elevation_deg,
            pass.end.format("%Y-%m-%d %H:%M:%S"),
            azimuth(pass.end),
            pass.duration().num_seconds() as f64 / 60.0
        );
    }
}

async fn elements(config: &Config, norad: u32) -> ExitCode {
    let predictor = match build_predictor(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error building sources: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let cache = predictor.cache();
    match cache.get_elements(norad).await {
        Ok(elements) => {
            println!("{}", elements.name);
            println!("{}", elements.line1);
            println!("{}", elements.line2);
            if let Some(entry) = cache.entry(norad) {
                println!("# source: {}, fetched {}", entry.source, entry.fetched_at);
                if let Some(mismatch) = entry.mismatch {
                    println!("# warning: {}", mismatch);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
