#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for Raahi: route eco-scores, city environmental scores,
//! crowd/pollution alerts, and green-space lookups.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use raahi_config::RaahiConfig;
use raahi_eco::EcoScorer;
use raahi_eco_models::RouteRequest;
use raahi_environment::{EnvironmentalScorer, ReadingSource};
use raahi_geo::{GeoCatalog, RegionMap, registry};
use raahi_geo_models::{Coordinate, NearbyEntry};
use raahi_hotspot::HotspotAggregator;
use raahi_ingest::LocationIngest;
use raahi_ingest_models::PositionSample;

#[derive(Parser)]
#[command(name = "raahi", about = "Green routing and crowd/pollution alerts")]
struct Cli {
    /// Path to a TOML config file (defaults to `RAAHI_CONFIG`, then
    /// built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the carbon footprint and eco-score of a route
    ScoreRoute {
        /// Origin as "LAT,LNG"
        #[arg(long)]
        from: Coordinate,
        /// Destination as "LAT,LNG"
        #[arg(long)]
        to: Coordinate,
        /// Route length in kilometres
        #[arg(long)]
        distance: f64,
        /// Transport mode (car, motorcycle, bus, ev, cycle, walk)
        #[arg(long, default_value = "car")]
        mode: String,
    },
    /// Score current environmental conditions for a city
    ScoreCity {
        /// City id (e.g., "bhopal")
        #[arg(default_value = "bhopal")]
        city: String,
    },
    /// Detect crowd and pollution hotspots from a JSON Lines sample file
    Alerts {
        /// File with one position sample per line
        #[arg(long)]
        samples: PathBuf,
        /// Regional AQI reading as "REGION=VALUE" (repeatable)
        #[arg(long = "aqi", value_parser = parse_region_aqi)]
        aqi: Vec<(String, f64)>,
        /// Evaluation time as RFC 3339 (defaults to now)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// List green spaces near a point
    GreenSpaces {
        /// Point as "LAT,LNG"
        #[arg(long)]
        at: Coordinate,
        /// Search radius in kilometres
        #[arg(long, default_value = "1.0")]
        radius: f64,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let config = RaahiConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::ScoreRoute {
            from,
            to,
            distance,
            mode,
        } => {
            let scorer = EcoScorer::new(config.eco, Arc::new(GeoCatalog::builtin()?))?;
            let mode = scorer.parse_mode(&mode)?;
            let result = scorer.score_route(&RouteRequest::new(from, to, distance, mode))?;

            println!("Eco-score:        {:.1}/100", result.eco_score);
            println!("Mode:             {}", result.mode);
            println!("Carbon:           {:.3} kg CO2", result.carbon_kg);
            println!("Saved vs car:     {:.3} kg CO2", result.carbon_saved_kg);
            println!(
                "By public transp: {:.3} kg CO2",
                result.carbon_public_transport_kg
            );
            println!("Recommended mode: {}", result.recommended_mode);
            if result.nearby_green_spaces.is_empty() {
                println!("No green spaces along the route");
            } else {
                println!(
                    "Green spaces along the route (+{:.0}):",
                    result.green_bonus
                );
                for nearby in &result.nearby_green_spaces {
                    println!("  {:<32} {:.2} km", nearby.entry.name, nearby.distance_km);
                }
            }
        }
        Commands::ScoreCity { city } => {
            let Some(city) = registry::find_city(&city) else {
                let known: Vec<String> =
                    registry::all_cities().into_iter().map(|c| c.id).collect();
                return Err(format!("Unknown city '{city}'. Known: {}", known.join(", ")).into());
            };

            let scorer = EnvironmentalScorer::new(config.environment)?;
            let source =
                raahi_weather::select_source(raahi_weather::api_key_from_env(), &config.weather);
            let report = scorer
                .score_from_source(source.as_ref(), city.coordinate(), Utc::now())
                .await;

            let origin = match report.source {
                ReadingSource::Live(name) => name,
                ReadingSource::Fallback => "fallback",
            };
            println!("{} ({origin})", city.name);
            println!(
                "Environmental score: {} ({})",
                report.score.score, report.score.level
            );
            println!(
                "  {:.0}C, {:.0}% humidity, {:.1} km/h wind, {:.1} km visibility, AQI {:.0} ({})",
                report.reading.temperature_c,
                report.reading.humidity,
                report.reading.wind_speed_kmh,
                report.reading.visibility_km,
                report.reading.aqi,
                report.reading.aqi_label,
            );
            for advisory in &report.advisories {
                println!(
                    "  [{}/{}] {}: {}",
                    advisory.kind, advisory.severity, advisory.title, advisory.message
                );
            }
        }
        Commands::Alerts { samples, aqi, now } => {
            let now = now.unwrap_or_else(Utc::now);
            let ingest = Arc::new(LocationIngest::new(config.window)?);
            let parsed = read_samples(&samples)?;
            let total = parsed.len();
            let accepted = ingest
                .record_batch(parsed, now)
                .into_iter()
                .filter(Result::is_ok)
                .count();
            log::info!("Recorded {accepted} of {total} sample(s)");

            let aggregator = HotspotAggregator::new(
                config.hotspot,
                ingest,
                Arc::new(GeoCatalog::builtin()?),
                Arc::new(RegionMap::builtin()?),
            );
            let aqi_by_region: BTreeMap<String, f64> = aqi.into_iter().collect();
            let hotspots = aggregator.compute_alerts(now, &aqi_by_region)?;

            println!("{}", serde_json::to_string_pretty(&hotspots)?);
        }
        Commands::GreenSpaces { at, radius } => {
            let catalog = GeoCatalog::builtin()?;
            let nearby = catalog.green_spaces_near(at, radius)?;
            print!("{}", render_green_spaces(at, radius, &nearby));
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

/// Formats a green-space listing as a table, or a single line when there
/// is nothing to list.
fn render_green_spaces(at: Coordinate, radius: f64, nearby: &[NearbyEntry]) -> String {
    if nearby.is_empty() {
        return format!("No green spaces within {radius} km of {at}\n");
    }

    let mut out = format!("{:<24} {:<32} {:<10} DISTANCE\n", "ID", "NAME", "KIND");
    out.push_str(&"-".repeat(78));
    out.push('\n');
    for n in nearby {
        out.push_str(&format!(
            "{:<24} {:<32} {:<10} {:.2} km\n",
            n.entry.id,
            n.entry.name,
            n.entry.kind.as_deref().unwrap_or("-"),
            n.distance_km
        ));
    }
    out
}

/// Parses `REGION=VALUE`.
fn parse_region_aqi(s: &str) -> Result<(String, f64), String> {
    let (region, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected REGION=VALUE, got '{s}'"))?;
    let region = region.trim();
    if region.is_empty() {
        return Err(format!("missing region in '{s}'"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid AQI in '{s}': {e}"))?;
    Ok((region.to_string(), value))
}

/// Reads one JSON-encoded [`PositionSample`] per line. Blank lines are
/// ignored; lines that fail to parse are logged and skipped.
fn read_samples(path: &Path) -> Result<Vec<PositionSample>, std::io::Error> {
    let contents = std::fs::read_to_string(path)?;
    Ok(parse_samples(&contents))
}

fn parse_samples(contents: &str) -> Vec<PositionSample> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| match serde_json::from_str(line) {
            Ok(sample) => Some(sample),
            Err(e) => {
                log::warn!("Skipping line {}: {e}", i + 1);
                None
            }
        })
        .collect()
}
