#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line client for the hotspot map backend.
//!
//! Each subcommand drives the same stores and caches a map UI would,
//! against a live backend, and prints the result.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use hotspot_map_api::{ApiClient, HotspotApi};
use hotspot_map_cache::SummaryRequest;
use hotspot_map_location_models::time::{days_to_event, short_venue};
use hotspot_map_location_models::{LocationKind, TimePeriod, TimelineRange, UnifiedLocation};
use hotspot_map_store::traffic_feed::local_hour;
use hotspot_map_store::{HotspotMap, LocationsState};

use crate::config::AppConfig;

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// Query hotspots, events and traffic from the hotspot map backend.
#[derive(Parser)]
#[command(name = "hotspot-map")]
#[command(about = "Query hotspots, events and traffic from the hotspot map backend")]
struct Cli {
    /// TOML config file (default: `hotspot-map.toml` if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding config and environment.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Date and time selection shared by the data subcommands.
#[derive(clap::Args, Clone, Copy)]
struct When {
    /// Day to load (YYYY-MM-DD, default: today).
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Hour of day, 0-23 (default: current hour). Only sent in real-time mode.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..24))]
    hour: Option<u8>,

    /// Aggregation window: real-time, daily, weekly or monthly.
    #[arg(long, default_value = "real-time")]
    period: TimePeriod,
}

impl When {
    fn date(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }

    fn timeline(&self) -> TimelineRange {
        TimelineRange::at_hour(self.hour.unwrap_or_else(local_hour))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List hotspots and events.
    Locations {
        #[command(flatten)]
        when: When,

        /// Only show this kind (natural or event).
        #[arg(long)]
        kind: Option<LocationKind>,
    },

    /// Show detailed metrics for a location.
    Details {
        id: String,

        /// natural or event.
        #[arg(long, default_value = "natural")]
        kind: LocationKind,
    },

    /// Show the hourly foot-traffic series for a loaded location.
    FootTraffic {
        id: String,

        #[command(flatten)]
        when: When,
    },

    /// Show road traffic for a date and hour.
    Traffic {
        #[command(flatten)]
        when: When,

        /// Keep running and print updates when the clock hour rolls over.
        #[arg(long)]
        watch: bool,
    },

    /// Summarise how well a location fits a business idea.
    Summary {
        id: String,

        /// The business idea, e.g. "specialty coffee".
        #[arg(long)]
        business: String,

        /// natural or event.
        #[arg(long, default_value = "natural")]
        kind: LocationKind,
    },

    /// Show the default map center.
    Center,

    /// List known business locations.
    Businesses,

    /// Extract business preferences from a free-text description.
    Analyze { text: String },

    /// Compare metrics for several locations of one kind.
    Compare {
        /// Location ids, in display order.
        #[arg(required = true)]
        ids: Vec<String>,

        #[command(flatten)]
        when: When,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    log::debug!("Using backend {}", config.api.base_url);

    let api: Arc<dyn HotspotApi> = Arc::new(ApiClient::new(&config.api)?);
    let map = HotspotMap::new(Arc::clone(&api), config.store);

    match cli.command {
        Commands::Locations { when, kind } => cmd_locations(&map, when, kind).await,
        Commands::Details { id, kind } => cmd_details(&map, &id, kind).await,
        Commands::FootTraffic { id, when } => cmd_foot_traffic(&map, &id, when).await,
        Commands::Traffic { when, watch } => cmd_traffic(&map, when, watch).await,
        Commands::Summary { id, business, kind } => cmd_summary(&map, &id, &business, kind).await,
        Commands::Center => {
            let center = hotspot_map_api::map_center_or_default(api.as_ref()).await;
            println!("{:.4}, {:.4}", center.latitude, center.longitude);
            Ok(())
        }
        Commands::Businesses => {
            for business in hotspot_map_api::business_locations_or_default(api.as_ref()).await {
                println!(
                    "{:<8} {:<28} {:<10} {:.4}, {:.4}",
                    business.id,
                    business.name,
                    business.category.as_deref().unwrap_or("-"),
                    business.coordinates.latitude,
                    business.coordinates.longitude,
                );
            }
            Ok(())
        }
        Commands::Analyze { text } => {
            let preferences = hotspot_map_api::analyze_business_or_default(api.as_ref(), &text).await;
            println!("{}", serde_json::to_string_pretty(&preferences)?);
            Ok(())
        }
        Commands::Compare { ids, when } => cmd_compare(&map, &ids, when).await,
    }
}

/// Schedules a load and waits for it, failing with the user-facing error.
async fn load_locations(
    map: &HotspotMap,
    when: When,
) -> Result<LocationsState, Box<dyn std::error::Error>> {
    map.set_date_time(when.date(), when.period, &when.timeline());
    let state = map.locations().settled().await;
    if let Some(error) = state.error {
        return Err(error.into());
    }
    Ok(state)
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

fn describe(location: &UnifiedLocation) -> String {
    let traffic = location
        .base
        .traffic_level
        .map_or_else(|| "-".to_string(), |level| level.to_string());
    match location.as_event() {
        Some(event) => {
            let multi_day = matches!(
                (event.start(), event.end()),
                (Ok(Some(start)), Ok(Some(end))) if start.date_naive() != end.date_naive()
            );
            let when = if multi_day {
                event.display_date_range()
            } else {
                event.display_time_range()
            }
            .unwrap_or_default();
            let score = event
                .score_category()
                .map(|category| format!(" score: {category}"))
                .unwrap_or_default();
            let duration = event.display_duration().unwrap_or_default();
            let countdown = event
                .start()
                .ok()
                .flatten()
                .map(|start| days_to_event(&start, &Utc::now()))
                .unwrap_or_default();
            let venue = event.venue.as_deref().map(short_venue).unwrap_or_default();
            format!("{when} ({duration}) {venue} [{countdown}] traffic: {traffic}{score}")
        }
        None => {
            let area = location
                .as_natural()
                .and_then(|n| n.area_type.as_deref())
                .unwrap_or("-");
            format!("{area} traffic: {traffic}")
        }
    }
}

async fn cmd_locations(
    map: &HotspotMap,
    when: When,
    kind: Option<LocationKind>,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = load_locations(map, when).await?;
    let shown: Vec<_> = state
        .locations
        .iter()
        .filter(|l| kind.is_none_or(|kind| l.kind() == kind))
        .collect();

    println!("=== {} locations for {} ({}) ===", shown.len(), when.date(), when.period);
    for location in shown {
        println!(
            "{:<10} {:<7} {:<32} {}",
            location.id(),
            location.kind(),
            location.display_name(),
            describe(location)
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Details, foot traffic, summary
// ---------------------------------------------------------------------------

async fn cmd_details(
    map: &HotspotMap,
    id: &str,
    kind: LocationKind,
) -> Result<(), Box<dyn std::error::Error>> {
    let metrics = map.metrics().get(id, kind).await?;

    println!("=== {kind} {id} ===");
    println!("Points of interest: {}", metrics.poi_count());
    println!("Places for rent:    {}", metrics.rental_count());
    println!("Companies:          {}", metrics.company_count());
    for (key, value) in &metrics.extra {
        if value.is_object() || value.is_array() {
            continue;
        }
        println!("{key}: {value}");
    }
    Ok(())
}

async fn cmd_foot_traffic(
    map: &HotspotMap,
    id: &str,
    when: When,
) -> Result<(), Box<dyn std::error::Error>> {
    load_locations(map, when).await?;
    let series = map.locations().foot_traffic(id).await?;

    for point in series {
        println!("{:02}:00 {:>8.1} {}", point.hour, point.value, point.kind);
    }
    Ok(())
}

async fn cmd_summary(
    map: &HotspotMap,
    id: &str,
    business: &str,
    kind: LocationKind,
) -> Result<(), Box<dyn std::error::Error>> {
    let metrics = map.metrics().get(id, kind).await?;
    let request = SummaryRequest::new(id, business, metrics, kind);
    println!("{}", map.summaries().get_or_fallback(&request).await);
    Ok(())
}

// ---------------------------------------------------------------------------
// Traffic
// ---------------------------------------------------------------------------

fn print_traffic(map: &HotspotMap) {
    let view = map.traffic().state();
    if let Some(error) = view.error {
        println!("{error}");
        return;
    }
    let (Some(key), Some(snapshot)) = (view.key, view.snapshot) else {
        println!("No traffic loaded");
        return;
    };
    let counts = snapshot.status_counts();
    println!(
        "{key}: {} segments (available {}, moderate {}, congested {}, unknown {}), {} heat points",
        snapshot.lines.features.len(),
        counts.available,
        counts.moderate,
        counts.congested,
        counts.unknown,
        snapshot.points.features.len(),
    );
}

async fn cmd_traffic(
    map: &HotspotMap,
    when: When,
    watch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    map.traffic().set_slider(when.date(), &when.timeline()).await;
    print_traffic(map);
    if !watch {
        return Ok(());
    }

    let mut updates = map.traffic().subscribe();
    updates.mark_unchanged();
    let clock = map.start_clock();
    log::info!("Watching traffic, press Ctrl-C to stop");
    loop {
        tokio::select! {
            changed = updates.changed() => {
                changed?;
                if !updates.borrow_and_update().loading {
                    print_traffic(map);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    clock.abort();
    Ok(())
}

// ---------------------------------------------------------------------------
// Compare
// ---------------------------------------------------------------------------

async fn cmd_compare(
    map: &HotspotMap,
    ids: &[String],
    when: When,
) -> Result<(), Box<dyn std::error::Error>> {
    load_locations(map, when).await?;
    for id in ids {
        let Some(location) = map.locations().find(id) else {
            log::warn!("Skipping {id}: not in the list for {}", when.date());
            continue;
        };
        let outcome = map.toggle_comparison(location);
        log::info!("{id}: {outcome}");
    }

    let comparison = map.comparison();
    let Some(kind) = comparison.kind() else {
        return Err("None of the given locations could be compared".into());
    };
    println!("=== Comparing {} {kind} locations ===", comparison.len());
    println!("{:<10} {:<32} {:>6} {:>6} {:>9}", "id", "name", "pois", "rent", "companies");
    for (location, metrics) in map.comparison_metrics().await {
        match metrics {
            Ok(metrics) => println!(
                "{:<10} {:<32} {:>6} {:>6} {:>9}",
                location.id(),
                location.display_name(),
                metrics.poi_count(),
                metrics.rental_count(),
                metrics.company_count(),
            ),
            Err(e) => println!("{:<10} {:<32} {e}", location.id(), location.display_name()),
        }
    }
    Ok(())
}
