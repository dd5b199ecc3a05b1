use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sunsafe_core::{BackoffConfig, Config, ConnectionState, ResilientExecutor};
use sunsafe_services::{MemoryStore, UvHistory};
use sunsafe_uv::{current_coordinate, ClientSettings, FixedLocation, RiskLevel, UvClient};

/// Used when no coordinate is given on the command line
const DEFAULT_LOCATION: (f64, f64) = (37.7749, -122.4194);

fn location_from_args() -> Result<FixedLocation> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => Ok(FixedLocation::new(DEFAULT_LOCATION.0, DEFAULT_LOCATION.1)),
        [lat, lng] => {
            let lat: f64 = lat.parse().context("Latitude must be a number")?;
            let lng: f64 = lng.parse().context("Longitude must be a number")?;
            Ok(FixedLocation::new(lat, lng))
        }
        _ => anyhow::bail!("Usage: sunsafe [LAT LNG]"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    sunsafe_core::init()?;

    let (config, _validation) = Config::load_validated()?;
    let location = location_from_args()?;
    let coordinate = current_coordinate(&location)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let state = Arc::new(ConnectionState::new(config.network.max_retries));
    let backoff = BackoffConfig::new(config.network.backoff_base());
    let store = Arc::new(MemoryStore::new());

    let settings = ClientSettings::from_config(&config.uv)?;
    let executor = ResilientExecutor::new(state.clone(), store.clone(), backoff.clone());
    let client = UvClient::new(settings, executor)?;
    let history = UvHistory::new(store, state.clone(), backoff, &config.history);

    let _status = state.subscribe(|online| {
        tracing::info!("Connection is now {}", if online { "online" } else { "offline" });
    });

    let data = client
        .get_uv_data(coordinate.latitude, coordinate.longitude)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    println!(
        "UV index at {:.4}, {:.4}: {:.1}",
        data.lat, data.lng, data.result.uv
    );
    match RiskLevel::from_uv_index(data.uv_index()) {
        Some(level) => {
            println!("Risk: {} ({})", level.label(), level.color());
            for tip in level.safety_tips() {
                println!("  - {}", tip);
            }
        }
        None => println!("Risk: unknown"),
    }

    let feed = history.subscribe_history();
    match history.save_uv_record(&data).await {
        Ok(Some(id)) => println!("Saved reading {}", id),
        Ok(None) => println!("Store unavailable, reading not saved"),
        Err(e) => println!("Could not save reading: {}", e.user_message()),
    }

    // Let the history feed flush
    tokio::time::sleep(config.history.flush_interval() + Duration::from_millis(50)).await;

    println!("\nHistory:");
    for record in feed.records() {
        println!(
            "  {}  UV {:.1}  {}  [{:?}]",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.uv_index,
            record.risk_level,
            record.metadata.status
        );
    }

    feed.unsubscribe().await;
    Ok(())
}
