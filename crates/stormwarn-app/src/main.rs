use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use stormwarn_alerts::LogBackend;
use stormwarn_engine::{Orchestrator, RefreshState};
use stormwarn_weather::{
    Coordinate, ForecastCache, Geocoder, LocationResolver, StaticBackend, WeatherClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    stormwarn_core::init()?;

    let (config, _validation) = stormwarn_core::Config::load_validated()?;
    tracing::info!("Config directory: {}", config.config_dir.display());

    let fallback = Coordinate {
        latitude: config.location.fallback_latitude,
        longitude: config.location.fallback_longitude,
    };
    let fixed = match (config.location.fixed_latitude, config.location.fixed_longitude) {
        (Some(latitude), Some(longitude)) => Some(Coordinate {
            latitude,
            longitude,
        }),
        _ => None,
    };

    let orchestrator = Arc::new(Orchestrator::new(
        WeatherClient::new(
            config.provider.base_url.clone(),
            config.provider.credentials(),
        )?,
        ForecastCache::new(&config.config_dir),
        LocationResolver::new(StaticBackend::new(fixed), fallback),
        Geocoder::new(),
        LogBackend,
        Duration::from_secs(u64::from(config.refresh.poll_minutes) * 60),
    ));

    orchestrator.refresh().await;
    report(&orchestrator.snapshot());

    Arc::clone(&orchestrator).start_polling();
    tracing::info!(
        "Polling every {} minutes; press Ctrl-C to exit",
        config.refresh.poll_minutes
    );

    tokio::signal::ctrl_c().await?;
    orchestrator.stop_polling();
    tracing::info!("Shutting down");

    Ok(())
}

fn report(snapshot: &stormwarn_engine::Snapshot) {
    match snapshot.state {
        RefreshState::Done => {
            let where_ = snapshot
                .place
                .as_ref()
                .and_then(|p| p.label())
                .or_else(|| snapshot.coordinate.map(|c| c.to_string()))
                .unwrap_or_else(|| "unknown location".to_string());
            let slots = snapshot.forecast.as_ref().map_or(0, |f| f.slots().len());
            tracing::info!("Forecast for {}: {} hourly slots", where_, slots);
            if let Some(message) = &snapshot.error_message {
                tracing::warn!("Last refresh issue: {}", message);
            }
        }
        RefreshState::Error => {
            tracing::error!(
                "Forecast unavailable: {}",
                snapshot
                    .error_message
                    .as_deref()
                    .unwrap_or("unknown error")
            );
        }
        RefreshState::Idle | RefreshState::Loading => {}
    }
}
