//! Forecast provider HTTP client.
//!
//! Builds one authenticated request covering now..now+6h at 1-hour
//! resolution and transposes the provider's parallel per-parameter
//! time series into one `ForecastSlot` per timestamp.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::types::{Coordinate, Forecast, ForecastSlot, WeatherError};

/// Hard deadline for one provider request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);
/// Forecast window length in hours.
const WINDOW_HOURS: i64 = 6;

const PARAM_TEMPERATURE: &str = "t_2m:C";
const PARAM_PRECIPITATION: &str = "precip_1h:mm";
const PARAM_WIND: &str = "wind_speed_10m:ms";
const PARAM_SYMBOL: &str = "weather_symbol_1h:idx";

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl WeatherClient {
    /// Create a client against the given provider base URL.
    ///
    /// Credentials are optional; their absence fails individual
    /// fetches with `CredentialsMissing` rather than construction.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Option<(String, String)>,
    ) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(WeatherError::Network)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            credentials,
        })
    }

    /// Fetch the hourly forecast for `coordinate`.
    pub async fn fetch(&self, coordinate: Coordinate) -> Result<Forecast, WeatherError> {
        let (username, password) = self
            .credentials
            .as_ref()
            .ok_or(WeatherError::CredentialsMissing)?;

        let now = Utc::now();
        let start = now.duration_trunc(TimeDelta::hours(1)).unwrap_or(now);
        let end = start + TimeDelta::hours(WINDOW_HOURS);

        let url = format!(
            "{}/{}--{}:PT1H/{},{},{},{}/{},{}/json",
            self.base_url,
            start.format("%Y-%m-%dT%H:%M:%SZ"),
            end.format("%Y-%m-%dT%H:%M:%SZ"),
            PARAM_TEMPERATURE,
            PARAM_PRECIPITATION,
            PARAM_WIND,
            PARAM_SYMBOL,
            coordinate.latitude,
            coordinate.longitude,
        );

        tracing::debug!(%coordinate, "Fetching forecast");

        let response = self
            .client
            .get(&url)
            .basic_auth(username, Some(password))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(WeatherError::Unauthorized);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WeatherError::Provider {
                code: status.as_u16(),
                message,
            });
        }

        let payload: ApiResponse = response.json().await.map_err(|e| WeatherError::Provider {
            code: status.as_u16(),
            message: format!("malformed response body: {}", e),
        })?;

        transpose(&payload)
    }
}

// Provider response shape: one series per requested parameter, each
// holding a per-timestamp value list aligned by index across series.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    data: Vec<ApiSeries>,
}

#[derive(Debug, Deserialize)]
struct ApiSeries {
    parameter: String,
    coordinates: Vec<ApiCoordinate>,
}

#[derive(Debug, Deserialize)]
struct ApiCoordinate {
    dates: Vec<ApiSample>,
}

#[derive(Debug, Deserialize)]
struct ApiSample {
    date: DateTime<Utc>,
    value: Option<f64>,
}

fn provider_violation(message: impl Into<String>) -> WeatherError {
    WeatherError::Provider {
        code: 200,
        message: message.into(),
    }
}

fn series<'a>(payload: &'a ApiResponse, parameter: &str) -> Option<&'a [ApiSample]> {
    payload
        .data
        .iter()
        .find(|s| s.parameter == parameter)
        .and_then(|s| s.coordinates.first())
        .map(|c| c.dates.as_slice())
}

/// Transpose parallel parameter series into one slot per timestamp.
///
/// Invariant: all present series share identical length and timestamp
/// sequence; a violation is a provider error, while a wholly absent
/// parameter simply yields `None` fields.
fn transpose(payload: &ApiResponse) -> Result<Forecast, WeatherError> {
    let temperature = series(payload, PARAM_TEMPERATURE);
    let precipitation = series(payload, PARAM_PRECIPITATION);
    let wind = series(payload, PARAM_WIND);
    let symbol = series(payload, PARAM_SYMBOL);

    let spine = temperature
        .or(precipitation)
        .or(wind)
        .or(symbol)
        .ok_or_else(|| provider_violation("response contains no parameter series"))?;

    for other in [temperature, precipitation, wind, symbol].into_iter().flatten() {
        if other.len() != spine.len() {
            return Err(provider_violation("parameter series length mismatch"));
        }
        if other
            .iter()
            .zip(spine.iter())
            .any(|(a, b)| a.date != b.date)
        {
            return Err(provider_violation("parameter series timestamps misaligned"));
        }
    }

    let value_at = |s: Option<&[ApiSample]>, i: usize| s.and_then(|s| s.get(i)).and_then(|v| v.value);

    let slots = (0..spine.len())
        .map(|i| ForecastSlot {
            time: spine[i].date,
            temperature_c: value_at(temperature, i),
            precipitation_mm: value_at(precipitation, i),
            wind_speed_ms: value_at(wind, i),
            symbol_code: value_at(symbol, i).map(|v| v as i32),
        })
        .collect();

    Forecast::new(slots).ok_or_else(|| provider_violation("empty time series"))
}
