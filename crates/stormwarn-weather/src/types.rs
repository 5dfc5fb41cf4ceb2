use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic coordinate in floating-point degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// One hourly forecast data point.
///
/// Observables are optional: the provider may omit a parameter for a
/// timestamp, which is represented as `None` rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSlot {
    pub time: DateTime<Utc>,
    pub temperature_c: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub symbol_code: Option<i32>,
}

/// Hourly forecast covering now through now+6h.
///
/// Invariant: non-empty, slots ascending by time, the first slot is
/// the "current" conditions slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    slots: Vec<ForecastSlot>,
}

impl Forecast {
    /// Build a forecast from an ordered slot sequence. Returns `None`
    /// for an empty sequence.
    pub fn new(slots: Vec<ForecastSlot>) -> Option<Self> {
        if slots.is_empty() {
            return None;
        }
        Some(Self { slots })
    }

    /// The current-conditions slot (first in the sequence).
    pub fn current(&self) -> &ForecastSlot {
        &self.slots[0]
    }

    pub fn slots(&self) -> &[ForecastSlot] {
        &self.slots
    }

    /// True when `other` describes the same forecast run: same slot
    /// count and same current-slot timestamp. Used to suppress
    /// redundant state updates and cache writes.
    pub fn same_series(&self, other: &Self) -> bool {
        self.slots.len() == other.slots.len() && self.current().time == other.current().time
    }
}

/// Display metadata from reverse geocoding. Both fields absent when
/// geocoding failed; the UI then falls back to raw coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub city: Option<String>,
    pub country: Option<String>,
}

impl Place {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_unknown(&self) -> bool {
        self.city.is_none() && self.country.is_none()
    }

    /// "City, Country" label, or `None` when nothing is known.
    pub fn label(&self) -> Option<String> {
        match (&self.city, &self.country) {
            (Some(city), Some(country)) => Some(format!("{}, {}", city, country)),
            (Some(city), None) => Some(city.clone()),
            (None, Some(country)) => Some(country.clone()),
            (None, None) => None,
        }
    }
}

/// Weather acquisition errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Weather provider credentials are not configured")]
    CredentialsMissing,
    #[error("Weather provider rejected the credentials")]
    Unauthorized,
    #[error("Weather request timed out")]
    Timeout,
    #[error("Weather provider error ({code}): {message}")]
    Provider { code: u16, message: String },
    #[error("Network error: {0}")]
    Network(reqwest::Error),
}

impl WeatherError {
    /// Whether the orchestrator's retry policy may try again.
    /// Credential problems are not time-sensitive; retrying them only
    /// burns the retry budget.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Provider { .. } | Self::Network(_)
        )
    }

    /// User-friendly error message plus a remediation hint.
    pub fn user_message(&self) -> String {
        match self {
            Self::CredentialsMissing | Self::Unauthorized => {
                format!("{}. Check your provider credentials.", self)
            }
            Self::Timeout | Self::Network(_) => {
                format!("{}. Check your internet connection.", self)
            }
            Self::Provider { .. } => {
                format!("{}. Check connectivity and credentials, then retry.", self)
            }
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(error)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::TimeZone;

    fn slot(hour: u32) -> ForecastSlot {
        ForecastSlot {
            time: Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap(),
            temperature_c: Some(10.0),
            precipitation_mm: Some(0.0),
            wind_speed_ms: Some(2.0),
            symbol_code: Some(1),
        }
    }

    #[test]
    fn forecast_rejects_empty_slots() {
        assert!(Forecast::new(vec![]).is_none());
    }

    #[test]
    fn current_is_first_slot() {
        let forecast = Forecast::new(vec![slot(6), slot(7)]).unwrap();
        assert_eq!(forecast.current().time, slot(6).time);
    }

    #[test]
    fn same_series_matches_on_count_and_current_time() {
        let a = Forecast::new(vec![slot(6), slot(7)]).unwrap();
        let mut changed_tail = vec![slot(6), slot(7)];
        changed_tail[1].temperature_c = Some(-20.0);
        let b = Forecast::new(changed_tail).unwrap();
        assert!(a.same_series(&b));

        let shorter = Forecast::new(vec![slot(6)]).unwrap();
        assert!(!a.same_series(&shorter));

        let shifted = Forecast::new(vec![slot(7), slot(8)]).unwrap();
        assert!(!a.same_series(&shifted));
    }

    #[test]
    fn place_label_prefers_both_parts() {
        let place = Place {
            city: Some("Dublin".to_string()),
            country: Some("Ireland".to_string()),
        };
        assert_eq!(place.label().as_deref(), Some("Dublin, Ireland"));
        assert!(Place::unknown().label().is_none());
    }

    #[test]
    fn retryable_classification() {
        assert!(WeatherError::Timeout.is_retryable());
        assert!(WeatherError::Provider {
            code: 503,
            message: "down".to_string()
        }
        .is_retryable());
        assert!(!WeatherError::Unauthorized.is_retryable());
        assert!(!WeatherError::CredentialsMissing.is_retryable());
    }

    #[test]
    fn user_message_carries_remediation_hint() {
        let msg = WeatherError::Timeout.user_message();
        assert!(msg.contains("connection"));
        let msg = WeatherError::Unauthorized.user_message();
        assert!(msg.contains("credentials"));
    }
}
