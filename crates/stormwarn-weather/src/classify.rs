//! Slot classification: map one forecast slot to a bad/ok verdict,
//! reason tags, and advice text.

use chrono::{DateTime, Utc};

use crate::types::{Forecast, ForecastSlot};

/// Temperature at or below this is "cold" (deg C)
pub const COLD_MAX_C: f64 = 3.0;
/// Temperature at or above this is "heat" (deg C)
pub const HEAT_MIN_C: f64 = 30.0;
/// Hourly precipitation at or above this is "heavy rain" (mm)
pub const HEAVY_RAIN_MIN_MM: f64 = 2.0;
/// Hourly precipitation at or above this is "rain" (mm)
pub const RAIN_MIN_MM: f64 = 0.2;
/// Wind speed at or above this is "strong wind" (m/s)
pub const STRONG_WIND_MIN_MS: f64 = 10.0;

/// Why a slot was classified as bad weather.
///
/// `HeavyRain` and `Rain` are mutually exclusive tiers; the stronger
/// one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    HeavyRain,
    Rain,
    StrongWind,
    Cold,
    Heat,
}

impl Reason {
    /// Short tag used in notification text.
    pub fn label(&self) -> &'static str {
        match self {
            Self::HeavyRain => "heavy rain",
            Self::Rain => "rain",
            Self::StrongWind => "strong wind",
            Self::Cold => "cold",
            Self::Heat => "heat",
        }
    }

    /// One fixed advice sentence per reason.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::HeavyRain => "Heavy rain expected, take an umbrella and waterproofs.",
            Self::Rain => "Rain expected, bring an umbrella.",
            Self::StrongWind => "Strong wind, secure loose items and take care outdoors.",
            Self::Cold => "Near-freezing temperatures, dress warmly.",
            Self::Heat => "Extreme heat, stay hydrated and avoid the midday sun.",
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Verdict for one forecast slot. Never persisted; recomputed on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub is_bad: bool,
    pub reasons: Vec<Reason>,
    pub advice: String,
}

const NORMAL_ADVICE: &str = "Normal conditions.";

/// Classify one slot against the fixed thresholds.
///
/// Reason order is fixed: rain tier, wind, cold, heat. Observables
/// the provider omitted (`None`) trigger nothing.
pub fn assess(slot: &ForecastSlot) -> Assessment {
    let mut reasons = Vec::new();

    match slot.precipitation_mm {
        Some(p) if p >= HEAVY_RAIN_MIN_MM => reasons.push(Reason::HeavyRain),
        Some(p) if p >= RAIN_MIN_MM => reasons.push(Reason::Rain),
        _ => {}
    }
    if matches!(slot.wind_speed_ms, Some(w) if w >= STRONG_WIND_MIN_MS) {
        reasons.push(Reason::StrongWind);
    }
    if matches!(slot.temperature_c, Some(t) if t <= COLD_MAX_C) {
        reasons.push(Reason::Cold);
    }
    if matches!(slot.temperature_c, Some(t) if t >= HEAT_MIN_C) {
        reasons.push(Reason::Heat);
    }

    let advice = if reasons.is_empty() {
        NORMAL_ADVICE.to_string()
    } else {
        reasons
            .iter()
            .map(|r| r.advice())
            .collect::<Vec<_>>()
            .join(" ")
    };

    Assessment {
        is_bad: !reasons.is_empty(),
        reasons,
        advice,
    }
}

/// First slot strictly after `now` whose assessment is bad, scanning
/// in ascending time order. `None` when the whole window is calm.
pub fn find_next_bad_slot(forecast: &Forecast, now: DateTime<Utc>) -> Option<&ForecastSlot> {
    forecast
        .slots()
        .iter()
        .filter(|slot| slot.time > now)
        .find(|slot| assess(slot).is_bad)
}
