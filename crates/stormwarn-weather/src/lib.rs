//! Weather pipeline building blocks for Stormwarn
//!
//! Provides the forecast data model, the provider HTTP client, slot
//! classification, the hour-keyed forecast cache, best-effort reverse
//! geocoding, and device location resolution.

pub mod cache;
pub mod classify;
pub mod client;
pub mod geocode;
pub mod location;
pub mod types;

pub use cache::ForecastCache;
pub use classify::{assess, find_next_bad_slot, Assessment, Reason};
pub use client::WeatherClient;
pub use geocode::Geocoder;
pub use location::{LocationBackend, LocationResolver, Permission, StaticBackend};
pub use types::*;
