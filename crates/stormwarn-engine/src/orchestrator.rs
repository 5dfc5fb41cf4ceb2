//! Refresh orchestrator: one guarded cycle from location resolution
//! through alert scheduling, re-entered on a poll timer and on
//! app-foreground transitions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use stormwarn_alerts::{AlertScheduler, NotificationBackend};
use stormwarn_weather::{
    assess, find_next_bad_slot, Coordinate, Forecast, ForecastCache, Geocoder, LocationBackend,
    LocationResolver, Place, WeatherClient,
};

use crate::retry::{with_retry, RetryConfig};

/// Refresh cycle state, read-only to everyone but the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshState {
    #[default]
    Idle,
    Loading,
    Done,
    Error,
}

impl RefreshState {
    /// True if a new refresh cycle may start. Triggers arriving while
    /// a cycle is in flight are dropped, not queued.
    pub fn can_start_refresh(self) -> bool {
        !matches!(self, RefreshState::Loading)
    }
}

/// Point-in-time view of orchestrator state for the UI layer.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub state: RefreshState,
    pub forecast: Option<Forecast>,
    pub coordinate: Option<Coordinate>,
    pub place: Option<Place>,
    pub error_message: Option<String>,
}

#[derive(Default)]
struct Inner {
    state: RefreshState,
    forecast: Option<Forecast>,
    coordinate: Option<Coordinate>,
    place: Option<Place>,
    error_message: Option<String>,
    last_success: Option<Instant>,
    cold_cache_checked: bool,
}

/// State shared with spawned enrichment tasks.
#[derive(Default)]
struct Shared {
    inner: Mutex<Inner>,
    /// Cycle generation; late async results (reverse geocoding) apply
    /// only while their generation is still current.
    generation: AtomicU64,
}

/// Sequences the refresh pipeline and owns all of its mutable state.
///
/// Locks are never held across an await point; collaborators only see
/// state through `snapshot()`.
pub struct Orchestrator<L, N> {
    client: WeatherClient,
    cache: ForecastCache,
    resolver: LocationResolver<L>,
    geocoder: Geocoder,
    retry: RetryConfig,
    poll_interval: Duration,
    scheduler: Mutex<AlertScheduler<N>>,
    shared: Arc<Shared>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl<L, N> Orchestrator<L, N>
where
    L: LocationBackend + Send + Sync + 'static,
    N: NotificationBackend + Send + 'static,
{
    pub fn new(
        client: WeatherClient,
        cache: ForecastCache,
        resolver: LocationResolver<L>,
        geocoder: Geocoder,
        notifier: N,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            cache,
            resolver,
            geocoder,
            retry: RetryConfig::default(),
            poll_interval,
            scheduler: Mutex::new(AlertScheduler::new(notifier)),
            shared: Arc::new(Shared::default()),
            poll_task: Mutex::new(None),
        }
    }

    /// Run one refresh cycle with device location resolution.
    pub async fn refresh(&self) {
        self.run_cycle(None).await;
    }

    /// Run one refresh cycle for a caller-supplied coordinate,
    /// bypassing location resolution. A pre-known place additionally
    /// bypasses reverse geocoding. Used when the user picks a place
    /// explicitly.
    pub async fn refresh_with(&self, coordinate: Coordinate, place: Option<Place>) {
        self.run_cycle(Some((coordinate, place))).await;
    }

    async fn run_cycle(&self, manual: Option<(Coordinate, Option<Place>)>) {
        {
            let mut inner = self.shared.inner.lock();
            if !inner.state.can_start_refresh() {
                tracing::debug!("Refresh already in flight, dropping trigger");
                return;
            }
            inner.state = RefreshState::Loading;
        }
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (coordinate, known_place) = match manual {
            Some((coordinate, place)) => (coordinate, place),
            None => {
                let resolved = self.resolver.resolve().await;
                tracing::info!(
                    coordinate = %resolved.coordinate,
                    source = ?resolved.source,
                    "Location resolved"
                );
                (resolved.coordinate, None)
            }
        };

        {
            let mut inner = self.shared.inner.lock();
            inner.coordinate = Some(coordinate);
            if let Some(place) = known_place.clone() {
                inner.place = Some(place);
            }
        }

        if known_place.is_none() {
            self.spawn_geocode(coordinate, generation);
        }

        let key = ForecastCache::key_for(coordinate);
        self.cold_start_cache_read(&key);

        let fetched = with_retry(&self.retry, || self.client.fetch(coordinate)).await;
        let now = Utc::now();

        match fetched {
            Ok(forecast) => {
                let changed = {
                    let inner = self.shared.inner.lock();
                    !inner
                        .forecast
                        .as_ref()
                        .is_some_and(|held| held.same_series(&forecast))
                };

                if changed {
                    self.cache.put(&key, &forecast);
                    self.shared.inner.lock().forecast = Some(forecast);
                } else {
                    tracing::debug!("Forecast unchanged, suppressing update and write-back");
                }

                self.schedule_alert(now);

                let mut inner = self.shared.inner.lock();
                inner.state = RefreshState::Done;
                inner.error_message = None;
                inner.last_success = Some(Instant::now());
            }
            Err(e) => {
                tracing::warn!("Forecast refresh failed: {}", e);
                let mut inner = self.shared.inner.lock();
                inner.error_message = Some(e.user_message());
                // stale-but-present data beats an error screen
                inner.state = if inner.forecast.is_some() {
                    RefreshState::Done
                } else {
                    RefreshState::Error
                };
            }
        }
    }

    /// Reverse geocoding is display enrichment only: fired without
    /// blocking the pipeline, applied only if no newer cycle has
    /// started since.
    fn spawn_geocode(&self, coordinate: Coordinate, generation: u64) {
        let geocoder = self.geocoder.clone();
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let place = geocoder.reverse(coordinate).await;
            if place.is_unknown() {
                return;
            }
            if shared.generation.load(Ordering::SeqCst) == generation {
                shared.inner.lock().place = Some(place);
            } else {
                tracing::debug!("Discarding geocode result from superseded cycle");
            }
        });
    }

    /// Optimistic cache read, once per process: show the last
    /// persisted forecast immediately while the fresh fetch runs.
    fn cold_start_cache_read(&self, key: &str) {
        {
            let inner = self.shared.inner.lock();
            if inner.cold_cache_checked || inner.forecast.is_some() {
                return;
            }
        }
        let cached = self.cache.get(key);
        let mut inner = self.shared.inner.lock();
        inner.cold_cache_checked = true;
        if inner.forecast.is_none() {
            if let Some(forecast) = cached {
                tracing::info!("Showing cached forecast while refreshing");
                inner.forecast = Some(forecast);
            }
        }
    }

    fn schedule_alert(&self, now: DateTime<Utc>) {
        let held = self.shared.inner.lock().forecast.clone();
        let Some(forecast) = held else { return };

        if let Some(slot) = find_next_bad_slot(&forecast, now) {
            let assessment = assess(slot);
            let outcome = self
                .scheduler
                .lock()
                .schedule_next(&assessment, slot.time, now);
            tracing::debug!(?outcome, slot_time = %slot.time, "Alert scheduling outcome");
        } else {
            tracing::debug!("No bad weather in the forecast window");
        }
    }

    /// Arm the foreground poll timer. Idempotent.
    ///
    /// The task holds only a weak reference so it does not keep the
    /// orchestrator alive; it exits on its own once the last strong
    /// handle is dropped.
    pub fn start_polling(self: Arc<Self>) {
        let mut task = self.poll_task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let poll_interval = self.poll_interval;
        let this = Arc::downgrade(&self);
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the immediate first tick; the initial refresh is the
            // caller's responsibility
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(this) = this.upgrade() else { break };
                this.refresh().await;
            }
        }));
    }

    /// Tear the poll timer down (app moved to background).
    pub fn stop_polling(&self) {
        if let Some(handle) = self.poll_task.lock().take() {
            handle.abort();
            tracing::debug!("Poll timer torn down");
        }
    }

    /// App returned to foreground: re-arm the timer and catch up
    /// immediately if the background gap exceeded the poll interval.
    pub async fn on_foregrounded(self: Arc<Self>) {
        let stale = {
            let inner = self.shared.inner.lock();
            inner
                .last_success
                .map_or(true, |at| at.elapsed() > self.poll_interval)
        };
        Arc::clone(&self).start_polling();
        if stale {
            tracing::info!("Foreground catch-up refresh");
            self.refresh().await;
        }
    }

    /// App moved to background.
    pub fn on_backgrounded(&self) {
        self.stop_polling();
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = self.shared.inner.lock();
        Snapshot {
            state: inner.state,
            forecast: inner.forecast.clone(),
            coordinate: inner.coordinate,
            place: inner.place.clone(),
            error_message: inner.error_message.clone(),
        }
    }
}

impl<L, N> Drop for Orchestrator<L, N> {
    fn drop(&mut self) {
        if let Some(handle) = self.poll_task.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn initial_state_is_idle() {
        assert_eq!(RefreshState::default(), RefreshState::Idle);
    }

    #[test]
    fn idle_done_and_error_allow_refresh() {
        assert!(RefreshState::Idle.can_start_refresh());
        assert!(RefreshState::Done.can_start_refresh());
        assert!(RefreshState::Error.can_start_refresh());
    }

    #[test]
    fn loading_blocks_refresh() {
        assert!(!RefreshState::Loading.can_start_refresh());
    }
}
