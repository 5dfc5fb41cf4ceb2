//! Best-effort device location resolution.
//!
//! The resolver never fails: permission denials and slow fixes
//! degrade through last-known position down to a configured fallback
//! coordinate.

use std::time::Duration;

use crate::types::Coordinate;

/// Deadline for a fresh position fix before falling back.
const FIX_DEADLINE: Duration = Duration::from_secs(4);

/// Foreground location permission outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Device location errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location fix timed out")]
    Timeout,
    #[error("Location service unavailable")]
    Unavailable,
}

/// Seam to the platform location service.
pub trait LocationBackend {
    /// Request foreground location permission.
    fn request_permission(&self) -> impl std::future::Future<Output = Permission> + Send;

    /// Last known cached position, if any. Non-blocking; may be stale.
    fn last_known(&self) -> impl std::future::Future<Output = Option<Coordinate>> + Send;

    /// Fresh position fix, bounded by `deadline`.
    fn current_position(
        &self,
        deadline: Duration,
    ) -> impl std::future::Future<Output = Result<Coordinate, LocationError>> + Send;
}

/// Where a resolved coordinate came from, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    Fix,
    LastKnown,
    Fallback,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolvedLocation {
    pub coordinate: Coordinate,
    pub source: LocationSource,
}

pub struct LocationResolver<B> {
    backend: B,
    fallback: Coordinate,
}

impl<B: LocationBackend> LocationResolver<B> {
    pub fn new(backend: B, fallback: Coordinate) -> Self {
        Self { backend, fallback }
    }

    /// Resolve a usable coordinate. Never fails.
    ///
    /// Permission denied skips the device paths entirely. Otherwise
    /// the last-known position is the fast path and a fresh fix
    /// (bounded by a 4 s deadline) overrides it when it arrives in
    /// time.
    pub async fn resolve(&self) -> ResolvedLocation {
        if self.backend.request_permission().await == Permission::Denied {
            tracing::info!("Location permission denied, using fallback coordinate");
            return ResolvedLocation {
                coordinate: self.fallback,
                source: LocationSource::Fallback,
            };
        }

        let fast = self.backend.last_known().await;

        match tokio::time::timeout(
            FIX_DEADLINE,
            self.backend.current_position(FIX_DEADLINE),
        )
        .await
        {
            Ok(Ok(coordinate)) => {
                tracing::debug!(%coordinate, "Fresh position fix");
                ResolvedLocation {
                    coordinate,
                    source: LocationSource::Fix,
                }
            }
            Ok(Err(e)) => self.degrade(fast, &e.to_string()),
            Err(_) => self.degrade(fast, "fix deadline elapsed"),
        }
    }

    fn degrade(&self, fast: Option<Coordinate>, why: &str) -> ResolvedLocation {
        match fast {
            Some(coordinate) => {
                tracing::debug!(%coordinate, "No fresh fix ({}), keeping last known", why);
                ResolvedLocation {
                    coordinate,
                    source: LocationSource::LastKnown,
                }
            }
            None => {
                tracing::info!("No fresh fix ({}) and no last known position, using fallback", why);
                ResolvedLocation {
                    coordinate: self.fallback,
                    source: LocationSource::Fallback,
                }
            }
        }
    }
}

/// Backend for headless deployments: an optionally configured fixed
/// position stands in for the device location service.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticBackend {
    position: Option<Coordinate>,
}

impl StaticBackend {
    pub fn new(position: Option<Coordinate>) -> Self {
        Self { position }
    }
}

impl LocationBackend for StaticBackend {
    async fn request_permission(&self) -> Permission {
        if self.position.is_some() {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    async fn last_known(&self) -> Option<Coordinate> {
        self.position
    }

    async fn current_position(&self, _deadline: Duration) -> Result<Coordinate, LocationError> {
        self.position.ok_or(LocationError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    const FALLBACK: Coordinate = Coordinate {
        latitude: 53.3501,
        longitude: -6.2661,
    };
    const CACHED: Coordinate = Coordinate {
        latitude: 51.5074,
        longitude: -0.1278,
    };
    const FRESH: Coordinate = Coordinate {
        latitude: 48.8566,
        longitude: 2.3522,
    };

    struct FakeBackend {
        permission: Permission,
        last_known: Option<Coordinate>,
        fix: Option<Coordinate>,
        fix_delay: Duration,
    }

    impl Default for FakeBackend {
        fn default() -> Self {
            Self {
                permission: Permission::Granted,
                last_known: None,
                fix: None,
                fix_delay: Duration::ZERO,
            }
        }
    }

    impl LocationBackend for FakeBackend {
        async fn request_permission(&self) -> Permission {
            self.permission
        }

        async fn last_known(&self) -> Option<Coordinate> {
            self.last_known
        }

        async fn current_position(&self, _deadline: Duration) -> Result<Coordinate, LocationError> {
            if !self.fix_delay.is_zero() {
                tokio::time::sleep(self.fix_delay).await;
            }
            self.fix.ok_or(LocationError::Unavailable)
        }
    }

    #[tokio::test]
    async fn denied_permission_yields_fallback() {
        let resolver = LocationResolver::new(
            FakeBackend {
                permission: Permission::Denied,
                last_known: Some(CACHED),
                fix: Some(FRESH),
                ..FakeBackend::default()
            },
            FALLBACK,
        );
        let resolved = resolver.resolve().await;
        assert_eq!(resolved.coordinate, FALLBACK);
        assert_eq!(resolved.source, LocationSource::Fallback);
    }

    #[tokio::test]
    async fn fresh_fix_overrides_last_known() {
        let resolver = LocationResolver::new(
            FakeBackend {
                last_known: Some(CACHED),
                fix: Some(FRESH),
                ..FakeBackend::default()
            },
            FALLBACK,
        );
        let resolved = resolver.resolve().await;
        assert_eq!(resolved.coordinate, FRESH);
        assert_eq!(resolved.source, LocationSource::Fix);
    }

    #[tokio::test]
    async fn failed_fix_keeps_last_known() {
        let resolver = LocationResolver::new(
            FakeBackend {
                last_known: Some(CACHED),
                fix: None,
                ..FakeBackend::default()
            },
            FALLBACK,
        );
        let resolved = resolver.resolve().await;
        assert_eq!(resolved.coordinate, CACHED);
        assert_eq!(resolved.source, LocationSource::LastKnown);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fix_times_out_to_last_known() {
        let resolver = LocationResolver::new(
            FakeBackend {
                last_known: Some(CACHED),
                fix: Some(FRESH),
                fix_delay: Duration::from_secs(30),
                ..FakeBackend::default()
            },
            FALLBACK,
        );
        let resolved = resolver.resolve().await;
        assert_eq!(resolved.coordinate, CACHED);
        assert_eq!(resolved.source, LocationSource::LastKnown);
    }

    #[tokio::test]
    async fn nothing_available_yields_fallback() {
        let resolver = LocationResolver::new(FakeBackend::default(), FALLBACK);
        let resolved = resolver.resolve().await;
        assert_eq!(resolved.coordinate, FALLBACK);
        assert_eq!(resolved.source, LocationSource::Fallback);
    }

    #[tokio::test]
    async fn static_backend_without_position_denies() {
        let resolver = LocationResolver::new(StaticBackend::default(), FALLBACK);
        let resolved = resolver.resolve().await;
        assert_eq!(resolved.coordinate, FALLBACK);
    }

    #[tokio::test]
    async fn static_backend_with_position_resolves_it() {
        let resolver = LocationResolver::new(StaticBackend::new(Some(CACHED)), FALLBACK);
        let resolved = resolver.resolve().await;
        assert_eq!(resolved.coordinate, CACHED);
    }
}
