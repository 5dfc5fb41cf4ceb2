use chrono::{DateTime, Local, TimeDelta, Utc};

use stormwarn_weather::Assessment;

/// How far ahead of the bad-weather slot the notification fires.
const LEAD_TIME: TimeDelta = TimeDelta::hours(1);

const ALERT_TITLE: &str = "Bad weather ahead";

/// One local notification request. Transient: constructed, handed to
/// the notification backend, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRequest {
    pub fires_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

/// Notification subsystem errors
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification permission denied")]
    PermissionDenied,
    #[error("Notification backend error: {0}")]
    Backend(String),
}

/// Seam to the OS notification subsystem.
pub trait NotificationBackend {
    fn schedule(&self, request: &AlertRequest) -> Result<(), NotifyError>;
}

/// What happened to a scheduling attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A notification was handed to the backend.
    Scheduled,
    /// An alert for this slot timestamp was already issued.
    Duplicate,
    /// The fire time is not strictly in the future.
    TooLate,
    /// The backend rejected the request (logged, non-fatal).
    Failed,
}

/// Schedules at most one notification per distinct bad-weather slot.
///
/// The "last notified slot time" marker lives here for the process
/// lifetime so repeated orchestrator cycles do not re-issue the same
/// alert on every poll.
pub struct AlertScheduler<B> {
    backend: B,
    last_notified_slot: Option<DateTime<Utc>>,
}

impl<B: NotificationBackend> AlertScheduler<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            last_notified_slot: None,
        }
    }

    /// Schedule a notification one hour ahead of `event_time`.
    ///
    /// No-op when the fire time has already passed or when this slot
    /// was already notified. Backend failure (e.g. permission
    /// revoked) is a warning, not a pipeline failure; the dedup
    /// marker is only advanced on success so a later cycle can try
    /// again.
    pub fn schedule_next(
        &mut self,
        assessment: &Assessment,
        event_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ScheduleOutcome {
        let fires_at = event_time - LEAD_TIME;
        if fires_at <= now {
            tracing::debug!(%event_time, "Alert window already passed, skipping");
            return ScheduleOutcome::TooLate;
        }

        if self.last_notified_slot == Some(event_time) {
            tracing::debug!(%event_time, "Alert for this slot already scheduled");
            return ScheduleOutcome::Duplicate;
        }

        let request = AlertRequest {
            fires_at,
            title: ALERT_TITLE.to_string(),
            body: build_body(assessment, event_time),
        };

        match self.backend.schedule(&request) {
            Ok(()) => {
                self.last_notified_slot = Some(event_time);
                tracing::info!(%event_time, %fires_at, "Weather alert scheduled");
                ScheduleOutcome::Scheduled
            }
            Err(e) => {
                tracing::warn!("Failed to schedule weather alert: {}", e);
                ScheduleOutcome::Failed
            }
        }
    }
}

fn build_body(assessment: &Assessment, event_time: DateTime<Utc>) -> String {
    let reasons = assessment
        .reasons
        .iter()
        .map(|r| r.label())
        .collect::<Vec<_>>()
        .join(", ");
    let local_time = event_time.with_timezone(&Local).format("%H:%M");
    format!("{} expected around {}. {}", reasons, local_time, assessment.advice)
}

/// Backend for headless deployments: alerts land in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogBackend;

impl NotificationBackend for LogBackend {
    fn schedule(&self, request: &AlertRequest) -> Result<(), NotifyError> {
        tracing::info!(
            fires_at = %request.fires_at,
            title = %request.title,
            body = %request.body,
            "Notification scheduled"
        );
        Ok(())
    }
}
