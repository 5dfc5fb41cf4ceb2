//! Local notification scheduling for Stormwarn
//!
//! Turns a classified "next bad slot" into a single, time-anchored
//! notification request, deduplicated per slot timestamp.

pub mod notify;

pub use notify::{
    AlertRequest, AlertScheduler, LogBackend, NotificationBackend, NotifyError, ScheduleOutcome,
};
