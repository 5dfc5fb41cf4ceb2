//! Refresh orchestration for Stormwarn
//!
//! Sequences location resolution, cache, forecast fetch with retry,
//! classification, and alert scheduling into one guarded cycle, and
//! drives it from a foreground poll timer.

pub mod orchestrator;
pub mod retry;

pub use orchestrator::{Orchestrator, RefreshState, Snapshot};
pub use retry::{with_retry, RetryConfig};
