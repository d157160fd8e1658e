//! Operational failure reporting.
//!
//! `submit` is fire-and-forget, so terminal failures are surfaced through
//! an event sink rather than returned to the submitter. No event aborts
//! anything: worst case a single job was dropped after being reported.

use std::sync::{Arc, Mutex};
use sync_types::{ApiError, JobKind};

/// A terminal failure observed by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureEvent {
    /// Registration during a start request failed; the whole start attempt
    /// was abandoned and its queue block discarded.
    RegistrationFailed {
        /// The terminal registration error.
        error: ApiError,
    },
    /// A job was dropped after a non-recoverable remote error (or after
    /// its single post-recovery retry failed).
    JobFailed {
        /// Which kind of job was dropped.
        kind: JobKind,
        /// The terminal error.
        error: ApiError,
    },
    /// Device recreation after `DeviceNotFound` failed; the triggering job
    /// was dropped without a retry.
    RecoveryFailed {
        /// Which kind of job triggered the recovery.
        kind: JobKind,
        /// The terminal recreation error.
        error: ApiError,
    },
}

/// Sink for [`FailureEvent`]s.
pub trait FailureReporter: Send + Sync {
    /// Deliver one event. Must not block the worker for long.
    fn report(&self, event: FailureEvent);
}

/// Reporter that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn report(&self, event: FailureEvent) {
        match event {
            FailureEvent::RegistrationFailed { error } => {
                tracing::error!(%error, "registration failed, start attempt abandoned");
            }
            FailureEvent::JobFailed { kind, error } => {
                tracing::warn!(job = %kind, %error, "job dropped");
            }
            FailureEvent::RecoveryFailed { kind, error } => {
                tracing::warn!(job = %kind, %error, "device recovery failed, job dropped");
            }
        }
    }
}

/// Reporter that records events for later inspection.
///
/// Clones share the same buffer, so a copy can be handed to the engine
/// while the original stays available for assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<FailureEvent>>>,
}

impl RecordingReporter {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events reported so far, in order.
    pub fn events(&self) -> Vec<FailureEvent> {
        self.events.lock().expect("reporter lock poisoned").clone()
    }
}

impl FailureReporter for RecordingReporter {
    fn report(&self, event: FailureEvent) {
        self.events
            .lock()
            .expect("reporter lock poisoned")
            .push(event);
    }
}
