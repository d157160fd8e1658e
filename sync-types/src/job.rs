//! Synchronization jobs.
//!
//! A [`SyncJob`] is one unit of requested synchronization work. Jobs are
//! immutable once created; their submission order is the only ordering
//! that matters to the engine.

use crate::ids::{Interest, InterestSet, Token, UserId};
use crate::metadata::Metadata;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One unit of requested synchronization work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncJob {
    /// Register the device with the remote service using a platform token.
    StartRegistration {
        /// The platform registration token to register with.
        token: Token,
    },
    /// The platform issued a new registration token for this device.
    RefreshToken {
        /// The replacement token.
        token: Token,
    },
    /// Subscribe the device to one interest.
    Subscribe {
        /// The interest to add.
        interest: Interest,
    },
    /// Unsubscribe the device from one interest.
    Unsubscribe {
        /// The interest to remove.
        interest: Interest,
    },
    /// Replace the device's whole interest set.
    SetSubscriptions {
        /// The new interest set.
        interests: InterestSet,
    },
    /// The application (re)started; sync the metadata snapshot.
    ApplicationStarted {
        /// Metadata captured at application start.
        metadata: Metadata,
    },
    /// Associate the device with a user.
    SetUserId {
        /// The user to associate.
        user_id: UserId,
    },
    /// Deregister the device and clear its local record.
    StopRegistration,
}

impl SyncJob {
    /// The discriminant of this job, for routing and reporting.
    pub fn kind(&self) -> JobKind {
        match self {
            SyncJob::StartRegistration { .. } => JobKind::StartRegistration,
            SyncJob::RefreshToken { .. } => JobKind::RefreshToken,
            SyncJob::Subscribe { .. } => JobKind::Subscribe,
            SyncJob::Unsubscribe { .. } => JobKind::Unsubscribe,
            SyncJob::SetSubscriptions { .. } => JobKind::SetSubscriptions,
            SyncJob::ApplicationStarted { .. } => JobKind::ApplicationStarted,
            SyncJob::SetUserId { .. } => JobKind::SetUserId,
            SyncJob::StopRegistration => JobKind::StopRegistration,
        }
    }
}

/// Job discriminant, used in failure events and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    /// [`SyncJob::StartRegistration`].
    StartRegistration,
    /// [`SyncJob::RefreshToken`].
    RefreshToken,
    /// [`SyncJob::Subscribe`].
    Subscribe,
    /// [`SyncJob::Unsubscribe`].
    Unsubscribe,
    /// [`SyncJob::SetSubscriptions`].
    SetSubscriptions,
    /// [`SyncJob::ApplicationStarted`].
    ApplicationStarted,
    /// [`SyncJob::SetUserId`].
    SetUserId,
    /// [`SyncJob::StopRegistration`].
    StopRegistration,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::StartRegistration => "start-registration",
            JobKind::RefreshToken => "refresh-token",
            JobKind::Subscribe => "subscribe",
            JobKind::Unsubscribe => "unsubscribe",
            JobKind::SetSubscriptions => "set-subscriptions",
            JobKind::ApplicationStarted => "application-started",
            JobKind::SetUserId => "set-user-id",
            JobKind::StopRegistration => "stop-registration",
        };
        write!(f, "{name}")
    }
}
