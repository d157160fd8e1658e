//! The local device state store.
//!
//! Holds the persisted record of device identity, registration token, and
//! the current interest set. All access goes through
//! [`DeviceStateStore::synchronize`], the single exclusive-lock primitive:
//! every multi-step read-modify-write (replay persistence, recreation
//! persistence, stop cleanup) is one closure, one critical section.
//!
//! The mutex is a std mutex on purpose - a closure cannot await, so no
//! network call can ever happen inside a critical section.

use std::sync::Mutex;
use sync_types::{DeviceId, InterestSet, Metadata, Token, UserId};

/// The persisted device record.
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    /// Server-issued device id; `Some` iff the device is registered.
    pub device_id: Option<DeviceId>,
    /// The platform registration token last persisted.
    pub token: Option<Token>,
    /// The user associated with this device, if any.
    pub user_id: Option<UserId>,
    /// The local interest set.
    pub interests: InterestSet,
    /// The metadata snapshot last confirmed by the server, for dedupe.
    pub last_metadata: Option<Metadata>,
}

impl DeviceState {
    /// Reset to the unregistered state. The interest set dies with the
    /// device record.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Mutex-guarded store for [`DeviceState`].
#[derive(Debug, Default)]
pub struct DeviceStateStore {
    state: Mutex<DeviceState>,
}

impl DeviceStateStore {
    /// Create an empty, unregistered store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `body` under exclusive access to the device state and return
    /// its result.
    pub fn synchronize<T>(&self, body: impl FnOnce(&mut DeviceState) -> T) -> T {
        let mut state = self.state.lock().expect("device state lock poisoned");
        body(&mut state)
    }

    /// Whether a device record currently exists.
    pub fn is_registered(&self) -> bool {
        self.synchronize(|state| state.device_id.is_some())
    }

    /// The current device id, if registered.
    pub fn device_id(&self) -> Option<DeviceId> {
        self.synchronize(|state| state.device_id.clone())
    }

    /// The stored registration token, if any.
    pub fn token(&self) -> Option<Token> {
        self.synchronize(|state| state.token.clone())
    }

    /// The stored user id, if any.
    pub fn user_id(&self) -> Option<UserId> {
        self.synchronize(|state| state.user_id.clone())
    }

    /// A copy of the local interest set.
    pub fn interests(&self) -> InterestSet {
        self.synchronize(|state| state.interests.clone())
    }
}
