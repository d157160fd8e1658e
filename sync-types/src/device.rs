//! The server-side device record.

use crate::ids::{DeviceId, InterestSet};
use serde::{Deserialize, Serialize};

/// The registration record issued by the remote service.
///
/// Created only by a successful registration call. Never mutated; a fresh
/// registration supersedes it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// The server-issued device id.
    pub id: DeviceId,
    /// The interest set the server already knows for this device at
    /// registration time (non-empty when the device existed before).
    #[serde(default)]
    pub initial_interests: InterestSet,
}

impl Device {
    /// Construct a device record from the registration response.
    pub fn new(id: DeviceId, initial_interests: InterestSet) -> Self {
        Self {
            id,
            initial_interests,
        }
    }
}
