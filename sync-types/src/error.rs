//! Error types for interest-sync.

use thiserror::Error;

/// Terminal errors from the remote sync service.
///
/// Transient network failures never appear here: they are retried inside
/// the remote client under the supplied retry policy. What surfaces is
/// either a device that no longer exists server-side, or a request the
/// service definitively rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The device record was deleted server-side; the local id is stale.
    #[error("device not found")]
    DeviceNotFound,

    /// Any other terminal failure (rejected request, malformed response,
    /// or a bounded retry policy giving up).
    #[error("request failed: {0}")]
    Request(String),
}
