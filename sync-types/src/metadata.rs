//! Device metadata snapshot.

use serde::{Deserialize, Serialize};

/// An opaque snapshot of client metadata, passed through to registration.
///
/// The engine never inspects the fields; it only compares snapshots for
/// equality to avoid re-sending unchanged metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Version of the SDK/library embedding the engine.
    pub sdk_version: String,
    /// Version of the host platform (OS release).
    pub platform_version: String,
    /// Version of the embedding application.
    pub app_version: String,
}

impl Metadata {
    /// Construct a metadata snapshot.
    pub fn new(
        sdk_version: impl Into<String>,
        platform_version: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            sdk_version: sdk_version.into(),
            platform_version: platform_version.into(),
            app_version: app_version.into(),
        }
    }
}
