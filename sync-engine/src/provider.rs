//! Metadata acquisition.

use sync_types::Metadata;

/// Supplies the metadata snapshot sent with registrations.
///
/// The engine never inspects the snapshot; it is passed through to the
/// remote service verbatim.
pub trait MetadataProvider: Send + Sync {
    /// Capture the current metadata snapshot.
    fn get(&self) -> Metadata;
}

/// A provider returning a fixed snapshot, for hosts whose metadata does
/// not change at runtime (and for tests).
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata(Metadata);

impl StaticMetadata {
    /// Wrap a fixed snapshot.
    pub fn new(metadata: Metadata) -> Self {
        Self(metadata)
    }
}

impl MetadataProvider for StaticMetadata {
    fn get(&self) -> Metadata {
        self.0.clone()
    }
}
