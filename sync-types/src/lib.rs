//! # interest-sync-types
//!
//! Foundational types for the interest-sync device synchronization engine.
//!
//! This crate provides the types shared by all interest-sync crates:
//! - [`DeviceId`], [`Token`], [`UserId`], [`Interest`] - Identity types
//! - [`SyncJob`] / [`JobKind`] - The closed set of synchronization jobs
//! - [`Device`] - The server-issued registration record
//! - [`Metadata`] - Opaque client metadata snapshot
//! - [`ApiError`] - Terminal remote-service errors

#![warn(missing_docs)]
#![warn(clippy::all)]

mod device;
mod error;
mod ids;
mod job;
mod metadata;

pub use device::Device;
pub use error::ApiError;
pub use ids::{
    DeviceId, Interest, InterestSet, InvalidInterest, Token, UserId, MAX_INTEREST_LENGTH,
};
pub use job::{JobKind, SyncJob};
pub use metadata::Metadata;
