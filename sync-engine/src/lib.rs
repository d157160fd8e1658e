//! # sync-engine
//!
//! Single-worker device registration and interest synchronization engine.
//!
//! This is the runtime half of interest-sync: it keeps a device's
//! push-notification registration and interest subscriptions consistent
//! with the remote service, even when jobs arrive before the device is
//! registered, when the network flakes, or when the device record is
//! deleted server-side.
//!
//! # Architecture
//!
//! ```text
//! Caller → SyncEngine::submit → JobQueue → worker task → RemoteSyncApi → Network
//!                                   ↓
//!                            sync-core (pure replay + backoff)
//! ```
//!
//! - Jobs are handled strictly one at a time, in submission order.
//! - Jobs submitted before registration are held and folded through the
//!   replay algorithm when a start request succeeds, so user actions taken
//!   before the engine is ready are not lost.
//! - A stale device record (`DeviceNotFound`) triggers exactly one
//!   re-registration and one retry of the failing job.
//! - Terminal failures go to a [`FailureReporter`]; `submit` never returns
//!   an error to the caller.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod engine;
mod provider;
mod queue;
mod remote;
mod report;
mod store;
mod worker;

pub use engine::{EngineConfig, SyncEngine};
pub use provider::{MetadataProvider, StaticMetadata};
pub use remote::{ApiCall, HttpApi, HttpApiConfig, MockApi, RemoteSyncApi};
pub use report::{FailureEvent, FailureReporter, RecordingReporter, TracingReporter};
pub use store::{DeviceState, DeviceStateStore};
