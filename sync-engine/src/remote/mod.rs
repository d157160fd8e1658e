//! Remote sync service abstraction.
//!
//! This module provides a pluggable client for the device REST API
//! (HTTP for production, mock for testing).
//!
//! # Design
//!
//! Every operation takes a [`RetryPolicy`] and returns only *terminal*
//! results: implementations absorb transient network failures internally,
//! retrying with backoff under the supplied policy. The engine therefore
//! never sees a transient error - a call either succeeds, fails with a
//! definitive [`ApiError`], or (under the unbounded production policy)
//! keeps retrying.

mod http;
mod mock;

pub use http::{HttpApi, HttpApiConfig};
pub use mock::{ApiCall, MockApi};

use async_trait::async_trait;
use sync_core::RetryPolicy;
use sync_types::{ApiError, Device, DeviceId, Interest, InterestSet, Metadata, Token, UserId};

/// Client for the remote device synchronization service.
#[async_trait]
pub trait RemoteSyncApi: Send + Sync {
    /// Register the device, yielding its server-side record.
    async fn register(
        &self,
        token: &Token,
        metadata: &Metadata,
        retry: &RetryPolicy,
    ) -> Result<Device, ApiError>;

    /// Subscribe the device to one interest.
    async fn subscribe(
        &self,
        device_id: &DeviceId,
        interest: &Interest,
        retry: &RetryPolicy,
    ) -> Result<(), ApiError>;

    /// Unsubscribe the device from one interest.
    async fn unsubscribe(
        &self,
        device_id: &DeviceId,
        interest: &Interest,
        retry: &RetryPolicy,
    ) -> Result<(), ApiError>;

    /// Replace the device's whole server-side interest set.
    async fn set_subscriptions(
        &self,
        device_id: &DeviceId,
        interests: &InterestSet,
        retry: &RetryPolicy,
    ) -> Result<(), ApiError>;

    /// Delete the device record server-side.
    async fn delete_device(
        &self,
        device_id: &DeviceId,
        retry: &RetryPolicy,
    ) -> Result<(), ApiError>;

    /// Report a replacement platform token for the device.
    async fn refresh_token(
        &self,
        device_id: &DeviceId,
        token: &Token,
        retry: &RetryPolicy,
    ) -> Result<(), ApiError>;

    /// Associate the device with a user.
    async fn set_user_id(
        &self,
        device_id: &DeviceId,
        user_id: &UserId,
        retry: &RetryPolicy,
    ) -> Result<(), ApiError>;

    /// Update the device's metadata snapshot.
    async fn set_metadata(
        &self,
        device_id: &DeviceId,
        metadata: &Metadata,
        retry: &RetryPolicy,
    ) -> Result<(), ApiError>;
}
