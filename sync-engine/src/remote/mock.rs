//! Mock remote client for testing.
//!
//! Records every call and lets tests queue failures per operation.
//! By default every operation succeeds; registrations mint sequential
//! device ids with an empty initial interest set unless a device record
//! is queued explicitly.

use super::RemoteSyncApi;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use sync_core::RetryPolicy;
use sync_types::{ApiError, Device, DeviceId, Interest, InterestSet, Metadata, Token, UserId};

/// A remote call observed by [`MockApi`], for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    /// `register` was called.
    Register {
        /// The token registered with.
        token: Token,
    },
    /// `subscribe` was called.
    Subscribe {
        /// Target device.
        device_id: DeviceId,
        /// The interest added.
        interest: Interest,
    },
    /// `unsubscribe` was called.
    Unsubscribe {
        /// Target device.
        device_id: DeviceId,
        /// The interest removed.
        interest: Interest,
    },
    /// `set_subscriptions` was called.
    SetSubscriptions {
        /// Target device.
        device_id: DeviceId,
        /// The replacement interest set.
        interests: InterestSet,
    },
    /// `delete_device` was called.
    DeleteDevice {
        /// The deleted device.
        device_id: DeviceId,
    },
    /// `refresh_token` was called.
    RefreshToken {
        /// Target device.
        device_id: DeviceId,
        /// The replacement token.
        token: Token,
    },
    /// `set_user_id` was called.
    SetUserId {
        /// Target device.
        device_id: DeviceId,
        /// The associated user.
        user_id: UserId,
    },
    /// `set_metadata` was called.
    SetMetadata {
        /// Target device.
        device_id: DeviceId,
        /// The snapshot sent.
        metadata: Metadata,
    },
}

#[derive(Debug, Default)]
struct MockApiInner {
    calls: Vec<ApiCall>,
    register_results: VecDeque<Result<Device, ApiError>>,
    subscribe_errors: VecDeque<ApiError>,
    unsubscribe_errors: VecDeque<ApiError>,
    set_subscriptions_errors: VecDeque<ApiError>,
    delete_device_errors: VecDeque<ApiError>,
    refresh_token_errors: VecDeque<ApiError>,
    set_user_id_errors: VecDeque<ApiError>,
    set_metadata_errors: VecDeque<ApiError>,
    minted_devices: u32,
}

/// Mock implementation of [`RemoteSyncApi`].
///
/// Clones share state, so a copy can be handed to the engine while the
/// original stays available for verification.
#[derive(Debug, Default)]
pub struct MockApi {
    inner: Arc<Mutex<MockApiInner>>,
}

impl Clone for MockApi {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl MockApi {
    /// Create a mock where every operation succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a device record to be returned by the next `register` call.
    pub fn queue_register(&self, device: Device) {
        self.lock().register_results.push_back(Ok(device));
    }

    /// Queue a failure for the next `register` call.
    pub fn fail_next_register(&self, error: ApiError) {
        self.lock().register_results.push_back(Err(error));
    }

    /// Queue a failure for the next `subscribe` call.
    pub fn fail_next_subscribe(&self, error: ApiError) {
        self.lock().subscribe_errors.push_back(error);
    }

    /// Queue a failure for the next `unsubscribe` call.
    pub fn fail_next_unsubscribe(&self, error: ApiError) {
        self.lock().unsubscribe_errors.push_back(error);
    }

    /// Queue a failure for the next `set_subscriptions` call.
    pub fn fail_next_set_subscriptions(&self, error: ApiError) {
        self.lock().set_subscriptions_errors.push_back(error);
    }

    /// Queue a failure for the next `delete_device` call.
    pub fn fail_next_delete_device(&self, error: ApiError) {
        self.lock().delete_device_errors.push_back(error);
    }

    /// Queue a failure for the next `refresh_token` call.
    pub fn fail_next_refresh_token(&self, error: ApiError) {
        self.lock().refresh_token_errors.push_back(error);
    }

    /// Queue a failure for the next `set_user_id` call.
    pub fn fail_next_set_user_id(&self, error: ApiError) {
        self.lock().set_user_id_errors.push_back(error);
    }

    /// Queue a failure for the next `set_metadata` call.
    pub fn fail_next_set_metadata(&self, error: ApiError) {
        self.lock().set_metadata_errors.push_back(error);
    }

    /// All calls observed so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockApiInner> {
        self.inner.lock().expect("mock api lock poisoned")
    }
}

#[async_trait]
impl RemoteSyncApi for MockApi {
    async fn register(
        &self,
        token: &Token,
        _metadata: &Metadata,
        _retry: &RetryPolicy,
    ) -> Result<Device, ApiError> {
        let mut inner = self.lock();
        inner.calls.push(ApiCall::Register {
            token: token.clone(),
        });
        if let Some(result) = inner.register_results.pop_front() {
            return result;
        }
        let n = inner.minted_devices;
        inner.minted_devices += 1;
        Ok(Device::new(
            DeviceId::new(format!("device-{n}")),
            InterestSet::new(),
        ))
    }

    async fn subscribe(
        &self,
        device_id: &DeviceId,
        interest: &Interest,
        _retry: &RetryPolicy,
    ) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.calls.push(ApiCall::Subscribe {
            device_id: device_id.clone(),
            interest: interest.clone(),
        });
        match inner.subscribe_errors.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn unsubscribe(
        &self,
        device_id: &DeviceId,
        interest: &Interest,
        _retry: &RetryPolicy,
    ) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.calls.push(ApiCall::Unsubscribe {
            device_id: device_id.clone(),
            interest: interest.clone(),
        });
        match inner.unsubscribe_errors.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn set_subscriptions(
        &self,
        device_id: &DeviceId,
        interests: &InterestSet,
        _retry: &RetryPolicy,
    ) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.calls.push(ApiCall::SetSubscriptions {
            device_id: device_id.clone(),
            interests: interests.clone(),
        });
        match inner.set_subscriptions_errors.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn delete_device(
        &self,
        device_id: &DeviceId,
        _retry: &RetryPolicy,
    ) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.calls.push(ApiCall::DeleteDevice {
            device_id: device_id.clone(),
        });
        match inner.delete_device_errors.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn refresh_token(
        &self,
        device_id: &DeviceId,
        token: &Token,
        _retry: &RetryPolicy,
    ) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.calls.push(ApiCall::RefreshToken {
            device_id: device_id.clone(),
            token: token.clone(),
        });
        match inner.refresh_token_errors.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn set_user_id(
        &self,
        device_id: &DeviceId,
        user_id: &UserId,
        _retry: &RetryPolicy,
    ) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.calls.push(ApiCall::SetUserId {
            device_id: device_id.clone(),
            user_id: user_id.clone(),
        });
        match inner.set_user_id_errors.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn set_metadata(
        &self,
        device_id: &DeviceId,
        metadata: &Metadata,
        _retry: &RetryPolicy,
    ) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.calls.push(ApiCall::SetMetadata {
            device_id: device_id.clone(),
            metadata: metadata.clone(),
        });
        match inner.set_metadata_errors.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
