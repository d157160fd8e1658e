//! The single worker that drains the job queue.
//!
//! Exactly one worker task exists per engine; it receives jobs over a
//! channel in submission order and handles them one at a time, so no two
//! job bodies ever run concurrently. A job's remote calls block the worker
//! until they return - the pipeline is backpressured by network latency,
//! which is acceptable because job volume per device is low.

use crate::provider::MetadataProvider;
use crate::queue::{JobQueue, QueuedJob};
use crate::remote::RemoteSyncApi;
use crate::report::{FailureEvent, FailureReporter};
use crate::store::DeviceStateStore;
use std::sync::Arc;
use sync_core::{replay, RetryPolicy};
use sync_types::{ApiError, DeviceId, SyncJob, Token};
use tokio::sync::{mpsc, oneshot};

/// Messages consumed by the worker task.
pub(crate) enum Command {
    /// Handle one queued job.
    Process(QueuedJob),
    /// Reply once every previously submitted job has been handled.
    Flush(oneshot::Sender<()>),
    /// Finish the backlog and exit. The queue keeps a sender clone, so the
    /// channel never closes on its own; shutdown is an explicit message.
    Shutdown,
}

/// State owned by the worker task.
pub(crate) struct Worker {
    pub queue: Arc<JobQueue>,
    pub store: Arc<DeviceStateStore>,
    pub api: Arc<dyn RemoteSyncApi>,
    pub metadata: Arc<dyn MetadataProvider>,
    pub reporter: Arc<dyn FailureReporter>,
    pub retry: RetryPolicy,
}

impl Worker {
    pub(crate) async fn run(self, mut rx: mpsc::UnboundedReceiver<Command>) {
        tracing::debug!("sync worker started");
        while let Some(command) = rx.recv().await {
            match command {
                Command::Process(entry) => self.handle(entry).await,
                Command::Flush(done) => {
                    let _ = done.send(());
                }
                Command::Shutdown => break,
            }
        }
        tracing::debug!("sync worker stopped");
    }

    /// Route one job. Start requests are always handled; everything else
    /// is gated on the device being registered.
    async fn handle(&self, entry: QueuedJob) {
        match &entry.job {
            SyncJob::StartRegistration { token } => {
                self.handle_start(entry.seq, token.clone()).await;
            }
            job if !self.store.is_registered() => {
                // Nothing to execute yet. The queue record keeps the entry
                // so the next start request folds it through replay and
                // drains it.
                tracing::debug!(job = %job.kind(), "device not registered, holding job for replay");
            }
            SyncJob::StopRegistration => {
                self.handle_stop().await;
                self.queue.remove(entry.seq);
            }
            job => {
                self.process_job(job).await;
                self.queue.remove(entry.seq);
            }
        }
    }

    /// Register the device and replay everything queued before the start
    /// request.
    async fn handle_start(&self, seq: u64, token: Token) {
        let metadata = self.metadata.get();
        let device = match self.api.register(&token, &metadata, &self.retry).await {
            Ok(device) => device,
            Err(error) => {
                self.reporter
                    .report(FailureEvent::RegistrationFailed { error });
                // Abandon this start attempt: the triggering job and
                // everything queued before it is discarded, not retried.
                self.queue.drain_through(seq);
                return;
            }
        };
        tracing::info!(device_id = %device.id, "device registered");

        let queued = self.queue.jobs_before(seq);
        let outcome = replay(&device.initial_interests, queued.iter());

        // One exclusive section: replayed interests plus the new identity.
        let local = self.store.synchronize(|state| {
            if state.interests != outcome.interests {
                state.interests = outcome.interests.clone();
            }
            state.device_id = Some(device.id.clone());
            state.token = Some(token.clone());
            state.interests.clone()
        });

        // Best-effort reconciliation outside the lock; the local write has
        // already happened and a later job can repair any drift.
        if local != device.initial_interests {
            if let Err(error) = self
                .api
                .set_subscriptions(&device.id, &local, &self.retry)
                .await
            {
                tracing::debug!(%error, "initial interest reconciliation failed");
            }
        }

        for job in &outcome.deferred {
            self.process_job(job).await;
        }

        self.queue.drain_through(seq);
    }

    /// Deregister the device and clear the local record.
    async fn handle_stop(&self) {
        let Some(device_id) = self.store.device_id() else {
            return;
        };
        // Result deliberately ignored: the local record is cleared even if
        // the server-side delete does not go through.
        if let Err(error) = self.api.delete_device(&device_id, &self.retry).await {
            tracing::debug!(%error, "device deletion returned an error");
        }
        self.store.synchronize(|state| state.clear());
        tracing::info!(device_id = %device_id, "device deregistered");
    }

    /// Execute one job against the remote service, recovering once from a
    /// stale device record.
    async fn process_job(&self, job: &SyncJob) {
        let Some(device_id) = self.store.device_id() else {
            return;
        };
        self.apply_local(job);

        match self.execute(&device_id, job).await {
            Ok(()) => {}
            Err(ApiError::DeviceNotFound) => {
                tracing::warn!(job = %job.kind(), "device record stale, recreating");
                match self.recreate_device().await {
                    Ok(new_id) => {
                        // Exactly one retry of the same job; a second
                        // failure drops it.
                        if let Err(error) = self.execute(&new_id, job).await {
                            self.reporter.report(FailureEvent::JobFailed {
                                kind: job.kind(),
                                error,
                            });
                        }
                    }
                    Err(error) => {
                        self.reporter.report(FailureEvent::RecoveryFailed {
                            kind: job.kind(),
                            error,
                        });
                    }
                }
            }
            Err(error) => {
                self.reporter.report(FailureEvent::JobFailed {
                    kind: job.kind(),
                    error,
                });
            }
        }
    }

    /// Apply an interest mutation to the local store before the remote
    /// call, so the local set never loses a mutation to a failed request.
    fn apply_local(&self, job: &SyncJob) {
        self.store.synchronize(|state| match job {
            SyncJob::Subscribe { interest } => {
                state.interests.insert(interest.clone());
            }
            SyncJob::Unsubscribe { interest } => {
                state.interests.remove(interest);
            }
            SyncJob::SetSubscriptions { interests } => {
                state.interests = interests.clone();
            }
            _ => {}
        });
    }

    /// The remote call (and success-side persistence) for one job.
    async fn execute(&self, device_id: &DeviceId, job: &SyncJob) -> Result<(), ApiError> {
        match job {
            SyncJob::Subscribe { interest } => {
                self.api.subscribe(device_id, interest, &self.retry).await
            }
            SyncJob::Unsubscribe { interest } => {
                self.api.unsubscribe(device_id, interest, &self.retry).await
            }
            SyncJob::SetSubscriptions { interests } => {
                self.api
                    .set_subscriptions(device_id, interests, &self.retry)
                    .await
            }
            SyncJob::RefreshToken { token } => {
                self.api.refresh_token(device_id, token, &self.retry).await?;
                self.store
                    .synchronize(|state| state.token = Some(token.clone()));
                Ok(())
            }
            SyncJob::SetUserId { user_id } => {
                self.api.set_user_id(device_id, user_id, &self.retry).await?;
                self.store
                    .synchronize(|state| state.user_id = Some(user_id.clone()));
                Ok(())
            }
            SyncJob::ApplicationStarted { metadata } => {
                let unchanged = self
                    .store
                    .synchronize(|state| state.last_metadata.as_ref() == Some(metadata));
                if unchanged {
                    return Ok(());
                }
                self.api.set_metadata(device_id, metadata, &self.retry).await?;
                self.store
                    .synchronize(|state| state.last_metadata = Some(metadata.clone()));
                Ok(())
            }
            // Routed by the dispatcher before the processor is reached.
            SyncJob::StartRegistration { .. } | SyncJob::StopRegistration => Ok(()),
        }
    }

    /// Re-register with the stored token after the server lost the device.
    ///
    /// Restores registration and interests. A stored user id is NOT
    /// re-applied: re-authentication is the caller's concern.
    async fn recreate_device(&self) -> Result<DeviceId, ApiError> {
        let Some(token) = self.store.token() else {
            return Err(ApiError::Request(
                "no stored token to re-register with".into(),
            ));
        };
        let metadata = self.metadata.get();
        let device = self.api.register(&token, &metadata, &self.retry).await?;

        let (interests, user_id) = self.store.synchronize(|state| {
            state.device_id = Some(device.id.clone());
            state.token = Some(token.clone());
            (state.interests.clone(), state.user_id.clone())
        });

        if !interests.is_empty() {
            // Best effort; the retried job follows anyway.
            if let Err(error) = self
                .api
                .set_subscriptions(&device.id, &interests, &self.retry)
                .await
            {
                tracing::debug!(%error, "interest reconciliation after recreation failed");
            }
        }
        if user_id.is_some() {
            tracing::warn!(device_id = %device.id, "device recreated without re-applying user id");
        }

        tracing::info!(device_id = %device.id, "device recreated");
        Ok(device.id)
    }
}
