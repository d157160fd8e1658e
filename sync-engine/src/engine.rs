//! SyncEngine - the public entry point.
//!
//! A [`SyncEngine`] owns the job queue, the device state store, and the
//! single worker task that drains the queue. Callers interact through
//! [`SyncEngine::submit`] only: submission is safe from any number of
//! concurrent tasks, never blocks, and never returns an error to the
//! submitter - terminal failures are delivered to the configured
//! [`FailureReporter`](crate::report::FailureReporter).
//!
//! # Example
//!
//! ```ignore
//! use interest_sync_engine::{EngineConfig, SyncEngine, HttpApi, HttpApiConfig,
//!     StaticMetadata, TracingReporter};
//! use sync_types::{Metadata, SyncJob, Token};
//!
//! let api = HttpApi::new(HttpApiConfig::new("https://api.example.com", "my-instance"));
//! let engine = SyncEngine::new(
//!     EngineConfig::default(),
//!     Arc::new(api),
//!     Arc::new(StaticMetadata::new(Metadata::new("1.0.0", "17.4", "42"))),
//!     Arc::new(TracingReporter),
//! );
//!
//! engine.submit(SyncJob::StartRegistration { token: Token::new(platform_token) });
//! ```

use crate::provider::MetadataProvider;
use crate::queue::JobQueue;
use crate::remote::RemoteSyncApi;
use crate::report::FailureReporter;
use crate::store::DeviceStateStore;
use crate::worker::{Command, Worker};
use std::sync::Arc;
use sync_core::RetryPolicy;
use sync_types::SyncJob;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Configuration for [`SyncEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Retry policy supplied to every remote call.
    pub retry: RetryPolicy,
}

impl EngineConfig {
    /// Set the retry policy supplied to every remote call.
    ///
    /// The default retries forever; tests substitute a bounded policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::forever(),
        }
    }
}

/// The device-state synchronization engine.
///
/// One instance per device/session; there is no ambient global state.
pub struct SyncEngine {
    queue: Arc<JobQueue>,
    store: Arc<DeviceStateStore>,
    tx: mpsc::UnboundedSender<Command>,
    worker: JoinHandle<()>,
}

impl SyncEngine {
    /// Create an engine and spawn its worker task.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new(
        config: EngineConfig,
        api: Arc<dyn RemoteSyncApi>,
        metadata: Arc<dyn MetadataProvider>,
        reporter: Arc<dyn FailureReporter>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Arc::new(JobQueue::new(tx.clone()));
        let store = Arc::new(DeviceStateStore::new());

        let worker = Worker {
            queue: Arc::clone(&queue),
            store: Arc::clone(&store),
            api,
            metadata,
            reporter,
            retry: config.retry,
        };
        let worker = tokio::spawn(worker.run(rx));

        Self {
            queue,
            store,
            tx,
            worker,
        }
    }

    /// Append a job to the queue and wake the worker.
    ///
    /// Fire-and-forget: never blocks, never reorders, never drops a job
    /// silently. The queue appends and notifies the worker in one atomic
    /// step, so concurrent submitters execute strictly in queue order.
    /// Failures during handling are delivered to the reporter.
    pub fn submit(&self, job: SyncJob) {
        self.queue.push(job);
    }

    /// The local device state store.
    pub fn store(&self) -> &DeviceStateStore {
        &self.store
    }

    /// Number of jobs still in the queue record (unhandled, or held until
    /// the next registration).
    pub fn pending_jobs(&self) -> usize {
        self.queue.len()
    }

    /// Wait until every job submitted before this call has been handled.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Stop accepting jobs and wait for the worker to finish the backlog.
    pub async fn shutdown(self) {
        let _ = self.tx.send(Command::Shutdown);
        let _ = self.worker.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticMetadata;
    use crate::remote::{ApiCall, MockApi};
    use crate::report::{FailureEvent, RecordingReporter};
    use sync_types::{
        ApiError, Device, DeviceId, Interest, InterestSet, JobKind, Metadata, Token, UserId,
    };

    fn interest(name: &str) -> Interest {
        Interest::new(name).unwrap()
    }

    fn set(names: &[&str]) -> InterestSet {
        names.iter().map(|n| interest(n)).collect()
    }

    fn subscribe(name: &str) -> SyncJob {
        SyncJob::Subscribe {
            interest: interest(name),
        }
    }

    fn unsubscribe(name: &str) -> SyncJob {
        SyncJob::Unsubscribe {
            interest: interest(name),
        }
    }

    fn start(token: &str) -> SyncJob {
        SyncJob::StartRegistration {
            token: Token::new(token),
        }
    }

    struct Harness {
        engine: SyncEngine,
        api: MockApi,
        reporter: RecordingReporter,
    }

    fn harness() -> Harness {
        // Surface worker logs when running with --nocapture.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let api = MockApi::new();
        let reporter = RecordingReporter::new();
        let engine = SyncEngine::new(
            EngineConfig::default(),
            Arc::new(api.clone()),
            Arc::new(StaticMetadata::new(Metadata::new("1.0.0", "test-os", "1"))),
            Arc::new(reporter.clone()),
        );
        Harness {
            engine,
            api,
            reporter,
        }
    }

    fn count_calls(api: &MockApi, pred: impl Fn(&ApiCall) -> bool) -> usize {
        api.calls().iter().filter(|c| pred(c)).count()
    }

    // ===========================================
    // Registration and Replay
    // ===========================================

    #[tokio::test]
    async fn start_registers_and_persists_the_device() {
        let h = harness();
        h.engine.submit(start("tok-1"));
        h.engine.flush().await;

        assert!(h.engine.store().is_registered());
        assert_eq!(h.engine.store().device_id(), Some(DeviceId::new("device-0")));
        assert_eq!(h.engine.store().token(), Some(Token::new("tok-1")));
        assert_eq!(h.engine.pending_jobs(), 0);
    }

    #[tokio::test]
    async fn replay_folds_queued_jobs_over_initial_interests() {
        // queue = [Subscribe("news"), Unsubscribe("sports"), Start],
        // initial = {"sports","weather"} → {"news","weather"}
        let h = harness();
        h.api.queue_register(Device::new(
            DeviceId::new("dev-1"),
            set(&["sports", "weather"]),
        ));

        h.engine.submit(subscribe("news"));
        h.engine.submit(unsubscribe("sports"));
        h.engine.submit(start("tok-1"));
        h.engine.flush().await;

        assert_eq!(h.engine.store().interests(), set(&["news", "weather"]));
        // The replayed set differs from the server-known one, so it was
        // pushed up once.
        let reconciled = h.api.calls().into_iter().any(|c| {
            matches!(c, ApiCall::SetSubscriptions { interests, .. }
                if interests == set(&["news", "weather"]))
        });
        assert!(reconciled, "expected a set_subscriptions reconciliation");
        // No per-job subscribe/unsubscribe for replayed entries.
        assert_eq!(count_calls(&h.api, |c| matches!(c, ApiCall::Subscribe { .. })), 0);
        assert_eq!(h.engine.pending_jobs(), 0);
    }

    #[tokio::test]
    async fn stop_queued_before_start_nullifies_earlier_jobs() {
        // queue = [Subscribe("a"), Stop, Subscribe("b"), Start], initial {}
        // → {"b"}
        let h = harness();
        h.engine.submit(subscribe("a"));
        h.engine.submit(SyncJob::StopRegistration);
        h.engine.submit(subscribe("b"));
        h.engine.submit(start("tok-1"));
        h.engine.flush().await;

        assert_eq!(h.engine.store().interests(), set(&["b"]));
        assert_eq!(h.engine.pending_jobs(), 0);
    }

    #[tokio::test]
    async fn replay_equal_to_initial_skips_reconciliation() {
        let h = harness();
        h.api
            .queue_register(Device::new(DeviceId::new("dev-1"), set(&["news"])));

        h.engine.submit(start("tok-1"));
        h.engine.flush().await;

        assert_eq!(h.engine.store().interests(), set(&["news"]));
        assert_eq!(
            count_calls(&h.api, |c| matches!(c, ApiCall::SetSubscriptions { .. })),
            0
        );
    }

    #[tokio::test]
    async fn deferred_set_user_id_runs_exactly_once_after_replay() {
        let h = harness();
        h.engine.submit(SyncJob::SetUserId {
            user_id: UserId::new("user-1"),
        });
        h.engine.submit(start("tok-1"));
        h.engine.flush().await;

        assert_eq!(
            count_calls(&h.api, |c| matches!(c, ApiCall::SetUserId { .. })),
            1
        );
        assert_eq!(h.engine.store().user_id(), Some(UserId::new("user-1")));
        assert_eq!(h.engine.pending_jobs(), 0);
    }

    #[tokio::test]
    async fn registration_failure_abandons_the_start_attempt() {
        let h = harness();
        h.api.fail_next_register(ApiError::Request("400 bad token".into()));

        h.engine.submit(subscribe("a"));
        h.engine.submit(start("tok-bad"));
        h.engine.flush().await;

        assert!(!h.engine.store().is_registered());
        // The triggering start and everything before it was discarded.
        assert_eq!(h.engine.pending_jobs(), 0);
        assert_eq!(
            h.reporter.events(),
            vec![FailureEvent::RegistrationFailed {
                error: ApiError::Request("400 bad token".into()),
            }]
        );
        // Nothing but the registration itself was attempted.
        assert_eq!(h.api.calls().len(), 1);
    }

    #[tokio::test]
    async fn start_drains_exactly_its_own_block() {
        // A job submitted after the start is not replayed; it runs through
        // the normal path once the device exists.
        let h = harness();
        h.engine.submit(subscribe("a"));
        h.engine.submit(start("tok-1"));
        h.engine.submit(subscribe("b"));
        h.engine.flush().await;

        assert_eq!(h.engine.store().interests(), set(&["a", "b"]));
        let subscribes: Vec<ApiCall> = h
            .api
            .calls()
            .into_iter()
            .filter(|c| matches!(c, ApiCall::Subscribe { .. }))
            .collect();
        assert_eq!(
            subscribes,
            vec![ApiCall::Subscribe {
                device_id: DeviceId::new("device-0"),
                interest: interest("b"),
            }]
        );
        assert_eq!(h.engine.pending_jobs(), 0);
    }

    #[tokio::test]
    async fn second_start_supersedes_the_device() {
        let h = harness();
        h.engine.submit(start("tok-1"));
        h.engine.flush().await;
        assert_eq!(h.engine.store().device_id(), Some(DeviceId::new("device-0")));

        h.engine.submit(start("tok-2"));
        h.engine.flush().await;

        assert_eq!(h.engine.store().device_id(), Some(DeviceId::new("device-1")));
        assert_eq!(h.engine.store().token(), Some(Token::new("tok-2")));
    }

    // ===========================================
    // Gate
    // ===========================================

    #[tokio::test]
    async fn jobs_before_registration_execute_nothing() {
        let h = harness();
        h.engine.submit(subscribe("news"));
        h.engine.flush().await;

        assert!(h.api.calls().is_empty());
        assert!(h.engine.store().interests().is_empty());
        // Held for a future start's replay.
        assert_eq!(h.engine.pending_jobs(), 1);
    }

    #[tokio::test]
    async fn stop_before_registration_executes_nothing() {
        let h = harness();
        h.engine.submit(SyncJob::StopRegistration);
        h.engine.flush().await;

        assert!(h.api.calls().is_empty());
        assert_eq!(h.engine.pending_jobs(), 1);
    }

    // ===========================================
    // Normal Job Processing
    // ===========================================

    #[tokio::test]
    async fn post_start_jobs_execute_in_submission_order() {
        let h = harness();
        h.engine.submit(start("tok-1"));
        h.engine.submit(subscribe("news"));
        h.engine.submit(unsubscribe("news"));
        h.engine.flush().await;

        let calls = h.api.calls();
        assert!(matches!(calls[0], ApiCall::Register { .. }));
        assert_eq!(
            calls[1],
            ApiCall::Subscribe {
                device_id: DeviceId::new("device-0"),
                interest: interest("news"),
            }
        );
        assert_eq!(
            calls[2],
            ApiCall::Unsubscribe {
                device_id: DeviceId::new("device-0"),
                interest: interest("news"),
            }
        );
        assert!(h.engine.store().interests().is_empty());
    }

    #[tokio::test]
    async fn set_subscriptions_replaces_the_local_set() {
        let h = harness();
        h.engine.submit(start("tok-1"));
        h.engine.submit(subscribe("old"));
        h.engine.submit(SyncJob::SetSubscriptions {
            interests: set(&["x", "y"]),
        });
        h.engine.flush().await;

        assert_eq!(h.engine.store().interests(), set(&["x", "y"]));
    }

    #[tokio::test]
    async fn refresh_token_persists_the_new_token() {
        let h = harness();
        h.engine.submit(start("tok-1"));
        h.engine.submit(SyncJob::RefreshToken {
            token: Token::new("tok-2"),
        });
        h.engine.flush().await;

        assert_eq!(h.engine.store().token(), Some(Token::new("tok-2")));
        assert_eq!(
            count_calls(&h.api, |c| matches!(c, ApiCall::RefreshToken { .. })),
            1
        );
    }

    #[tokio::test]
    async fn application_started_dedupes_unchanged_metadata() {
        let h = harness();
        let m1 = Metadata::new("1.0.0", "os", "1");
        let m2 = Metadata::new("1.0.1", "os", "1");

        h.engine.submit(start("tok-1"));
        h.engine.submit(SyncJob::ApplicationStarted {
            metadata: m1.clone(),
        });
        h.engine.submit(SyncJob::ApplicationStarted { metadata: m1 });
        h.engine.submit(SyncJob::ApplicationStarted { metadata: m2 });
        h.engine.flush().await;

        assert_eq!(
            count_calls(&h.api, |c| matches!(c, ApiCall::SetMetadata { .. })),
            2
        );
    }

    // ===========================================
    // DeviceNotFound Recovery
    // ===========================================

    #[tokio::test]
    async fn device_not_found_recreates_once_and_retries_once() {
        let h = harness();
        h.engine.submit(start("tok-1"));
        h.engine.flush().await;

        h.api.fail_next_subscribe(ApiError::DeviceNotFound);
        h.engine.submit(subscribe("news"));
        h.engine.flush().await;

        // start register + recreation register
        assert_eq!(count_calls(&h.api, |c| matches!(c, ApiCall::Register { .. })), 2);
        // failed attempt + single retry
        assert_eq!(count_calls(&h.api, |c| matches!(c, ApiCall::Subscribe { .. })), 2);
        // local set was non-empty, so recreation reconciled it
        assert_eq!(
            count_calls(&h.api, |c| matches!(
                c,
                ApiCall::SetSubscriptions { interests, .. } if *interests == set(&["news"])
            )),
            1
        );
        assert_eq!(h.engine.store().device_id(), Some(DeviceId::new("device-1")));
        assert!(h.reporter.events().is_empty());
    }

    #[tokio::test]
    async fn failed_recreation_drops_the_job_without_retry() {
        let h = harness();
        h.engine.submit(start("tok-1"));
        h.engine.flush().await;

        h.api.fail_next_subscribe(ApiError::DeviceNotFound);
        h.api.fail_next_register(ApiError::Request("500 mirror down".into()));
        h.engine.submit(subscribe("news"));
        h.engine.flush().await;

        assert_eq!(count_calls(&h.api, |c| matches!(c, ApiCall::Subscribe { .. })), 1);
        assert_eq!(
            h.reporter.events(),
            vec![FailureEvent::RecoveryFailed {
                kind: JobKind::Subscribe,
                error: ApiError::Request("500 mirror down".into()),
            }]
        );
    }

    #[tokio::test]
    async fn retry_failure_after_recreation_drops_the_job() {
        let h = harness();
        h.engine.submit(start("tok-1"));
        h.engine.flush().await;

        // Both the first attempt and the post-recovery retry see a stale
        // device; no second recreation may happen.
        h.api.fail_next_subscribe(ApiError::DeviceNotFound);
        h.api.fail_next_subscribe(ApiError::DeviceNotFound);
        h.engine.submit(subscribe("news"));
        h.engine.flush().await;

        assert_eq!(count_calls(&h.api, |c| matches!(c, ApiCall::Subscribe { .. })), 2);
        assert_eq!(count_calls(&h.api, |c| matches!(c, ApiCall::Register { .. })), 2);
        assert_eq!(
            h.reporter.events(),
            vec![FailureEvent::JobFailed {
                kind: JobKind::Subscribe,
                error: ApiError::DeviceNotFound,
            }]
        );
    }

    #[tokio::test]
    async fn non_recoverable_error_drops_the_job_without_retry() {
        let h = harness();
        h.engine.submit(start("tok-1"));
        h.engine.flush().await;

        h.api.fail_next_subscribe(ApiError::Request("422 interest rejected".into()));
        h.engine.submit(subscribe("bad"));
        h.engine.flush().await;

        assert_eq!(count_calls(&h.api, |c| matches!(c, ApiCall::Subscribe { .. })), 1);
        assert_eq!(count_calls(&h.api, |c| matches!(c, ApiCall::Register { .. })), 1);
        assert_eq!(
            h.reporter.events(),
            vec![FailureEvent::JobFailed {
                kind: JobKind::Subscribe,
                error: ApiError::Request("422 interest rejected".into()),
            }]
        );
        // Later jobs still run.
        h.engine.submit(subscribe("good"));
        h.engine.flush().await;
        assert_eq!(count_calls(&h.api, |c| matches!(c, ApiCall::Subscribe { .. })), 2);
    }

    // ===========================================
    // Stop
    // ===========================================

    #[tokio::test]
    async fn stop_deletes_the_device_and_clears_state() {
        let h = harness();
        h.engine.submit(start("tok-1"));
        h.engine.submit(subscribe("news"));
        h.engine.submit(SyncJob::StopRegistration);
        h.engine.flush().await;

        assert_eq!(
            count_calls(&h.api, |c| matches!(c, ApiCall::DeleteDevice { .. })),
            1
        );
        assert!(!h.engine.store().is_registered());
        assert!(h.engine.store().token().is_none());
        assert!(h.engine.store().interests().is_empty());
        assert_eq!(h.engine.pending_jobs(), 0);
    }

    #[tokio::test]
    async fn stop_clears_state_even_if_delete_fails() {
        let h = harness();
        h.engine.submit(start("tok-1"));
        h.engine.flush().await;

        h.api.fail_next_delete_device(ApiError::Request("503".into()));
        h.engine.submit(SyncJob::StopRegistration);
        h.engine.flush().await;

        assert!(!h.engine.store().is_registered());
        assert!(h.reporter.events().is_empty());
    }

    #[tokio::test]
    async fn jobs_after_stop_are_gated_until_the_next_start() {
        let h = harness();
        h.engine.submit(start("tok-1"));
        h.engine.submit(SyncJob::StopRegistration);
        h.engine.submit(subscribe("held"));
        h.engine.flush().await;

        assert_eq!(count_calls(&h.api, |c| matches!(c, ApiCall::Subscribe { .. })), 0);
        assert_eq!(h.engine.pending_jobs(), 1);

        // The held job is replayed by the next start.
        h.engine.submit(start("tok-2"));
        h.engine.flush().await;
        assert_eq!(h.engine.store().interests(), set(&["held"]));
        assert_eq!(h.engine.pending_jobs(), 0);
    }

    // ===========================================
    // Lifecycle
    // ===========================================

    #[tokio::test]
    async fn shutdown_finishes_the_backlog() {
        let h = harness();
        h.engine.submit(start("tok-1"));
        let api = h.api.clone();
        h.engine.shutdown().await;

        assert_eq!(count_calls(&api, |c| matches!(c, ApiCall::Register { .. })), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn submit_is_safe_from_concurrent_callers() {
        let h = harness();
        h.engine.submit(start("tok-1"));
        h.engine.flush().await;

        let engine = Arc::new(h.engine);
        let mut handles = Vec::new();
        for i in 0..8 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                engine.submit(subscribe(&format!("topic-{i}-first")));
                engine.submit(subscribe(&format!("topic-{i}-second")));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        engine.flush().await;

        let executed: Vec<String> = h
            .api
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::Subscribe { interest, .. } => Some(interest.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(executed.len(), 16);
        assert_eq!(engine.store().interests().len(), 16);
        // Execution order must match queue order: each caller's first
        // submission runs before its second.
        for i in 0..8 {
            let first = executed
                .iter()
                .position(|name| name == &format!("topic-{i}-first"))
                .unwrap();
            let second = executed
                .iter()
                .position(|name| name == &format!("topic-{i}-second"))
                .unwrap();
            assert!(first < second, "caller {i} executed out of order");
        }
    }
}
