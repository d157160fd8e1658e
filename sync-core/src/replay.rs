//! Replay of queued jobs over a freshly registered device.
//!
//! When the device registers, jobs may already be waiting in the queue —
//! user actions taken before the engine was ready. This module folds those
//! jobs over the interest set the server reported at registration time,
//! producing the interest set the device should end up with plus the jobs
//! that still need remote execution afterwards.
//!
//! This is a pure function - no side effects. The caller (sync-engine)
//! persists the result and performs the remote reconciliation.

use sync_types::{InterestSet, SyncJob};

/// The result of replaying queued jobs over an initial interest set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOutcome {
    /// The interest set after applying every queued mutation.
    pub interests: InterestSet,
    /// Jobs that do not act on the interest set and must run after
    /// registration completes, in their original submission order.
    pub deferred: Vec<SyncJob>,
}

/// Fold queued jobs over the device's server-known initial interest set.
///
/// Rules, applied in submission order:
/// - `Subscribe` adds to the working set, `Unsubscribe` removes from it,
///   `SetSubscriptions` replaces it wholesale.
/// - `StopRegistration` resets the working set back to `initial` and
///   discards every deferred job collected so far: a stop-then-restart
///   sequence nullifies everything queued in between.
/// - `SetUserId` and `RefreshToken` do not touch interests; they are kept
///   in order for execution after the replay.
/// - `ApplicationStarted` is ignored — registration itself synchronizes
///   the state it would have sent.
/// - `StartRegistration` occurrences are ignored; registration is handled
///   by the caller, not replayed.
pub fn replay<'a, I>(initial: &InterestSet, jobs: I) -> ReplayOutcome
where
    I: IntoIterator<Item = &'a SyncJob>,
{
    let mut interests = initial.clone();
    let mut deferred = Vec::new();

    for job in jobs {
        match job {
            SyncJob::Subscribe { interest } => {
                interests.insert(interest.clone());
            }
            SyncJob::Unsubscribe { interest } => {
                interests.remove(interest);
            }
            SyncJob::SetSubscriptions { interests: set } => {
                interests = set.clone();
            }
            SyncJob::StopRegistration => {
                interests = initial.clone();
                deferred.clear();
            }
            SyncJob::SetUserId { .. } | SyncJob::RefreshToken { .. } => {
                deferred.push(job.clone());
            }
            SyncJob::ApplicationStarted { .. } | SyncJob::StartRegistration { .. } => {}
        }
    }

    ReplayOutcome {
        interests,
        deferred,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_types::{Interest, Metadata, Token, UserId};

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

    #[test]
    fn empty_queue_keeps_initial_set() {
        let outcome = replay(&set(&["news"]), []);
        assert_eq!(outcome.interests, set(&["news"]));
        assert!(outcome.deferred.is_empty());
    }

    #[test]
    fn subscribe_and_unsubscribe_fold_over_initial() {
        // queue = [Subscribe("news"), Unsubscribe("sports")],
        // initial = {"sports","weather"} → {"news","weather"}
        let jobs = [subscribe("news"), unsubscribe("sports")];
        let outcome = replay(&set(&["sports", "weather"]), &jobs);
        assert_eq!(outcome.interests, set(&["news", "weather"]));
    }

    #[test]
    fn set_subscriptions_overrides_prior_mutations() {
        let jobs = [
            subscribe("a"),
            unsubscribe("b"),
            SyncJob::SetSubscriptions {
                interests: set(&["x", "y"]),
            },
        ];
        let outcome = replay(&set(&["b", "c"]), &jobs);
        assert_eq!(outcome.interests, set(&["x", "y"]));
    }

    #[test]
    fn mutations_after_set_subscriptions_still_apply() {
        let jobs = [
            SyncJob::SetSubscriptions {
                interests: set(&["x"]),
            },
            subscribe("y"),
        ];
        let outcome = replay(&InterestSet::new(), &jobs);
        assert_eq!(outcome.interests, set(&["x", "y"]));
    }

    #[test]
    fn stop_resets_to_initial_and_discards_prior_work() {
        // queue = [Subscribe("a"), Stop, Subscribe("b")], initial = {} → {"b"}
        let jobs = [subscribe("a"), SyncJob::StopRegistration, subscribe("b")];
        let outcome = replay(&InterestSet::new(), &jobs);
        assert_eq!(outcome.interests, set(&["b"]));
    }

    #[test]
    fn stop_between_mutations_restores_initial_set() {
        let jobs = [
            subscribe("extra"),
            SyncJob::StopRegistration,
        ];
        let initial = set(&["kept"]);
        let outcome = replay(&initial, &jobs);
        assert_eq!(outcome.interests, initial);
    }

    #[test]
    fn stop_discards_deferred_jobs_collected_so_far() {
        let jobs = [
            SyncJob::SetUserId {
                user_id: UserId::new("old-user"),
            },
            SyncJob::StopRegistration,
            SyncJob::SetUserId {
                user_id: UserId::new("new-user"),
            },
        ];
        let outcome = replay(&InterestSet::new(), &jobs);
        assert_eq!(
            outcome.deferred,
            vec![SyncJob::SetUserId {
                user_id: UserId::new("new-user"),
            }]
        );
    }

    #[test]
    fn user_and_token_jobs_are_deferred_in_order() {
        let jobs = [
            SyncJob::RefreshToken {
                token: Token::new("tok-2"),
            },
            subscribe("news"),
            SyncJob::SetUserId {
                user_id: UserId::new("user-1"),
            },
        ];
        let outcome = replay(&InterestSet::new(), &jobs);
        assert_eq!(outcome.interests, set(&["news"]));
        assert_eq!(
            outcome.deferred,
            vec![
                SyncJob::RefreshToken {
                    token: Token::new("tok-2"),
                },
                SyncJob::SetUserId {
                    user_id: UserId::new("user-1"),
                },
            ]
        );
    }

    #[test]
    fn application_started_is_ignored() {
        let jobs = [SyncJob::ApplicationStarted {
            metadata: Metadata::new("1.0.0", "17.0", "3"),
        }];
        let outcome = replay(&set(&["news"]), &jobs);
        assert_eq!(outcome.interests, set(&["news"]));
        assert!(outcome.deferred.is_empty());
    }

    #[test]
    fn nested_start_registration_is_ignored() {
        let jobs = [
            subscribe("a"),
            SyncJob::StartRegistration {
                token: Token::new("tok-x"),
            },
            subscribe("b"),
        ];
        let outcome = replay(&InterestSet::new(), &jobs);
        assert_eq!(outcome.interests, set(&["a", "b"]));
    }

    #[test]
    fn unsubscribe_of_absent_interest_is_harmless() {
        let outcome = replay(&set(&["news"]), &[unsubscribe("sports")]);
        assert_eq!(outcome.interests, set(&["news"]));
    }
}
