//! Pull-merge-push orchestration.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use super::remote::RemoteStore;
use crate::models::RosterDocument;

/// How a pulled document is reconciled with the local one.
///
/// A deployment picks exactly one policy and every merge uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Last write wins: the remote replaces the whole local document when
    /// its `updatedAt` is newer. Local-only classes are lost.
    #[default]
    ReplaceIfNewer,
    /// Remote classes overlay local ones regardless of timestamps; classes
    /// only present locally are kept.
    ShallowMerge,
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::ReplaceIfNewer => write!(f, "replace_if_newer"),
            MergePolicy::ShallowMerge => write!(f, "shallow_merge"),
        }
    }
}

impl std::str::FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "replace_if_newer" => Ok(MergePolicy::ReplaceIfNewer),
            "shallow_merge" => Ok(MergePolicy::ShallowMerge),
            _ => Err(format!("Invalid merge policy: {}", s)),
        }
    }
}

/// What a merge did to the local document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Unchanged,
    Replaced,
    Merged,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, MergeOutcome::Unchanged)
    }
}

/// Reconciles `remote` into `local` under `policy`.
///
/// `local` must be the document as it is now, not as it was when the pull
/// was issued.
pub fn merge(
    policy: MergePolicy,
    local: &mut RosterDocument,
    remote: RosterDocument,
) -> MergeOutcome {
    match policy {
        MergePolicy::ReplaceIfNewer => {
            let newer = match (remote.updated_at, local.updated_at) {
                (Some(r), Some(l)) => r > l,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if !newer {
                tracing::debug!(
                    "Keeping local roster (local={:?}, remote={:?})",
                    local.updated_at,
                    remote.updated_at
                );
                return MergeOutcome::Unchanged;
            }
            tracing::debug!(
                "Replacing local roster (local={:?}, remote={:?})",
                local.updated_at,
                remote.updated_at
            );
            *local = remote;
            MergeOutcome::Replaced
        }
        MergePolicy::ShallowMerge => {
            let before = local.clone();
            local.overlay(remote);
            if *local == before {
                MergeOutcome::Unchanged
            } else {
                MergeOutcome::Merged
            }
        }
    }
}

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Drives pulls and pushes against an optional remote store.
///
/// Pushes run in the background one after another, so the remote receives
/// snapshots in the order they were stamped.
pub struct SyncEngine<R> {
    remote: Option<Arc<R>>,
    policy: MergePolicy,
    /// Tail of the push chain.
    last_push: Option<JoinHandle<()>>,
    in_flight: Arc<AtomicUsize>,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(remote: R, policy: MergePolicy) -> Self {
        Self {
            remote: Some(Arc::new(remote)),
            policy,
            last_push: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// An engine with no remote: pulls find nothing, pushes are skipped.
    pub fn offline(policy: MergePolicy) -> Self {
        Self {
            remote: None,
            policy,
            last_push: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn is_online(&self) -> bool {
        self.remote.is_some()
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    pub fn remote(&self) -> Option<&R> {
        self.remote.as_deref()
    }

    /// Fetches the remote document, if any.
    pub async fn pull(&self) -> Option<RosterDocument> {
        match &self.remote {
            Some(remote) => remote.pull().await,
            None => None,
        }
    }

    /// Merges a pulled document using this engine's policy.
    pub fn merge(&self, local: &mut RosterDocument, remote: RosterDocument) -> MergeOutcome {
        merge(self.policy, local, remote)
    }

    /// Pulls and merges in one step.
    pub async fn pull_and_merge(&self, local: &mut RosterDocument) -> MergeOutcome {
        match self.pull().await {
            Some(remote) => self.merge(local, remote),
            None => MergeOutcome::Unchanged,
        }
    }

    /// Sets `updatedAt` to now, always moving it forward.
    pub fn stamp(&self, doc: &mut RosterDocument) {
        let now = now_millis();
        doc.updated_at = Some(match doc.updated_at {
            Some(prev) if prev >= now => prev.saturating_add(1),
            _ => now,
        });
    }

    /// Sends a snapshot of `doc` in the background.
    ///
    /// Returns immediately. The push starts once the previous one has
    /// finished. Requires a tokio runtime; without one the push is skipped.
    pub fn push(&mut self, doc: &RosterDocument) {
        let Some(remote) = self.remote.clone() else {
            return;
        };
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("No async runtime available, push skipped");
                return;
            }
        };

        let previous = self.last_push.take();
        let in_flight = self.in_flight.clone();
        let snapshot = doc.clone();
        in_flight.fetch_add(1, Ordering::SeqCst);

        self.last_push = Some(handle.spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    tracing::warn!("Push task failed: {}", e);
                }
            }
            remote.push(snapshot).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
        }));
    }

    /// Number of pushes that have not completed yet.
    pub fn pending_pushes(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Waits for in-flight pushes, giving up after `timeout`.
    ///
    /// Returns how many pushes were still pending when the wait ended; those
    /// keep running detached.
    pub async fn flush(&mut self, timeout: Duration) -> usize {
        let Some(mut task) = self.last_push.take() else {
            return 0;
        };

        // A deadline past what Instant can represent means no deadline
        let result = match tokio::time::Instant::now().checked_add(timeout) {
            Some(deadline) => tokio::time::timeout_at(deadline, &mut task).await,
            None => Ok((&mut task).await),
        };
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Push task failed: {}", e),
            // Later pushes still chain after the unfinished one
            Err(_) => self.last_push = Some(task),
        }

        let abandoned = self.pending_pushes();
        if abandoned > 0 {
            tracing::warn!("{} push(es) still in flight after {:?}", abandoned, timeout);
        }
        abandoned
    }
}
