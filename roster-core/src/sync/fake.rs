//! In-memory remote used by tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::remote::RemoteStore;
use crate::models::RosterDocument;

/// Serves a fixed document and records every push.
#[derive(Default)]
pub(crate) struct FakeRemote {
    pub serve: Mutex<Option<RosterDocument>>,
    pub pushed: Mutex<Vec<RosterDocument>>,
    /// Per-push latency, consumed in call order.
    pub push_delays: Mutex<VecDeque<Duration>>,
}

impl FakeRemote {
    pub(crate) fn serving(doc: RosterDocument) -> Self {
        Self {
            serve: Mutex::new(Some(doc)),
            pushed: Mutex::new(Vec::new()),
            push_delays: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn with_push_delays(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            push_delays: Mutex::new(delays.into_iter().collect()),
            ..Self::default()
        }
    }

    pub(crate) fn pushed(&self) -> Vec<RosterDocument> {
        self.pushed.lock().unwrap().clone()
    }
}

impl RemoteStore for FakeRemote {
    async fn pull(&self) -> Option<RosterDocument> {
        self.serve.lock().unwrap().clone()
    }

    async fn push(&self, doc: RosterDocument) {
        let delay = self.push_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.pushed.lock().unwrap().push(doc);
    }
}
