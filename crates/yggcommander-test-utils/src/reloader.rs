//! A [`Reloader`] that records calls instead of touching a real daemon.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use yggcommander_core::reload::{ReloadOutcome, Reloader};
use yggcommander_core::BoxFuture;

/// Counts reloads and answers with a fixed outcome. Clones share the count.
#[derive(Debug, Clone)]
pub struct RecordingReloader {
    calls: Arc<AtomicUsize>,
    outcome: ReloadOutcome,
}

impl RecordingReloader {
    pub fn succeeding() -> Self {
        Self::answering(ReloadOutcome::ok("reloaded"))
    }

    pub fn failing(message: &str) -> Self {
        Self::answering(ReloadOutcome::failed(message))
    }

    pub fn answering(outcome: ReloadOutcome) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            outcome,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Reloader for RecordingReloader {
    fn reload(&self) -> BoxFuture<'_, ReloadOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.outcome.clone();
        Box::pin(async move { outcome })
    }
}
