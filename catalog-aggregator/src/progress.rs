//! Progress reporting for in-flight aggregation batches

use crate::types::SessionId;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

/// Identifies one `fetch_page` batch. Pages of the same session get distinct
/// batches, so overlapping pages never count each other's sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct BatchId(pub u64);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    pub session: SessionId,
    pub batch: BatchId,
    pub total_sources: usize,
    pub completed_sources: usize,
    pub current_source_name: String,
    /// 1-based position of `current_source_name` within the batch, 0 before
    /// any source has started.
    pub current_ordinal: usize,
}

impl ProgressState {
    pub fn is_complete(&self) -> bool {
        self.completed_sources == self.total_sources
    }
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressState>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressState>;

type Observer = Arc<dyn Fn(&ProgressState) + Send + Sync>;

/// Holds the live `ProgressState` and fans every snapshot out to observers.
#[derive(Clone, Default)]
pub struct ProgressHub {
    inner: Arc<Mutex<HubInner>>,
}

#[derive(Default)]
struct HubInner {
    state: ProgressState,
    observers: Vec<Observer>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress<F>(&self, callback: F)
    where
        F: Fn(&ProgressState) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        inner.observers.push(Arc::new(callback));
    }

    /// Channel flavour of `on_progress`. Snapshots sent after the receiver is
    /// dropped are discarded.
    pub fn subscribe(&self) -> ProgressReceiver {
        let (tx, rx): (ProgressSender, ProgressReceiver) = mpsc::unbounded_channel();
        self.on_progress(move |state| {
            let _ = tx.send(state.clone());
        });
        rx
    }

    pub fn current(&self) -> ProgressState {
        self.lock().state.clone()
    }

    /// Start a new batch: nothing completed, no current source. Updates for
    /// any earlier batch are ignored from here on.
    pub fn reset(&self, session: SessionId, total_sources: usize) -> BatchId {
        let mut batch = BatchId::default();
        self.update(|state| {
            batch = BatchId(state.batch.0 + 1);
            *state = ProgressState {
                session,
                batch,
                total_sources,
                ..ProgressState::default()
            };
            true
        });
        batch
    }

    /// Called right before the source's request goes out.
    pub fn source_started(&self, batch: BatchId, ordinal: usize, source_name: &str) {
        self.update(|state| {
            if state.batch != batch {
                return false;
            }
            state.current_ordinal = ordinal;
            state.current_source_name = source_name.to_string();
            true
        });
    }

    /// Called once the source's request has settled, successfully or not.
    pub fn source_settled(&self, batch: BatchId, ordinal: usize, source_name: &str) {
        self.update(|state| {
            if state.batch != batch {
                return false;
            }
            state.completed_sources = (state.completed_sources + 1).min(state.total_sources);
            state.current_ordinal = ordinal;
            state.current_source_name = source_name.to_string();
            true
        });
    }

    fn update<F>(&self, apply: F)
    where
        F: FnOnce(&mut ProgressState) -> bool,
    {
        let (snapshot, observers) = {
            let mut inner = self.lock();
            if !apply(&mut inner.state) {
                debug!("Dropping progress update from a superseded batch");
                return;
            }
            (inner.state.clone(), inner.observers.clone())
        };
        // Observers run outside the lock so they may read `current()`.
        for observer in observers {
            observer(&snapshot);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ProgressHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("ProgressHub")
            .field("state", &inner.state)
            .field("observers", &inner.observers.len())
            .finish()
    }
}
