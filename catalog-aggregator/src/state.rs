use crate::merge::AggregatedSet;
use crate::types::{Item, PageQuery, SessionId, SourceId};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// What identifies a session: the selected sources and the search term.
/// Pages only grow a session, they never define one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionKey {
    pub sources: BTreeSet<SourceId>,
    pub search_term: String,
}

impl SessionKey {
    pub fn new(sources: &[SourceId], search_term: &str) -> Self {
        Self {
            sources: sources.iter().cloned().collect(),
            search_term: search_term.trim().to_string(),
        }
    }
}

/// Session-scoped aggregation state, owned by the aggregator.
#[derive(Debug, Default)]
pub struct SessionState {
    pub id: SessionId,
    pub key: SessionKey,
    /// Sources in the order the caller selected them.
    pub selection: Vec<SourceId>,
    /// Highest page merged into `set` during this session, 0 when none yet.
    pub last_page: u32,
    pub set: AggregatedSet,
}

impl SessionState {
    /// Does this request extend the current session rather than replace it?
    pub fn continues_with(&self, key: &SessionKey, query: &PageQuery) -> bool {
        self.id != SessionId::default() && &self.key == key && query.page > self.last_page
    }

    /// Supersede the current session. Any batch still in flight for the old
    /// id will be discarded when it settles.
    pub fn begin(&mut self, key: SessionKey, selection: Vec<SourceId>) -> SessionId {
        let previous = self.id;
        self.id = previous.next();
        self.key = key;
        self.selection = selection;
        self.last_page = 0;
        self.set.clear();
        info!("Session {} started (superseding {}), {} sources, search {:?}", self.id, previous, self.key.sources.len(), self.key.search_term);
        self.id
    }

    /// Record a settled batch. Returns `None` when the batch belongs to a
    /// session that has since been superseded.
    pub fn accept_batch(&mut self, batch_session: SessionId, page: u32, items: Vec<Item>) -> Option<usize> {
        if batch_session != self.id {
            debug!("Discarding batch from session {} (current is {})", batch_session, self.id);
            return None;
        }
        let appended = self.set.extend_unique(items);
        self.last_page = self.last_page.max(page);
        Some(appended)
    }
}
