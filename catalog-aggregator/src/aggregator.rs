use crate::fetcher::Fetcher;
use crate::merge::AggregatedSet;
use crate::progress::{ProgressHub, ProgressReceiver, ProgressState};
use crate::state::{SessionKey, SessionState};
use crate::traits::CatalogFetcher;
use crate::types::{
    AggregatorConfig, AggregatorError, Item, PageQuery, PageResult, Result, SessionId, Source, SourceId, SourceRegistry,
    SourceReport,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Fans a page request out to every selected source and merges the answers
/// into one deduplicated, incrementally growing set.
pub struct CatalogAggregator {
    registry: Arc<dyn SourceRegistry>,
    fetcher: Arc<dyn CatalogFetcher>,
    page_size: u32,
    state: Arc<RwLock<SessionState>>,
    progress: ProgressHub,
}

impl CatalogAggregator {
    pub fn new(registry: Arc<dyn SourceRegistry>, fetcher: Arc<dyn CatalogFetcher>, page_size: u32) -> Self {
        debug!("Catalog aggregator using the {} fetcher, page size {}", fetcher.fetcher_name(), page_size);
        Self {
            registry,
            fetcher,
            page_size: page_size.max(1),
            state: Arc::new(RwLock::new(SessionState::default())),
            progress: ProgressHub::new(),
        }
    }

    /// Aggregator backed by the HTTP fetcher.
    pub fn with_config(registry: Arc<dyn SourceRegistry>, config: AggregatorConfig) -> Result<Self> {
        let fetcher = Fetcher::new(config.fetch)?;
        Ok(Self::new(registry, Arc::new(fetcher), config.page_size))
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn on_progress<F>(&self, callback: F)
    where
        F: Fn(&ProgressState) + Send + Sync + 'static,
    {
        self.progress.on_progress(callback);
    }

    pub fn subscribe_progress(&self) -> ProgressReceiver {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> ProgressState {
        self.progress.current()
    }

    pub async fn current_session(&self) -> SessionId {
        self.state.read().await.id
    }

    pub async fn snapshot(&self) -> AggregatedSet {
        self.state.read().await.set.clone()
    }

    /// Drop everything and start an empty session. Batches still in flight
    /// will be discarded.
    pub async fn reset(&self) -> SessionId {
        let mut state = self.state.write().await;
        let session = state.begin(SessionKey::default(), Vec::new());
        self.progress.reset(session, 0);
        session
    }

    /// Fetch `query.page` from every source in `sources` and merge the results.
    ///
    /// Unchanged sources and search term with an advancing page grow the current
    /// session, anything else starts a fresh one. Per-source failures only
    /// shrink the result; unknown source ids and registry failures are errors.
    pub async fn fetch_page(&self, sources: &[SourceId], query: PageQuery) -> Result<PageResult> {
        let selection = dedup_selection(sources);
        let dispatched = self.resolve_sources(&selection)?;

        // Progress is reset under the state lock so batches go live in session order.
        let (session, batch) = {
            let key = SessionKey::new(&selection, &query.search_term);
            let mut state = self.state.write().await;
            let session = if state.continues_with(&key, &query) {
                debug!("Continuing session {} with page {}", state.id, query.page);
                state.id
            } else {
                state.begin(key, selection.clone())
            };
            (session, self.progress.reset(session, dispatched.len()))
        };

        if dispatched.is_empty() {
            info!("No sources to query for session {}, result is empty", session);
            return Ok(self.finish(session, query.page, Vec::new(), Vec::new(), false).await);
        }

        info!("Session {}: fetching page {} from {} sources", session, query.page, dispatched.len());

        let page = query.page;
        let page_size = self.page_size;
        let search_term = query.search_term.trim();

        let futures: Vec<_> = dispatched
            .iter()
            .enumerate()
            .map(|(index, source)| {
                let fetcher = Arc::clone(&self.fetcher);
                let progress = self.progress.clone();
                async move {
                    let ordinal = index + 1;
                    progress.source_started(batch, ordinal, &source.name);
                    let start = Instant::now();
                    let outcome = fetcher.fetch(source, page, page_size, search_term).await;
                    progress.source_settled(batch, ordinal, &source.name);
                    (source, outcome, start.elapsed())
                }
            })
            .collect();

        // All-settle join: every source gets to finish, failures included.
        let settled = futures::future::join_all(futures).await;

        let mut items = Vec::new();
        let mut reports = Vec::with_capacity(settled.len());
        for (source, outcome, elapsed) in settled {
            match outcome {
                Ok(fetched) => {
                    reports.push(report(source, fetched.len(), None, elapsed));
                    items.extend(fetched.into_iter().map(|mut item: Item| {
                        item.source_id = source.id.clone();
                        item
                    }));
                }
                Err(e) => {
                    warn!("Source {} contributed nothing to session {}: {}", source.id, session, e);
                    reports.push(report(source, 0, Some(e.to_string()), elapsed));
                }
            }
        }

        let has_more = estimate_has_more(selection.len(), items.len(), page_size);
        Ok(self.finish(session, page, items, reports, has_more).await)
    }

    /// Fetch the page after the last one merged into the current session.
    pub async fn load_more(&self) -> Result<PageResult> {
        let (selection, query) = {
            let state = self.state.read().await;
            if state.id == SessionId::default() {
                return Err(AggregatorError::General("no session to continue".to_string()));
            }
            (state.selection.clone(), PageQuery::new(state.last_page + 1, state.key.search_term.clone()))
        };
        self.fetch_page(&selection, query).await
    }

    fn resolve_sources(&self, selection: &[SourceId]) -> Result<Vec<Source>> {
        if selection.is_empty() {
            return Ok(Vec::new());
        }

        let known = self
            .registry
            .list_sources()
            .map_err(|e| AggregatorError::Registry(e.to_string()))?;

        let mut dispatched = Vec::with_capacity(selection.len());
        for id in selection {
            let source = known
                .iter()
                .find(|source| &source.id == id)
                .ok_or_else(|| AggregatorError::UnknownSource { id: id.clone() })?;

            if !source.is_online() {
                info!("Skipping offline source {} ({})", source.id, source.name);
                continue;
            }
            dispatched.push(source.clone());
        }
        Ok(dispatched)
    }

    async fn finish(
        &self,
        session: SessionId,
        page: u32,
        items: Vec<Item>,
        reports: Vec<SourceReport>,
        has_more: bool,
    ) -> PageResult {
        let received = items.len();
        let (appended, stale, set) = {
            let mut state = self.state.write().await;
            let accepted = state.accept_batch(session, page, items);
            (accepted.unwrap_or(0), accepted.is_none(), state.set.clone())
        };

        if stale {
            warn!("Discarded stale batch for page {} of session {}", page, session);
        } else {
            info!(
                "Session {} page {}: received {}, appended {}, total {}, has_more {}",
                session,
                page,
                received,
                appended,
                set.len(),
                has_more
            );
        }

        PageResult {
            session,
            page,
            set,
            received,
            appended,
            has_more,
            stale,
            reports,
            fetched_at: Utc::now(),
        }
    }
}

/// Heuristic only: a batch that filled a page for every selected source may
/// have more behind it. Misses uneven distributions and exact multiples alike,
/// and an offline or failing source in the selection makes it report false.
pub fn estimate_has_more(selected_sources: usize, received: usize, page_size: u32) -> bool {
    selected_sources > 0 && received as u64 == selected_sources as u64 * u64::from(page_size)
}

fn dedup_selection(sources: &[SourceId]) -> Vec<SourceId> {
    let mut selection: Vec<SourceId> = Vec::with_capacity(sources.len());
    for id in sources {
        if !selection.contains(id) {
            selection.push(id.clone());
        }
    }
    selection
}

fn report(source: &Source, items: usize, error: Option<String>, elapsed: Duration) -> SourceReport {
    SourceReport {
        source_id: source.id.clone(),
        source_name: source.name.clone(),
        items,
        error,
        response_time_ms: elapsed.as_millis() as u64,
    }
}
