use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
// Use the interfaces crate for core types
pub use interfaces::defs::{Credentials, Item, ItemKey, ProductImage, Source, SourceId, SourceRegistry, SourceStatus};

use crate::merge::AggregatedSet;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Monotonically increasing session epoch. A batch whose epoch is behind the
/// aggregator's current one is stale and never merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    /// 1-based page number forwarded to every source.
    pub page: u32,
    pub search_term: String,
}

impl PageQuery {
    pub fn new(page: u32, search_term: impl Into<String>) -> Self {
        Self {
            page: page.max(1),
            search_term: search_term.into(),
        }
    }

    pub fn first(search_term: impl Into<String>) -> Self {
        Self::new(1, search_term)
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self::first("")
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub follow_redirects: bool,
    pub max_redirects: usize,
    /// Minimum spacing between two requests to the same host.
    pub min_host_interval_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Catalog-Aggregator/1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 2,
            retry_delay_ms: 500,
            follow_redirects: true,
            max_redirects: 5,
            min_host_interval_ms: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub page_size: u32,
    pub fetch: FetchConfig,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            fetch: FetchConfig::default(),
        }
    }
}

/// Outcome of one source within a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    pub source_id: SourceId,
    pub source_name: String,
    pub items: usize,
    pub error: Option<String>,
    pub response_time_ms: u64,
}

impl SourceReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// What `fetch_page` hands back to the caller.
#[derive(Debug, Clone)]
pub struct PageResult {
    pub session: SessionId,
    pub page: u32,
    /// Snapshot of the aggregated set once this batch has been merged (or
    /// discarded, when `stale`).
    pub set: AggregatedSet,
    /// Items returned by all sources in this batch, before dedup.
    pub received: usize,
    /// Items this batch actually added to the set.
    pub appended: usize,
    /// Approximation: true when every dispatched source returned a full page.
    /// Can be wrong both ways since the stores' own pagination metadata is
    /// never consulted.
    pub has_more: bool,
    pub stale: bool,
    pub reports: Vec<SourceReport>,
    pub fetched_at: DateTime<Utc>,
}

impl PageResult {
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.reports.iter().filter(|report| !report.succeeded())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Source {source_id} unreachable: {message}")]
    SourceUnreachable { source_id: SourceId, message: String },

    #[error("Source {source_id} rejected the request with HTTP {status}: {message}")]
    SourceRejected {
        source_id: SourceId,
        status: u16,
        message: String,
    },

    #[error("Source {source_id} returned an unreadable catalog: {message}")]
    Decode { source_id: SourceId, message: String },

    #[error("Unknown source: {id}")]
    UnknownSource { id: SourceId },

    #[error("Source registry error: {0}")]
    Registry(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("General error: {0}")]
    General(String),
}

impl AggregatorError {
    /// Whether a retry of the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AggregatorError::SourceUnreachable { .. } => true,
            AggregatorError::SourceRejected { status, .. } => *status == 429 || *status >= 500,
            AggregatorError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
