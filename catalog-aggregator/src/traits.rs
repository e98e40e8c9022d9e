use crate::types::{Item, Result, Source};
use async_trait::async_trait;

/// Trait for reading one page of a source's catalog.
#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    /// Fetch one page of items from `source`.
    ///
    /// Every returned item carries `source.id` as its `source_id`. Transport
    /// failures come back as `SourceUnreachable`, non-2xx responses as
    /// `SourceRejected`.
    async fn fetch(&self, source: &Source, page: u32, page_size: u32, search_term: &str) -> Result<Vec<Item>>;

    /// Human-readable name used in logs.
    fn fetcher_name(&self) -> String {
        "catalog".to_string()
    }
}
