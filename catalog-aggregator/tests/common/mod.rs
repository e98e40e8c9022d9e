#![allow(dead_code)]

// Shared fixtures for the catalog aggregator tests

use async_trait::async_trait;
use catalog_aggregator::{
    AggregatorError, CatalogFetcher, Credentials, Item, Result, Source, SourceId, SourceStatus, StaticRegistry,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};
use tokio::sync::Notify;
use url::Url;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn source(id: &str, name: &str) -> Source {
    source_at(id, name, "https://stores.example.test/wp-json/wc/v3")
}

pub fn source_at(id: &str, name: &str, base_url: &str) -> Source {
    Source {
        id: SourceId::new(id),
        name: name.to_string(),
        base_url: Url::parse(base_url).expect("valid test url"),
        credentials: Credentials::new(format!("ck_{id}"), format!("cs_{id}")),
        status: SourceStatus::Online,
    }
}

pub fn offline(mut source: Source) -> Source {
    source.status = SourceStatus::Offline;
    source
}

pub fn registry(sources: Vec<Source>) -> Arc<StaticRegistry> {
    Arc::new(StaticRegistry::new(sources).expect("unique test sources"))
}

pub fn items(source_id: &str, ids: impl IntoIterator<Item = u64>) -> Vec<Item> {
    ids.into_iter()
        .map(|id| Item::new(source_id, id, format!("{source_id} product {id}")))
        .collect()
}

pub fn ids(list: &[&str]) -> Vec<SourceId> {
    list.iter().map(|id| SourceId::new(*id)).collect()
}

/// How the mock answers for one source.
#[derive(Clone)]
pub enum Behavior {
    /// Page n answers with entry n-1, pages past the end are empty.
    Pages(Vec<Vec<Item>>),
    /// Every page fails with this HTTP status.
    Fail(u16),
    /// Signals `started`, then holds the response until `release` fires.
    Gated {
        items: Vec<Item>,
        started: Arc<Notify>,
        release: Arc<Notify>,
    },
    /// Like `Pages`, but only `page` waits for `release`.
    GatedPage {
        page: u32,
        pages: Vec<Vec<Item>>,
        started: Arc<Notify>,
        release: Arc<Notify>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub source_id: SourceId,
    pub page: u32,
    pub page_size: u32,
    pub search_term: String,
}

#[derive(Default)]
pub struct MockFetcher {
    behaviors: Mutex<HashMap<SourceId, Behavior>>,
    calls: Mutex<Vec<Call>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, source_id: &str, behavior: Behavior) -> Self {
        self.behaviors
            .lock()
            .unwrap()
            .insert(SourceId::new(source_id), behavior);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogFetcher for MockFetcher {
    async fn fetch(&self, source: &Source, page: u32, page_size: u32, search_term: &str) -> Result<Vec<Item>> {
        self.calls.lock().unwrap().push(Call {
            source_id: source.id.clone(),
            page,
            page_size,
            search_term: search_term.to_string(),
        });

        let behavior = self.behaviors.lock().unwrap().get(&source.id).cloned();
        match behavior {
            None => Ok(Vec::new()),
            Some(Behavior::Pages(pages)) => Ok(pages
                .get(page as usize - 1)
                .cloned()
                .unwrap_or_default()),
            Some(Behavior::Fail(status)) => Err(AggregatorError::SourceRejected {
                source_id: source.id.clone(),
                status,
                message: "mock failure".to_string(),
            }),
            Some(Behavior::Gated { items, started, release }) => {
                started.notify_one();
                release.notified().await;
                Ok(items)
            }
            Some(Behavior::GatedPage {
                page: gated,
                pages,
                started,
                release,
            }) => {
                if page == gated {
                    started.notify_one();
                    release.notified().await;
                }
                Ok(pages.get(page as usize - 1).cloned().unwrap_or_default())
            }
        }
    }

    fn fetcher_name(&self) -> String {
        "mock".to_string()
    }
}
