use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use url::Url;

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for SourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    #[default]
    Online,
    Offline,
}

/// Consumer key/secret pair sent as basic auth to a store.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: SecretString,
}

impl Credentials {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: SecretString::from(consumer_secret.into()),
        }
    }
}

/// One upstream catalog backend.
#[derive(Clone, Debug)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    pub base_url: Url,
    pub credentials: Credentials,
    pub status: SourceStatus,
}

impl Source {
    pub fn is_online(&self) -> bool {
        self.status == SourceStatus::Online
    }
}

/// Identity of an item across all sources.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey(pub SourceId, pub u64);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

/// A product record as returned by a store, tagged with the source it came from.
///
/// `source_id` is not part of the store payload; the fetcher fills it in.
/// Fields the aggregator does not look at are kept verbatim in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    #[serde(default)]
    pub source_id: SourceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub regular_price: Option<String>,
    #[serde(default)]
    pub sale_price: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub stock_status: Option<String>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn new(source_id: impl Into<SourceId>, id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            source_id: source_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey(self.source_id.clone(), self.id)
    }
}

// Object style note:
// The registry is an external collaborator. The aggregator only ever reads the
// ordered source list and never mutates it, so implementations are free to
// reload from wherever they like between calls.

pub trait SourceRegistry: Send + Sync {
    fn list_sources(&self) -> anyhow::Result<Vec<Source>>;
}
