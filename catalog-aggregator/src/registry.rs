use crate::types::{AggregatorError, Credentials, Result, Source, SourceId, SourceStatus};
use interfaces::StaticRegistry;
use serde::Deserialize;
use std::path::Path;
use tracing::info;
use url::Url;

/// On-disk shape of a sources file:
///
/// ```toml
/// [[sources]]
/// id = "north"
/// name = "North Store"
/// base_url = "https://north.example/wp-json/wc/v3"
/// consumer_key = "ck_..."
/// consumer_secret = "cs_..."
/// status = "online"
/// ```
#[derive(Debug, Deserialize)]
pub struct SourcesFile {
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SourceEntry {
    pub id: String,
    pub name: Option<String>,
    pub base_url: String,
    #[serde(default)]
    pub consumer_key: String,
    #[serde(default)]
    pub consumer_secret: String,
    #[serde(default)]
    pub status: SourceStatus,
}

impl SourceEntry {
    pub fn into_source(self) -> Result<Source> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err(AggregatorError::Config("source with an empty id".to_string()));
        }

        let base_url = Url::parse(self.base_url.trim())
            .map_err(|e| AggregatorError::Config(format!("source {}: invalid base_url {:?}: {}", id, self.base_url, e)))?;
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            return Err(AggregatorError::Config(format!(
                "source {}: base_url must be http or https, got {}",
                id,
                base_url.scheme()
            )));
        }

        Ok(Source {
            name: self.name.filter(|name| !name.trim().is_empty()).unwrap_or_else(|| id.clone()),
            id: SourceId::new(id),
            base_url,
            credentials: Credentials::new(self.consumer_key, self.consumer_secret),
            status: self.status,
        })
    }
}

pub fn parse_sources(content: &str) -> Result<StaticRegistry> {
    let file: SourcesFile = toml::from_str(content).map_err(|e| AggregatorError::Config(e.to_string()))?;

    let mut registry = StaticRegistry::default();
    for entry in file.sources {
        let source = entry.into_source()?;
        registry.add(source).map_err(|e| AggregatorError::Config(e.to_string()))?;
    }
    Ok(registry)
}

pub fn load_sources(path: impl AsRef<Path>) -> Result<StaticRegistry> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let registry = parse_sources(&content)?;
    info!("Loaded {} sources from {}", registry.len(), path.display());
    Ok(registry)
}
