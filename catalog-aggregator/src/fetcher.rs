use crate::traits::CatalogFetcher;
use crate::types::{AggregatorError, FetchConfig, Item, Result, Source};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, Response};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use url::Url;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// HTTP catalog fetcher for the stores' `GET {base}/products` endpoint.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    rate_limiter: Arc<RwLock<HashMap<String, Instant>>>,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(redirect)
            .build()?;

        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: FetchConfig) -> Self {
        Self {
            client,
            config,
            rate_limiter: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// `{base_url}/products?per_page=..&page=..[&search=..]`
    pub fn products_url(source: &Source, page: u32, page_size: u32, search_term: &str) -> Result<Url> {
        let mut url = source.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AggregatorError::Config(format!("source {} has a base URL that cannot hold a path: {}", source.id, source.base_url)))?
            .pop_if_empty()
            .push("products");

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("per_page", &page_size.to_string());
            query.append_pair("page", &page.to_string());
            let search_term = search_term.trim();
            if !search_term.is_empty() {
                query.append_pair("search", search_term);
            }
        }

        Ok(url)
    }

    async fn fetch_with_retries(&self, source: &Source, url: &Url) -> Result<String> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_millis(self.config.retry_delay_ms),
            initial_interval: Duration::from_millis(self.config.retry_delay_ms),
            max_interval: Duration::from_millis(self.config.retry_delay_ms * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_millis(self.config.retry_delay_ms * 60).max(Duration::from_secs(1))),
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            let outcome = match self.send(source, url).await {
                Ok(response) => self.read_body(source, response).await,
                Err(e) => Err(e),
            };

            let error = match outcome {
                Ok(body) => return Ok(body),
                Err(e) => e,
            };

            if !error.is_transient() || attempt >= self.config.max_retries {
                return Err(error);
            }

            match backoff.next_backoff() {
                Some(delay) => {
                    warn!("Attempt {} failed for {} ({}), retrying in {:?}", attempt + 1, source.id, error, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(error),
            }
        }
    }

    async fn send(&self, source: &Source, url: &Url) -> Result<Response> {
        self.apply_rate_limit(url).await;

        let credentials = &source.credentials;
        self.client
            .get(url.clone())
            .basic_auth(&credentials.consumer_key, Some(credentials.consumer_secret.expose_secret()))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AggregatorError::SourceUnreachable {
                source_id: source.id.clone(),
                message: e.to_string(),
            })
    }

    async fn read_body(&self, source: &Source, response: Response) -> Result<String> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let mut message: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            if message.is_empty() {
                message = status.canonical_reason().unwrap_or("Unknown").to_string();
            }
            return Err(AggregatorError::SourceRejected {
                source_id: source.id.clone(),
                status: status.as_u16(),
                message,
            });
        }

        response.text().await.map_err(|e| AggregatorError::SourceUnreachable {
            source_id: source.id.clone(),
            message: format!("failed reading body: {}", e),
        })
    }

    /// Decode a product list, tagging every record with the source id.
    /// Individual records that do not decode are skipped.
    pub fn decode_items(source: &Source, body: &str) -> Result<Vec<Item>> {
        let value: Value = serde_json::from_str(body).map_err(|e| AggregatorError::Decode {
            source_id: source.id.clone(),
            message: e.to_string(),
        })?;

        let records = match value {
            Value::Array(records) => records,
            other => {
                return Err(AggregatorError::Decode {
                    source_id: source.id.clone(),
                    message: format!("expected a list of products, got {}", json_kind(&other)),
                })
            }
        };

        let total = records.len();
        let mut items = Vec::with_capacity(total);
        for record in records {
            match serde_json::from_value::<Item>(record) {
                Ok(mut item) => {
                    item.source_id = source.id.clone();
                    items.push(item);
                }
                Err(e) => warn!("Skipping unreadable product from {}: {}", source.id, e),
            }
        }

        if items.len() < total {
            debug!("Decoded {}/{} products from {}", items.len(), total, source.id);
        }

        Ok(items)
    }

    async fn apply_rate_limit(&self, url: &Url) {
        if self.config.min_host_interval_ms == 0 {
            return;
        }

        let host = url.host_str().unwrap_or("").to_string();
        let min_interval = Duration::from_millis(self.config.min_host_interval_ms);

        // Reserve our slot under the lock, sleep without it.
        let wait = {
            let mut rate_limiter = self.rate_limiter.write().await;
            let now = Instant::now();
            let slot = match rate_limiter.get(&host) {
                Some(last_request) if *last_request + min_interval > now => *last_request + min_interval,
                _ => now,
            };
            rate_limiter.insert(host.clone(), slot);
            slot.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            debug!("Rate limiting {}: waiting {:?}", host, wait);
            tokio::time::sleep(wait).await;
        }
    }
}

#[async_trait]
impl CatalogFetcher for Fetcher {
    async fn fetch(&self, source: &Source, page: u32, page_size: u32, search_term: &str) -> Result<Vec<Item>> {
        let url = Self::products_url(source, page, page_size, search_term)?;
        debug!("Fetching catalog page {} from {} ({})", page, source.name, url);

        let body = match self.fetch_with_retries(source, &url).await {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to fetch catalog from {}: {}", source.id, e);
                return Err(e);
            }
        };

        let items = Self::decode_items(source, &body)?;
        info!("Fetched {} products from {} (page {})", items.len(), source.name, page);
        Ok(items)
    }

    fn fetcher_name(&self) -> String {
        "http".to_string()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
