//! HTTP client for storefront and badge-rule requests using wreq for TLS fingerprint emulation.

use crate::config::Config;
use crate::error::BadgeError;
use crate::rules::{parse_rules, BadgeRule};
use crate::storefront::models::Product;
use crate::storefront::page;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info, warn};
use wreq::Client;
use wreq_util::Emulation;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_JSON: &str = "application/json, text/javascript, */*; q=0.01";

/// Everything a scan needs from the network - enables mocking for tests.
#[async_trait]
pub trait StorefrontSource: Send + Sync {
    /// Fetches the badge rules configured for the shop.
    async fn rules(&self) -> Result<Vec<BadgeRule>, BadgeError>;

    /// Fetches canonical product data by handle.
    async fn product(&self, handle: &str) -> Result<Product, BadgeError>;

    /// Fetches a page's HTML.
    async fn page(&self, url: &str) -> Result<String, BadgeError>;
}

/// Storefront HTTP client with browser impersonation and request pacing.
pub struct StorefrontClient {
    client: Client,
    store_url: String,
    rule_endpoint: Option<String>,
    shop: String,
    delay_ms: u64,
    delay_jitter_ms: u64,
}

impl StorefrontClient {
    /// Creates a client for the store at `store_url` (scheme and host, e.g. `https://shop.test`).
    pub fn new(config: &Config, store_url: &str) -> Result<Self, BadgeError> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            builder = builder.proxy(wreq::Proxy::all(proxy_url)?);
        }

        let client = builder.build()?;
        let store_url = store_url.trim_end_matches('/').to_string();
        let shop = config
            .shop
            .clone()
            .or_else(|| page::host(&store_url).map(String::from))
            .unwrap_or_default();

        Ok(Self {
            client,
            store_url,
            rule_endpoint: config.rule_endpoint.clone(),
            shop,
            delay_ms: config.delay_ms,
            delay_jitter_ms: config.delay_jitter_ms,
        })
    }

    pub fn store_url(&self) -> &str {
        &self.store_url
    }

    /// Shop domain sent to the rule endpoint.
    pub fn shop(&self) -> &str {
        &self.shop
    }

    fn rules_url(&self) -> Option<String> {
        self.rule_endpoint.as_ref().map(|endpoint| {
            let separator = if endpoint.contains('?') { '&' } else { '?' };
            format!("{}{}shop={}", endpoint, separator, urlencoding::encode(&self.shop))
        })
    }

    fn product_url(&self, handle: &str) -> String {
        format!("{}/products/{}.js", self.store_url, urlencoding::encode(handle))
    }

    /// Performs a GET request and returns the body of a 2xx response.
    async fn get(&self, url: &str, accept: &str) -> Result<String, BadgeError> {
        self.delay().await;

        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .emulation(Emulation::Chrome131)
            .header("Accept", accept)
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .send()
            .await?;

        let status = response.status();
        debug!("Response status: {}", status);

        if status == 429 || status == 503 {
            warn!("Rate limited ({}). Consider increasing --delay.", status.as_u16());
        }

        if !status.is_success() {
            return Err(BadgeError::Status { status: status.as_u16(), url: url.to_string() });
        }

        Ok(response.text().await?)
    }

    /// Adds a random delay between requests.
    async fn delay(&self) {
        if self.delay_ms == 0 {
            return;
        }

        let jitter = if self.delay_jitter_ms > 0 {
            rand::rng().random_range(0..=self.delay_jitter_ms)
        } else {
            0
        };

        let total_delay = self.delay_ms + jitter;
        debug!("Delaying {}ms", total_delay);
        tokio::time::sleep(Duration::from_millis(total_delay)).await;
    }
}

#[async_trait]
impl StorefrontSource for StorefrontClient {
    async fn rules(&self) -> Result<Vec<BadgeRule>, BadgeError> {
        let url = self
            .rules_url()
            .ok_or_else(|| BadgeError::MissingTarget { what: "rule endpoint".to_string() })?;

        info!("Fetching badge rules for {}", self.shop);
        let body = self.get(&url, ACCEPT_JSON).await?;
        parse_rules(&body)
    }

    async fn product(&self, handle: &str) -> Result<Product, BadgeError> {
        let url = self.product_url(handle);

        debug!("Fetching product: {}", handle);
        let body = self.get(&url, ACCEPT_JSON).await?;
        serde_json::from_str(&body).map_err(|e| BadgeError::json(format!("product {}", handle), e))
    }

    async fn page(&self, url: &str) -> Result<String, BadgeError> {
        info!("Fetching page: {}", url);
        self.get(url, ACCEPT_HTML).await
    }
}
