use std::time::Duration;

use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::input::DateRange;

/// The two upstream endpoints, returning raw JSON bodies.
///
/// One call per user action: no retries, no caching.
pub trait SpaceApi: Send + Sync {
    /// `GET {images}/search?q=..&media_type=image`
    fn search_images(&self, query: &str) -> Result<Value>;

    /// `GET {neo}/feed?start_date=..&end_date=..&api_key=..`
    fn neo_feed(&self, range: &DateRange) -> Result<Value>;
}

pub struct HttpApi {
    client: reqwest::blocking::Client,
    images_base_url: String,
    neo_base_url: String,
    api_key: String,
}

impl HttpApi {
    pub fn new(cfg: &ApiConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(concat!("cosmos-browser/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::msg(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            images_base_url: cfg.images_base_url.clone(),
            neo_base_url: cfg.neo_base_url.clone(),
            api_key: cfg.api_key.clone(),
        })
    }

    pub fn search_url(&self, query: &str) -> Result<Url> {
        endpoint(
            &self.images_base_url,
            "search",
            &[("q", query), ("media_type", "image")],
        )
    }

    pub fn feed_url(&self, range: &DateRange) -> Result<Url> {
        endpoint(
            &self.neo_base_url,
            "feed",
            &[
                ("start_date", range.start_param().as_str()),
                ("end_date", range.end_param().as_str()),
                ("api_key", self.api_key.as_str()),
            ],
        )
    }

    fn get_json(&self, url: Url) -> Result<Value> {
        debug!(url = %redact_api_key(&url), "GET");
        let res = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::from(e).context("HTTP request failed"))?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::msg(format!("HTTP request failed with status {status}")));
        }
        let body = res
            .text()
            .map_err(|e| Error::from(e).context("failed to read response body"))?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl SpaceApi for HttpApi {
    fn search_images(&self, query: &str) -> Result<Value> {
        self.get_json(self.search_url(query)?)
    }

    fn neo_feed(&self, range: &DateRange) -> Result<Value> {
        self.get_json(self.feed_url(range)?)
    }
}

fn endpoint(base: &str, path: &str, params: &[(&str, &str)]) -> Result<Url> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path);
    Url::parse_with_params(&raw, params)
        .map_err(|e| Error::msg(format!("invalid endpoint URL '{raw}': {e}")))
}

/// Copy of `url` safe to log.
pub fn redact_api_key(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "api_key") {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "api_key" {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    let mut out = url.clone();
    out.query_pairs_mut().clear().extend_pairs(pairs);
    out.to_string()
}
