use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;

use crate::error::{FloorwatchError, Result};

/// Raw collection stats as reported by the marketplace, in lamports.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    #[serde(default)]
    pub symbol: String,
    pub floor_price: u64,
    #[serde(default)]
    pub listed_count: u64,
    #[serde(default, rename = "avgPrice24hr")]
    pub avg_price_24h: Option<f64>,
    #[serde(default)]
    pub volume_all: Option<f64>,
}

impl CollectionStats {
    /// Parse a stats response body.
    pub fn from_json(symbol: &str, body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| {
            FloorwatchError::UpstreamParse(format!("stats for {symbol}: {e}"))
        })
    }
}

/// Source of per-collection marketplace statistics.
pub trait MarketplaceApi: Send + Sync {
    fn collection_stats(&self, symbol: &str) -> Result<CollectionStats>;
}

/// Magic Eden `v2/collections/{symbol}/stats` over blocking HTTP.
pub struct HttpMarketplace {
    base_url: Url,
    client: Client,
}

impl HttpMarketplace {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url).map_err(|e| {
            FloorwatchError::InvalidArgument(format!("bad marketplace URL {base_url:?}: {e}"))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(FloorwatchError::InvalidArgument(format!(
                "marketplace URL cannot take a path: {base_url:?}"
            )));
        }
        Ok(Self {
            base_url: parsed,
            client: super::build_client(timeout)?,
        })
    }

    /// The symbol is pushed as a single path segment, so `/` or `?` in it
    /// are percent-encoded rather than changing the route.
    fn stats_url(&self, symbol: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v2", "collections", symbol, "stats"]);
        }
        url
    }
}

impl MarketplaceApi for HttpMarketplace {
    fn collection_stats(&self, symbol: &str) -> Result<CollectionStats> {
        let body = self
            .client
            .get(self.stats_url(symbol))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()?
            .error_for_status()?
            .text()?;
        CollectionStats::from_json(symbol, &body)
    }
}
