use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::{FloorwatchError, Result};

/// Body of the FX provider's `latest` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LatestRates {
    #[serde(default)]
    pub success: Option<bool>,
    /// Unix seconds.
    pub timestamp: i64,
    #[serde(default)]
    pub base: Option<String>,
    pub rates: HashMap<String, f64>,
}

impl LatestRates {
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| FloorwatchError::UpstreamParse(format!("exchange rates: {e}")))
    }
}

/// Source of exchange-rate quotes for the base asset.
pub trait FxRatesApi: Send + Sync {
    fn latest(&self, base: &str, currencies: &[String]) -> Result<LatestRates>;
}

/// fxratesapi.com `latest` over blocking HTTP.
pub struct HttpFxRates {
    base_url: String,
    api_key: String,
    client: Client,
}

impl HttpFxRates {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: super::build_client(timeout)?,
        })
    }
}

impl FxRatesApi for HttpFxRates {
    fn latest(&self, base: &str, currencies: &[String]) -> Result<LatestRates> {
        let currencies = currencies.join(",");
        // Errors carry the request URL, which includes the api key.
        let body = self
            .client
            .get(format!("{}/latest", self.base_url))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("base", base),
                ("currencies", currencies.as_str()),
                ("resolution", "1m"),
                ("amount", "1"),
                ("places", "6"),
                ("format", "json"),
            ])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(|e| e.without_url())?;
        LatestRates::from_json(&body)
    }
}
