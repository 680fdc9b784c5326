use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// ExchangeRateSet — One FX quote for the base asset
// ---------------------------------------------------------------------------

/// Exchange rates for the base asset, as fiat per one unit of base.
///
/// Only ever constructed from a successful fetch, so `rates` always covers
/// every configured currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateSet {
    /// Provider timestamp of the quote.
    pub as_of: DateTime<Utc>,
    pub base: String,
    pub rates: BTreeMap<String, Decimal>,
}

impl ExchangeRateSet {
    pub fn rate(&self, currency: &str) -> Option<Decimal> {
        self.rates.get(currency).copied()
    }
}
