use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// EntitySnapshot — Latest marketplace stats for one tracked collection
// ---------------------------------------------------------------------------

/// Floor-price snapshot of one tracked collection, in SOL.
///
/// Rebuilt wholesale on every refresh cycle. `fiat_prices` is derived from
/// the live exchange rates and is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySnapshot {
    pub symbol: String,
    /// Floor price in SOL, rounded down to 2 places.
    pub floor_price: Decimal,
    pub listed_count: u64,
    pub avg_price_24h: Decimal,
    pub volume_all: Decimal,
    /// Currency code -> `floor_price * rate`, unrounded.
    #[serde(default)]
    pub fiat_prices: BTreeMap<String, Decimal>,
}

// ---------------------------------------------------------------------------
// Collection — Output of one collector run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Collection {
    pub snapshots: BTreeMap<String, EntitySnapshot>,
    /// Sum of the unrounded floor prices, rounded once to 2 places.
    pub total_base: Decimal,
}
