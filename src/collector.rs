//! Collects floor-price stats for the tracked collections.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::LAMPORTS_PER_SOL;
use crate::error::Result;
use crate::models::{Collection, EntitySnapshot};
use crate::units::{decimal_from_f64, round_down, round_nearest, to_base_units};
use crate::upstream::{CollectionStats, MarketplaceApi};

/// Decimal places kept on floor prices and the SOL total.
pub const FLOOR_PRICE_PLACES: u32 = 2;

/// Fetches stats for a fixed list of collections and converts them to SOL.
pub struct Collector {
    api: Arc<dyn MarketplaceApi>,
    symbols: Vec<String>,
}

impl Collector {
    pub fn new(api: Arc<dyn MarketplaceApi>, symbols: Vec<String>) -> Self {
        Self { api, symbols }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Fetch every collection once.
    ///
    /// Fails fast: the first fetch or parse error aborts the run and nothing
    /// partial is returned, so the caller keeps its previous snapshot.
    pub fn collect(&self) -> Result<Collection> {
        let mut snapshots = BTreeMap::new();
        let mut unrounded_total = Decimal::ZERO;

        for symbol in &self.symbols {
            let stats = self.api.collection_stats(symbol)?;
            let exact_floor = to_base_units(stats.floor_price);
            unrounded_total += exact_floor;

            let snapshot = snapshot_from_stats(symbol, &stats)?;
            debug!(symbol = %symbol, floor_price = %snapshot.floor_price, "collected stats");
            snapshots.insert(symbol.clone(), snapshot);
        }

        Ok(Collection {
            snapshots,
            total_base: round_nearest(unrounded_total, FLOOR_PRICE_PLACES),
        })
    }
}

/// Convert raw lamport stats into an [`EntitySnapshot`] keyed by the
/// requested symbol.
pub fn snapshot_from_stats(symbol: &str, stats: &CollectionStats) -> Result<EntitySnapshot> {
    let lamports = Decimal::from(LAMPORTS_PER_SOL);
    let avg_price_24h = decimal_from_f64(stats.avg_price_24h.unwrap_or(0.0))? / lamports;
    let volume_all = decimal_from_f64(stats.volume_all.unwrap_or(0.0))? / lamports;

    Ok(EntitySnapshot {
        symbol: symbol.to_string(),
        floor_price: round_down(to_base_units(stats.floor_price), FLOOR_PRICE_PLACES),
        listed_count: stats.listed_count,
        avg_price_24h,
        volume_all,
        fiat_prices: BTreeMap::new(),
    })
}
