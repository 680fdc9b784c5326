//! The published aggregate state and its fee-adjusted read view.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{EntitySnapshot, ExchangeRateSet};
use crate::units::apply_fee;

/// Decimal places of every fee-adjusted display value.
pub const DISPLAY_PLACES: u32 = 3;

/// Everything the dashboard shows, as of the last successful cycle.
///
/// Built off to the side by the refresh cycle and published whole; readers
/// never see entities from one cycle mixed with rates from another.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateState {
    /// Sum of all floor prices, in the base asset.
    pub total_base: Decimal,
    /// Currency -> `round(rate * total_base, 0)`, before the fee.
    pub fiat_totals: BTreeMap<String, Decimal>,
    pub entities: BTreeMap<String, EntitySnapshot>,
    /// Last successfully fetched rate set.
    pub rates: Option<ExchangeRateSet>,
    pub rates_updated_at: Option<DateTime<Utc>>,
}

impl AggregateState {
    /// Fee-adjusted view for presentation. `base` labels the base-asset
    /// entry in `prices`.
    pub fn dashboard(&self, base: &str, fee_multiplier: Decimal) -> DashboardView {
        let mut prices = BTreeMap::new();
        prices.insert(
            base.to_string(),
            apply_fee(self.total_base, fee_multiplier, DISPLAY_PLACES),
        );
        for (currency, total) in &self.fiat_totals {
            prices.insert(
                currency.clone(),
                apply_fee(*total, fee_multiplier, DISPLAY_PLACES),
            );
        }

        let entities = self
            .entities
            .iter()
            .map(|(symbol, snapshot)| {
                let view = EntityView {
                    symbol: snapshot.symbol.clone(),
                    floor_price: apply_fee(snapshot.floor_price, fee_multiplier, DISPLAY_PLACES),
                    listed_count: snapshot.listed_count,
                    avg_price_24h: snapshot.avg_price_24h,
                    volume_all: snapshot.volume_all,
                    fiat_prices: snapshot
                        .fiat_prices
                        .iter()
                        .map(|(c, v)| (c.clone(), apply_fee(*v, fee_multiplier, DISPLAY_PLACES)))
                        .collect(),
                };
                (symbol.clone(), view)
            })
            .collect();

        DashboardView {
            entities,
            prices,
            rates_updated_at: self.rates_updated_at.map(|at| at.to_rfc2822()),
        }
    }
}

/// One collection as shown to users, fee included.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityView {
    pub symbol: String,
    pub floor_price: Decimal,
    pub listed_count: u64,
    pub avg_price_24h: Decimal,
    pub volume_all: Decimal,
    pub fiat_prices: BTreeMap<String, Decimal>,
}

/// Current-state payload for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub entities: BTreeMap<String, EntityView>,
    /// Base asset and each currency -> fee-adjusted total.
    pub prices: BTreeMap<String, Decimal>,
    pub rates_updated_at: Option<String>,
}

/// Single-writer, many-reader handle to the current [`AggregateState`].
///
/// `publish` swaps in a complete new value; `snapshot` hands out the `Arc`
/// current at that moment, which stays valid after later publishes.
#[derive(Clone, Debug, Default)]
pub struct StateHandle {
    current: Arc<RwLock<Arc<AggregateState>>>,
}

impl StateHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<AggregateState> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            // The lock only guards a pointer swap, so a poisoned value is
            // still a complete state.
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn publish(&self, state: AggregateState) {
        let next = Arc::new(state);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn entity(symbol: &str, floor: &str) -> EntitySnapshot {
        EntitySnapshot {
            symbol: symbol.into(),
            floor_price: dec(floor),
            listed_count: 3,
            avg_price_24h: Decimal::ZERO,
            volume_all: Decimal::ZERO,
            fiat_prices: BTreeMap::from([("USD".to_string(), dec(floor) * dec("150"))]),
        }
    }

    #[test]
    fn dashboard_applies_fee_on_read() {
        let state = AggregateState {
            total_base: dec("2.00"),
            fiat_totals: BTreeMap::from([("USD".to_string(), dec("300"))]),
            entities: BTreeMap::from([
                ("a".to_string(), entity("a", "1.20")),
                ("b".to_string(), entity("b", "0.80")),
            ]),
            rates: None,
            rates_updated_at: None,
        };
        let view = state.dashboard("SOL", dec("1.025"));
        assert_eq!(view.prices["SOL"], dec("2.05"));
        assert_eq!(view.prices["USD"], dec("307.5"));
        assert_eq!(view.entities["a"].floor_price, dec("1.23"));
        assert_eq!(view.entities["b"].fiat_prices["USD"], dec("123"));
        // The stored state is untouched.
        assert_eq!(state.total_base, dec("2.00"));
        assert_eq!(state.entities["a"].floor_price, dec("1.20"));
    }

    #[test]
    fn publish_replaces_whole_state() {
        let handle = StateHandle::new();
        let before = handle.snapshot();
        assert!(before.entities.is_empty());

        handle.publish(AggregateState {
            total_base: dec("1.5"),
            ..Default::default()
        });

        assert_eq!(handle.snapshot().total_base, dec("1.5"));
        // Earlier readers keep the value they were handed.
        assert_eq!(before.total_base, Decimal::ZERO);
    }

    #[test]
    fn rates_timestamp_renders_as_rfc2822() {
        let at = DateTime::from_timestamp(1_717_200_000, 0).unwrap();
        let state = AggregateState {
            rates_updated_at: Some(at),
            ..Default::default()
        };
        let view = state.dashboard("SOL", dec("1"));
        let rendered = view.rates_updated_at.unwrap();
        assert!(rendered.starts_with("Sat, "), "{rendered}");
        assert!(rendered.contains("Jun 2024 00:00:00"), "{rendered}");
    }
}
