use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// HistoryRow — One persisted day-bucketed value
// ---------------------------------------------------------------------------

/// A stored row from either history table, as written (never fee-adjusted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub id: i64,
    /// Collection symbol or currency code.
    pub key: String,
    /// UTC calendar day, `YYYY-MM-DD`.
    pub day: String,
    /// Time of the last write to this row.
    pub recorded_at: String,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// PriceHistory — Chart payload pivoted by currency
// ---------------------------------------------------------------------------

/// Day series with one value sequence per currency.
///
/// `currencies[code][i]` belongs to `dates[i]`. A day whose exchange rate is
/// missing carries `null` for that currency.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceHistory {
    pub dates: Vec<String>,
    pub currencies: BTreeMap<String, Vec<Option<f64>>>,
}

impl PriceHistory {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Value for `currency` on `day`, if both are present.
    pub fn value_on(&self, day: &str, currency: &str) -> Option<f64> {
        let idx = self.dates.iter().position(|d| d == day)?;
        self.currencies.get(currency)?.get(idx).copied().flatten()
    }
}
