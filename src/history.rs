//! History queries against the day-pivoted DuckDB views.
//!
//! Stored values are raw observations. The marketplace fee is applied here,
//! on the way out, so changing the fee never rewrites history.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::{FloorwatchError, Result};
use crate::models::PriceHistory;
use crate::state::DISPLAY_PLACES;
use crate::store::{SnapshotStore, COMBINED_VIEW, ENTITY_VIEW};
use crate::units::{apply_fee, decimal_from_f64, decimal_to_f64};

/// Read-only query interface over a [`SnapshotStore`].
pub struct HistoryQuery<'a> {
    store: &'a SnapshotStore,
    fee_multiplier: Decimal,
}

impl<'a> HistoryQuery<'a> {
    pub fn new(store: &'a SnapshotStore, fee_multiplier: Decimal) -> Self {
        Self {
            store,
            fee_multiplier,
        }
    }

    /// Day series for one collection, in the base asset and every currency.
    ///
    /// Ascending by day. Days without a refresh are absent, not zero-filled.
    pub fn per_entity(&self, symbol: &str) -> Result<PriceHistory> {
        let sql = format!(
            "SELECT strftime(day, '%Y-%m-%d') AS day, {} FROM {ENTITY_VIEW} \
             WHERE symbol = ? ORDER BY {ENTITY_VIEW}.day ASC",
            self.column_list()
        );
        let rows = self.store.execute(&sql, &[symbol.to_string()])?;
        self.pivot(rows)
    }

    /// Day series for the sum of all collections.
    pub fn combined(&self) -> Result<PriceHistory> {
        let sql = format!(
            "SELECT strftime(day, '%Y-%m-%d') AS day, {} FROM {COMBINED_VIEW} \
             ORDER BY {COMBINED_VIEW}.day ASC",
            self.column_list()
        );
        let rows = self.store.execute(&sql, &[])?;
        self.pivot(rows)
    }

    /// Per-collection series for every collection with stored history.
    pub fn all_entities(&self) -> Result<BTreeMap<String, PriceHistory>> {
        let symbols = self.store.execute(
            &format!("SELECT DISTINCT symbol FROM {ENTITY_VIEW} ORDER BY symbol"),
            &[],
        )?;
        let mut out = BTreeMap::new();
        for row in symbols {
            if let Some(symbol) = row.get("symbol").and_then(|v| v.as_str()) {
                out.insert(symbol.to_string(), self.per_entity(symbol)?);
            }
        }
        Ok(out)
    }

    /// [`per_entity`](Self::per_entity) serialized as chart JSON.
    pub fn per_entity_json(&self, symbol: &str) -> Result<String> {
        Ok(serde_json::to_string(&self.per_entity(symbol)?)?)
    }

    /// [`combined`](Self::combined) serialized as chart JSON.
    pub fn combined_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.combined()?)?)
    }

    fn column_list(&self) -> String {
        self.store
            .value_columns()
            .iter()
            .map(|code| format!("\"{code}\""))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn pivot(&self, rows: Vec<HashMap<String, Value>>) -> Result<PriceHistory> {
        let columns = self.store.value_columns();
        let mut history = PriceHistory {
            dates: Vec::with_capacity(rows.len()),
            currencies: columns
                .iter()
                .map(|c| (c.clone(), Vec::with_capacity(rows.len())))
                .collect(),
        };

        for row in &rows {
            let day = match row.get("day") {
                Some(Value::String(day)) => day.clone(),
                other => {
                    return Err(FloorwatchError::InvalidArgument(format!(
                        "history row has no day: {other:?}"
                    )))
                }
            };
            history.dates.push(day);
            for code in &columns {
                let value = match row.get(code).and_then(|v| v.as_f64()) {
                    Some(raw) => Some(self.adjust(raw)?),
                    None => None,
                };
                if let Some(series) = history.currencies.get_mut(code) {
                    series.push(value);
                }
            }
        }

        Ok(history)
    }

    fn adjust(&self, raw: f64) -> Result<f64> {
        let value = decimal_from_f64(raw)?;
        decimal_to_f64(apply_fee(value, self.fee_multiplier, DISPLAY_PLACES))
    }
}
