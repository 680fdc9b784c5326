//! DuckDB-backed snapshot store with day-bucketed upserts and pivot views.
//!
//! Two tables hold the history, one row per key per UTC day:
//! - `entity_floor_history`: collection floor price in the base asset
//! - `exchange_rate_history`: base-asset exchange rate per currency
//!
//! Two views pivot them by day across currencies for the history queries.
//! The view columns are generated from the configured asset and currency
//! codes, so adding a currency only needs a reopen.

use crate::config;
use crate::error::{FloorwatchError, Result};
use crate::models::HistoryRow;
use chrono::{DateTime, NaiveDate, Utc};
use duckdb::{types::ValueRef, Connection as DuckDbConnection};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub const ENTITY_TABLE: &str = "entity_floor_history";
pub const RATE_TABLE: &str = "exchange_rate_history";
pub const ENTITY_VIEW: &str = "v_entity_prices_per_day";
pub const COMBINED_VIEW: &str = "v_combined_prices_per_day";

const SCHEMA_SQL: &str = r#"
CREATE SEQUENCE IF NOT EXISTS entity_floor_history_id_seq START 1;
CREATE SEQUENCE IF NOT EXISTS exchange_rate_history_id_seq START 1;

CREATE TABLE IF NOT EXISTS entity_floor_history (
    id BIGINT NOT NULL DEFAULT nextval('entity_floor_history_id_seq'),
    symbol VARCHAR NOT NULL,
    day DATE NOT NULL,
    recorded_at TIMESTAMP NOT NULL,
    floor_price DOUBLE NOT NULL,
    PRIMARY KEY (symbol, day)
);

CREATE TABLE IF NOT EXISTS exchange_rate_history (
    id BIGINT NOT NULL DEFAULT nextval('exchange_rate_history_id_seq'),
    currency VARCHAR NOT NULL,
    day DATE NOT NULL,
    recorded_at TIMESTAMP NOT NULL,
    rate DOUBLE NOT NULL,
    PRIMARY KEY (currency, day)
);
"#;

// A single statement keyed by the primary key: concurrent writers for the
// same (key, day) cannot produce two rows, and the row keeps its id.
const UPSERT_ENTITY_SQL: &str = r#"
INSERT INTO entity_floor_history (symbol, day, recorded_at, floor_price)
VALUES (?, CAST(? AS DATE), CAST(? AS TIMESTAMP), CAST(? AS DOUBLE))
ON CONFLICT (symbol, day) DO UPDATE SET
    recorded_at = excluded.recorded_at,
    floor_price = excluded.floor_price
"#;

const UPSERT_RATE_SQL: &str = r#"
INSERT INTO exchange_rate_history (currency, day, recorded_at, rate)
VALUES (?, CAST(? AS DATE), CAST(? AS TIMESTAMP), CAST(? AS DOUBLE))
ON CONFLICT (currency, day) DO UPDATE SET
    recorded_at = excluded.recorded_at,
    rate = excluded.rate
"#;

/// Format a UTC day the way the store binds and returns it.
pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Persists collector and rate-fetcher output as day-granular history.
///
/// Cheap to clone; clones share one DuckDB connection behind a mutex, so the
/// store can be handed to the scheduler and to request handlers at once.
#[derive(Clone)]
pub struct SnapshotStore {
    conn: Arc<Mutex<DuckDbConnection>>,
    base: String,
    currencies: Vec<String>,
}

impl SnapshotStore {
    /// Open (or create) a database file.
    pub fn open<P: AsRef<Path>>(path: P, base: &str, currencies: &[String]) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = DuckDbConnection::open(path)?;
        Self::init(conn, base, currencies)
    }

    /// Open a throwaway in-memory database.
    pub fn open_in_memory(base: &str, currencies: &[String]) -> Result<Self> {
        let conn = DuckDbConnection::open_in_memory()?;
        Self::init(conn, base, currencies)
    }

    fn init(conn: DuckDbConnection, base: &str, currencies: &[String]) -> Result<Self> {
        for code in std::iter::once(base).chain(currencies.iter().map(String::as_str)) {
            if !config::is_valid_code(code) {
                return Err(FloorwatchError::InvalidArgument(format!(
                    "invalid asset or currency code: {code:?}"
                )));
            }
        }

        conn.execute_batch(SCHEMA_SQL)?;
        conn.execute_batch(&entity_view_sql(base, currencies))?;
        conn.execute_batch(&combined_view_sql(base, currencies))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            base: base.to_string(),
            currencies: currencies.to_vec(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, DuckDbConnection> {
        // A panic while holding the lock cannot leave a statement half
        // applied; each DuckDB statement commits or rolls back on its own.
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn base_asset(&self) -> &str {
        &self.base
    }

    pub fn currencies(&self) -> &[String] {
        &self.currencies
    }

    /// Pivot columns of both views: the base asset, then each currency.
    pub fn value_columns(&self) -> Vec<String> {
        std::iter::once(self.base.clone())
            .chain(self.currencies.iter().cloned())
            .collect()
    }

    /// Record a collection's floor price for `day`, replacing any value
    /// already written that day.
    pub fn upsert_entity_history(
        &self,
        symbol: &str,
        day: NaiveDate,
        recorded_at: DateTime<Utc>,
        floor_price: Decimal,
    ) -> Result<()> {
        self.execute_statement(
            UPSERT_ENTITY_SQL,
            &[
                symbol.to_string(),
                format_day(day),
                format_timestamp(recorded_at),
                floor_price.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Record a currency's exchange rate for `day`, replacing any value
    /// already written that day.
    pub fn upsert_rate_history(
        &self,
        currency: &str,
        day: NaiveDate,
        recorded_at: DateTime<Utc>,
        rate: Decimal,
    ) -> Result<()> {
        self.execute_statement(
            UPSERT_RATE_SQL,
            &[
                currency.to_string(),
                format_day(day),
                format_timestamp(recorded_at),
                rate.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Stored floor-price rows for one collection, oldest first.
    pub fn entity_rows(&self, symbol: &str) -> Result<Vec<HistoryRow>> {
        let sql = format!(
            "SELECT id, symbol AS key, strftime(day, '%Y-%m-%d') AS day, \
             strftime(recorded_at, '%Y-%m-%d %H:%M:%S') AS recorded_at, \
             floor_price AS value \
             FROM {ENTITY_TABLE} WHERE symbol = ? ORDER BY day ASC"
        );
        self.execute_into(&sql, &[symbol.to_string()])
    }

    /// Stored rate rows for one currency, oldest first.
    pub fn rate_rows(&self, currency: &str) -> Result<Vec<HistoryRow>> {
        let sql = format!(
            "SELECT id, currency AS key, strftime(day, '%Y-%m-%d') AS day, \
             strftime(recorded_at, '%Y-%m-%d %H:%M:%S') AS recorded_at, \
             rate AS value \
             FROM {RATE_TABLE} WHERE currency = ? ORDER BY day ASC"
        );
        self.execute_into(&sql, &[currency.to_string()])
    }

    /// Run a statement that returns no rows. Returns the affected row count.
    pub fn execute_statement(&self, sql: &str, params: &[String]) -> Result<usize> {
        let conn = self.lock();
        let changed = conn.execute(sql, bind(params).as_slice())?;
        Ok(changed)
    }

    /// Execute SQL and return results as a `Vec` of `HashMap`s.
    ///
    /// Each row is represented as a `HashMap<String, serde_json::Value>`.
    pub fn execute(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;

        let param_values = bind(params);
        let mut rows_result = stmt.query(param_values.as_slice())?;

        // Column metadata is only available once the query has run.
        let column_names: Vec<String> = rows_result
            .as_ref()
            .map(|s| s.column_names().into_iter().map(|c| c.to_string()).collect())
            .ok_or_else(|| FloorwatchError::InvalidArgument("statement has no columns".into()))?;

        let mut out: Vec<HashMap<String, serde_json::Value>> = Vec::new();

        while let Some(row) = rows_result.next()? {
            let mut map = HashMap::new();
            for (i, col_name) in column_names.iter().enumerate() {
                map.insert(col_name.clone(), convert_value_ref(row.get_ref(i)?));
            }
            out.push(map);
        }

        Ok(out)
    }

    /// Execute SQL and deserialize each row into type `T`.
    pub fn execute_into<T: DeserializeOwned>(&self, sql: &str, params: &[String]) -> Result<Vec<T>> {
        let rows = self.execute(sql, params)?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let value = serde_json::Value::Object(row.into_iter().collect());
            results.push(serde_json::from_value(value)?);
        }
        Ok(results)
    }

    /// Execute SQL and return the first column of the first row.
    ///
    /// Returns `None` if the result set is empty.
    pub fn execute_scalar(&self, sql: &str, params: &[String]) -> Result<Option<serde_json::Value>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;
        let param_values = bind(params);
        let mut rows = stmt.query(param_values.as_slice())?;

        if let Some(row) = rows.next()? {
            Ok(Some(convert_value_ref(row.get_ref(0)?)))
        } else {
            Ok(None)
        }
    }

    /// Number of rows in one of the history tables.
    pub fn row_count(&self, table: &str) -> Result<i64> {
        if table != ENTITY_TABLE && table != RATE_TABLE {
            return Err(FloorwatchError::NotFound(format!("unknown table: {table}")));
        }
        let count = self
            .execute_scalar(&format!("SELECT COUNT(*) FROM {table}"), &[])?
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        Ok(count)
    }
}

/// Per-collection view: the floor price in the base asset, and the floor
/// price times that day's rate for each currency (NULL if no rate that day).
fn entity_view_sql(base: &str, currencies: &[String]) -> String {
    let mut cols = vec![format!("e.floor_price AS \"{base}\"")];
    for currency in currencies {
        cols.push(format!(
            "e.floor_price * MAX(CASE WHEN r.currency = '{currency}' THEN r.rate END) AS \"{currency}\""
        ));
    }
    format!(
        "CREATE OR REPLACE VIEW {ENTITY_VIEW} AS \
         SELECT e.day AS day, e.symbol AS symbol, {} \
         FROM {ENTITY_TABLE} e \
         LEFT JOIN {RATE_TABLE} r ON r.day = e.day \
         GROUP BY e.day, e.symbol, e.floor_price",
        cols.join(", ")
    )
}

/// Combined view: per-day sum of the per-collection view, so the aggregate
/// always equals the sum of its parts.
fn combined_view_sql(base: &str, currencies: &[String]) -> String {
    let cols: Vec<String> = std::iter::once(base)
        .chain(currencies.iter().map(String::as_str))
        .map(|code| format!("SUM(\"{code}\") AS \"{code}\""))
        .collect();
    format!(
        "CREATE OR REPLACE VIEW {COMBINED_VIEW} AS \
         SELECT day, {} FROM {ENTITY_VIEW} GROUP BY day",
        cols.join(", ")
    )
}

fn bind(params: &[String]) -> Vec<&dyn duckdb::ToSql> {
    params.iter().map(|p| p as &dyn duckdb::ToSql).collect()
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    match val {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::SmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Int(n) => serde_json::Value::Number(n.into()),
        ValueRef::BigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::HugeInt(n) => {
            if let Ok(i) = i64::try_from(n) {
                serde_json::Value::Number(i.into())
            } else {
                serde_json::Value::String(n.to_string())
            }
        }
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).to_string()),
        // Dates and timestamps are formatted with strftime in SQL instead.
        _ => serde_json::Value::Null,
    }
}
