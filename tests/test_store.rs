//! Snapshot store tests: day-bucketed upserts, identity, concurrency, reopen.

mod common;

use chrono::NaiveDate;
use floorwatch::store::{ENTITY_TABLE, RATE_TABLE};
use floorwatch::{FloorwatchError, SnapshotStore};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

fn store() -> SnapshotStore {
    SnapshotStore::open_in_memory("SOL", &common::currencies()).unwrap()
}

// ---------------------------------------------------------------------------
// upsert_entity_history
// ---------------------------------------------------------------------------

#[test]
fn same_day_upsert_replaces_value_and_keeps_id() {
    let store = store();
    store
        .upsert_entity_history("alpha", day(1), common::at(2024, 6, 1, 8), dec("1.20"))
        .unwrap();
    let first = store.entity_rows("alpha").unwrap();

    store
        .upsert_entity_history("alpha", day(1), common::at(2024, 6, 1, 20), dec("1.35"))
        .unwrap();
    let rows = store.entity_rows("alpha").unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value, 1.35);
    assert_eq!(rows[0].id, first[0].id);
    assert_eq!(rows[0].day, "2024-06-01");
    assert_eq!(rows[0].recorded_at, "2024-06-01 20:00:00");
}

#[test]
fn new_day_inserts_new_row() {
    let store = store();
    store
        .upsert_entity_history("alpha", day(2), common::at(2024, 6, 2, 8), dec("1.10"))
        .unwrap();
    store
        .upsert_entity_history("alpha", day(1), common::at(2024, 6, 1, 8), dec("1.00"))
        .unwrap();

    let rows = store.entity_rows("alpha").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].day, "2024-06-01");
    assert_eq!(rows[1].day, "2024-06-02");
    assert_ne!(rows[0].id, rows[1].id);
}

#[test]
fn keys_do_not_interfere() {
    let store = store();
    store
        .upsert_entity_history("alpha", day(1), common::at(2024, 6, 1, 8), dec("1.00"))
        .unwrap();
    store
        .upsert_entity_history("beta", day(1), common::at(2024, 6, 1, 8), dec("2.00"))
        .unwrap();

    assert_eq!(store.entity_rows("alpha").unwrap()[0].value, 1.0);
    assert_eq!(store.entity_rows("beta").unwrap()[0].value, 2.0);
    assert_eq!(store.row_count(ENTITY_TABLE).unwrap(), 2);
}

// ---------------------------------------------------------------------------
// upsert_rate_history
// ---------------------------------------------------------------------------

#[test]
fn rate_upsert_is_idempotent_per_day() {
    let store = store();
    store
        .upsert_rate_history("USD", day(1), common::at(2024, 6, 1, 8), dec("100"))
        .unwrap();
    store
        .upsert_rate_history("USD", day(1), common::at(2024, 6, 1, 9), dec("110"))
        .unwrap();
    store
        .upsert_rate_history("EUR", day(1), common::at(2024, 6, 1, 9), dec("95.5"))
        .unwrap();

    let usd = store.rate_rows("USD").unwrap();
    assert_eq!(usd.len(), 1);
    assert_eq!(usd[0].value, 110.0);
    assert_eq!(store.rate_rows("EUR").unwrap()[0].value, 95.5);
    assert_eq!(store.row_count(RATE_TABLE).unwrap(), 2);
}

#[test]
fn no_duplicates_after_many_upserts() {
    let store = store();
    for hour in 0..24 {
        for d in 1..=3 {
            store
                .upsert_entity_history(
                    "alpha",
                    day(d),
                    common::at(2024, 6, d, hour),
                    Decimal::from(hour),
                )
                .unwrap();
        }
    }

    let rows = store.entity_rows("alpha").unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.value == 23.0));

    let dupes = store
        .execute(
            "SELECT symbol, day, COUNT(*) AS n FROM entity_floor_history \
             GROUP BY symbol, day HAVING COUNT(*) > 1",
            &[],
        )
        .unwrap();
    assert!(dupes.is_empty());
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_writers_same_key_leave_one_row() {
    let store = Arc::new(store());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..10 {
                    store
                        .upsert_rate_history(
                            "USD",
                            day(1),
                            common::at(2024, 6, 1, 12),
                            Decimal::from(100 + i),
                        )
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let rows = store.rate_rows("USD").unwrap();
    assert_eq!(rows.len(), 1);
    assert!((100.0..108.0).contains(&rows[0].value));
}

#[test]
fn concurrent_writers_distinct_keys_each_get_a_row() {
    let store = store();
    let handles: Vec<_> = (0..6)
        .map(|i| {
            let store = store.clone();
            thread::spawn(move || {
                let symbol = format!("entity_{i}");
                store
                    .upsert_entity_history(&symbol, day(1), common::at(2024, 6, 1, 12), dec("1.5"))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.row_count(ENTITY_TABLE).unwrap(), 6);
}

// ---------------------------------------------------------------------------
// open
// ---------------------------------------------------------------------------

#[test]
fn file_store_survives_reopen_with_new_currencies() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("nested").join("history.duckdb");

    {
        let store = SnapshotStore::open(&path, "SOL", &["USD".to_string()]).unwrap();
        store
            .upsert_entity_history("alpha", day(1), common::at(2024, 6, 1, 8), dec("1.25"))
            .unwrap();
        store
            .upsert_rate_history("USD", day(1), common::at(2024, 6, 1, 8), dec("150"))
            .unwrap();
    }

    let store = SnapshotStore::open(&path, "SOL", &["USD".to_string(), "SEK".to_string()]).unwrap();
    assert_eq!(store.entity_rows("alpha").unwrap().len(), 1);
    assert_eq!(store.value_columns(), vec!["SOL", "USD", "SEK"]);

    let rows = store
        .execute("SELECT \"SOL\", \"USD\", \"SEK\" FROM v_entity_prices_per_day", &[])
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["SOL"].as_f64(), Some(1.25));
    assert_eq!(rows[0]["USD"].as_f64(), Some(187.5));
    assert!(rows[0]["SEK"].is_null());
}

#[test]
fn row_count_rejects_unknown_tables() {
    let err = store().row_count("cards").unwrap_err();
    assert!(matches!(err, FloorwatchError::NotFound(_)));
}

#[test]
fn execute_scalar_returns_none_for_empty_result() {
    let store = store();
    let result = store
        .execute_scalar(
            "SELECT symbol FROM entity_floor_history WHERE symbol = ?",
            &["missing".to_string()],
        )
        .unwrap();
    assert!(result.is_none());
}
