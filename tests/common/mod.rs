//! Shared fixtures for the floorwatch integration tests.
//!
//! Provides in-memory stand-ins for the marketplace and FX-rate APIs whose
//! responses can be changed between refresh cycles, plus helpers that wire
//! them into an in-memory [`FloorTracker`].

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use floorwatch::upstream::{CollectionStats, LatestRates};
use floorwatch::{FloorTracker, FloorwatchError, FxRatesApi, MarketplaceApi, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

pub const ALPHA: &str = "alpha_collection";
pub const BETA: &str = "beta_collection";

pub fn currencies() -> Vec<String> {
    vec!["USD".to_string(), "EUR".to_string()]
}

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

// ---------------------------------------------------------------------------
// StubMarketplace
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MarketState {
    floors: HashMap<String, u64>,
    failing: HashSet<String>,
}

/// Marketplace whose floor prices (in lamports) are set by the test.
#[derive(Clone, Default)]
pub struct StubMarketplace {
    state: Arc<Mutex<MarketState>>,
    calls: Arc<AtomicUsize>,
    // While `true`, every stats call parks until `release`.
    gate: Arc<(Mutex<bool>, Condvar)>,
    parked: Arc<AtomicUsize>,
}

impl StubMarketplace {
    pub fn with_floors(floors: &[(&str, u64)]) -> Self {
        let stub = Self::default();
        for (symbol, lamports) in floors {
            stub.set_floor(symbol, *lamports);
        }
        stub
    }

    pub fn set_floor(&self, symbol: &str, lamports: u64) {
        self.state
            .lock()
            .unwrap()
            .floors
            .insert(symbol.to_string(), lamports);
    }

    pub fn fail(&self, symbol: &str) {
        self.state.lock().unwrap().failing.insert(symbol.to_string());
    }

    pub fn heal(&self, symbol: &str) {
        self.state.lock().unwrap().failing.remove(symbol);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make stats calls block until [`release`](Self::release).
    pub fn hold(&self) {
        *self.gate.0.lock().unwrap() = true;
    }

    pub fn release(&self) {
        *self.gate.0.lock().unwrap() = false;
        self.gate.1.notify_all();
    }

    /// Number of calls that have reached the gate while it was held.
    pub fn parked(&self) -> usize {
        self.parked.load(Ordering::SeqCst)
    }

    fn wait_at_gate(&self) {
        let (held, released) = &*self.gate;
        let mut guard = held.lock().unwrap();
        if *guard {
            self.parked.fetch_add(1, Ordering::SeqCst);
        }
        while *guard {
            guard = released.wait(guard).unwrap();
        }
    }
}

impl MarketplaceApi for StubMarketplace {
    fn collection_stats(&self, symbol: &str) -> Result<CollectionStats> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.wait_at_gate();
        let state = self.state.lock().unwrap();
        if state.failing.contains(symbol) {
            return Err(FloorwatchError::UpstreamParse(format!("stub failure for {symbol}")));
        }
        let floor = state
            .floors
            .get(symbol)
            .copied()
            .ok_or_else(|| FloorwatchError::NotFound(symbol.to_string()))?;
        Ok(CollectionStats {
            symbol: symbol.to_string(),
            floor_price: floor,
            listed_count: 7,
            avg_price_24h: Some(floor as f64),
            volume_all: Some(floor as f64 * 100.0),
        })
    }
}

// ---------------------------------------------------------------------------
// StubFxRates
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FxState {
    rates: Option<HashMap<String, f64>>,
    timestamp: i64,
}

/// FX provider whose quote is set by the test; `None` rates fail the fetch.
/// Tracks how many fetches ran at once.
#[derive(Clone, Default)]
pub struct StubFxRates {
    state: Arc<Mutex<FxState>>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl StubFxRates {
    pub fn with_rates(rates: &[(&str, f64)], timestamp: i64) -> Self {
        let stub = Self::default();
        stub.set_rates(rates, timestamp);
        stub
    }

    pub fn set_rates(&self, rates: &[(&str, f64)], timestamp: i64) {
        let mut state = self.state.lock().unwrap();
        state.rates = Some(rates.iter().map(|(c, r)| (c.to_string(), *r)).collect());
        state.timestamp = timestamp;
    }

    pub fn fail(&self) {
        self.state.lock().unwrap().rates = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl FxRatesApi for StubFxRates {
    fn latest(&self, base: &str, _currencies: &[String]) -> Result<LatestRates> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        let result = {
            let state = self.state.lock().unwrap();
            match &state.rates {
                Some(rates) => Ok(LatestRates {
                    success: Some(true),
                    timestamp: state.timestamp,
                    base: Some(base.to_string()),
                    rates: rates.clone(),
                }),
                None => Err(FloorwatchError::UpstreamParse("stub rate failure".into())),
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ---------------------------------------------------------------------------
// Tracker wiring
// ---------------------------------------------------------------------------

/// In-memory tracker over the two stubs, tracking [`ALPHA`] and [`BETA`] in
/// USD and EUR with the default 1.025 fee.
pub fn tracker(market: &StubMarketplace, fx: &StubFxRates) -> FloorTracker {
    FloorTracker::builder()
        .in_memory()
        .entities([ALPHA, BETA])
        .currencies(currencies())
        .marketplace(market.clone())
        .fx_rates(fx.clone())
        .build()
        .unwrap()
}
