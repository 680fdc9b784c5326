//! Floor-price tracker for Magic Eden collections.
//!
//! Periodically collects collection floor prices in SOL, converts them into
//! a small fixed set of fiat currencies, keeps a day-bucketed history in
//! DuckDB and serves the current state and chart series to a presentation
//! layer.
//!
//! # Quick start
//!
//! ```no_run
//! use floorwatch::FloorTracker;
//!
//! let tracker = FloorTracker::builder()
//!     .api_key("fx-rates-key")
//!     .database("floorwatch.duckdb")
//!     .build()
//!     .unwrap();
//!
//! // Run one refresh cycle by hand
//! let report = tracker.refresh();
//! println!("{report:?}");
//!
//! // Read the fee-adjusted dashboard and the combined chart
//! let view = tracker.dashboard();
//! let combined = tracker.history().combined().unwrap();
//! ```

pub mod async_tracker;
pub mod collector;
pub mod config;
pub mod error;
pub mod history;
pub mod models;
pub mod rates;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod units;
pub mod upstream;

pub use async_tracker::AsyncFloorTracker;
pub use collector::Collector;
pub use error::{FloorwatchError, Result};
pub use history::HistoryQuery;
pub use models::{Collection, EntitySnapshot, ExchangeRateSet, HistoryRow, PriceHistory};
pub use rates::RateFetcher;
pub use scheduler::{RefreshScheduler, SchedulerHandle};
pub use state::{AggregateState, DashboardView, StateHandle};
pub use store::SnapshotStore;
pub use upstream::{FxRatesApi, MarketplaceApi};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::upstream::{HttpFxRates, HttpMarketplace};

// ---------------------------------------------------------------------------
// FloorTrackerBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`FloorTracker`].
///
/// Use [`FloorTracker::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](FloorTrackerBuilder::build).
pub struct FloorTrackerBuilder {
    database: Option<PathBuf>,
    in_memory: bool,
    api_key: String,
    entities: Vec<String>,
    currencies: Vec<String>,
    base_asset: String,
    fee_multiplier: Decimal,
    refresh_interval: Duration,
    timeout: Duration,
    marketplace_url: String,
    fx_rates_url: String,
    marketplace: Option<Arc<dyn MarketplaceApi>>,
    fx_rates: Option<Arc<dyn FxRatesApi>>,
}

impl Default for FloorTrackerBuilder {
    fn default() -> Self {
        Self {
            database: None,
            in_memory: false,
            api_key: String::new(),
            entities: config::default_entities(),
            currencies: config::default_currencies(),
            base_asset: config::BASE_ASSET.to_string(),
            fee_multiplier: config::default_fee_multiplier(),
            refresh_interval: config::DEFAULT_REFRESH_INTERVAL,
            timeout: config::DEFAULT_TIMEOUT,
            marketplace_url: config::MARKETPLACE_BASE.to_string(),
            fx_rates_url: config::FX_RATES_BASE.to_string(),
            marketplace: None,
            fx_rates: None,
        }
    }
}

impl FloorTrackerBuilder {
    /// Start from the defaults, then read `FX_RATES_API_KEY` and
    /// `FLOORWATCH_DB` from the environment when set.
    pub fn from_env() -> Self {
        let mut builder = Self::default();
        if let Ok(key) = std::env::var(config::API_KEY_ENV) {
            builder.api_key = key;
        }
        if let Ok(path) = std::env::var(config::DATABASE_ENV) {
            builder.database = Some(PathBuf::from(path));
        }
        builder
    }

    /// Set the DuckDB database file.
    ///
    /// If not set, a file under the platform data directory is used
    /// (e.g. `~/.local/share/floorwatch/floorwatch.duckdb` on Linux).
    pub fn database<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.database = Some(path.as_ref().to_path_buf());
        self.in_memory = false;
        self
    }

    /// Keep history in an in-memory database that is lost on drop.
    pub fn in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    /// API key for the FX-rate provider.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Marketplace collection symbols to track.
    pub fn entities<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities = symbols.into_iter().map(Into::into).collect();
        self
    }

    /// Fiat currencies to convert into.
    pub fn currencies<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.currencies = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn base_asset(mut self, code: impl Into<String>) -> Self {
        self.base_asset = code.into();
        self
    }

    /// Multiplier applied to displayed prices. Defaults to `1.025`.
    pub fn fee_multiplier(mut self, fee: Decimal) -> Self {
        self.fee_multiplier = fee;
        self
    }

    /// Time between scheduled refresh cycles. Defaults to 10 minutes.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Per-request timeout for both upstream APIs. Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn marketplace_url(mut self, url: impl Into<String>) -> Self {
        self.marketplace_url = url.into();
        self
    }

    pub fn fx_rates_url(mut self, url: impl Into<String>) -> Self {
        self.fx_rates_url = url.into();
        self
    }

    /// Use a custom marketplace source instead of the HTTP client.
    pub fn marketplace(mut self, api: impl MarketplaceApi + 'static) -> Self {
        self.marketplace = Some(Arc::new(api));
        self
    }

    /// Use a custom exchange-rate source instead of the HTTP client.
    pub fn fx_rates(mut self, api: impl FxRatesApi + 'static) -> Self {
        self.fx_rates = Some(Arc::new(api));
        self
    }

    /// Build the tracker, opening the store and creating the view schema.
    ///
    /// No upstream request is made until the first refresh.
    pub fn build(self) -> Result<FloorTracker> {
        if self.entities.is_empty() {
            return Err(FloorwatchError::InvalidArgument(
                "at least one collection symbol is required".into(),
            ));
        }
        if self.fee_multiplier <= Decimal::ZERO {
            return Err(FloorwatchError::InvalidArgument(format!(
                "fee multiplier must be positive, got {}",
                self.fee_multiplier
            )));
        }
        if self.refresh_interval.is_zero() {
            return Err(FloorwatchError::InvalidArgument(
                "refresh interval must be non-zero".into(),
            ));
        }

        let store = if self.in_memory {
            SnapshotStore::open_in_memory(&self.base_asset, &self.currencies)?
        } else {
            let path = self.database.unwrap_or_else(config::default_database_path);
            SnapshotStore::open(path, &self.base_asset, &self.currencies)?
        };

        let marketplace = match self.marketplace {
            Some(api) => api,
            None => Arc::new(HttpMarketplace::new(self.marketplace_url, self.timeout)?),
        };
        let fx_rates = match self.fx_rates {
            Some(api) => api,
            None => {
                if self.api_key.is_empty() {
                    warn!("no FX rates API key configured; rate fetches will likely fail");
                }
                Arc::new(HttpFxRates::new(self.fx_rates_url, self.api_key, self.timeout)?)
            }
        };

        Ok(FloorTracker {
            collector: Collector::new(marketplace, self.entities),
            rate_fetcher: RateFetcher::new(fx_rates, self.base_asset, self.currencies),
            store,
            state: StateHandle::new(),
            fee_multiplier: self.fee_multiplier,
            refresh_interval: self.refresh_interval,
            cycle: Mutex::new(()),
        })
    }
}

// ---------------------------------------------------------------------------
// CycleReport
// ---------------------------------------------------------------------------

/// What one refresh cycle managed to do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    /// Whether the collector succeeded; if not, nothing else ran.
    pub collected: bool,
    pub entities_collected: usize,
    pub rates_refreshed: bool,
    pub rows_written: usize,
    pub rows_failed: usize,
}

// ---------------------------------------------------------------------------
// FloorTracker
// ---------------------------------------------------------------------------

/// The main entry point: owns the store, the two upstream pipelines and the
/// published state.
///
/// Created via [`FloorTracker::builder()`]. Share it behind an `Arc` between
/// a [`RefreshScheduler`] and request handlers.
pub struct FloorTracker {
    collector: Collector,
    rate_fetcher: RateFetcher,
    store: SnapshotStore,
    state: StateHandle,
    fee_multiplier: Decimal,
    refresh_interval: Duration,
    // Held for the length of a cycle so manual and scheduled refreshes
    // never interleave their writes.
    cycle: Mutex<()>,
}

impl FloorTracker {
    /// Create a new builder with the default configuration.
    pub fn builder() -> FloorTrackerBuilder {
        FloorTrackerBuilder::default()
    }

    /// Run one refresh cycle stamped with the current time.
    pub fn refresh(&self) -> CycleReport {
        self.refresh_at(Utc::now())
    }

    /// Run one refresh cycle as if at `now`; history rows land on
    /// `now`'s UTC calendar day.
    ///
    /// A collector failure aborts the cycle and leaves the published state
    /// alone. A rate failure keeps the previous rates and fiat totals while
    /// still publishing the fresh floor prices. Persistence failures are
    /// logged per row and never block the publish.
    pub fn refresh_at(&self, now: DateTime<Utc>) -> CycleReport {
        let _cycle = match self.cycle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut report = CycleReport::default();
        let day = now.date_naive();

        let collection = match self.collector.collect() {
            Ok(collection) => collection,
            Err(e) => {
                warn!(error = %e, "collection failed; keeping previous snapshot");
                return report;
            }
        };
        report.collected = true;
        report.entities_collected = collection.snapshots.len();

        for (symbol, snapshot) in &collection.snapshots {
            match self
                .store
                .upsert_entity_history(symbol, day, now, snapshot.floor_price)
            {
                Ok(()) => report.rows_written += 1,
                Err(e) => {
                    report.rows_failed += 1;
                    warn!(symbol = %symbol, error = %e, "failed to persist floor price");
                }
            }
        }

        let previous = self.state.snapshot();
        let total_base = collection.total_base;
        let mut entities = collection.snapshots;

        let next = match self.rate_fetcher.fetch() {
            Ok(rate_set) => {
                for (currency, rate) in &rate_set.rates {
                    match self.store.upsert_rate_history(currency, day, now, *rate) {
                        Ok(()) => report.rows_written += 1,
                        Err(e) => {
                            report.rows_failed += 1;
                            warn!(currency = %currency, error = %e, "failed to persist exchange rate");
                        }
                    }
                }
                report.rates_refreshed = true;
                rates::price_entities(&rate_set, &mut entities);
                AggregateState {
                    total_base,
                    fiat_totals: rates::fiat_totals(&rate_set, total_base),
                    entities,
                    rates_updated_at: Some(rate_set.as_of),
                    rates: Some(rate_set),
                }
            }
            Err(e) => {
                warn!(error = %e, "exchange rate fetch failed; keeping previous rates");
                if let Some(rate_set) = &previous.rates {
                    rates::price_entities(rate_set, &mut entities);
                }
                AggregateState {
                    total_base,
                    fiat_totals: previous.fiat_totals.clone(),
                    entities,
                    rates: previous.rates.clone(),
                    rates_updated_at: previous.rates_updated_at,
                }
            }
        };

        self.state.publish(next);
        info!(
            entities = report.entities_collected,
            rates_refreshed = report.rates_refreshed,
            rows_written = report.rows_written,
            rows_failed = report.rows_failed,
            %total_base,
            "refresh cycle complete"
        );
        report
    }

    /// The state published by the last successful cycle.
    pub fn state(&self) -> Arc<AggregateState> {
        self.state.snapshot()
    }

    /// Handle for readers that outlive a borrow of the tracker.
    pub fn state_handle(&self) -> StateHandle {
        self.state.clone()
    }

    /// Fee-adjusted view of the current state.
    pub fn dashboard(&self) -> DashboardView {
        self.state
            .snapshot()
            .dashboard(self.rate_fetcher.base(), self.fee_multiplier)
    }

    /// Access the history query interface.
    pub fn history(&self) -> HistoryQuery<'_> {
        HistoryQuery::new(&self.store, self.fee_multiplier)
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn entities(&self) -> &[String] {
        self.collector.symbols()
    }

    pub fn currencies(&self) -> &[String] {
        self.rate_fetcher.currencies()
    }

    pub fn base_asset(&self) -> &str {
        self.rate_fetcher.base()
    }

    pub fn fee_multiplier(&self) -> Decimal {
        self.fee_multiplier
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for FloorTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FloorTracker(entities=[{}], base={}, currencies=[{}], fee={}, interval={}s)",
            self.entities().join(", "),
            self.base_asset(),
            self.currencies().join(", "),
            self.fee_multiplier,
            self.refresh_interval.as_secs()
        )
    }
}
