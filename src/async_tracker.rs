//! Async wrapper around [`FloorTracker`] for use in Tokio services.
//!
//! DuckDB queries and the upstream HTTP calls are blocking, so every
//! operation that touches them runs on the blocking thread pool via
//! [`tokio::task::spawn_blocking`]. Reading the published state does not
//! block and is served inline.
//!
//! # Example
//!
//! ```no_run
//! use floorwatch::{AsyncFloorTracker, FloorTracker};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tracker = AsyncFloorTracker::build(FloorTracker::builder().api_key("key"))
//!         .await
//!         .unwrap();
//!
//!     let scheduler = tracker.spawn_scheduler();
//!     let combined = tracker.combined_history().await.unwrap();
//!     println!("{} days of history", combined.len());
//!     scheduler.stop().await;
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{FloorwatchError, Result};
use crate::models::PriceHistory;
use crate::scheduler::{RefreshScheduler, SchedulerHandle};
use crate::state::{AggregateState, DashboardView};
use crate::{CycleReport, FloorTracker, FloorTrackerBuilder};

/// Cheap-to-clone async handle to a shared [`FloorTracker`].
#[derive(Clone)]
pub struct AsyncFloorTracker {
    inner: Arc<FloorTracker>,
}

impl AsyncFloorTracker {
    /// Build the tracker on the blocking pool (opening DuckDB and the HTTP
    /// clients must not happen on an async worker thread).
    pub async fn build(builder: FloorTrackerBuilder) -> Result<Self> {
        tokio::task::spawn_blocking(move || {
            let tracker = builder.build()?;
            Ok(Self {
                inner: Arc::new(tracker),
            })
        })
        .await
        .map_err(|e| FloorwatchError::InvalidArgument(format!("Task join error: {e}")))?
    }

    /// Wrap an already-built tracker.
    pub fn from_tracker(tracker: Arc<FloorTracker>) -> Self {
        Self { inner: tracker }
    }

    /// Run a sync tracker operation on the blocking thread pool.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&FloorTracker) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let tracker = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&tracker))
            .await
            .map_err(|e| FloorwatchError::InvalidArgument(format!("Task join error: {e}")))?
    }

    /// Run one refresh cycle now.
    pub async fn refresh(&self) -> Result<CycleReport> {
        self.run(|t| Ok(t.refresh())).await
    }

    pub async fn entity_history(&self, symbol: &str) -> Result<PriceHistory> {
        let symbol = symbol.to_string();
        self.run(move |t| t.history().per_entity(&symbol)).await
    }

    pub async fn combined_history(&self) -> Result<PriceHistory> {
        self.run(|t| t.history().combined()).await
    }

    pub async fn all_entity_histories(&self) -> Result<BTreeMap<String, PriceHistory>> {
        self.run(|t| t.history().all_entities()).await
    }

    pub fn state(&self) -> Arc<AggregateState> {
        self.inner.state()
    }

    pub fn dashboard(&self) -> DashboardView {
        self.inner.dashboard()
    }

    /// Start the background refresh loop for this tracker.
    pub fn spawn_scheduler(&self) -> SchedulerHandle {
        RefreshScheduler::new(Arc::clone(&self.inner)).spawn()
    }

    /// The shared tracker.
    pub fn inner(&self) -> &Arc<FloorTracker> {
        &self.inner
    }
}
