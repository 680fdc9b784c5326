//! Upstream collaborators: the marketplace stats endpoint and the FX-rate
//! endpoint.
//!
//! The collector and rate fetcher only see the [`MarketplaceApi`] and
//! [`FxRatesApi`] traits. The blocking `reqwest` implementations here are the
//! production ones; tests substitute in-memory stubs.

pub mod fx_rates;
pub mod marketplace;

pub use fx_rates::{FxRatesApi, HttpFxRates, LatestRates};
pub use marketplace::{CollectionStats, HttpMarketplace, MarketplaceApi};

use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::Result;

/// Build the shared blocking client. Every request carries `timeout`, so a
/// stalled upstream fails the call instead of hanging the refresh cycle.
pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(concat!("floorwatch/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
