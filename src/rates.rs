//! Exchange-rate fetching and fiat derivation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::DateTime;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{FloorwatchError, Result};
use crate::models::{EntitySnapshot, ExchangeRateSet};
use crate::units::{decimal_from_f64, round_nearest};
use crate::upstream::{FxRatesApi, LatestRates};

/// Fetches one quote per cycle for the base asset against a fixed currency list.
pub struct RateFetcher {
    api: Arc<dyn FxRatesApi>,
    base: String,
    currencies: Vec<String>,
}

impl RateFetcher {
    pub fn new(api: Arc<dyn FxRatesApi>, base: String, currencies: Vec<String>) -> Self {
        Self {
            api,
            base,
            currencies,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn currencies(&self) -> &[String] {
        &self.currencies
    }

    /// Fetch the latest rates.
    ///
    /// A provider-reported failure, a missing currency or a non-finite rate
    /// fails the whole fetch; a partial rate set is never returned.
    pub fn fetch(&self) -> Result<ExchangeRateSet> {
        let latest = self.api.latest(&self.base, &self.currencies)?;
        let set = self.to_rate_set(latest)?;
        debug!(base = %set.base, as_of = %set.as_of, "fetched exchange rates");
        Ok(set)
    }

    fn to_rate_set(&self, latest: LatestRates) -> Result<ExchangeRateSet> {
        if latest.success == Some(false) {
            return Err(FloorwatchError::UpstreamParse(
                "exchange rate provider reported failure".into(),
            ));
        }
        if let Some(base) = &latest.base {
            if !base.eq_ignore_ascii_case(&self.base) {
                return Err(FloorwatchError::UpstreamParse(format!(
                    "expected rates based on {}, got {}",
                    self.base, base
                )));
            }
        }

        let mut rates = BTreeMap::new();
        for currency in &self.currencies {
            let raw = latest.rates.get(currency).ok_or_else(|| {
                FloorwatchError::UpstreamParse(format!("missing rate for {currency}"))
            })?;
            rates.insert(currency.clone(), decimal_from_f64(*raw)?);
        }

        let as_of = DateTime::from_timestamp(latest.timestamp, 0).ok_or_else(|| {
            FloorwatchError::UpstreamParse(format!("bad rate timestamp {}", latest.timestamp))
        })?;

        Ok(ExchangeRateSet {
            as_of,
            base: self.base.clone(),
            rates,
        })
    }
}

/// Fiat value of the SOL total per currency, rounded to whole units.
///
/// This is the raw display total; the marketplace fee is applied on read.
pub fn fiat_totals(rates: &ExchangeRateSet, total_base: Decimal) -> BTreeMap<String, Decimal> {
    rates
        .rates
        .iter()
        .map(|(currency, rate)| (currency.clone(), round_nearest(*rate * total_base, 0)))
        .collect()
}

/// Fill each snapshot's `fiat_prices` with `floor_price * rate`, unrounded.
pub fn price_entities(rates: &ExchangeRateSet, snapshots: &mut BTreeMap<String, EntitySnapshot>) {
    for snapshot in snapshots.values_mut() {
        snapshot.fiat_prices = rates
            .rates
            .iter()
            .map(|(currency, rate)| (currency.clone(), snapshot.floor_price * *rate))
            .collect();
    }
}
