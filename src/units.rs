//! Pure conversions between lamports, SOL and display values.
//!
//! All math uses `rust_decimal::Decimal`, so `to_base_units` is exact and the
//! rounding helpers never see binary floating-point noise.

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::BASE_UNIT_SCALE;
use crate::error::{FloorwatchError, Result};

/// Convert a raw lamport amount into whole SOL.
pub fn to_base_units(raw: u64) -> Decimal {
    Decimal::from_i128_with_scale(raw as i128, BASE_UNIT_SCALE)
}

/// Truncate toward zero at `places` decimals. Used for floor prices so the
/// displayed value never overstates what a listing is worth.
pub fn round_down(value: Decimal, places: u32) -> Decimal {
    value.round_dp_with_strategy(places, RoundingStrategy::ToZero)
}

/// Round half away from zero at `places` decimals.
pub fn round_nearest(value: Decimal, places: u32) -> Decimal {
    value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Inflate a value by the marketplace fee and round it for display.
pub fn apply_fee(value: Decimal, fee_multiplier: Decimal, places: u32) -> Decimal {
    round_nearest(value * fee_multiplier, places)
}

/// Convert an upstream float into a `Decimal`, rejecting NaN and infinities.
pub fn decimal_from_f64(value: f64) -> Result<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| FloorwatchError::UpstreamParse(format!("not a finite number: {value}")))
}

/// Convert a `Decimal` into the `f64` used by history payloads.
///
/// Goes through the decimal string so `1.23` lands on the same `f64` as the
/// literal `1.23`.
pub fn decimal_to_f64(value: Decimal) -> Result<f64> {
    value.to_string().parse::<f64>().map_err(|e| {
        FloorwatchError::InvalidArgument(format!("{value} is not representable as f64: {e}"))
    })
}
