use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;

pub const MARKETPLACE_BASE: &str = "https://api-mainnet.magiceden.dev";
pub const FX_RATES_BASE: &str = "https://api.fxratesapi.com";

/// Asset every floor price is denominated in.
pub const BASE_ASSET: &str = "SOL";

/// Smallest units (lamports) per whole SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Decimal places of the SOL scale factor.
pub const BASE_UNIT_SCALE: u32 = 9;

pub const API_KEY_ENV: &str = "FX_RATES_API_KEY";
pub const DATABASE_ENV: &str = "FLOORWATCH_DB";

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub fn default_entities() -> Vec<String> {
    [
        "tomorrowland_winter",
        "tomorrowland_love_unity",
        "the_reflection_of_love",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_currencies() -> Vec<String> {
    ["USD", "EUR", "GBP", "SEK"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Marketplace taker fee applied to displayed prices (2.5%).
pub fn default_fee_multiplier() -> Decimal {
    Decimal::new(1025, 3)
}

pub fn default_database_path() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        data.join("floorwatch").join("floorwatch.duckdb")
    } else {
        PathBuf::from(".floorwatch.duckdb")
    }
}

/// Asset and currency codes end up as quoted column names in the history
/// views, so they are restricted to short upper-case alphanumerics.
pub fn is_valid_code(code: &str) -> bool {
    (2..=10).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}
