//! Currency conversion abstractions

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    /// Multiplier converting one unit of `from` into `to`.
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64>;
}

/// Case-insensitive comparison of two currency codes.
pub fn same_currency(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Lower-cased, trimmed form used for rate lookups.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}
