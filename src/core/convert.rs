//! Amount conversion on top of a [`CurrencyRateProvider`].
//!
//! Single conversions go through [`AmountConverter::convert`]. Aggregation
//! passes instead resolve every distinct currency pair once with
//! [`AmountConverter::resolve`] and convert against the resulting
//! [`RateTable`], which is dropped at the end of the pass.

use crate::core::currency::{CurrencyRateProvider, normalize_code, same_currency};
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

pub struct AmountConverter<'a> {
    provider: &'a (dyn CurrencyRateProvider + Send + Sync),
}

impl<'a> AmountConverter<'a> {
    pub fn new(provider: &'a (dyn CurrencyRateProvider + Send + Sync)) -> Self {
        Self { provider }
    }

    /// Fetches the rate for a pair, mapping every failure to `None`.
    pub async fn lookup(&self, from: &str, to: &str) -> Option<f64> {
        let from = normalize_code(from);
        let to = normalize_code(to);
        if from.is_empty() || to.is_empty() {
            debug!("Rate lookup skipped for empty currency code ({from:?} -> {to:?})");
            return None;
        }

        match self.provider.get_rate(&from, &to).await {
            Ok(rate) if rate.is_finite() && rate > 0.0 => Some(rate),
            Ok(rate) => {
                debug!("Ignoring invalid rate {rate} for {from} -> {to}");
                None
            }
            Err(e) => {
                debug!("Rate unavailable for {from} -> {to}: {e}");
                None
            }
        }
    }

    /// Converts `amount` from one currency to another. Equal codes return
    /// the amount unchanged without touching the provider.
    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64> {
        if same_currency(from, to) {
            return Some(amount);
        }
        self.lookup(from, to).await.map(|rate| amount * rate)
    }

    /// Fetches each distinct `(from, to)` pair exactly once.
    pub async fn resolve<'p, I>(&self, pairs: I) -> RateTable
    where
        I: IntoIterator<Item = (&'p str, &'p str)>,
    {
        let distinct: BTreeSet<(String, String)> = pairs
            .into_iter()
            .filter(|(from, to)| !same_currency(from, to))
            .map(|(from, to)| (normalize_code(from), normalize_code(to)))
            .collect();

        debug!("Resolving {} distinct currency pairs", distinct.len());

        let lookups = distinct.into_iter().map(|(from, to)| async move {
            let rate = self.lookup(&from, &to).await;
            ((from, to), rate)
        });
        let rates = join_all(lookups).await.into_iter().collect();

        RateTable { rates }
    }
}

/// Rates resolved for one aggregation pass.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<(String, String), Option<f64>>,
}

impl RateTable {
    pub fn rate(&self, from: &str, to: &str) -> Option<f64> {
        self.rates
            .get(&(normalize_code(from), normalize_code(to)))
            .copied()
            .flatten()
    }

    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64> {
        if same_currency(from, to) {
            return Some(amount);
        }
        self.rate(from, to).map(|rate| amount * rate)
    }

    /// Number of pairs that were looked up, available or not.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
