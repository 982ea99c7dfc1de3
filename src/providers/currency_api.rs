use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::currency::{CurrencyRateProvider, normalize_code};

/// Daily exchange rates from the jsDelivr hosted currency feed.
///
/// `GET {base_url}/{base}.json` answers with the date and one object of
/// rates keyed by the lower-cased base code.
pub struct CurrencyApiProvider {
    base_url: String,
}

impl CurrencyApiProvider {
    pub fn new(base_url: &str) -> Self {
        CurrencyApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CurrencyRateProvider for CurrencyApiProvider {
    #[instrument(name = "CurrencyRateFetch", skip(self), fields(from = %from, to = %to))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let base = normalize_code(from);
        let target = normalize_code(to);
        if base.is_empty() || target.is_empty() {
            return Err(anyhow!("Empty currency code in pair: {:?}:{:?}", from, to));
        }
        let url = format!("{}/{}.json", self.base_url, base);
        debug!("Requesting currency rate from {}", url);

        let client = reqwest::Client::builder().user_agent("xpns/1.0").build()?;

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for currency pair: {}:{}", e, base, target))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency pair: {}:{}",
                response.status(),
                base,
                target
            ));
        }

        let text = response.text().await?;

        let data: HashMap<String, Value> = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", base, e))?;

        let rate = data
            .get(&base)
            .and_then(|rates| rates.get(&target))
            .and_then(Value::as_f64)
            .ok_or_else(|| anyhow!("No rate data found for currency pair: {}:{}", base, target))?;

        if !(rate.is_finite() && rate > 0.0) {
            return Err(anyhow!("Invalid rate {} for currency pair: {}:{}", rate, base, target));
        }

        debug!("Rate {base}:{target} = {rate}");
        Ok(rate)
    }
}
