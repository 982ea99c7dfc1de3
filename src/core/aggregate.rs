//! Provides the currency-aware aggregation of expense records.
//!
//! A pass filters records by period, resolves the rates it needs once, and
//! then groups the converted amounts by category and by day. Amounts whose
//! rate is unavailable contribute `0.0` to every total and the affected
//! record ids are reported in [`AggregationResult::unconverted`].

use crate::core::convert::{AmountConverter, RateTable};
use crate::core::currency::CurrencyRateProvider;
use crate::core::expense::{Category, ExpenseRecord};
use crate::core::period::{Calendar, DateRange, Period};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use tracing::debug;

/// What to aggregate: which period, in which display currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationRequest {
    pub period: Period,
    pub target_currency: String,
}

impl AggregationRequest {
    pub fn new(period: Period, target_currency: &str) -> Self {
        Self {
            period,
            target_currency: target_currency.trim().to_uppercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult {
    pub request: AggregationRequest,
    pub range: DateRange,
    pub category_totals: BTreeMap<Category, f64>,
    pub daily_totals: BTreeMap<NaiveDate, f64>,
    pub total: f64,
    pub record_count: usize,
    pub unconverted: Vec<String>,
}

impl AggregationResult {
    /// Result of a pass that could not read any records.
    pub fn empty(request: AggregationRequest, range: DateRange) -> Self {
        Self {
            request,
            range,
            category_totals: BTreeMap::new(),
            daily_totals: BTreeMap::new(),
            total: 0.0,
            record_count: 0,
            unconverted: Vec::new(),
        }
    }
}

/// Totals for the home view: today, week to date, and the current month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodTotals {
    pub daily: f64,
    pub weekly: f64,
    pub monthly: f64,
}

fn converted(rates: &RateTable, record: &ExpenseRecord, target: &str) -> Option<f64> {
    rates.convert(record.amount, record.currency_or(target), target)
}

pub fn category_totals(
    records: &[&ExpenseRecord],
    rates: &RateTable,
    target: &str,
) -> BTreeMap<Category, f64> {
    let mut totals = BTreeMap::new();
    for record in records {
        *totals.entry(record.category).or_insert(0.0) +=
            converted(rates, record, target).unwrap_or(0.0);
    }
    totals
}

pub fn daily_totals(
    records: &[&ExpenseRecord],
    rates: &RateTable,
    target: &str,
    calendar: &Calendar,
) -> BTreeMap<NaiveDate, f64> {
    let mut totals = BTreeMap::new();
    for record in records {
        *totals
            .entry(calendar.local_date(record.timestamp))
            .or_insert(0.0) += converted(rates, record, target).unwrap_or(0.0);
    }
    totals
}

/// Resolves the rates needed to express `records` in `target`.
pub async fn resolve_rates(
    records: &[&ExpenseRecord],
    target: &str,
    currency_provider: &(dyn CurrencyRateProvider + Send + Sync),
) -> RateTable {
    AmountConverter::new(currency_provider)
        .resolve(
            records
                .iter()
                .map(|record| (record.currency_or(target), target)),
        )
        .await
}

/// Runs one aggregation pass.
///
/// This is a pure function of its inputs apart from the rate lookups; it
/// keeps no state between calls.
pub async fn aggregate(
    records: &[ExpenseRecord],
    request: &AggregationRequest,
    currency_provider: &(dyn CurrencyRateProvider + Send + Sync),
    calendar: &Calendar,
    now: DateTime<Utc>,
) -> AggregationResult {
    let target = request.target_currency.as_str();
    let range = calendar.range(&request.period, now);
    let filtered = range.filter(records);
    debug!(
        "Aggregating {} of {} records for {} in {target}",
        filtered.len(),
        records.len(),
        request.period
    );

    let rates = resolve_rates(&filtered, target, currency_provider).await;

    let mut total = 0.0;
    let mut unconverted = Vec::new();
    for record in &filtered {
        match converted(&rates, record, target) {
            Some(value) => total += value,
            None => {
                debug!(
                    "No rate for {} ({} -> {target}), counting as 0",
                    record.id, record.currency
                );
                unconverted.push(record.id.clone());
            }
        }
    }

    AggregationResult {
        request: request.clone(),
        range,
        category_totals: category_totals(&filtered, &rates, target),
        daily_totals: daily_totals(&filtered, &rates, target, calendar),
        total,
        record_count: filtered.len(),
        unconverted,
    }
}

/// Sums converted amounts for today, this week and this month, sharing one
/// rate table across the three periods.
pub async fn period_totals(
    records: &[ExpenseRecord],
    target: &str,
    currency_provider: &(dyn CurrencyRateProvider + Send + Sync),
    calendar: &Calendar,
    now: DateTime<Utc>,
) -> PeriodTotals {
    let ranges = [Period::Daily, Period::Weekly, Period::Monthly]
        .map(|period| calendar.range(&period, now));
    let relevant: Vec<&ExpenseRecord> = records
        .iter()
        .filter(|record| ranges.iter().any(|range| range.contains(record.timestamp)))
        .collect();
    let rates = resolve_rates(&relevant, target, currency_provider).await;

    let [daily, weekly, monthly] = ranges.map(|range| {
        relevant
            .iter()
            .filter(|record| range.contains(record.timestamp))
            .map(|record| converted(&rates, record, target).unwrap_or(0.0))
            .sum::<f64>()
    });

    PeriodTotals {
        daily,
        weekly,
        monthly,
    }
}

/// The `n` most recent records by expense date.
pub fn recent(records: &[ExpenseRecord], n: usize) -> Vec<ExpenseRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::convert::tests::MockCurrencyProvider;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap()
    }

    fn ts(day: u32, hour: u32) -> i64 {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn expense(
        id: &str,
        category: Category,
        amount: f64,
        currency: &str,
        timestamp: i64,
    ) -> ExpenseRecord {
        ExpenseRecord {
            id: id.to_string(),
            title: id.to_string(),
            category,
            description: String::new(),
            amount,
            timestamp,
            full_date: String::new(),
            currency: currency.to_string(),
        }
    }

    fn march() -> AggregationRequest {
        AggregationRequest::new(Period::month(2024, 3).unwrap(), "USD")
    }

    #[tokio::test]
    async fn test_same_currency_scenario() {
        let provider = MockCurrencyProvider::new();
        let records = vec![
            expense("a", Category::FoodDrinks, 100.0, "USD", ts(5, 9)),
            expense("b", Category::FoodDrinks, 50.0, "USD", ts(5, 18)),
        ];

        let result = aggregate(&records, &march(), &provider, &Calendar::default(), now()).await;

        assert_eq!(result.category_totals, BTreeMap::from([(Category::FoodDrinks, 150.0)]));
        assert_eq!(result.daily_totals, BTreeMap::from([(day(5), 150.0)]));
        assert_eq!(result.total, 150.0);
        assert_eq!(result.record_count, 2);
        assert!(result.unconverted.is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_fixed_rate_scales_each_group() {
        let provider = MockCurrencyProvider::new().with_rate("eur", "usd", 2.0);
        let records = vec![
            expense("a", Category::FoodDrinks, 10.0, "EUR", ts(7, 8)),
            expense("b", Category::Transport, 3.5, "EUR", ts(7, 9)),
            expense("c", Category::Transport, 1.5, "EUR", ts(7, 10)),
        ];

        let result = aggregate(&records, &march(), &provider, &Calendar::default(), now()).await;

        assert_eq!(
            result.category_totals,
            BTreeMap::from([(Category::FoodDrinks, 20.0), (Category::Transport, 10.0)])
        );
        assert_eq!(result.daily_totals, BTreeMap::from([(day(7), 30.0)]));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_rates_contribute_zero() {
        let provider = MockCurrencyProvider::new();
        let records = vec![
            expense("a", Category::Health, 80.0, "GBP", ts(2, 8)),
            expense("b", Category::Shopping, 25.0, "USD", ts(3, 8)),
        ];

        let result = aggregate(&records, &march(), &provider, &Calendar::default(), now()).await;

        assert_eq!(result.category_totals[&Category::Health], 0.0);
        assert_eq!(result.category_totals[&Category::Shopping], 25.0);
        assert_eq!(result.daily_totals[&day(2)], 0.0);
        assert_eq!(result.total, 25.0);
        assert_eq!(result.unconverted, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_only_present_categories_and_sums_match() {
        let provider = MockCurrencyProvider::new()
            .with_rate("eur", "usd", 1.1)
            .with_rate("jpy", "usd", 0.007);
        let records = vec![
            expense("a", Category::FoodDrinks, 12.0, "EUR", ts(1, 0)),
            expense("b", Category::Entertainment, 3000.0, "JPY", ts(15, 12)),
            expense("c", Category::FoodDrinks, 8.0, "USD", ts(31, 23)),
            // outside March
            expense("d", Category::Health, 99.0, "USD", ts(1, 0) - 1),
        ];
        let calendar = Calendar::default();

        let first = aggregate(&records, &march(), &provider, &calendar, now()).await;
        let second = aggregate(&records, &march(), &provider, &calendar, now()).await;

        assert_eq!(first, second);
        assert!(!first.category_totals.contains_key(&Category::Health));
        assert_eq!(first.record_count, 3);
        let category_sum: f64 = first.category_totals.values().sum();
        let daily_sum: f64 = first.daily_totals.values().sum();
        assert!((category_sum - first.total).abs() < 1e-9);
        assert!((daily_sum - first.total).abs() < 1e-9);
        assert!((first.total - (12.0 * 1.1 + 3000.0 * 0.007 + 8.0)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_editing_a_record_changes_only_its_groups() {
        let provider = MockCurrencyProvider::new();
        let mut records = vec![
            expense("a", Category::FoodDrinks, 10.0, "USD", ts(4, 8)),
            expense("b", Category::Transport, 5.0, "USD", ts(6, 8)),
            expense("c", Category::Shopping, 7.0, "USD", ts(9, 8)),
        ];
        let calendar = Calendar::default();
        let before = aggregate(&records, &march(), &provider, &calendar, now()).await;

        records[1].amount = 15.0;
        let after = aggregate(&records, &march(), &provider, &calendar, now()).await;

        assert_eq!(after.category_totals[&Category::Transport], 15.0);
        assert_eq!(after.daily_totals[&day(6)], 15.0);
        for (category, value) in &before.category_totals {
            if *category != Category::Transport {
                assert_eq!(after.category_totals[category], *value);
            }
        }
        for (date, value) in &before.daily_totals {
            if *date != day(6) {
                assert_eq!(after.daily_totals[date], *value);
            }
        }
    }

    #[tokio::test]
    async fn test_records_without_currency_count_as_display_currency() {
        let provider = MockCurrencyProvider::new();
        let records = vec![expense("a", Category::Other, 4.0, "", ts(10, 10))];

        let result = aggregate(&records, &march(), &provider, &Calendar::default(), now()).await;

        assert_eq!(result.total, 4.0);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_period_totals() {
        let provider = MockCurrencyProvider::new().with_rate("eur", "usd", 2.0);
        // 2024-03-20 is a Wednesday; week starts Monday the 18th
        let records = vec![
            expense("today", Category::FoodDrinks, 1.0, "EUR", ts(20, 9)),
            expense("monday", Category::FoodDrinks, 4.0, "USD", ts(18, 9)),
            expense("early", Category::FoodDrinks, 8.0, "EUR", ts(2, 9)),
            expense("february", Category::FoodDrinks, 100.0, "USD", ts(1, 0) - 1),
        ];

        let totals = period_totals(&records, "USD", &provider, &Calendar::default(), now()).await;

        assert_eq!(
            totals,
            PeriodTotals {
                daily: 2.0,
                weekly: 6.0,
                monthly: 22.0,
            }
        );
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_recent_orders_by_expense_date() {
        let records = vec![
            expense("old", Category::Other, 1.0, "USD", ts(1, 0)),
            expense("new", Category::Other, 1.0, "USD", ts(9, 0)),
            expense("mid", Category::Other, 1.0, "USD", ts(5, 0)),
        ];
        let ids: Vec<String> = recent(&records, 2).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["new".to_string(), "mid".to_string()]);
    }
}
