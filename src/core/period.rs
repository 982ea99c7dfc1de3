//! Calendar periods and the time ranges they select.

use crate::core::expense::ExpenseRecord;
use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    /// Today.
    Daily,
    /// Start of the current week up to now.
    Weekly,
    /// The current calendar month.
    Monthly,
    /// An explicit calendar month, `month` in `1..=12`.
    Month { year: i32, month: u32 },
}

impl Period {
    pub fn month(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            bail!("Invalid month: {month}");
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            bail!("Year out of range: {year}");
        }
        Ok(Period::Month { year, month })
    }

    /// Moves an explicit month forward or backward, rolling the year over.
    /// Other periods, and shifts past the representable years, are returned
    /// unchanged.
    pub fn shift_months(&self, delta: i32) -> Self {
        match *self {
            Period::Month { year, month } => {
                let index = year
                    .checked_mul(12)
                    .and_then(|index| index.checked_add(month as i32 - 1))
                    .and_then(|index| index.checked_add(delta));
                match index {
                    Some(index) => Period::Month {
                        year: index.div_euclid(12),
                        month: index.rem_euclid(12) as u32 + 1,
                    },
                    None => *self,
                }
            }
            other => other,
        }
    }

    pub fn next(&self) -> Self {
        self.shift_months(1)
    }

    pub fn previous(&self) -> Self {
        self.shift_months(-1)
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Period::Daily => write!(f, "daily"),
            Period::Weekly => write!(f, "weekly"),
            Period::Monthly => write!(f, "monthly"),
            Period::Month { year, month } => write!(f, "{year:04}-{month:02}"),
        }
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "day" | "today" => Ok(Period::Daily),
            "weekly" | "week" => Ok(Period::Weekly),
            "monthly" | "month" => Ok(Period::Monthly),
            other => {
                let (year, month) = other
                    .split_once('-')
                    .ok_or_else(|| anyhow!("Invalid period: {}", s))?;
                let year = year
                    .parse::<i32>()
                    .map_err(|_| anyhow!("Invalid year in period: {}", s))?;
                let month = month
                    .parse::<u32>()
                    .map_err(|_| anyhow!("Invalid month in period: {}", s))?;
                Period::month(year, month)
            }
        }
    }
}

/// Half-open interval `[start, end)` in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: i64,
    pub end: i64,
}

impl DateRange {
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp < self.end
    }

    pub fn filter<'a>(&self, records: &'a [ExpenseRecord]) -> Vec<&'a ExpenseRecord> {
        records
            .iter()
            .filter(|record| self.contains(record.timestamp))
            .collect()
    }
}

/// Timezone and week convention used to turn periods into ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    pub tz: Tz,
    pub week_start: Weekday,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            tz: Tz::UTC,
            week_start: Weekday::Mon,
        }
    }
}

impl Calendar {
    pub fn new(tz: Tz, week_start: Weekday) -> Self {
        Self { tz, week_start }
    }

    /// Local calendar date of an epoch-millisecond timestamp.
    pub fn local_date(&self, timestamp: i64) -> NaiveDate {
        DateTime::<Utc>::from_timestamp_millis(timestamp)
            .unwrap_or_default()
            .with_timezone(&self.tz)
            .date_naive()
    }

    /// Epoch milliseconds of local midnight at the start of `date`.
    ///
    /// When midnight falls in a DST gap the first valid local instant after
    /// it is used.
    pub fn start_of_day(&self, date: NaiveDate) -> i64 {
        let midnight = date.and_time(NaiveTime::MIN);
        (0..=180)
            .find_map(|minutes| {
                self.tz
                    .from_local_datetime(&(midnight + Duration::minutes(minutes)))
                    .earliest()
            })
            .map(|dt| dt.timestamp_millis())
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight).timestamp_millis())
    }

    /// Current month as an explicit [`Period::Month`].
    pub fn current_month(&self, now: DateTime<Utc>) -> Period {
        let today = now.with_timezone(&self.tz).date_naive();
        Period::Month {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn range(&self, period: &Period, now: DateTime<Utc>) -> DateRange {
        let today = now.with_timezone(&self.tz).date_naive();
        match *period {
            Period::Daily => DateRange {
                start: self.start_of_day(today),
                end: self.start_of_day(today.succ_opt().unwrap_or(today)),
            },
            Period::Weekly => {
                let days_back = (today.weekday().num_days_from_monday() + 7
                    - self.week_start.num_days_from_monday())
                    % 7;
                let week_start = today - Duration::days(i64::from(days_back));
                DateRange {
                    start: self.start_of_day(week_start),
                    end: now.timestamp_millis() + 1,
                }
            }
            Period::Monthly => self.month_range(today.year(), today.month()).unwrap_or_else(|| {
                DateRange {
                    start: now.timestamp_millis(),
                    end: now.timestamp_millis(),
                }
            }),
            Period::Month { year, month } => {
                self.month_range(year, month).unwrap_or_else(|| {
                    warn!("Invalid month {year}-{month}, selecting nothing");
                    DateRange {
                        start: now.timestamp_millis(),
                        end: now.timestamp_millis(),
                    }
                })
            }
        }
    }

    fn month_range(&self, year: i32, month: u32) -> Option<DateRange> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let Period::Month {
            year: next_year,
            month: next_month,
        } = (Period::Month { year, month }).shift_months(1)
        else {
            return None;
        };
        let next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
        Some(DateRange {
            start: self.start_of_day(first),
            end: self.start_of_day(next),
        })
    }
}
