//! Expense records and their categories

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    FoodDrinks,
    Transport,
    Shopping,
    Entertainment,
    Health,
    HomeBills,
    #[serde(rename = "EDUCATION_SELFCARE")]
    EducationSelfCare,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::FoodDrinks,
        Category::Transport,
        Category::Shopping,
        Category::Entertainment,
        Category::Health,
        Category::HomeBills,
        Category::EducationSelfCare,
        Category::Other,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::FoodDrinks => "Food & Drinks",
            Category::Transport => "Transport",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::Health => "Health",
            Category::HomeBills => "Home & Bills",
            Category::EducationSelfCare => "Education & Self-care",
            Category::Other => "Other",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    /// Accepts display names ("Home & Bills"), slugs ("home-bills",
    /// "home_bills") and variant names, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "fooddrinks" | "food" => Ok(Category::FoodDrinks),
            "transport" => Ok(Category::Transport),
            "shopping" => Ok(Category::Shopping),
            "entertainment" => Ok(Category::Entertainment),
            "health" => Ok(Category::Health),
            "homebills" | "home" | "bills" => Ok(Category::HomeBills),
            "educationselfcare" | "education" | "selfcare" => Ok(Category::EducationSelfCare),
            "other" => Ok(Category::Other),
            _ => Err(anyhow::anyhow!("Invalid category: {}", s)),
        }
    }
}

/// A single recorded expense.
///
/// `timestamp` is the date of the expense itself in epoch milliseconds, not
/// the time the record was created. `full_date` is a display copy of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    pub timestamp: i64,
    #[serde(default)]
    pub full_date: String,
    #[serde(default)]
    pub currency: String,
}

impl ExpenseRecord {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            bail!("Expense id must not be empty");
        }
        if self.title.trim().is_empty() {
            bail!("Expense title must not be empty");
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            bail!(
                "Expense amount must be a non-negative number, got {}",
                self.amount
            );
        }
        Ok(())
    }

    /// Currency the amount is expressed in, falling back to `display` for
    /// records saved without one.
    pub fn currency_or<'a>(&'a self, display: &'a str) -> &'a str {
        if self.currency.trim().is_empty() {
            display
        } else {
            &self.currency
        }
    }
}
