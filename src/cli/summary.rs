use super::expenses::expenses_table;
use super::{AppContext, ui};
use crate::core::aggregate::{PeriodTotals, period_totals, recent};
use anyhow::Result;
use chrono::Utc;
use comfy_table::Cell;

const RECENT_COUNT: usize = 5;

pub fn totals_table(totals: &PeriodTotals, currency: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Period"),
        ui::header_cell(&format!("Spent ({currency})")),
    ]);
    for (label, value) in [
        ("Today", totals.daily),
        ("This week", totals.weekly),
        ("This month", totals.monthly),
    ] {
        table.add_row(vec![Cell::new(label), ui::amount_cell(value)]);
    }
    table.to_string()
}

/// Spending today, this week and this month, followed by the latest expenses.
pub async fn run(ctx: &AppContext, currency: Option<&str>) -> Result<()> {
    let currency = ctx.display_currency(currency);
    let records = ctx.expenses.all().await?;

    let pb = ui::new_spinner("Fetching exchange rates...");
    let totals = period_totals(
        &records,
        &currency,
        ctx.currency_provider.as_ref(),
        &ctx.calendar,
        Utc::now(),
    )
    .await;
    pb.finish_and_clear();

    println!("{}\n", ui::style_text("Spending", ui::StyleType::Title));
    println!("{}", totals_table(&totals, &currency));

    let latest = recent(&records, RECENT_COUNT);
    if !latest.is_empty() {
        ui::print_separator();
        println!("{}\n", ui::style_text("Recent expenses", ui::StyleType::Title));
        println!("{}", expenses_table(&latest));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_table() {
        let table = totals_table(
            &PeriodTotals {
                daily: 2.0,
                weekly: 6.5,
                monthly: 22.25,
            },
            "EUR",
        );
        assert!(table.contains("Spent (EUR)"));
        assert!(table.contains("This week"));
        assert!(table.contains("6.50"));
        assert!(table.contains("22.25"));
    }
}
