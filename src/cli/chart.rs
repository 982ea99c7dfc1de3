use super::{AppContext, ui};
use crate::core::aggregate::{AggregationRequest, AggregationResult};
use crate::core::auth::AuthProvider;
use crate::core::orchestrator::Orchestrator;
use crate::core::period::Period;
use anyhow::Result;
use chrono::Utc;
use comfy_table::Cell;

const BAR_WIDTH: usize = 30;

fn max_value<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    values.copied().fold(0.0, f64::max)
}

pub fn render_chart(result: &AggregationResult) -> String {
    let currency = &result.request.target_currency;
    let mut output = format!(
        "Spending {} ({})\n\n",
        ui::style_text(&result.request.period.to_string(), ui::StyleType::Title),
        currency
    );

    if result.category_totals.is_empty() {
        output.push_str(&ui::style_text("No expenses in this period", ui::StyleType::Subtle));
        return output;
    }

    let mut by_category = ui::new_styled_table();
    by_category.set_header(vec![
        ui::header_cell("Category"),
        ui::header_cell(&format!("Total ({currency})")),
        ui::header_cell("Share"),
        ui::header_cell(""),
    ]);
    let max = max_value(result.category_totals.values());
    for (category, total) in &result.category_totals {
        let share = if result.total > 0.0 {
            Some(total / result.total * 100.0)
        } else {
            None
        };
        by_category.add_row(vec![
            Cell::new(category.display_name()),
            ui::amount_cell(*total),
            ui::format_optional_cell(share, |s| format!("{s:.1}%")),
            Cell::new(ui::bar(*total, max, BAR_WIDTH)),
        ]);
    }
    output.push_str(&by_category.to_string());

    let mut by_day = ui::new_styled_table();
    by_day.set_header(vec![
        ui::header_cell("Day"),
        ui::header_cell(&format!("Total ({currency})")),
        ui::header_cell(""),
    ]);
    let max = max_value(result.daily_totals.values());
    for (day, total) in &result.daily_totals {
        by_day.add_row(vec![
            Cell::new(day.format("%a %d").to_string()),
            ui::amount_cell(*total),
            Cell::new(ui::bar(*total, max, BAR_WIDTH)),
        ]);
    }
    output.push_str("\n\n");
    output.push_str(&by_day.to_string());

    output.push_str(&format!(
        "\n\nTotal ({}): {}",
        ui::style_text(currency, ui::StyleType::TotalLabel),
        ui::style_text(&format!("{:.2}", result.total), ui::StyleType::TotalValue)
    ));
    if !result.unconverted.is_empty() {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!(
                    "{} expense(s) could not be converted to {} and count as 0",
                    result.unconverted.len(),
                    currency
                ),
                ui::StyleType::Error
            )
        ));
    }
    output
}

/// Category and daily breakdown for one month, the current one by default.
pub async fn run(ctx: &AppContext, month: Option<Period>, currency: Option<&str>) -> Result<()> {
    let user = ctx.auth.require_user().await?;
    let period = month.unwrap_or_else(|| ctx.calendar.current_month(Utc::now()));
    let request = AggregationRequest::new(period, &ctx.display_currency(currency));

    let orchestrator = Orchestrator::new(
        ctx.store.clone(),
        ctx.currency_provider.clone(),
        ctx.calendar,
        &user.uid,
        request,
    );

    let pb = ui::new_spinner("Fetching exchange rates...");
    orchestrator.refresh().await?;
    let result = orchestrator.wait_ready().await?;
    pb.finish_and_clear();

    println!("{}", render_chart(&result));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expense::Category;
    use crate::core::period::DateRange;
    use chrono::NaiveDate;

    fn result() -> AggregationResult {
        let request = AggregationRequest::new(Period::month(2024, 3).unwrap(), "usd");
        let mut result = AggregationResult::empty(request, DateRange { start: 0, end: 1 });
        result.category_totals.insert(Category::FoodDrinks, 75.0);
        result.category_totals.insert(Category::Transport, 25.0);
        result
            .daily_totals
            .insert(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(), 100.0);
        result.total = 100.0;
        result.record_count = 3;
        result
    }

    #[test]
    fn test_render_chart() {
        let output = render_chart(&result());
        assert!(output.contains("2024-03"));
        assert!(output.contains("Food & Drinks"));
        assert!(output.contains("75.0%"));
        assert!(output.contains("Tue 05"));
        assert!(output.contains("100.00"));
        assert!(!output.contains("could not be converted"));
    }

    #[test]
    fn test_render_chart_reports_unconverted() {
        let mut result = result();
        result.unconverted = vec!["a".to_string()];
        assert!(render_chart(&result).contains("1 expense(s) could not be converted to USD"));
    }

    #[test]
    fn test_render_empty_chart() {
        let request = AggregationRequest::new(Period::month(2024, 4).unwrap(), "EUR");
        let result = AggregationResult::empty(request, DateRange { start: 0, end: 1 });
        assert!(render_chart(&result).contains("No expenses in this period"));
    }
}
