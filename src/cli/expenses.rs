use super::{AppContext, ui};
use crate::core::expense::{Category, ExpenseRecord};
use crate::core::expenses::{ExpenseFilter, NewExpense};
use crate::core::period::Calendar;
use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use comfy_table::Cell;

/// Expense fields given on the command line. Unset fields keep their
/// current value when editing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFields {
    pub title: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<Category>,
    pub currency: Option<String>,
    /// `YYYY-MM-DD` in the configured timezone.
    pub date: Option<String>,
    pub description: Option<String>,
}

fn parse_date(calendar: &Calendar, date: &str) -> Result<i64> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date {date}, expected YYYY-MM-DD"))?;
    Ok(calendar.start_of_day(date))
}

/// Short form of a record id for tables.
fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub fn expenses_table(records: &[ExpenseRecord]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Title"),
        ui::header_cell("Category"),
        ui::header_cell("Amount"),
        ui::header_cell("Currency"),
        ui::header_cell("Id"),
    ]);
    for record in records {
        table.add_row(vec![
            Cell::new(&record.full_date),
            Cell::new(&record.title),
            Cell::new(record.category.display_name()),
            ui::amount_cell(record.amount),
            Cell::new(&record.currency),
            Cell::new(short_id(&record.id)),
        ]);
    }
    table.to_string()
}

fn print_records(records: &[ExpenseRecord]) {
    if records.is_empty() {
        println!("{}", ui::style_text("No expenses found", ui::StyleType::Subtle));
    } else {
        println!("{}", expenses_table(records));
    }
}

/// Resolves a full id or a unique id prefix as shown in tables.
async fn resolve_id(ctx: &AppContext, id: &str) -> Result<String> {
    if ctx.expenses.get(id).await?.is_some() {
        return Ok(id.to_string());
    }
    let matches: Vec<String> = ctx
        .expenses
        .all()
        .await?
        .into_iter()
        .map(|record| record.id)
        .filter(|candidate| candidate.starts_with(id))
        .collect();
    match matches.as_slice() {
        [single] => Ok(single.clone()),
        [] => Err(anyhow!("Expense not found: {id}")),
        _ => Err(anyhow!("Ambiguous expense id: {id}")),
    }
}

pub async fn add(ctx: &AppContext, fields: ExpenseFields) -> Result<()> {
    let title = fields
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| anyhow!("A title is required"))?;
    let amount = fields.amount.ok_or_else(|| anyhow!("An amount is required"))?;
    let timestamp = match fields.date.as_deref() {
        Some(date) => parse_date(&ctx.calendar, date)?,
        None => Utc::now().timestamp_millis(),
    };

    let record = ctx
        .expenses
        .add(NewExpense {
            title,
            category: fields.category.unwrap_or_default(),
            description: fields.description.unwrap_or_default(),
            amount,
            timestamp,
            currency: fields.currency.unwrap_or_else(|| ctx.currency.clone()),
        })
        .await?;
    println!("Added expense {}", ui::style_text(&record.id, ui::StyleType::Subtle));
    print_records(&[record]);
    Ok(())
}

pub async fn edit(ctx: &AppContext, id: &str, fields: ExpenseFields) -> Result<()> {
    let id = resolve_id(ctx, id).await?;
    let mut record = ctx
        .expenses
        .get(&id)
        .await?
        .ok_or_else(|| anyhow!("Expense not found: {id}"))?;

    if let Some(title) = fields.title {
        record.title = title;
    }
    if let Some(amount) = fields.amount {
        record.amount = amount;
    }
    if let Some(category) = fields.category {
        record.category = category;
    }
    if let Some(currency) = fields.currency {
        record.currency = currency;
    }
    if let Some(description) = fields.description {
        record.description = description;
    }
    if let Some(date) = fields.date.as_deref() {
        record.timestamp = parse_date(&ctx.calendar, date)?;
    }

    let record = ctx.expenses.edit(record).await?;
    println!("Updated expense");
    print_records(&[record]);
    Ok(())
}

pub async fn delete(ctx: &AppContext, id: &str) -> Result<()> {
    let id = resolve_id(ctx, id).await?;
    if ctx.expenses.delete(&id).await? {
        println!("Deleted expense {id}");
    } else {
        println!("Expense not found: {id}");
    }
    Ok(())
}

pub async fn show(ctx: &AppContext, id: &str) -> Result<()> {
    let id = resolve_id(ctx, id).await?;
    let record = ctx
        .expenses
        .get(&id)
        .await?
        .ok_or_else(|| anyhow!("Expense not found: {id}"))?;

    println!("{}", ui::style_text(&record.title, ui::StyleType::Title));
    println!("Id:          {}", record.id);
    println!("Date:        {}", record.full_date);
    println!("Category:    {}", record.category);
    println!("Amount:      {:.2} {}", record.amount, record.currency);
    if !record.description.is_empty() {
        println!("Description: {}", record.description);
    }
    Ok(())
}

pub async fn list(
    ctx: &AppContext,
    search: Option<&str>,
    prefix: Option<&str>,
    categories: &[Category],
) -> Result<()> {
    let records = match prefix {
        Some(prefix) => {
            let filter = ExpenseFilter::default().with_categories(categories.iter().copied());
            filter.apply(ctx.expenses.search(prefix).await?)
        }
        None => {
            let mut filter = ExpenseFilter::default().with_categories(categories.iter().copied());
            filter.query = search.map(str::to_string);
            ctx.expenses.filtered(&filter).await?
        }
    };
    print_records(&records);
    Ok(())
}

pub async fn recent(ctx: &AppContext, count: usize) -> Result<()> {
    print_records(&ctx.expenses.recent(count).await?);
    Ok(())
}
