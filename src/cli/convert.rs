use super::{AppContext, ui};
use crate::core::convert::AmountConverter;
use anyhow::{Result, bail};

pub async fn run(ctx: &AppContext, amount: f64, from: &str, to: &str) -> Result<()> {
    if !amount.is_finite() {
        bail!("Invalid amount: {amount}");
    }
    let converter = AmountConverter::new(ctx.currency_provider.as_ref());

    let pb = ui::new_spinner("Fetching exchange rate...");
    let converted = converter.convert(amount, from, to).await;
    pb.finish_and_clear();

    match converted {
        Some(value) => println!(
            "{:.2} {} = {} {}",
            amount,
            from.to_uppercase(),
            ui::style_text(&format!("{value:.2}"), ui::StyleType::TotalValue),
            to.to_uppercase()
        ),
        None => bail!(
            "No exchange rate available for {} to {}",
            from.to_uppercase(),
            to.to_uppercase()
        ),
    }
    Ok(())
}
