use super::{AppContext, ui};
use crate::core::auth::AuthProvider;
use anyhow::Result;

pub async fn register(ctx: &AppContext, email: &str, password: &str) -> Result<()> {
    let user = ctx.auth.register(email, password).await?;
    println!(
        "Registered and signed in as {}",
        ui::style_text(&user.email, ui::StyleType::TotalLabel)
    );
    Ok(())
}

pub async fn login(ctx: &AppContext, email: &str, password: &str) -> Result<()> {
    let user = ctx.auth.login(email, password).await?;
    println!(
        "Signed in as {}",
        ui::style_text(&user.email, ui::StyleType::TotalLabel)
    );
    Ok(())
}

pub async fn logout(ctx: &AppContext) -> Result<()> {
    ctx.auth.sign_out().await?;
    println!("Signed out");
    Ok(())
}

pub async fn whoami(ctx: &AppContext) -> Result<()> {
    match ctx.auth.current_user().await? {
        Some(user) => println!(
            "{} {}",
            user.email,
            ui::style_text(&format!("({})", user.uid), ui::StyleType::Subtle)
        ),
        None => println!(
            "{}",
            ui::style_text("Not signed in", ui::StyleType::Subtle)
        ),
    }
    Ok(())
}
