pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

pub use crate::core::config;

use crate::cli::AppContext;
use crate::cli::expenses::ExpenseFields;
use crate::core::expense::Category;
use crate::core::period::Period;
use anyhow::Result;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Register { email: String, password: String },
    Login { email: String, password: String },
    Logout,
    Whoami,
    Add(ExpenseFields),
    Edit { id: String, fields: ExpenseFields },
    Delete { id: String },
    Show { id: String },
    List {
        search: Option<String>,
        prefix: Option<String>,
        categories: Vec<Category>,
    },
    Recent { count: usize },
    Summary { currency: Option<String> },
    Chart {
        month: Option<Period>,
        currency: Option<String>,
    },
    Convert { amount: f64, from: String, to: String },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("xpns starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let ctx = AppContext::from_config(&config)?;
    match command {
        AppCommand::Register { email, password } => {
            cli::auth::register(&ctx, &email, &password).await
        }
        AppCommand::Login { email, password } => cli::auth::login(&ctx, &email, &password).await,
        AppCommand::Logout => cli::auth::logout(&ctx).await,
        AppCommand::Whoami => cli::auth::whoami(&ctx).await,
        AppCommand::Add(fields) => cli::expenses::add(&ctx, fields).await,
        AppCommand::Edit { id, fields } => cli::expenses::edit(&ctx, &id, fields).await,
        AppCommand::Delete { id } => cli::expenses::delete(&ctx, &id).await,
        AppCommand::Show { id } => cli::expenses::show(&ctx, &id).await,
        AppCommand::List {
            search,
            prefix,
            categories,
        } => cli::expenses::list(&ctx, search.as_deref(), prefix.as_deref(), &categories).await,
        AppCommand::Recent { count } => cli::expenses::recent(&ctx, count).await,
        AppCommand::Summary { currency } => cli::summary::run(&ctx, currency.as_deref()).await,
        AppCommand::Chart { month, currency } => {
            cli::chart::run(&ctx, month, currency.as_deref()).await
        }
        AppCommand::Convert { amount, from, to } => {
            cli::convert::run(&ctx, amount, &from, &to).await
        }
    }
}
