pub mod auth;
pub mod chart;
pub mod convert;
pub mod expenses;
pub mod setup;
pub mod summary;
pub mod ui;

use crate::core::config::AppConfig;
use crate::core::currency::CurrencyRateProvider;
use crate::core::expenses::ExpenseService;
use crate::core::period::Calendar;
use crate::core::store::ExpenseStore;
use crate::providers::CurrencyApiProvider;
use crate::store::accounts::LocalAuthProvider;
use crate::store::disk::DiskExpenseStore;
use crate::store::open_keyspace;
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs, wired from the loaded configuration.
pub struct AppContext {
    pub currency: String,
    pub calendar: Calendar,
    pub store: Arc<dyn ExpenseStore>,
    pub auth: Arc<LocalAuthProvider>,
    pub currency_provider: Arc<dyn CurrencyRateProvider + Send + Sync>,
    pub expenses: ExpenseService,
}

impl AppContext {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let calendar = config.calendar()?;
        let data_path = config.default_data_path()?;
        debug!("Opening data store at {}", data_path.display());

        let keyspace = open_keyspace(&data_path)?;
        let store: Arc<dyn ExpenseStore> = Arc::new(DiskExpenseStore::new(keyspace.clone())?);
        let auth = Arc::new(LocalAuthProvider::new(keyspace, store.clone())?);
        let currency_provider: Arc<dyn CurrencyRateProvider + Send + Sync> =
            Arc::new(CurrencyApiProvider::new(config.currency_api_url()));
        let expenses = ExpenseService::new(store.clone(), auth.clone(), calendar);

        Ok(Self {
            currency: config.currency.trim().to_uppercase(),
            calendar,
            store,
            auth,
            currency_provider,
            expenses,
        })
    }

    /// The `--currency` override, or the configured display currency.
    pub fn display_currency(&self, currency: Option<&str>) -> String {
        currency
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.currency.clone())
    }
}
