//! Core business logic abstractions

pub mod aggregate;
pub mod auth;
pub mod config;
pub mod convert;
pub mod currency;
pub mod expense;
pub mod expenses;
pub mod log;
pub mod orchestrator;
pub mod period;
pub mod store;

// Re-export main types for cleaner imports
pub use aggregate::{AggregationRequest, AggregationResult, aggregate};
pub use auth::{AuthError, AuthProvider, User};
pub use currency::CurrencyRateProvider;
pub use expense::{Category, ExpenseRecord};
pub use period::{Calendar, DateRange, Period};
pub use store::ExpenseStore;
