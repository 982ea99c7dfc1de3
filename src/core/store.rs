//! Record store abstractions

use crate::core::expense::ExpenseRecord;
use crate::core::period::DateRange;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Profile document provisioned for every registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
}

/// Per-user expense collections.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Creates the record or replaces the one with the same id.
    async fn upsert(&self, user: &str, record: &ExpenseRecord) -> Result<()>;

    /// Returns `true` when a record was removed.
    async fn delete(&self, user: &str, id: &str) -> Result<bool>;

    async fn get(&self, user: &str, id: &str) -> Result<Option<ExpenseRecord>>;

    /// All records of the user, most recent expense date first.
    async fn list(&self, user: &str) -> Result<Vec<ExpenseRecord>>;

    /// Records whose timestamp falls in `range`, most recent first.
    async fn range(&self, user: &str, range: DateRange) -> Result<Vec<ExpenseRecord>> {
        let mut records = self.list(user).await?;
        records.retain(|record| range.contains(record.timestamp));
        Ok(records)
    }

    /// Records whose title starts with `prefix`, ordered by title.
    async fn search_prefix(&self, user: &str, prefix: &str) -> Result<Vec<ExpenseRecord>> {
        let mut records = self.list(user).await?;
        records.retain(|record| record.title.starts_with(prefix));
        records.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(records)
    }

    /// Change feed for the user's collection. The value is bumped after
    /// every write.
    fn subscribe(&self, user: &str) -> watch::Receiver<u64>;

    async fn put_profile(&self, profile: &UserProfile) -> Result<()>;

    async fn profile(&self, uid: &str) -> Result<Option<UserProfile>>;
}

/// Sorts records by expense date, most recent first.
pub fn sort_recent_first(records: &mut [ExpenseRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
}
