use super::ChangeFeeds;
use crate::core::expense::ExpenseRecord;
use crate::core::store::{ExpenseStore, UserProfile, sort_recent_first};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use tokio::sync::watch;
use tracing::{debug, warn};

const EXPENSES_PARTITION: &str = "expenses";
const PROFILES_PARTITION: &str = "profiles";

/// Expense documents persisted as JSON in a fjall keyspace, keyed by
/// `{user}/{id}`.
pub struct DiskExpenseStore {
    keyspace: Keyspace,
    expenses: PartitionHandle,
    profiles: PartitionHandle,
    feeds: ChangeFeeds,
}

impl DiskExpenseStore {
    pub fn new(keyspace: Keyspace) -> Result<Self> {
        let expenses = keyspace
            .open_partition(EXPENSES_PARTITION, PartitionCreateOptions::default())
            .context("Failed to open expenses partition")?;
        let profiles = keyspace
            .open_partition(PROFILES_PARTITION, PartitionCreateOptions::default())
            .context("Failed to open profiles partition")?;
        Ok(Self {
            keyspace,
            expenses,
            profiles,
            feeds: ChangeFeeds::default(),
        })
    }

    fn user_prefix(user: &str) -> String {
        format!("{user}/")
    }

    fn record_key(user: &str, id: &str) -> String {
        format!("{user}/{id}")
    }

    fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist data store")
    }
}

#[async_trait]
impl ExpenseStore for DiskExpenseStore {
    async fn upsert(&self, user: &str, record: &ExpenseRecord) -> Result<()> {
        record.validate()?;
        let key = Self::record_key(user, &record.id);
        self.expenses
            .insert(key.as_str(), serde_json::to_vec(record)?)
            .with_context(|| format!("Failed to store expense {}", record.id))?;
        self.persist()?;
        debug!("Stored expense {key}");
        self.feeds.notify(user);
        Ok(())
    }

    async fn delete(&self, user: &str, id: &str) -> Result<bool> {
        let key = Self::record_key(user, id);
        if self.expenses.get(&key)?.is_none() {
            return Ok(false);
        }
        self.expenses
            .remove(key.as_str())
            .with_context(|| format!("Failed to delete expense {id}"))?;
        self.persist()?;
        debug!("Deleted expense {key}");
        self.feeds.notify(user);
        Ok(true)
    }

    async fn get(&self, user: &str, id: &str) -> Result<Option<ExpenseRecord>> {
        let key = Self::record_key(user, id);
        match self.expenses.get(&key)? {
            Some(value) => {
                let record = serde_json::from_slice(&value)
                    .with_context(|| format!("Malformed expense document {key}"))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, user: &str) -> Result<Vec<ExpenseRecord>> {
        let mut records = Vec::new();
        for item in self.expenses.prefix(Self::user_prefix(user)) {
            let (key, value) = item?;
            match serde_json::from_slice::<ExpenseRecord>(&value) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    key = %String::from_utf8_lossy(&key),
                    error = %e,
                    "Skipping malformed expense document"
                ),
            }
        }
        sort_recent_first(&mut records);
        Ok(records)
    }

    fn subscribe(&self, user: &str) -> watch::Receiver<u64> {
        self.feeds.subscribe(user)
    }

    async fn put_profile(&self, profile: &UserProfile) -> Result<()> {
        self.profiles
            .insert(profile.uid.as_str(), serde_json::to_vec(profile)?)
            .context("Failed to store user profile")?;
        self.persist()
    }

    async fn profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        match self.profiles.get(uid)? {
            Some(value) => Ok(Some(
                serde_json::from_slice(&value).context("Malformed user profile")?,
            )),
            None => Ok(None),
        }
    }
}
