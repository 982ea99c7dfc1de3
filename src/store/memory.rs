use super::ChangeFeeds;
use crate::core::expense::ExpenseRecord;
use crate::core::store::{ExpenseStore, UserProfile, sort_recent_first};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::debug;

/// In-memory record store, used for tests and dry runs.
#[derive(Default)]
pub struct MemoryExpenseStore {
    records: Arc<Mutex<HashMap<String, HashMap<String, ExpenseRecord>>>>,
    profiles: Arc<Mutex<HashMap<String, UserProfile>>>,
    feeds: ChangeFeeds,
}

impl MemoryExpenseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExpenseStore for MemoryExpenseStore {
    async fn upsert(&self, user: &str, record: &ExpenseRecord) -> Result<()> {
        record.validate()?;
        let mut records = self.records.lock().await;
        records
            .entry(user.to_string())
            .or_default()
            .insert(record.id.clone(), record.clone());
        drop(records);
        debug!("Stored expense {} for {}", record.id, user);
        self.feeds.notify(user);
        Ok(())
    }

    async fn delete(&self, user: &str, id: &str) -> Result<bool> {
        let removed = self
            .records
            .lock()
            .await
            .get_mut(user)
            .and_then(|records| records.remove(id))
            .is_some();
        if removed {
            debug!("Deleted expense {} for {}", id, user);
            self.feeds.notify(user);
        }
        Ok(removed)
    }

    async fn get(&self, user: &str, id: &str) -> Result<Option<ExpenseRecord>> {
        let records = self.records.lock().await;
        Ok(records.get(user).and_then(|r| r.get(id)).cloned())
    }

    async fn list(&self, user: &str) -> Result<Vec<ExpenseRecord>> {
        let mut list: Vec<ExpenseRecord> = self
            .records
            .lock()
            .await
            .get(user)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default();
        sort_recent_first(&mut list);
        Ok(list)
    }

    fn subscribe(&self, user: &str) -> watch::Receiver<u64> {
        self.feeds.subscribe(user)
    }

    async fn put_profile(&self, profile: &UserProfile) -> Result<()> {
        self.profiles
            .lock()
            .await
            .insert(profile.uid.clone(), profile.clone());
        Ok(())
    }

    async fn profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        Ok(self.profiles.lock().await.get(uid).cloned())
    }
}
