pub mod accounts;
pub mod disk;
pub mod memory;

use anyhow::{Context, Result};
use fjall::Keyspace;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

/// Opens (or creates) the keyspace holding accounts, sessions and expenses.
pub fn open_keyspace(path: &Path) -> Result<Keyspace> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create data directory: {}", path.display()))?;
    fjall::Config::new(path)
        .open()
        .with_context(|| format!("Failed to open data store at {}", path.display()))
}

/// Per-user version counters backing [`crate::core::store::ExpenseStore::subscribe`].
#[derive(Default)]
pub(crate) struct ChangeFeeds {
    senders: Mutex<HashMap<String, watch::Sender<u64>>>,
}

impl ChangeFeeds {
    pub(crate) fn subscribe(&self, user: &str) -> watch::Receiver<u64> {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        senders
            .entry(user.to_string())
            .or_insert_with(|| watch::channel(0).0)
            .subscribe()
    }

    pub(crate) fn notify(&self, user: &str) {
        let senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = senders.get(user) {
            sender.send_modify(|version| *version += 1);
        }
    }
}
