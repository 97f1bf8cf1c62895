//! The external item store and its optional sync capability

use futures::future::BoxFuture;
use futures::FutureExt;
use inboxview_core::Item;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store does not support sync")]
    SyncUnsupported,
    #[error("sync failed: {0}")]
    SyncFailed(String),
}

/// Owner of the inbox messages. The tracker only reads snapshots and
/// delegates mutations here.
pub trait ItemStore: Send + Sync {
    fn fetch_current_items(&self) -> Vec<Item>;

    /// Number of items. Override when the store can answer without copying.
    fn total_count(&self) -> usize {
        self.fetch_current_items().len()
    }

    fn unread_count(&self) -> usize;

    fn mark_read(&self, id: &str);

    fn remove(&self, id: &str);

    /// Change notifications. The value is a generation counter; dropping the
    /// receiver ends the subscription.
    fn subscribe(&self) -> watch::Receiver<u64>;

    /// Stores that can talk to a backend expose it here
    fn as_sync_capable(&self) -> Option<&dyn SyncCapableStore> {
        None
    }
}

pub trait SyncCapableStore: Send + Sync {
    /// Ask the backend for fresh messages. Resolves to whether the sync ran.
    fn schedule_sync(&self) -> BoxFuture<'static, Result<bool, StoreError>>;
}

/// In-process store backed by a vector
#[derive(Debug)]
pub struct MemoryStore {
    items: Mutex<Vec<Item>>,
    changes: watch::Sender<u64>,
}

impl MemoryStore {
    pub fn new(items: Vec<Item>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            items: Mutex::new(items),
            changes,
        }
    }

    /// Replace all items and notify subscribers
    pub fn set_items(&self, items: Vec<Item>) {
        if let Ok(mut current) = self.items.lock() {
            *current = items;
        }
        self.notify();
    }

    fn notify(&self) {
        self.changes.send_modify(|generation| *generation += 1);
    }

    fn update<F: FnOnce(&mut Vec<Item>) -> bool>(&self, f: F) {
        let changed = match self.items.lock() {
            Ok(mut items) => f(&mut items),
            Err(_) => {
                tracing::warn!("memory store poisoned");
                false
            }
        };
        if changed {
            self.notify();
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ItemStore for MemoryStore {
    fn fetch_current_items(&self) -> Vec<Item> {
        self.items.lock().map(|items| items.clone()).unwrap_or_default()
    }

    fn total_count(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    fn unread_count(&self) -> usize {
        self.items
            .lock()
            .map(|items| items.iter().filter(|item| !item.read).count())
            .unwrap_or(0)
    }

    fn mark_read(&self, id: &str) {
        self.update(|items| match items.iter_mut().find(|item| item.id == id) {
            Some(item) if !item.read => {
                item.read = true;
                true
            }
            _ => false,
        });
    }

    fn remove(&self, id: &str) {
        self.update(|items| {
            let before = items.len();
            items.retain(|item| item.id != id);
            items.len() != before
        });
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

/// A sync future that resolves immediately
pub(crate) fn ready_sync(result: Result<bool, StoreError>) -> BoxFuture<'static, Result<bool, StoreError>> {
    futures::future::ready(result).boxed()
}
