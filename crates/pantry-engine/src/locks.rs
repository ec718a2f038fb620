//! Per-item mutual exclusion.
//!
//! Daily ticks, catch-up, re-estimation and external quantity reports all read and write
//! the same item record. Holding the item's lock for the whole transition serializes them.

use std::sync::Arc;

use dashmap::DashMap;
use pantry_core::ItemId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of one async mutex per item.
///
/// Entries exist only while some task holds or awaits the item's lock.
#[derive(Debug, Default)]
pub struct ItemLocks {
    locks: DashMap<ItemId, Arc<Mutex<()>>>,
}

impl ItemLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `item_id`. Access ends when the guard is dropped.
    pub async fn lock(&self, item_id: ItemId) -> ItemGuard<'_> {
        // The map shard guard must be released before awaiting.
        let mutex = self.locks.entry(item_id).or_default().value().clone();
        let guard = mutex.lock_owned().await;
        ItemGuard {
            locks: &self.locks,
            item_id,
            guard: Some(guard),
        }
    }

    /// Number of items currently locked or awaited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no item is locked or awaited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one item.
///
/// On drop the lock is released, and the registry entry is removed when no other task
/// shares it.
#[derive(Debug)]
pub struct ItemGuard<'a> {
    locks: &'a DashMap<ItemId, Arc<Mutex<()>>>,
    item_id: ItemId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ItemGuard<'_> {
    fn drop(&mut self) {
        // The owned guard keeps its own reference to the mutex; release it first.
        drop(self.guard.take());
        self.locks
            .remove_if(&self.item_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_item_is_exclusive() {
        let locks = Arc::new(ItemLocks::new());
        let item_id = ItemId::generate();

        let guard = locks.lock(item_id).await;
        let contender = tokio::spawn({
            let locks = Arc::clone(&locks);
            async move {
                let _guard = locks.lock(item_id).await;
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(5), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_items_do_not_block() {
        let locks = ItemLocks::new();
        let _a = locks.lock(ItemId::generate()).await;
        let _b = tokio::time::timeout(Duration::from_secs(1), locks.lock(ItemId::generate()))
            .await
            .unwrap();
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn released_locks_are_pruned() {
        let locks = ItemLocks::new();
        let item_id = ItemId::generate();

        let guard = locks.lock(item_id).await;
        assert_eq!(locks.len(), 1);
        drop(guard);
        assert!(locks.is_empty());

        // A pruned item can be locked again.
        let _again = locks.lock(item_id).await;
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn entry_survives_while_a_contender_waits() {
        let locks = Arc::new(ItemLocks::new());
        let item_id = ItemId::generate();

        let guard = locks.lock(item_id).await;
        let (acquired_tx, acquired_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let contender = tokio::spawn({
            let locks = Arc::clone(&locks);
            async move {
                let _guard = locks.lock(item_id).await;
                let _ = acquired_tx.send(());
                let _ = release_rx.await;
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);
        tokio::time::timeout(Duration::from_secs(5), acquired_rx)
            .await
            .unwrap()
            .unwrap();
        // The contender now holds the same mutex, so the entry stays.
        assert_eq!(locks.len(), 1);

        release_tx.send(()).unwrap();
        contender.await.unwrap();
        assert!(locks.is_empty());
    }
}
