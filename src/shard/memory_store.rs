//! In-memory shard using DashMap.
//!
//! Same semantics as the Redis shard (sets, FIFO lists, blocking pop with a
//! timeout) for development and tests. Contents are lost on restart.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::store::{ShardError, ShardHealth, ShardStore};

#[derive(Default)]
struct MemoryList {
    items: VecDeque<String>,
    /// Wakes parked blocking pops when an item is appended
    notify: Arc<Notify>,
}

pub struct MemoryShardStore {
    index: usize,
    sets: DashMap<String, BTreeSet<String>>,
    lists: DashMap<String, MemoryList>,
}

impl MemoryShardStore {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            sets: DashMap::new(),
            lists: DashMap::new(),
        }
    }

    /// Number of elements currently held in the list at `name`
    pub fn list_len(&self, name: &str) -> usize {
        self.lists.get(name).map(|l| l.items.len()).unwrap_or(0)
    }

    /// Whether any key lives on this shard
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty() && self.lists.iter().all(|l| l.items.is_empty())
    }

    fn try_pop(&self, name: &str) -> Option<String> {
        self.lists
            .get_mut(name)
            .and_then(|mut list| list.items.pop_front())
    }

    /// Drop the entry for `name` once it is empty and nobody waits on it.
    /// A parked pop holds a clone of the `Notify`, which keeps the entry.
    fn prune(&self, name: &str) {
        self.lists.remove_if(name, |_, list| {
            list.items.is_empty() && Arc::strong_count(&list.notify) == 1
        });
    }
}

#[async_trait]
impl ShardStore for MemoryShardStore {
    fn index(&self) -> usize {
        self.index
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn add_to_set(&self, name: &str, members: &[String]) -> Result<(), ShardError> {
        if members.is_empty() {
            return Ok(());
        }

        self.sets
            .entry(name.to_string())
            .or_default()
            .extend(members.iter().cloned());
        Ok(())
    }

    async fn read_set(&self, name: &str) -> Result<Vec<String>, ShardError> {
        Ok(self
            .sets
            .get(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_key(&self, name: &str) -> Result<(), ShardError> {
        self.sets.remove(name);
        if let Some(mut list) = self.lists.get_mut(name) {
            list.items.clear();
        }
        self.prune(name);
        Ok(())
    }

    async fn append_to_list(&self, name: &str, value: &str) -> Result<(), ShardError> {
        let notify = {
            let mut list = self.lists.entry(name.to_string()).or_default();
            list.items.push_back(value.to_string());
            list.notify.clone()
        };
        notify.notify_one();
        Ok(())
    }

    async fn blocking_pop_front(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<String>, ShardError> {
        let deadline = Instant::now() + timeout;

        loop {
            let notify = {
                let mut list = self.lists.entry(name.to_string()).or_default();
                if let Some(value) = list.items.pop_front() {
                    drop(list);
                    self.prune(name);
                    return Ok(Some(value));
                }
                list.notify.clone()
            };

            // notify_one stores a permit when nobody is parked yet, so an
            // append between releasing the entry and parking here is not lost
            let woken = tokio::time::timeout_at(deadline, notify.notified())
                .await
                .is_ok();
            drop(notify);

            if !woken {
                let popped = self.try_pop(name);
                self.prune(name);
                return Ok(popped);
            }
        }
    }

    async fn pop_front_batch(&self, name: &str, max: usize) -> Result<Vec<String>, ShardError> {
        let Some(mut list) = self.lists.get_mut(name) else {
            return Ok(Vec::new());
        };

        let take = max.min(list.items.len());
        let batch = list.items.drain(..take).collect();
        drop(list);

        self.prune(name);
        Ok(batch)
    }

    async fn ping(&self) -> Result<(), ShardError> {
        Ok(())
    }

    fn health(&self) -> ShardHealth {
        ShardHealth {
            index: self.index,
            backend: "memory",
            status: "healthy".to_string(),
            circuit: "closed".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_set_union_and_sorted_read() {
        let store = MemoryShardStore::new(0);
        store.add_to_set("t", &members(&["b", "a"])).await.unwrap();
        store.add_to_set("t", &members(&["c", "a"])).await.unwrap();

        assert_eq!(store.read_set("t").await.unwrap(), members(&["a", "b", "c"]));
    }

    #[tokio::test]
    async fn test_read_missing_set_is_empty() {
        let store = MemoryShardStore::new(0);
        assert!(store.read_set("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_key_removes_set_and_is_idempotent() {
        let store = MemoryShardStore::new(0);
        store.add_to_set("t", &members(&["a"])).await.unwrap();
        store.delete_key("t").await.unwrap();
        store.delete_key("t").await.unwrap();
        assert!(store.read_set("t").await.unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_list_is_fifo() {
        let store = MemoryShardStore::new(0);
        for v in ["1", "2", "3"] {
            store.append_to_list("q", v).await.unwrap();
        }

        let first = store
            .blocking_pop_front("q", Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(first.as_deref(), Some("1"));
        assert_eq!(store.pop_front_batch("q", 10).await.unwrap(), members(&["2", "3"]));
        assert_eq!(store.list_len("q"), 0);
    }

    #[tokio::test]
    async fn test_pop_front_batch_respects_max() {
        let store = MemoryShardStore::new(0);
        for v in ["1", "2", "3"] {
            store.append_to_list("q", v).await.unwrap();
        }

        assert_eq!(store.pop_front_batch("q", 2).await.unwrap(), members(&["1", "2"]));
        assert_eq!(store.list_len("q"), 1);
    }

    #[tokio::test]
    async fn test_blocking_pop_times_out_empty() {
        let store = MemoryShardStore::new(0);
        let start = std::time::Instant::now();

        let popped = store
            .blocking_pop_front("q", Duration::from_millis(50))
            .await
            .unwrap();

        assert!(popped.is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_polling_leaves_no_entries_behind() {
        let store = MemoryShardStore::new(0);

        for queue in ["a", "b", "c"] {
            store
                .blocking_pop_front(queue, Duration::from_millis(5))
                .await
                .unwrap();
        }
        assert_eq!(store.lists.len(), 0);

        store.append_to_list("q", "1").await.unwrap();
        store.append_to_list("q", "2").await.unwrap();
        store
            .blocking_pop_front("q", Duration::from_millis(5))
            .await
            .unwrap();
        assert_eq!(store.lists.len(), 1);
        store.pop_front_batch("q", 10).await.unwrap();
        assert_eq!(store.lists.len(), 0);
    }

    #[tokio::test]
    async fn test_delete_keeps_entry_for_parked_pop() {
        let store = Arc::new(MemoryShardStore::new(0));

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .blocking_pop_front("q", Duration::from_secs(5))
                    .await
                    .unwrap()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        store.delete_key("q").await.unwrap();
        store.append_to_list("q", "after-delete").await.unwrap();

        let popped = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("parked pop should still be attached")
            .unwrap();
        assert_eq!(popped.as_deref(), Some("after-delete"));
        assert_eq!(store.lists.len(), 0);
    }

    #[tokio::test]
    async fn test_blocking_pop_wakes_on_append() {
        let store = Arc::new(MemoryShardStore::new(0));

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .blocking_pop_front("q", Duration::from_secs(5))
                    .await
                    .unwrap()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        store.append_to_list("q", "hello").await.unwrap();

        let popped = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("pop should wake well before its own timeout")
            .unwrap();
        assert_eq!(popped.as_deref(), Some("hello"));
    }
}
