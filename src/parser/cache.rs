//! A read-mostly cache sharded across a fixed number of stripes, each guarded
//! by its own lock, so concurrent readers on different keys never contend.
//! This is the "striped lock per hash-bucket" shape used for shared state
//! that is read far more often than it is written.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

const SHARD_COUNT: usize = 16;

pub struct ShardedLruCache<V: Clone> {
    shards: Vec<Mutex<LruCache<String, V>>>,
}

impl<V: Clone> ShardedLruCache<V> {
    pub fn new(capacity: usize) -> Self {
        let per_shard = (capacity.max(SHARD_COUNT) / SHARD_COUNT).max(1);
        let cap = NonZeroUsize::new(per_shard).expect("per_shard capacity is always >= 1");
        let shards = (0..SHARD_COUNT).map(|_| Mutex::new(LruCache::new(cap))).collect();
        Self { shards }
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.shards[self.shard_index(key)].lock().get(key).cloned()
    }

    pub fn insert(&self, key: String, value: V) {
        let idx = self.shard_index(&key);
        self.shards[idx].lock().put(key, value);
    }

    pub fn evict(&self, key: &str) {
        self.shards[self.shard_index(key)].lock().pop(key);
    }

    pub fn clear(&self) {
        for shard in &self.shards {
            shard.lock().clear();
        }
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let cache: ShardedLruCache<i32> = ShardedLruCache::new(32);
        cache.insert("SELECT 1".to_string(), 42);
        assert_eq!(cache.get("SELECT 1"), Some(42));
        assert_eq!(cache.get("SELECT 2"), None);
    }

    #[test]
    fn evict_removes_the_entry() {
        let cache: ShardedLruCache<i32> = ShardedLruCache::new(32);
        cache.insert("SELECT 1".to_string(), 1);
        cache.evict("SELECT 1");
        assert_eq!(cache.get("SELECT 1"), None);
    }

    #[test]
    fn clear_empties_every_shard() {
        let cache: ShardedLruCache<i32> = ShardedLruCache::new(32);
        for i in 0..32 {
            cache.insert(format!("SELECT {i}"), i);
        }
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn tiny_capacity_still_works_per_shard() {
        let cache: ShardedLruCache<i32> = ShardedLruCache::new(1);
        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get("a"), Some(1));
    }
}
