//! Concurrency-safe accumulation of successful task results.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use tokio::sync::Mutex;

/// Insert-only map written by many units at once.
///
/// Entries are never replaced or removed; a second insert under an existing
/// key is ignored and reported as `false`.
#[derive(Debug)]
pub struct Aggregator<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> Aggregator<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, key: K, value: V) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Copy of everything inserted so far.
    pub async fn snapshot(&self) -> HashMap<K, V> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

impl<K, V> Default for Aggregator<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
