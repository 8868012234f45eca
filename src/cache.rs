//! Session cache for values that are expensive to derive and never change
//! once built (composited page sets, uploaded GPU textures).

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug)]
pub struct TextureCache<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> Default for TextureCache<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> TextureCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, building it with `factory` on a miss.
    pub fn get_or_compute(&mut self, key: K, factory: impl FnOnce() -> V) -> &V {
        self.entries.entry(key).or_insert_with(factory)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Store a value computed elsewhere, keeping an existing entry.
    pub fn insert_if_absent(&mut self, key: K, value: V) -> &V {
        self.entries.entry(key).or_insert(value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_runs_once_per_key() {
        let mut cache = TextureCache::new();
        let mut calls = 0;
        cache.get_or_compute("a", || {
            calls += 1;
            1
        });
        let value = *cache.get_or_compute("a", || {
            calls += 1;
            2
        });
        assert_eq!(value, 1);
        assert_eq!(calls, 1);
    }

    #[test]
    fn insert_keeps_the_first_value() {
        let mut cache = TextureCache::new();
        assert_eq!(*cache.insert_if_absent("k", 1), 1);
        assert_eq!(*cache.insert_if_absent("k", 2), 1);
        assert!(cache.contains(&"k"));
        assert_eq!(cache.get(&"missing"), None);
        assert_eq!(cache.len(), 1);
    }
}
