//! Concurrent tag store with a global scope and one scope per thread.
//!
//! # Locking
//!
//! - Global tags sit behind a single reader-writer lock: snapshots never block
//!   each other, a global write briefly excludes readers.
//! - Thread tags live in a sharded map from thread id to a per-thread
//!   reader-writer lock. The shard lock is held only long enough to clone the
//!   scope's `Arc`, so a write for thread A never blocks a snapshot for thread B.
//!
//! Each individual add/remove is atomic. A snapshot reads the global scope and
//! then the thread scope; it is not a transaction across several mutations.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::TagError;

/// An immutable, key-ordered set of tags.
pub type TagSet = BTreeMap<String, String>;

type ThreadScope = Arc<RwLock<TagSet>>;

#[derive(Debug, Default)]
pub struct TagStore {
    global: RwLock<TagSet>,
    threads: DashMap<u64, ThreadScope>,
}

impl TagStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store whose global scope is seeded from `tags`, later pairs
    /// overwriting earlier ones. Pairs with an empty key are ignored.
    pub fn with_global_tags<I>(tags: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let global = tags
            .into_iter()
            .filter(|(key, _)| !key.is_empty())
            .collect::<TagSet>();

        Self {
            global: RwLock::new(global),
            threads: DashMap::new(),
        }
    }

    /// Sets a global tag, replacing any previous value for `key`.
    pub fn add_global(&self, key: &str, value: &str) -> Result<(), TagError> {
        check_key(key)?;
        self.global
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Removes the global tag named `key`.
    ///
    /// `value` is part of the public contract but is not used for matching: the
    /// tag is removed whatever its current value. Removing a missing key succeeds.
    pub fn remove_global(&self, key: &str, _value: &str) -> Result<(), TagError> {
        check_key(key)?;
        self.global.write().remove(key);
        Ok(())
    }

    /// Sets a tag for one thread, replacing any previous value for `key`.
    pub fn add_thread(&self, thread_id: u64, key: &str, value: &str) -> Result<(), TagError> {
        check_key(key)?;
        let scope = Arc::clone(self.threads.entry(thread_id).or_default().value());
        scope.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Removes a thread tag by key; `value` is ignored as in [`Self::remove_global`].
    ///
    /// The thread's entry stays in place even once it holds no tags.
    pub fn remove_thread(&self, thread_id: u64, key: &str, _value: &str) -> Result<(), TagError> {
        check_key(key)?;
        if let Some(scope) = self.thread_scope(thread_id) {
            scope.write().remove(key);
        }
        Ok(())
    }

    /// Global tags overlaid with the tags of `thread_id`; thread values win.
    #[must_use]
    pub fn snapshot_for(&self, thread_id: u64) -> TagSet {
        let mut merged = self.global.read().clone();
        if let Some(scope) = self.thread_scope(thread_id) {
            let thread_tags = scope.read();
            merged.extend(
                thread_tags
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone())),
            );
        }
        merged
    }

    #[must_use]
    pub fn global_tags(&self) -> TagSet {
        self.global.read().clone()
    }

    /// Tags set for `thread_id` only, or `None` if the thread was never tagged.
    #[must_use]
    pub fn thread_tags(&self, thread_id: u64) -> Option<TagSet> {
        self.thread_scope(thread_id).map(|scope| scope.read().clone())
    }

    /// Number of thread entries, including ones whose tags were all removed.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn clear(&self) {
        self.global.write().clear();
        self.threads.clear();
    }

    fn thread_scope(&self, thread_id: u64) -> Option<ThreadScope> {
        self.threads
            .get(&thread_id)
            .map(|entry| Arc::clone(entry.value()))
    }
}

fn check_key(key: &str) -> Result<(), TagError> {
    if key.is_empty() {
        return Err(TagError::EmptyKey);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_add_global_visible_once() {
        let store = TagStore::new();
        store.add_global("env", "dev").unwrap();

        let snapshot = store.snapshot_for(1);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("env"), Some(&"dev".to_string()));
    }

    #[test]
    fn test_add_global_last_write_wins() {
        let store = TagStore::new();
        store.add_global("env", "dev").unwrap();
        store.add_global("env", "prod").unwrap();

        let snapshot = store.snapshot_for(7);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("env"), Some(&"prod".to_string()));
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let store = TagStore::new();
        store.add_global("env", "dev").unwrap();

        assert!(store.remove_global("region", "eu").is_ok());
        assert!(store.remove_thread(3, "region", "eu").is_ok());
        assert_eq!(store.global_tags().len(), 1);
        assert_eq!(store.thread_count(), 0);
    }

    #[test]
    fn test_remove_ignores_value() {
        let store = TagStore::new();
        store.add_global("env", "dev").unwrap();
        store.add_thread(9, "span", "abc").unwrap();

        store.remove_global("env", "something-else").unwrap();
        store.remove_thread(9, "span", "").unwrap();

        assert!(store.snapshot_for(9).is_empty());
    }

    #[test]
    fn test_thread_tags_are_scoped() {
        let store = TagStore::new();
        store.add_thread(1, "request", "a").unwrap();

        assert_eq!(
            store.snapshot_for(1).get("request"),
            Some(&"a".to_string())
        );
        assert!(store.snapshot_for(2).get("request").is_none());
    }

    #[test]
    fn test_thread_overrides_global() {
        let store = TagStore::new();
        store.add_global("env", "prod").unwrap();
        store.add_global("region", "eu").unwrap();
        store.add_thread(5, "env", "canary").unwrap();

        let snapshot = store.snapshot_for(5);
        assert_eq!(snapshot.get("env"), Some(&"canary".to_string()));
        assert_eq!(snapshot.get("region"), Some(&"eu".to_string()));

        // the global value is untouched for other threads
        assert_eq!(
            store.snapshot_for(6).get("env"),
            Some(&"prod".to_string())
        );
    }

    #[test]
    fn test_empty_key_rejected() {
        let store = TagStore::new();
        assert_eq!(store.add_global("", "v"), Err(TagError::EmptyKey));
        assert_eq!(store.remove_global("", "v"), Err(TagError::EmptyKey));
        assert_eq!(store.add_thread(1, "", "v"), Err(TagError::EmptyKey));
        assert_eq!(store.remove_thread(1, "", "v"), Err(TagError::EmptyKey));
        assert_eq!(store.thread_count(), 0);
    }

    #[test]
    fn test_empty_value_accepted() {
        let store = TagStore::new();
        store.add_global("marker", "").unwrap();
        assert_eq!(store.snapshot_for(0).get("marker"), Some(&String::new()));
    }

    #[test]
    fn test_thread_entry_kept_after_last_removal() {
        let store = TagStore::new();
        store.add_thread(42, "k", "v").unwrap();
        store.remove_thread(42, "k", "v").unwrap();

        assert_eq!(store.thread_count(), 1);
        assert_eq!(store.thread_tags(42), Some(TagSet::new()));
        assert_eq!(store.thread_tags(43), None);
    }

    #[test]
    fn test_with_global_tags_seeds_in_order() {
        let store = TagStore::with_global_tags(vec![
            ("env".to_string(), "dev".to_string()),
            (String::new(), "dropped".to_string()),
            ("env".to_string(), "prod".to_string()),
        ]);

        let global = store.global_tags();
        assert_eq!(global.len(), 1);
        assert_eq!(global.get("env"), Some(&"prod".to_string()));
    }

    #[test]
    fn test_clear() {
        let store = TagStore::new();
        store.add_global("a", "1").unwrap();
        store.add_thread(1, "b", "2").unwrap();
        store.clear();

        assert!(store.global_tags().is_empty());
        assert_eq!(store.thread_count(), 0);
        assert!(store.snapshot_for(1).is_empty());
    }

    #[test]
    fn test_concurrent_thread_writers_do_not_interfere() {
        const THREADS: u64 = 16;
        const TAGS_PER_THREAD: u64 = 200;

        let store = TagStore::new();
        let barrier = Barrier::new(THREADS as usize + 1);

        thread::scope(|s| {
            for thread_id in 0..THREADS {
                let store = &store;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    for i in 0..TAGS_PER_THREAD {
                        store
                            .add_thread(thread_id, &format!("k{i}"), &format!("{thread_id}-{i}"))
                            .unwrap();
                    }
                    // odd keys are removed again
                    for i in (1..TAGS_PER_THREAD).step_by(2) {
                        store.remove_thread(thread_id, &format!("k{i}"), "").unwrap();
                    }
                });
            }

            // a concurrent reader standing in for the sampler
            let store = &store;
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                for _ in 0..500 {
                    for thread_id in 0..THREADS {
                        let snapshot = store.snapshot_for(thread_id);
                        for (key, value) in &snapshot {
                            let i = &key[1..];
                            assert_eq!(value, &format!("{thread_id}-{i}"));
                        }
                    }
                }
            });
        });

        for thread_id in 0..THREADS {
            let expected = (0..TAGS_PER_THREAD)
                .step_by(2)
                .map(|i| (format!("k{i}"), format!("{thread_id}-{i}")))
                .collect::<TagSet>();
            assert_eq!(store.thread_tags(thread_id), Some(expected));
        }
    }

    #[test]
    fn test_concurrent_global_writes_and_snapshots() {
        let store = TagStore::new();

        thread::scope(|s| {
            for writer in 0..4 {
                let store = &store;
                s.spawn(move || {
                    for i in 0..500 {
                        store
                            .add_global(&format!("w{writer}"), &i.to_string())
                            .unwrap();
                    }
                });
            }
            let store = &store;
            s.spawn(move || {
                for _ in 0..500 {
                    let snapshot = store.snapshot_for(0);
                    assert!(snapshot.len() <= 4);
                }
            });
        });

        let global = store.global_tags();
        assert_eq!(global.len(), 4);
        for writer in 0..4 {
            assert_eq!(global.get(&format!("w{writer}")), Some(&"499".to_string()));
        }
    }
}
