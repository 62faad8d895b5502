use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use fnv::FnvHashMap;

/// Bounded least-recently-used cache behind a single mutex.
///
/// Values are built outside the lock, so concurrent misses on different
/// keys never serialize each other; concurrent misses on the same key may
/// build twice and the first insertion wins.
#[derive(Debug)]
pub(crate) struct LruCache<T> {
    capacity: usize,
    inner: Mutex<Inner<T>>,
}

#[derive(Debug)]
struct Inner<T> {
    entries: FnvHashMap<u64, Arc<T>>,
    order: VecDeque<u64>,
}

impl<T> LruCache<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner {
                entries: FnvHashMap::default(),
                order: VecDeque::new(),
            }),
        }
    }

    pub(crate) fn get_or_insert_with<F>(&self, key: u64, build: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        if self.capacity == 0 {
            return Arc::new(build());
        }

        {
            let mut inner = self.inner.lock().expect("cache mutex poisoned");
            if let Some(hit) = inner.entries.get(&key).cloned() {
                inner.touch(key);
                return hit;
            }
        }

        let value = Arc::new(build());

        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let entry = inner
            .entries
            .entry(key)
            .or_insert_with(|| Arc::clone(&value))
            .clone();
        inner.touch(key);
        while inner.order.len() > self.capacity {
            if let Some(evicted) = inner.order.pop_front() {
                inner.entries.remove(&evicted);
            }
        }

        entry
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").entries.len()
    }
}

impl<T> Inner<T> {
    /// Move `key` to the most-recently-used position.
    fn touch(&mut self, key: u64) {
        if let Some(position) = self.order.iter().position(|&entry| entry == key) {
            self.order.remove(position);
        }
        self.order.push_back(key);
    }
}
