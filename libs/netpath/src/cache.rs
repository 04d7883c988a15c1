use std::sync::atomic::{AtomicU64, Ordering};

use moka::sync::Cache;

/// Filter values by attribute name.
///
/// Entries are fetched on first use. With a capacity set, moka evicts the
/// entries least likely to be read again; without one entries live as long
/// as the cache. Clearing bumps a generation so fetches that were already in
/// flight never repopulate it.
pub struct ValueCache {
    entries: Cache<String, Vec<String>>,
    generation: AtomicU64,
}

impl ValueCache {
    pub fn new(capacity: Option<usize>) -> Self {
        let mut builder = Cache::builder();
        if let Some(capacity) = capacity {
            builder = builder.max_capacity(capacity.max(1) as u64);
        }
        Self {
            entries: builder.build(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.run_pending_tasks();
        self.entries.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Vec<String>> {
        self.entries.get(key)
    }

    pub fn insert(&self, key: impl Into<String>, values: Vec<String>) {
        self.entries.insert(key.into(), values);
    }

    /// Returns the cached values for `key`, running `fetch` on a miss.
    ///
    /// Failed fetches are not cached. `Ok(None)` means the cache was cleared
    /// while `fetch` ran and its result was dropped.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &str,
        fetch: F,
    ) -> Result<Option<Vec<String>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>, E>>,
    {
        let generation = self.generation.load(Ordering::Acquire);
        if let Some(values) = self.get(key) {
            return Ok(Some(values));
        }
        let values = fetch().await?;
        if self.generation.load(Ordering::Acquire) != generation {
            return Ok(None);
        }
        self.insert(key, values.clone());
        Ok(Some(values))
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.invalidate_all();
    }
}

impl std::fmt::Debug for ValueCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueCache")
            .field("entries", &self.entries.entry_count())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}
