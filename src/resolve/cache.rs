use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use crate::core::Result;

/// Process-lifetime get-or-compute cache behind the resolvers.
///
/// Lookups take a read lock; the computation runs outside any lock so
/// one expensive key never serializes unrelated keys. Two threads may
/// compute the same key concurrently - both succeed and the first write
/// wins, which is safe because the value for a given key is always
/// identical. Failed computations are never cached, so a later call may
/// retry against corrected configuration.
pub struct ResolveCache<K, V> {
    inner: RwLock<HashMap<K, Arc<V>>>,
}

impl<K: Eq + Hash, V> ResolveCache<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Result<Option<Arc<V>>> {
        Ok(self.inner.read()?.get(key).cloned())
    }

    pub fn get_or_try_insert_with<F>(&self, key: K, compute: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(found) = self.inner.read()?.get(&key) {
            return Ok(found.clone());
        }

        let computed = Arc::new(compute()?);

        let mut entries = self.inner.write()?;
        Ok(entries.entry(key).or_insert(computed).clone())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.read().map(|entries| entries.len()).unwrap_or(0)
    }
}

impl<K: Eq + Hash, V> Default for ResolveCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
