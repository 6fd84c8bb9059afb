use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use fleetops_core::Structure;

/// Structure-isolated key/value store abstraction for disposable read models.
pub trait StructureStore<K, V>: Send + Sync {
    fn get(&self, structure: Structure, key: &K) -> Option<V>;
    fn upsert(&self, structure: Structure, key: K, value: V);
    fn remove(&self, structure: Structure, key: &K);
    fn list(&self, structure: Structure) -> Vec<V>;
    /// Clear all read-model records for a structure (rebuild support).
    fn clear_structure(&self, structure: Structure);
}

impl<K, V, S> StructureStore<K, V> for Arc<S>
where
    S: StructureStore<K, V> + ?Sized,
{
    fn get(&self, structure: Structure, key: &K) -> Option<V> {
        (**self).get(structure, key)
    }

    fn upsert(&self, structure: Structure, key: K, value: V) {
        (**self).upsert(structure, key, value)
    }

    fn remove(&self, structure: Structure, key: &K) {
        (**self).remove(structure, key)
    }

    fn list(&self, structure: Structure) -> Vec<V> {
        (**self).list(structure)
    }

    fn clear_structure(&self, structure: Structure) {
        (**self).clear_structure(structure)
    }
}

/// In-memory structure-isolated store for tests/dev.
#[derive(Debug)]
pub struct InMemoryStructureStore<K, V> {
    inner: RwLock<HashMap<(Structure, K), V>>,
}

impl<K, V> InMemoryStructureStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryStructureStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> StructureStore<K, V> for InMemoryStructureStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, structure: Structure, key: &K) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(&(structure, key.clone())).cloned()
    }

    fn upsert(&self, structure: Structure, key: K, value: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((structure, key), value);
        }
    }

    fn remove(&self, structure: Structure, key: &K) {
        if let Ok(mut map) = self.inner.write() {
            map.remove(&(structure, key.clone()));
        }
    }

    fn list(&self, structure: Structure) -> Vec<V> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        map.iter()
            .filter_map(|((s, _k), v)| if *s == structure { Some(v.clone()) } else { None })
            .collect()
    }

    fn clear_structure(&self, structure: Structure) {
        if let Ok(mut map) = self.inner.write() {
            map.retain(|(s, _k), _v| *s != structure);
        }
    }
}
