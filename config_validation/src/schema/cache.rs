use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;
use serde_json::Value;

use super::{ModelType, SchemaFragments, Validator, ValidatorFactory, compose_schema};

/// Capacity of both the schema and validator caches, one slot per model type.
pub const CACHE_CAPACITY: usize = 2;

/// A small map that keeps at most `capacity` entries, evicting the least recently used.
///
/// Entries are kept in recency order, most recent first.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    capacity: usize,
    entries: Vec<(K, V)>,
}

impl<K: PartialEq, V: Clone> BoundedCache<K, V> {
    /// Creates a new empty `BoundedCache`.
    ///
    /// # Arguments
    /// * `capacity` - The maximum amount of entries, at least one is always kept.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Returns the cached value for `key`, building and inserting it on a miss.
    pub fn get_or_insert_with<F>(&mut self, key: K, build: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(pos) = self.entries.iter().position(|(k, _)| *k == key) {
            let entry = self.entries.remove(pos);
            let value = entry.1.clone();
            self.entries.insert(0, entry);
            return value;
        }

        let value = build();
        self.entries.insert(0, (key, value.clone()));
        self.entries.truncate(self.capacity);
        value
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Memoizes composed schemas per model type and the validator engine.
///
/// Building either is not safe to race with a structural validation running
/// on another thread, callers must hold the validation lock while fetching
/// from the cache and validating.
pub struct SchemaCache {
    fragments: Box<dyn SchemaFragments>,
    schemas: Mutex<BoundedCache<ModelType, Arc<Value>>>,
    validators: Mutex<BoundedCache<(), Arc<Validator>>>,
}

impl SchemaCache {
    /// Creates a new empty `SchemaCache`.
    ///
    /// # Arguments
    /// * `fragments` - The provider of the per-section schema fragments.
    pub fn new<F: SchemaFragments + 'static>(fragments: F) -> Self {
        Self {
            fragments: Box::new(fragments),
            schemas: Mutex::new(BoundedCache::new(CACHE_CAPACITY)),
            validators: Mutex::new(BoundedCache::new(CACHE_CAPACITY)),
        }
    }

    /// Returns the composed schema for `model_type`, building it on first use.
    pub fn get_schema(&self, model_type: ModelType) -> Arc<Value> {
        self.schemas.lock().get_or_insert_with(model_type, || {
            debug!(model_type = model_type.as_str(); "building config schema");
            Arc::new(compose_schema(self.fragments.as_ref(), model_type))
        })
    }

    /// Returns the validator engine, building it on first use.
    pub fn get_validator(&self) -> Arc<Validator> {
        self.validators.lock().get_or_insert_with((), || {
            debug!("building schema validator");
            Arc::new(ValidatorFactory::build())
        })
    }

    /// Returns true if a schema for `model_type` is currently cached.
    pub fn has_schema(&self, model_type: ModelType) -> bool {
        self.schemas.lock().contains(&model_type)
    }

    /// The amount of cached schemas.
    pub fn len(&self) -> usize {
        self.schemas.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.lock().is_empty()
    }

    /// Drops every cached schema and validator.
    pub fn clear(&self) {
        self.schemas.lock().clear();
        self.validators.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DefaultFragments;

    #[test]
    fn test_bounded_cache_evicts_least_recently_used() {
        let mut cache = BoundedCache::new(2);
        cache.get_or_insert_with("a", || 1);
        cache.get_or_insert_with("b", || 2);

        // Touch "a" so "b" becomes the eviction candidate.
        assert_eq!(cache.get_or_insert_with("a", || unreachable!()), 1);
        cache.get_or_insert_with("c", || 3);

        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
        assert!(cache.contains(&"c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_schema_is_built_once_per_model_type() {
        let cache = SchemaCache::new(DefaultFragments);

        let first = cache.get_schema(ModelType::Ecd);
        let second = cache.get_schema(ModelType::Ecd);
        assert!(Arc::ptr_eq(&first, &second));

        let gbm = cache.get_schema(ModelType::Gbm);
        assert!(!Arc::ptr_eq(&first, &gbm));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_validator_is_a_singleton_until_cleared() {
        let cache = SchemaCache::new(DefaultFragments);

        let first = cache.get_validator();
        assert!(Arc::ptr_eq(&first, &cache.get_validator()));

        cache.clear();
        assert!(cache.is_empty());
        assert!(!Arc::ptr_eq(&first, &cache.get_validator()));
    }
}
