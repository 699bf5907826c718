//! Instance caching strategies and resolve-time arguments

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::Instance;

/// A sub-key derived from the arguments of a resolve call.
///
/// The default derivation maps every call to the same sub-key, which makes a
/// provider behave as a singleton. A custom [`KeyFn`] can spread instances
/// over one slot per argument signature instead.
pub type CacheKey = String;

/// Derives a [`CacheKey`] from resolve-time arguments.
pub type KeyFn = Arc<dyn Fn(&ResolveArgs) -> CacheKey + Send + Sync>;

/// Extra arguments forwarded through `resolve` to factories, argument
/// resolvers and cache key functions.
#[derive(Clone, Default)]
pub struct ResolveArgs {
    values: Vec<Instance>,
}

impl ResolveArgs {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value, builder-style.
    pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.values.push(Arc::new(value));
        self
    }

    /// Returns the argument at `index` downcast to `T`, if both exist.
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> Option<Arc<T>> {
        self.values
            .get(index)
            .and_then(|value| value.clone().downcast::<T>().ok())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Decides how a provider remembers the instances it produced.
#[derive(Clone)]
pub enum CachePolicy {
    /// One slot regardless of call arguments: a singleton.
    Single,
    /// One slot per sub-key derived by the given function.
    Keyed(KeyFn),
}

impl CachePolicy {
    /// A keyed policy from a plain closure.
    pub fn keyed<F>(key_fn: F) -> Self
    where
        F: Fn(&ResolveArgs) -> CacheKey + Send + Sync + 'static,
    {
        Self::Keyed(Arc::new(key_fn))
    }
}

/// The key→instance store owned by a provider.
///
/// Entries live as long as the provider does; there is no eviction.
pub struct InstanceCache {
    key_fn: KeyFn,
    slots: Mutex<HashMap<CacheKey, Instance>>,
}

impl InstanceCache {
    pub fn new(policy: CachePolicy) -> Self {
        let key_fn = match policy {
            CachePolicy::Single => Arc::new(|_: &ResolveArgs| CacheKey::new()) as KeyFn,
            CachePolicy::Keyed(key_fn) => key_fn,
        };
        Self {
            key_fn,
            slots: Mutex::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn derive_key(&self, args: &ResolveArgs) -> CacheKey {
        (self.key_fn)(args)
    }

    #[inline]
    pub fn has_value(&self, key: &CacheKey) -> bool {
        self.lock().contains_key(key)
    }

    #[inline]
    pub fn get_value(&self, key: &CacheKey) -> Option<Instance> {
        self.lock().get(key).cloned()
    }

    #[inline]
    pub fn set_value(&self, key: CacheKey, value: Instance) {
        self.lock().insert(key, value);
    }

    /// Removes and returns every cached instance.
    pub(crate) fn drain(&self) -> Vec<Instance> {
        self.lock().drain().map(|(_, value)| value).collect()
    }

    /// An empty cache sharing the same key function.
    pub(crate) fn fresh(&self) -> Self {
        Self {
            key_fn: self.key_fn.clone(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Instance>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InstanceCache {
    fn default() -> Self {
        Self::new(CachePolicy::Single)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_policy_ignores_arguments() {
        let cache = InstanceCache::new(CachePolicy::Single);

        let empty = cache.derive_key(&ResolveArgs::new());
        let loaded = cache.derive_key(&ResolveArgs::new().with(42i32));

        assert_eq!(empty, loaded);
    }

    #[test]
    fn keyed_policy_derives_one_slot_per_signature() {
        let cache = InstanceCache::new(CachePolicy::keyed(|args| {
            args.get::<String>(0)
                .map(|name| name.as_ref().clone())
                .unwrap_or_default()
        }));

        cache.set_value(
            cache.derive_key(&ResolveArgs::new().with(String::from("a"))),
            Arc::new(1i32),
        );
        cache.set_value(
            cache.derive_key(&ResolveArgs::new().with(String::from("b"))),
            Arc::new(2i32),
        );

        assert!(cache.has_value(&"a".to_string()));
        assert!(cache.has_value(&"b".to_string()));
        assert!(!cache.has_value(&"c".to_string()));
    }

    #[test]
    fn it_stores_and_returns_instances() {
        let cache = InstanceCache::default();
        let key = cache.derive_key(&ResolveArgs::new());

        assert!(!cache.has_value(&key));
        assert!(cache.get_value(&key).is_none());

        cache.set_value(key.clone(), Arc::new(7i32));

        let value = cache.get_value(&key).unwrap();
        assert_eq!(*value.downcast::<i32>().unwrap(), 7);
    }

    #[test]
    fn fresh_copy_starts_empty() {
        let cache = InstanceCache::default();
        let key = cache.derive_key(&ResolveArgs::new());
        cache.set_value(key.clone(), Arc::new(7i32));

        let fresh = cache.fresh();

        assert!(cache.has_value(&key));
        assert!(!fresh.has_value(&key));
    }

    #[test]
    fn it_reads_typed_arguments_positionally() {
        let args = ResolveArgs::new().with(1i32).with(String::from("two"));

        assert_eq!(args.len(), 2);
        assert_eq!(*args.get::<i32>(0).unwrap(), 1);
        assert_eq!(args.get::<String>(1).unwrap().as_str(), "two");
        assert!(args.get::<i32>(1).is_none());
        assert!(args.get::<i32>(2).is_none());
    }
}
