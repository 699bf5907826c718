//! Providers: a factory, its instance cache and lifecycle hooks

use std::{
    fmt::Debug,
    sync::{Arc, OnceLock},
};

use tracing::debug;

use crate::{
    cache::{CachePolicy, InstanceCache, ResolveArgs},
    container::{Container, ContainerId},
    error::Error,
    hooks::LifecycleHook,
    Instance,
};

/// A type-erased factory producing instances against the owning container.
pub type FactoryFn = Arc<dyn Fn(&Container, &ResolveArgs) -> Result<Instance, Error> + Send + Sync>;

/// Produces instances and remembers them per cache sub-key.
///
/// A provider belongs to exactly one container. Installing the same provider
/// into a second container without cloning it first would silently share its
/// cache across scopes, so resolution through the second container fails fast
/// with [`Error::ProviderNotCloned`] instead. [`Clone`] yields a scope-safe
/// copy: same factory and hooks, fresh empty cache, no owner.
pub struct Provider {
    factory: FactoryFn,
    cache: InstanceCache,
    hooks: Vec<Arc<dyn LifecycleHook>>,
    owner: OnceLock<ContainerId>,
}

impl Provider {
    /// Creates a provider from a typed factory with a single-value cache.
    pub fn new<T, F>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container, &ResolveArgs) -> Result<T, Error> + Send + Sync + 'static,
    {
        let factory: FactoryFn = Arc::new(move |container, args| {
            factory(container, args).map(|value| Arc::new(value) as Instance)
        });
        Self::from_parts(factory, CachePolicy::Single)
    }

    /// Creates a provider that always yields the given constant value.
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        let instance: Instance = Arc::new(value);
        Self::from_parts(
            Arc::new(move |_: &Container, _: &ResolveArgs| Ok(instance.clone())),
            CachePolicy::Single,
        )
    }

    pub(crate) fn from_parts(factory: FactoryFn, policy: CachePolicy) -> Self {
        Self {
            factory,
            cache: InstanceCache::new(policy),
            hooks: Vec::new(),
            owner: OnceLock::new(),
        }
    }

    /// Replaces the caching policy. Anything already cached is dropped
    /// without running its dispose hooks, so set the policy before the
    /// provider serves its first resolve.
    pub fn with_cache(mut self, policy: CachePolicy) -> Self {
        self.cache = InstanceCache::new(policy);
        self
    }

    /// Appends a lifecycle hook; hooks run in the order they were added.
    pub fn with_hook(mut self, hook: impl LifecycleHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Binds the provider to the container it was installed into.
    /// The first binding wins; a mismatch is detected on `provide`.
    pub(crate) fn bind(&self, owner: ContainerId) {
        let _ = self.owner.set(owner);
    }

    /// Returns the cached instance for the derived sub-key, or builds one.
    ///
    /// On a cache miss the factory runs first, then every `on_construct` hook
    /// in order; the instance is cached only after all of them succeeded, so a
    /// failed construction leaves no partially-cached state behind.
    pub fn provide(&self, owner: &Container, args: &ResolveArgs) -> Result<Instance, Error> {
        if let Some(bound) = self.owner.get() {
            if *bound != owner.id() {
                return Err(Error::ProviderNotCloned {
                    bound: *bound,
                    requested: owner.id(),
                });
            }
        }

        let key = self.cache.derive_key(args);
        if let Some(instance) = self.cache.get_value(&key) {
            debug!(container = %owner.id(), "instance found in cache");
            return Ok(instance);
        }
        debug!(container = %owner.id(), "instance not cached, invoking factory");

        let instance = (self.factory)(owner, args)?;
        for hook in &self.hooks {
            hook.on_construct(&instance)?;
        }
        self.cache.set_value(key, instance.clone());
        Ok(instance)
    }

    /// Runs every `on_dispose` hook against every cached instance, in hook
    /// registration order, and clears the cache. A failing hook aborts the
    /// remaining hooks for that instance and propagates.
    pub fn dispose(&self) -> Result<(), Error> {
        for instance in self.cache.drain() {
            for hook in &self.hooks {
                hook.on_dispose(&instance)?;
            }
        }
        Ok(())
    }
}

impl Clone for Provider {
    /// A scope-safe copy: shares the factory and hook list, starts with a
    /// fresh empty cache and no owning container.
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            cache: self.cache.fresh(),
            hooks: self.hooks.clone(),
            owner: OnceLock::new(),
        }
    }
}

impl Debug for Provider {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Provider(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{hooks::TypedHook, injector::ManifestInjector};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Service(usize);

    fn container() -> Container {
        Container::new(ManifestInjector)
    }

    #[test]
    fn it_invokes_the_factory_once_per_sub_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = {
            let calls = calls.clone();
            Provider::new(move |_, _| {
                Ok(Service(calls.fetch_add(1, Ordering::SeqCst)))
            })
        };
        let container = container();
        provider.bind(container.id());

        let first = provider.provide(&container, &ResolveArgs::new()).unwrap();
        let second = provider.provide(&container, &ResolveArgs::new()).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn keyed_cache_yields_one_instance_per_signature() {
        let provider = Provider::new(|_, args: &ResolveArgs| {
            Ok(Service(args.get::<usize>(0).map(|n| *n).unwrap_or(0)))
        })
        .with_cache(CachePolicy::keyed(|args| {
            args.get::<usize>(0).map(|n| n.to_string()).unwrap_or_default()
        }));
        let container = container();
        provider.bind(container.id());

        let a1 = provider.provide(&container, &ResolveArgs::new().with(1usize)).unwrap();
        let a2 = provider.provide(&container, &ResolveArgs::new().with(1usize)).unwrap();
        let b = provider.provide(&container, &ResolveArgs::new().with(2usize)).unwrap();

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }

    #[test]
    fn it_runs_construct_hooks_in_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let first = {
            let order = order.clone();
            TypedHook::<Service>::new().on_construct(move |_| order.lock().unwrap().push("first"))
        };
        let second = {
            let order = order.clone();
            TypedHook::<Service>::new().on_construct(move |_| order.lock().unwrap().push("second"))
        };

        let provider = Provider::new(|_, _| Ok(Service(0)))
            .with_hook(first)
            .with_hook(second);
        let container = container();
        provider.bind(container.id());

        provider.provide(&container, &ResolveArgs::new()).unwrap();
        // cache hit must not re-run construct hooks
        provider.provide(&container, &ResolveArgs::new()).unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn it_caches_nothing_when_the_factory_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = {
            let calls = calls.clone();
            Provider::new(move |_, _| -> Result<Service, Error> {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::ResolveFailed { type_name: "Service" })
            })
        };
        let container = container();
        provider.bind(container.id());

        assert!(provider.provide(&container, &ResolveArgs::new()).is_err());
        assert!(provider.provide(&container, &ResolveArgs::new()).is_err());

        // the factory ran again: the failure was not cached
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn it_fails_fast_when_reused_across_containers() {
        let provider = Provider::new(|_, _| Ok(Service(0)));
        let owner = container();
        let other = container();
        provider.bind(owner.id());

        assert!(provider.provide(&owner, &ResolveArgs::new()).is_ok());

        let err = provider.provide(&other, &ResolveArgs::new()).unwrap_err();
        assert!(matches!(err, Error::ProviderNotCloned { .. }));
    }

    #[test]
    fn a_cloned_provider_starts_unbound_and_empty() {
        let provider = Provider::new(|_, _| Ok(Service(0)));
        let owner = container();
        provider.bind(owner.id());
        let original = provider.provide(&owner, &ResolveArgs::new()).unwrap();

        let copy = provider.clone();
        let other = container();
        copy.bind(other.id());
        let fresh = copy.provide(&other, &ResolveArgs::new()).unwrap();

        assert!(!Arc::ptr_eq(&original, &fresh));
    }

    #[test]
    fn replacing_the_policy_drops_the_cache_without_disposal() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let hook = {
            let disposed = disposed.clone();
            TypedHook::<Service>::new().on_dispose(move |_| {
                disposed.fetch_add(1, Ordering::SeqCst);
            })
        };
        let provider = Provider::new(|_, _| Ok(Service(0))).with_hook(hook);
        let container = container();
        provider.bind(container.id());
        let stale = provider.provide(&container, &ResolveArgs::new()).unwrap();

        let provider = provider.with_cache(CachePolicy::Single);
        provider.bind(container.id());
        let fresh = provider.provide(&container, &ResolveArgs::new()).unwrap();

        // the old instance was dropped, not disposed
        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert_eq!(disposed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dispose_runs_hooks_once_per_instance_and_clears_the_cache() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let hook = {
            let disposed = disposed.clone();
            TypedHook::<Service>::new().on_dispose(move |_| {
                disposed.fetch_add(1, Ordering::SeqCst);
            })
        };
        let provider = Provider::new(|_, _| Ok(Service(0))).with_hook(hook);
        let container = container();
        provider.bind(container.id());
        provider.provide(&container, &ResolveArgs::new()).unwrap();

        provider.dispose().unwrap();
        provider.dispose().unwrap();

        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }
}
