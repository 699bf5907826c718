//! Dependency Injection container and scope tree

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
};

use tracing::debug;

use crate::{
    cache::ResolveArgs,
    error::Error,
    injector::{Construct, ConstructorArgs, Injector},
    key::{DependencyKey, Tag},
    provider::Provider,
    registration::Registration,
    Instance,
};

/// A process-unique container identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(u64);

impl ContainerId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container-{}", self.0)
    }
}

/// Optional configuration for a container built directly rather than through
/// [`Container::create_scope`].
///
/// A container parented this way inherits the parent's resolution chain but
/// is *not* tracked by the parent: the parent's `dispose` will not cascade
/// into it.
#[derive(Default)]
pub struct ContainerOptions {
    pub parent: Option<Container>,
    pub tags: Vec<Tag>,
}

struct ContainerInner {
    id: ContainerId,
    parent: Weak<ContainerInner>,
    tags: Vec<Tag>,
    injector: Arc<dyn Injector>,
    registry: Mutex<Vec<Registration>>,
    children: Mutex<Vec<Container>>,
    disposed: AtomicBool,
}

/// The resolution engine: an ordered registry of [`Registration`]s, an
/// optional parent link and a tag set.
///
/// `resolve` walks the ancestor chain starting at the queried container.
/// The nearest container wins; within one container the last-registered
/// matching registration wins, which doubles as the override mechanism —
/// re-registering a key silently shadows the earlier binding, so overrides
/// must be deliberate.
///
/// A container is a cheap handle; cloning it shares the underlying scope.
///
/// # Example
/// ```
/// use istra::{Container, Error, ManifestInjector, Registration};
///
/// #[derive(Debug)]
/// struct Logger;
///
/// let container = Container::new(ManifestInjector);
/// container.add(Registration::factory("logger", |_, _| Ok(Logger)))?;
///
/// let first = container.resolve_shared::<Logger>("logger")?;
/// let second = container.resolve_shared::<Logger>("logger")?;
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// # Ok::<(), Error>(())
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    /// Creates a root container with the given injector strategy.
    pub fn new(injector: impl Injector + 'static) -> Self {
        Self::with_options(injector, ContainerOptions::default())
    }

    /// Creates a container with an explicit parent and/or tags.
    pub fn with_options(injector: impl Injector + 'static, options: ContainerOptions) -> Self {
        Self::build(Arc::new(injector), options)
    }

    fn build(injector: Arc<dyn Injector>, options: ContainerOptions) -> Self {
        let parent = options
            .parent
            .map(|parent| Arc::downgrade(&parent.inner))
            .unwrap_or_else(Weak::new);
        Self {
            inner: Arc::new(ContainerInner {
                id: ContainerId::next(),
                parent,
                tags: options.tags,
                injector,
                registry: Mutex::new(Vec::new()),
                children: Mutex::new(Vec::new()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> ContainerId {
        self.inner.id
    }

    #[inline]
    pub fn tags(&self) -> &[Tag] {
        &self.inner.tags
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Adds a registration to this container's own registry.
    ///
    /// Binds the registration's provider to this container; an already-bound
    /// provider keeps its first owner and will refuse to provide here.
    pub fn add(&self, registration: Registration) -> Result<&Self, Error> {
        self.ensure_active()?;
        registration.provider().bind(self.inner.id);
        self.lock_registry().push(registration);
        Ok(self)
    }

    /// Registers a provider under a single key.
    pub fn register(
        &self,
        key: impl Into<DependencyKey>,
        provider: Provider,
    ) -> Result<&Self, Error> {
        self.add(Registration::with_provider(key.into(), provider))
    }

    /// Resolves a key and returns a cloned instance. `T` must implement
    /// [`Clone`]; otherwise use [`resolve_shared`](Container::resolve_shared).
    #[inline]
    pub fn resolve<T: Clone + Send + Sync + 'static>(
        &self,
        key: impl Into<DependencyKey>,
    ) -> Result<T, Error> {
        self.resolve_shared(key).map(|shared: Arc<T>| shared.as_ref().clone())
    }

    /// Resolves a key and returns a shared pointer to the instance.
    #[inline]
    pub fn resolve_shared<T: Send + Sync + 'static>(
        &self,
        key: impl Into<DependencyKey>,
    ) -> Result<Arc<T>, Error> {
        self.resolve_with(key, &ResolveArgs::new())
    }

    /// Resolves a key with extra arguments forwarded to the provider's
    /// factory and cache key function.
    pub fn resolve_with<T: Send + Sync + 'static>(
        &self,
        key: impl Into<DependencyKey>,
        args: &ResolveArgs,
    ) -> Result<Arc<T>, Error> {
        let key = key.into();
        self.resolve_instance(&key, args)?
            .downcast::<T>()
            .map_err(|_| Error::ResolveFailed {
                type_name: std::any::type_name::<T>(),
            })
    }

    /// Untyped core resolution.
    ///
    /// Matching always uses *this* container's tags, even while walking
    /// ancestor registries; the provider is invoked with the container that
    /// owns the matching registration, so nested resolutions and caching see
    /// the owning level's context. A disposed ancestor ends the walk.
    pub fn resolve_instance(
        &self,
        key: &DependencyKey,
        args: &ResolveArgs,
    ) -> Result<Instance, Error> {
        self.ensure_active()?;

        let tags = &self.inner.tags;
        let mut level = Some(self.inner.clone());
        while let Some(current) = level {
            if current.disposed.load(Ordering::SeqCst) {
                debug!(container = %current.id, %key, "walk reached a disposed ancestor");
                break;
            }
            // the lock must not be held across provide(): factories resolve
            // their own dependencies back through this registry
            let found = {
                let registry = current.registry.lock().unwrap_or_else(PoisonError::into_inner);
                registry.iter().rev().find(|r| r.matches(key, tags)).cloned()
            };
            if let Some(registration) = found {
                debug!(container = %current.id, %key, "registration matched");
                let owner = Container { inner: current };
                return registration.provider().provide(&owner, args);
            }
            level = current.parent.upgrade();
        }
        Err(Error::DependencyNotFound(key.clone()))
    }

    /// Constructs `T` directly through the injector, bypassing providers and
    /// caches: every call yields a fresh instance.
    #[inline]
    pub fn construct<T: Construct>(&self) -> Result<T, Error> {
        self.construct_with(&ResolveArgs::new())
    }

    /// [`construct`](Container::construct) with extra arguments forwarded to
    /// the injector's argument resolvers.
    pub fn construct_with<T: Construct>(&self, args: &ResolveArgs) -> Result<T, Error> {
        self.ensure_active()?;

        let manifest = T::manifest();
        let resolvers = self.inner.injector.resolve_args(&manifest)?;

        let mut values = Vec::with_capacity(resolvers.len());
        for resolver in &resolvers {
            values.push(resolver(self, args)?);
        }
        T::construct(ConstructorArgs::new(manifest.type_name, values))
    }

    /// Creates a child scope: empty registry, the given tags, the parent's
    /// injector and resolution chain. The parent tracks the child so that
    /// `dispose` cascades into it.
    pub fn create_scope<I, T>(&self, tags: I) -> Result<Container, Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        self.ensure_active()?;

        let child = Self::build(
            self.inner.injector.clone(),
            ContainerOptions {
                parent: Some(self.clone()),
                tags: tags.into_iter().map(Into::into).collect(),
            },
        );
        debug!(parent = %self.inner.id, child = %child.inner.id, "scope created");

        self.lock_children().push(child.clone());
        Ok(child)
    }

    /// Disposes this container: every provider it owns runs its disposal
    /// hooks, then every scope it created is disposed, in creation order.
    ///
    /// Idempotent — disposing twice is a no-op. Once disposed, all other
    /// operations fail with [`Error::LocatorDisposed`].
    pub fn dispose(&self) -> Result<(), Error> {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!(container = %self.inner.id, "disposing container");

        let registrations = std::mem::take(&mut *self.lock_registry());
        for registration in &registrations {
            registration.provider().dispose()?;
        }

        let children = std::mem::take(&mut *self.lock_children());
        for child in &children {
            child.dispose()?;
        }

        // a disposed scope is inert; drop the parent's tracking handle so
        // long-lived roots do not accumulate dead children
        if let Some(parent) = self.inner.parent.upgrade() {
            let mut siblings = parent.children.lock().unwrap_or_else(PoisonError::into_inner);
            siblings.retain(|sibling| sibling.inner.id != self.inner.id);
        }
        Ok(())
    }

    #[inline]
    fn ensure_active(&self) -> Result<(), Error> {
        if self.is_disposed() {
            Err(Error::LocatorDisposed)
        } else {
            Ok(())
        }
    }

    #[inline]
    fn lock_registry(&self) -> MutexGuard<'_, Vec<Registration>> {
        self.inner.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn lock_children(&self) -> MutexGuard<'_, Vec<Container>> {
        self.inner.children.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("tags", &self.inner.tags)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
