//! Registrations: binding dependency keys to providers

use std::sync::Arc;

use crate::{
    cache::{CachePolicy, ResolveArgs},
    container::Container,
    error::Error,
    hooks::LifecycleHook,
    injector::Construct,
    key::{DependencyKey, Tag},
    provider::Provider,
};

/// Binds one or more dependency keys to a provider, optionally restricted to
/// containers carrying one of its tags.
///
/// A registration is immutable once added to a container. Its structural
/// [`Clone`] shares the provider (and therefore its cache); use
/// [`deep_clone`](Registration::deep_clone) to install a copy into a child
/// scope with its own cache.
#[derive(Clone)]
pub struct Registration {
    keys: Vec<DependencyKey>,
    tags: Vec<Tag>,
    provider: Arc<Provider>,
}

impl Registration {
    /// A registration that always resolves to the given constant value.
    /// Constants are cached single-value by definition.
    pub fn value<T: Send + Sync + 'static>(key: impl Into<DependencyKey>, value: T) -> Self {
        Self {
            keys: vec![key.into()],
            tags: Vec::new(),
            provider: Arc::new(Provider::value(value)),
        }
    }

    /// A registration built from a plain factory function.
    pub fn factory<T, F>(key: impl Into<DependencyKey>, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container, &ResolveArgs) -> Result<T, Error> + Send + Sync + 'static,
    {
        Self {
            keys: vec![key.into()],
            tags: Vec::new(),
            provider: Arc::new(Provider::new(factory)),
        }
    }

    /// A registration for a class, keyed by the manifest's declared key and
    /// constructed through the owning container's injector.
    pub fn class<T: Construct>() -> Result<Self, Error> {
        let manifest = T::manifest();
        let key = manifest.key.ok_or(Error::DependencyMissingKey {
            type_name: manifest.type_name,
        })?;
        Ok(Self {
            keys: vec![key],
            tags: Vec::new(),
            provider: Arc::new(Provider::new(|container: &Container, args: &ResolveArgs| {
                container.construct_with::<T>(args)
            })),
        })
    }

    pub(crate) fn with_provider(key: DependencyKey, provider: Provider) -> Self {
        Self {
            keys: vec![key],
            tags: Vec::new(),
            provider: Arc::new(provider),
        }
    }

    /// Starts a builder around a factory function.
    pub fn build_factory<T, F>(factory: F) -> RegistrationBuilder
    where
        T: Send + Sync + 'static,
        F: Fn(&Container, &ResolveArgs) -> Result<T, Error> + Send + Sync + 'static,
    {
        RegistrationBuilder::new(Provider::new(factory), false, None)
    }

    /// Starts a builder around a constant value. The cache policy stays
    /// single-value no matter what the builder is told afterwards.
    pub fn build_value<T: Send + Sync + 'static>(value: T) -> RegistrationBuilder {
        RegistrationBuilder::new(Provider::value(value), true, None)
    }

    /// Starts a builder around a class; the manifest's key (when declared)
    /// seeds the key list.
    pub fn build_class<T: Construct>() -> RegistrationBuilder {
        let manifest = T::manifest();
        let provider = Provider::new(|container: &Container, args: &ResolveArgs| {
            container.construct_with::<T>(args)
        });
        let mut builder = RegistrationBuilder::new(provider, false, Some(manifest.type_name));
        if let Some(key) = manifest.key {
            builder.keys.push(key);
        }
        builder
    }

    /// A copy safe to install into another scope: the provider is cloned with
    /// a fresh, empty cache, so instances are never shared across scopes.
    pub fn deep_clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
            tags: self.tags.clone(),
            provider: Arc::new(self.provider.as_ref().clone()),
        }
    }

    /// True iff the key is one of ours and the tag restriction (if any)
    /// intersects the resolving container's tags.
    pub(crate) fn matches(&self, key: &DependencyKey, container_tags: &[Tag]) -> bool {
        self.keys.contains(key)
            && (self.tags.is_empty() || self.tags.iter().any(|tag| container_tags.contains(tag)))
    }

    #[inline]
    pub fn keys(&self) -> &[DependencyKey] {
        &self.keys
    }

    #[inline]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    #[inline]
    pub(crate) fn provider(&self) -> &Arc<Provider> {
        &self.provider
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("keys", &self.keys)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Fluent configuration for a [`Registration`].
///
/// # Example
/// ```
/// use istra::{CachePolicy, Error, Registration};
///
/// #[derive(Debug)]
/// struct Logger;
///
/// let registration = Registration::build_factory(|_, _| Ok(Logger))
///     .key("logger")
///     .key("ILogger")
///     .tag("child")
///     .build()?;
/// # let _ = registration;
/// # Ok::<(), Error>(())
/// ```
pub struct RegistrationBuilder {
    keys: Vec<DependencyKey>,
    tags: Vec<Tag>,
    provider: Provider,
    single_only: bool,
    class_name: Option<&'static str>,
}

impl RegistrationBuilder {
    fn new(provider: Provider, single_only: bool, class_name: Option<&'static str>) -> Self {
        Self {
            keys: Vec::new(),
            tags: Vec::new(),
            provider,
            single_only,
            class_name,
        }
    }

    /// Adds a key; every key is an alias for the same provider.
    pub fn key(mut self, key: impl Into<DependencyKey>) -> Self {
        self.keys.push(key.into());
        self
    }

    /// Restricts the registration to containers carrying this tag.
    pub fn tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Sets the caching policy. Ignored for constant-value registrations,
    /// which always cache single-value.
    pub fn cache(mut self, policy: CachePolicy) -> Self {
        if !self.single_only {
            self.provider = self.provider.with_cache(policy);
        }
        self
    }

    /// Appends a lifecycle hook.
    pub fn hook(mut self, hook: impl LifecycleHook + 'static) -> Self {
        self.provider = self.provider.with_hook(hook);
        self
    }

    /// Finishes the registration.
    ///
    /// Fails with [`Error::NoRegistrationKeysProvided`] when no key was given,
    /// or with [`Error::DependencyMissingKey`] when a class source declared
    /// none to fall back on.
    pub fn build(self) -> Result<Registration, Error> {
        if self.keys.is_empty() {
            return Err(match self.class_name {
                Some(type_name) => Error::DependencyMissingKey { type_name },
                None => Error::NoRegistrationKeysProvided,
            });
        }
        Ok(Registration {
            keys: self.keys,
            tags: self.tags,
            provider: Arc::new(self.provider),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest;
    use crate::injector::{ClassManifest, ConstructorArgs};

    #[derive(Debug)]
    struct Logger;

    struct Keyless;

    impl Construct for Keyless {
        fn manifest() -> ClassManifest {
            manifest!(Keyless)
        }

        fn construct(_: ConstructorArgs) -> Result<Self, Error> {
            Ok(Self)
        }
    }

    #[test]
    fn it_requires_at_least_one_key() {
        let err = Registration::build_factory(|_, _| Ok(Logger))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::NoRegistrationKeysProvided));
    }

    #[test]
    fn it_rejects_class_sources_without_a_key() {
        let err = Registration::class::<Keyless>().unwrap_err();
        assert!(matches!(err, Error::DependencyMissingKey { .. }));

        let err = Registration::build_class::<Keyless>().build().unwrap_err();
        assert!(matches!(err, Error::DependencyMissingKey { .. }));
    }

    #[test]
    fn an_explicit_key_rescues_a_keyless_class() {
        let registration = Registration::build_class::<Keyless>()
            .key("keyless")
            .build()
            .unwrap();

        assert_eq!(registration.keys().to_vec(), vec![DependencyKey::from("keyless")]);
    }

    #[test]
    fn it_matches_any_alias() {
        let registration = Registration::build_factory(|_, _| Ok(Logger))
            .key("logger")
            .key("ILogger")
            .build()
            .unwrap();

        assert!(registration.matches(&"logger".into(), &[]));
        assert!(registration.matches(&"ILogger".into(), &[]));
        assert!(!registration.matches(&"cache".into(), &[]));
    }

    #[test]
    fn value_builders_carry_tags_and_aliases() {
        let registration = Registration::build_value(7i32)
            .key("seven")
            .tag("child")
            .build()
            .unwrap();

        assert!(registration.matches(&"seven".into(), &["child".into()]));
        assert!(!registration.matches(&"seven".into(), &[]));
    }

    #[test]
    fn untagged_registrations_are_visible_everywhere() {
        let registration = Registration::value("logger", Logger);

        assert!(registration.matches(&"logger".into(), &[]));
        assert!(registration.matches(&"logger".into(), &["child".into()]));
    }

    #[test]
    fn tagged_registrations_require_an_intersection() {
        let registration = Registration::build_factory(|_, _| Ok(Logger))
            .key("logger")
            .tag("child")
            .build()
            .unwrap();

        assert!(!registration.matches(&"logger".into(), &[]));
        assert!(!registration.matches(&"logger".into(), &["other".into()]));
        assert!(registration.matches(&"logger".into(), &["child".into()]));
        assert!(registration.matches(&"logger".into(), &["other".into(), "child".into()]));
    }
}
