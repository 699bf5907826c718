//! Constructor argument resolution
//!
//! The container does not reflect over constructors; classes describe
//! themselves through a [`ClassManifest`] and a pluggable [`Injector`]
//! strategy turns a manifest into an ordered list of argument resolvers.

use std::{
    any::{type_name, TypeId},
    sync::Arc,
    vec,
};

use crate::{
    cache::ResolveArgs,
    container::Container,
    error::Error,
    key::DependencyKey,
    Instance,
};

/// Describes a constructible class: its identity, the key it is registered
/// under by default and the ordered keys of its constructor parameters.
#[derive(Debug, Clone)]
pub struct ClassManifest {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub key: Option<DependencyKey>,
    pub dependencies: Vec<DependencyKey>,
}

impl ClassManifest {
    /// An empty manifest for the type `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            key: None,
            dependencies: Vec::new(),
        }
    }

    /// Sets the key class-based registrations default to.
    pub fn with_key(mut self, key: impl Into<DependencyKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Appends a constructor parameter key; order matters.
    pub fn with_dependency(mut self, key: impl Into<DependencyKey>) -> Self {
        self.dependencies.push(key.into());
        self
    }
}

/// A trait that adds the ability to construct a type from dependencies
/// resolved through the container.
///
/// # Example
/// ```
/// use istra::{manifest, ClassManifest, Construct, ConstructorArgs, Error};
/// use std::sync::Arc;
///
/// struct Logger;
///
/// struct App {
///     logger: Arc<Logger>,
/// }
///
/// impl Construct for App {
///     fn manifest() -> ClassManifest {
///         manifest!(App, key: "app", deps: ["ILogger"])
///     }
///
///     fn construct(mut args: ConstructorArgs) -> Result<Self, Error> {
///         Ok(Self { logger: args.next_arg()? })
///     }
/// }
/// ```
pub trait Construct: Sized + Send + Sync + 'static {
    /// Describes the class to the injector.
    fn manifest() -> ClassManifest;

    /// Builds the instance from already-resolved constructor arguments,
    /// in manifest order.
    fn construct(args: ConstructorArgs) -> Result<Self, Error>;
}

/// The ordered constructor arguments an injector resolved for a class.
pub struct ConstructorArgs {
    type_name: &'static str,
    values: vec::IntoIter<Instance>,
}

impl ConstructorArgs {
    pub(crate) fn new(type_name: &'static str, values: Vec<Instance>) -> Self {
        Self {
            type_name,
            values: values.into_iter(),
        }
    }

    /// Takes the next argument, downcast to `T`.
    pub fn next_arg<T: Send + Sync + 'static>(&mut self) -> Result<Arc<T>, Error> {
        let Some(value) = self.values.next() else {
            return Err(Error::ResolveFailed {
                type_name: self.type_name,
            });
        };
        value.downcast::<T>().map_err(|_| Error::ResolveFailed {
            type_name: type_name::<T>(),
        })
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

/// Resolves one constructor parameter against a container.
pub type ArgResolver =
    Arc<dyn Fn(&Container, &ResolveArgs) -> Result<Instance, Error> + Send + Sync>;

/// The strategy that turns a class into an ordered argument-resolver list.
///
/// The container invokes each resolver with itself as argument, left to
/// right, synchronously, before constructing the instance. How the list is
/// derived is entirely up to the implementation.
pub trait Injector: Send + Sync {
    fn resolve_args(&self, class: &ClassManifest) -> Result<Vec<ArgResolver>, Error>;
}

/// The default [`Injector`]: one resolver per dependency key the manifest
/// declares, each a plain keyed `resolve` against the calling container.
pub struct ManifestInjector;

impl Injector for ManifestInjector {
    fn resolve_args(&self, class: &ClassManifest) -> Result<Vec<ArgResolver>, Error> {
        Ok(class
            .dependencies
            .iter()
            .cloned()
            .map(|key| {
                let resolver: ArgResolver = Arc::new(move |container: &Container, _: &ResolveArgs| {
                    container.resolve_instance(&key, &ResolveArgs::new())
                });
                resolver
            })
            .collect())
    }
}

/// Builds a [`ClassManifest`] without spelling out the builder chain.
///
/// # Example
/// ```
/// use istra::{manifest, ClassManifest};
///
/// struct App;
///
/// let plain: ClassManifest = manifest!(App);
/// let keyed = manifest!(App, key: "app");
/// let full = manifest!(App, key: "app", deps: ["ILogger", "config"]);
/// # let _ = (plain, keyed, full);
/// ```
#[macro_export]
macro_rules! manifest {
    ($class:ty) => {
        $crate::ClassManifest::of::<$class>()
    };
    ($class:ty, key: $key:expr) => {
        $crate::ClassManifest::of::<$class>().with_key($key)
    };
    ($class:ty, deps: [$($dep:expr),* $(,)?]) => {
        $crate::ClassManifest::of::<$class>()$(.with_dependency($dep))*
    };
    ($class:ty, key: $key:expr, deps: [$($dep:expr),* $(,)?]) => {
        $crate::ClassManifest::of::<$class>().with_key($key)$(.with_dependency($dep))*
    };
}
