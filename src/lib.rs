//! Hierarchical dependency injection container
//!
//! Registrations bind dependency keys to providers; a provider wraps a
//! factory, a caching policy and lifecycle hooks; containers resolve keys
//! through a parent/child scope tree, with tags restricting where a
//! registration is visible.
//!
//! # Example
//! ```
//! use istra::{Container, Error, ManifestInjector, Registration};
//!
//! #[derive(Debug)]
//! struct Logger;
//!
//! let container = Container::new(ManifestInjector);
//! container.add(Registration::factory("logger", |_, _| Ok(Logger)))?;
//!
//! // single-value caching: the same instance, every time
//! let first = container.resolve_shared::<Logger>("logger")?;
//! let second = container.resolve_shared::<Logger>("logger")?;
//! assert!(std::sync::Arc::ptr_eq(&first, &second));
//!
//! // a scope inherits the parent's registrations by reference
//! let scope = container.create_scope(["request"])?;
//! let inherited = scope.resolve_shared::<Logger>("logger")?;
//! assert!(std::sync::Arc::ptr_eq(&first, &inherited));
//! # Ok::<(), Error>(())
//! ```

pub use crate::{
    cache::{CacheKey, CachePolicy, InstanceCache, KeyFn, ResolveArgs},
    container::{Container, ContainerId, ContainerOptions},
    error::Error,
    hooks::{LifecycleHook, NoopHook, TypedHook},
    injector::{
        ArgResolver, ClassManifest, Construct, ConstructorArgs, Injector, ManifestInjector,
    },
    key::{DependencyKey, Tag},
    provider::{FactoryFn, Provider},
    registration::{Registration, RegistrationBuilder},
};

pub mod cache;
pub mod container;
pub mod error;
pub mod hooks;
pub mod injector;
pub mod key;
pub mod provider;
pub mod registration;

use std::{any::Any, sync::Arc};

/// A type-erased, shared instance produced by a provider.
pub type Instance = Arc<dyn Any + Send + Sync>;
