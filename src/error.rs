//! Describes dependency injection errors

use crate::{container::ContainerId, key::DependencyKey};

/// Failure kinds surfaced by registration, resolution and disposal.
///
/// All of them are raised synchronously at the point of violation and
/// propagate to the immediate caller; the container never retries and
/// never recovers silently.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// No registration matched the key anywhere up the ancestor chain.
    #[error("DI Error: no registration found for key: {0}")]
    DependencyNotFound(DependencyKey),

    /// The container was disposed; it refuses all further register/resolve calls.
    #[error("DI Error: container is disposed")]
    LocatorDisposed,

    /// A registration builder was given zero dependency keys.
    #[error("DI Error: registration declares no keys")]
    NoRegistrationKeysProvided,

    /// The same provider instance was installed into more than one container
    /// without being cloned first, which would silently share its cache.
    #[error("DI Error: provider is bound to {bound} and must be cloned before use in {requested}")]
    ProviderNotCloned {
        bound: ContainerId,
        requested: ContainerId,
    },

    /// A lifecycle hook was run against an instance of a shape it does not accept.
    #[error("DI Error: lifecycle hook rejected an instance, expected {type_name}")]
    UnexpectedHookResult { type_name: &'static str },

    /// A class-based builder was used on a class that declares no dependency key.
    #[error("DI Error: class declares no dependency key: {type_name}")]
    DependencyMissingKey { type_name: &'static str },

    /// A resolved instance could not be downcast to the requested type.
    #[error("DI Error: unable to resolve the instance as: {type_name}")]
    ResolveFailed { type_name: &'static str },
}
