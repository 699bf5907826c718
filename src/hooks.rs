//! Construction and disposal hooks

use std::{any::type_name, sync::Arc};

use crate::{error::Error, Instance};

/// Lifecycle callbacks a provider runs against the instances it produces.
///
/// `on_construct` runs once right after the factory built a new instance,
/// before it is cached; `on_dispose` runs once per cached instance when the
/// owning provider is disposed. Hooks attached to one provider run in
/// registration order.
pub trait LifecycleHook: Send + Sync {
    fn on_construct(&self, _instance: &Instance) -> Result<(), Error> {
        Ok(())
    }

    fn on_dispose(&self, _instance: &Instance) -> Result<(), Error> {
        Ok(())
    }
}

/// A hook that does nothing on either side of the lifecycle.
pub struct NoopHook;

impl LifecycleHook for NoopHook {}

type HookFn<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Adapts plain typed closures to [`LifecycleHook`].
///
/// The type-erased instance is downcast to `T` before the closure runs; an
/// instance of any other shape fails with [`Error::UnexpectedHookResult`]
/// instead of being silently skipped.
///
/// # Example
/// ```
/// use istra::TypedHook;
///
/// struct Connection;
///
/// let hook = TypedHook::<Connection>::new()
///     .on_construct(|_conn| println!("opened"))
///     .on_dispose(|_conn| println!("closed"));
/// # let _ = hook;
/// ```
pub struct TypedHook<T> {
    construct: Option<HookFn<T>>,
    dispose: Option<HookFn<T>>,
}

impl<T: Send + Sync + 'static> TypedHook<T> {
    pub fn new() -> Self {
        Self {
            construct: None,
            dispose: None,
        }
    }

    /// Sets the closure that runs after an instance is built.
    pub fn on_construct<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.construct = Some(Arc::new(hook));
        self
    }

    /// Sets the closure that runs when an instance is disposed.
    pub fn on_dispose<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.dispose = Some(Arc::new(hook));
        self
    }

    fn run(slot: &Option<HookFn<T>>, instance: &Instance) -> Result<(), Error> {
        let Some(hook) = slot else {
            return Ok(());
        };
        match instance.clone().downcast::<T>() {
            Ok(value) => {
                hook(&value);
                Ok(())
            }
            Err(_) => Err(Error::UnexpectedHookResult {
                type_name: type_name::<T>(),
            }),
        }
    }
}

impl<T: Send + Sync + 'static> Default for TypedHook<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> LifecycleHook for TypedHook<T> {
    fn on_construct(&self, instance: &Instance) -> Result<(), Error> {
        Self::run(&self.construct, instance)
    }

    fn on_dispose(&self, instance: &Instance) -> Result<(), Error> {
        Self::run(&self.dispose, instance)
    }
}
