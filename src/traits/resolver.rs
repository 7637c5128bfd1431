//! Resolver traits for service resolution.

use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::registration::{downcast, AnyArc};

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by [`Container`](crate::Container), [`RequestScope`](crate::RequestScope)
/// and [`ResolverContext`](crate::ResolverContext). Each implementation decides which
/// request scope (if any) Request-scoped identities resolve against.
///
/// Most users should use the [`Resolver`] trait instead, which provides the
/// generic methods built on top of this trait.
pub trait ResolverCore: Send + Sync {
    /// Resolves the instance bound to `key` without awaiting.
    ///
    /// Fails with [`DiError::AsyncRequired`] if the binding or any of its
    /// dependencies has an asynchronous provider.
    fn resolve_any(&self, key: Key) -> DiResult<AnyArc>;
}

/// Generic, type-safe resolution built on [`ResolverCore`].
///
/// # Examples
///
/// ```
/// use scoped_injector::{Container, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str);
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) {
///         println!("LOG: {}", msg);
///     }
/// }
///
/// let container = Container::new();
/// container.bind::<usize>().singleton().to_value(Arc::new(42)).unwrap();
/// container
///     .bind::<dyn Logger>()
///     .singleton()
///     .to_value(Arc::new(ConsoleLogger) as Arc<dyn Logger>)
///     .unwrap();
///
/// assert_eq!(*container.resolve::<usize>().unwrap(), 42);
/// container.resolve::<dyn Logger>().unwrap().log("resolved");
/// assert!(container.try_resolve::<String>().unwrap().is_none());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves the contract `T`.
    fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let key = Key::of::<T>();
        let any = self.resolve_any(key)?;
        downcast::<T>(key, &any)
    }

    /// Resolves `T`, returning `None` if `T` itself has no binding.
    ///
    /// A missing binding deeper in the graph is still an error.
    fn try_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        let key = Key::of::<T>();
        match self.resolve::<T>() {
            Ok(instance) => Ok(Some(instance)),
            Err(DiError::Unbound(name)) if name == key.display_name() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
