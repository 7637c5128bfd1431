//! Declared dependency lists.
//!
//! A provider states what it needs through its argument type: `()` for
//! nothing, `Arc<A>` for one service, or a tuple `(Arc<A>, Arc<B>, ..)`.
//! The container resolves the listed identities in order before calling it.

use std::sync::Arc;

use crate::error::{BoxError, DiError, DiResult};
use crate::key::Key;
use crate::registration::{downcast, AnyArc};

/// A list of service identities resolved before a provider runs.
pub trait Dependencies: Sized + Send + 'static {
    /// Identities in declaration order.
    fn keys() -> Vec<Key>;

    #[doc(hidden)]
    fn from_instances(instances: Vec<AnyArc>) -> DiResult<Self>;
}

impl Dependencies for () {
    fn keys() -> Vec<Key> {
        Vec::new()
    }

    fn from_instances(_instances: Vec<AnyArc>) -> DiResult<Self> {
        Ok(())
    }
}

impl<T: ?Sized + Send + Sync + 'static> Dependencies for Arc<T> {
    fn keys() -> Vec<Key> {
        vec![Key::of::<T>()]
    }

    fn from_instances(instances: Vec<AnyArc>) -> DiResult<Self> {
        let key = Key::of::<T>();
        let any = instances
            .into_iter()
            .next()
            .ok_or(DiError::TypeMismatch(key.display_name()))?;
        downcast::<T>(key, &any)
    }
}

macro_rules! impl_dependencies {
    ($($T:ident),+) => {
        impl<$($T: ?Sized + Send + Sync + 'static),+> Dependencies for ($(Arc<$T>,)+) {
            fn keys() -> Vec<Key> {
                vec![$(Key::of::<$T>()),+]
            }

            fn from_instances(instances: Vec<AnyArc>) -> DiResult<Self> {
                let mut instances = instances.into_iter();
                Ok(($(
                    {
                        let key = Key::of::<$T>();
                        let any = instances.next().ok_or(DiError::TypeMismatch(key.display_name()))?;
                        downcast::<$T>(key, &any)?
                    },
                )+))
            }
        }
    };
}

impl_dependencies!(T1);
impl_dependencies!(T1, T2);
impl_dependencies!(T1, T2, T3);
impl_dependencies!(T1, T2, T3, T4);
impl_dependencies!(T1, T2, T3, T4, T5);
impl_dependencies!(T1, T2, T3, T4, T5, T6);
impl_dependencies!(T1, T2, T3, T4, T5, T6, T7);
impl_dependencies!(T1, T2, T3, T4, T5, T6, T7, T8);

/// A type the container can build from its declared dependencies.
///
/// # Examples
///
/// ```
/// use scoped_injector::{BoxError, Container, Injectable, Resolver};
/// use std::sync::Arc;
///
/// struct Database;
///
/// struct UserRepository {
///     db: Arc<Database>,
/// }
///
/// impl Injectable for UserRepository {
///     type Deps = (Arc<Database>,);
///
///     fn inject((db,): Self::Deps) -> Result<Self, BoxError> {
///         Ok(UserRepository { db })
///     }
/// }
///
/// let container = Container::new();
/// container.bind::<Database>().singleton().to_value(Arc::new(Database)).unwrap();
/// container.bind::<UserRepository>().request().to_self().unwrap();
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    type Deps: Dependencies;

    fn inject(deps: Self::Deps) -> Result<Self, BoxError>;
}
