//! Binding registration API.
//!
//! [`Container::bind`](crate::Container::bind) returns a [`BindingBuilder`]: pick a
//! scope, optionally enable cleanup, then finish with one of the `to_*` provider
//! methods. Nothing is registered until a `to_*` method succeeds.

use std::any::type_name;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{BoxError, DiError, DiResult};
use crate::internal::BoxFuture;
use crate::key::Key;
use crate::provider::{Container, ResolverContext};
use crate::registration::{AnyArc, AsyncCtor, Binding, InsertMode, Provided, Provider, Resource, SyncCtor};
use crate::scope_kind::ScopeKind;

mod dependencies;

pub use dependencies::{Dependencies, Injectable};

/// Whether the builder registers through `bind` or `rebind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindMode {
    Bind,
    Rebind,
}

/// Builder for a single binding of the contract `T`.
///
/// The scope defaults to [`ScopeKind::Transient`]. Cleanup defaults to the
/// container's `enable_cleanup` option.
///
/// # Examples
///
/// ```rust
/// use scoped_injector::{BoxError, Container, Resolver};
/// use std::sync::Arc;
///
/// struct Config {
///     database_url: String,
/// }
///
/// struct Database {
///     url: String,
/// }
///
/// let container = Container::new();
/// container
///     .bind::<Config>()
///     .singleton()
///     .to_value(Arc::new(Config { database_url: "postgres://localhost".into() }))
///     .unwrap();
/// container
///     .bind::<Database>()
///     .singleton()
///     .to_factory(|config: Arc<Config>| {
///         Ok(Arc::new(Database { url: config.database_url.clone() }))
///     })
///     .unwrap();
///
/// assert_eq!(container.resolve::<Database>().unwrap().url, "postgres://localhost");
/// ```
#[must_use = "a binding is only registered by one of the `to_*` methods"]
pub struct BindingBuilder<'c, T: ?Sized> {
    container: &'c Container,
    mode: BindMode,
    scope: ScopeKind,
    enable_cleanup: Option<bool>,
    _contract: PhantomData<fn() -> Arc<T>>,
}

impl<'c, T: ?Sized + Send + Sync + 'static> BindingBuilder<'c, T> {
    pub(crate) fn new(container: &'c Container, mode: BindMode) -> Self {
        Self {
            container,
            mode,
            scope: ScopeKind::default(),
            enable_cleanup: None,
            _contract: PhantomData,
        }
    }

    pub fn in_scope(mut self, scope: ScopeKind) -> Self {
        self.scope = scope;
        self
    }

    pub fn singleton(self) -> Self {
        self.in_scope(ScopeKind::Singleton)
    }

    pub fn request(self) -> Self {
        self.in_scope(ScopeKind::Request)
    }

    pub fn transient(self) -> Self {
        self.in_scope(ScopeKind::Transient)
    }

    /// Track the instance's release action in its owning scope.
    ///
    /// Enabling cleanup on a Transient binding is a configuration error.
    pub fn enable_cleanup(mut self, enabled: bool) -> Self {
        self.enable_cleanup = Some(enabled);
        self
    }

    /// Binds a pre-built instance.
    pub fn to_value(self, instance: Arc<T>) -> DiResult<()> {
        let ctor: SyncCtor = Arc::new(move |_: &ResolverContext, _: Vec<AnyArc>| -> DiResult<Provided> {
            Ok(Provided::from_arc(instance.clone()))
        });
        self.finish(Provider::Sync(ctor), Vec::new(), type_name::<T>())
    }

    /// Binds a synchronous factory over the declared dependencies `D`.
    pub fn to_factory<D, F>(self, factory: F) -> DiResult<()>
    where
        D: Dependencies,
        F: Fn(D) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    {
        let service = type_name::<T>();
        let ctor: SyncCtor = Arc::new(move |_: &ResolverContext, deps: Vec<AnyArc>| -> DiResult<Provided> {
            let deps = D::from_instances(deps)?;
            let instance = factory(deps).map_err(|e| DiError::provider(service, e))?;
            Ok(Provided::from_arc(instance))
        });
        self.finish(Provider::Sync(ctor), D::keys(), service)
    }

    /// Binds a synchronous factory whose instance carries a release action.
    pub fn to_resource<D, F>(self, factory: F) -> DiResult<()>
    where
        D: Dependencies,
        F: Fn(D) -> Result<Resource<T>, BoxError> + Send + Sync + 'static,
    {
        let service = type_name::<T>();
        let ctor: SyncCtor = Arc::new(move |_: &ResolverContext, deps: Vec<AnyArc>| -> DiResult<Provided> {
            let deps = D::from_instances(deps)?;
            let resource = factory(deps).map_err(|e| DiError::provider(service, e))?;
            Ok(resource.into_provided())
        });
        self.finish(Provider::Sync(ctor), D::keys(), service)
    }

    /// Binds an asynchronous factory. Only `resolve_async` can construct it.
    pub fn to_async_factory<D, F, Fut>(self, factory: F) -> DiResult<()>
    where
        D: Dependencies,
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<T>, BoxError>> + Send + 'static,
    {
        let service = type_name::<T>();
        let ctor: AsyncCtor = Arc::new(move |_: ResolverContext, deps: Vec<AnyArc>| -> BoxFuture<'static, DiResult<Provided>> {
            let pending = D::from_instances(deps).map(|deps| factory(deps));
            Box::pin(async move {
                let instance = pending?.await.map_err(|e| DiError::provider(service, e))?;
                Ok::<_, DiError>(Provided::from_arc(instance))
            })
        });
        self.finish(Provider::Async(ctor), D::keys(), service)
    }

    /// Asynchronous counterpart of [`to_resource`](Self::to_resource).
    pub fn to_async_resource<D, F, Fut>(self, factory: F) -> DiResult<()>
    where
        D: Dependencies,
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resource<T>, BoxError>> + Send + 'static,
    {
        let service = type_name::<T>();
        let ctor: AsyncCtor = Arc::new(move |_: ResolverContext, deps: Vec<AnyArc>| -> BoxFuture<'static, DiResult<Provided>> {
            let pending = D::from_instances(deps).map(|deps| factory(deps));
            Box::pin(async move {
                let resource = pending?.await.map_err(|e| DiError::provider(service, e))?;
                Ok::<_, DiError>(resource.into_provided())
            })
        });
        self.finish(Provider::Async(ctor), D::keys(), service)
    }

    /// Binds a factory that resolves what it needs through the context.
    ///
    /// Such a provider declares no dependencies, so cycles through it are
    /// caught while resolving rather than up front. Errors are returned as-is;
    /// wrap the provider's own failures with [`DiError::provider`].
    pub fn to_factory_with_resolver<F>(self, factory: F) -> DiResult<()>
    where
        F: Fn(&ResolverContext) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        let ctor: SyncCtor = Arc::new(move |ctx: &ResolverContext, _: Vec<AnyArc>| -> DiResult<Provided> {
            factory(ctx).map(Provided::from_arc)
        });
        self.finish(Provider::Sync(ctor), Vec::new(), type_name::<T>())
    }

    /// Asynchronous counterpart of [`to_factory_with_resolver`](Self::to_factory_with_resolver).
    pub fn to_async_factory_with_resolver<F, Fut>(self, factory: F) -> DiResult<()>
    where
        F: Fn(ResolverContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<Arc<T>>> + Send + 'static,
    {
        let ctor: AsyncCtor = Arc::new(move |ctx: ResolverContext, _: Vec<AnyArc>| -> BoxFuture<'static, DiResult<Provided>> {
            let pending = factory(ctx);
            Box::pin(async move { pending.await.map(Provided::from_arc) })
        });
        self.finish(Provider::Async(ctor), Vec::new(), type_name::<T>())
    }

    /// Binds the contract to an [`Injectable`] implementation `C`.
    ///
    /// `cast` converts the implementation into the contract, typically an
    /// unsizing coercion such as `|repo| repo as Arc<dyn Repository>`.
    pub fn to_injectable<C, F>(self, cast: F) -> DiResult<()>
    where
        C: Injectable,
        F: Fn(Arc<C>) -> Arc<T> + Send + Sync + 'static,
    {
        let implementation = type_name::<C>();
        let ctor: SyncCtor = Arc::new(move |_: &ResolverContext, deps: Vec<AnyArc>| -> DiResult<Provided> {
            let deps = C::Deps::from_instances(deps)?;
            let instance = C::inject(deps).map_err(|e| DiError::provider(implementation, e))?;
            Ok(Provided::from_arc(cast(Arc::new(instance))))
        });
        self.finish(Provider::Sync(ctor), C::Deps::keys(), implementation)
    }

    fn finish(self, provider: Provider, dependencies: Vec<Key>, implementation: &'static str) -> DiResult<()> {
        let binding = Binding {
            key: Key::of::<T>(),
            scope: self.scope,
            provider,
            dependencies,
            enable_cleanup: self.enable_cleanup,
            implementation,
        };
        let mode = match self.mode {
            BindMode::Bind => InsertMode::Bind(self.container.options().duplicate_bindings),
            BindMode::Rebind => InsertMode::Rebind,
        };
        self.container.install(binding, mode)
    }
}

impl<'c, T: Injectable> BindingBuilder<'c, T> {
    /// Binds `T` to itself, built through [`Injectable::inject`].
    pub fn to_self(self) -> DiResult<()> {
        self.to_injectable::<T, _>(|instance| instance)
    }
}
