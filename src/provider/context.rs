//! Resolver context for dependency injection.
//!
//! This module contains the ResolverContext type which carries one
//! top-level resolution through every provider it invokes.

use std::sync::Arc;

use crate::error::DiResult;
use crate::internal::ResolutionChain;
use crate::key::Key;
use crate::registration::{downcast, AnyArc, Binding};
use crate::scope_kind::ScopeKind;
use crate::traits::ResolverCore;

use super::scope::{ScopeId, ScopeInstance};
use super::{resolver, Container};

/// Which request scope, if any, Request identities resolve against.
#[derive(Clone)]
pub(crate) enum RequestAccess {
    Available(Arc<ScopeInstance>),
    Unavailable,
    /// Inside the construction of the named singleton
    Withheld { singleton: &'static str },
}

/// Context passed to re-entrant providers.
///
/// A provider bound with `to_factory_with_resolver` receives the context of the
/// resolution that is constructing it. Resolving through the context shares
/// that resolution's chain, so a provider that asks for itself, directly or
/// through others, gets [`DiError::Circular`](crate::DiError::Circular) instead of
/// recursing forever.
///
/// # Examples
///
/// ```
/// use scoped_injector::{Container, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let container = Container::new();
/// container
///     .bind::<Database>()
///     .singleton()
///     .to_value(Arc::new(Database { url: "postgres://localhost".into() }))
///     .unwrap();
/// container
///     .bind::<UserService>()
///     .to_factory_with_resolver(|ctx| {
///         Ok(Arc::new(UserService { db: ctx.resolve::<Database>()? }))
///     })
///     .unwrap();
///
/// let service = container.resolve::<UserService>().unwrap();
/// assert_eq!(service.db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct ResolverContext {
    pub(crate) container: Container,
    pub(crate) request: RequestAccess,
    pub(crate) chain: ResolutionChain,
}

impl ResolverContext {
    pub(crate) fn root(container: Container, request: RequestAccess) -> Self {
        let chain = ResolutionChain::new(container.options().max_depth);
        Self {
            container,
            request,
            chain,
        }
    }

    /// Context used while constructing `binding`'s instance and its dependencies.
    ///
    /// A singleton must not capture request-scoped instances, so the request
    /// scope is withheld below it.
    pub(crate) fn for_binding(&self, binding: &Binding) -> Self {
        let mut ctx = self.clone();
        if binding.scope == ScopeKind::Singleton {
            ctx.request = RequestAccess::Withheld {
                singleton: binding.service(),
            };
        }
        ctx
    }

    /// The request scope this resolution runs in, if any.
    pub fn request_scope_id(&self) -> Option<ScopeId> {
        match &self.request {
            RequestAccess::Available(scope) => Some(scope.id()),
            _ => None,
        }
    }

    /// Names of the identities currently being constructed, outermost first.
    pub fn resolution_chain(&self) -> Vec<&'static str> {
        self.chain.names()
    }

    /// Resolves `T` within this resolution, awaiting asynchronous providers.
    pub async fn resolve_async<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let key = Key::of::<T>();
        let any = resolver::resolve_key_async(self.clone(), key).await?;
        downcast::<T>(key, &any)
    }
}

impl ResolverCore for ResolverContext {
    fn resolve_any(&self, key: Key) -> DiResult<AnyArc> {
        resolver::resolve_key(self, key)
    }
}
