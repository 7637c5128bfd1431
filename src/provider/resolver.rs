//! Recursive resolution of bindings.
//!
//! Sync and async resolution are two parallel paths over the same steps:
//! enter the chain, look up the binding, pick the owning scope, resolve the
//! declared dependencies in order, call the provider, cache the result.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::internal::BoxFuture;
use crate::key::Key;
use crate::registration::{AnyArc, Binding, Provided, Provider};
use crate::scope_kind::ScopeKind;

use super::context::{RequestAccess, ResolverContext};
use super::scope::ScopeInstance;
use super::Container;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Blocking,
    Async,
}

/// Entry point for blocking top-level resolution.
pub(crate) fn resolve_root(container: &Container, request: RequestAccess, key: Key) -> DiResult<AnyArc> {
    ensure_open(container, &request)?;
    let ctx = ResolverContext::root(container.clone(), request);
    preflight(&ctx, key, Mode::Blocking)?;
    resolve_key(&ctx, key)
}

/// Entry point for asynchronous top-level resolution.
pub(crate) async fn resolve_root_async(container: Container, request: RequestAccess, key: Key) -> DiResult<AnyArc> {
    ensure_open(&container, &request)?;
    let ctx = ResolverContext::root(container, request);
    preflight(&ctx, key, Mode::Async)?;
    resolve_key_async(ctx, key).await
}

// A handle to a closed request scope resolves nothing, not even identities
// it would never cache.
fn ensure_open(container: &Container, request: &RequestAccess) -> DiResult<()> {
    container.singletons().ensure_active()?;
    if let RequestAccess::Available(scope) = request {
        scope.ensure_active()?;
    }
    Ok(())
}

pub(crate) fn resolve_key(ctx: &ResolverContext, key: Key) -> DiResult<AnyArc> {
    let _guard = ctx.chain.enter(key)?;
    let binding = ctx.container.registry().lookup(key)?;

    match owner_scope(ctx, &binding)? {
        None => construct(ctx, &binding).map(|provided| provided.instance),
        Some(scope) => {
            let track = binding.cleanup_enabled(ctx.container.options().enable_cleanup);
            scope.get_or_create(&binding, track, || construct(ctx, &binding))
        }
    }
}

pub(crate) fn resolve_key_async(ctx: ResolverContext, key: Key) -> BoxFuture<'static, DiResult<AnyArc>> {
    Box::pin(async move {
        let _guard = ctx.chain.enter(key)?;
        let binding = ctx.container.registry().lookup(key)?;

        match owner_scope(&ctx, &binding)? {
            None => construct_async(&ctx, &binding).await.map(|provided| provided.instance),
            Some(scope) => {
                let track = binding.cleanup_enabled(ctx.container.options().enable_cleanup);
                scope
                    .get_or_create_async(&binding, track, construct_async(&ctx, &binding))
                    .await
            }
        }
    })
}

// A cached instance of an async binding is still reachable from blocking
// code; only construction needs the async path.
fn construct(ctx: &ResolverContext, binding: &Binding) -> DiResult<Provided> {
    let Provider::Sync(ctor) = &binding.provider else {
        return Err(DiError::AsyncRequired {
            service: binding.service(),
            chain: ctx.chain.names(),
        });
    };

    let ctx = ctx.for_binding(binding);
    let mut deps = Vec::with_capacity(binding.dependencies.len());
    for dep in &binding.dependencies {
        deps.push(resolve_key(&ctx, *dep)?);
    }

    tracing::trace!(service = binding.service(), scope = %binding.scope, "constructing");
    ctor(&ctx, deps)
}

async fn construct_async(ctx: &ResolverContext, binding: &Binding) -> DiResult<Provided> {
    let ctx = ctx.for_binding(binding);
    let mut deps = Vec::with_capacity(binding.dependencies.len());
    for dep in &binding.dependencies {
        deps.push(resolve_key_async(ctx.clone(), *dep).await?);
    }

    tracing::trace!(service = binding.service(), scope = %binding.scope, "constructing");
    match &binding.provider {
        Provider::Sync(ctor) => ctor(&ctx, deps),
        Provider::Async(ctor) => ctor(ctx.clone(), deps).await,
    }
}

/// Scope instance that caches the binding's instance; `None` for transients.
fn owner_scope(ctx: &ResolverContext, binding: &Binding) -> DiResult<Option<Arc<ScopeInstance>>> {
    match binding.scope {
        ScopeKind::Transient => Ok(None),
        ScopeKind::Singleton => Ok(Some(ctx.container.singletons().clone())),
        ScopeKind::Request => match &ctx.request {
            RequestAccess::Available(scope) => Ok(Some(scope.clone())),
            RequestAccess::Unavailable => Err(DiError::NoRequestScope(binding.service())),
            RequestAccess::Withheld { singleton } => Err(captive(singleton, binding.service())),
        },
    }
}

fn captive(singleton: &str, service: &str) -> DiError {
    DiError::Configuration(format!(
        "singleton {} cannot depend on request-scoped {}",
        singleton, service
    ))
}

/// Walks the declared dependency graph before anything is constructed.
///
/// Reports unbound identities, declared cycles, request identities that
/// cannot be reached and, in blocking mode, asynchronous providers. Identities
/// already cached in their owning scope are not walked further.
fn preflight(ctx: &ResolverContext, key: Key, mode: Mode) -> DiResult<()> {
    let mut path = Vec::new();
    let mut done = HashSet::new();
    let withheld = match &ctx.request {
        RequestAccess::Withheld { singleton } => Some(*singleton),
        _ => None,
    };
    visit(ctx, key, mode, withheld, &mut path, &mut done)
}

fn visit(
    ctx: &ResolverContext,
    key: Key,
    mode: Mode,
    under_singleton: Option<&'static str>,
    path: &mut Vec<Key>,
    done: &mut HashSet<(Key, bool)>,
) -> DiResult<()> {
    let visited = (key, under_singleton.is_some());
    if done.contains(&visited) {
        return Ok(());
    }
    if path.contains(&key) {
        let mut cycle: Vec<&'static str> = path.iter().map(Key::display_name).collect();
        cycle.push(key.display_name());
        return Err(DiError::Circular(cycle));
    }
    if path.len() >= ctx.chain.max_depth() {
        return Err(DiError::DepthExceeded(path.len()));
    }

    let binding = ctx.container.registry().lookup(key)?;

    let cached = match binding.scope {
        ScopeKind::Transient => false,
        ScopeKind::Singleton => ctx.container.singletons().contains(&key),
        ScopeKind::Request => {
            if let Some(singleton) = under_singleton {
                return Err(captive(singleton, binding.service()));
            }
            match &ctx.request {
                RequestAccess::Available(scope) => {
                    scope.ensure_active()?;
                    scope.contains(&key)
                }
                _ => return Err(DiError::NoRequestScope(binding.service())),
            }
        }
    };
    if cached {
        done.insert(visited);
        return Ok(());
    }

    if mode == Mode::Blocking && binding.is_async() {
        let mut chain: Vec<&'static str> = path.iter().map(Key::display_name).collect();
        chain.push(key.display_name());
        return Err(DiError::AsyncRequired {
            service: binding.service(),
            chain,
        });
    }

    let under_singleton = match binding.scope {
        ScopeKind::Singleton => Some(binding.service()),
        _ => under_singleton,
    };

    path.push(key);
    for dep in &binding.dependencies {
        visit(ctx, *dep, mode, under_singleton, path, done)?;
    }
    path.pop();
    done.insert(visited);
    Ok(())
}
