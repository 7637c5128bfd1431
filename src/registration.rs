//! Binding registration types.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::DuplicatePolicy;
use crate::error::{BoxError, DiError, DiResult};
use crate::internal::{BoxFuture, Release};
use crate::key::Key;
use crate::provider::ResolverContext;
use crate::scope_kind::ScopeKind;
use crate::traits::{AsyncDispose, Dispose};

/// Type-erased instance as stored in scope caches.
///
/// Always wraps an `Arc<T>` for the bound contract `T`, so trait objects and
/// concrete types are stored the same way.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> AnyArc {
    Arc::new(instance)
}

pub(crate) fn downcast<T: ?Sized + Send + Sync + 'static>(key: Key, any: &AnyArc) -> DiResult<Arc<T>> {
    any.downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or(DiError::TypeMismatch(key.display_name()))
}

pub(crate) type SyncCtor = Arc<dyn Fn(&ResolverContext, Vec<AnyArc>) -> DiResult<Provided> + Send + Sync>;
pub(crate) type AsyncCtor =
    Arc<dyn Fn(ResolverContext, Vec<AnyArc>) -> BoxFuture<'static, DiResult<Provided>> + Send + Sync>;

/// How a binding produces its instance.
#[derive(Clone)]
pub(crate) enum Provider {
    Sync(SyncCtor),
    Async(AsyncCtor),
}

/// Output of a provider: the instance plus its optional release action.
pub(crate) struct Provided {
    pub(crate) instance: AnyArc,
    pub(crate) release: Option<Release>,
}

impl Provided {
    pub(crate) fn from_arc<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> Self {
        Self {
            instance: erase(instance),
            release: None,
        }
    }
}

/// An instance paired with the action that releases it.
///
/// The release action only runs if cleanup is enabled for the binding and
/// the binding is Singleton or Request scoped. It runs exactly once, when
/// the owning scope closes, after every instance constructed later in that
/// scope has been released.
///
/// # Examples
///
/// ```
/// use scoped_injector::{BoxError, Resource};
/// use std::sync::Arc;
///
/// struct Connection;
///
/// let resource = Resource::new(Arc::new(Connection)).on_release(|| {
///     println!("connection closed");
///     Ok(())
/// });
/// assert!(resource.has_release());
/// ```
pub struct Resource<T: ?Sized> {
    instance: Arc<T>,
    release: Option<Release>,
}

impl<T: ?Sized + Send + Sync + 'static> Resource<T> {
    /// A resource with no release action yet.
    pub fn new(instance: Arc<T>) -> Self {
        Self {
            instance,
            release: None,
        }
    }

    /// Sets a synchronous release action.
    pub fn on_release<F>(mut self, release: F) -> Self
    where
        F: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        self.release = Some(Release::Sync(Box::new(release)));
        self
    }

    /// Sets an asynchronous release action. It only runs when the scope is
    /// closed with an awaited `close`.
    pub fn on_release_async<F, Fut>(mut self, release: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.release = Some(Release::Async(Box::new(move || Box::pin(release()))));
        self
    }

    pub fn instance(&self) -> &Arc<T> {
        &self.instance
    }

    pub fn has_release(&self) -> bool {
        self.release.is_some()
    }

    pub(crate) fn into_provided(self) -> Provided {
        Provided {
            instance: erase(self.instance),
            release: self.release,
        }
    }
}

impl<T: ?Sized + Dispose> Resource<T> {
    /// A resource released through its [`Dispose`] implementation.
    pub fn disposing(instance: Arc<T>) -> Self {
        let handle = instance.clone();
        Self::new(instance).on_release(move || handle.dispose())
    }
}

impl<T: ?Sized + AsyncDispose> Resource<T> {
    /// A resource released through its [`AsyncDispose`] implementation.
    pub fn disposing_async(instance: Arc<T>) -> Self {
        let handle = instance.clone();
        Self::new(instance).on_release_async(move || async move { handle.dispose().await })
    }
}

/// A registered binding. Replaced wholesale, never mutated.
pub(crate) struct Binding {
    pub(crate) key: Key,
    pub(crate) scope: ScopeKind,
    pub(crate) provider: Provider,
    pub(crate) dependencies: Vec<Key>,
    /// `None` defers to `ContainerOptions::enable_cleanup`
    pub(crate) enable_cleanup: Option<bool>,
    /// Name of the implementing type, for diagnostics
    pub(crate) implementation: &'static str,
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("dependencies", &self.dependencies)
            .field("enable_cleanup", &self.enable_cleanup)
            .field("implementation", &self.implementation)
            .finish_non_exhaustive()
    }
}

impl Binding {
    pub(crate) fn is_async(&self) -> bool {
        matches!(self.provider, Provider::Async(_))
    }

    pub(crate) fn service(&self) -> &'static str {
        self.key.display_name()
    }

    pub(crate) fn cleanup_enabled(&self, default: bool) -> bool {
        self.scope.is_cached() && self.enable_cleanup.unwrap_or(default)
    }
}

/// Whether an insert goes through the duplicate policy and freeze check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InsertMode {
    Bind(DuplicatePolicy),
    Rebind,
}

/// Service registry holding all bindings
#[derive(Default)]
pub(crate) struct Registry {
    bindings: RwLock<HashMap<Key, Arc<Binding>>>,
    frozen: AtomicBool,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts `binding`, returning the binding it replaced.
    pub(crate) fn insert(&self, binding: Binding, mode: InsertMode) -> DiResult<Option<Arc<Binding>>> {
        let mut bindings = self.bindings.write();

        if let InsertMode::Bind(policy) = mode {
            if self.is_frozen() {
                return Err(DiError::Configuration(format!(
                    "cannot bind {} after the container was frozen; use rebind to override",
                    binding.service()
                )));
            }
            if policy == DuplicatePolicy::Reject && bindings.contains_key(&binding.key) {
                return Err(DiError::Configuration(format!(
                    "{} is already bound; use rebind to override",
                    binding.service()
                )));
            }
        }

        check_structure(&bindings, &binding)?;

        let binding = Arc::new(binding);
        Ok(bindings.insert(binding.key, binding))
    }

    pub(crate) fn get(&self, key: &Key) -> Option<Arc<Binding>> {
        self.bindings.read().get(key).cloned()
    }

    pub(crate) fn lookup(&self, key: Key) -> DiResult<Arc<Binding>> {
        self.get(&key).ok_or(DiError::Unbound(key.display_name()))
    }

    pub(crate) fn contains(&self, key: &Key) -> bool {
        self.bindings.read().contains_key(key)
    }

    /// All bindings, ordered by identity name.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Binding>> {
        let mut all: Vec<_> = self.bindings.read().values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    pub(crate) fn len(&self) -> usize {
        self.bindings.read().len()
    }

    /// Bindings whose declared dependency closure reaches `key`.
    pub(crate) fn dependents(&self, key: Key) -> Vec<Key> {
        let bindings = self.bindings.read();
        let mut found = Vec::new();
        let mut pending = vec![key];
        while let Some(target) = pending.pop() {
            for binding in bindings.values() {
                if binding.key != key && !found.contains(&binding.key) && binding.dependencies.contains(&target) {
                    found.push(binding.key);
                    pending.push(binding.key);
                }
            }
        }
        found
    }

    pub(crate) fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    pub(crate) fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }
}

fn check_structure(bindings: &HashMap<Key, Arc<Binding>>, binding: &Binding) -> DiResult<()> {
    let service = binding.service();

    if binding.dependencies.contains(&binding.key) {
        return Err(DiError::Configuration(format!("{} cannot depend on itself", service)));
    }

    if binding.scope == ScopeKind::Transient && binding.enable_cleanup == Some(true) {
        return Err(DiError::Configuration(format!(
            "cleanup requested for transient {}; transient instances are never tracked",
            service
        )));
    }

    for dep in &binding.dependencies {
        if let Some(existing) = bindings.get(dep) {
            if !binding.scope.may_depend_on(existing.scope) {
                return Err(captive(service, binding.scope, existing.service(), existing.scope));
            }
        }
    }

    for dependent in bindings.values() {
        if dependent.key != binding.key
            && dependent.dependencies.contains(&binding.key)
            && !dependent.scope.may_depend_on(binding.scope)
        {
            return Err(captive(dependent.service(), dependent.scope, service, binding.scope));
        }
    }

    Ok(())
}

fn captive(service: &str, scope: ScopeKind, dependency: &str, dependency_scope: ScopeKind) -> DiError {
    DiError::Configuration(format!(
        "{} {} cannot depend on {} {}",
        scope, service, dependency_scope, dependency
    ))
}
