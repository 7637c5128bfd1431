//! The container and its scopes.
//!
//! This module contains the [`Container`], the [`RequestScope`] handle and the
//! [`ResolverContext`] passed to re-entrant providers.

use std::future::Future;
use std::sync::Arc;

use crate::collection::{BindMode, BindingBuilder};
use crate::config::ContainerOptions;
use crate::descriptors::BindingDescriptor;
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::registration::{downcast, AnyArc, Binding, InsertMode, Registry};
use crate::scope_kind::ScopeKind;
use crate::traits::ResolverCore;
use crate::validation::ValidationReport;

mod context;
mod resolver;
mod scope;

pub use context::ResolverContext;
pub(crate) use context::RequestAccess;
pub use scope::{RequestScope, ScopeId, ScopeState};
pub(crate) use scope::ScopeInstance;

pub(crate) struct ContainerInner {
    registry: Registry,
    singletons: Arc<ScopeInstance>,
    options: ContainerOptions,
}

/// Dependency injection container.
///
/// Owns the binding registry and the singleton scope. Cloning is cheap and
/// every clone refers to the same container, so it can be handed to request
/// boundaries and worker tasks.
///
/// The intended lifecycle is `new` → `bind`* → `freeze` → resolve and open
/// request scopes → `shutdown`.
///
/// # Examples
///
/// ```
/// use scoped_injector::{BoxError, Container, DiError, Resolver};
/// use std::sync::Arc;
///
/// trait UserRepository: Send + Sync {
///     fn find(&self, id: u32) -> Option<String>;
/// }
///
/// struct InMemoryUsers;
/// impl UserRepository for InMemoryUsers {
///     fn find(&self, id: u32) -> Option<String> {
///         (id == 1).then(|| "alice".to_string())
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), BoxError> {
/// let container = Container::new();
/// container
///     .bind::<dyn UserRepository>()
///     .singleton()
///     .to_value(Arc::new(InMemoryUsers) as Arc<dyn UserRepository>)?;
/// container.freeze()?;
///
/// let name = container
///     .scoped(|scope| async move {
///         let users = scope.resolve::<dyn UserRepository>()?;
///         Ok::<_, DiError>(users.find(1))
///     })
///     .await?;
/// assert_eq!(name.as_deref(), Some("alice"));
///
/// container.shutdown().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// A container with default options.
    pub fn new() -> Self {
        Self::build(ContainerOptions::default())
    }

    /// A container with the given options, after validating them.
    pub fn with_options(options: ContainerOptions) -> DiResult<Self> {
        options.validate()?;
        Ok(Self::build(options))
    }

    fn build(options: ContainerOptions) -> Self {
        let singletons = Arc::new(ScopeInstance::open(ScopeKind::Singleton));
        tracing::debug!(scope = %singletons.id(), duplicate_bindings = %options.duplicate_bindings, "container created");
        Self {
            inner: Arc::new(ContainerInner {
                registry: Registry::new(),
                singletons,
                options,
            }),
        }
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub(crate) fn singletons(&self) -> &Arc<ScopeInstance> {
        &self.inner.singletons
    }

    /// Starts a binding for the contract `T`.
    ///
    /// A second `bind` for the same contract replaces the first unless the
    /// container was built with [`DuplicatePolicy::Reject`](crate::DuplicatePolicy::Reject).
    /// Fails once the container is frozen.
    pub fn bind<T: ?Sized + Send + Sync + 'static>(&self) -> BindingBuilder<'_, T> {
        BindingBuilder::new(self, BindMode::Bind)
    }

    /// Starts a binding that overrides any existing one for `T`.
    ///
    /// Works on frozen containers and ignores the duplicate policy. A cached
    /// singleton instance of `T` is evicted, so later resolutions use the
    /// new provider. Release actions already tracked for the old instance
    /// still run at shutdown.
    ///
    /// # Examples
    ///
    /// ```
    /// use scoped_injector::{Container, Resolver};
    /// use std::sync::Arc;
    ///
    /// trait Mailer: Send + Sync {
    ///     fn name(&self) -> &'static str;
    /// }
    /// struct Smtp;
    /// impl Mailer for Smtp { fn name(&self) -> &'static str { "smtp" } }
    /// struct FakeMailer;
    /// impl Mailer for FakeMailer { fn name(&self) -> &'static str { "fake" } }
    ///
    /// let container = Container::new();
    /// container.bind::<dyn Mailer>().singleton().to_value(Arc::new(Smtp) as Arc<dyn Mailer>).unwrap();
    /// assert_eq!(container.resolve::<dyn Mailer>().unwrap().name(), "smtp");
    ///
    /// container.rebind::<dyn Mailer>().singleton().to_value(Arc::new(FakeMailer) as Arc<dyn Mailer>).unwrap();
    /// assert_eq!(container.resolve::<dyn Mailer>().unwrap().name(), "fake");
    /// ```
    pub fn rebind<T: ?Sized + Send + Sync + 'static>(&self) -> BindingBuilder<'_, T> {
        BindingBuilder::new(self, BindMode::Rebind)
    }

    pub(crate) fn install(&self, binding: Binding, mode: InsertMode) -> DiResult<()> {
        let key = binding.key;
        let scope = binding.scope;
        let replaced = self.inner.registry.insert(binding, mode)?;

        match mode {
            InsertMode::Rebind => {
                let evicted = self.evict_with_dependents(key);
                tracing::debug!(service = key.display_name(), %scope, evicted, "rebound");
            }
            InsertMode::Bind(_) => {
                if replaced.is_some() {
                    self.evict_with_dependents(key);
                }
                tracing::debug!(service = key.display_name(), %scope, replaced = replaced.is_some(), "bound");
            }
        }
        Ok(())
    }

    // Cached singletons built on top of the replaced binding would keep the
    // old implementation alive, so they are rebuilt on next resolution.
    fn evict_with_dependents(&self, key: Key) -> usize {
        std::iter::once(key)
            .chain(self.inner.registry.dependents(key))
            .filter(|k| self.inner.singletons.evict(k).is_some())
            .count()
    }

    /// Returns `true` if `T` has a binding.
    pub fn is_bound<T: ?Sized + 'static>(&self) -> bool {
        self.inner.registry.contains(&Key::of::<T>())
    }

    /// Number of registered bindings.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks the declared dependency graph without constructing anything.
    pub fn validate(&self) -> ValidationReport {
        ValidationReport::analyze(&self.inner.registry.snapshot())
    }

    /// Validates the bindings and, if there are no errors, stops further
    /// `bind` calls. `rebind` keeps working.
    pub fn freeze(&self) -> DiResult<ValidationReport> {
        let report = self.validate();
        if !report.is_valid() {
            return Err(DiError::Configuration(report.format_issues()));
        }
        for warning in &report.warnings {
            tracing::warn!(%warning, "binding warning");
        }
        self.inner.registry.freeze();
        tracing::debug!(bindings = self.inner.registry.len(), "container frozen");
        Ok(report)
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.registry.is_frozen()
    }

    /// Resolves `T`, awaiting asynchronous providers.
    ///
    /// Request identities resolve against the task's current request scope
    /// (see [`RequestScope::run`]).
    pub async fn resolve_async<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let key = Key::of::<T>();
        let any = resolver::resolve_root_async(self.clone(), current_request(), key).await?;
        downcast::<T>(key, &any)
    }

    /// Opens a new, active request scope.
    pub fn open_request_scope(&self) -> DiResult<RequestScope> {
        self.inner.singletons.ensure_active()?;
        Ok(RequestScope::open(self.clone()))
    }

    /// Closes a request scope opened by this container. Same as
    /// [`RequestScope::close`].
    pub async fn close(&self, scope: &RequestScope) -> DiResult<()> {
        if !Arc::ptr_eq(&self.inner, &scope.container.inner) {
            return Err(DiError::Configuration(format!(
                "{} was opened by a different container",
                scope.id()
            )));
        }
        scope.close().await
    }

    /// Runs `handler` inside a fresh request scope and closes the scope
    /// afterwards, whatever the handler returned.
    ///
    /// A handler error takes precedence over a cleanup error; the latter is
    /// then only logged.
    pub async fn scoped<F, Fut, T>(&self, handler: F) -> DiResult<T>
    where
        F: FnOnce(RequestScope) -> Fut,
        Fut: Future<Output = DiResult<T>>,
    {
        let scope = self.open_request_scope()?;
        let outcome = scope.run(handler(scope.clone())).await;
        let closed = scope.close().await;

        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(cleanup)) => {
                tracing::warn!(scope = %scope.id(), error = %cleanup, "cleanup failed after handler error");
                Err(err)
            }
        }
    }

    /// Closes the singleton scope, releasing tracked singletons in reverse
    /// construction order. Later resolutions fail with
    /// [`DiError::ScopeClosed`].
    pub async fn shutdown(&self) -> DiResult<()> {
        tracing::debug!("shutting down container");
        self.inner.singletons.close().await
    }

    /// Blocking counterpart of [`shutdown`](Self::shutdown). Asynchronous
    /// release actions are reported as failures.
    pub fn shutdown_blocking(&self) -> DiResult<()> {
        tracing::debug!("shutting down container");
        self.inner.singletons.close_blocking()
    }

    /// Descriptions of every binding, ordered by identity name.
    pub fn descriptors(&self) -> Vec<BindingDescriptor> {
        let default_cleanup = self.inner.options.enable_cleanup;
        self.inner
            .registry
            .snapshot()
            .iter()
            .map(|binding| BindingDescriptor::from_binding(binding, default_cleanup))
            .collect()
    }
}

fn current_request() -> RequestAccess {
    match RequestScope::current() {
        Some(scope) => RequestAccess::Available(scope.instance),
        None => RequestAccess::Unavailable,
    }
}

impl ResolverCore for Container {
    fn resolve_any(&self, key: Key) -> DiResult<AnyArc> {
        resolver::resolve_root(self, current_request(), key)
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("bindings", &self.inner.registry.len())
            .field("frozen", &self.is_frozen())
            .field("singletons", &self.inner.singletons.state())
            .finish()
    }
}
