//! Scope instances and request scope handles.
//!
//! A [`ScopeInstance`] owns the instance cache and the release stack of one
//! lifetime boundary: the container's singleton scope, or one request.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{CleanupError, CleanupFailure, DiError, DiResult};
use crate::internal::{release_all, release_all_blocking, CleanupEntry, CleanupStack, Release};
use crate::key::Key;
use crate::registration::{downcast, AnyArc, Binding, Provided};
use crate::scope_kind::ScopeKind;
use crate::traits::ResolverCore;

use super::context::RequestAccess;
use super::{resolver, Container};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a scope instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

impl ScopeId {
    fn next() -> Self {
        ScopeId(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// Lifecycle state of a scope instance.
///
/// `Created → Active → Closing → Closed`. Only an `Active` scope accepts new
/// instances. Scopes are handed out already `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeState {
    Created,
    Active,
    Closing,
    Closed,
}

impl fmt::Display for ScopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScopeState::Created => "created",
            ScopeState::Active => "active",
            ScopeState::Closing => "closing",
            ScopeState::Closed => "closed",
        })
    }
}

struct ScopeInner {
    state: ScopeState,
    cache: HashMap<Key, AnyArc>,
    cleanups: CleanupStack,
}

/// Cache and release stack of one lifetime boundary.
///
/// The lock is only held for bookkeeping, never across a provider call or
/// an `.await`.
pub(crate) struct ScopeInstance {
    id: ScopeId,
    kind: ScopeKind,
    inner: Mutex<ScopeInner>,
}

/// An instance constructed after its scope stopped accepting new ones.
pub(crate) struct Orphan {
    error: DiError,
    release: Option<Release>,
}

impl ScopeInstance {
    /// A new scope, already `Active`.
    pub(crate) fn open(kind: ScopeKind) -> Self {
        let id = ScopeId::next();
        tracing::debug!(scope = %id, %kind, "scope opened");
        Self {
            id,
            kind,
            inner: Mutex::new(ScopeInner {
                state: ScopeState::Active,
                cache: HashMap::new(),
                cleanups: CleanupStack::default(),
            }),
        }
    }

    pub(crate) fn id(&self) -> ScopeId {
        self.id
    }

    pub(crate) fn state(&self) -> ScopeState {
        self.inner.lock().state
    }

    pub(crate) fn ensure_active(&self) -> DiResult<()> {
        let state = self.state();
        if state == ScopeState::Active {
            Ok(())
        } else {
            Err(DiError::ScopeClosed { scope: self.id, state })
        }
    }

    /// Cached instance for `key`, if any. Fails unless the scope is active.
    pub(crate) fn cached(&self, key: &Key) -> DiResult<Option<AnyArc>> {
        let inner = self.inner.lock();
        if inner.state != ScopeState::Active {
            return Err(DiError::ScopeClosed {
                scope: self.id,
                state: inner.state,
            });
        }
        Ok(inner.cache.get(key).cloned())
    }

    pub(crate) fn contains(&self, key: &Key) -> bool {
        self.inner.lock().cache.contains_key(key)
    }

    pub(crate) fn pending_cleanups(&self) -> usize {
        self.inner.lock().cleanups.len()
    }

    /// Returns the cached instance for the binding, constructing it with
    /// `factory` on a miss.
    pub(crate) fn get_or_create<F>(&self, binding: &Binding, track_cleanup: bool, factory: F) -> DiResult<AnyArc>
    where
        F: FnOnce() -> DiResult<Provided>,
    {
        if let Some(hit) = self.cached(&binding.key)? {
            tracing::trace!(service = binding.service(), scope = %self.id, "cache hit");
            return Ok(hit);
        }
        let provided = factory()?;
        self.store(binding, provided, track_cleanup)
            .map_err(|orphan| self.release_orphan(binding.service(), orphan))
    }

    /// Asynchronous counterpart of [`get_or_create`](Self::get_or_create).
    pub(crate) async fn get_or_create_async<Fut>(
        &self,
        binding: &Binding,
        track_cleanup: bool,
        factory: Fut,
    ) -> DiResult<AnyArc>
    where
        Fut: Future<Output = DiResult<Provided>>,
    {
        if let Some(hit) = self.cached(&binding.key)? {
            tracing::trace!(service = binding.service(), scope = %self.id, "cache hit");
            return Ok(hit);
        }
        let provided = factory.await?;
        match self.store(binding, provided, track_cleanup) {
            Ok(stored) => Ok(stored),
            Err(orphan) => Err(self.release_orphan_async(binding.service(), orphan).await),
        }
    }

    /// Caches a constructed instance. The first stored instance wins; a
    /// losing instance's release action is still tracked.
    ///
    /// Once the scope is no longer active the instance is handed back as an
    /// [`Orphan`] whose release the caller must run.
    fn store(&self, binding: &Binding, provided: Provided, track_cleanup: bool) -> Result<AnyArc, Orphan> {
        let Provided { instance, release } = provided;
        let release = if track_cleanup { release } else { None };

        let mut inner = self.inner.lock();
        if inner.state != ScopeState::Active {
            return Err(Orphan {
                error: DiError::ScopeClosed {
                    scope: self.id,
                    state: inner.state,
                },
                release,
            });
        }

        let stored = inner.cache.entry(binding.key).or_insert_with(|| instance.clone()).clone();
        if let Some(release) = release {
            inner.cleanups.push(binding.service(), release);
        }
        drop(inner);

        if !Arc::ptr_eq(&stored, &instance) {
            tracing::debug!(service = binding.service(), scope = %self.id, "concurrent construction lost the race");
        }
        Ok(stored)
    }

    // Nothing will release an orphan later, so its release runs now. An
    // asynchronous release is spawned on the current runtime.
    fn release_orphan(&self, service: &'static str, orphan: Orphan) -> DiError {
        match orphan.release {
            Some(Release::Sync(f)) => {
                if let Err(error) = f() {
                    tracing::warn!(service, scope = %self.id, %error, "release action failed");
                }
            }
            Some(Release::Async(f)) => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let scope = self.id;
                    handle.spawn(async move {
                        if let Err(error) = f().await {
                            tracing::warn!(service, %scope, %error, "release action failed");
                        }
                    });
                }
                Err(_) => {
                    tracing::warn!(service, scope = %self.id, "asynchronous release dropped, no runtime to drive it");
                }
            },
            None => {}
        }
        orphan.error
    }

    async fn release_orphan_async(&self, service: &'static str, orphan: Orphan) -> DiError {
        if let Some(release) = orphan.release {
            if let Err(error) = release.run().await {
                tracing::warn!(service, scope = %self.id, %error, "release action failed");
            }
        }
        orphan.error
    }

    /// Removes a cached instance. Its release action, if any, stays on the stack.
    pub(crate) fn evict(&self, key: &Key) -> Option<AnyArc> {
        self.inner.lock().cache.remove(key)
    }

    fn begin_close(&self) -> DiResult<Vec<CleanupEntry>> {
        let mut inner = self.inner.lock();
        match inner.state {
            ScopeState::Created | ScopeState::Active => {
                inner.state = ScopeState::Closing;
                tracing::debug!(scope = %self.id, pending = inner.cleanups.len(), "closing scope");
                Ok(inner.cleanups.take())
            }
            state => Err(DiError::ScopeClosed { scope: self.id, state }),
        }
    }

    fn finish_close(&self, failures: Vec<CleanupFailure>) -> DiResult<()> {
        let cache = {
            let mut inner = self.inner.lock();
            inner.state = ScopeState::Closed;
            std::mem::take(&mut inner.cache)
        };
        drop(cache);
        tracing::debug!(scope = %self.id, failed = failures.len(), "scope closed");

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CleanupError {
                scope: self.id,
                failures,
            }
            .into())
        }
    }

    /// Runs every tracked release action in reverse order and discards the cache.
    pub(crate) async fn close(&self) -> DiResult<()> {
        let entries = self.begin_close()?;
        let failures = release_all(entries).await;
        self.finish_close(failures)
    }

    /// Blocking teardown. Asynchronous release actions are reported as failures.
    pub(crate) fn close_blocking(&self) -> DiResult<()> {
        let entries = self.begin_close()?;
        let failures = release_all_blocking(entries);
        self.finish_close(failures)
    }
}

impl Drop for ScopeInstance {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if inner.state != ScopeState::Closed && !inner.cleanups.is_empty() {
            tracing::warn!(
                scope = %self.id,
                pending = inner.cleanups.len(),
                "scope dropped with pending release actions; close it before dropping"
            );
        }
    }
}

tokio::task_local! {
    static CURRENT_REQUEST: RequestScope;
}

/// Handle to an open request scope.
///
/// Request-scoped identities resolved through this handle share one instance
/// for as long as the scope is active. Cloning the handle does not open a new
/// scope.
///
/// # Examples
///
/// ```
/// use scoped_injector::{Container, Resolver};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct RequestId(usize);
///
/// let counter = Arc::new(AtomicUsize::new(0));
/// let container = Container::new();
/// let next = counter.clone();
/// container
///     .bind::<RequestId>()
///     .request()
///     .to_factory(move |()| Ok(Arc::new(RequestId(next.fetch_add(1, Ordering::SeqCst)))))
///     .unwrap();
///
/// let first = container.open_request_scope().unwrap();
/// let second = container.open_request_scope().unwrap();
///
/// let a = first.resolve::<RequestId>().unwrap();
/// assert!(Arc::ptr_eq(&a, &first.resolve::<RequestId>().unwrap()));
/// assert!(!Arc::ptr_eq(&a, &second.resolve::<RequestId>().unwrap()));
///
/// first.close_blocking().unwrap();
/// second.close_blocking().unwrap();
/// ```
#[derive(Clone)]
pub struct RequestScope {
    pub(crate) instance: Arc<ScopeInstance>,
    pub(crate) container: Container,
}

impl RequestScope {
    pub(crate) fn open(container: Container) -> Self {
        let instance = Arc::new(ScopeInstance::open(ScopeKind::Request));
        Self { instance, container }
    }

    pub fn id(&self) -> ScopeId {
        self.instance.id()
    }

    pub fn state(&self) -> ScopeState {
        self.instance.state()
    }

    /// Number of release actions waiting for `close`.
    pub fn pending_cleanups(&self) -> usize {
        self.instance.pending_cleanups()
    }

    /// Resolves `T`, awaiting asynchronous providers.
    pub async fn resolve_async<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let key = Key::of::<T>();
        let access = RequestAccess::Available(self.instance.clone());
        let any = resolver::resolve_root_async(self.container.clone(), access, key).await?;
        downcast::<T>(key, &any)
    }

    /// Closes the scope, running release actions in reverse construction order.
    ///
    /// Every action runs even if an earlier one fails; failures are returned
    /// together as [`DiError::Cleanup`]. Closing twice fails with
    /// [`DiError::ScopeClosed`].
    pub async fn close(&self) -> DiResult<()> {
        self.instance.close().await
    }

    /// Closes the scope without an async runtime. Asynchronous release
    /// actions cannot run here and are reported as failures.
    pub fn close_blocking(&self) -> DiResult<()> {
        self.instance.close_blocking()
    }

    /// Runs `future` with this scope as the task's current request scope.
    ///
    /// While it runs, [`Container`] resolutions of Request identities use this
    /// scope.
    pub async fn run<F: Future>(&self, future: F) -> F::Output {
        CURRENT_REQUEST.scope(self.clone(), future).await
    }

    /// The request scope installed by [`run`](Self::run) on the current task.
    pub fn current() -> Option<RequestScope> {
        CURRENT_REQUEST.try_with(|scope| scope.clone()).ok()
    }
}

impl fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestScope")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

impl ResolverCore for RequestScope {
    fn resolve_any(&self, key: Key) -> DiResult<AnyArc> {
        resolver::resolve_root(&self.container, RequestAccess::Available(self.instance.clone()), key)
    }
}
