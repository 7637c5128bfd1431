//! Error types for the dependency injection container.

use thiserror::Error;

use crate::provider::{ScopeId, ScopeState};

/// Boxed error produced by providers and release actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependency injection errors
///
/// Every failure is scoped to one resolution or one teardown; there is no
/// process-level error class.
///
/// # Examples
///
/// ```rust
/// use scoped_injector::{Container, DiError, Resolver};
///
/// let container = Container::new();
/// match container.resolve::<String>() {
///     Err(DiError::Unbound(name)) => assert_eq!(name, "alloc::string::String"),
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use scoped_injector::DiError;
///
/// let circular = DiError::Circular(vec!["ServiceA", "ServiceB", "ServiceA"]);
/// assert_eq!(circular.to_string(), "Circular dependency: ServiceA -> ServiceB -> ServiceA");
/// ```
#[derive(Debug, Error)]
pub enum DiError {
    /// No binding registered for the identity
    #[error("Service not bound: {0}")]
    Unbound(&'static str),
    /// Cycle in the active resolution chain (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<&'static str>),
    /// Blocking resolution reached a provider that must be awaited
    #[error("Async resolution required for {service} (chain: {})", chain.join(" -> "))]
    AsyncRequired {
        service: &'static str,
        chain: Vec<&'static str>,
    },
    /// The scope instance is not accepting resolutions
    #[error("Scope {scope} is {state}")]
    ScopeClosed { scope: ScopeId, state: ScopeState },
    /// A request-scoped identity was resolved outside any request scope
    #[error("No active request scope to resolve {0}")]
    NoRequestScope(&'static str),
    /// Structurally invalid binding or options
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A provider reported a failure; `source` is the provider's own error
    #[error("Provider for {service} failed: {source}")]
    Provider {
        service: &'static str,
        #[source]
        source: BoxError,
    },
    /// Stored instance does not have the requested type
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// Maximum resolution depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// One or more release actions failed during teardown
    #[error(transparent)]
    Cleanup(#[from] CleanupError),
}

impl DiError {
    /// Wraps a provider failure for `service`.
    pub fn provider(service: &'static str, source: impl Into<BoxError>) -> Self {
        DiError::Provider {
            service,
            source: source.into(),
        }
    }
}

/// A single release action that failed.
#[derive(Debug, Error)]
#[error("releasing {service} failed: {source}")]
pub struct CleanupFailure {
    /// Identity whose release action failed
    pub service: &'static str,
    /// Error returned by the release action
    #[source]
    pub source: BoxError,
}

/// Aggregate of every release action that failed while tearing down a scope.
///
/// Teardown is never aborted by an individual failure; all failures are
/// collected here in the order the actions ran.
#[derive(Debug, Error)]
#[error("{} cleanup action(s) failed while closing {scope}", failures.len())]
pub struct CleanupError {
    /// Scope that was being closed
    pub scope: ScopeId,
    /// Failures in release order
    pub failures: Vec<CleanupFailure>,
}

impl CleanupError {
    /// Names of the identities whose release failed, in release order.
    pub fn services(&self) -> Vec<&'static str> {
        self.failures.iter().map(|f| f.service).collect()
    }
}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;
