//! Disposal traits for resource cleanup.

use crate::error::BoxError;

/// Trait for synchronous resource disposal.
///
/// Implement this trait for services that need structured teardown (e.g. flushing caches,
/// closing files). Bind them with [`Resource::disposing`](crate::Resource::disposing) and
/// enable cleanup on the binding; the release runs when the owning scope closes, in
/// reverse construction order.
///
/// # Examples
///
/// ```
/// use scoped_injector::{BoxError, Container, Dispose, Resource};
/// use std::sync::Arc;
///
/// struct Cache {
///     name: String,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) -> Result<(), BoxError> {
///         println!("Flushing cache: {}", self.name);
///         Ok(())
///     }
/// }
///
/// let container = Container::new();
/// container
///     .bind::<Cache>()
///     .request()
///     .enable_cleanup(true)
///     .to_resource(|()| {
///         Ok::<_, BoxError>(Resource::disposing(Arc::new(Cache { name: "user_cache".into() })))
///     })
///     .unwrap();
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self) -> Result<(), BoxError>;
}

/// Trait for asynchronous resource disposal.
///
/// Implement this trait for services that require async teardown (e.g. graceful connection
/// shutdown). Async releases only run when the scope is closed with an awaited `close`.
///
/// # Examples
///
/// ```
/// use scoped_injector::{AsyncDispose, BoxError, Container, Resource};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct DatabaseClient {
///     connection_id: String,
/// }
///
/// #[async_trait]
/// impl AsyncDispose for DatabaseClient {
///     async fn dispose(&self) -> Result<(), BoxError> {
///         println!("Closing database connection: {}", self.connection_id);
///         Ok(())
///     }
/// }
///
/// let container = Container::new();
/// container
///     .bind::<DatabaseClient>()
///     .singleton()
///     .enable_cleanup(true)
///     .to_async_resource(|()| async {
///         let client = Arc::new(DatabaseClient { connection_id: "conn_123".into() });
///         Ok::<_, BoxError>(Resource::disposing_async(client))
///     })
///     .unwrap();
/// ```
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Perform asynchronous cleanup of resources.
    async fn dispose(&self) -> Result<(), BoxError>;
}
