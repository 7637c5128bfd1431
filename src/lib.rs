//! # scoped-injector
//!
//! Dependency injection with explicit lifetime scopes: process-wide singletons,
//! per-request instances and transients, resolved synchronously or asynchronously.
//!
//! ## Features
//!
//! - **Three scopes**: Singleton, Request, and Transient bindings
//! - **Declared dependencies**: providers name what they need through their argument tuple
//! - **Sync and async providers**: `resolve` for blocking graphs, `resolve_async` for the rest
//! - **Deterministic teardown**: release actions run in reverse construction order when a scope closes
//! - **Circular dependency detection**: cycles fail with the full resolution path
//! - **Test overrides**: `rebind` swaps an implementation even after the container is frozen
//!
//! ## Quick Start
//!
//! ```rust
//! use scoped_injector::{Container, Resolver};
//! use std::sync::Arc;
//!
//! // Define your services
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! // Register services
//! let container = Container::new();
//! container
//!     .bind::<Database>()
//!     .singleton()
//!     .to_value(Arc::new(Database { connection_string: "postgres://localhost".to_string() }))
//!     .unwrap();
//! container
//!     .bind::<UserService>()
//!     .to_factory(|db: Arc<Database>| Ok(Arc::new(UserService { db })))
//!     .unwrap();
//!
//! let user_service = container.resolve::<UserService>().unwrap();
//! assert_eq!(user_service.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Scopes
//!
//! - **Singleton**: created once per container, released at `shutdown`
//! - **Request**: created once per open [`RequestScope`], released when it closes
//! - **Transient**: created fresh on every resolution, never cached or released
//!
//! Bindings are Transient unless a scope is chosen.
//!
//! ## Request Scopes and Cleanup
//!
//! ```rust
//! use scoped_injector::{BoxError, Container, DiError, Resolver, Resource};
//! use std::sync::{Arc, Mutex};
//!
//! struct Transaction;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), BoxError> {
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let container = Container::new();
//! let released = log.clone();
//! container
//!     .bind::<Transaction>()
//!     .request()
//!     .enable_cleanup(true)
//!     .to_resource(move |()| {
//!         let released = released.clone();
//!         Ok(Resource::new(Arc::new(Transaction)).on_release(move || {
//!             released.lock().unwrap().push("rollback");
//!             Ok(())
//!         }))
//!     })?;
//!
//! container
//!     .scoped(|scope| async move {
//!         let first = scope.resolve::<Transaction>()?;
//!         let second = scope.resolve::<Transaction>()?;
//!         assert!(Arc::ptr_eq(&first, &second));
//!         Ok::<_, DiError>(())
//!     })
//!     .await?;
//!
//! assert_eq!(*log.lock().unwrap(), vec!["rollback"]);
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod collection;
pub mod config;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod provider;
pub mod scope_kind;
pub mod traits;
pub mod validation;

// Internal modules
mod internal;
mod registration;

// Re-export core types
pub use collection::{BindingBuilder, Dependencies, Injectable};
pub use config::{ContainerOptions, DuplicatePolicy};
pub use descriptors::{BindingDescriptor, ProviderMode};
pub use error::{BoxError, CleanupError, CleanupFailure, DiError, DiResult};
pub use key::{key_of_type, Key};
pub use provider::{Container, RequestScope, ResolverContext, ScopeId, ScopeState};
pub use registration::{AnyArc, Resource};
pub use scope_kind::ScopeKind;
pub use traits::{AsyncDispose, Dispose, Resolver, ResolverCore};
pub use validation::{ValidationError, ValidationReport, ValidationWarning};
