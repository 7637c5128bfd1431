//! Binding descriptors for introspection.

use crate::key::Key;
use crate::registration::Binding;
use crate::scope_kind::ScopeKind;

/// Whether a binding's provider can be called without awaiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderMode {
    Sync,
    Async,
}

/// Describes a registered binding.
///
/// # Examples
///
/// ```rust
/// use scoped_injector::{BoxError, Container, ProviderMode, ScopeKind};
/// use std::sync::Arc;
///
/// struct Config;
/// struct Database;
///
/// let container = Container::new();
/// container.bind::<Config>().singleton().to_value(Arc::new(Config)).unwrap();
/// container
///     .bind::<Database>()
///     .request()
///     .enable_cleanup(true)
///     .to_async_factory(|_config: Arc<Config>| async { Ok::<_, BoxError>(Arc::new(Database)) })
///     .unwrap();
///
/// let descriptors = container.descriptors();
/// let db = descriptors.iter().find(|d| d.type_name().ends_with("Database")).unwrap();
/// assert_eq!(db.scope, ScopeKind::Request);
/// assert_eq!(db.mode, ProviderMode::Async);
/// assert!(db.cleanup);
/// assert_eq!(db.dependencies.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct BindingDescriptor {
    /// The bound contract
    pub key: Key,
    pub scope: ScopeKind,
    pub mode: ProviderMode,
    /// Declared dependencies in resolution order
    pub dependencies: Vec<Key>,
    /// Whether release actions are tracked, after applying the container default
    pub cleanup: bool,
    /// Implementation type name
    pub implementation: &'static str,
}

impl BindingDescriptor {
    pub(crate) fn from_binding(binding: &Binding, default_cleanup: bool) -> Self {
        Self {
            key: binding.key,
            scope: binding.scope,
            mode: if binding.is_async() {
                ProviderMode::Async
            } else {
                ProviderMode::Sync
            },
            dependencies: binding.dependencies.clone(),
            cleanup: binding.cleanup_enabled(default_cleanup),
            implementation: binding.implementation,
        }
    }

    /// Get the type/trait name
    pub fn type_name(&self) -> &'static str {
        self.key.display_name()
    }

    pub fn is_async(&self) -> bool {
        self.mode == ProviderMode::Async
    }
}
