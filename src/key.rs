//! Service identity keys.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Opaque identity of an abstract service contract.
///
/// A key is the `TypeId` of the contract plus its type name for diagnostics.
/// Contracts may be concrete types or trait objects (`dyn Trait`), so a
/// repository interface and its implementation are distinct identities.
///
/// # Examples
///
/// ```rust
/// use scoped_injector::Key;
///
/// trait Repository: Send + Sync {}
///
/// let concrete = Key::of::<String>();
/// let contract = Key::of::<dyn Repository>();
///
/// assert_eq!(concrete.display_name(), "alloc::string::String");
/// assert!(contract.display_name().contains("Repository"));
/// assert_ne!(concrete, contract);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Key {
    id: TypeId,
    name: &'static str,
}

impl Key {
    /// Key for the contract `T`.
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Key {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The `TypeId` of the contract.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Get the type or trait name for display
    #[inline]
    pub fn display_name(&self) -> &'static str {
        self.name
    }
}

// TypeId-only comparison; the name is for diagnostics
impl PartialEq for Key {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Key {}

impl Hash for Key {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// Ordered by name so descriptor listings are stable across runs
impl Ord for Key {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(other.name).then_with(|| self.id.cmp(&other.id))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Helper function for creating keys
#[inline(always)]
pub fn key_of_type<T: ?Sized + 'static>() -> Key {
    Key::of::<T>()
}
