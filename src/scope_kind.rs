//! Scope kinds controlling instance caching behavior.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DiError;

/// Lifetime policy of a binding.
///
/// The recognized scope values are exactly these three; parsing any other
/// string is a configuration error.
///
/// # Examples
///
/// ```rust
/// use scoped_injector::ScopeKind;
///
/// assert!(ScopeKind::Singleton.is_cached());
/// assert!(!ScopeKind::Transient.is_cached());
/// assert_eq!("request".parse::<ScopeKind>().unwrap(), ScopeKind::Request);
/// assert!("session".parse::<ScopeKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// One instance per container, created on first resolution and released
    /// at shutdown.
    Singleton,
    /// A fresh instance on every resolution. Never cached, never tracked for
    /// cleanup.
    #[default]
    Transient,
    /// One instance per open request scope, released when that scope closes.
    Request,
}

impl ScopeKind {
    /// Returns `true` if resolved instances are cached in a scope instance.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, ScopeKind::Singleton | ScopeKind::Request)
    }

    /// Returns `true` if an instance of this kind may hold on to an instance of
    /// `dependency` without outliving it.
    ///
    /// Only the Singleton → Request edge is rejected: a singleton would keep a
    /// request's instance alive after the request closed.
    pub fn may_depend_on(&self, dependency: ScopeKind) -> bool {
        !matches!((self, dependency), (ScopeKind::Singleton, ScopeKind::Request))
    }

    /// Lowercase name used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Singleton => "singleton",
            ScopeKind::Transient => "transient",
            ScopeKind::Request => "request",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopeKind {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "singleton" => Ok(ScopeKind::Singleton),
            "transient" => Ok(ScopeKind::Transient),
            "request" => Ok(ScopeKind::Request),
            other => Err(DiError::Configuration(format!(
                "unknown scope '{}', expected one of: singleton, transient, request",
                other
            ))),
        }
    }
}
