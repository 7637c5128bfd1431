//! Container configuration.
//!
//! Options can be built in code, parsed from JSON, or read from environment
//! variables prefixed with `SCOPED_INJECTOR_`.

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};
use crate::internal::DEFAULT_MAX_DEPTH;

const ENV_PREFIX: &str = "SCOPED_INJECTOR";

/// What `bind` does when the identity already has a binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// The new binding silently replaces the old one.
    #[default]
    Replace,
    /// The second `bind` fails with a configuration error; use `rebind` to override.
    Reject,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::Replace => f.write_str("replace"),
            DuplicatePolicy::Reject => f.write_str("reject"),
        }
    }
}

impl FromStr for DuplicatePolicy {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(DuplicatePolicy::Replace),
            "reject" => Ok(DuplicatePolicy::Reject),
            other => Err(DiError::Configuration(format!(
                "unknown duplicate binding policy '{}', expected 'replace' or 'reject'",
                other
            ))),
        }
    }
}

/// Container-wide options.
///
/// # Examples
///
/// ```
/// use scoped_injector::{ContainerOptions, DuplicatePolicy};
///
/// let options = ContainerOptions::from_json_str(r#"{ "duplicate_bindings": "reject" }"#).unwrap();
/// assert_eq!(options.duplicate_bindings, DuplicatePolicy::Reject);
/// assert!(!options.enable_cleanup);
/// assert_eq!(options.max_depth, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// Behavior of a second `bind` for the same identity
    pub duplicate_bindings: DuplicatePolicy,
    /// Cleanup flag for bindings that do not set one explicitly
    pub enable_cleanup: bool,
    /// Upper bound on the length of a resolution chain
    pub max_depth: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            duplicate_bindings: DuplicatePolicy::Replace,
            enable_cleanup: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ContainerOptions {
    /// Defaults with duplicate `bind` calls rejected.
    pub fn strict() -> Self {
        Self {
            duplicate_bindings: DuplicatePolicy::Reject,
            ..Self::default()
        }
    }

    pub fn with_cleanup(mut self, enabled: bool) -> Self {
        self.enable_cleanup = enabled;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_duplicate_bindings(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_bindings = policy;
        self
    }

    /// Parses options from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| DiError::Configuration(format!("invalid container options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from `SCOPED_INJECTOR_DUPLICATE_BINDINGS`,
    /// `SCOPED_INJECTOR_ENABLE_CLEANUP` and `SCOPED_INJECTOR_MAX_DEPTH`.
    /// Unset variables keep their defaults.
    pub fn from_env() -> DiResult<Self> {
        let mut options = Self::default();

        if let Some(value) = env_var("DUPLICATE_BINDINGS")? {
            options.duplicate_bindings = value.parse()?;
        }
        if let Some(value) = env_var("ENABLE_CLEANUP")? {
            options.enable_cleanup = parse_bool(&value)?;
        }
        if let Some(value) = env_var("MAX_DEPTH")? {
            options.max_depth = value.trim().parse().map_err(|_| {
                DiError::Configuration(format!("{}_MAX_DEPTH must be a positive integer, got '{}'", ENV_PREFIX, value))
            })?;
        }

        options.validate()?;
        Ok(options)
    }

    /// Checks option values that cannot be expressed in the type.
    pub fn validate(&self) -> DiResult<()> {
        if self.max_depth == 0 {
            return Err(DiError::Configuration("max_depth must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn env_var(name: &str) -> DiResult<Option<String>> {
    let key = format!("{}_{}", ENV_PREFIX, name);
    match env::var(&key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(DiError::Configuration(format!("{} is not valid unicode", key)))
        }
    }
}

fn parse_bool(value: &str) -> DiResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(DiError::Configuration(format!(
            "{}_ENABLE_CLEANUP must be a boolean, got '{}'",
            ENV_PREFIX, other
        ))),
    }
}
