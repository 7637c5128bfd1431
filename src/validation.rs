//! Validation of the declared dependency graph.
//!
//! Runs over the registered bindings without constructing anything. Only
//! declared dependencies are checked; providers that resolve through a
//! [`ResolverContext`](crate::ResolverContext) are opaque here.
//!
//! # Validation Rules
//!
//! - **Singleton → Request** (directly or through transients): error
//! - **Missing dependency**: error
//! - **Cycle**: error
//! - **Singleton → Transient**: warning, the singleton holds one transient instance forever

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::key::Key;
use crate::registration::Binding;
use crate::scope_kind::ScopeKind;

/// A validation error that prevents safe resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Singleton service reaches a request-scoped service
    CaptiveDependency {
        singleton: &'static str,
        request: &'static str,
    },
    /// Required dependency is not bound
    MissingDependency {
        service: &'static str,
        dependency: &'static str,
    },
    /// Circular dependency detected
    CircularDependency { cycle: Vec<&'static str> },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::CaptiveDependency { singleton, request } => {
                write!(f, "Singleton service '{}' cannot depend on request-scoped service '{}'", singleton, request)
            }
            ValidationError::MissingDependency { service, dependency } => {
                write!(f, "Service '{}' depends on unbound service '{}'", service, dependency)
            }
            ValidationError::CircularDependency { cycle } => {
                write!(f, "Circular dependency detected: {}", cycle.join(" -> "))
            }
        }
    }
}

/// A validation warning about potentially problematic configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// Singleton depends on transient (will always get same instance)
    SingletonDependsOnTransient {
        singleton: &'static str,
        transient: &'static str,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::SingletonDependsOnTransient { singleton, transient } => write!(
                f,
                "Singleton service '{}' depends on transient service '{}' and will hold a single instance of it",
                singleton, transient
            ),
        }
    }
}

/// Result of validating the registered bindings.
///
/// # Examples
///
/// ```
/// use scoped_injector::{Container, ValidationError};
/// use std::sync::Arc;
///
/// struct Handler;
/// struct Session;
///
/// let container = Container::new();
/// container
///     .bind::<Handler>()
///     .to_factory(|_session: Arc<Session>| Ok(Arc::new(Handler)))
///     .unwrap();
///
/// let report = container.validate();
/// assert!(!report.is_valid());
/// assert!(matches!(report.errors[0], ValidationError::MissingDependency { .. }));
/// assert!(container.freeze().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Errors that make resolution fail
    pub errors: Vec<ValidationError>,
    /// Warnings about potentially problematic configurations
    pub warnings: Vec<ValidationWarning>,
    /// Identities whose construction needs `resolve_async`, sorted by name
    pub async_required: Vec<Key>,
}

impl ValidationReport {
    pub(crate) fn analyze(bindings: &[Arc<Binding>]) -> Self {
        let graph: HashMap<Key, &Binding> = bindings.iter().map(|b| (b.key, b.as_ref())).collect();
        let mut report = ValidationReport::default();

        for binding in bindings {
            for dep in &binding.dependencies {
                match graph.get(dep) {
                    None => report.errors.push(ValidationError::MissingDependency {
                        service: binding.service(),
                        dependency: dep.display_name(),
                    }),
                    Some(target) => {
                        if binding.scope == ScopeKind::Singleton && target.scope == ScopeKind::Transient {
                            report.warnings.push(ValidationWarning::SingletonDependsOnTransient {
                                singleton: binding.service(),
                                transient: target.service(),
                            });
                        }
                    }
                }
            }
        }

        for cycle in find_cycles(bindings, &graph) {
            report.errors.push(ValidationError::CircularDependency { cycle });
        }

        for binding in bindings.iter().filter(|b| b.scope == ScopeKind::Singleton) {
            if let Some(request) = captured_request(binding, &graph) {
                report.errors.push(ValidationError::CaptiveDependency {
                    singleton: binding.service(),
                    request,
                });
            }
        }

        let mut memo = HashMap::new();
        for binding in bindings {
            if needs_async(binding.key, &graph, &mut memo, &mut HashSet::new()) {
                report.async_required.push(binding.key);
            }
        }
        report.async_required.sort();

        report
    }

    /// Returns true if validation passed without errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns true if there are warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Returns true if resolving `key` needs `resolve_async`.
    pub fn requires_async(&self, key: &Key) -> bool {
        self.async_required.contains(key)
    }

    /// Formats errors and warnings for display.
    pub fn format_issues(&self) -> String {
        let mut output = String::new();

        if !self.errors.is_empty() {
            output.push_str("Validation Errors:\n");
            for error in &self.errors {
                output.push_str(&format!("  - {}\n", error));
            }
        }

        if !self.warnings.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str("Validation Warnings:\n");
            for warning in &self.warnings {
                output.push_str(&format!("  - {}\n", warning));
            }
        }

        output
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

fn find_cycles(bindings: &[Arc<Binding>], graph: &HashMap<Key, &Binding>) -> Vec<Vec<&'static str>> {
    let mut marks = HashMap::new();
    let mut cycles = Vec::new();
    for binding in bindings {
        let mut path = Vec::new();
        walk(binding.key, graph, &mut marks, &mut path, &mut cycles);
    }
    cycles
}

fn walk(
    key: Key,
    graph: &HashMap<Key, &Binding>,
    marks: &mut HashMap<Key, Mark>,
    path: &mut Vec<Key>,
    cycles: &mut Vec<Vec<&'static str>>,
) {
    match marks.get(&key) {
        Some(Mark::Done) => return,
        Some(Mark::InProgress) => {
            if let Some(start) = path.iter().position(|k| *k == key) {
                let mut cycle: Vec<&'static str> = path[start..].iter().map(Key::display_name).collect();
                cycle.push(key.display_name());
                cycles.push(cycle);
            }
            return;
        }
        None => {}
    }

    let Some(binding) = graph.get(&key) else {
        return;
    };

    marks.insert(key, Mark::InProgress);
    path.push(key);
    for dep in &binding.dependencies {
        walk(*dep, graph, marks, path, cycles);
    }
    path.pop();
    marks.insert(key, Mark::Done);
}

// First request-scoped identity reachable from the singleton through transients
fn captured_request(singleton: &Binding, graph: &HashMap<Key, &Binding>) -> Option<&'static str> {
    let mut stack: Vec<Key> = singleton.dependencies.clone();
    let mut seen = HashSet::new();
    while let Some(key) = stack.pop() {
        if !seen.insert(key) {
            continue;
        }
        let Some(binding) = graph.get(&key) else {
            continue;
        };
        match binding.scope {
            ScopeKind::Request => return Some(binding.service()),
            ScopeKind::Transient => stack.extend(binding.dependencies.iter().copied()),
            ScopeKind::Singleton => {}
        }
    }
    None
}

fn needs_async(
    key: Key,
    graph: &HashMap<Key, &Binding>,
    memo: &mut HashMap<Key, bool>,
    visiting: &mut HashSet<Key>,
) -> bool {
    if let Some(known) = memo.get(&key) {
        return *known;
    }
    let Some(binding) = graph.get(&key) else {
        return false;
    };
    if !visiting.insert(key) {
        return false;
    }
    let result = binding.is_async()
        || binding
            .dependencies
            .iter()
            .any(|dep| needs_async(*dep, graph, memo, visiting));
    visiting.remove(&key);
    memo.insert(key, result);
    result
}
