//! LIFO stack of release actions owned by a scope instance.

use std::future::Future;
use std::pin::Pin;

use crate::error::{BoxError, CleanupFailure};

/// Boxed future used for asynchronous construction and release.
pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A release action paired with a resolved instance.
pub(crate) enum Release {
    Sync(Box<dyn FnOnce() -> Result<(), BoxError> + Send>),
    Async(Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>),
}

impl Release {
    /// Runs the action on the current thread. Asynchronous actions cannot be
    /// driven here and are reported as failures.
    pub(crate) fn run_blocking(self) -> Result<(), BoxError> {
        match self {
            Release::Sync(f) => f(),
            Release::Async(_) => Err("asynchronous release action cannot run during blocking teardown".into()),
        }
    }

    pub(crate) async fn run(self) -> Result<(), BoxError> {
        match self {
            Release::Sync(f) => f(),
            Release::Async(f) => f().await,
        }
    }
}

pub(crate) struct CleanupEntry {
    pub(crate) service: &'static str,
    pub(crate) release: Release,
}

/// Release actions in registration order; drained in reverse.
#[derive(Default)]
pub(crate) struct CleanupStack {
    entries: Vec<CleanupEntry>,
}

impl CleanupStack {
    pub(crate) fn push(&mut self, service: &'static str, release: Release) {
        self.entries.push(CleanupEntry { service, release });
    }

    /// Takes every pending entry so it can be released outside any lock.
    pub(crate) fn take(&mut self) -> Vec<CleanupEntry> {
        std::mem::take(&mut self.entries)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Runs every entry in reverse registration order, collecting failures.
pub(crate) async fn release_all(entries: Vec<CleanupEntry>) -> Vec<CleanupFailure> {
    let mut failures = Vec::new();
    for entry in entries.into_iter().rev() {
        if let Err(source) = entry.release.run().await {
            tracing::warn!(service = entry.service, error = %source, "release action failed");
            failures.push(CleanupFailure {
                service: entry.service,
                source,
            });
        }
    }
    failures
}

/// Blocking counterpart of [`release_all`].
pub(crate) fn release_all_blocking(entries: Vec<CleanupEntry>) -> Vec<CleanupFailure> {
    let mut failures = Vec::new();
    for entry in entries.into_iter().rev() {
        if let Err(source) = entry.release.run_blocking() {
            tracing::warn!(service = entry.service, error = %source, "release action failed");
            failures.push(CleanupFailure {
                service: entry.service,
                source,
            });
        }
    }
    failures
}
