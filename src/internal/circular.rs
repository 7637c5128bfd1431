//! Circular dependency detection infrastructure.
//!
//! The chain lives in the resolution context rather than in thread-local
//! storage, so it survives `.await` points and thread hops inside one
//! asynchronous resolution.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{DiError, DiResult};
use crate::key::Key;

pub(crate) const DEFAULT_MAX_DEPTH: usize = 1024;

/// Identities currently under construction within one top-level resolve call.
#[derive(Clone)]
pub(crate) struct ResolutionChain {
    stack: Arc<Mutex<Vec<Key>>>,
    max_depth: usize,
}

impl ResolutionChain {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            stack: Arc::new(Mutex::new(Vec::new())),
            max_depth,
        }
    }

    /// Pushes `key`, failing if it is already being resolved.
    pub(crate) fn enter(&self, key: Key) -> DiResult<ChainGuard> {
        let mut stack = self.stack.lock();

        // Circular detection BEFORE pushing the new key
        if stack.contains(&key) {
            let mut path: Vec<&'static str> = stack.iter().map(Key::display_name).collect();
            path.push(key.display_name());
            return Err(DiError::Circular(path));
        }

        if stack.len() >= self.max_depth {
            return Err(DiError::DepthExceeded(stack.len()));
        }

        stack.push(key);
        Ok(ChainGuard {
            stack: self.stack.clone(),
            key,
        })
    }

    /// Names of the identities on the chain, outermost first.
    pub(crate) fn names(&self) -> Vec<&'static str> {
        self.stack.lock().iter().map(Key::display_name).collect()
    }

    pub(crate) fn max_depth(&self) -> usize {
        self.max_depth
    }
}

/// Pops its key off the chain when dropped.
pub(crate) struct ChainGuard {
    stack: Arc<Mutex<Vec<Key>>>,
    key: Key,
}

impl Drop for ChainGuard {
    fn drop(&mut self) {
        let mut stack = self.stack.lock();
        // Usually the last entry, unless a provider resolved branches concurrently
        if let Some(pos) = stack.iter().rposition(|k| *k == self.key) {
            stack.remove(pos);
        }
    }
}
