//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod cleanup_stack;

pub(crate) use circular::{ResolutionChain, DEFAULT_MAX_DEPTH};
pub(crate) use cleanup_stack::{release_all, release_all_blocking, BoxFuture, CleanupEntry, CleanupStack, Release};
