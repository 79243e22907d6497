//! Cancellable job handles

use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity and cancellation switch of one launched job.
///
/// Every launch gets a fresh id, so an update carrying an older handle can be
/// told apart from one produced by the job currently owning a slot.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: u64,
    token: CancellationToken,
}

impl Default for JobHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl JobHandle {
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// A handle that is also cancelled when `parent` is.
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self::with_token(parent.child_token())
    }

    fn with_token(token: CancellationToken) -> Self {
        Self {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            token,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop the job; it makes no further calls and emits nothing more.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the handle is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl PartialEq for JobHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for JobHandle {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let a = JobHandle::new();
        let b = JobHandle::new();
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_cancel_is_shared_by_clones() {
        let handle = JobHandle::new();
        let clone = handle.clone();
        clone.cancel();
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_parent_cancels_children() {
        let parent = CancellationToken::new();
        let a = JobHandle::child_of(&parent);
        let b = JobHandle::child_of(&parent);
        a.cancel();
        assert!(!b.is_cancelled());
        parent.cancel();
        assert!(b.is_cancelled());
    }
}
