//! A cloneable handle for observing and aborting a session from external code.

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;

/// A cloneable handle for poking the coordinator from external code.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone, Default)]
pub struct SessionHandle {
    /// Token of the outstanding request, `None` while idle
    pub(crate) inflight: Arc<Mutex<Option<CancellationToken>>>,
    pub(crate) pending: Arc<AtomicBool>,
}

impl SessionHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Claim the pending flag. Returns the token for the new request, or
    /// `None` if a request is already outstanding.
    pub(crate) fn try_begin(&self) -> Option<CancellationToken> {
        let mut inflight = self.inflight.lock();
        if self
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let token = CancellationToken::new();
        *inflight = Some(token.clone());
        Some(token)
    }

    /// Release the pending flag.
    pub(crate) fn finish(&self) {
        let mut inflight = self.inflight.lock();
        *inflight = None;
        self.pending.store(false, Ordering::Release);
    }

    /// Abort the outstanding request. No-op while idle.
    pub fn abort(&self) {
        if let Some(token) = self.inflight.lock().as_ref() {
            tracing::debug!("aborting outstanding request");
            token.cancel();
        }
    }

    /// Whether a request is outstanding.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}
