//! A cloneable handle for cancelling the engine's request from external code.

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;

/// A cloneable handle for poking the engine from another task.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone)]
pub struct EngineHandle {
    cancel: Arc<Mutex<CancellationToken>>,
    in_flight: Arc<AtomicBool>,
}

impl EngineHandle {
    pub(crate) fn new() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Abort the request currently in flight, if any.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Whether a request is outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Mark a new request as in flight and hand out its token.
    ///
    /// A request still marked in flight is cancelled first.
    pub(crate) fn begin(&self) -> CancellationToken {
        let mut current = self.cancel.lock();
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::warn!("Superseding a request that is still in flight");
            current.cancel();
        }
        *current = CancellationToken::new();
        current.clone()
    }

    /// Mark the current request as finished.
    pub(crate) fn finish(&self) {
        self.in_flight.store(false, Ordering::Release);
    }
}
