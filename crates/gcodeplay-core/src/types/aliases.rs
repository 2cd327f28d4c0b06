//! Type aliases for callbacks and cooperative cancellation.
//!
//! Long-running work (parsing, voxel rasterisation) is driven step by step
//! from the host's loop. These types are the two channels back to the host:
//! a progress report and a cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// =============================================================================
// CALLBACK TYPES
// =============================================================================

/// A progress callback receiving a fraction in `0.0..=1.0` and a short status.
///
/// Single-threaded: the host calls `step` and receives progress on the same
/// thread.
pub type ProgressCallback = Box<dyn FnMut(f32, &str)>;

/// A per-step callback that returns `false` to request cancellation.
pub type StepCallback<'a> = &'a mut dyn FnMut(f32) -> bool;

// =============================================================================
// CANCELLATION
// =============================================================================

/// Cloneable cooperative cancellation flag.
///
/// Every clone observes the same flag. Work loops check it at instruction or
/// batch boundaries and unwind without committing partial state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Clear the flag so the token can be reused for a new session.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());

        clone.reset();
        assert!(!token.is_cancelled());
    }
}
