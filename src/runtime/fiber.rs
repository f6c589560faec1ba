//! The cancellation scope of a single program run.
//!
//! A [`Fiber`] carries two pieces of state:
//!
//! - a sticky cancellation request, set by [`Fiber::cancel`] from any thread
//!   or by the program itself through the `canceled` operation;
//! - a mask depth, raised by `uncancelable` regions and temporarily lowered
//!   by `poll`.
//!
//! Cancellation is cooperative. A request only takes effect when the run
//! reaches an observation point while the mask depth is zero. Observation
//! points are the start of every operation, the `canceled` operation itself,
//! the entry of a `poll`, and the exit of an `uncancelable` region.
//!
//! The mask depth belongs to one run at a time. Runs that should share a
//! cancellation request but proceed concurrently each take a
//! [`fork`](Fiber::fork).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::Interrupted;

/// Cancellation scope shared by a run and whoever controls it.
///
/// Cloning a fiber yields another reference to the same scope, which is how
/// a caller keeps a handle for canceling a run it has started elsewhere.
///
/// The request is sticky: once canceled, a fiber stays canceled, and every
/// later run in it stops at its first operation.
///
/// # Example
///
/// ```
/// use sluice::runtime::Fiber;
///
/// let fiber = Fiber::new();
/// let controller = fiber.clone();
///
/// assert!(!fiber.is_cancel_requested());
/// controller.cancel();
/// assert!(fiber.is_cancel_requested());
/// ```
#[derive(Clone, Default)]
pub struct Fiber {
    request: Arc<AtomicBool>,
    mask: Arc<AtomicUsize>,
}

/// Host-level poll token handed out by an uncancelable region.
///
/// The token remembers the depth of the region that issued it. Applying it
/// lowers the mask by one level, but only while that region is the innermost
/// active mask; anywhere else it is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPoll {
    depth: usize,
}

/// Puts the mask depth back where it was when dropped.
///
/// Held for the whole of a run, so a run abandoned mid-region does not
/// leave the fiber masked.
pub(crate) struct Restore<'a> {
    fiber: &'a Fiber,
    level: usize,
}

impl Drop for Restore<'_> {
    fn drop(&mut self) {
        self.fiber.set_mask(self.level);
    }
}

impl std::fmt::Debug for Fiber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fiber")
            .field("cancel_requested", &self.is_cancel_requested())
            .field("mask", &self.mask_level())
            .finish()
    }
}

impl Fiber {
    /// Create a fresh scope: no cancellation requested, nothing masked.
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope with its own mask depth that shares this fiber's request.
    ///
    /// Canceling either one cancels both.
    pub fn fork(&self) -> Self {
        Fiber {
            request: Arc::clone(&self.request),
            mask: Arc::default(),
        }
    }

    /// Request cancellation of the run using this fiber.
    pub fn cancel(&self) {
        self.request.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancel_requested(&self) -> bool {
        self.request.load(Ordering::SeqCst)
    }

    /// Whether the run is currently inside an uncancelable region.
    pub fn is_masked(&self) -> bool {
        self.mask_level() > 0
    }

    pub(crate) fn mask_level(&self) -> usize {
        self.mask.load(Ordering::SeqCst)
    }

    pub(crate) fn set_mask(&self, level: usize) {
        self.mask.store(level, Ordering::SeqCst);
    }

    /// Guard that restores the current mask depth on drop.
    pub(crate) fn restore_on_drop(&self) -> Restore<'_> {
        Restore {
            fiber: self,
            level: self.mask_level(),
        }
    }

    /// Observation point: fails with `Canceled` when a request is pending
    /// and nothing masks it.
    pub(crate) fn observe(&self) -> Result<(), Interrupted> {
        if self.is_cancel_requested() && !self.is_masked() {
            #[cfg(feature = "tracing")]
            tracing::debug!("cancellation observed");
            return Err(Interrupted::Canceled);
        }
        Ok(())
    }

    /// Self-cancellation: record the request, then observe it.
    ///
    /// Inside an uncancelable region this returns `Ok(())` and the request
    /// takes effect once the region is left.
    pub(crate) fn canceled(&self) -> Result<(), Interrupted> {
        self.cancel();
        self.observe()
    }

    /// Raise the mask one level and return the level it had before.
    pub(crate) fn mask_once(&self) -> usize {
        self.mask.fetch_add(1, Ordering::SeqCst)
    }

    /// Enter an uncancelable region, returning its poll token.
    ///
    /// The region is left by setting the mask back to [`HostPoll::outer`].
    pub(crate) fn enter_region(&self) -> HostPoll {
        HostPoll {
            depth: self.mask_once() + 1,
        }
    }

    /// Lower the mask for a `poll`, if `token` belongs to the innermost region.
    ///
    /// Returns the level to restore afterwards, or `None` when the token is
    /// stale and the poll is a no-op.
    pub(crate) fn unmask(&self, token: HostPoll) -> Option<usize> {
        let current = self.mask_level();
        if current != token.depth {
            return None;
        }
        self.set_mask(token.outer());
        Some(current)
    }
}

impl HostPoll {
    /// Mask depth outside the region that issued this token.
    pub(crate) fn outer(self) -> usize {
        self.depth - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_without_request_is_ok() {
        assert_eq!(Fiber::new().observe(), Ok(()));
    }

    #[test]
    fn test_observe_after_cancel_is_canceled() {
        let fiber = Fiber::new();
        fiber.cancel();
        assert_eq!(fiber.observe(), Err(Interrupted::Canceled));
    }

    #[test]
    fn test_region_masks_until_left() {
        let fiber = Fiber::new();
        let region = fiber.enter_region();
        fiber.cancel();
        // Masked: still running.
        assert_eq!(fiber.observe(), Ok(()));
        fiber.set_mask(region.outer());
        assert_eq!(fiber.observe(), Err(Interrupted::Canceled));
    }

    #[test]
    fn test_unmask_innermost_region_only() {
        let fiber = Fiber::new();
        let outer = fiber.enter_region();
        let inner = fiber.enter_region();

        assert_eq!(fiber.unmask(outer), None);
        assert_eq!(fiber.mask_level(), 2);

        assert_eq!(fiber.unmask(inner), Some(2));
        assert_eq!(fiber.mask_level(), 1);
        assert!(fiber.is_masked());
    }

    #[test]
    fn test_canceled_inside_region_is_deferred() {
        let fiber = Fiber::new();
        fiber.enter_region();
        assert_eq!(fiber.canceled(), Ok(()));
        assert!(fiber.is_cancel_requested());
    }

    #[test]
    fn test_restore_guard_resets_mask() {
        let fiber = Fiber::new();
        {
            let _restore = fiber.restore_on_drop();
            fiber.enter_region();
            fiber.enter_region();
            assert!(fiber.is_masked());
        }
        assert!(!fiber.is_masked());
    }

    #[test]
    fn test_forks_share_request_but_not_mask() {
        let fiber = Fiber::new();
        let first = fiber.fork();
        let second = fiber.fork();

        let first_region = first.enter_region();
        second.enter_region();
        first.set_mask(first_region.outer());
        fiber.cancel();

        assert_eq!(first.observe(), Err(Interrupted::Canceled));
        assert_eq!(second.observe(), Ok(()));
        assert!(!fiber.is_masked());
    }

    #[test]
    fn test_clone_shares_mask() {
        let fiber = Fiber::new();
        let clone = fiber.clone();
        fiber.enter_region();
        assert!(clone.is_masked());
    }
}
