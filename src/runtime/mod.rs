//! Host runtime abstraction.
//!
//! The interpreters do not own threads, pools or clocks. Everything they
//! need from the outside world comes through two pieces:
//!
//! - [`Runtime`] - how to run a call that may block, and how to read the
//!   monotonic and wall clocks.
//! - [`Fiber`] - the cancellation scope of one run: the cancellation request
//!   flag plus the mask depth used by `uncancelable`, `poll` and `on_cancel`.
//!
//! Two runtimes are provided. [`Inline`] runs blocking calls on the calling
//! task and is always available. `TokioRuntime` (feature `async`) moves them
//! onto tokio's blocking pool.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

mod fiber;

pub use fiber::{Fiber, HostPoll};

/// Execution services the interpreters require from their host.
///
/// Implementations must be cheap to clone; every interpreter holds one.
pub trait Runtime: fmt::Debug + Clone + Send + Sync + 'static {
    /// Run a call that may occupy its thread for an unbounded time.
    ///
    /// Panics raised by `f` must propagate to the awaiting task.
    fn blocking<T, F>(&self, f: F) -> impl Future<Output = T> + Send
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static;

    /// Time elapsed on a monotonic clock since an arbitrary fixed origin.
    fn monotonic(&self) -> Duration;

    /// Wall-clock time since the Unix epoch.
    fn realtime(&self) -> Duration;
}

fn since_epoch() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

/// Runs blocking calls directly on the task that awaits them.
///
/// Suitable for tests, for single-threaded hosts and for drivers whose
/// calls never actually block.
///
/// # Example
///
/// ```
/// use sluice::runtime::{Inline, Runtime};
///
/// # tokio_test::block_on(async {
/// let runtime = Inline::new();
/// assert_eq!(runtime.blocking(|| 40 + 2).await, 42);
/// # });
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Inline {
    origin: Instant,
}

impl Inline {
    /// Create an inline runtime whose monotonic clock starts now.
    pub fn new() -> Self {
        Inline {
            origin: Instant::now(),
        }
    }
}

impl Default for Inline {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime for Inline {
    fn blocking<T, F>(&self, f: F) -> impl Future<Output = T> + Send
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        async move { f() }
    }

    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }

    fn realtime(&self) -> Duration {
        since_epoch()
    }
}

/// Runs blocking calls on tokio's blocking thread pool.
///
/// The monotonic clock is `tokio::time::Instant`, so it follows a paused
/// test clock.
#[cfg(feature = "async")]
#[derive(Debug, Clone, Copy)]
pub struct TokioRuntime {
    origin: tokio::time::Instant,
}

#[cfg(feature = "async")]
impl TokioRuntime {
    /// Create a tokio runtime binding whose monotonic clock starts now.
    pub fn new() -> Self {
        TokioRuntime {
            origin: tokio::time::Instant::now(),
        }
    }
}

#[cfg(feature = "async")]
impl Default for TokioRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "async")]
impl Runtime for TokioRuntime {
    fn blocking<T, F>(&self, f: F) -> impl Future<Output = T> + Send
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        async move {
            match tokio::task::spawn_blocking(f).await {
                Ok(value) => value,
                Err(err) => match err.try_into_panic() {
                    Ok(payload) => std::panic::resume_unwind(payload),
                    // The pool only aborts blocking tasks while shutting down.
                    Err(err) => panic!("blocking call aborted by runtime shutdown: {}", err),
                },
            }
        }
    }

    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }

    fn realtime(&self) -> Duration {
        since_epoch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inline_blocking_runs_closure() {
        let runtime = Inline::new();
        assert_eq!(runtime.blocking(|| "done").await, "done");
    }

    #[test]
    fn test_inline_monotonic_never_goes_backwards() {
        let runtime = Inline::new();
        let first = runtime.monotonic();
        let second = runtime.monotonic();
        assert!(second >= first);
    }

    #[test]
    fn test_realtime_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(Inline::new().realtime() > Duration::from_secs(1_577_836_800));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_tokio_blocking_runs_off_task() {
        let runtime = TokioRuntime::new();
        let here = std::thread::current().id();
        let there = runtime.blocking(|| std::thread::current().id()).await;
        assert_ne!(here, there);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    #[should_panic(expected = "driver exploded")]
    async fn test_tokio_blocking_propagates_panic() {
        let runtime = TokioRuntime::new();
        runtime.blocking(|| panic!("driver exploded")).await;
    }
}
