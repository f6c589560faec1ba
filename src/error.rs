//! Failure, interruption and outcome types.
//!
//! A program run ends in exactly one of three ways, captured by [`Outcome`]:
//!
//! - it succeeds with a value,
//! - a primitive call (or an explicit `raise_error`) fails with a [`Failure`],
//! - it is canceled.
//!
//! While a program is being folded the last two travel together as
//! [`Interrupted`], which is what the interpreter's steps return in their
//! `Err` position. Only the `Errored` half is visible to `handle_error_with`;
//! cancellation is a separate channel that recovery never intercepts.
//!
//! # Example
//!
//! ```
//! use sluice::{Failure, Outcome};
//!
//! let failure = Failure::msg("connection reset");
//! let outcome: Outcome<i32> = Outcome::Errored(failure.clone());
//!
//! assert!(outcome.is_errored());
//! assert_eq!(outcome.failure(), Some(&failure));
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// A captured, non-fatal failure raised by a primitive call.
///
/// `Failure` erases the concrete error type of the driver so that every
/// algebra shares one error channel. It is reference counted: cloning a
/// failure yields the *same* failure, and equality is identity. A handler
/// passed to `handle_error_with` therefore receives exactly the error the
/// primitive returned, which can be recovered with [`Failure::downcast_ref`].
///
/// Panics are not failures. They are treated as fatal and are never
/// converted into a `Failure`.
///
/// # Example
///
/// ```
/// use sluice::Failure;
/// use std::io;
///
/// let failure = Failure::new(io::Error::new(io::ErrorKind::BrokenPipe, "eof"));
/// let io_err = failure.downcast_ref::<io::Error>().unwrap();
/// assert_eq!(io_err.kind(), io::ErrorKind::BrokenPipe);
///
/// let same = failure.clone();
/// assert_eq!(failure, same);
/// assert_ne!(failure, Failure::msg("eof"));
/// ```
#[derive(Clone)]
pub struct Failure {
    inner: Arc<dyn StdError + Send + Sync + 'static>,
}

impl Failure {
    /// Capture an error value.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Failure {
            inner: Arc::new(error),
        }
    }

    /// Capture a plain message as a failure.
    pub fn msg(message: impl Into<String>) -> Self {
        Failure::new(Message(message.into()))
    }

    /// Borrow the captured error.
    pub fn get_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.inner
    }

    /// Attempt to view the captured error as a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    /// Returns `true` when both values refer to the same captured error.
    pub fn ptr_eq(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Failure {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Failure {}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Failure").field(&self.inner).finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for Failure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

impl From<std::io::Error> for Failure {
    fn from(error: std::io::Error) -> Self {
        Failure::new(error)
    }
}

/// Error type behind [`Failure::msg`].
#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for Message {}

/// Why a step did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupted {
    /// A primitive call or `raise_error` failed. Recoverable.
    Errored(Failure),
    /// The run was canceled. Observed, never recovered.
    Canceled,
}

impl Interrupted {
    /// Returns the failure, if this is an error rather than a cancellation.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Interrupted::Errored(failure) => Some(failure),
            Interrupted::Canceled => None,
        }
    }

    /// Returns `true` for cancellation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Interrupted::Canceled)
    }
}

impl From<Failure> for Interrupted {
    fn from(failure: Failure) -> Self {
        Interrupted::Errored(failure)
    }
}

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupted::Errored(failure) => write!(f, "program failed: {}", failure),
            Interrupted::Canceled => f.write_str("program canceled"),
        }
    }
}

impl StdError for Interrupted {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Interrupted::Errored(failure) => Some(failure),
            Interrupted::Canceled => None,
        }
    }
}

/// The final result of running a program against a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<A> {
    /// The program completed with a value.
    Succeeded(A),
    /// The program completed with a captured failure.
    Errored(Failure),
    /// The program was canceled.
    Canceled,
}

impl<A> Outcome<A> {
    /// Returns `true` if the program completed with a value.
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Outcome::Succeeded(_))
    }

    /// Returns `true` if the program completed with a failure.
    pub fn is_errored(&self) -> bool {
        matches!(self, Outcome::Errored(_))
    }

    /// Returns `true` if the program was canceled.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Outcome::Canceled)
    }

    /// Returns the failure of an errored outcome.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Errored(failure) => Some(failure),
            _ => None,
        }
    }

    /// Convert into a `Result`, folding failure and cancellation into [`Interrupted`].
    pub fn into_result(self) -> Result<A, Interrupted> {
        match self {
            Outcome::Succeeded(value) => Ok(value),
            Outcome::Errored(failure) => Err(Interrupted::Errored(failure)),
            Outcome::Canceled => Err(Interrupted::Canceled),
        }
    }

    /// Transform the value of a successful outcome.
    pub fn map<B, F>(self, f: F) -> Outcome<B>
    where
        F: FnOnce(A) -> B,
    {
        match self {
            Outcome::Succeeded(value) => Outcome::Succeeded(f(value)),
            Outcome::Errored(failure) => Outcome::Errored(failure),
            Outcome::Canceled => Outcome::Canceled,
        }
    }
}

impl<A> From<Result<A, Interrupted>> for Outcome<A> {
    fn from(result: Result<A, Interrupted>) -> Self {
        match result {
            Ok(value) => Outcome::Succeeded(value),
            Err(Interrupted::Errored(failure)) => Outcome::Errored(failure),
            Err(Interrupted::Canceled) => Outcome::Canceled,
        }
    }
}
