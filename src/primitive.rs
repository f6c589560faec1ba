//! The primitive call adapter.
//!
//! Every domain operation of every algebra ends up here: a handle call is
//! moved onto the runtime's blocking mode and its `Err` is routed into the
//! error channel. Panics are left alone and unwind through the run.

use crate::error::{Failure, Interrupted};
use crate::kernel::Step;
use crate::program::{AnyValue, Thunk, TryThunk};
use crate::runtime::Runtime;

/// Run `call` against `handle` in blocking mode, capturing its failure.
pub(crate) async fn blocking<R, H, F>(runtime: &R, handle: H, call: F) -> Step
where
    R: Runtime,
    H: Send + 'static,
    F: FnOnce(&H) -> Result<AnyValue, Failure> + Send + 'static,
{
    runtime
        .blocking(move || call(&handle))
        .await
        .map_err(Interrupted::Errored)
}

/// Evaluate a delayed pure computation inline.
pub(crate) fn delay(thunk: &Thunk) -> Step {
    Ok(thunk())
}

/// Evaluate a fallible thunk inline, capturing its failure.
pub(crate) fn capture(thunk: &TryThunk) -> Step {
    thunk().map_err(Interrupted::Errored)
}
