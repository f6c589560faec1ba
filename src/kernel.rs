//! The cancellation and recovery kernel.
//!
//! The five structural operations (`handle_error_with`, `force_r`,
//! `uncancelable`, `poll` and `on_cancel`) never fold their sub-programs
//! recursively. Entering one pushes a [`Frame`] onto the fold loop's stack
//! and hands back the sub-program to fold next; the frame sees the
//! sub-program's result as the stack unwinds. Recovery loops and deeply
//! nested regions therefore cost heap frames, not call stack.

use crate::algebra::Algebra;
use crate::effect::BoxFuture;
use crate::error::{Failure, Interrupted};
use crate::program::{AnyValue, Cont, Handler, MapFn, Node, Operation, Poll};
use crate::runtime::{Fiber, Runtime};

/// Result of folding one node: a value, or why there is none.
pub(crate) type Step = Result<AnyValue, Interrupted>;

/// Configuration shared by every interpreter of one family.
#[derive(Debug, Clone)]
pub(crate) struct Kernel<R> {
    pub(crate) runtime: R,
}

impl<R: Runtime> Kernel<R> {
    pub(crate) fn new(runtime: R) -> Self {
        Kernel { runtime }
    }
}

/// Something that can fold a program of `Alg` against a handle.
pub(crate) trait Fold<Alg: Algebra>: Sync {
    fn fold<'a>(
        &'a self,
        node: &'a Node<Alg>,
        handle: &'a Alg::Handle,
        fiber: &'a Fiber,
    ) -> BoxFuture<'a, Step>;
}

/// Pending work on the fold loop's stack.
pub(crate) enum Frame<Alg: Algebra> {
    /// Transform a value.
    Map(MapFn),
    /// Continue with the program built from a value.
    Bind(Cont<Alg>),
    /// Recover from a failure.
    Recover(Handler<Alg>),
    /// Run the second half of a `force_r` unless canceled.
    ForceR(Node<Alg>),
    /// Run a finalizer if canceled.
    OnCancel(Node<Alg>),
    /// A finalizer is running masked; holds the level to restore.
    Finalizing(usize),
    /// An uncancelable region; holds the level outside it.
    Region(usize),
    /// A `poll` lowered the mask; holds the level to restore.
    Unmasked(usize),
}

/// What the fold loop does once a frame has seen a result.
pub(crate) enum Resume<Alg: Algebra> {
    /// Hand the result to the next frame down.
    Unwind(Step),
    /// Fold this node next.
    Continue(Node<Alg>),
}

/// Enter `op` if it is structural.
///
/// Returns `None` for operations that produce a value directly,
/// `Some(Ok(node))` with the sub-program to fold next, or `Some(Err(_))`
/// when entering observed a cancellation.
pub(crate) fn enter<Alg: Algebra>(
    op: &Operation<Alg>,
    stack: &mut Vec<Frame<Alg>>,
    fiber: &Fiber,
) -> Option<Result<Node<Alg>, Interrupted>> {
    let next = match op {
        Operation::HandleErrorWith(fa, handler) => {
            stack.push(Frame::Recover(handler.clone()));
            fa.clone()
        }
        Operation::ForceR(fa, fb) => {
            stack.push(Frame::ForceR(fb.clone()));
            fa.clone()
        }
        Operation::OnCancel(fa, finalizer) => {
            stack.push(Frame::OnCancel(finalizer.clone()));
            fa.clone()
        }
        Operation::Uncancelable(body) => {
            let token = fiber.enter_region();
            stack.push(Frame::Region(token.outer()));
            body(Poll::from_host(token))
        }
        Operation::Poll(token, fa) => {
            if let Some(level) = fiber.unmask(*token) {
                stack.push(Frame::Unmasked(level));
                if let Err(interrupted) = fiber.observe() {
                    return Some(Err(interrupted));
                }
            }
            fa.clone()
        }
        _ => return None,
    };
    Some(Ok(next))
}

/// Let `frame` act on the result of the program above it.
pub(crate) fn resume<Alg: Algebra>(
    frame: Frame<Alg>,
    result: Step,
    stack: &mut Vec<Frame<Alg>>,
    fiber: &Fiber,
) -> Resume<Alg> {
    match (frame, result) {
        (Frame::Map(f), Ok(value)) => Resume::Unwind(Ok(f(value))),
        (Frame::Bind(k), Ok(value)) => Resume::Continue(k(value)),
        (Frame::Recover(handler), Err(Interrupted::Errored(failure))) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(algebra = Alg::NAME, "recovering from failure: {}", failure);
            Resume::Continue(handler(failure))
        }
        (Frame::ForceR(next), Ok(_) | Err(Interrupted::Errored(_))) => Resume::Continue(next),
        (Frame::OnCancel(finalizer), Err(Interrupted::Canceled)) => {
            stack.push(Frame::Finalizing(fiber.mask_once()));
            Resume::Continue(finalizer)
        }
        (Frame::Finalizing(level), finalized) => {
            fiber.set_mask(level);
            if let Err(Interrupted::Errored(failure)) = finalized {
                report_finalizer_failure(&failure);
            }
            Resume::Unwind(Err(Interrupted::Canceled))
        }
        (Frame::Region(level), result) => {
            fiber.set_mask(level);
            Resume::Unwind(fiber.observe().and(result))
        }
        (Frame::Unmasked(level), result) => {
            fiber.set_mask(level);
            Resume::Unwind(result)
        }
        (_, result) => Resume::Unwind(result),
    }
}

fn report_finalizer_failure(failure: &Failure) {
    #[cfg(feature = "tracing")]
    tracing::warn!("cancellation finalizer failed: {}", failure);
    #[cfg(not(feature = "tracing"))]
    eprintln!("cancellation finalizer failed: {}", failure);
}
