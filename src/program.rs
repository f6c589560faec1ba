//! Declarative programs over one algebra.
//!
//! A [`Program<Alg, A>`] is an immutable tree describing a computation that,
//! given a handle of the algebra `Alg`, produces an `A`. Nothing happens when
//! a program is built; it only runs when an interpreter folds it against a
//! handle. Programs are cheap to clone and may be run any number of times.
//!
//! # Example
//!
//! ```
//! use sluice::algebra::large_object::{self, LargeObjectIO};
//!
//! // Write a header, recovering from a failed write by truncating.
//! let program: LargeObjectIO<i64> = large_object::write(b"header".to_vec())
//!     .handle_error_with(|_| large_object::truncate(0))
//!     .then(large_object::size());
//!
//! // Programs are plain values: build once, run as often as needed.
//! let again = program.clone();
//! # drop((program, again));
//! ```

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::algebra::Algebra;
use crate::embedded::Embedded;
use crate::error::Failure;
use crate::runtime::HostPoll;

/// A type-erased value passed between the steps of a running program.
pub type AnyValue = Box<dyn Any + Send>;

pub(crate) type Thunk = Arc<dyn Fn() -> AnyValue + Send + Sync>;
pub(crate) type TryThunk = Arc<dyn Fn() -> Result<AnyValue, Failure> + Send + Sync>;
pub(crate) type RawCall<H> = Arc<dyn Fn(&H) -> Result<AnyValue, Failure> + Send + Sync>;
pub(crate) type MapFn = Arc<dyn Fn(AnyValue) -> AnyValue + Send + Sync>;
pub(crate) type Cont<Alg> = Arc<dyn Fn(AnyValue) -> Node<Alg> + Send + Sync>;
pub(crate) type Handler<Alg> = Arc<dyn Fn(Failure) -> Node<Alg> + Send + Sync>;
pub(crate) type Body<Alg> = Arc<dyn Fn(Poll<Alg>) -> Node<Alg> + Send + Sync>;

/// Unbox a step value whose type is guaranteed by the typed program API.
///
/// A mismatch is a defect in an algebra binding, not a runtime condition.
pub(crate) fn unbox<A: 'static>(value: AnyValue) -> A {
    match value.downcast::<A>() {
        Ok(value) => *value,
        Err(_) => panic!(
            "defect: program step produced a value that is not a {}",
            std::any::type_name::<A>()
        ),
    }
}

pub(crate) fn unit() -> AnyValue {
    Box::new(())
}

/// The shape of a program: pure values, operations, and their composition.
pub(crate) enum Node<Alg: Algebra> {
    Pure(Thunk),
    Op(Arc<Operation<Alg>>),
    Map(Arc<Node<Alg>>, MapFn),
    Bind(Arc<Node<Alg>>, Cont<Alg>),
}

impl<Alg: Algebra> Clone for Node<Alg> {
    fn clone(&self) -> Self {
        match self {
            Node::Pure(thunk) => Node::Pure(Arc::clone(thunk)),
            Node::Op(op) => Node::Op(Arc::clone(op)),
            Node::Map(inner, f) => Node::Map(Arc::clone(inner), Arc::clone(f)),
            Node::Bind(inner, k) => Node::Bind(Arc::clone(inner), Arc::clone(k)),
        }
    }
}

/// A single step of an algebra.
///
/// None of the variants stores a handle of `Alg`: the handle is supplied
/// by whoever runs the program.
pub(crate) enum Operation<Alg: Algebra> {
    Delay(Thunk),
    Raw(RawCall<Alg::Handle>),
    Suspend(SyncHint, TryThunk),
    RaiseError(Failure),
    Monotonic,
    Realtime,
    Canceled,
    Embed(Embedded),
    HandleErrorWith(Node<Alg>, Handler<Alg>),
    ForceR(Node<Alg>, Node<Alg>),
    Uncancelable(Body<Alg>),
    Poll(HostPoll, Node<Alg>),
    OnCancel(Node<Alg>, Node<Alg>),
    Domain(Arc<Alg::Op>),
}

/// How a suspended thunk should be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncHint {
    /// Cheap and non-blocking: run inline.
    Delay,
    /// May block its thread: run through the runtime's blocking mode.
    Blocking,
    /// Blocking, and the host may interrupt it once.
    InterruptibleOnce,
    /// Blocking, and the host may interrupt it repeatedly.
    InterruptibleMany,
}

impl SyncHint {
    /// Whether thunks with this hint go through the runtime's blocking mode.
    pub fn is_blocking(self) -> bool {
        !matches!(self, SyncHint::Delay)
    }
}

/// Program-level poll token handed to an [`uncancelable`](Program::uncancelable) body.
///
/// `poll.apply(program)` re-enables cancellation for exactly the duration
/// of `program`. Outside the region that issued it, applying the token has
/// no effect.
pub struct Poll<Alg> {
    token: HostPoll,
    _alg: PhantomData<fn() -> Alg>,
}

impl<Alg> Clone for Poll<Alg> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Alg> Copy for Poll<Alg> {}

impl<Alg> fmt::Debug for Poll<Alg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Poll").field(&self.token).finish()
    }
}

impl<Alg: Algebra> Poll<Alg> {
    pub(crate) fn from_host(token: HostPoll) -> Self {
        Poll {
            token,
            _alg: PhantomData,
        }
    }

    /// Make `program` cancelable again while it runs.
    pub fn apply<A>(&self, program: Program<Alg, A>) -> Program<Alg, A> {
        Program::op(Operation::Poll(self.token, program.node))
    }
}

/// A program whose result type has been forgotten.
///
/// Used to carry sub-programs inside an [`Embedded`] reference.
pub struct Erased<Alg: Algebra> {
    pub(crate) node: Node<Alg>,
}

impl<Alg: Algebra> Clone for Erased<Alg> {
    fn clone(&self) -> Self {
        Erased {
            node: self.node.clone(),
        }
    }
}

impl<Alg: Algebra> fmt::Debug for Erased<Alg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Erased").field("algebra", &Alg::NAME).finish()
    }
}

/// A replayable computation over the algebra `Alg` producing an `A`.
pub struct Program<Alg: Algebra, A> {
    pub(crate) node: Node<Alg>,
    _out: PhantomData<fn() -> A>,
}

impl<Alg: Algebra, A> Clone for Program<Alg, A> {
    fn clone(&self) -> Self {
        Program::from_node(self.node.clone())
    }
}

impl<Alg: Algebra, A> fmt::Debug for Program<Alg, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("algebra", &Alg::NAME)
            .field("output", &std::any::type_name::<A>())
            .finish()
    }
}

impl<Alg: Algebra, A> Program<Alg, A> {
    pub(crate) fn from_node(node: Node<Alg>) -> Self {
        Program {
            node,
            _out: PhantomData,
        }
    }

    pub(crate) fn op(operation: Operation<Alg>) -> Self {
        Program::from_node(Node::Op(Arc::new(operation)))
    }

    /// A domain operation of `Alg`; the binding decides what it returns.
    pub(crate) fn domain(op: Alg::Op) -> Self {
        Program::op(Operation::Domain(Arc::new(op)))
    }

    /// Forget the result type, for embedding.
    pub fn erase(self) -> Erased<Alg> {
        Erased { node: self.node }
    }

    /// Fail with `failure`.
    pub fn raise_error(failure: Failure) -> Self {
        Program::op(Operation::RaiseError(failure))
    }

    /// Run this program for its effects, ignoring its value and any error,
    /// then run `next`.
    ///
    /// Cancellation of `self` still cancels the whole sequence.
    pub fn force_r<B>(self, next: Program<Alg, B>) -> Program<Alg, B> {
        Program::op(Operation::ForceR(self.node, next.node))
    }

    /// Run `finalizer` if, and only if, this program is canceled.
    ///
    /// The finalizer runs masked and exactly once; the program stays canceled.
    pub fn on_cancel(self, finalizer: Program<Alg, ()>) -> Self {
        Program::op(Operation::OnCancel(self.node, finalizer.node))
    }
}

impl<Alg: Algebra, A: Send + 'static> Program<Alg, A> {
    /// A program that yields `value` without touching the handle.
    pub fn pure(value: A) -> Self
    where
        A: Clone + Sync,
    {
        Program::from_node(Node::Pure(Arc::new(move || {
            Box::new(value.clone()) as AnyValue
        })))
    }

    /// Evaluate `thunk` lazily, each time the program runs.
    pub fn delay<F>(thunk: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Program::op(Operation::Delay(Arc::new(move || {
            Box::new(thunk()) as AnyValue
        })))
    }

    /// Invoke a raw primitive against the handle, in blocking mode.
    pub fn raw<F>(call: F) -> Self
    where
        F: Fn(&Alg::Handle) -> Result<A, Failure> + Send + Sync + 'static,
    {
        Program::op(Operation::Raw(Arc::new(move |handle: &Alg::Handle| {
            call(handle).map(|value| Box::new(value) as AnyValue)
        })))
    }

    /// Suspend a fallible thunk, scheduled according to `hint`.
    pub fn suspend<F>(hint: SyncHint, thunk: F) -> Self
    where
        F: Fn() -> Result<A, Failure> + Send + Sync + 'static,
    {
        Program::op(Operation::Suspend(
            hint,
            Arc::new(move || thunk().map(|value| Box::new(value) as AnyValue)),
        ))
    }

    /// Run `program`, of another algebra, against its own `handle`.
    ///
    /// The handle of the surrounding program is never passed to `program`.
    pub fn embed<B: Algebra>(handle: B::Handle, program: Program<B, A>) -> Self {
        Program::op(Operation::Embed(B::embed(handle, program.erase())))
    }

    /// Run `body` with cancellation masked.
    ///
    /// The body receives a [`Poll`] that re-enables cancellation for the
    /// sub-programs it wraps.
    pub fn uncancelable<F>(body: F) -> Self
    where
        F: Fn(Poll<Alg>) -> Program<Alg, A> + Send + Sync + 'static,
    {
        Program::op(Operation::Uncancelable(Arc::new(move |poll: Poll<Alg>| body(poll).node)))
    }

    /// Transform the value.
    pub fn map<B, F>(self, f: F) -> Program<Alg, B>
    where
        F: Fn(A) -> B + Send + Sync + 'static,
        B: Send + 'static,
    {
        Program::from_node(Node::Map(
            Arc::new(self.node),
            Arc::new(move |value: AnyValue| Box::new(f(unbox::<A>(value))) as AnyValue),
        ))
    }

    /// Chain a dependent program.
    pub fn and_then<B, F>(self, f: F) -> Program<Alg, B>
    where
        F: Fn(A) -> Program<Alg, B> + Send + Sync + 'static,
    {
        Program::from_node(Node::Bind(
            Arc::new(self.node),
            Arc::new(move |value: AnyValue| f(unbox::<A>(value)).node),
        ))
    }

    /// Sequence `next` after this program, discarding this program's value.
    pub fn then<B>(self, next: Program<Alg, B>) -> Program<Alg, B> {
        Program::from_node(Node::Bind(
            Arc::new(self.node),
            Arc::new(move |_: AnyValue| next.node.clone()),
        ))
    }

    /// Discard the value.
    pub fn void(self) -> Program<Alg, ()> {
        Program::from_node(Node::Map(Arc::new(self.node), Arc::new(|_: AnyValue| unit())))
    }

    /// Recover from a failure by running the program `handler` builds.
    ///
    /// Cancellation is not a failure and is never handled here.
    pub fn handle_error_with<F>(self, handler: F) -> Self
    where
        F: Fn(Failure) -> Program<Alg, A> + Send + Sync + 'static,
    {
        Program::op(Operation::HandleErrorWith(
            self.node,
            Arc::new(move |failure: Failure| handler(failure).node),
        ))
    }

    /// Expose a failure as a value.
    pub fn attempt(self) -> Program<Alg, Result<A, Failure>> {
        let ok: Node<Alg> = Node::Map(
            Arc::new(self.node),
            Arc::new(|value: AnyValue| {
                Box::new(Ok::<A, Failure>(unbox::<A>(value))) as AnyValue
            }),
        );
        Program::op(Operation::HandleErrorWith(
            ok,
            Arc::new(|failure: Failure| {
                Node::Pure(Arc::new(move || {
                    Box::new(Err::<A, Failure>(failure.clone())) as AnyValue
                }))
            }),
        ))
    }
}

impl<Alg: Algebra> Program<Alg, ()> {
    /// A program that does nothing.
    pub fn unit() -> Self {
        Program::from_node(Node::Pure(Arc::new(unit)))
    }

    /// Request cancellation of the current run.
    ///
    /// Takes effect immediately when unmasked; inside an uncancelable region
    /// it takes effect once the region is left.
    pub fn canceled() -> Self {
        Program::op(Operation::Canceled)
    }
}

impl<Alg: Algebra> Program<Alg, Duration> {
    /// Read the runtime's monotonic clock.
    pub fn monotonic() -> Self {
        Program::op(Operation::Monotonic)
    }

    /// Read the wall clock, as time since the Unix epoch.
    pub fn realtime() -> Self {
        Program::op(Operation::Realtime)
    }
}
