//! Interpreters: folding programs into effects against a handle.
//!
//! One generic [`Interpreter<Alg, R>`] serves every algebra. It walks the
//! program with an explicit frame stack, so long chains of `map` and
//! `and_then`, recovery loops and nested regions do not grow the call
//! stack. Leaf operations go to the primitive adapter or the embedding
//! dispatcher; structural ones push kernel frames.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sluice::algebra::large_object::{self, LargeObjectHandle};
//! use sluice::runtime::Inline;
//! use sluice::testing::{Journal, MockLargeObject};
//! use sluice::{Interpreters, Outcome};
//!
//! let interpreters = Interpreters::new(Inline::new());
//! let object: LargeObjectHandle = Arc::new(MockLargeObject::new(Journal::new(), 42));
//!
//! let program = large_object::write(b"abc".to_vec()).then(large_object::size());
//! let outcome = interpreters.large_object.run_sync(&program, &object);
//! assert_eq!(outcome, Outcome::Succeeded(3));
//! ```

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::algebra::{
    Algebra, CopyInAlgebra, CopyManagerAlgebra, CopyOutAlgebra, FastpathAlgebra,
    LargeObjectAlgebra, LargeObjectManagerAlgebra, PgConnectionAlgebra,
};
use crate::effect::{BoxFuture, Effect};
use crate::error::{Interrupted, Outcome};
use crate::kernel::{self, Fold, Frame, Kernel, Resume, Step};
use crate::primitive;
use crate::program::{unbox, unit, AnyValue, Node, Operation, Program};
use crate::runtime::{Fiber, Runtime};

/// Folds programs of the algebra `Alg`, using the host runtime `R`.
///
/// Interpreters hold no per-run state; build one at startup and share it.
pub struct Interpreter<Alg, R> {
    kernel: Kernel<R>,
    _alg: PhantomData<fn() -> Alg>,
}

impl<Alg, R: Clone> Clone for Interpreter<Alg, R> {
    fn clone(&self) -> Self {
        Interpreter {
            kernel: self.kernel.clone(),
            _alg: PhantomData,
        }
    }
}

impl<Alg: Algebra, R: Runtime> fmt::Debug for Interpreter<Alg, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("algebra", &Alg::NAME)
            .field("runtime", &self.kernel.runtime)
            .finish()
    }
}

impl<Alg: Algebra, R: Runtime> Interpreter<Alg, R> {
    /// Create an interpreter running on `runtime`.
    pub fn new(runtime: R) -> Self {
        Self::from_kernel(Kernel::new(runtime))
    }

    pub(crate) fn from_kernel(kernel: Kernel<R>) -> Self {
        Interpreter {
            kernel,
            _alg: PhantomData,
        }
    }

    /// The host runtime this interpreter schedules blocking calls on.
    pub fn runtime(&self) -> &R {
        &self.kernel.runtime
    }

    /// Run `program` against `handle` in a fresh, uncanceled fiber.
    pub async fn run<A: 'static>(
        &self,
        program: &Program<Alg, A>,
        handle: &Alg::Handle,
    ) -> Outcome<A> {
        self.run_with(program, handle, &Fiber::new()).await
    }

    /// Run `program` against `handle` in the given fiber.
    ///
    /// Keep a clone of `fiber` to cancel the run from elsewhere. A fiber
    /// holds the mask depth of one run; give concurrent runs a
    /// [`fork`](Fiber::fork) each.
    pub async fn run_with<A: 'static>(
        &self,
        program: &Program<Alg, A>,
        handle: &Alg::Handle,
        fiber: &Fiber,
    ) -> Outcome<A> {
        let run = self.fold(&program.node, handle, fiber);

        #[cfg(feature = "tracing")]
        let run = tracing::Instrument::instrument(
            run,
            tracing::debug_span!("program", algebra = Alg::NAME),
        );

        let result = run.await;

        #[cfg(feature = "tracing")]
        log_result::<Alg>(&result);

        result.map(unbox::<A>).into()
    }

    /// Run `program` to completion on the current thread.
    ///
    /// Blocks the caller; do not use from inside an async task. With
    /// `TokioRuntime` the calling thread must have a tokio runtime entered
    /// (for example through `Handle::enter`), because blocking calls are
    /// spawned onto it; otherwise the first blocking call panics.
    pub fn run_sync<A: 'static>(
        &self,
        program: &Program<Alg, A>,
        handle: &Alg::Handle,
    ) -> Outcome<A> {
        futures::executor::block_on(self.run(program, handle))
    }

    /// Turn `program` into an [`Effect`] whose environment is the handle.
    pub fn compile<A>(&self, program: Program<Alg, A>) -> Kleisli<Alg, A, R> {
        Kleisli {
            interpreter: self.clone(),
            program,
            fiber: Fiber::new(),
        }
    }

    async fn step(&self, op: &Operation<Alg>, handle: &Alg::Handle, fiber: &Fiber) -> Step {
        let runtime = &self.kernel.runtime;
        match op {
            Operation::Delay(thunk) => primitive::delay(thunk),
            Operation::Raw(call) => {
                let call = Arc::clone(call);
                primitive::blocking(runtime, handle.clone(), move |handle: &Alg::Handle| {
                    call(handle)
                })
                .await
            }
            Operation::Domain(op) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(algebra = Alg::NAME, op = ?op, "primitive call");
                let op = Arc::clone(op);
                primitive::blocking(runtime, handle.clone(), move |handle: &Alg::Handle| {
                    Alg::invoke(&op, handle)
                })
                .await
            }
            Operation::Suspend(hint, thunk) if hint.is_blocking() => {
                let thunk = Arc::clone(thunk);
                runtime
                    .blocking(move || thunk())
                    .await
                    .map_err(Interrupted::Errored)
            }
            Operation::Suspend(_, thunk) => primitive::capture(thunk),
            Operation::RaiseError(failure) => Err(Interrupted::Errored(failure.clone())),
            Operation::Monotonic => Ok(Box::new(runtime.monotonic()) as AnyValue),
            Operation::Realtime => Ok(Box::new(runtime.realtime()) as AnyValue),
            Operation::Canceled => fiber.canceled().map(|()| unit()),
            Operation::Embed(embedded) => self.kernel.dispatch(embedded, fiber).await,
            Operation::HandleErrorWith(..)
            | Operation::ForceR(..)
            | Operation::Uncancelable(_)
            | Operation::Poll(..)
            | Operation::OnCancel(..) => {
                unreachable!("structural operations are entered by the fold loop")
            }
        }
    }
}

#[cfg(feature = "tracing")]
fn log_result<Alg: Algebra>(result: &Step) {
    match result {
        Ok(_) => tracing::trace!(algebra = Alg::NAME, "program succeeded"),
        Err(Interrupted::Errored(failure)) => {
            tracing::debug!(algebra = Alg::NAME, "program failed: {}", failure)
        }
        Err(Interrupted::Canceled) => tracing::debug!(algebra = Alg::NAME, "program canceled"),
    }
}

impl<Alg: Algebra, R: Runtime> Fold<Alg> for Interpreter<Alg, R> {
    fn fold<'a>(
        &'a self,
        node: &'a Node<Alg>,
        handle: &'a Alg::Handle,
        fiber: &'a Fiber,
    ) -> BoxFuture<'a, Step> {
        Box::pin(async move {
            let _restore = fiber.restore_on_drop();
            let mut stack: Vec<Frame<Alg>> = Vec::new();
            let mut current = node.clone();
            loop {
                let mut result = match current {
                    Node::Pure(thunk) => Ok(thunk()),
                    Node::Map(inner, f) => {
                        stack.push(Frame::Map(f));
                        current = Node::clone(&inner);
                        continue;
                    }
                    Node::Bind(inner, k) => {
                        stack.push(Frame::Bind(k));
                        current = Node::clone(&inner);
                        continue;
                    }
                    Node::Op(op) => match fiber.observe() {
                        Err(interrupted) => Err(interrupted),
                        Ok(()) => match kernel::enter(&op, &mut stack, fiber) {
                            Some(Ok(next)) => {
                                current = next;
                                continue;
                            }
                            Some(Err(interrupted)) => Err(interrupted),
                            None => self.step(&op, handle, fiber).await,
                        },
                    },
                };
                current = loop {
                    let Some(frame) = stack.pop() else {
                        return result;
                    };
                    match kernel::resume(frame, result, &mut stack, fiber) {
                        Resume::Continue(next) => break next,
                        Resume::Unwind(step) => result = step,
                    }
                };
            }
        })
    }
}

/// A compiled program: an [`Effect`] from a handle to the program's result.
///
/// Each `run` of the effect takes a [`fork`](Fiber::fork) of this value's
/// fiber: canceling [`fiber`](Kleisli::fiber) cancels every run, while
/// clones running concurrently keep separate mask depths.
pub struct Kleisli<Alg: Algebra, A, R> {
    interpreter: Interpreter<Alg, R>,
    program: Program<Alg, A>,
    fiber: Fiber,
}

impl<Alg: Algebra, A, R: Runtime> Kleisli<Alg, A, R> {
    /// Run in `fiber` instead of a private one.
    pub fn with_fiber(mut self, fiber: Fiber) -> Self {
        self.fiber = fiber;
        self
    }

    /// The fiber whose cancellation request every run shares.
    ///
    /// The request is sticky. Once this fiber is canceled, every later run
    /// of the effect, and of its clones, is canceled at its first
    /// operation; use [`with_fiber`](Kleisli::with_fiber) to start over.
    pub fn fiber(&self) -> &Fiber {
        &self.fiber
    }
}

impl<Alg: Algebra, A, R: Runtime> Clone for Kleisli<Alg, A, R> {
    fn clone(&self) -> Self {
        Kleisli {
            interpreter: self.interpreter.clone(),
            program: self.program.clone(),
            fiber: self.fiber.clone(),
        }
    }
}

impl<Alg: Algebra, A, R: Runtime> fmt::Debug for Kleisli<Alg, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kleisli")
            .field("program", &self.program)
            .field("fiber", &self.fiber)
            .finish()
    }
}

impl<Alg, A, R> Effect for Kleisli<Alg, A, R>
where
    Alg: Algebra,
    A: Send + 'static,
    R: Runtime,
{
    type Output = A;
    type Error = Interrupted;
    type Env = Alg::Handle;

    fn run(self, handle: &Alg::Handle) -> impl Future<Output = Result<A, Interrupted>> + Send {
        async move {
            let fiber = self.fiber.fork();
            self.interpreter
                .run_with(&self.program, handle, &fiber)
                .await
                .into_result()
        }
    }
}

/// One interpreter per algebra, all sharing one runtime.
///
/// # Example
///
/// ```
/// use sluice::runtime::Inline;
/// use sluice::Interpreters;
///
/// let interpreters = Interpreters::new(Inline::new());
/// let _copies = interpreters.copy_manager.clone();
/// ```
#[derive(Clone)]
pub struct Interpreters<R> {
    /// Interpreter for connection programs.
    pub connection: Interpreter<PgConnectionAlgebra, R>,
    /// Interpreter for copy-in programs.
    pub copy_in: Interpreter<CopyInAlgebra, R>,
    /// Interpreter for copy-out programs.
    pub copy_out: Interpreter<CopyOutAlgebra, R>,
    /// Interpreter for copy manager programs.
    pub copy_manager: Interpreter<CopyManagerAlgebra, R>,
    /// Interpreter for fast-path programs.
    pub fastpath: Interpreter<FastpathAlgebra, R>,
    /// Interpreter for large-object programs.
    pub large_object: Interpreter<LargeObjectAlgebra, R>,
    /// Interpreter for large-object directory programs.
    pub large_object_manager: Interpreter<LargeObjectManagerAlgebra, R>,
}

impl<R: Runtime> Interpreters<R> {
    /// Build the seven interpreters over `runtime`.
    pub fn new(runtime: R) -> Self {
        let kernel = Kernel::new(runtime);
        Interpreters {
            connection: Interpreter::from_kernel(kernel.clone()),
            copy_in: Interpreter::from_kernel(kernel.clone()),
            copy_out: Interpreter::from_kernel(kernel.clone()),
            copy_manager: Interpreter::from_kernel(kernel.clone()),
            fastpath: Interpreter::from_kernel(kernel.clone()),
            large_object: Interpreter::from_kernel(kernel.clone()),
            large_object_manager: Interpreter::from_kernel(kernel),
        }
    }
}

impl<R: Runtime> fmt::Debug for Interpreters<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreters")
            .field("runtime", self.connection.runtime())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::large_object::{self, LargeObjectHandle, LargeObjectIO};
    use crate::error::Failure;
    use crate::program::SyncHint;
    use crate::runtime::Inline;
    use crate::testing::{Journal, MockLargeObject};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn setup() -> (Interpreter<LargeObjectAlgebra, Inline>, Journal, LargeObjectHandle) {
        let journal = Journal::new();
        let object: LargeObjectHandle = Arc::new(MockLargeObject::new(journal.clone(), 1));
        (Interpreter::new(Inline::new()), journal, object)
    }

    #[tokio::test]
    async fn test_pure_and_map() {
        let (interp, journal, object) = setup();
        let program = LargeObjectIO::pure(20).map(|n| n + 1).map(|n| n * 2);
        assert_eq!(interp.run(&program, &object).await, Outcome::Succeeded(42));
        assert!(journal.entries().is_empty());
    }

    fn count_down(n: u64) -> LargeObjectIO<u64> {
        if n == 0 {
            LargeObjectIO::pure(0)
        } else {
            LargeObjectIO::pure(n).and_then(|n| count_down(n - 1).map(|rest| rest + 1))
        }
    }

    #[tokio::test]
    async fn test_recursive_program_runs_in_constant_stack() {
        let (interp, _, object) = setup();
        let program = count_down(100_000);
        assert_eq!(interp.run(&program, &object).await, Outcome::Succeeded(100_000));
    }

    fn retry(attempts: u64, failure: Failure) -> LargeObjectIO<u64> {
        if attempts == 0 {
            return LargeObjectIO::pure(0);
        }
        LargeObjectIO::raise_error(failure)
            .handle_error_with(move |failure| retry(attempts - 1, failure).map(|n| n + 1))
    }

    #[test]
    fn test_recovery_loop_runs_in_constant_stack() {
        let (interp, _, object) = setup();
        let program = retry(100_000, Failure::msg("lo_open failed"));
        assert_eq!(interp.run_sync(&program, &object), Outcome::Succeeded(100_000));
    }

    fn nest(depth: u64) -> LargeObjectIO<u64> {
        if depth == 0 {
            return large_object::tell().map(|_| 0);
        }
        LargeObjectIO::uncancelable(move |poll| poll.apply(nest(depth - 1)).map(|n| n + 1))
    }

    #[test]
    fn test_nested_regions_run_in_constant_stack() {
        let (interp, journal, object) = setup();
        let fiber = Fiber::new();
        let outcome = futures::executor::block_on(interp.run_with(&nest(100_000), &object, &fiber));
        assert_eq!(outcome, Outcome::Succeeded(100_000));
        assert_eq!(journal.count("large_object.tell"), 1);
        assert!(!fiber.is_masked());
    }

    fn guarded(depth: u64, runs: Arc<AtomicUsize>) -> LargeObjectIO<()> {
        if depth == 0 {
            return LargeObjectIO::canceled();
        }
        let counter = Arc::clone(&runs);
        LargeObjectIO::unit()
            .and_then(move |()| guarded(depth - 1, Arc::clone(&runs)))
            .on_cancel(LargeObjectIO::delay(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
    }

    #[test]
    fn test_nested_finalizers_run_in_constant_stack() {
        let (interp, _, object) = setup();
        let runs = Arc::new(AtomicUsize::new(0));
        let program = guarded(100_000, Arc::clone(&runs));
        assert_eq!(interp.run_sync(&program, &object), Outcome::Canceled);
        assert_eq!(runs.load(Ordering::SeqCst), 100_000);
    }

    fn drain(remaining: u64) -> LargeObjectIO<i64> {
        if remaining == 0 {
            return large_object::tell();
        }
        LargeObjectIO::<()>::raise_error(Failure::msg("lo_write failed"))
            .force_r(large_object::write(b"x".to_vec()))
            .and_then(move |()| drain(remaining - 1))
    }

    #[test]
    fn test_force_r_chain_runs_in_constant_stack() {
        let (interp, _, object) = setup();
        assert_eq!(interp.run_sync(&drain(50_000), &object), Outcome::Succeeded(50_000));
    }

    #[tokio::test]
    async fn test_left_nested_chains() {
        let (interp, _, object) = setup();
        let mut program = LargeObjectIO::pure(0_u64);
        for i in 0..1_000 {
            program = if i % 2 == 0 {
                program.map(|n| n + 1)
            } else {
                program.and_then(|n| LargeObjectIO::pure(n + 1))
            };
        }
        assert_eq!(interp.run(&program, &object).await, Outcome::Succeeded(1_000));
    }

    #[tokio::test]
    async fn test_suspend_blocking_and_inline() {
        let (interp, _, object) = setup();
        let blocking = LargeObjectIO::suspend(SyncHint::Blocking, || Ok(String::from("b")));
        let inline = LargeObjectIO::suspend(SyncHint::Delay, || Ok(String::from("d")));
        assert_eq!(
            interp.run(&blocking, &object).await,
            Outcome::Succeeded("b".to_string())
        );
        assert_eq!(
            interp.run(&inline, &object).await,
            Outcome::Succeeded("d".to_string())
        );
    }

    #[tokio::test]
    async fn test_suspend_failure_is_errored() {
        let (interp, _, object) = setup();
        let failure = Failure::msg("thunk failed");
        let raised = failure.clone();
        let program: LargeObjectIO<()> =
            LargeObjectIO::suspend(SyncHint::InterruptibleOnce, move || Err(raised.clone()));
        assert_eq!(interp.run(&program, &object).await, Outcome::Errored(failure));
    }

    #[tokio::test]
    async fn test_raw_sees_the_handle() {
        let (interp, _, object) = setup();
        let program = LargeObjectIO::raw(|lo: &LargeObjectHandle| lo.oid());
        assert_eq!(interp.run(&program, &object).await, Outcome::Succeeded(1));
    }

    #[tokio::test]
    async fn test_monotonic_is_non_decreasing() {
        let (interp, _, object) = setup();
        let program = LargeObjectIO::monotonic()
            .and_then(|first| LargeObjectIO::monotonic().map(move |second| (first, second)));
        match interp.run(&program, &object).await {
            Outcome::Succeeded((first, second)) => assert!(second >= first),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_realtime_is_wall_clock() {
        let (interp, _, object) = setup();
        match interp.run(&LargeObjectIO::realtime(), &object).await {
            Outcome::Succeeded(now) => assert!(now > Duration::from_secs(1_577_836_800)),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_canceled_stops_the_run() {
        let (interp, journal, object) = setup();
        let program = LargeObjectIO::canceled().then(large_object::tell());
        assert_eq!(interp.run(&program, &object).await, Outcome::Canceled);
        assert!(journal.entries().is_empty());
    }

    #[tokio::test]
    async fn test_precanceled_fiber_runs_nothing() {
        let (interp, journal, object) = setup();
        let fiber = Fiber::new();
        fiber.cancel();
        let outcome = interp.run_with(&large_object::tell(), &object, &fiber).await;
        assert_eq!(outcome, Outcome::Canceled);
        assert!(journal.entries().is_empty());
    }

    #[tokio::test]
    async fn test_pure_program_completes_in_canceled_fiber() {
        let (interp, _, object) = setup();
        let fiber = Fiber::new();
        fiber.cancel();
        let outcome = interp.run_with(&LargeObjectIO::pure(5), &object, &fiber).await;
        assert_eq!(outcome, Outcome::Succeeded(5));
    }

    #[tokio::test]
    async fn test_program_is_replayable() {
        let (interp, journal, object) = setup();
        let evaluations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&evaluations);
        let program = LargeObjectIO::delay(move || counter.fetch_add(1, Ordering::SeqCst))
            .then(large_object::write(b"x".to_vec()));
        assert!(interp.run(&program, &object).await.is_succeeded());
        assert!(interp.run(&program, &object).await.is_succeeded());
        assert_eq!(evaluations.load(Ordering::SeqCst), 2);
        assert_eq!(journal.entries().len(), 2);
    }

    #[test]
    fn test_run_sync_outside_runtime() {
        let (interp, _, object) = setup();
        let program = large_object::write(b"hello".to_vec()).then(large_object::tell());
        assert_eq!(interp.run_sync(&program, &object), Outcome::Succeeded(5));
    }

    #[tokio::test]
    async fn test_compiled_program_is_an_effect() {
        let (interp, _, object) = setup();
        let program = large_object::write(b"abcd".to_vec()).then(large_object::size());
        let effect = interp.compile(program);
        assert_eq!(effect.run(&object).await, Ok(4));
    }

    #[tokio::test]
    async fn test_compiled_program_uses_its_fiber() {
        let (interp, _, object) = setup();
        let effect = interp.compile(large_object::size());
        effect.fiber().cancel();
        assert_eq!(effect.run(&object).await, Err(Interrupted::Canceled));
    }

    #[tokio::test]
    async fn test_canceled_compiled_program_stays_canceled() {
        let (interp, journal, object) = setup();
        let effect = interp.compile(large_object::tell());
        effect.fiber().cancel();

        assert_eq!(effect.clone().run(&object).await, Err(Interrupted::Canceled));
        assert_eq!(effect.clone().run(&object).await, Err(Interrupted::Canceled));
        assert!(journal.entries().is_empty());

        let fresh = effect.with_fiber(Fiber::new());
        assert_eq!(fresh.run(&object).await, Ok(0));
        assert_eq!(journal.count("large_object.tell"), 1);
    }

    #[cfg(feature = "async")]
    #[test]
    fn test_run_sync_on_tokio_runtime_inside_entered_context() {
        let host = tokio::runtime::Runtime::new().unwrap();
        let _entered = host.enter();
        let interp = Interpreter::<LargeObjectAlgebra, _>::new(crate::runtime::TokioRuntime::new());
        let object: LargeObjectHandle = Arc::new(MockLargeObject::new(Journal::new(), 1));
        let program = large_object::write(b"abc".to_vec()).then(large_object::tell());
        assert_eq!(interp.run_sync(&program, &object), Outcome::Succeeded(3));
    }

    #[cfg(feature = "async")]
    #[test]
    #[should_panic]
    fn test_run_sync_on_tokio_runtime_without_context_panics() {
        let interp = Interpreter::<LargeObjectAlgebra, _>::new(crate::runtime::TokioRuntime::new());
        let object: LargeObjectHandle = Arc::new(MockLargeObject::new(Journal::new(), 1));
        let _ = interp.run_sync(&large_object::tell(), &object);
    }

    #[test]
    fn test_interpreter_debug() {
        let (interp, _, _) = setup();
        let debug = format!("{:?}", interp);
        assert!(debug.contains("large_object"));
        assert!(debug.contains("Inline"));
    }

    #[cfg(feature = "tracing")]
    mod traced {
        use super::*;
        use tracing_test::traced_test;

        #[tokio::test]
        #[traced_test]
        async fn test_primitive_calls_are_logged() {
            let (interp, _, object) = setup();
            let program = large_object::write(b"abc".to_vec()).then(large_object::tell());
            assert_eq!(interp.run(&program, &object).await, Outcome::Succeeded(3));
            assert!(logs_contain("primitive call"));
            assert!(logs_contain("program succeeded"));
        }

        #[tokio::test]
        #[traced_test]
        async fn test_recovery_is_logged() {
            let (interp, _, object) = setup();
            let program = LargeObjectIO::<i32>::raise_error(Failure::msg("lo_open failed"))
                .handle_error_with(|_| LargeObjectIO::pure(0));
            assert_eq!(interp.run(&program, &object).await, Outcome::Succeeded(0));
            assert!(logs_contain("recovering from failure: lo_open failed"));
        }

        #[tokio::test]
        #[traced_test]
        async fn test_cancellation_and_finalizer_failure_are_logged() {
            let (interp, _, object) = setup();
            let program = LargeObjectIO::canceled()
                .on_cancel(LargeObjectIO::raise_error(Failure::msg("unlink failed")));
            assert_eq!(interp.run(&program, &object).await, Outcome::Canceled);
            assert!(logs_contain("cancellation observed"));
            assert!(logs_contain("cancellation finalizer failed: unlink failed"));
            assert!(logs_contain("program canceled"));
        }
    }
}
