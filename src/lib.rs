//! # Sluice
//!
//! Cancellation-aware interpreters for PostgreSQL driver operation algebras.
//!
//! Driver work is described as [`Program`]s over seven small algebras: a
//! connection, copy-in and copy-out streams, the copy manager, the
//! fast-path channel, one large object and the large-object directory.
//! Programs are plain values. An [`Interpreter`] folds a program against a
//! caller-owned handle, running every driver call in the host runtime's
//! blocking mode and reporting one of three [`Outcome`]s: a value, a
//! captured [`Failure`], or cancellation.
//!
//! ## Quick Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sluice::algebra::connection::{self, PgConnectionHandle};
//! use sluice::algebra::large_object;
//! use sluice::algebra::large_object_manager::{self, AccessMode};
//! use sluice::runtime::Inline;
//! use sluice::testing::{Journal, MockConnection};
//! use sluice::{Interpreters, Outcome, Program};
//!
//! let interpreters = Interpreters::new(Inline::new());
//! let conn: PgConnectionHandle = Arc::new(MockConnection::new(Journal::new(), 4242));
//!
//! // Create a large object, write to it, and report its size.
//! let program = connection::large_object_api().and_then(|lom| {
//!     let store = large_object_manager::create(AccessMode::ReadWrite).and_then(|oid| {
//!         large_object_manager::open(oid, AccessMode::Write).and_then(|object| {
//!             Program::embed(
//!                 object,
//!                 large_object::write(b"payload".to_vec()).then(large_object::size()),
//!             )
//!         })
//!     });
//!     Program::embed(lom, store)
//! });
//!
//! let outcome = interpreters.connection.run_sync(&program, &conn);
//! assert_eq!(outcome, Outcome::Succeeded(7));
//! ```
//!
//! ## Cancellation
//!
//! Each run has a [`Fiber`](runtime::Fiber). Cancelling it is cooperative:
//! the run stops at its next operation unless it is inside an
//! [`uncancelable`](Program::uncancelable) region, where it stops only at a
//! [`poll`](program::Poll::apply) point or when the region ends. Finalizers
//! attached with [`on_cancel`](Program::on_cancel) run exactly once when a
//! run is cancelled.
//!
//! ## Features
//!
//! - `async`: [`TokioRuntime`](runtime::TokioRuntime), running driver calls
//!   on tokio's blocking pool.
//! - `tracing`: spans per run and per embedded program, and events for
//!   primitive calls, recoveries and cancellation.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod algebra;
pub mod effect;
pub mod embedded;
pub mod error;
pub mod interpreter;
mod kernel;
mod primitive;
pub mod program;
pub mod runtime;
pub mod testing;

// Re-exports
pub use algebra::Algebra;
pub use effect::{Effect, EffectExt};
pub use embedded::Embedded;
pub use error::{Failure, Interrupted, Outcome};
pub use interpreter::{Interpreter, Interpreters, Kleisli};
pub use program::{Poll, Program, SyncHint};
pub use runtime::{Fiber, Inline, Runtime};

#[cfg(feature = "async")]
pub use runtime::TokioRuntime;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algebra::connection::PgConnectionIO;
    pub use crate::algebra::copy_in::CopyInIO;
    pub use crate::algebra::copy_manager::CopyManagerIO;
    pub use crate::algebra::copy_out::CopyOutIO;
    pub use crate::algebra::fastpath::FastpathIO;
    pub use crate::algebra::large_object::LargeObjectIO;
    pub use crate::algebra::large_object_manager::LargeObjectManagerIO;
    pub use crate::effect::{Effect, EffectExt};
    pub use crate::error::{Failure, Interrupted, Outcome};
    pub use crate::interpreter::{Interpreter, Interpreters};
    pub use crate::program::{Poll, Program, SyncHint};
    pub use crate::runtime::{Fiber, Inline, Runtime};
}
