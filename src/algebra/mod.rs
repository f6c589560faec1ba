//! The seven operation algebras and their bindings to handle traits.
//!
//! Each algebra module provides:
//!
//! - the handle trait the caller implements (the driver boundary),
//! - an `*Op` enum with one variant per domain operation,
//! - a marker type implementing [`Algebra`], which maps each operation onto a
//!   handle-trait call and builds the algebra's [`Embedded`] variant,
//! - an `*IO<A>` program alias and one constructor function per operation.
//!
//! | Module | Handle | Domain |
//! |---|---|---|
//! | [`connection`] | [`PgConnection`](connection::PgConnection) | a live database connection |
//! | [`copy_in`] | [`CopyIn`](copy_in::CopyIn) | an open `COPY ... FROM STDIN` stream |
//! | [`copy_out`] | [`CopyOut`](copy_out::CopyOut) | an open `COPY ... TO STDOUT` stream |
//! | [`copy_manager`] | [`CopyManager`](copy_manager::CopyManager) | the bulk copy orchestrator |
//! | [`fastpath`] | [`Fastpath`](fastpath::Fastpath) | the fast-path function call channel |
//! | [`large_object`] | [`LargeObject`](large_object::LargeObject) | one open large object |
//! | [`large_object_manager`] | [`LargeObjectManager`](large_object_manager::LargeObjectManager) | the large-object directory |

use std::fmt;

use crate::embedded::Embedded;
use crate::error::Failure;
use crate::program::{AnyValue, Erased};

pub mod connection;
pub mod copy_in;
pub mod copy_manager;
pub mod copy_out;
pub mod fastpath;
pub mod large_object;
pub mod large_object_manager;

pub use connection::PgConnectionAlgebra;
pub use copy_in::CopyInAlgebra;
pub use copy_manager::CopyManagerAlgebra;
pub use copy_out::CopyOutAlgebra;
pub use fastpath::FastpathAlgebra;
pub use large_object::LargeObjectAlgebra;
pub use large_object_manager::LargeObjectManagerAlgebra;

mod sealed {
    pub trait Sealed {}
}

pub(crate) use sealed::Sealed;

/// Binding between an operation algebra and its resource handle.
///
/// The set of algebras is closed: every algebra has a variant in
/// [`Embedded`], so this trait is sealed.
pub trait Algebra: Sealed + Sized + Send + Sync + 'static {
    /// Short name used in diagnostics and tracing spans.
    const NAME: &'static str;

    /// The caller-owned resource handle programs of this algebra run against.
    type Handle: Clone + Send + Sync + 'static;

    /// Domain operations of this algebra.
    type Op: fmt::Debug + Send + Sync + 'static;

    /// Perform one domain operation against the handle.
    fn invoke(op: &Self::Op, handle: &Self::Handle) -> Result<AnyValue, Failure>;

    /// Pair a handle with an erased program of this algebra.
    fn embed(handle: Self::Handle, program: Erased<Self>) -> Embedded;
}

/// Box the value of a handle call.
pub(crate) fn value<T: Send + 'static>(result: Result<T, Failure>) -> Result<AnyValue, Failure> {
    result.map(|value| Box::new(value) as AnyValue)
}
