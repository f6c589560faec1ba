//! Bulk copy-in: feeding rows into an open `COPY ... FROM STDIN`.

use std::sync::Arc;

use super::{value, Algebra, Sealed};
use crate::embedded::Embedded;
use crate::error::Failure;
use crate::program::{AnyValue, Erased, Program};

/// An open copy-in stream.
pub trait CopyIn: Send + Sync {
    /// Send raw copy data.
    fn write_to_copy(&self, bytes: &[u8]) -> Result<(), Failure>;
    /// Flush buffered copy data to the server.
    fn flush_copy(&self) -> Result<(), Failure>;
    /// Finish the copy; returns the number of rows copied.
    fn end_copy(&self) -> Result<i64, Failure>;
    /// Abort the copy.
    fn cancel_copy(&self) -> Result<(), Failure>;
    /// Number of fields in each row.
    fn field_count(&self) -> Result<i32, Failure>;
    /// Format code of one field (0 text, 1 binary).
    fn field_format(&self, field: i32) -> Result<i32, Failure>;
    /// Overall format code (0 text, 1 binary).
    fn format(&self) -> Result<i32, Failure>;
    /// Rows handled so far.
    fn handled_row_count(&self) -> Result<i64, Failure>;
    /// Whether the copy is still in progress.
    fn is_active(&self) -> Result<bool, Failure>;
}

/// Shared handle to a copy-in stream.
pub type CopyInHandle = Arc<dyn CopyIn>;

/// Domain operations on a copy-in stream.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum CopyInOp {
    WriteToCopy(Vec<u8>),
    FlushCopy,
    EndCopy,
    CancelCopy,
    FieldCount,
    FieldFormat(i32),
    Format,
    HandledRowCount,
    IsActive,
}

/// The copy-in algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyInAlgebra;

/// A program against a copy-in stream.
pub type CopyInIO<A> = Program<CopyInAlgebra, A>;

impl Sealed for CopyInAlgebra {}

impl Algebra for CopyInAlgebra {
    const NAME: &'static str = "copy_in";

    type Handle = CopyInHandle;
    type Op = CopyInOp;

    fn invoke(op: &CopyInOp, stream: &CopyInHandle) -> Result<AnyValue, Failure> {
        match op {
            CopyInOp::WriteToCopy(bytes) => value(stream.write_to_copy(bytes)),
            CopyInOp::FlushCopy => value(stream.flush_copy()),
            CopyInOp::EndCopy => value(stream.end_copy()),
            CopyInOp::CancelCopy => value(stream.cancel_copy()),
            CopyInOp::FieldCount => value(stream.field_count()),
            CopyInOp::FieldFormat(field) => value(stream.field_format(*field)),
            CopyInOp::Format => value(stream.format()),
            CopyInOp::HandledRowCount => value(stream.handled_row_count()),
            CopyInOp::IsActive => value(stream.is_active()),
        }
    }

    fn embed(handle: CopyInHandle, program: Erased<Self>) -> Embedded {
        Embedded::CopyIn(handle, program)
    }
}

/// Send raw copy data.
pub fn write_to_copy(bytes: Vec<u8>) -> CopyInIO<()> {
    Program::domain(CopyInOp::WriteToCopy(bytes))
}

/// Flush buffered copy data.
pub fn flush_copy() -> CopyInIO<()> {
    Program::domain(CopyInOp::FlushCopy)
}

/// Finish the copy, yielding the row count.
pub fn end_copy() -> CopyInIO<i64> {
    Program::domain(CopyInOp::EndCopy)
}

/// Abort the copy.
pub fn cancel_copy() -> CopyInIO<()> {
    Program::domain(CopyInOp::CancelCopy)
}

/// Number of fields per row.
pub fn field_count() -> CopyInIO<i32> {
    Program::domain(CopyInOp::FieldCount)
}

/// Format code of one field.
pub fn field_format(field: i32) -> CopyInIO<i32> {
    Program::domain(CopyInOp::FieldFormat(field))
}

/// Overall format code.
pub fn format() -> CopyInIO<i32> {
    Program::domain(CopyInOp::Format)
}

/// Rows handled so far.
pub fn handled_row_count() -> CopyInIO<i64> {
    Program::domain(CopyInOp::HandledRowCount)
}

/// Whether the copy is still in progress.
pub fn is_active() -> CopyInIO<bool> {
    Program::domain(CopyInOp::IsActive)
}
