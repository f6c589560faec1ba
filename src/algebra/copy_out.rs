//! Bulk copy-out: draining rows from an open `COPY ... TO STDOUT`.

use std::sync::Arc;

use super::{value, Algebra, Sealed};
use crate::embedded::Embedded;
use crate::error::Failure;
use crate::program::{AnyValue, Erased, Program};

/// An open copy-out stream.
pub trait CopyOut: Send + Sync {
    /// Read the next row of copy data, or `None` once the copy is complete.
    fn read_from_copy(&self) -> Result<Option<Vec<u8>>, Failure>;
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

/// Shared handle to a copy-out stream.
pub type CopyOutHandle = Arc<dyn CopyOut>;

/// Domain operations on a copy-out stream.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum CopyOutOp {
    ReadFromCopy,
    CancelCopy,
    FieldCount,
    FieldFormat(i32),
    Format,
    HandledRowCount,
    IsActive,
}

/// The copy-out algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOutAlgebra;

/// A program against a copy-out stream.
pub type CopyOutIO<A> = Program<CopyOutAlgebra, A>;

impl Sealed for CopyOutAlgebra {}

impl Algebra for CopyOutAlgebra {
    const NAME: &'static str = "copy_out";

    type Handle = CopyOutHandle;
    type Op = CopyOutOp;

    fn invoke(op: &CopyOutOp, stream: &CopyOutHandle) -> Result<AnyValue, Failure> {
        match op {
            CopyOutOp::ReadFromCopy => value(stream.read_from_copy()),
            CopyOutOp::CancelCopy => value(stream.cancel_copy()),
            CopyOutOp::FieldCount => value(stream.field_count()),
            CopyOutOp::FieldFormat(field) => value(stream.field_format(*field)),
            CopyOutOp::Format => value(stream.format()),
            CopyOutOp::HandledRowCount => value(stream.handled_row_count()),
            CopyOutOp::IsActive => value(stream.is_active()),
        }
    }

    fn embed(handle: CopyOutHandle, program: Erased<Self>) -> Embedded {
        Embedded::CopyOut(handle, program)
    }
}

/// Read the next row, `None` at the end of the copy.
pub fn read_from_copy() -> CopyOutIO<Option<Vec<u8>>> {
    Program::domain(CopyOutOp::ReadFromCopy)
}

/// Abort the copy.
pub fn cancel_copy() -> CopyOutIO<()> {
    Program::domain(CopyOutOp::CancelCopy)
}

/// Number of fields per row.
pub fn field_count() -> CopyOutIO<i32> {
    Program::domain(CopyOutOp::FieldCount)
}

/// Format code of one field.
pub fn field_format(field: i32) -> CopyOutIO<i32> {
    Program::domain(CopyOutOp::FieldFormat(field))
}

/// Overall format code.
pub fn format() -> CopyOutIO<i32> {
    Program::domain(CopyOutOp::Format)
}

/// Rows handled so far.
pub fn handled_row_count() -> CopyOutIO<i64> {
    Program::domain(CopyOutOp::HandledRowCount)
}

/// Whether the copy is still in progress.
pub fn is_active() -> CopyOutIO<bool> {
    Program::domain(CopyOutOp::IsActive)
}

/// Drain every remaining row.
///
/// Built from [`read_from_copy`] alone, one row per step, so a cancellation
/// request is observed between rows. Rows are collected back to front and
/// reversed once at the end; nothing read so far is copied again.
pub fn read_all() -> CopyOutIO<Vec<Vec<u8>>> {
    fn remaining() -> CopyOutIO<Vec<Vec<u8>>> {
        read_from_copy().and_then(|row| match row {
            Some(row) => remaining().map(move |mut rows| {
                rows.push(row.clone());
                rows
            }),
            None => Program::pure(Vec::new()),
        })
    }
    remaining().map(|mut rows| {
        rows.reverse();
        rows
    })
}
