//! Large-object I/O against one open large object.
//!
//! # Example
//!
//! ```
//! use sluice::algebra::large_object::{self, LargeObjectIO, Whence};
//!
//! // Append a record and report the new size.
//! let append: LargeObjectIO<i64> = large_object::seek(0, Whence::End)
//!     .then(large_object::write(b"record\n".to_vec()))
//!     .then(large_object::size());
//! # drop(append);
//! ```

use std::sync::Arc;

use super::{value, Algebra, Sealed};
use crate::embedded::Embedded;
use crate::error::Failure;
use crate::program::{AnyValue, Erased, Program};

/// An open large object.
pub trait LargeObject: Send + Sync {
    /// The object identifier.
    fn oid(&self) -> Result<i64, Failure>;
    /// Read up to `len` bytes from the current position.
    fn read(&self, len: usize) -> Result<Vec<u8>, Failure>;
    /// Write `bytes` at the current position.
    fn write(&self, bytes: &[u8]) -> Result<(), Failure>;
    /// Move the current position.
    fn seek(&self, offset: i64, whence: Whence) -> Result<(), Failure>;
    /// The current position.
    fn tell(&self) -> Result<i64, Failure>;
    /// The size of the object in bytes.
    fn size(&self) -> Result<i64, Failure>;
    /// Truncate the object to `len` bytes.
    fn truncate(&self, len: i64) -> Result<(), Failure>;
    /// Open a second descriptor on the same object.
    fn copy(&self) -> Result<LargeObjectHandle, Failure>;
    /// Close the descriptor.
    fn close(&self) -> Result<(), Failure>;
}

/// Shared handle to an open large object.
pub type LargeObjectHandle = Arc<dyn LargeObject>;

/// Reference point for [`LargeObject::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Whence {
    /// From the start of the object.
    Set,
    /// From the current position.
    Current,
    /// From the end of the object.
    End,
}

/// Domain operations on a large object.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum LargeObjectOp {
    Oid,
    Read(usize),
    Write(Vec<u8>),
    Seek(i64, Whence),
    Tell,
    Size,
    Truncate(i64),
    Copy,
    Close,
}

/// The large-object algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LargeObjectAlgebra;

/// A program against an open large object.
pub type LargeObjectIO<A> = Program<LargeObjectAlgebra, A>;

impl Sealed for LargeObjectAlgebra {}

impl Algebra for LargeObjectAlgebra {
    const NAME: &'static str = "large_object";

    type Handle = LargeObjectHandle;
    type Op = LargeObjectOp;

    fn invoke(op: &LargeObjectOp, lo: &LargeObjectHandle) -> Result<AnyValue, Failure> {
        match op {
            LargeObjectOp::Oid => value(lo.oid()),
            LargeObjectOp::Read(len) => value(lo.read(*len)),
            LargeObjectOp::Write(bytes) => value(lo.write(bytes)),
            LargeObjectOp::Seek(offset, whence) => value(lo.seek(*offset, *whence)),
            LargeObjectOp::Tell => value(lo.tell()),
            LargeObjectOp::Size => value(lo.size()),
            LargeObjectOp::Truncate(len) => value(lo.truncate(*len)),
            LargeObjectOp::Copy => value(lo.copy()),
            LargeObjectOp::Close => value(lo.close()),
        }
    }

    fn embed(handle: LargeObjectHandle, program: Erased<Self>) -> Embedded {
        Embedded::LargeObject(handle, program)
    }
}

/// The object identifier.
pub fn oid() -> LargeObjectIO<i64> {
    Program::domain(LargeObjectOp::Oid)
}

/// Read up to `len` bytes.
pub fn read(len: usize) -> LargeObjectIO<Vec<u8>> {
    Program::domain(LargeObjectOp::Read(len))
}

/// Write bytes at the current position.
pub fn write(bytes: Vec<u8>) -> LargeObjectIO<()> {
    Program::domain(LargeObjectOp::Write(bytes))
}

/// Move the current position.
pub fn seek(offset: i64, whence: Whence) -> LargeObjectIO<()> {
    Program::domain(LargeObjectOp::Seek(offset, whence))
}

/// The current position.
pub fn tell() -> LargeObjectIO<i64> {
    Program::domain(LargeObjectOp::Tell)
}

/// The object size.
pub fn size() -> LargeObjectIO<i64> {
    Program::domain(LargeObjectOp::Size)
}

/// Truncate to `len` bytes.
pub fn truncate(len: i64) -> LargeObjectIO<()> {
    Program::domain(LargeObjectOp::Truncate(len))
}

/// Open a second descriptor on the same object.
pub fn copy() -> LargeObjectIO<LargeObjectHandle> {
    Program::domain(LargeObjectOp::Copy)
}

/// Close the descriptor.
pub fn close() -> LargeObjectIO<()> {
    Program::domain(LargeObjectOp::Close)
}
