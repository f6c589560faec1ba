//! Large-object directory management: create, open and unlink objects.

use std::sync::Arc;

use super::large_object::LargeObjectHandle;
use super::{value, Algebra, Sealed};
use crate::embedded::Embedded;
use crate::error::Failure;
use crate::program::{AnyValue, Erased, Program};

/// The large-object directory of a connection.
pub trait LargeObjectManager: Send + Sync {
    /// Create an empty large object and return its identifier.
    fn create(&self, mode: AccessMode) -> Result<i64, Failure>;
    /// Open an existing large object.
    fn open(&self, oid: i64, mode: AccessMode) -> Result<LargeObjectHandle, Failure>;
    /// Delete a large object.
    fn unlink(&self, oid: i64) -> Result<(), Failure>;
}

/// Shared handle to a large-object directory.
pub type LargeObjectManagerHandle = Arc<dyn LargeObjectManager>;

/// Access mode requested when creating or opening a large object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessMode {
    /// Read only.
    Read,
    /// Write only.
    Write,
    /// Read and write.
    #[default]
    ReadWrite,
}

/// Domain operations on the large-object directory.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum LargeObjectManagerOp {
    Create(AccessMode),
    Open(i64, AccessMode),
    Unlink(i64),
}

/// The large-object directory algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LargeObjectManagerAlgebra;

/// A program against a large-object directory.
pub type LargeObjectManagerIO<A> = Program<LargeObjectManagerAlgebra, A>;

impl Sealed for LargeObjectManagerAlgebra {}

impl Algebra for LargeObjectManagerAlgebra {
    const NAME: &'static str = "large_object_manager";

    type Handle = LargeObjectManagerHandle;
    type Op = LargeObjectManagerOp;

    fn invoke(
        op: &LargeObjectManagerOp,
        manager: &LargeObjectManagerHandle,
    ) -> Result<AnyValue, Failure> {
        match op {
            LargeObjectManagerOp::Create(mode) => value(manager.create(*mode)),
            LargeObjectManagerOp::Open(oid, mode) => value(manager.open(*oid, *mode)),
            LargeObjectManagerOp::Unlink(oid) => value(manager.unlink(*oid)),
        }
    }

    fn embed(handle: LargeObjectManagerHandle, program: Erased<Self>) -> Embedded {
        Embedded::LargeObjectManager(handle, program)
    }
}

/// Create an empty large object.
pub fn create(mode: AccessMode) -> LargeObjectManagerIO<i64> {
    Program::domain(LargeObjectManagerOp::Create(mode))
}

/// Open an existing large object.
pub fn open(oid: i64, mode: AccessMode) -> LargeObjectManagerIO<LargeObjectHandle> {
    Program::domain(LargeObjectManagerOp::Open(oid, mode))
}

/// Delete a large object.
pub fn unlink(oid: i64) -> LargeObjectManagerIO<()> {
    Program::domain(LargeObjectManagerOp::Unlink(oid))
}
