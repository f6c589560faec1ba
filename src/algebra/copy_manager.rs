//! The bulk copy orchestrator: starts copy streams and runs whole copies.

use std::sync::Arc;

use super::copy_in::CopyInHandle;
use super::copy_out::CopyOutHandle;
use super::{value, Algebra, Sealed};
use crate::embedded::Embedded;
use crate::error::Failure;
use crate::program::{AnyValue, Erased, Program};

/// Entry point for `COPY` operations on a connection.
pub trait CopyManager: Send + Sync {
    /// Start `COPY ... FROM STDIN` and return the open stream.
    fn copy_in(&self, sql: &str) -> Result<CopyInHandle, Failure>;
    /// Start `COPY ... TO STDOUT` and return the open stream.
    fn copy_out(&self, sql: &str) -> Result<CopyOutHandle, Failure>;
    /// Run a whole copy-in from a buffer; returns the row count.
    fn copy_in_bytes(&self, sql: &str, data: &[u8]) -> Result<i64, Failure>;
    /// Run a whole copy-out into a buffer.
    fn copy_out_bytes(&self, sql: &str) -> Result<Vec<u8>, Failure>;
}

/// Shared handle to a copy manager.
pub type CopyManagerHandle = Arc<dyn CopyManager>;

/// Domain operations on the copy manager.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum CopyManagerOp {
    CopyIn(String),
    CopyOut(String),
    CopyInBytes(String, Vec<u8>),
    CopyOutBytes(String),
}

/// The copy manager algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyManagerAlgebra;

/// A program against a copy manager.
pub type CopyManagerIO<A> = Program<CopyManagerAlgebra, A>;

impl Sealed for CopyManagerAlgebra {}

impl Algebra for CopyManagerAlgebra {
    const NAME: &'static str = "copy_manager";

    type Handle = CopyManagerHandle;
    type Op = CopyManagerOp;

    fn invoke(op: &CopyManagerOp, manager: &CopyManagerHandle) -> Result<AnyValue, Failure> {
        match op {
            CopyManagerOp::CopyIn(sql) => value(manager.copy_in(sql)),
            CopyManagerOp::CopyOut(sql) => value(manager.copy_out(sql)),
            CopyManagerOp::CopyInBytes(sql, data) => value(manager.copy_in_bytes(sql, data)),
            CopyManagerOp::CopyOutBytes(sql) => value(manager.copy_out_bytes(sql)),
        }
    }

    fn embed(handle: CopyManagerHandle, program: Erased<Self>) -> Embedded {
        Embedded::CopyManager(handle, program)
    }
}

/// Start `COPY ... FROM STDIN`.
pub fn copy_in(sql: impl Into<String>) -> CopyManagerIO<CopyInHandle> {
    Program::domain(CopyManagerOp::CopyIn(sql.into()))
}

/// Start `COPY ... TO STDOUT`.
pub fn copy_out(sql: impl Into<String>) -> CopyManagerIO<CopyOutHandle> {
    Program::domain(CopyManagerOp::CopyOut(sql.into()))
}

/// Run a whole copy-in from a buffer.
pub fn copy_in_bytes(sql: impl Into<String>, data: Vec<u8>) -> CopyManagerIO<i64> {
    Program::domain(CopyManagerOp::CopyInBytes(sql.into(), data))
}

/// Run a whole copy-out into a buffer.
pub fn copy_out_bytes(sql: impl Into<String>) -> CopyManagerIO<Vec<u8>> {
    Program::domain(CopyManagerOp::CopyOutBytes(sql.into()))
}
