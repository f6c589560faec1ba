//! Fast-path function calls, bypassing the query protocol.

use std::sync::Arc;

use super::{value, Algebra, Sealed};
use crate::embedded::Embedded;
use crate::error::Failure;
use crate::program::{AnyValue, Erased, Program};

/// An argument to a fast-path call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FastpathArg {
    /// A 4-byte integer.
    Int(i32),
    /// An 8-byte integer.
    Long(i64),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Text, sent as bytes.
    Text(String),
}

/// The fast-path call channel of a connection.
pub trait Fastpath: Send + Sync {
    /// Register a function name with its object identifier.
    fn add_function(&self, name: &str, oid: i32) -> Result<(), Failure>;
    /// Look up the identifier of a registered function.
    fn function_id(&self, name: &str) -> Result<i32, Failure>;
    /// Call a function by identifier, returning its raw result.
    fn fastpath(&self, fnid: i32, args: &[FastpathArg]) -> Result<Option<Vec<u8>>, Failure>;
    /// Call a registered function returning a 4-byte integer.
    fn get_integer(&self, name: &str, args: &[FastpathArg]) -> Result<i32, Failure>;
    /// Call a registered function returning an 8-byte integer.
    fn get_long(&self, name: &str, args: &[FastpathArg]) -> Result<i64, Failure>;
    /// Call a registered function returning an object identifier.
    fn get_oid(&self, name: &str, args: &[FastpathArg]) -> Result<i64, Failure>;
    /// Call a registered function returning raw bytes.
    fn get_data(&self, name: &str, args: &[FastpathArg]) -> Result<Option<Vec<u8>>, Failure>;
}

/// Shared handle to a fast-path channel.
pub type FastpathHandle = Arc<dyn Fastpath>;

/// Domain operations on the fast-path channel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum FastpathOp {
    AddFunction(String, i32),
    FunctionId(String),
    Fastpath(i32, Vec<FastpathArg>),
    GetInteger(String, Vec<FastpathArg>),
    GetLong(String, Vec<FastpathArg>),
    GetOid(String, Vec<FastpathArg>),
    GetData(String, Vec<FastpathArg>),
}

/// The fast-path algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastpathAlgebra;

/// A program against a fast-path channel.
pub type FastpathIO<A> = Program<FastpathAlgebra, A>;

impl Sealed for FastpathAlgebra {}

impl Algebra for FastpathAlgebra {
    const NAME: &'static str = "fastpath";

    type Handle = FastpathHandle;
    type Op = FastpathOp;

    fn invoke(op: &FastpathOp, channel: &FastpathHandle) -> Result<AnyValue, Failure> {
        match op {
            FastpathOp::AddFunction(name, oid) => value(channel.add_function(name, *oid)),
            FastpathOp::FunctionId(name) => value(channel.function_id(name)),
            FastpathOp::Fastpath(fnid, args) => value(channel.fastpath(*fnid, args)),
            FastpathOp::GetInteger(name, args) => value(channel.get_integer(name, args)),
            FastpathOp::GetLong(name, args) => value(channel.get_long(name, args)),
            FastpathOp::GetOid(name, args) => value(channel.get_oid(name, args)),
            FastpathOp::GetData(name, args) => value(channel.get_data(name, args)),
        }
    }

    fn embed(handle: FastpathHandle, program: Erased<Self>) -> Embedded {
        Embedded::Fastpath(handle, program)
    }
}

/// Register a function name.
pub fn add_function(name: impl Into<String>, oid: i32) -> FastpathIO<()> {
    Program::domain(FastpathOp::AddFunction(name.into(), oid))
}

/// Look up a registered function.
pub fn function_id(name: impl Into<String>) -> FastpathIO<i32> {
    Program::domain(FastpathOp::FunctionId(name.into()))
}

/// Call a function by identifier.
pub fn fastpath(fnid: i32, args: Vec<FastpathArg>) -> FastpathIO<Option<Vec<u8>>> {
    Program::domain(FastpathOp::Fastpath(fnid, args))
}

/// Call a registered function returning a 4-byte integer.
pub fn get_integer(name: impl Into<String>, args: Vec<FastpathArg>) -> FastpathIO<i32> {
    Program::domain(FastpathOp::GetInteger(name.into(), args))
}

/// Call a registered function returning an 8-byte integer.
pub fn get_long(name: impl Into<String>, args: Vec<FastpathArg>) -> FastpathIO<i64> {
    Program::domain(FastpathOp::GetLong(name.into(), args))
}

/// Call a registered function returning an object identifier.
pub fn get_oid(name: impl Into<String>, args: Vec<FastpathArg>) -> FastpathIO<i64> {
    Program::domain(FastpathOp::GetOid(name.into(), args))
}

/// Call a registered function returning raw bytes.
pub fn get_data(name: impl Into<String>, args: Vec<FastpathArg>) -> FastpathIO<Option<Vec<u8>>> {
    Program::domain(FastpathOp::GetData(name.into(), args))
}
