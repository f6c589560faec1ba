//! Connection-level operations, including access to the connection's
//! copy, fast-path and large-object sub-APIs.
//!
//! The sub-API handles returned here are usually embedded straight away:
//!
//! ```
//! use sluice::algebra::{connection, large_object_manager};
//! use sluice::algebra::connection::PgConnectionIO;
//! use sluice::algebra::large_object_manager::AccessMode;
//! use sluice::Program;
//!
//! let create: PgConnectionIO<i64> = connection::large_object_api().and_then(|lom| {
//!     Program::embed(lom, large_object_manager::create(AccessMode::ReadWrite))
//! });
//! # drop(create);
//! ```

use std::sync::Arc;

use super::copy_manager::CopyManagerHandle;
use super::fastpath::FastpathHandle;
use super::large_object_manager::LargeObjectManagerHandle;
use super::{value, Algebra, Sealed};
use crate::embedded::Embedded;
use crate::error::Failure;
use crate::program::{AnyValue, Erased, Program};

/// An asynchronous notification received on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// The channel name.
    pub channel: String,
    /// The payload, empty when none was sent.
    pub payload: String,
    /// Process id of the notifying backend.
    pub process_id: i32,
}

/// A live database connection.
pub trait PgConnection: Send + Sync {
    /// Process id of the backend serving this connection.
    fn backend_pid(&self) -> Result<i32, Failure>;
    /// The connection's copy manager.
    fn copy_api(&self) -> Result<CopyManagerHandle, Failure>;
    /// The connection's fast-path channel.
    fn fastpath_api(&self) -> Result<FastpathHandle, Failure>;
    /// The connection's large-object directory.
    fn large_object_api(&self) -> Result<LargeObjectManagerHandle, Failure>;
    /// Drain pending asynchronous notifications.
    fn notifications(&self) -> Result<Vec<Notification>, Failure>;
    /// Quote an identifier for inclusion in SQL.
    fn escape_identifier(&self, identifier: &str) -> Result<String, Failure>;
    /// Quote a literal for inclusion in SQL.
    fn escape_literal(&self, literal: &str) -> Result<String, Failure>;
    /// A server parameter reported at startup, if known.
    fn parameter_status(&self, name: &str) -> Result<Option<String>, Failure>;
    /// Executions before a statement is prepared server side.
    fn prepare_threshold(&self) -> Result<i32, Failure>;
    /// Change the prepare threshold.
    fn set_prepare_threshold(&self, threshold: i32) -> Result<(), Failure>;
    /// Ask the server to cancel the statement currently executing.
    fn cancel_query(&self) -> Result<(), Failure>;
}

/// Shared handle to a connection.
pub type PgConnectionHandle = Arc<dyn PgConnection>;

/// Domain operations on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PgConnectionOp {
    BackendPid,
    CopyApi,
    FastpathApi,
    LargeObjectApi,
    Notifications,
    EscapeIdentifier(String),
    EscapeLiteral(String),
    ParameterStatus(String),
    PrepareThreshold,
    SetPrepareThreshold(i32),
    CancelQuery,
}

/// The connection algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PgConnectionAlgebra;

/// A program against a connection.
pub type PgConnectionIO<A> = Program<PgConnectionAlgebra, A>;

impl Sealed for PgConnectionAlgebra {}

impl Algebra for PgConnectionAlgebra {
    const NAME: &'static str = "connection";

    type Handle = PgConnectionHandle;
    type Op = PgConnectionOp;

    fn invoke(op: &PgConnectionOp, conn: &PgConnectionHandle) -> Result<AnyValue, Failure> {
        match op {
            PgConnectionOp::BackendPid => value(conn.backend_pid()),
            PgConnectionOp::CopyApi => value(conn.copy_api()),
            PgConnectionOp::FastpathApi => value(conn.fastpath_api()),
            PgConnectionOp::LargeObjectApi => value(conn.large_object_api()),
            PgConnectionOp::Notifications => value(conn.notifications()),
            PgConnectionOp::EscapeIdentifier(identifier) => {
                value(conn.escape_identifier(identifier))
            }
            PgConnectionOp::EscapeLiteral(literal) => value(conn.escape_literal(literal)),
            PgConnectionOp::ParameterStatus(name) => value(conn.parameter_status(name)),
            PgConnectionOp::PrepareThreshold => value(conn.prepare_threshold()),
            PgConnectionOp::SetPrepareThreshold(threshold) => {
                value(conn.set_prepare_threshold(*threshold))
            }
            PgConnectionOp::CancelQuery => value(conn.cancel_query()),
        }
    }

    fn embed(handle: PgConnectionHandle, program: Erased<Self>) -> Embedded {
        Embedded::PgConnection(handle, program)
    }
}

/// Process id of the serving backend.
pub fn backend_pid() -> PgConnectionIO<i32> {
    Program::domain(PgConnectionOp::BackendPid)
}

/// The connection's copy manager.
pub fn copy_api() -> PgConnectionIO<CopyManagerHandle> {
    Program::domain(PgConnectionOp::CopyApi)
}

/// The connection's fast-path channel.
pub fn fastpath_api() -> PgConnectionIO<FastpathHandle> {
    Program::domain(PgConnectionOp::FastpathApi)
}

/// The connection's large-object directory.
pub fn large_object_api() -> PgConnectionIO<LargeObjectManagerHandle> {
    Program::domain(PgConnectionOp::LargeObjectApi)
}

/// Drain pending notifications.
pub fn notifications() -> PgConnectionIO<Vec<Notification>> {
    Program::domain(PgConnectionOp::Notifications)
}

/// Quote an identifier.
pub fn escape_identifier(identifier: impl Into<String>) -> PgConnectionIO<String> {
    Program::domain(PgConnectionOp::EscapeIdentifier(identifier.into()))
}

/// Quote a literal.
pub fn escape_literal(literal: impl Into<String>) -> PgConnectionIO<String> {
    Program::domain(PgConnectionOp::EscapeLiteral(literal.into()))
}

/// A server parameter reported at startup.
pub fn parameter_status(name: impl Into<String>) -> PgConnectionIO<Option<String>> {
    Program::domain(PgConnectionOp::ParameterStatus(name.into()))
}

/// The current prepare threshold.
pub fn prepare_threshold() -> PgConnectionIO<i32> {
    Program::domain(PgConnectionOp::PrepareThreshold)
}

/// Change the prepare threshold.
pub fn set_prepare_threshold(threshold: i32) -> PgConnectionIO<()> {
    Program::domain(PgConnectionOp::SetPrepareThreshold(threshold))
}

/// Cancel the statement currently executing.
pub fn cancel_query() -> PgConnectionIO<()> {
    Program::domain(PgConnectionOp::CancelQuery)
}
