//! Testing utilities: recording mock handles and outcome assertions.
//!
//! Every mock writes each successful call to a shared [`Journal`], so a
//! test can check which primitives ran, in which order, across algebras.
//! A [`Probe`] can also be scripted to fail the next call of a given
//! operation with a chosen [`Failure`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sluice::algebra::large_object::{self, LargeObjectHandle};
//! use sluice::runtime::Inline;
//! use sluice::testing::{Journal, MockLargeObject};
//! use sluice::{assert_errored, Failure, Interpreters};
//!
//! let interpreters = Interpreters::new(Inline::new());
//! let journal = Journal::new();
//! let mock = Arc::new(MockLargeObject::new(journal.clone(), 1));
//! let object: LargeObjectHandle = mock.clone();
//!
//! let fault = Failure::msg("disk full");
//! mock.probe().fail_next("large_object.write", fault.clone());
//!
//! let outcome = interpreters
//!     .large_object
//!     .run_sync(&large_object::write(b"abc".to_vec()), &object);
//! assert_eq!(assert_errored!(outcome), fault);
//! assert!(journal.entries().is_empty());
//! ```

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::algebra::connection::{Notification, PgConnection};
use crate::algebra::copy_in::{CopyIn, CopyInHandle};
use crate::algebra::copy_manager::{CopyManager, CopyManagerHandle};
use crate::algebra::copy_out::{CopyOut, CopyOutHandle};
use crate::algebra::fastpath::{Fastpath, FastpathArg, FastpathHandle};
use crate::algebra::large_object::{LargeObject, LargeObjectHandle, Whence};
use crate::algebra::large_object_manager::{
    AccessMode, LargeObjectManager, LargeObjectManagerHandle,
};
use crate::error::Failure;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One recorded primitive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Qualified operation name, e.g. `large_object.write`.
    pub op: &'static str,
    /// The call's arguments, rendered for comparison.
    pub detail: String,
}

/// Shared, ordered record of primitive calls.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<Entry>>>,
}

impl Journal {
    /// An empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, op: &'static str, detail: impl Into<String>) {
        lock(&self.entries).push(Entry {
            op,
            detail: detail.into(),
        });
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> Vec<Entry> {
        lock(&self.entries).clone()
    }

    /// Operation names, oldest first.
    pub fn ops(&self) -> Vec<&'static str> {
        lock(&self.entries).iter().map(|entry| entry.op).collect()
    }

    /// Details of every call to `op`, oldest first.
    pub fn details(&self, op: &str) -> Vec<String> {
        lock(&self.entries)
            .iter()
            .filter(|entry| entry.op == op)
            .map(|entry| entry.detail.clone())
            .collect()
    }

    /// Number of calls to `op`.
    pub fn count(&self, op: &str) -> usize {
        lock(&self.entries)
            .iter()
            .filter(|entry| entry.op == op)
            .count()
    }

    /// Forget every entry.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

/// Journal access plus scripted one-shot failures, shared by a mock.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    journal: Journal,
    faults: Arc<Mutex<HashMap<&'static str, Failure>>>,
}

impl Probe {
    /// A probe recording into `journal`.
    pub fn new(journal: Journal) -> Self {
        Probe {
            journal,
            faults: Arc::default(),
        }
    }

    /// The journal calls are recorded into.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Make the next call of `op` fail with `failure` instead of running.
    pub fn fail_next(&self, op: &'static str, failure: Failure) {
        lock(&self.faults).insert(op, failure);
    }

    /// Enter a call: fail if scripted, otherwise record it.
    pub fn hit(&self, op: &'static str, detail: impl fmt::Display) -> Result<(), Failure> {
        if let Some(failure) = lock(&self.faults).remove(op) {
            return Err(failure);
        }
        self.journal.record(op, detail.to_string());
        Ok(())
    }
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// In-memory large object with its own read/write position.
#[derive(Debug)]
pub struct MockLargeObject {
    probe: Probe,
    oid: i64,
    data: Arc<Mutex<Vec<u8>>>,
    position: Mutex<i64>,
    closed: AtomicBool,
}

impl MockLargeObject {
    /// An empty object with identifier `oid`.
    pub fn new(journal: Journal, oid: i64) -> Self {
        Self::sharing(Probe::new(journal), oid, Arc::default())
    }

    fn sharing(probe: Probe, oid: i64, data: Arc<Mutex<Vec<u8>>>) -> Self {
        MockLargeObject {
            probe,
            oid,
            data,
            position: Mutex::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// The probe for scripting failures.
    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    /// Current contents of the object.
    pub fn contents(&self) -> Vec<u8> {
        lock(&self.data).clone()
    }

    /// Whether `close` was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn enter(&self, op: &'static str, detail: impl fmt::Display) -> Result<(), Failure> {
        if self.is_closed() {
            return Err(Failure::msg(format!("large object {} is closed", self.oid)));
        }
        self.probe.hit(op, detail)
    }
}

impl LargeObject for MockLargeObject {
    fn oid(&self) -> Result<i64, Failure> {
        self.enter("large_object.oid", "")?;
        Ok(self.oid)
    }

    fn read(&self, len: usize) -> Result<Vec<u8>, Failure> {
        self.enter("large_object.read", len)?;
        let data = lock(&self.data);
        let mut position = lock(&self.position);
        let start = (*position as usize).min(data.len());
        let end = start.saturating_add(len).min(data.len());
        *position = end as i64;
        Ok(data[start..end].to_vec())
    }

    fn write(&self, bytes: &[u8]) -> Result<(), Failure> {
        self.enter("large_object.write", text(bytes))?;
        let mut data = lock(&self.data);
        let mut position = lock(&self.position);
        let start = *position as usize;
        let end = start + bytes.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(bytes);
        *position = end as i64;
        Ok(())
    }

    fn seek(&self, offset: i64, whence: Whence) -> Result<(), Failure> {
        self.enter("large_object.seek", format!("{} {:?}", offset, whence))?;
        let size = lock(&self.data).len() as i64;
        let mut position = lock(&self.position);
        let base = match whence {
            Whence::Set => 0,
            Whence::Current => *position,
            Whence::End => size,
        };
        let target = base + offset;
        if target < 0 {
            return Err(Failure::msg(format!("seek to negative offset {}", target)));
        }
        *position = target;
        Ok(())
    }

    fn tell(&self) -> Result<i64, Failure> {
        self.enter("large_object.tell", "")?;
        Ok(*lock(&self.position))
    }

    fn size(&self) -> Result<i64, Failure> {
        self.enter("large_object.size", "")?;
        Ok(lock(&self.data).len() as i64)
    }

    fn truncate(&self, len: i64) -> Result<(), Failure> {
        self.enter("large_object.truncate", len)?;
        let len = usize::try_from(len)
            .map_err(|_| Failure::msg(format!("invalid truncate length {}", len)))?;
        lock(&self.data).resize(len, 0);
        Ok(())
    }

    fn copy(&self) -> Result<LargeObjectHandle, Failure> {
        self.enter("large_object.copy", "")?;
        Ok(Arc::new(MockLargeObject::sharing(
            self.probe.clone(),
            self.oid,
            Arc::clone(&self.data),
        )))
    }

    fn close(&self) -> Result<(), Failure> {
        self.enter("large_object.close", "")?;
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory large-object directory.
#[derive(Debug)]
pub struct MockLargeObjectManager {
    probe: Probe,
    next_oid: AtomicI64,
    objects: Mutex<HashMap<i64, Arc<Mutex<Vec<u8>>>>>,
}

impl MockLargeObjectManager {
    /// An empty directory; identifiers start at 16384.
    pub fn new(journal: Journal) -> Self {
        MockLargeObjectManager {
            probe: Probe::new(journal),
            next_oid: AtomicI64::new(16384),
            objects: Mutex::default(),
        }
    }

    /// The probe for scripting failures.
    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    /// Whether an object with `oid` exists.
    pub fn exists(&self, oid: i64) -> bool {
        lock(&self.objects).contains_key(&oid)
    }
}

impl LargeObjectManager for MockLargeObjectManager {
    fn create(&self, mode: AccessMode) -> Result<i64, Failure> {
        self.probe.hit("large_object_manager.create", format!("{:?}", mode))?;
        let oid = self.next_oid.fetch_add(1, Ordering::SeqCst);
        lock(&self.objects).insert(oid, Arc::default());
        Ok(oid)
    }

    fn open(&self, oid: i64, mode: AccessMode) -> Result<LargeObjectHandle, Failure> {
        self.probe
            .hit("large_object_manager.open", format!("{} {:?}", oid, mode))?;
        let data = lock(&self.objects)
            .get(&oid)
            .cloned()
            .ok_or_else(|| Failure::msg(format!("large object {} does not exist", oid)))?;
        Ok(Arc::new(MockLargeObject::sharing(self.probe.clone(), oid, data)))
    }

    fn unlink(&self, oid: i64) -> Result<(), Failure> {
        self.probe.hit("large_object_manager.unlink", oid)?;
        lock(&self.objects)
            .remove(&oid)
            .map(|_| ())
            .ok_or_else(|| Failure::msg(format!("large object {} does not exist", oid)))
    }
}

/// Copy-in stream collecting one row per write.
#[derive(Debug)]
pub struct MockCopyIn {
    probe: Probe,
    fields: i32,
    rows: Mutex<Vec<Vec<u8>>>,
    active: AtomicBool,
}

impl MockCopyIn {
    /// An active text-format stream with `fields` columns.
    pub fn new(journal: Journal, fields: i32) -> Self {
        MockCopyIn {
            probe: Probe::new(journal),
            fields,
            rows: Mutex::default(),
            active: AtomicBool::new(true),
        }
    }

    /// The probe for scripting failures.
    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    /// Rows received so far.
    pub fn rows(&self) -> Vec<Vec<u8>> {
        lock(&self.rows).clone()
    }

    fn ensure_active(&self) -> Result<(), Failure> {
        if self.active.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Failure::msg("copy is not active"))
        }
    }
}

impl CopyIn for MockCopyIn {
    fn write_to_copy(&self, bytes: &[u8]) -> Result<(), Failure> {
        self.ensure_active()?;
        self.probe.hit("copy_in.write_to_copy", text(bytes))?;
        lock(&self.rows).push(bytes.to_vec());
        Ok(())
    }

    fn flush_copy(&self) -> Result<(), Failure> {
        self.ensure_active()?;
        self.probe.hit("copy_in.flush_copy", "")
    }

    fn end_copy(&self) -> Result<i64, Failure> {
        self.ensure_active()?;
        self.probe.hit("copy_in.end_copy", "")?;
        self.active.store(false, Ordering::SeqCst);
        Ok(lock(&self.rows).len() as i64)
    }

    fn cancel_copy(&self) -> Result<(), Failure> {
        self.probe.hit("copy_in.cancel_copy", "")?;
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn field_count(&self) -> Result<i32, Failure> {
        self.probe.hit("copy_in.field_count", "")?;
        Ok(self.fields)
    }

    fn field_format(&self, field: i32) -> Result<i32, Failure> {
        self.probe.hit("copy_in.field_format", field)?;
        if field < 0 || field >= self.fields {
            return Err(Failure::msg(format!("no field {}", field)));
        }
        Ok(0)
    }

    fn format(&self) -> Result<i32, Failure> {
        self.probe.hit("copy_in.format", "")?;
        Ok(0)
    }

    fn handled_row_count(&self) -> Result<i64, Failure> {
        self.probe.hit("copy_in.handled_row_count", "")?;
        Ok(lock(&self.rows).len() as i64)
    }

    fn is_active(&self) -> Result<bool, Failure> {
        self.probe.hit("copy_in.is_active", "")?;
        Ok(self.active.load(Ordering::SeqCst))
    }
}

/// Copy-out stream yielding a fixed list of rows.
#[derive(Debug)]
pub struct MockCopyOut {
    probe: Probe,
    fields: i32,
    pending: Mutex<VecDeque<Vec<u8>>>,
    handled: AtomicI64,
    active: AtomicBool,
}

impl MockCopyOut {
    /// An active text-format stream that will yield `rows`.
    pub fn new(journal: Journal, fields: i32, rows: Vec<Vec<u8>>) -> Self {
        MockCopyOut {
            probe: Probe::new(journal),
            fields,
            pending: Mutex::new(rows.into()),
            handled: AtomicI64::new(0),
            active: AtomicBool::new(true),
        }
    }

    /// The probe for scripting failures.
    pub fn probe(&self) -> &Probe {
        &self.probe
    }
}

impl CopyOut for MockCopyOut {
    fn read_from_copy(&self) -> Result<Option<Vec<u8>>, Failure> {
        self.probe.hit("copy_out.read_from_copy", "")?;
        if !self.active.load(Ordering::SeqCst) {
            return Ok(None);
        }
        match lock(&self.pending).pop_front() {
            Some(row) => {
                self.handled.fetch_add(1, Ordering::SeqCst);
                Ok(Some(row))
            }
            None => {
                self.active.store(false, Ordering::SeqCst);
                Ok(None)
            }
        }
    }

    fn cancel_copy(&self) -> Result<(), Failure> {
        self.probe.hit("copy_out.cancel_copy", "")?;
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn field_count(&self) -> Result<i32, Failure> {
        self.probe.hit("copy_out.field_count", "")?;
        Ok(self.fields)
    }

    fn field_format(&self, field: i32) -> Result<i32, Failure> {
        self.probe.hit("copy_out.field_format", field)?;
        if field < 0 || field >= self.fields {
            return Err(Failure::msg(format!("no field {}", field)));
        }
        Ok(0)
    }

    fn format(&self) -> Result<i32, Failure> {
        self.probe.hit("copy_out.format", "")?;
        Ok(0)
    }

    fn handled_row_count(&self) -> Result<i64, Failure> {
        self.probe.hit("copy_out.handled_row_count", "")?;
        Ok(self.handled.load(Ordering::SeqCst))
    }

    fn is_active(&self) -> Result<bool, Failure> {
        self.probe.hit("copy_out.is_active", "")?;
        Ok(self.active.load(Ordering::SeqCst))
    }
}

/// Copy manager handing out mock streams over a fixed table.
#[derive(Debug)]
pub struct MockCopyManager {
    probe: Probe,
    table: Vec<Vec<u8>>,
}

impl MockCopyManager {
    /// A manager whose copy-outs yield the rows of `table`.
    pub fn new(journal: Journal, table: Vec<Vec<u8>>) -> Self {
        MockCopyManager {
            probe: Probe::new(journal),
            table,
        }
    }

    /// The probe for scripting failures.
    pub fn probe(&self) -> &Probe {
        &self.probe
    }
}

impl CopyManager for MockCopyManager {
    fn copy_in(&self, sql: &str) -> Result<CopyInHandle, Failure> {
        self.probe.hit("copy_manager.copy_in", sql)?;
        Ok(Arc::new(MockCopyIn::new(self.probe.journal().clone(), 1)))
    }

    fn copy_out(&self, sql: &str) -> Result<CopyOutHandle, Failure> {
        self.probe.hit("copy_manager.copy_out", sql)?;
        Ok(Arc::new(MockCopyOut::new(
            self.probe.journal().clone(),
            1,
            self.table.clone(),
        )))
    }

    fn copy_in_bytes(&self, sql: &str, data: &[u8]) -> Result<i64, Failure> {
        self.probe.hit("copy_manager.copy_in_bytes", sql)?;
        let rows = data
            .split(|byte| *byte == b'\n')
            .filter(|row| !row.is_empty())
            .count();
        Ok(rows as i64)
    }

    fn copy_out_bytes(&self, sql: &str) -> Result<Vec<u8>, Failure> {
        self.probe.hit("copy_manager.copy_out_bytes", sql)?;
        Ok(self.table.concat())
    }
}

/// Fast-path channel with a registry of function names.
///
/// Calls return the sum of their integer arguments, or the concatenation
/// of their byte and text arguments for the raw-result calls.
#[derive(Debug)]
pub struct MockFastpath {
    probe: Probe,
    functions: Mutex<HashMap<String, i32>>,
}

impl MockFastpath {
    /// A channel with no registered functions.
    pub fn new(journal: Journal) -> Self {
        MockFastpath {
            probe: Probe::new(journal),
            functions: Mutex::default(),
        }
    }

    /// The probe for scripting failures.
    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    fn lookup(&self, name: &str) -> Result<i32, Failure> {
        lock(&self.functions)
            .get(name)
            .copied()
            .ok_or_else(|| Failure::msg(format!("fastpath function {} is unknown", name)))
    }

    fn sum(args: &[FastpathArg]) -> i64 {
        args.iter()
            .map(|arg| match arg {
                FastpathArg::Int(n) => i64::from(*n),
                FastpathArg::Long(n) => *n,
                FastpathArg::Bytes(_) | FastpathArg::Text(_) => 0,
            })
            .sum()
    }

    fn concat(args: &[FastpathArg]) -> Option<Vec<u8>> {
        let bytes: Vec<u8> = args
            .iter()
            .flat_map(|arg| match arg {
                FastpathArg::Bytes(bytes) => bytes.clone(),
                FastpathArg::Text(text) => text.as_bytes().to_vec(),
                FastpathArg::Int(_) | FastpathArg::Long(_) => Vec::new(),
            })
            .collect();
        (!bytes.is_empty()).then_some(bytes)
    }
}

impl Fastpath for MockFastpath {
    fn add_function(&self, name: &str, oid: i32) -> Result<(), Failure> {
        self.probe
            .hit("fastpath.add_function", format!("{} {}", name, oid))?;
        lock(&self.functions).insert(name.to_string(), oid);
        Ok(())
    }

    fn function_id(&self, name: &str) -> Result<i32, Failure> {
        self.probe.hit("fastpath.function_id", name)?;
        self.lookup(name)
    }

    fn fastpath(&self, fnid: i32, args: &[FastpathArg]) -> Result<Option<Vec<u8>>, Failure> {
        self.probe.hit("fastpath.fastpath", fnid)?;
        if !lock(&self.functions).values().any(|id| *id == fnid) {
            return Err(Failure::msg(format!("fastpath function {} is unknown", fnid)));
        }
        Ok(Self::concat(args))
    }

    fn get_integer(&self, name: &str, args: &[FastpathArg]) -> Result<i32, Failure> {
        self.probe.hit("fastpath.get_integer", name)?;
        self.lookup(name)?;
        i32::try_from(Self::sum(args)).map_err(|_| Failure::msg("integer result out of range"))
    }

    fn get_long(&self, name: &str, args: &[FastpathArg]) -> Result<i64, Failure> {
        self.probe.hit("fastpath.get_long", name)?;
        self.lookup(name)?;
        Ok(Self::sum(args))
    }

    fn get_oid(&self, name: &str, args: &[FastpathArg]) -> Result<i64, Failure> {
        self.probe.hit("fastpath.get_oid", name)?;
        self.lookup(name)?;
        Ok(Self::sum(args))
    }

    fn get_data(&self, name: &str, args: &[FastpathArg]) -> Result<Option<Vec<u8>>, Failure> {
        self.probe.hit("fastpath.get_data", name)?;
        self.lookup(name)?;
        Ok(Self::concat(args))
    }
}

/// Connection whose sub-APIs are the other mocks, all sharing one journal.
#[derive(Debug)]
pub struct MockConnection {
    probe: Probe,
    pid: i32,
    copies: Arc<MockCopyManager>,
    fastpath: Arc<MockFastpath>,
    large_objects: Arc<MockLargeObjectManager>,
    notifications: Mutex<Vec<Notification>>,
    parameters: HashMap<String, String>,
    prepare_threshold: AtomicI32,
}

impl MockConnection {
    /// A connection served by backend `pid`.
    pub fn new(journal: Journal, pid: i32) -> Self {
        let parameters = [("server_version", "16.4"), ("client_encoding", "UTF8")]
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        MockConnection {
            probe: Probe::new(journal.clone()),
            pid,
            copies: Arc::new(MockCopyManager::new(journal.clone(), Vec::new())),
            fastpath: Arc::new(MockFastpath::new(journal.clone())),
            large_objects: Arc::new(MockLargeObjectManager::new(journal)),
            notifications: Mutex::default(),
            parameters,
            prepare_threshold: AtomicI32::new(5),
        }
    }

    /// The probe for scripting failures.
    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    /// The mock behind [`PgConnection::large_object_api`].
    pub fn large_objects(&self) -> &Arc<MockLargeObjectManager> {
        &self.large_objects
    }

    /// The mock behind [`PgConnection::fastpath_api`].
    pub fn fastpath(&self) -> &Arc<MockFastpath> {
        &self.fastpath
    }

    /// The mock behind [`PgConnection::copy_api`].
    pub fn copies(&self) -> &Arc<MockCopyManager> {
        &self.copies
    }

    /// Queue a notification for the next [`PgConnection::notifications`] call.
    pub fn notify(&self, channel: &str, payload: &str) {
        lock(&self.notifications).push(Notification {
            channel: channel.to_string(),
            payload: payload.to_string(),
            process_id: self.pid,
        });
    }
}

impl PgConnection for MockConnection {
    fn backend_pid(&self) -> Result<i32, Failure> {
        self.probe.hit("connection.backend_pid", "")?;
        Ok(self.pid)
    }

    fn copy_api(&self) -> Result<CopyManagerHandle, Failure> {
        self.probe.hit("connection.copy_api", "")?;
        Ok(self.copies.clone())
    }

    fn fastpath_api(&self) -> Result<FastpathHandle, Failure> {
        self.probe.hit("connection.fastpath_api", "")?;
        Ok(self.fastpath.clone())
    }

    fn large_object_api(&self) -> Result<LargeObjectManagerHandle, Failure> {
        self.probe.hit("connection.large_object_api", "")?;
        Ok(self.large_objects.clone())
    }

    fn notifications(&self) -> Result<Vec<Notification>, Failure> {
        self.probe.hit("connection.notifications", "")?;
        Ok(std::mem::take(&mut *lock(&self.notifications)))
    }

    fn escape_identifier(&self, identifier: &str) -> Result<String, Failure> {
        self.probe.hit("connection.escape_identifier", identifier)?;
        Ok(format!("\"{}\"", identifier.replace('"', "\"\"")))
    }

    fn escape_literal(&self, literal: &str) -> Result<String, Failure> {
        self.probe.hit("connection.escape_literal", literal)?;
        Ok(format!("'{}'", literal.replace('\'', "''")))
    }

    fn parameter_status(&self, name: &str) -> Result<Option<String>, Failure> {
        self.probe.hit("connection.parameter_status", name)?;
        Ok(self.parameters.get(name).cloned())
    }

    fn prepare_threshold(&self) -> Result<i32, Failure> {
        self.probe.hit("connection.prepare_threshold", "")?;
        Ok(self.prepare_threshold.load(Ordering::SeqCst))
    }

    fn set_prepare_threshold(&self, threshold: i32) -> Result<(), Failure> {
        self.probe.hit("connection.set_prepare_threshold", threshold)?;
        self.prepare_threshold.store(threshold, Ordering::SeqCst);
        Ok(())
    }

    fn cancel_query(&self) -> Result<(), Failure> {
        self.probe.hit("connection.cancel_query", "")
    }
}

/// Assert that a run succeeded, evaluating to its value.
///
/// # Example
///
/// ```rust
/// use sluice::{assert_succeeded, Outcome};
///
/// let value = assert_succeeded!(Outcome::Succeeded(42));
/// assert_eq!(value, 42);
/// ```
#[macro_export]
macro_rules! assert_succeeded {
    ($outcome:expr) => {
        match $outcome {
            $crate::Outcome::Succeeded(value) => value,
            $crate::Outcome::Errored(failure) => {
                panic!("Expected Succeeded, got Errored: {}", failure)
            }
            $crate::Outcome::Canceled => panic!("Expected Succeeded, got Canceled"),
        }
    };
}

/// Assert that a run failed, evaluating to its failure.
///
/// # Example
///
/// ```rust
/// use sluice::{assert_errored, Failure, Outcome};
///
/// let failure = Failure::msg("bad oid");
/// let got = assert_errored!(Outcome::<()>::Errored(failure.clone()));
/// assert_eq!(got, failure);
/// ```
#[macro_export]
macro_rules! assert_errored {
    ($outcome:expr) => {
        match $outcome {
            $crate::Outcome::Errored(failure) => failure,
            $crate::Outcome::Succeeded(_) => panic!("Expected Errored, got Succeeded"),
            $crate::Outcome::Canceled => panic!("Expected Errored, got Canceled"),
        }
    };
}

/// Assert that a run was canceled.
///
/// # Example
///
/// ```rust
/// use sluice::{assert_canceled, Outcome};
///
/// assert_canceled!(Outcome::<i32>::Canceled);
/// ```
#[macro_export]
macro_rules! assert_canceled {
    ($outcome:expr) => {
        match $outcome {
            $crate::Outcome::Canceled => {}
            $crate::Outcome::Succeeded(_) => panic!("Expected Canceled, got Succeeded"),
            $crate::Outcome::Errored(failure) => {
                panic!("Expected Canceled, got Errored: {}", failure)
            }
        }
    };
}
