//! Integration tests driving every domain operation of the seven algebras
//! through [`Interpreters`] against the in-memory mocks.

use std::sync::Arc;

use sluice::algebra::connection::{self, Notification, PgConnectionHandle, PgConnectionIO};
use sluice::algebra::copy_in::{self, CopyInHandle};
use sluice::algebra::copy_manager::{self, CopyManagerHandle};
use sluice::algebra::copy_out::{self, CopyOutHandle};
use sluice::algebra::fastpath::{self, FastpathArg, FastpathHandle};
use sluice::algebra::large_object::{self, LargeObjectHandle, LargeObjectIO, Whence};
use sluice::algebra::large_object_manager::{self, AccessMode, LargeObjectManagerHandle};
use sluice::runtime::Inline;
use sluice::testing::{
    Journal, MockConnection, MockCopyIn, MockCopyManager, MockCopyOut, MockFastpath,
    MockLargeObject, MockLargeObjectManager,
};
use sluice::{assert_errored, assert_succeeded, Failure, Interpreters, Outcome, Program};

fn interpreters() -> Interpreters<Inline> {
    Interpreters::new(Inline::new())
}

fn rows(lines: &[&str]) -> Vec<Vec<u8>> {
    lines.iter().map(|line| line.as_bytes().to_vec()).collect()
}

// ============================================================================
// Connection
// ============================================================================

#[tokio::test]
async fn connection_reports_session_state() {
    let journal = Journal::new();
    let conn: PgConnectionHandle = Arc::new(MockConnection::new(journal.clone(), 4242));

    let program = connection::backend_pid().and_then(|pid| {
        connection::parameter_status("server_version").and_then(move |version| {
            connection::parameter_status("no_such_setting")
                .map(move |missing| (pid, version.clone(), missing))
        })
    });

    let (pid, version, missing) =
        assert_succeeded!(interpreters().connection.run(&program, &conn).await);

    assert_eq!(pid, 4242);
    assert_eq!(version.as_deref(), Some("16.4"));
    assert_eq!(missing, None);
    assert_eq!(
        journal.details("connection.parameter_status"),
        vec!["server_version", "no_such_setting"]
    );
}

#[tokio::test]
async fn connection_escapes_identifiers_and_literals() {
    let conn: PgConnectionHandle = Arc::new(MockConnection::new(Journal::new(), 1));

    let program = connection::escape_identifier("odd\"name").and_then(|ident| {
        connection::escape_literal("it's").map(move |literal| format!("{} = {}", ident, literal))
    });

    let outcome = interpreters().connection.run(&program, &conn).await;
    assert_eq!(outcome, Outcome::Succeeded("\"odd\"\"name\" = 'it''s'".to_string()));
}

#[tokio::test]
async fn connection_updates_prepare_threshold() {
    let conn: PgConnectionHandle = Arc::new(MockConnection::new(Journal::new(), 1));

    let program = connection::prepare_threshold().and_then(|before| {
        connection::set_prepare_threshold(before * 2)
            .then(connection::prepare_threshold())
            .map(move |after| (before, after))
    });

    let outcome = interpreters().connection.run(&program, &conn).await;
    assert_eq!(outcome, Outcome::Succeeded((5, 10)));
}

#[tokio::test]
async fn connection_drains_notifications() {
    let mock = Arc::new(MockConnection::new(Journal::new(), 99));
    mock.notify("jobs", "42");
    mock.notify("jobs", "");
    let conn: PgConnectionHandle = mock.clone();

    let program = connection::notifications()
        .and_then(|first| connection::notifications().map(move |second| (first.clone(), second)));

    let (first, second) = assert_succeeded!(interpreters().connection.run(&program, &conn).await);

    assert_eq!(
        first,
        vec![
            Notification {
                channel: "jobs".to_string(),
                payload: "42".to_string(),
                process_id: 99,
            },
            Notification {
                channel: "jobs".to_string(),
                payload: String::new(),
                process_id: 99,
            },
        ]
    );
    assert!(second.is_empty());
}

#[tokio::test]
async fn connection_cancel_query_is_a_plain_primitive() {
    let journal = Journal::new();
    let conn: PgConnectionHandle = Arc::new(MockConnection::new(journal.clone(), 1));

    let outcome = interpreters().connection.run(&connection::cancel_query(), &conn).await;

    assert_eq!(outcome, Outcome::Succeeded(()));
    assert_eq!(journal.ops(), vec!["connection.cancel_query"]);
}

#[tokio::test]
async fn connection_sub_apis_are_reachable_by_embedding() {
    let journal = Journal::new();
    let mock = Arc::new(MockConnection::new(journal.clone(), 1));
    let conn: PgConnectionHandle = mock.clone();

    let program = connection::fastpath_api().and_then(|channel| {
        let lookup = fastpath::add_function("lo_tell", 954).then(fastpath::function_id("lo_tell"));
        PgConnectionIO::embed(channel, lookup)
    });

    let outcome = interpreters().connection.run(&program, &conn).await;

    assert_eq!(outcome, Outcome::Succeeded(954));
    assert_eq!(
        journal.ops(),
        vec![
            "connection.fastpath_api",
            "fastpath.add_function",
            "fastpath.function_id",
        ]
    );
}

// ============================================================================
// Copy in
// ============================================================================

#[tokio::test]
async fn copy_in_streams_rows_and_ends() {
    let journal = Journal::new();
    let mock = Arc::new(MockCopyIn::new(journal.clone(), 2));
    let stream: CopyInHandle = mock.clone();

    let program = copy_in::write_to_copy(b"1\talice\n".to_vec())
        .then(copy_in::write_to_copy(b"2\tbob\n".to_vec()))
        .then(copy_in::flush_copy())
        .then(copy_in::handled_row_count())
        .and_then(|handled| copy_in::end_copy().map(move |total| (handled, total)))
        .and_then(|counts| copy_in::is_active().map(move |active| (counts, active)));

    let outcome = interpreters().copy_in.run(&program, &stream).await;

    assert_eq!(outcome, Outcome::Succeeded(((2, 2), false)));
    assert_eq!(mock.rows(), rows(&["1\talice\n", "2\tbob\n"]));
    assert_eq!(journal.count("copy_in.flush_copy"), 1);
}

#[tokio::test]
async fn copy_in_describes_its_format() {
    let stream: CopyInHandle = Arc::new(MockCopyIn::new(Journal::new(), 3));

    let program = copy_in::field_count().and_then(|fields| {
        copy_in::format().and_then(move |format| {
            copy_in::field_format(fields - 1).map(move |last| (fields, format, last))
        })
    });

    let outcome = interpreters().copy_in.run(&program, &stream).await;
    assert_eq!(outcome, Outcome::Succeeded((3, 0, 0)));
}

#[tokio::test]
async fn copy_in_rejects_writes_after_cancel() {
    let stream: CopyInHandle = Arc::new(MockCopyIn::new(Journal::new(), 1));

    let program = copy_in::cancel_copy().then(copy_in::write_to_copy(b"late\n".to_vec()));
    let failure = assert_errored!(interpreters().copy_in.run(&program, &stream).await);

    assert_eq!(failure.to_string(), "copy is not active");
}

// ============================================================================
// Copy out
// ============================================================================

#[tokio::test]
async fn copy_out_read_all_drains_every_row() {
    let journal = Journal::new();
    let table = rows(&["1\n", "2\n", "3\n"]);
    let stream: CopyOutHandle = Arc::new(MockCopyOut::new(journal.clone(), 1, table.clone()));

    let program = copy_out::read_all()
        .and_then(|read| copy_out::handled_row_count().map(move |handled| (read.clone(), handled)));

    let (read, handled) = assert_succeeded!(interpreters().copy_out.run(&program, &stream).await);

    assert_eq!(read, table);
    assert_eq!(handled, 3);
    assert_eq!(journal.count("copy_out.read_from_copy"), 4);
}

#[tokio::test]
async fn copy_out_cancel_ends_the_stream() {
    let stream: CopyOutHandle = Arc::new(MockCopyOut::new(Journal::new(), 2, rows(&["a\tb\n"])));

    let program = copy_out::field_count()
        .and_then(|fields| copy_out::field_format(fields - 1).map(move |last| (fields, last)))
        .and_then(|shape| copy_out::format().map(move |format| (shape, format)))
        .and_then(|described| {
            copy_out::cancel_copy()
                .then(copy_out::is_active())
                .and_then(move |active| {
                    copy_out::read_from_copy().map(move |row| (described, active, row))
                })
        });

    let outcome = interpreters().copy_out.run(&program, &stream).await;
    assert_eq!(outcome, Outcome::Succeeded((((2, 0), 0), false, None)));
}

#[tokio::test]
async fn copy_out_unknown_field_fails() {
    let stream: CopyOutHandle = Arc::new(MockCopyOut::new(Journal::new(), 1, Vec::new()));
    let outcome = interpreters()
        .copy_out
        .run(&copy_out::field_format(7), &stream)
        .await;
    assert!(outcome.is_errored());
}

// ============================================================================
// Copy manager
// ============================================================================

#[tokio::test]
async fn copy_manager_bulk_transfers() {
    let journal = Journal::new();
    let manager: CopyManagerHandle = Arc::new(MockCopyManager::new(
        journal.clone(),
        rows(&["1\tx\n", "2\ty\n"]),
    ));

    let program = copy_manager::copy_in_bytes("COPY t FROM STDIN", b"a\nb\nc\n".to_vec())
        .and_then(|loaded| {
            copy_manager::copy_out_bytes("COPY t TO STDOUT").map(move |dumped| (loaded, dumped))
        });

    let outcome = interpreters().copy_manager.run(&program, &manager).await;

    assert_eq!(outcome, Outcome::Succeeded((3, b"1\tx\n2\ty\n".to_vec())));
    assert_eq!(
        journal.details("copy_manager.copy_in_bytes"),
        vec!["COPY t FROM STDIN"]
    );
}

#[tokio::test]
async fn copy_manager_streams_through_embedded_programs() {
    let journal = Journal::new();
    let manager: CopyManagerHandle =
        Arc::new(MockCopyManager::new(journal.clone(), rows(&["r1\n", "r2\n"])));

    let program = copy_manager::copy_out("COPY t TO STDOUT")
        .and_then(|stream| Program::embed(stream, copy_out::read_all()))
        .and_then(|read| {
            copy_manager::copy_in("COPY u FROM STDIN").and_then(move |sink| {
                let writes = read
                    .iter()
                    .cloned()
                    .map(copy_in::write_to_copy)
                    .fold(copy_in::CopyInIO::unit(), |acc, write| acc.then(write));
                Program::embed(sink, writes.then(copy_in::end_copy()))
            })
        });

    let outcome = interpreters().copy_manager.run(&program, &manager).await;

    assert_eq!(outcome, Outcome::Succeeded(2));
    assert_eq!(journal.details("copy_in.write_to_copy"), vec!["r1\n", "r2\n"]);
}

// ============================================================================
// Fast path
// ============================================================================

#[tokio::test]
async fn fastpath_calls_registered_functions() {
    let channel: FastpathHandle = Arc::new(MockFastpath::new(Journal::new()));

    let args = vec![FastpathArg::Int(40), FastpathArg::Long(2)];
    let program = fastpath::add_function("add", 1)
        .then(fastpath::get_integer("add", args.clone()))
        .and_then(move |int| {
            fastpath::get_long("add", args.clone())
                .and_then(move |long| {
                    fastpath::get_oid("add", vec![]).map(move |oid| (int, long, oid))
                })
        });

    let outcome = interpreters().fastpath.run(&program, &channel).await;
    assert_eq!(outcome, Outcome::Succeeded((42, 42, 0)));
}

#[tokio::test]
async fn fastpath_returns_raw_results() {
    let channel: FastpathHandle = Arc::new(MockFastpath::new(Journal::new()));

    let args = vec![
        FastpathArg::Bytes(b"ab".to_vec()),
        FastpathArg::Text("cd".to_string()),
    ];
    let program = fastpath::add_function("cat", 7)
        .then(fastpath::function_id("cat"))
        .and_then(move |fnid| {
            let args = args.clone();
            fastpath::fastpath(fnid, args.clone()).and_then(move |direct| {
                fastpath::get_data("cat", args.clone()).map(move |named| (direct.clone(), named))
            })
        })
        .and_then(|results| {
            fastpath::get_data("cat", vec![FastpathArg::Int(1)])
                .map(move |empty| (results.clone(), empty))
        });

    let outcome = interpreters().fastpath.run(&program, &channel).await;
    assert_eq!(
        outcome,
        Outcome::Succeeded(((Some(b"abcd".to_vec()), Some(b"abcd".to_vec())), None))
    );
}

#[tokio::test]
async fn fastpath_unknown_function_fails() {
    let channel: FastpathHandle = Arc::new(MockFastpath::new(Journal::new()));
    let failure = assert_errored!(
        interpreters()
            .fastpath
            .run(&fastpath::function_id("lo_open"), &channel)
            .await
    );
    assert_eq!(failure.to_string(), "fastpath function lo_open is unknown");
}

// ============================================================================
// Large objects
// ============================================================================

#[tokio::test]
async fn large_object_reads_back_what_it_wrote() {
    let object: LargeObjectHandle = Arc::new(MockLargeObject::new(Journal::new(), 31));

    let program = large_object::write(b"0123456789".to_vec())
        .then(large_object::seek(-4, Whence::End))
        .then(large_object::read(2))
        .and_then(|middle| {
            large_object::seek(1, Whence::Current)
                .then(large_object::tell())
                .map(move |position| (middle.clone(), position))
        });

    let outcome = interpreters().large_object.run(&program, &object).await;
    assert_eq!(outcome, Outcome::Succeeded((b"67".to_vec(), 9)));
}

#[tokio::test]
async fn large_object_truncate_shrinks() {
    let mock = Arc::new(MockLargeObject::new(Journal::new(), 31));
    let object: LargeObjectHandle = mock.clone();

    let program = large_object::write(b"abcdef".to_vec())
        .then(large_object::truncate(2))
        .then(large_object::size());

    assert_eq!(
        interpreters().large_object.run(&program, &object).await,
        Outcome::Succeeded(2)
    );
    assert_eq!(mock.contents(), b"ab");
}

#[tokio::test]
async fn large_object_copy_shares_data_but_not_position() {
    let object: LargeObjectHandle = Arc::new(MockLargeObject::new(Journal::new(), 8));

    let program = large_object::write(b"shared".to_vec())
        .then(large_object::copy())
        .and_then(|duplicate| {
            let from_start = large_object::tell().and_then(|position| {
                large_object::read(6).map(move |bytes| (position, bytes))
            });
            LargeObjectIO::embed(duplicate, from_start)
        });

    let outcome = interpreters().large_object.run(&program, &object).await;
    assert_eq!(outcome, Outcome::Succeeded((0, b"shared".to_vec())));
}

#[tokio::test]
async fn large_object_rejects_calls_after_close() {
    let mock = Arc::new(MockLargeObject::new(Journal::new(), 12));
    let object: LargeObjectHandle = mock.clone();

    let program = large_object::close().then(large_object::oid());
    let failure = assert_errored!(interpreters().large_object.run(&program, &object).await);

    assert!(mock.is_closed());
    assert_eq!(failure.to_string(), "large object 12 is closed");
}

// ============================================================================
// Large-object manager
// ============================================================================

#[tokio::test]
async fn large_object_manager_lifecycle() {
    let journal = Journal::new();
    let mock = Arc::new(MockLargeObjectManager::new(journal.clone()));
    let manager: LargeObjectManagerHandle = mock.clone();

    let program = large_object_manager::create(AccessMode::ReadWrite).and_then(|oid| {
        large_object_manager::open(oid, AccessMode::Read)
            .and_then(|object| Program::embed(object, large_object::oid()))
            .and_then(|opened| large_object_manager::unlink(opened).map(move |()| opened))
    });

    let oid = assert_succeeded!(interpreters().large_object_manager.run(&program, &manager).await);

    assert_eq!(oid, 16384);
    assert!(!mock.exists(oid));
    assert_eq!(
        journal.ops(),
        vec![
            "large_object_manager.create",
            "large_object_manager.open",
            "large_object.oid",
            "large_object_manager.unlink",
        ]
    );
}

#[tokio::test]
async fn large_object_manager_open_of_missing_object_fails() {
    let manager: LargeObjectManagerHandle = Arc::new(MockLargeObjectManager::new(Journal::new()));
    let outcome = interpreters()
        .large_object_manager
        .run(&large_object_manager::open(1, AccessMode::Read), &manager)
        .await;
    assert_eq!(
        outcome.failure().map(Failure::to_string).as_deref(),
        Some("large object 1 does not exist")
    );
}
