//! Outcome classification against a live socket.

use std::path::Path;
use std::time::Duration;

use confine_context::context::client::DaemonClient;
use confine_context::context::{
    Absence, ContextError, ContextSource, FetchOutcome, DEFAULT_MAX_CONTEXT_BYTES,
};
use confine_context::instance::InstanceName;

use crate::fake_daemon::{stale_socket, FakeDaemon, Script};

fn client(path: &Path) -> DaemonClient {
    DaemonClient::new(path, Duration::from_secs(2), DEFAULT_MAX_CONTEXT_BYTES)
}

fn instance() -> InstanceName {
    InstanceName::parse("myapp_default").expect("valid instance name")
}

#[test]
fn missing_socket_is_not_available() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let outcome = client(&dir.path().join("absent.socket")).fetch(&instance());
    assert!(matches!(
        outcome,
        FetchOutcome::NotAvailable(Absence::SocketMissing)
    ));
}

#[test]
fn missing_parent_directory_is_not_available() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("no-such-dir").join("context.socket");
    assert!(client(&path).fetch(&instance()).is_not_available());
}

#[test]
fn file_in_place_of_directory_is_not_available() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let run = dir.path().join("run");
    std::fs::write(&run, b"").expect("should create file");

    let outcome = client(&run.join("context.socket")).fetch(&instance());
    assert!(matches!(
        outcome,
        FetchOutcome::NotAvailable(Absence::SocketMissing)
    ));
}

#[test]
fn socket_without_listener_is_not_available() {
    let (_dir, path) = stale_socket();
    let outcome = client(&path).fetch(&instance());
    assert!(matches!(
        outcome,
        FetchOutcome::NotAvailable(Absence::ConnectionRefused)
    ));
}

#[test]
fn sends_instance_name_in_request() {
    let daemon = FakeDaemon::reply_context("abc");
    let outcome = client(daemon.path()).fetch(&instance());
    assert!(matches!(outcome, FetchOutcome::Context(_)));

    let request = daemon.request();
    assert_eq!(
        request,
        b"{\"op\":\"get-context\",\"instance\":\"myapp_default\"}\n".to_vec()
    );
}

#[test]
fn returns_payload_unchanged() {
    let payload = "user.id=1000;home=/home/u";
    let daemon = FakeDaemon::reply_context(payload);
    match client(daemon.path()).fetch(&instance()) {
        FetchOutcome::Context(context) => assert_eq!(context.as_str(), payload),
        other => panic!("expected context, got {other:?}"),
    }
}

#[test]
fn empty_payload_is_a_context() {
    let daemon = FakeDaemon::reply_context("");
    match client(daemon.path()).fetch(&instance()) {
        FetchOutcome::Context(context) => assert!(context.is_empty()),
        other => panic!("expected empty context, got {other:?}"),
    }
}

#[test]
fn escaped_and_unicode_payload_survives() {
    let payload = "a=\"quoted\"\tb=\\ ü=✓";
    let daemon = FakeDaemon::reply_context(payload);
    match client(daemon.path()).fetch(&instance()) {
        FetchOutcome::Context(context) => assert_eq!(context.into_string(), payload),
        other => panic!("expected context, got {other:?}"),
    }
}

#[test]
fn not_found_is_not_available() {
    let daemon = FakeDaemon::reply_json(r#"{"status":"not-found"}"#);
    let outcome = client(daemon.path()).fetch(&instance());
    assert!(matches!(outcome, FetchOutcome::NotAvailable(Absence::NoRecord)));
}

#[test]
fn daemon_error_is_hard_failure() {
    let daemon = FakeDaemon::reply_json(r#"{"status":"error","message":"state locked"}"#);
    match client(daemon.path()).fetch(&instance()) {
        FetchOutcome::Error(ContextError::Daemon(message)) => assert_eq!(message, "state locked"),
        other => panic!("expected daemon error, got {other:?}"),
    }
}

#[test]
fn garbage_is_malformed() {
    let daemon = FakeDaemon::start(Script::Reply(b"HTTP/1.1 400 Bad Request\n".to_vec()));
    let outcome = client(daemon.path()).fetch(&instance());
    assert!(matches!(
        outcome,
        FetchOutcome::Error(ContextError::Malformed(_))
    ));
}

#[test]
fn missing_delimiter_is_truncated() {
    let daemon = FakeDaemon::start(Script::Reply(br#"{"status":"ok","context":"abc"}"#.to_vec()));
    let outcome = client(daemon.path()).fetch(&instance());
    assert!(matches!(
        outcome,
        FetchOutcome::Error(ContextError::Truncated { received: 31 })
    ));
}

#[test]
fn closed_without_reply_is_truncated() {
    let daemon = FakeDaemon::start(Script::Close);
    let outcome = client(daemon.path()).fetch(&instance());
    assert!(matches!(
        outcome,
        FetchOutcome::Error(ContextError::Truncated { received: 0 })
    ));
}

#[test]
fn hard_failures_carry_context_domain() {
    let daemon = FakeDaemon::start(Script::Close);
    match client(daemon.path()).fetch(&instance()) {
        FetchOutcome::Error(err) => assert_eq!(err.domain(), "context"),
        other => panic!("expected error, got {other:?}"),
    }
}

#[test]
fn bytes_after_delimiter_are_ignored() {
    let daemon = FakeDaemon::start(Script::Reply(
        b"{\"status\":\"ok\",\"context\":\"abc\"}\ntrailing junk".to_vec(),
    ));
    match client(daemon.path()).fetch(&instance()) {
        FetchOutcome::Context(context) => assert_eq!(context.as_str(), "abc"),
        other => panic!("expected context, got {other:?}"),
    }
}
