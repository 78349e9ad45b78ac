//! Auth gate: login, expiry, credential rejection and attach routing

mod common;

use std::time::Duration;

use common::{Harness, Op, SharedStore, NOW};
use htd_client::{run_until_logout, AttachOutcome, Event, SocketEvent, SocketEventKind};
use htd_core::error::{AuthError, ConnectionError, DirectoryError, HtdError, LoginError};
use htd_core::{ConnectionId, ConnectionState, Credential, MachineId};

async fn tick(h: &mut Harness, secs: u64) {
    h.clock.advance(secs as i64);
    tokio::time::advance(Duration::from_secs(secs)).await;
    h.settle().await;
}

#[tokio::test(start_paused = true)]
async fn test_login_stores_credential_and_starts_countdown() {
    let mut h = Harness::new();

    h.login_ok("abc", NOW + 1800).await;

    assert!(h.gate.is_logged_in());
    assert_eq!(h.store.get_entry("token").as_deref(), Some("abc"));
    assert_eq!(
        h.store.get_entry("expires"),
        Some((NOW + 1800).to_string())
    );
    assert!(h.gate.clock_state().ticking);
    assert_eq!(h.gate.countdown().as_deref(), Some("30:00"));

    tick(&mut h, 1).await;
    assert_eq!(h.gate.countdown().as_deref(), Some("29:59"));
}

#[tokio::test(start_paused = true)]
async fn test_login_publishes_machines() {
    let mut h = Harness::new();

    h.login_ok("abc", NOW + 1800).await;

    let names: Vec<_> = h.gate.machines().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert_eq!(h.registry.calls.lock().unwrap()[0], "abc");
}

#[tokio::test(start_paused = true)]
async fn test_rejected_login_keeps_existing_credential() {
    let mut h = Harness::new();
    h.login_ok("abc", NOW + 1800).await;

    h.auth
        .responses
        .lock()
        .unwrap()
        .push_back(Err(LoginError::Rejected("invalid credentials".into())));
    let err = h.gate.login("ops", "wrong").await.unwrap_err();

    assert_eq!(err, AuthError::Login("invalid credentials".into()));
    assert_eq!(h.gate.login_error(), Some("invalid credentials"));
    assert_eq!(h.gate.credential(), &Credential::new("abc", NOW + 1800));
    assert_eq!(h.store.get_entry("token").as_deref(), Some("abc"));
    assert!(h.gate.is_logged_in());
}

#[tokio::test(start_paused = true)]
async fn test_login_error_fallbacks() {
    let mut h = Harness::new();
    h.auth.responses.lock().unwrap().extend([
        Err(LoginError::Rejected(String::new())),
        Err(LoginError::Transport("connection refused".into())),
    ]);

    assert!(h.gate.login("ops", "pw").await.is_err());
    assert_eq!(h.gate.login_error(), Some("login failed"));

    assert!(h.gate.login("ops", "pw").await.is_err());
    assert_eq!(h.gate.login_error(), Some("connection error"));
    assert!(!h.gate.is_logged_in());

    h.login_ok("abc", NOW + 60).await;
    assert!(h.gate.login_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_expiry_logs_out_exactly_once() {
    let mut h = Harness::new();
    h.login_ok("abc", NOW + 2).await;
    assert_eq!(h.gate.countdown().as_deref(), Some("00:02"));

    tick(&mut h, 1).await;
    assert!(h.gate.is_logged_in());

    tick(&mut h, 1).await;
    assert!(!h.gate.is_logged_in());
    assert!(!h.gate.clock_state().ticking);
    assert!(h.store.get_entry("token").is_none());

    // A tick already queued from the stopped run must not log out again
    h.store.0.lock().unwrap().insert("token".into(), "kept".into());
    h.gate.handle(Event::ClockTick { generation: 1 });
    tick(&mut h, 5).await;
    assert_eq!(h.store.get_entry("token").as_deref(), Some("kept"));
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_directory_refresh_forces_logout() {
    let mut h = Harness::new();
    h.login_ok("abc", NOW + 1800).await;
    h.gate.attach("m1").unwrap();
    h.gate.handle(Event::Socket(SocketEvent::new(
        ConnectionId(1),
        SocketEventKind::Opened,
    )));

    h.registry.respond(Err(DirectoryError::Unauthorized));
    tick(&mut h, 5).await;

    assert!(!h.gate.is_logged_in());
    assert!(h.gate.credential().token.is_empty());
    assert!(h.gate.machines().is_empty());
    assert_eq!(h.gate.session().state(), ConnectionState::Idle);
    assert!(h.log.ops().contains(&Op::Close(ConnectionId(1))));
    assert!(h.store.get_entry("token").is_none());
    assert!(h.store.get_entry("expires").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_proxy_rejecting_token_forces_logout() {
    let mut h = Harness::new();
    h.login_ok("abc", NOW + 1800).await;
    h.gate.attach("m1").unwrap();

    h.gate.handle(Event::Socket(SocketEvent::new(
        ConnectionId(1),
        SocketEventKind::Unauthorized,
    )));

    assert!(!h.gate.is_logged_in());
    assert!(h.gate.credential().token.is_empty());
    assert!(h.gate.countdown().is_none());
    assert!(h.gate.machines().is_empty());
    assert_eq!(h.gate.session().state(), ConnectionState::Idle);
    assert!(h.log.ops().contains(&Op::Close(ConnectionId(1))));
    assert!(h.store.get_entry("token").is_none());
    assert!(h.store.get_entry("expires").is_none());

    // The close that follows belongs to the socket already torn down
    h.gate.handle(Event::Socket(SocketEvent::new(
        ConnectionId(1),
        SocketEventKind::Closed,
    )));
    assert!(!h.gate.is_logged_in());
    assert_eq!(h.gate.session().state(), ConnectionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_rejection_from_replaced_socket_is_ignored() {
    let mut h = Harness::new();
    h.login_ok("abc", NOW + 1800).await;
    h.gate.attach("m1").unwrap();
    h.gate.attach("m2").unwrap();

    h.gate.handle(Event::Socket(SocketEvent::new(
        ConnectionId(1),
        SocketEventKind::Unauthorized,
    )));

    assert!(h.gate.is_logged_in());
    assert_eq!(h.gate.session().connection_id(), Some(ConnectionId(2)));
}

#[tokio::test(start_paused = true)]
async fn test_transient_directory_failure_marks_stale() {
    let mut h = Harness::new();
    h.login_ok("abc", NOW + 1800).await;

    h.registry
        .respond(Err(DirectoryError::Transport("timeout".into())));
    tick(&mut h, 5).await;

    assert!(h.gate.is_logged_in());
    assert!(h.gate.view().stale);
    assert_eq!(h.gate.machines().len(), 2);

    h.registry.respond(Ok(Vec::new()));
    tick(&mut h, 5).await;
    assert!(!h.gate.view().stale);
    assert!(h.gate.machines().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_polling_uses_configured_cadence() {
    let mut h = Harness::new();
    h.login_ok("abc", NOW + 1800).await;
    assert_eq!(h.registry.calls(), 1);

    tick(&mut h, 4).await;
    assert_eq!(h.registry.calls(), 1);

    tick(&mut h, 1).await;
    assert_eq!(h.registry.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_resumes_valid_session() {
    let store = SharedStore::default();
    {
        let mut entries = store.0.lock().unwrap();
        entries.insert("token".into(), "persisted".into());
        entries.insert("expires".into(), (NOW + 90).to_string());
    }
    let mut h = Harness::with_store(store);

    assert!(h.gate.bootstrap());
    h.settle().await;

    assert_eq!(h.gate.countdown().as_deref(), Some("01:30"));
    assert_eq!(h.gate.machines().len(), 2);
    assert_eq!(h.registry.calls.lock().unwrap()[0], "persisted");
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_ignores_expired_session() {
    let store = SharedStore::default();
    {
        let mut entries = store.0.lock().unwrap();
        entries.insert("token".into(), "old".into());
        entries.insert("expires".into(), (NOW - 1).to_string());
    }
    let mut h = Harness::with_store(store);

    assert!(!h.gate.bootstrap());
    h.settle().await;

    assert!(!h.gate.is_logged_in());
    assert_eq!(h.gate.countdown(), None);
    assert_eq!(h.registry.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_attach_by_name_and_id() {
    let mut h = Harness::new();
    h.login_ok("abc", NOW + 1800).await;

    assert_eq!(
        h.gate.attach("BETA").unwrap(),
        AttachOutcome::Connecting(ConnectionId(1))
    );
    h.tx.send(Event::Socket(SocketEvent::new(
        ConnectionId(1),
        SocketEventKind::Opened,
    )))
    .unwrap();
    h.settle().await;

    assert_eq!(
        h.gate.session().target_machine_id(),
        Some(&MachineId::new("m2"))
    );
    assert_eq!(h.gate.attach("m2").unwrap(), AttachOutcome::AlreadyAttached);
    assert_eq!(h.gate.view().status, "connected to beta");
}

#[tokio::test(start_paused = true)]
async fn test_attach_refusals() {
    let mut h = Harness::new();

    assert!(matches!(
        h.gate.attach("m1"),
        Err(HtdError::Auth(AuthError::NotAuthenticated))
    ));

    h.login_ok("abc", NOW + 1800).await;
    assert!(matches!(
        h.gate.attach("gamma"),
        Err(HtdError::Connection(ConnectionError::MachineNotFound(_)))
    ));
    assert!(h.log.opened().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_attach_with_expired_credential_logs_out() {
    let mut h = Harness::new();
    h.login_ok("abc", NOW + 10).await;

    h.clock.set(NOW + 10);
    let err = h.gate.attach("m1").unwrap_err();

    assert!(matches!(err, HtdError::Auth(AuthError::Expired)));
    assert!(!h.gate.is_logged_in());
    assert!(h.log.opened().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_logout_is_idempotent() {
    let mut h = Harness::new();
    h.login_ok("abc", NOW + 1800).await;
    h.gate.attach("m1").unwrap();

    h.gate.logout();
    h.gate.logout();
    h.settle().await;

    let ops = h.log.ops();
    assert_eq!(
        ops.iter()
            .filter(|op| **op == Op::Close(ConnectionId(1)))
            .count(),
        1
    );
    assert_eq!(ops.iter().filter(|op| **op == Op::Dispose(1)).count(), 1);
    assert!(!h.gate.is_logged_in());
    assert!(h.gate.machines().is_empty());
    assert_eq!(h.gate.countdown(), None);
    assert_eq!(h.gate.session().state(), ConnectionState::Idle);

    let calls = h.registry.calls();
    tick(&mut h, 30).await;
    assert_eq!(h.registry.calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_input_routed_through_events() {
    let mut h = Harness::new();
    h.login_ok("abc", NOW + 1800).await;
    h.tx.send(Event::Attach("alpha".into())).unwrap();
    h.tx.send(Event::Input("dropped".into())).unwrap();
    h.tx.send(Event::Socket(SocketEvent::new(
        ConnectionId(1),
        SocketEventKind::Opened,
    )))
    .unwrap();
    h.tx.send(Event::Input("uptime\r".into())).unwrap();
    h.settle().await;

    let inputs: Vec<_> = h
        .log
        .sent()
        .into_iter()
        .map(|(_, frame)| frame)
        .filter(|frame| frame["type"] == "input")
        .collect();
    assert_eq!(
        inputs,
        vec![serde_json::json!({"type": "input", "data": "uptime\r"})]
    );
}

#[tokio::test(start_paused = true)]
async fn test_refresh_now_reports_rejection() {
    let mut h = Harness::new();
    h.login_ok("abc", NOW + 1800).await;

    h.registry.respond(Err(DirectoryError::Unauthorized));
    assert!(h.gate.refresh_now().await.is_err());
    assert!(!h.gate.is_logged_in());
}

#[tokio::test(start_paused = true)]
async fn test_event_loop_ends_on_logout() {
    let mut h = Harness::new();
    h.login_ok("abc", NOW + 1800).await;
    h.tx.send(Event::Logout).unwrap();

    let mut observed = 0;
    run_until_logout(&mut h.gate, &mut h.rx, |_| observed += 1).await;

    assert!(observed >= 1);
    assert!(!h.gate.is_logged_in());
}
