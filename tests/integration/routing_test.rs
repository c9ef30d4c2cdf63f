// tests/integration/routing_test.rs

//! Integration tests for inbound routing and the outbound query path.

use super::test_helpers::TestContext;
use ecomet_client::config::RegistryConfig;
use ecomet_client::core::{ClientError, LoginState, Request};
use std::thread;
use std::time::Duration;

#[test]
fn test_unmatched_id_is_ignored() {
    let ctx = TestContext::established();
    ctx.deliver(r#"{"id": 999, "type": "ok"}"#);

    assert_eq!(ctx.client.login_state(), LoginState::AwaitingLogin);
    assert!(!ctx.client.wait_for_login(Duration::from_millis(20)));
    let stats = ctx.client.stats();
    assert_eq!(stats.messages_unmatched, 1);
    assert_eq!(stats.messages_routed, 0);
}

#[test]
fn test_malformed_messages_are_ignored() {
    let ctx = TestContext::established();
    for raw in ["not json", "", "{unterminated", "   ", "}{"] {
        ctx.deliver(raw);
    }

    assert_eq!(ctx.client.login_state(), LoginState::AwaitingLogin);
    assert!(!ctx.client.wait_for_login(Duration::from_millis(20)));
    let stats = ctx.client.stats();
    assert_eq!(stats.messages_received, 5);
    assert_eq!(stats.messages_malformed, 5);
}

#[test]
fn test_non_numeric_or_missing_id_is_ignored() {
    let ctx = TestContext::established();
    ctx.deliver(r#"{"id": "one", "type": "ok"}"#);
    ctx.deliver(r#"{"type": "ok"}"#);
    ctx.deliver(r#"{"id": -1, "type": "ok"}"#);

    assert_eq!(ctx.client.login_state(), LoginState::AwaitingLogin);
    assert_eq!(ctx.client.stats().messages_malformed, 3);
}

#[test]
fn test_nested_result_still_routes_login() {
    let ctx = TestContext::established();
    ctx.deliver(
        r#"{"id":"1","type":"ok","result":{"oper":"edit","oid":"{46,96}","fields":{"in1_value":"1.0e+01"}}}"#,
    );
    assert!(ctx.client.wait_for_login(Duration::from_millis(100)));
}

#[test]
fn test_messages_before_session_established_do_not_log_in() {
    let ctx = TestContext::new();
    ctx.deliver(r#"{"id": 1, "type": "ok"}"#);
    assert_eq!(ctx.client.login_state(), LoginState::AwaitingLogin);
}

#[test]
fn test_submit_query_sends_query_request() {
    let ctx = TestContext::established();
    ctx.deliver(r#"{"id": 1, "type": "ok"}"#);

    let query = "SUBSCRIBE CID=1 GET in1_value WHERE .name='T.vozd.sred'";
    let id = ctx.client.submit_query(query).unwrap();
    assert_eq!(id, 2);

    let decoded = ctx.transport.decoded();
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[1]["id"], "2");
    assert_eq!(decoded[1]["action"], "query");
    assert!(ctx.transport.frames()[1].contains(query));

    let tracked = ctx.client.registry().lookup(id).unwrap();
    assert_eq!(tracked.param("query_string"), Some(query));
}

#[test]
fn test_query_responses_are_routed_but_not_consumed() {
    let ctx = TestContext::established();
    ctx.deliver(r#"{"id": 1, "type": "ok"}"#);
    let id = ctx.client.submit_query("SUBSCRIBE GET .name").unwrap();

    // A subscription answers several times under the same correlation id.
    ctx.deliver(&format!(
        r#"{{"id":"{id}","type":"ok","result":{{"oper":"create","oid":"{{46,96}}"}}}}"#
    ));
    ctx.deliver(&format!(r#"{{"id":{id},"type":"ok","result":"ok"}}"#));

    assert!(ctx.client.registry().lookup(id).is_some());
    assert_eq!(ctx.client.stats().messages_routed, 3);
    assert_eq!(ctx.client.login_state(), LoginState::LoggedIn);
}

#[test]
fn test_query_response_with_login_like_shape_does_not_touch_session() {
    let ctx = TestContext::established();
    let id = ctx.client.submit_query("GET .name").unwrap();
    ctx.deliver(&format!(r#"{{"id": {id}, "type": "ok"}}"#));
    assert_eq!(ctx.client.login_state(), LoginState::AwaitingLogin);
}

#[test]
fn test_submit_query_on_closed_transport() {
    let ctx = TestContext::established();
    ctx.transport.close();

    let err = ctx.client.submit_query("GET .name").unwrap_err();
    assert_eq!(err, ClientError::TransportClosed);
    // Only the login request remains tracked.
    assert_eq!(ctx.client.registry().len(), 1);
}

#[test]
fn test_custom_request_through_send() {
    let ctx = TestContext::established();
    let mut request = ctx.client.new_request("edit");
    request.add_param("oid", "46-96").add_param("in1_value", "10.5");
    let id = request.id();
    ctx.client.send(request).unwrap();

    let decoded = ctx.transport.decoded();
    assert_eq!(decoded.last().unwrap()["action"], "edit");
    assert_eq!(ctx.client.registry().lookup(id).unwrap().action(), "edit");
}

#[test]
fn test_send_registers_request_before_answer_can_arrive() {
    let ctx = TestContext::established();
    ctx.client.send(Request::new("query", 77)).unwrap();
    ctx.deliver(r#"{"id": 77, "type": "ok"}"#);
    assert_eq!(ctx.client.stats().messages_routed, 1);
}

#[test]
fn test_on_closed_and_on_error() {
    let ctx = TestContext::established();
    ctx.client
        .on_error(&ClientError::WebSocket("connection reset".to_string()));
    ctx.client.on_closed(1006, "connection reset", true);

    assert!(!ctx.client.is_connected());
    // Waiters are not released by a close; they run out their own timeout.
    assert!(!ctx.client.wait_for_login(Duration::from_millis(20)));
}

#[test]
fn test_purge_expired_requests() {
    let ctx = TestContext::with_registry(RegistryConfig {
        request_ttl: Duration::from_millis(30),
        purge_interval: Duration::from_millis(10),
    });
    ctx.client.on_session_established();
    ctx.client.submit_query("GET .name").unwrap();
    assert_eq!(ctx.client.registry().len(), 2);

    thread::sleep(Duration::from_millis(60));
    assert_eq!(ctx.client.purge_expired_requests(), 2);
    assert!(ctx.client.registry().is_empty());
    assert_eq!(ctx.client.stats().requests_expired, 2);

    // An answer to an evicted request is now simply unmatched.
    ctx.deliver(r#"{"id": 1, "type": "ok"}"#);
    assert_eq!(ctx.client.login_state(), LoginState::AwaitingLogin);
}

#[test]
fn test_purge_disabled_keeps_requests() {
    let ctx = TestContext::with_registry(RegistryConfig {
        request_ttl: Duration::ZERO,
        purge_interval: Duration::from_millis(10),
    });
    ctx.client.on_session_established();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(ctx.client.purge_expired_requests(), 0);
    assert_eq!(ctx.client.registry().len(), 1);
}
