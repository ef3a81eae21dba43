//! The `/error` endpoint rendered directly from request headers.

mod common;

use axum::http::StatusCode;
use common::*;
use portico_gateway::gateway::RunningApiStore;
use serde_json::json;

#[tokio::test]
async fn suspension_message_wins_and_blocks() {
    let state = gateway();
    state
        .running
        .upsert("r1", &|s| s.suspension_message = Some("maintenance".into()))
        .unwrap();

    let (status, body) = send(
        &state,
        empty_request(
            "GET",
            "/error",
            &[
                ("x-route-id", "r1"),
                ("x-reason-code", "403"),
                ("x-reason-message", "Invalid Keys"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, json!({ "error": "maintenance" }));
    assert!(state.running.get("r1").blocked);
}

#[tokio::test]
async fn no_context_falls_back_to_bad_request_text() {
    let state = gateway();
    let (status, body) = send(&state, empty_request("POST", "/error", &[])).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, json!({ "error": "Bad request" }));
}

#[tokio::test]
async fn recorded_reason_is_returned_for_every_verb() {
    let state = gateway();
    for verb in ["GET", "POST", "PUT", "DELETE"] {
        let (status, body) = send(
            &state,
            empty_request(
                verb,
                "/error",
                &[("x-reason-code", "404"), ("x-reason-message", "not found")],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "verb {verb}");
        assert_eq!(body, json!({ "error": "not found" }));
    }
}

#[tokio::test]
async fn malformed_reason_code_is_bad_request() {
    let state = gateway();
    let (status, body) = send(
        &state,
        empty_request(
            "PUT",
            "/error",
            &[("x-reason-code", "four-oh-four"), ("x-reason-message", "not found")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_ne!(body["error"], "not found");
}

#[tokio::test]
async fn unknown_route_id_gets_a_blocked_record() {
    let state = gateway();
    send(&state, empty_request("DELETE", "/error", &[("x-route-id", "fresh")])).await;
    assert!(state.running.get("fresh").blocked);
}
