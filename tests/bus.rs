mod common;

use common::{Script, harness};
use serde_json::{Value, json};
use sftp_adapter::{
    Action, INVALID_ACTION, MAX_LINE_LENGTH, SessionOutcome, TransferError, ValidationError, serve,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

fn send_line(id: u32) -> String {
    json!({
        "id": id,
        "action": "send",
        "known-hosts": "/kh",
        "hostname": "h",
        "username": "u",
        "password": "p",
        "local-file": "/tmp/a.txt",
        "dist-file": "/remote/a.txt",
    })
    .to_string()
}

async fn serve_bytes(script: Script, input: &[u8]) -> (usize, Vec<Value>) {
    let h = harness(script);
    let (tx, mut rx) = mpsc::channel(16);
    let handled = serve(Arc::new(h.handler), input, tx, CancellationToken::new()).await;

    let mut replies = Vec::new();
    while let Some(reply) = rx.recv().await {
        replies.push(reply);
    }
    (handled, replies)
}

fn is_malformed(reply: &Value) -> bool {
    reply["status"] == "error"
        && reply["message"]
            .as_str()
            .is_some_and(|m| m.starts_with("malformed request: "))
}

#[tokio::test]
async fn unknown_action_is_rejected_without_transport() {
    let h = harness(Script::default());

    for body in [
        json!({ "action": "receive", "hostname": "h" }),
        json!({ "hostname": "h" }),
        json!({ "action": 7 }),
    ] {
        assert_eq!(
            h.handler.handle(&body).await,
            SessionOutcome::failure(INVALID_ACTION)
        );
    }
    assert!(h.calls.all().is_empty());
}

#[tokio::test]
async fn non_object_body_has_no_params() {
    let h = harness(Script::default());
    assert_eq!(
        h.handler.handle(&json!(null)).await,
        SessionOutcome::failure("params is required")
    );
}

#[test]
fn action_parsing() {
    let action = assert_ok!(Action::from_message(&json!({
        "action": "send",
        "hostname": "h",
        "port": "22",
    })));
    let Action::Send(request) = action else {
        panic!("expected a send action");
    };
    assert_eq!(request.hostname.as_deref(), Some("h"));
    assert_eq!(request.port, Some(json!("22")));

    let err = assert_err!(Action::from_message(&json!({
        "action": "send",
        "hostname": 12,
    })));
    assert!(matches!(err, ValidationError::Malformed(_)));

    assert!(matches!(
        Action::from_message(&json!({ "action": "list" })),
        Ok(Action::Unsupported(name)) if name == "list"
    ));
}

#[tokio::test]
async fn reply_echoes_message_id() {
    let h = harness(Script {
        password_accepts: true,
        ..Default::default()
    });
    let line = json!({
        "id": "req-1",
        "action": "send",
        "known-hosts": "/kh",
        "hostname": "h",
        "username": "u",
        "password": "p",
        "local-file": "/tmp/a.txt",
        "dist-file": "/remote/a.txt",
    })
    .to_string();

    assert_eq!(
        h.handler.handle_line(&line).await,
        json!({ "status": "ok", "id": "req-1" })
    );
}

#[tokio::test]
async fn wrong_address_is_refused() {
    let h = harness(Script::default());
    let line = json!({ "id": 3, "address": "mail", "action": "send" }).to_string();

    assert_eq!(
        h.handler.handle_line(&line).await,
        json!({ "status": "error", "message": "Invalid address.", "id": 3 })
    );
    assert!(h.calls.all().is_empty());
}

#[tokio::test]
async fn matching_address_is_handled() {
    let h = harness(Script::default());
    let line = json!({ "address": "sftp", "action": "ping" }).to_string();

    assert_eq!(
        h.handler.handle_line(&line).await,
        json!({ "status": "error", "message": "Invalid action." })
    );
}

#[tokio::test]
async fn unparseable_line_gets_an_error_reply() {
    let h = harness(Script::default());
    let reply = h.handler.handle_line("{not json").await;

    assert_eq!(reply["status"], "error");
    assert!(
        reply["message"]
            .as_str()
            .unwrap()
            .starts_with("malformed request: ")
    );
}

#[test]
fn handler_futures_can_be_driven_without_a_runtime_macro() {
    let h = harness(Script::default());
    let outcome = tokio_test::block_on(h.handler.handle(&json!({ "action": "nope" })));
    assert_eq!(outcome, SessionOutcome::failure(INVALID_ACTION));
}

#[tokio::test]
async fn validation_rejection_reads_as_transfer_error() {
    let h = harness(Script::default());
    let outcome = h
        .handler
        .handle(&json!({ "action": "send", "username": "u" }))
        .await;

    let expected = TransferError::from(ValidationError::MissingField("known-hosts"));
    assert_eq!(outcome, SessionOutcome::failure(expected.to_string()));
    assert!(h.calls.all().is_empty());
}

#[tokio::test]
async fn serve_answers_every_line_and_survives_bad_utf8() {
    let mut input = Vec::new();
    input.extend_from_slice(json!({ "id": 1, "action": "ping" }).to_string().as_bytes());
    input.extend_from_slice(b"\n\n   \n");
    input.extend_from_slice(b"\xff\xfe{\"id\": 9}\n");
    input.extend_from_slice(send_line(2).as_bytes());
    input.push(b'\n');

    let (handled, replies) = serve_bytes(
        Script {
            password_accepts: true,
            ..Default::default()
        },
        &input,
    )
    .await;

    assert_eq!(handled, 3);
    assert_eq!(replies.len(), 3);
    assert!(replies.contains(&json!({ "status": "error", "message": "Invalid action.", "id": 1 })));
    assert!(replies.contains(&json!({ "status": "ok", "id": 2 })));
    assert_eq!(replies.iter().filter(|r| is_malformed(r)).count(), 1);
}

#[tokio::test]
async fn serve_skips_an_overlong_line() {
    let mut input = vec![b'a'; MAX_LINE_LENGTH + 10];
    input.push(b'\n');
    input.extend_from_slice(json!({ "id": 5, "action": "ping" }).to_string().as_bytes());
    input.push(b'\n');

    let (handled, replies) = serve_bytes(Script::default(), &input).await;

    assert_eq!(handled, 2);
    assert_eq!(replies.len(), 2);
    assert_eq!(replies.iter().filter(|r| is_malformed(r)).count(), 1);
    assert!(replies.contains(&json!({ "status": "error", "message": "Invalid action.", "id": 5 })));
}

#[tokio::test]
async fn serve_last_line_without_newline_is_handled() {
    let input = json!({ "id": 7, "action": "ping" }).to_string();
    let (handled, replies) = serve_bytes(Script::default(), input.as_bytes()).await;

    assert_eq!(handled, 1);
    assert_eq!(
        replies,
        vec![json!({ "status": "error", "message": "Invalid action.", "id": 7 })]
    );
}

#[tokio::test]
async fn serve_stops_on_shutdown() {
    let h = harness(Script::default());
    let (_writer, reader) = tokio::io::duplex(64);
    let (tx, mut rx) = mpsc::channel(4);
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let handled = serve(Arc::new(h.handler), reader, tx, shutdown).await;

    assert_eq!(handled, 0);
    assert!(rx.recv().await.is_none());
}
