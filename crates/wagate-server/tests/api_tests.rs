//! API integration tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

use wagate_client::{ChatClient, ClientCommand, ClientError};
use wagate_server::api::{router, AppState};
use wagate_server::qr;
use wagate_server::session::{SessionContext, StateEvent};

const ADMIN_NUMBER: &str = "6281234567890";

fn test_app(ctx: Arc<SessionContext>) -> Router {
    router(AppState {
        session: ctx,
        admin_number: ADMIN_NUMBER.to_string(),
    })
}

/// Context with an open session backed by a detached client whose
/// command stream the test holds.
async fn open_session() -> (Arc<SessionContext>, mpsc::Receiver<ClientCommand>) {
    let ctx = Arc::new(SessionContext::new());
    let (client, command_rx) = ChatClient::channel();
    ctx.set_client(client).await;
    ctx.apply(StateEvent::Opened).await;
    (ctx, command_rx)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(Method::GET)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(Method::POST)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

#[tokio::test]
async fn admin_number_is_served_regardless_of_session_state() {
    // Session still connecting; the route has no session dependency.
    let ctx = Arc::new(SessionContext::new());
    let app = test_app(ctx);

    let response = app.oneshot(get("/admin-number")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["adminNumber"], ADMIN_NUMBER);
}

#[tokio::test]
async fn send_message_while_session_not_open_is_503() {
    let ctx = Arc::new(SessionContext::new());
    let app = test_app(ctx);

    let response = app
        .oneshot(post_json(
            "/send-message",
            json!({"phone": "1234", "message": "hi"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert_eq!(json["code"], "SESSION_NOT_READY");
}

#[tokio::test]
async fn send_message_with_empty_body_is_400() {
    let (ctx, _command_rx) = open_session().await;
    let app = test_app(ctx);

    let response = app
        .oneshot(post_json("/send-message", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "phone and message are required");
}

#[tokio::test]
async fn send_message_with_missing_message_is_400() {
    let (ctx, _command_rx) = open_session().await;
    let app = test_app(ctx);

    let response = app
        .oneshot(post_json("/send-message", json!({"phone": "1234"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn send_message_delivers_to_normalized_address() {
    let (ctx, mut command_rx) = open_session().await;
    let app = test_app(ctx);

    let responder = tokio::spawn(async move {
        match command_rx.recv().await {
            Some(ClientCommand::SendText { to, body, ack }) => {
                let _ = ack.send(Ok(()));
                (to, body)
            }
            other => panic!("unexpected command: {other:?}"),
        }
    });

    let response = app
        .oneshot(post_json(
            "/send-message",
            json!({"phone": "1234", "message": "hi"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "Message sent");

    let (to, body) = responder.await.unwrap();
    assert_eq!(to, "1234@s.whatsapp.net");
    assert_eq!(body, "hi");
}

#[tokio::test]
async fn send_failure_is_500_with_sanitized_body() {
    let (ctx, mut command_rx) = open_session().await;
    let app = test_app(ctx);

    tokio::spawn(async move {
        if let Some(ClientCommand::SendText { ack, .. }) = command_rx.recv().await {
            let _ = ack.send(Err(ClientError::Rejected("gateway internals".into())));
        }
    });

    let response = app
        .oneshot(post_json(
            "/send-message",
            json!({"phone": "1234", "message": "hi"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_string(response).await;
    assert!(!body.contains("gateway internals"));
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], "failed to send message");
    assert_eq!(json["code"], "DELIVERY_FAILED");
}

#[tokio::test]
async fn qr_before_any_challenge_is_503() {
    let ctx = Arc::new(SessionContext::new());
    let app = test_app(ctx);

    let response = app.oneshot(get("/qr")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert_eq!(json["code"], "QR_UNAVAILABLE");
}

#[tokio::test]
async fn qr_after_a_challenge_serves_the_image() {
    // Pairing happens while the session is still closed; the route must
    // work without the readiness guard.
    let ctx = Arc::new(SessionContext::new());
    ctx.set_qr(qr::data_uri("2@test-code").unwrap()).await;
    let app = test_app(Arc::clone(&ctx));

    let response = app.oneshot(get("/qr")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("<img src=\"data:image/svg+xml;base64,"));
}
