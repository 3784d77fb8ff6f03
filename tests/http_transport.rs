// HTTP transport against a mock controller endpoint
//
// The mock decrypts each request with the shared password, checks the
// tunnelSip envelope and answers with an encrypted JSON-RPC response.

use std::sync::Arc;
use std::time::Duration;

use rainbird_lan_bridge::crypto::RainbirdCrypt;
use rainbird_lan_bridge::transport::dispatcher::Dispatcher;
use rainbird_lan_bridge::{Command, HttpTransport, RainbirdError, Reply, RetryPolicy, Transport};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const PASSWORD: &str = "hunter2";

/// Answers every request with a fixed SIP payload, or a JSON-RPC error.
struct ControllerResponder {
    crypt: RainbirdCrypt,
    reply: Result<&'static str, (i64, &'static str)>,
}

impl ControllerResponder {
    fn data(hex: &'static str) -> Self {
        Self {
            crypt: RainbirdCrypt::new(PASSWORD),
            reply: Ok(hex),
        }
    }

    fn error(code: i64, message: &'static str) -> Self {
        Self {
            crypt: RainbirdCrypt::new(PASSWORD),
            reply: Err((code, message)),
        }
    }
}

impl Respond for ControllerResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Ok(plain) = self.crypt.open(&request.body) else {
            return ResponseTemplate::new(400);
        };
        let Ok(envelope) = serde_json::from_slice::<Value>(&plain) else {
            return ResponseTemplate::new(400);
        };
        if envelope["method"] != "tunnelSip" || envelope["jsonrpc"] != "2.0" {
            return ResponseTemplate::new(400);
        }

        let response = match self.reply {
            Ok(data) => json!({ "jsonrpc": "2.0", "id": envelope["id"], "result": { "length": data.len() / 2, "data": data } }),
            Err((code, message)) => json!({ "jsonrpc": "2.0", "id": envelope["id"], "error": { "code": code, "message": message } }),
        };
        match self.crypt.seal(&response.to_string()) {
            Ok(body) => ResponseTemplate::new(200).set_body_bytes(body),
            Err(_) => ResponseTemplate::new(500),
        }
    }
}

fn transport_for(server: &MockServer) -> HttpTransport {
    let host = server.uri().trim_start_matches("http://").to_string();
    HttpTransport::new(&host, PASSWORD).unwrap()
}

#[tokio::test]
async fn test_model_and_version_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stick"))
        .and(header("content-type", "application/octet-stream"))
        .respond_with(ControllerResponder::data("8200030209"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    let reply = transport.call(&Command::ModelAndVersionGet).await.unwrap();

    match reply {
        Reply::ModelAndVersion {
            model_number, version, ..
        } => {
            assert_eq!(model_number, 0x0003);
            assert_eq!(version, "2.9");
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn test_acknowledgement() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stick"))
        .respond_with(ControllerResponder::data("0139"))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    let reply = transport.call(&Command::run_zone(3, 600)).await.unwrap();
    assert_eq!(reply, Reply::Acknowledged { command: 0x39 });
}

#[tokio::test]
async fn test_rpc_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stick"))
        .respond_with(ControllerResponder::error(-32601, "Method not found"))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    let err = transport.call(&Command::SerialNumberGet).await.unwrap_err();
    assert!(matches!(err, RainbirdError::Rpc { code: -32601, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_http_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stick"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    let err = transport.call(&Command::RainSensorStateGet).await.unwrap_err();
    assert!(matches!(err, RainbirdError::HttpStatus { status: 503 }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_wrong_password_fails_to_decode() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stick"))
        .respond_with(ControllerResponder::data("0139"))
        .mount(&server)
        .await;

    // The mock cannot read the request and rejects it
    let host = server.uri().trim_start_matches("http://").to_string();
    let transport = HttpTransport::new(&host, "wrong").unwrap();
    let err = transport.call(&Command::StopIrrigation).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_dispatcher_retries_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stick"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/stick"))
        .respond_with(ControllerResponder::data("BE01"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = Arc::new(transport_for(&server));
    let dispatcher = Dispatcher::new(transport, RetryPolicy::capped(Duration::from_millis(10), 5));
    let reply = dispatcher.send(&Command::RainSensorStateGet).await.unwrap();
    assert_eq!(
        reply,
        Reply::RainSensorState {
            set_point_reached: true
        }
    );
}

#[tokio::test]
async fn test_dispatcher_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stick"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let transport = Arc::new(transport_for(&server));
    let dispatcher = Dispatcher::new(transport, RetryPolicy::capped(Duration::from_millis(10), 3));
    let err = dispatcher.send(&Command::StopIrrigation).await.unwrap_err();
    assert!(matches!(err, RainbirdError::HttpStatus { status: 500 }));
}
