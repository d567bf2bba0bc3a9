//! Integration tests for the HTTP client.

use std::time::Duration;

use ledbot_net::NetworkError;
use ledbot_net::http::{HttpClient, JSON_CONTENT_TYPE};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> HttpClient {
    HttpClient::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("Failed to build client")
}

#[tokio::test]
async fn test_post_sends_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/apps.connections.open"))
        .and(header("authorization", "Bearer xapp-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"ok": true, "url": "wss://x/y"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/apps.connections.open", mock_server.uri());
    let body: Value = client().post(&url, "xapp-1").await.unwrap();
    assert_eq!(body["url"], "wss://x/y");
}

#[tokio::test]
async fn test_post_json_sends_body_and_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(header("authorization", "Bearer xoxb-2"))
        .and(header("content-type", JSON_CONTENT_TYPE))
        .and(body_json(json!({"channel": "C1", "text": "hi"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/chat.postMessage", mock_server.uri());
    let body: Value = client()
        .post_json(&url, "xoxb-2", &json!({"channel": "C1", "text": "hi"}))
        .await
        .unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_non_2xx_is_api_error_with_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/missing", mock_server.uri());
    let err = client().post::<Value>(&url, "t").await.unwrap_err();
    assert!(matches!(err, NetworkError::Api(ref msg) if msg == "HTTP 404"));
}

#[tokio::test]
async fn test_invalid_json_body_is_parse_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/garbled", mock_server.uri());
    let err = client().post::<Value>(&url, "t").await.unwrap_err();
    assert!(matches!(err, NetworkError::Parse(_)));
}

#[tokio::test]
async fn test_timeout_is_connection_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let client = HttpClient::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let url = format!("{}/slow", mock_server.uri());
    let err = client.post::<Value>(&url, "t").await.unwrap_err();
    assert!(err.is_connection());
}

#[tokio::test]
async fn test_refused_connection_is_connection_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("http://{addr}/apps.connections.open");
    let err = client().post::<Value>(&url, "t").await.unwrap_err();
    assert!(matches!(err, NetworkError::Connection(_)));
}
