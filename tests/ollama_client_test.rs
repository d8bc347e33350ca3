//! Integration tests for the Ollama HTTP client against a mocked server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ollama_commit::commit::{ErrorClass, classify};
use ollama_commit::config::Timeouts;
use ollama_commit::error::{CommitError, ModelError};
use ollama_commit::ollama::{ModelClient, OllamaClient};

fn client() -> OllamaClient {
    OllamaClient::new(&Timeouts::default()).expect("Failed to build client")
}

fn short_timeouts() -> Timeouts {
    Timeouts {
        connection: 500,
        generation: 200,
        model_pull: 500,
    }
}

#[tokio::test]
async fn test_generate_sends_non_streaming_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_json(json!({
            "model": "llama3.2:latest",
            "prompt": "describe this diff",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2:latest",
            "response": "Add retry to model calls",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = client()
        .generate("llama3.2:latest", &server.uri(), "describe this diff")
        .await
        .unwrap();
    assert_eq!(text, "Add retry to model calls");
}

#[tokio::test]
async fn test_generate_trailing_slash_host() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "ok" })))
        .mount(&server)
        .await;

    let host = format!("{}/", server.uri());
    assert_eq!(client().generate("m", &host, "p").await.unwrap(), "ok");
}

#[tokio::test]
async fn test_generate_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "  \n" })))
        .mount(&server)
        .await;

    let err = client().generate("m", &server.uri(), "p").await.unwrap_err();
    assert!(matches!(err, ModelError::EmptyResponse));
}

#[tokio::test]
async fn test_generate_missing_model_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error": "model 'ghost' not found, try pulling it first" })),
        )
        .mount(&server)
        .await;

    let err = client().generate("ghost", &server.uri(), "p").await.unwrap_err();
    assert!(matches!(err, ModelError::ModelNotFound(ref m) if m == "ghost"));
    assert_eq!(classify(&CommitError::from(err)), ErrorClass::Fatal);
}

#[tokio::test]
async fn test_generate_server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "llama runner process has terminated" })))
        .mount(&server)
        .await;

    let err = client().generate("m", &server.uri(), "p").await.unwrap_err();
    match &err {
        ModelError::Http { status, body } => {
            assert_eq!(*status, 500);
            assert!(body.contains("llama runner"));
        }
        other => panic!("expected Http, got {other:?}"),
    }
    assert_eq!(classify(&CommitError::from(err)), ErrorClass::Retryable);
}

#[tokio::test]
async fn test_generate_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "too late" }))
                .set_delay(Duration::from_millis(1_000)),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::new(&short_timeouts()).unwrap();
    let err = client.generate("m", &server.uri(), "p").await.unwrap_err();
    assert!(matches!(err, ModelError::Timeout(200)));
    assert_eq!(classify(&CommitError::from(err)), ErrorClass::Retryable);
}

#[tokio::test]
async fn test_generate_unreadable_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let err = client().generate("m", &server.uri(), "p").await.unwrap_err();
    assert!(matches!(err, ModelError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_connection_refused() {
    // Bind then drop a listener so the port is very likely closed.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let host = format!("http://127.0.0.1:{}", port);

    let err = client().generate("m", &host, "p").await.unwrap_err();
    assert!(matches!(err, ModelError::Connection { .. }), "got {err:?}");
    assert!(!client().test_connection(&host).await);
}

#[tokio::test]
async fn test_list_models_and_connection_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                { "name": "llama3.2:latest", "size": 2019393189u64, "modified_at": "2024-10-01T10:00:00Z" },
                { "name": "nomic-embed-text:latest" }
            ]
        })))
        .mount(&server)
        .await;

    let client = client();
    assert!(client.test_connection(&server.uri()).await);

    let models = client.list_models(&server.uri()).await.unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].size, Some(2_019_393_189));
    assert!(models[0].matches("llama3.2"));
    assert!(models[1].is_embedding_model());
}

#[tokio::test]
async fn test_connection_check_fails_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(!client().test_connection(&server.uri()).await);
}

#[tokio::test]
async fn test_pull_drains_progress_stream() {
    let server = MockServer::start().await;
    let body = [
        r#"{"status":"pulling manifest"}"#,
        r#"{"status":"downloading","total":100,"completed":50}"#,
        r#"{"status":"success"}"#,
    ]
    .join("\n");
    Mock::given(method("POST"))
        .and(path("/api/pull"))
        .and(body_json(json!({ "model": "phi3:mini", "stream": true })))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    client().pull_model(&server.uri(), "phi3:mini").await.unwrap();
}

#[tokio::test]
async fn test_pull_reports_stream_error() {
    let server = MockServer::start().await;
    let body = [
        r#"{"status":"pulling manifest"}"#,
        r#"{"error":"pull model manifest: file does not exist"}"#,
    ]
    .join("\n");
    Mock::given(method("POST"))
        .and(path("/api/pull"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let err = client().pull_model(&server.uri(), "nope").await.unwrap_err();
    assert!(matches!(err, ModelError::InvalidModel { .. }));
}
