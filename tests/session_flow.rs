//! End-to-end session scenarios against a mocked Gemini endpoint.

use base64::Engine;
use prophoto::{
    Config, FileSelection, GeminiTransformer, ProPhotoError, Session, SessionStatus,
    DOWNLOAD_FILE_NAME, INVALID_FILE_MESSAGE, TRANSFORM_FAILED_MESSAGE,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/models/gemini-2.5-flash-image:generateContent";

/// A small valid-looking PNG header followed by filler bytes.
fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend((0..64u8).rev());
    bytes
}

/// Roughly 2 MB of JPEG-tagged data.
fn large_jpeg() -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend((0..2 * 1024 * 1024).map(|i| (i % 251) as u8));
    bytes
}

fn image_response(bytes: &[u8]) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {
                "parts": [
                    {"text": "Here is the headshot."},
                    {"inlineData": {
                        "mimeType": "image/png",
                        "data": base64::engine::general_purpose::STANDARD.encode(bytes)
                    }}
                ]
            },
            "finishReason": "STOP"
        }]
    })
}

fn session_for(server: &MockServer) -> Session<GeminiTransformer> {
    let config = Config::new("test-api-key")
        .unwrap()
        .with_base_url(server.uri());
    Session::new(GeminiTransformer::builder(config).build().unwrap())
}

#[tokio::test]
async fn test_large_jpeg_reaches_success_and_downloads() {
    let server = MockServer::start().await;
    let generated = png_bytes();
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-api-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(image_response(&generated))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("casual.jpg");
    let original = large_jpeg();
    std::fs::write(&input, &original).unwrap();

    let session = session_for(&server);
    let mut rx = session.subscribe();
    let seen = tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let status = *rx.borrow_and_update();
            seen.push(status);
            if status == SessionStatus::Success || status == SessionStatus::Error {
                break;
            }
        }
        seen
    });

    session.select_file(FileSelection::path(&input)).await.unwrap();

    let seen = tokio::time::timeout(Duration::from_secs(5), seen)
        .await
        .unwrap()
        .unwrap();
    // The delayed response holds the session in Generating long enough to be observed.
    let generating = seen.iter().position(|s| *s == SessionStatus::Generating);
    let success = seen.iter().position(|s| *s == SessionStatus::Success);
    assert!(generating.is_some(), "statuses seen: {seen:?}");
    assert!(generating < success, "statuses seen: {seen:?}");
    assert_eq!(seen.last(), Some(&SessionStatus::Success));
    assert!(!seen.contains(&SessionStatus::Error));

    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Success);
    let result = snapshot.result.unwrap();
    assert_eq!(result.original().decode().unwrap(), original);
    assert!(result
        .transformed()
        .as_str()
        .starts_with("data:image/png;base64,"));

    let out = tempfile::tempdir().unwrap();
    let saved = session.download_result(out.path()).await.unwrap().unwrap();
    assert_eq!(saved, out.path().join(DOWNLOAD_FILE_NAME));
    assert_eq!(std::fs::read(saved).unwrap(), generated);
}

#[tokio::test]
async fn test_request_carries_stripped_payload_and_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response(&png_bytes())))
        .mount(&server)
        .await;

    let upload = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x10, 0x20, 0x30];
    let session = session_for(&server);
    session
        .select_file(FileSelection::memory("me.jpg", "image/jpeg", upload.clone()))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let parts = body["contents"][0]["parts"].as_array().unwrap();

    let inline = &parts[0]["inline_data"];
    assert_eq!(inline["mimeType"], "image/jpeg");
    let sent = inline["data"].as_str().unwrap();
    assert!(!sent.starts_with("data:"));
    assert_eq!(
        base64::engine::general_purpose::STANDARD.decode(sent).unwrap(),
        upload
    );
    assert_eq!(parts[1]["text"], prophoto::transform::PROFESSIONAL_HEADSHOT_PROMPT);
}

#[tokio::test]
async fn test_text_file_never_reaches_the_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response(&png_bytes())))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    std::fs::write(&input, "not a photo").unwrap();

    let session = session_for(&server);
    let mut rx = session.subscribe();
    let err = session
        .select_file(FileSelection::path(&input))
        .await
        .unwrap_err();

    assert!(matches!(err, ProPhotoError::InvalidInput(_)));
    assert_eq!(*rx.borrow_and_update(), SessionStatus::Error);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Error);
    assert_eq!(snapshot.error.as_deref(), Some(INVALID_FILE_MESSAGE));
}

#[tokio::test]
async fn test_network_failure_sets_generic_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let config = Config::new("test-api-key").unwrap().with_base_url(uri);
    let session = Session::new(GeminiTransformer::builder(config).build().unwrap());

    let err = session
        .select_file(FileSelection::memory("me.png", "image/png", png_bytes()))
        .await
        .unwrap_err();

    assert!(matches!(err, ProPhotoError::Network(_)));
    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Error);
    assert_eq!(snapshot.error.as_deref(), Some(TRANSFORM_FAILED_MESSAGE));
    assert!(snapshot.result.is_none());
}

#[tokio::test]
async fn test_api_error_and_empty_response_collapse_to_same_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"code": 500, "message": "Internal error", "status": "INTERNAL"}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Sorry, no image."}]}}]
        })))
        .mount(&server)
        .await;

    let session = session_for(&server);

    let err = session
        .select_file(FileSelection::memory("me.png", "image/png", png_bytes()))
        .await
        .unwrap_err();
    match err {
        ProPhotoError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal error");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        session.snapshot().error.as_deref(),
        Some(TRANSFORM_FAILED_MESSAGE)
    );

    let err = session
        .select_file(FileSelection::memory("me.png", "image/png", png_bytes()))
        .await
        .unwrap_err();
    assert!(matches!(err, ProPhotoError::NoImage(_)));
    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Error);
    assert_eq!(snapshot.error.as_deref(), Some(TRANSFORM_FAILED_MESSAGE));
}

#[tokio::test]
async fn test_reset_aborts_slow_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(image_response(&png_bytes()))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let session = session_for(&server);
    let mut rx = session.subscribe();
    let running = tokio::spawn({
        let session = session.clone();
        async move {
            session
                .select_file(FileSelection::memory("me.png", "image/png", png_bytes()))
                .await
        }
    });
    rx.wait_for(|s| *s == SessionStatus::Generating).await.unwrap();

    session.reset();
    let outcome = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(outcome, Err(ProPhotoError::Cancelled)));
    assert_eq!(session.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn test_timeout_surfaces_as_transform_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(image_response(&png_bytes()))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let config = Config::new("test-api-key")
        .unwrap()
        .with_base_url(server.uri())
        .with_timeout(Duration::from_millis(200));
    let session = Session::new(GeminiTransformer::builder(config).build().unwrap());

    let err = session
        .select_file(FileSelection::memory("me.png", "image/png", png_bytes()))
        .await
        .unwrap_err();
    assert!(matches!(err, ProPhotoError::Network(_)));
    assert_eq!(
        session.snapshot().error.as_deref(),
        Some(TRANSFORM_FAILED_MESSAGE)
    );
}

#[tokio::test]
async fn test_health_check_rejects_bad_key() {
    use prophoto::Transformer;

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models/gemini-2.5-flash-image"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let config = Config::new("bad-key").unwrap().with_base_url(server.uri());
    let transformer = GeminiTransformer::builder(config).build().unwrap();
    assert!(matches!(
        transformer.health_check().await,
        Err(ProPhotoError::Auth(_))
    ));
}
