//! Web service routes, driven in-process with scripted API stand-ins.

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::Router;
use frflashy::auth::{self, SessionStore};
use frflashy::client::{ClientError, SpeechSynthesizer, Transcriber, Tutor};
use frflashy::config::SiteConfig;
use frflashy::server::{AppState, create_router};
use frflashy::store::{Database, NewUser, Tier};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

struct Heard(&'static str);

impl Transcriber for Heard {
    fn transcribe(&self, _audio: &[u8], _filename: &str) -> Result<String, ClientError> {
        Ok(self.0.to_string())
    }
}

struct Coach;

impl Tutor for Coach {
    fn pronunciation_feedback(&self, expected: &str, heard: &str) -> Result<String, ClientError> {
        Ok(format!("Close! '{heard}' should be '{expected}'."))
    }
}

struct Beep;

impl SpeechSynthesizer for Beep {
    fn synthesize_speech(&self, _text: &str, _voice: &str, _format: &str) -> Result<Vec<u8>, ClientError> {
        Ok(b"ID3beep".to_vec())
    }
}

struct TestServer {
    _recordings: TempDir,
    state: Arc<AppState>,
    app: Router,
}

fn test_server(heard: &'static str) -> TestServer {
    test_server_with(heard, SessionStore::new())
}

fn test_server_with(heard: &'static str, sessions: SessionStore) -> TestServer {
    let recordings = TempDir::new().unwrap();
    let state = Arc::new(AppState {
        config: SiteConfig::default(),
        recordings_dir: recordings.path().to_path_buf(),
        db: Database::open_in_memory().unwrap(),
        transcriber: Arc::new(Heard(heard)),
        tutor: Arc::new(Coach),
        speech: Arc::new(Beep),
        sessions,
    });
    let app = create_router(Arc::clone(&state));
    TestServer {
        _recordings: recordings,
        state,
        app,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn location(headers: &axum::http::HeaderMap) -> &str {
    headers.get(header::LOCATION).unwrap().to_str().unwrap()
}

// =========================================================================
// JSON API
// =========================================================================

#[tokio::test]
async fn liveness_routes() {
    let server = test_server("");
    let (status, json) = get_json(&server.app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "API root is alive.");

    let (_, json) = get_json(&server.app, "/hello").await;
    assert_eq!(json["message"], "Hello from frflashy!");

    let (status, json) = get_json(&server.app, "/time").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["now"].as_str().is_some_and(|s| !s.is_empty()));
}

#[tokio::test]
async fn examples_requires_expression() {
    let server = test_server("");
    for uri in ["/examples", "/examples?expression=", "/examples?expression=%20%20"] {
        let (status, json) = get_json(&server.app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["error"], "missing expression parameter");
        assert_eq!(json["status"], "fail");
    }
}

#[tokio::test]
async fn examples_returns_stored_rows_only() {
    let server = test_server("");
    let (status, json) = get_json(&server.app, "/examples?expression=le%20manteau").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["expression"], "le manteau");
    assert_eq!(json["examples"], serde_json::json!([]));

    server
        .state
        .db
        .insert_example_if_new("le manteau", "Je porte un manteau.", "I wear a coat.")
        .unwrap();
    let (_, json) = get_json(&server.app, "/examples?expression=le%20manteau").await;
    assert_eq!(
        json["examples"],
        serde_json::json!([{ "french": "Je porte un manteau.", "english": "I wear a coat." }])
    );
}

// =========================================================================
// Recordings
// =========================================================================

fn upload_request(filename: &str, expected: &str) -> Request<Body> {
    let boundary = "frflashy-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"audio\"; filename=\"{filename}\"\r\n\
         Content-Type: audio/wav\r\n\r\n\
         RIFFfake\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"expected_text\"\r\n\r\n\
         {expected}\r\n\
         --{boundary}--\r\n"
    );
    Request::post("/upload-audio")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn upload_transcribes_and_praises_a_match() {
    let server = test_server("Bonjour.");
    let (status, _, body) = send(&server.app, upload_request("take1.wav", "bonjour")).await;
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["filename"], "take1.wav");
    assert_eq!(json["transcription"], "Bonjour.");
    assert_eq!(json["expected"], "bonjour");
    assert!(!json["feedback"].as_str().unwrap().starts_with("Close!"));
    assert!(server.state.recordings_dir.join("take1.wav").is_file());
}

#[tokio::test]
async fn upload_mismatch_asks_tutor() {
    let server = test_server("bonsoir");
    let (_, _, body) = send(&server.app, upload_request("take2.wav", "bonjour")).await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["feedback"], "Close! 'bonsoir' should be 'bonjour'.");
}

#[tokio::test]
async fn upload_without_audio_is_rejected() {
    let server = test_server("");
    let boundary = "b";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"expected_text\"\r\n\r\nbonjour\r\n--{boundary}--\r\n"
    );
    let request = Request::post("/upload-audio")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap();
    let (status, _, body) = send(&server.app, request).await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No audio file");
}

#[tokio::test]
async fn recordings_list_and_delete() {
    let server = test_server("oui");
    send(&server.app, upload_request("take1.wav", "")).await;

    let (_, json) = get_json(&server.app, "/recordings").await;
    assert_eq!(json["recordings"][0]["filename"], "take1.wav");
    assert_eq!(json["recordings"][0]["size"], 8);

    let delete = |uri: &str| Request::delete(uri).body(Body::empty()).unwrap();

    let (status, _, body) = send(&server.app, delete("/recordings/take1.wav")).await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Deleted take1.wav");

    let (status, _, body) = send(&server.app, delete("/recordings/take1.wav")).await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "File not found");

    let (status, _, _) = send(&server.app, delete("/recordings/..%2Fsecret.wav")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =========================================================================
// Pronunciation audio
// =========================================================================

fn pronounce_request(body: &str) -> Request<Body> {
    Request::post("/pronounce")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn pronounce_returns_mp3() {
    let server = test_server("");
    let (status, headers, body) = send(&server.app, pronounce_request(r#"{"text": "le chat"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "audio/mpeg");
    assert_eq!(body, b"ID3beep");
}

#[tokio::test]
async fn pronounce_rejects_empty_text() {
    let server = test_server("");
    for payload in [r#"{"text": "  "}"#, "{}"] {
        let (status, _, body) = send(&server.app, pronounce_request(payload)).await;
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No text provided");
    }
}

// =========================================================================
// Accounts
// =========================================================================

fn add_user(server: &TestServer, username: &str, password: &str) {
    let password_hash = auth::hash_password_with(password, 1_000).unwrap();
    server
        .state
        .db
        .insert_user(&NewUser {
            username,
            email: &format!("{username}@example.com"),
            password_hash: &password_hash,
            tier: Tier::Basic,
        })
        .unwrap();
}

fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::post("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={username}&password={password}")))
        .unwrap()
}

fn with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn dashboard_requires_session() {
    let server = test_server("");
    let (status, headers, _) = send(&server.app, Request::get("/dashboard").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/login");
}

#[tokio::test]
async fn wrong_password_rerenders_login() {
    let server = test_server("");
    add_user(&server, "marie", "secret");

    let (status, headers, body) = send(&server.app, login_request("marie", "nope")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(headers.get(header::SET_COOKIE).is_none());
    assert!(String::from_utf8(body).unwrap().contains("Invalid username or password"));
    assert!(server.state.sessions.is_empty());
}

#[tokio::test]
async fn login_dashboard_logout_flow() {
    let server = test_server("");
    add_user(&server, "marie", "secret");

    let (status, headers, _) = send(&server.app, login_request("marie", "secret")).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/dashboard");
    let set_cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    let cookie = set_cookie.split(';').next().unwrap().to_string();
    assert!(cookie.starts_with("frflashy_session="));
    assert!(set_cookie.contains("Max-Age=43200"));

    let (status, _, body) = send(&server.app, with_cookie("/dashboard", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("Bienvenue, marie"));
    assert!(html.contains("basic"));

    let (status, headers, _) = send(&server.app, with_cookie("/login", &cookie)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/dashboard");

    let (_, headers, _) = send(&server.app, with_cookie("/logout", &cookie)).await;
    assert_eq!(location(&headers), "/login");
    assert!(server.state.sessions.is_empty());

    let (status, _, _) = send(&server.app, with_cookie("/dashboard", &cookie)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn expired_session_redirects_to_login() {
    let server = test_server_with("", SessionStore::with_ttl(Duration::ZERO));
    add_user(&server, "marie", "secret");

    let (_, headers, _) = send(&server.app, login_request("marie", "secret")).await;
    let set_cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    let cookie = set_cookie.split(';').next().unwrap().to_string();

    let (status, headers, _) = send(&server.app, with_cookie("/dashboard", &cookie)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/login");
    assert!(server.state.sessions.is_empty());
}
