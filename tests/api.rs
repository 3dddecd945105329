use actix_web::{http::header, http::StatusCode, test, web, App};
use fluxgate::{
    server::{self, AppState, ProcessTime},
    Config, FluxConfig, ImageStore, InMemoryImageStore, StorageConfig,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ID: &str = "9b2e4f7a-1c3d-4e5f-8a9b-0c1d2e3f4a5b";
const BOUNDARY: &str = "fluxgate-test-boundary";

fn test_state(flux_base: &str, upload_dir: &Path) -> (web::Data<AppState>, Arc<InMemoryImageStore>) {
    let store = Arc::new(InMemoryImageStore::new());
    let config = Config::new(
        FluxConfig::new("test-key")
            .with_base_url(flux_base)
            .with_polling(Duration::from_millis(5), 15),
    )
    .with_storage(StorageConfig::new().with_upload_dir(upload_dir));
    let state = web::Data::new(AppState::new(config, store.clone()));
    (state, store)
}

fn multipart_body(filename: &str, content_type: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            BOUNDARY, filename, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(id: &str, filename: &str, content: &[u8]) -> test::TestRequest {
    test::TestRequest::post()
        .uri(&format!("/v1/upload/{}", id))
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart_body(filename, "image/png", content))
}

fn generate_request(model: Option<&str>, body: Value) -> test::TestRequest {
    let uri = match model {
        Some(model) => format!("/v1/generate-image?model={}", model),
        None => "/v1/generate-image".to_string(),
    };
    test::TestRequest::post().uri(&uri).set_json(body)
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .wrap(ProcessTime)
                .configure(server::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn test_upload_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let (state, store) = test_state("http://127.0.0.1:1", tmp.path());
    let app = init_app!(state);

    let content = b"\x89PNG\r\n\x1a\nfake image bytes".to_vec();
    let resp = test::call_service(&app, upload_request(ID, "sunset.png", &content).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-process-time"));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], ID);
    assert_eq!(body["filename"], format!("{}.png", ID));
    let url = body["url"].as_str().unwrap();
    assert_eq!(url, format!("http://localhost:8000/uploads/{}.png", ID));
    assert!(store.get(ID).await.unwrap().is_some());

    let path = url.trim_start_matches("http://localhost:8000");
    let resp = test::call_service(&app, test::TestRequest::get().uri(path).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let served = test::read_body(resp).await;
    assert_eq!(served.as_ref(), content.as_slice());
}

#[actix_web::test]
async fn test_upload_rejects_executable() {
    let tmp = tempfile::tempdir().unwrap();
    let upload_dir = tmp.path().join("uploads");
    let (state, store) = test_state("http://127.0.0.1:1", &upload_dir);
    let app = init_app!(state);

    let resp = test::call_service(&app, upload_request(ID, "photo.exe", b"MZ").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["detail"].as_str().unwrap().contains("not allowed"));

    assert!(!upload_dir.exists());
    assert_eq!(store.len().await, 0);
}

#[actix_web::test]
async fn test_upload_too_large_rejected_while_streaming() {
    let tmp = tempfile::tempdir().unwrap();
    let upload_dir = tmp.path().join("uploads");
    let store = Arc::new(InMemoryImageStore::new());
    let config = Config::new(FluxConfig::new("test-key")).with_storage(
        StorageConfig::new()
            .with_upload_dir(&upload_dir)
            .with_max_file_size(4),
    );
    let state = web::Data::new(AppState::new(config, store.clone()));
    let app = init_app!(state);

    let resp = test::call_service(&app, upload_request(ID, "big.png", b"12345").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("File too large"));

    assert!(!upload_dir.exists());
    assert_eq!(store.len().await, 0);

    let resp = test::call_service(&app, upload_request(ID, "ok.png", b"1234").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_upload_duplicate_id() {
    let tmp = tempfile::tempdir().unwrap();
    let (state, _store) = test_state("http://127.0.0.1:1", tmp.path());
    let app = init_app!(state);

    let first = test::call_service(&app, upload_request(ID, "a.png", b"first").to_request()).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = test::call_service(&app, upload_request(ID, "b.png", b"second").to_request()).await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(second).await;
    assert!(body["detail"].as_str().unwrap().contains("already exists"));

    let stored = std::fs::read(tmp.path().join(format!("{}.png", ID))).unwrap();
    assert_eq!(stored, b"first");
}

#[actix_web::test]
async fn test_upload_invalid_id_and_missing_file() {
    let tmp = tempfile::tempdir().unwrap();
    let (state, _store) = test_state("http://127.0.0.1:1", tmp.path());
    let app = init_app!(state);

    let resp = test::call_service(&app, upload_request("not-a-uuid", "a.png", b"x").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let empty = test::TestRequest::post()
        .uri(&format!("/v1/upload/{}", ID))
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(format!("--{}--\r\n", BOUNDARY))
        .to_request();
    let resp = test::call_service(&app, empty).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_serve_upload_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let (state, _store) = test_state("http://127.0.0.1:1", tmp.path());
    let app = init_app!(state);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/uploads/missing.png").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_generate_ready_returns_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/flux-dev"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "t-1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_result"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "t-1",
            "status": "Ready",
            "result": { "sample": format!("{}/delivery/t-1.jpg", server.uri()) }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/delivery/t-1.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"JFIF-bytes".to_vec()))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let (state, _store) = test_state(&server.uri(), tmp.path());
    let app = init_app!(state);

    let resp = test::call_service(
        &app,
        generate_request(Some("flux-dev"), json!({ "prompt": "a harbor at dawn" })).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/jpeg"
    );
    assert_eq!(test::read_body(resp).await.as_ref(), b"JFIF-bytes");
}

#[actix_web::test]
async fn test_generate_maps_provider_statuses() {
    let cases = [
        ("Task not found", StatusCode::NOT_FOUND, "Task not found"),
        (
            "Request Moderated",
            StatusCode::BAD_REQUEST,
            "Request was moderated due to content policy",
        ),
        (
            "Content Moderated",
            StatusCode::BAD_REQUEST,
            "Generated content was moderated due to content policy",
        ),
        ("Error", StatusCode::INTERNAL_SERVER_ERROR, "Image generation failed"),
        (
            "Pending",
            StatusCode::REQUEST_TIMEOUT,
            "Timeout waiting for image generation",
        ),
    ];

    for (status, expected_code, expected_body) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/flux-pro-1.1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "t-2" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get_result"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": status })))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let (state, _store) = test_state(&server.uri(), tmp.path());
        let app = init_app!(state);

        let resp = test::call_service(&app, generate_request(None, json!({ "prompt": "x" })).to_request()).await;
        assert_eq!(resp.status(), expected_code, "status {}", status);
        let body = test::read_body(resp).await;
        assert_eq!(body.as_ref(), expected_body.as_bytes());
    }
}

#[actix_web::test]
async fn test_generate_missing_task_id_is_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/flux-pro-1.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "detail": "quota" })))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let (state, _store) = test_state(&server.uri(), tmp.path());
    let app = init_app!(state);

    let resp = test::call_service(&app, generate_request(None, json!({ "prompt": "x" })).to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.starts_with("Error generating image:"));
    assert!(body.contains("Failed to start image generation"));
    assert!(body.contains("quota"));
}

#[actix_web::test]
async fn test_generate_rejects_invalid_input() {
    let tmp = tempfile::tempdir().unwrap();
    let (state, _store) = test_state("http://127.0.0.1:1", tmp.path());
    let app = init_app!(state);

    let resp = test::call_service(
        &app,
        generate_request(Some("flux-turbo"), json!({ "prompt": "x" })).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(
        &app,
        generate_request(None, json!({ "prompt": "x", "width": 4096 })).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(
        &app,
        generate_request(None, json!({ "prompt": "x", "output_format": "bmp" })).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_health() {
    let tmp = tempfile::tempdir().unwrap();
    let (state, _store) = test_state("http://127.0.0.1:1", tmp.path());
    let app = init_app!(state);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}
