//! The assembled application: UI and proxy behind their own upload caps.

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use plant_doctor::config::{Config, GatewayConfig};
use plant_doctor::intake::data_uri;
use plant_doctor::proxy::ALLOW_HEADERS;
use plant_doctor::web::{self, SESSION_COOKIE};
use plant_doctor::Backend;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MAX_UPLOAD: usize = 4096;
const BOUNDARY: &str = "plantdoctorboundary";

fn app_for(gateway: &MockServer) -> Router {
    web::app(&Config {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        backend: Backend::Inference {
            url: "http://127.0.0.1:9/predict".to_string(),
        },
        gateway: GatewayConfig {
            url: format!("{}/v1/chat/completions", gateway.uri()),
            model: "google/gemini-2.5-flash".to_string(),
            api_key: Some("test-key".to_string()),
        },
        max_upload_bytes: MAX_UPLOAD,
    })
}

fn leaf_bytes(len: usize) -> Vec<u8> {
    let mut bytes = b"\xff\xd8\xff\xe0".to_vec();
    bytes.resize(len, 0x5a);
    bytes
}

fn analyze_plant(image_base64: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze-plant")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "imageBase64": image_base64 }).to_string(),
        ))
        .unwrap()
}

async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_proxy_accepts_encoded_image_near_the_upload_cap() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "Healthy" } }]
        })))
        .expect(1)
        .mount(&gateway)
        .await;

    let image = data_uri("image/jpeg", &leaf_bytes(3633));
    assert!(image.len() > MAX_UPLOAD);

    let response = app_for(&gateway)
        .oneshot(analyze_plant(image))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "diagnosis": "Healthy" })
    );
}

#[tokio::test]
async fn test_proxy_rejects_oversized_body_as_json() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&gateway)
        .await;

    let image = data_uri("image/jpeg", &leaf_bytes(MAX_UPLOAD * 2));
    let response = app_for(&gateway)
        .oneshot(analyze_plant(image))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], ALLOW_HEADERS);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "error": "image too large" })
    );
}

#[tokio::test]
async fn test_ui_upload_over_the_cap_is_reported() {
    let gateway = MockServer::start().await;
    let app = app_for(&gateway);
    let cookie = format!("{}={}", SESSION_COOKIE, Uuid::new_v4());

    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"leaf.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(&leaf_bytes(MAX_UPLOAD * 2));
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/select")
                .header(header::COOKIE, &cookie)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let html = String::from_utf8(
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec(),
    )
    .unwrap();
    assert!(html.contains("The upload could not be read"));
    assert!(html.contains("Upload Plant Image"));
}

#[tokio::test]
async fn test_healthz_is_served() {
    let gateway = MockServer::start().await;
    let response = app_for(&gateway)
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
