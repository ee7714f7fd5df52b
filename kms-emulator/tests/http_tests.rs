//! HTTP transport tests driven through the router without a socket

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use kms_core::{AesGcmEngine, KmsService, MemoryStore, RequestContext};
use kms_emulator::http::{router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const LOCATION: &str = "/v1/projects/demo/locations/global";
const RING: &str = "/v1/projects/demo/locations/global/keyRings/app";
const KEY: &str = "/v1/projects/demo/locations/global/keyRings/app/cryptoKeys/data";

fn app() -> Router {
    let service = KmsService::new(Arc::new(MemoryStore::new()), Arc::new(AesGcmEngine::new()));
    router(AppState::new(Arc::new(service)))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn provision(app: &Router) {
    let (status, _) = call(
        app,
        Method::POST,
        &format!("{}/keyRings?keyRingId=app", LOCATION),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        app,
        Method::POST,
        &format!("{}/cryptoKeys?cryptoKeyId=data", RING),
        Some(json!({ "purpose": "ENCRYPT_DECRYPT", "labels": { "team": "payments" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let (status, body) = call(&app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_key_ring_lifecycle() {
    let app = app();
    provision(&app).await;

    let (status, body) = call(&app, Method::GET, RING, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "projects/demo/locations/global/keyRings/app");
    assert!(body["createTime"].is_string());

    let (status, body) = call(&app, Method::GET, &format!("{}/keyRings", LOCATION), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["keyRings"].as_array().unwrap().len(), 1);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("{}/keyRings?keyRingId=app", LOCATION),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["status"], "ALREADY_EXISTS");
    assert_eq!(body["error"]["code"], 409);
}

#[tokio::test]
async fn test_crypto_key_resource() {
    let app = app();
    provision(&app).await;

    let (status, body) = call(&app, Method::GET, KEY, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["purpose"], "ENCRYPT_DECRYPT");
    assert_eq!(body["labels"]["team"], "payments");
    assert_eq!(
        body["primary"]["name"],
        "projects/demo/locations/global/keyRings/app/cryptoKeys/data/cryptoKeyVersions/1"
    );
    assert_eq!(body["primary"]["state"], "ENABLED");

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("{}/cryptoKeys", RING),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cryptoKeys"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_crypto_key_errors() {
    let app = app();
    provision(&app).await;

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("{}/cryptoKeys?cryptoKeyId=signer", RING),
        Some(json!({ "purpose": "ASYMMETRIC_SIGN" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["status"], "INVALID_ARGUMENT");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("{}/cryptoKeys?cryptoKeyId=nobody", RING),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "crypto_key is required");

    let (status, _) = call(
        &app,
        Method::POST,
        "/v1/projects/demo/locations/global/keyRings/missing/cryptoKeys?cryptoKeyId=k",
        Some(json!({ "purpose": "ENCRYPT_DECRYPT" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_encrypt_decrypt_round_trip() {
    let app = app();
    provision(&app).await;

    let (status, encrypted) = call(
        &app,
        Method::POST,
        &format!("{}:encrypt", KEY),
        Some(json!({
            "plaintext": STANDARD.encode(b"hello kms"),
            "additionalAuthenticatedData": STANDARD.encode(b"ctx"),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(encrypted["name"]
        .as_str()
        .unwrap()
        .ends_with("/cryptoKeyVersions/1"));
    assert_eq!(encrypted["verifiedPlaintextCrc32c"], false);
    assert!(encrypted["ciphertextCrc32c"].is_i64());

    let (status, decrypted) = call(
        &app,
        Method::POST,
        &format!("{}:decrypt", KEY),
        Some(json!({
            "ciphertext": encrypted["ciphertext"],
            "ciphertextCrc32c": encrypted["ciphertextCrc32c"],
            "additionalAuthenticatedData": STANDARD.encode(b"ctx"),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let plaintext = STANDARD
        .decode(decrypted["plaintext"].as_str().unwrap())
        .unwrap();
    assert_eq!(plaintext, b"hello kms");
    assert_eq!(decrypted["usedPrimary"], true);
}

#[tokio::test]
async fn test_checksum_mismatch_is_bad_request() {
    let app = app();
    provision(&app).await;

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("{}:encrypt", KEY),
        Some(json!({
            "plaintext": STANDARD.encode(b"payload"),
            "plaintextCrc32c": 12345,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "checksum mismatch");
}

#[tokio::test]
async fn test_versions_and_primary_rotation() {
    let app = app();
    provision(&app).await;

    let (status, version) = call(
        &app,
        Method::POST,
        &format!("{}/cryptoKeyVersions", KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(version["name"]
        .as_str()
        .unwrap()
        .ends_with("/cryptoKeyVersions/2"));

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("{}/cryptoKeyVersions/2", KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, version);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("{}:updatePrimaryVersion", KEY),
        Some(json!({ "cryptoKeyVersionId": "2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["primary"]["name"], version["name"]);

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("{}/cryptoKeyVersions", KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cryptoKeyVersions"].as_array().unwrap().len(), 2);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("{}:updatePrimaryVersion", KEY),
        Some(json!({ "cryptoKeyVersionId": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "crypto_key_version_id is required");
}

#[tokio::test]
async fn test_page_token_is_not_implemented() {
    let app = app();
    provision(&app).await;

    for uri in [
        format!("{}/keyRings?pageToken=abc", LOCATION),
        format!("{}/cryptoKeys?pageToken=abc", RING),
        format!("{}/cryptoKeyVersions?pageToken=abc", KEY),
    ] {
        let (status, body) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED, "{}", uri);
        assert_eq!(body["error"]["status"], "UNIMPLEMENTED");
    }
}

#[tokio::test]
async fn test_unknown_paths_and_methods() {
    let app = app();
    provision(&app).await;

    let (status, _) = call(&app, Method::POST, &format!("{}:rotate", KEY), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::POST, KEY, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, Method::GET, "/v2/nothing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["status"], "NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_base64_is_bad_request() {
    let app = app();
    provision(&app).await;

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("{}:decrypt", KEY),
        Some(json!({ "ciphertext": "not base64!" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["status"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_cancelled_requests_report_499() {
    let service = KmsService::new(Arc::new(MemoryStore::new()), Arc::new(AesGcmEngine::new()));
    let root = RequestContext::background();
    root.cancel();
    let app = router(AppState::new(Arc::new(service)).with_root_context(root));

    let (status, body) = call(&app, Method::GET, &format!("{}/keyRings", LOCATION), None).await;
    assert_eq!(status.as_u16(), 499);
    assert_eq!(body["error"]["status"], "CANCELLED");
}
