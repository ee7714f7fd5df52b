//! HTTP/JSON transport for the KMS service
//!
//! Mirrors the Cloud KMS REST v1 resource paths. Custom methods use the
//! `{name}:{verb}` form, e.g. `POST .../cryptoKeys/app:encrypt`. Byte fields
//! travel as standard base64 and checksums as JSON integers.
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use kms_core::{
    CreateCryptoKeyRequest, CreateCryptoKeyVersionRequest, CreateKeyRingRequest, CryptoKey,
    CryptoKeySpec, CryptoKeyVersion, DecryptRequest, EncryptRequest, ErrorKind,
    GetCryptoKeyRequest, GetCryptoKeyVersionRequest, GetKeyRingRequest, KeyManagementService,
    KeyRing, KmsError, ListCryptoKeyVersionsRequest, ListCryptoKeyVersionsResponse,
    ListCryptoKeysRequest, ListCryptoKeysResponse, ListKeyRingsRequest, ListKeyRingsResponse,
    RequestContext, UpdateCryptoKeyPrimaryVersionRequest,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Status used for requests aborted by cancellation or deadline
const STATUS_CLIENT_CLOSED_REQUEST: u16 = 499;

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    service: Arc<dyn KeyManagementService>,
    root: RequestContext,
    request_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(service: Arc<dyn KeyManagementService>) -> Self {
        Self {
            service,
            root: RequestContext::background(),
            request_timeout: None,
        }
    }

    /// Derive every request context from `root`; cancelling it aborts all requests
    pub fn with_root_context(mut self, root: RequestContext) -> Self {
        self.root = root;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn request_context(&self) -> RequestContext {
        let ctx = self.root.child();
        match self.request_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }
}

/// Build the router exposing the KMS operations plus `/health`
pub fn router(state: AppState) -> Router {
    const LOCATION: &str = "/v1/projects/:project/locations/:location";

    Router::new()
        .route("/health", get(health_check))
        .route(
            &format!("{}/keyRings", LOCATION),
            get(list_key_rings).post(create_key_ring),
        )
        .route(&format!("{}/keyRings/:key_ring", LOCATION), get(get_key_ring))
        .route(
            &format!("{}/keyRings/:key_ring/cryptoKeys", LOCATION),
            get(list_crypto_keys).post(create_crypto_key),
        )
        .route(
            &format!("{}/keyRings/:key_ring/cryptoKeys/:crypto_key", LOCATION),
            get(get_crypto_key).post(crypto_key_method),
        )
        .route(
            &format!(
                "{}/keyRings/:key_ring/cryptoKeys/:crypto_key/cryptoKeyVersions",
                LOCATION
            ),
            get(list_crypto_key_versions).post(create_crypto_key_version),
        )
        .route(
            &format!(
                "{}/keyRings/:key_ring/cryptoKeys/:crypto_key/cryptoKeyVersions/:version",
                LOCATION
            ),
            get(get_crypto_key_version),
        )
        .fallback(unknown_route)
        .with_state(state)
}

/// KMS error rendered as `{"error": {"code", "message", "status"}}`
#[derive(Debug)]
pub struct ApiError(KmsError);

impl From<KmsError> for ApiError {
    fn from(err: KmsError) -> Self {
        ApiError(err)
    }
}

/// HTTP status for an error kind
pub fn status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArgument | ErrorKind::FailedPrecondition => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Cancelled => StatusCode::from_u16(STATUS_CLIENT_CLOSED_REQUEST)
            .unwrap_or(StatusCode::REQUEST_TIMEOUT),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_code(kind);

        if kind == ErrorKind::Internal {
            error!(status = kind.as_str(), error = %self.0, "Request failed");
        } else {
            warn!(status = kind.as_str(), error = %self.0, "Request failed");
        }

        let body = json!({
            "error": {
                "code": status.as_u16(),
                "message": self.0.message(),
                "status": kind.as_str(),
            }
        });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<Option<T>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| KmsError::InvalidArgument(format!("invalid request body: {}", e)).into())
}

#[derive(Debug, Deserialize)]
struct LocationPath {
    project: String,
    location: String,
}

impl LocationPath {
    fn name(&self) -> String {
        format!("projects/{}/locations/{}", self.project, self.location)
    }
}

#[derive(Debug, Deserialize)]
struct KeyRingPath {
    project: String,
    location: String,
    key_ring: String,
}

impl KeyRingPath {
    fn name(&self) -> String {
        format!(
            "projects/{}/locations/{}/keyRings/{}",
            self.project, self.location, self.key_ring
        )
    }
}

#[derive(Debug, Deserialize)]
struct CryptoKeyPath {
    project: String,
    location: String,
    key_ring: String,
    crypto_key: String,
}

impl CryptoKeyPath {
    fn key_ring_name(&self) -> String {
        format!(
            "projects/{}/locations/{}/keyRings/{}",
            self.project, self.location, self.key_ring
        )
    }

    fn name(&self) -> String {
        format!("{}/cryptoKeys/{}", self.key_ring_name(), self.crypto_key)
    }
}

#[derive(Debug, Deserialize)]
struct CryptoKeyVersionPath {
    project: String,
    location: String,
    key_ring: String,
    crypto_key: String,
    version: String,
}

impl CryptoKeyVersionPath {
    fn name(&self) -> String {
        format!(
            "projects/{}/locations/{}/keyRings/{}/cryptoKeys/{}/cryptoKeyVersions/{}",
            self.project, self.location, self.key_ring, self.crypto_key, self.version
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    #[serde(default)]
    page_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateKeyRingQuery {
    #[serde(default)]
    key_ring_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCryptoKeyQuery {
    #[serde(default)]
    crypto_key_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePrimaryVersionBody {
    #[serde(default)]
    crypto_key_version_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncryptBody {
    #[serde(default, with = "base64_bytes")]
    plaintext: Vec<u8>,
    #[serde(default, with = "base64_bytes")]
    additional_authenticated_data: Vec<u8>,
    #[serde(default)]
    plaintext_crc32c: Option<i64>,
    #[serde(default)]
    additional_authenticated_data_crc32c: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EncryptResponseBody {
    name: String,
    #[serde(with = "base64_bytes")]
    ciphertext: Vec<u8>,
    ciphertext_crc32c: i64,
    verified_plaintext_crc32c: bool,
    verified_additional_authenticated_data_crc32c: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecryptBody {
    #[serde(default, with = "base64_bytes")]
    ciphertext: Vec<u8>,
    #[serde(default, with = "base64_bytes")]
    additional_authenticated_data: Vec<u8>,
    #[serde(default)]
    ciphertext_crc32c: Option<i64>,
    #[serde(default)]
    additional_authenticated_data_crc32c: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DecryptResponseBody {
    #[serde(with = "base64_bytes")]
    plaintext: Vec<u8>,
    plaintext_crc32c: i64,
    used_primary: bool,
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(bytes: T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AsRef<[u8]>,
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes.as_ref()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(de::Error::custom)
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "kms-emulator",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn unknown_route() -> ApiError {
    KmsError::NotFound("no such resource path".to_string()).into()
}

async fn create_key_ring(
    State(state): State<AppState>,
    Path(path): Path<LocationPath>,
    Query(query): Query<CreateKeyRingQuery>,
) -> ApiResult<KeyRing> {
    let ctx = state.request_context();
    let key_ring = state
        .service
        .create_key_ring(
            &ctx,
            CreateKeyRingRequest {
                parent: path.name(),
                key_ring_id: query.key_ring_id,
            },
        )
        .await?;
    Ok(Json(key_ring))
}

async fn list_key_rings(
    State(state): State<AppState>,
    Path(path): Path<LocationPath>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListKeyRingsResponse> {
    let ctx = state.request_context();
    let response = state
        .service
        .list_key_rings(
            &ctx,
            ListKeyRingsRequest {
                parent: path.name(),
                page_token: query.page_token,
            },
        )
        .await?;
    Ok(Json(response))
}

async fn get_key_ring(
    State(state): State<AppState>,
    Path(path): Path<KeyRingPath>,
) -> ApiResult<KeyRing> {
    let ctx = state.request_context();
    let key_ring = state
        .service
        .get_key_ring(&ctx, GetKeyRingRequest { name: path.name() })
        .await?;
    Ok(Json(key_ring))
}

async fn create_crypto_key(
    State(state): State<AppState>,
    Path(path): Path<KeyRingPath>,
    Query(query): Query<CreateCryptoKeyQuery>,
    body: Bytes,
) -> ApiResult<CryptoKey> {
    let spec: Option<CryptoKeySpec> = parse_body(&body)?;
    let ctx = state.request_context();
    let crypto_key = state
        .service
        .create_crypto_key(
            &ctx,
            CreateCryptoKeyRequest {
                parent: path.name(),
                crypto_key_id: query.crypto_key_id,
                crypto_key: spec,
            },
        )
        .await?;
    Ok(Json(crypto_key))
}

async fn list_crypto_keys(
    State(state): State<AppState>,
    Path(path): Path<KeyRingPath>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListCryptoKeysResponse> {
    let ctx = state.request_context();
    let response = state
        .service
        .list_crypto_keys(
            &ctx,
            ListCryptoKeysRequest {
                parent: path.name(),
                page_token: query.page_token,
            },
        )
        .await?;
    Ok(Json(response))
}

async fn get_crypto_key(
    State(state): State<AppState>,
    Path(path): Path<CryptoKeyPath>,
) -> ApiResult<CryptoKey> {
    let ctx = state.request_context();
    let crypto_key = state
        .service
        .get_crypto_key(&ctx, GetCryptoKeyRequest { name: path.name() })
        .await?;
    Ok(Json(crypto_key))
}

/// Dispatch `POST .../cryptoKeys/{id}:{verb}`
async fn crypto_key_method(
    State(state): State<AppState>,
    Path(mut path): Path<CryptoKeyPath>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let (crypto_key, verb) = match path.crypto_key.split_once(':') {
        Some((crypto_key, verb)) => (crypto_key.to_string(), verb.to_string()),
        None => {
            return Err(KmsError::NotFound(format!(
                "no method on crypto key {:?}; expected {{id}}:{{verb}}",
                path.crypto_key
            ))
            .into())
        }
    };
    path.crypto_key = crypto_key;

    match verb.as_str() {
        "encrypt" => Ok(encrypt(state, path.name(), parse_body(&body)?.unwrap_or_default())
            .await?
            .into_response()),
        "decrypt" => Ok(decrypt(state, path.name(), parse_body(&body)?.unwrap_or_default())
            .await?
            .into_response()),
        "updatePrimaryVersion" => Ok(update_primary_version(
            state,
            path.name(),
            parse_body(&body)?.unwrap_or_default(),
        )
        .await?
        .into_response()),
        other => Err(KmsError::NotFound(format!("unknown method {:?}", other)).into()),
    }
}

async fn encrypt(
    state: AppState,
    name: String,
    body: EncryptBody,
) -> ApiResult<EncryptResponseBody> {
    let ctx = state.request_context();
    let response = state
        .service
        .encrypt(
            &ctx,
            EncryptRequest {
                name,
                plaintext: body.plaintext,
                additional_authenticated_data: body.additional_authenticated_data,
                plaintext_crc32c: body.plaintext_crc32c,
                additional_authenticated_data_crc32c: body.additional_authenticated_data_crc32c,
            },
        )
        .await?;
    Ok(Json(EncryptResponseBody {
        name: response.name,
        ciphertext: response.ciphertext,
        ciphertext_crc32c: response.ciphertext_crc32c,
        verified_plaintext_crc32c: response.verified_plaintext_crc32c,
        verified_additional_authenticated_data_crc32c: response
            .verified_additional_authenticated_data_crc32c,
    }))
}

async fn decrypt(
    state: AppState,
    name: String,
    body: DecryptBody,
) -> ApiResult<DecryptResponseBody> {
    let ctx = state.request_context();
    let response = state
        .service
        .decrypt(
            &ctx,
            DecryptRequest {
                name,
                ciphertext: body.ciphertext,
                additional_authenticated_data: body.additional_authenticated_data,
                ciphertext_crc32c: body.ciphertext_crc32c,
                additional_authenticated_data_crc32c: body.additional_authenticated_data_crc32c,
            },
        )
        .await?;
    Ok(Json(DecryptResponseBody {
        plaintext: response.plaintext,
        plaintext_crc32c: response.plaintext_crc32c,
        used_primary: response.used_primary,
    }))
}

async fn update_primary_version(
    state: AppState,
    name: String,
    body: UpdatePrimaryVersionBody,
) -> ApiResult<CryptoKey> {
    let ctx = state.request_context();
    let crypto_key = state
        .service
        .update_crypto_key_primary_version(
            &ctx,
            UpdateCryptoKeyPrimaryVersionRequest {
                name,
                crypto_key_version_id: body.crypto_key_version_id,
            },
        )
        .await?;
    Ok(Json(crypto_key))
}

async fn create_crypto_key_version(
    State(state): State<AppState>,
    Path(path): Path<CryptoKeyPath>,
) -> ApiResult<CryptoKeyVersion> {
    let ctx = state.request_context();
    let version = state
        .service
        .create_crypto_key_version(&ctx, CreateCryptoKeyVersionRequest { parent: path.name() })
        .await?;
    Ok(Json(version))
}

async fn list_crypto_key_versions(
    State(state): State<AppState>,
    Path(path): Path<CryptoKeyPath>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListCryptoKeyVersionsResponse> {
    let ctx = state.request_context();
    let response = state
        .service
        .list_crypto_key_versions(
            &ctx,
            ListCryptoKeyVersionsRequest {
                parent: path.name(),
                page_token: query.page_token,
            },
        )
        .await?;
    Ok(Json(response))
}

async fn get_crypto_key_version(
    State(state): State<AppState>,
    Path(path): Path<CryptoKeyVersionPath>,
) -> ApiResult<CryptoKeyVersion> {
    let ctx = state.request_context();
    let version = state
        .service
        .get_crypto_key_version(&ctx, GetCryptoKeyVersionRequest { name: path.name() })
        .await?;
    Ok(Json(version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_code(ErrorKind::InvalidArgument), StatusCode::BAD_REQUEST);
        assert_eq!(status_code(ErrorKind::FailedPrecondition), StatusCode::BAD_REQUEST);
        assert_eq!(status_code(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_code(ErrorKind::AlreadyExists), StatusCode::CONFLICT);
        assert_eq!(status_code(ErrorKind::Unimplemented), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(status_code(ErrorKind::Internal), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_code(ErrorKind::Cancelled).as_u16(), 499);
    }

    #[test]
    fn test_parse_body() {
        let empty: Option<UpdatePrimaryVersionBody> = parse_body(&Bytes::from_static(b"  ")).unwrap();
        assert!(empty.is_none());

        let body: Option<UpdatePrimaryVersionBody> =
            parse_body(&Bytes::from_static(br#"{"cryptoKeyVersionId":"2"}"#)).unwrap();
        assert_eq!(body.unwrap().crypto_key_version_id, "2");

        let err = parse_body::<EncryptBody>(&Bytes::from_static(br#"{"plaintext":"***"}"#))
            .unwrap_err();
        assert_eq!(err.0.kind(), ErrorKind::InvalidArgument);
    }
}
