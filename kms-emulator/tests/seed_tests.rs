//! Seeding tests

use kms_core::{
    AesGcmEngine, CryptoKeyVersionState, GetCryptoKeyRequest, KeyManagementService, KmsService,
    ListCryptoKeyVersionsRequest, ListKeyRingsRequest, MemoryStore, RequestContext,
};
use kms_emulator::seed::{apply_seed, apply_seed_file, SeedDocument, SeedError, SeedSummary};
use std::io::Write;
use std::sync::Arc;

const SEED: &str = r#"
projects:
  demo:
    locations:
      global:
        keyRings:
          app:
            cryptoKeys:
              data:
                purpose: ENCRYPT_DECRYPT
                labels:
                  team: payments
                versions:
                  - id: "1"
                  - id: "2"
                  - id: "3"
              tokens: {}
      us-east1:
        keyRings:
          backups: {}
"#;

fn service() -> KmsService {
    KmsService::new(Arc::new(MemoryStore::new()), Arc::new(AesGcmEngine::new()))
}

fn seed_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_apply_seed_creates_resources() {
    let svc = service();
    let ctx = RequestContext::background();

    let file = seed_file(".yaml", SEED);
    let summary = apply_seed_file(&ctx, &svc, file.path()).await.unwrap();
    assert_eq!(
        summary,
        SeedSummary {
            key_rings: 2,
            crypto_keys: 2,
            crypto_key_versions: 2,
        }
    );

    let key = svc
        .get_crypto_key(
            &ctx,
            GetCryptoKeyRequest {
                name: "projects/demo/locations/global/keyRings/app/cryptoKeys/data".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(key.labels.get("team").map(String::as_str), Some("payments"));
    // Extra versions never move the primary.
    assert!(key.primary.unwrap().name.ends_with("/cryptoKeyVersions/1"));

    let versions = svc
        .list_crypto_key_versions(
            &ctx,
            ListCryptoKeyVersionsRequest {
                parent: key.name,
                page_token: String::new(),
            },
        )
        .await
        .unwrap();
    assert_eq!(versions.crypto_key_versions.len(), 3);

    let rings = svc
        .list_key_rings(
            &ctx,
            ListKeyRingsRequest {
                parent: "projects/demo/locations/us-east1".to_string(),
                page_token: String::new(),
            },
        )
        .await
        .unwrap();
    assert_eq!(rings.key_rings.len(), 1);
}

#[tokio::test]
async fn test_apply_seed_is_idempotent() {
    let svc = service();
    let ctx = RequestContext::background();
    let doc = SeedDocument::from_yaml(SEED).unwrap();

    apply_seed(&ctx, &svc, &doc).await.unwrap();
    let again = apply_seed(&ctx, &svc, &doc).await.unwrap();
    assert_eq!(again, SeedSummary::default());

    let versions = svc
        .list_crypto_key_versions(
            &ctx,
            ListCryptoKeyVersionsRequest {
                parent: "projects/demo/locations/global/keyRings/app/cryptoKeys/data".to_string(),
                page_token: String::new(),
            },
        )
        .await
        .unwrap();
    assert_eq!(versions.crypto_key_versions.len(), 3);
}

#[tokio::test]
async fn test_unsupported_purpose_rejected() {
    let svc = service();
    let ctx = RequestContext::background();
    let doc = SeedDocument::from_yaml(
        r#"
projects:
  demo:
    locations:
      global:
        keyRings:
          app:
            cryptoKeys:
              signer:
                purpose: ASYMMETRIC_SIGN
"#,
    )
    .unwrap();

    let err = apply_seed(&ctx, &svc, &doc).await.unwrap_err();
    assert!(matches!(err, SeedError::UnsupportedPurpose { .. }));
}

#[tokio::test]
async fn test_invalid_ids_abort_seeding() {
    let svc = service();
    let ctx = RequestContext::background();
    let doc = SeedDocument::from_yaml(
        r#"
projects:
  demo:
    locations:
      global:
        keyRings:
          "bad ring": {}
"#,
    )
    .unwrap();

    let err = apply_seed(&ctx, &svc, &doc).await.unwrap_err();
    assert!(matches!(err, SeedError::Create { resource: "key ring", .. }));
}

#[tokio::test]
async fn test_seed_file_must_be_yaml() {
    let svc = service();
    let ctx = RequestContext::background();

    let file = seed_file(".json", SEED);
    let err = apply_seed_file(&ctx, &svc, file.path()).await.unwrap_err();
    assert!(matches!(err, SeedError::NotYaml(_)));
}

#[tokio::test]
async fn test_missing_seed_file() {
    let svc = service();
    let ctx = RequestContext::background();
    let dir = tempfile::tempdir().unwrap();

    let err = apply_seed_file(&ctx, &svc, &dir.path().join("absent.yml"))
        .await
        .unwrap_err();
    assert!(matches!(err, SeedError::Read { .. }));
}

#[tokio::test]
async fn test_declared_version_state_is_ignored() {
    let svc = service();
    let ctx = RequestContext::background();
    let doc = SeedDocument::from_yaml(
        r#"
projects:
  demo:
    locations:
      global:
        keyRings:
          app:
            cryptoKeys:
              data:
                versions:
                  - id: "1"
                  - id: "2"
                    state: DISABLED
"#,
    )
    .unwrap();

    apply_seed(&ctx, &svc, &doc).await.unwrap();

    let versions = svc
        .list_crypto_key_versions(
            &ctx,
            ListCryptoKeyVersionsRequest {
                parent: "projects/demo/locations/global/keyRings/app/cryptoKeys/data".to_string(),
                page_token: String::new(),
            },
        )
        .await
        .unwrap();
    assert_eq!(versions.crypto_key_versions.len(), 2);
    assert!(versions
        .crypto_key_versions
        .iter()
        .all(|v| v.state == CryptoKeyVersionState::Enabled));
}
