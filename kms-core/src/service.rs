//! KMS service: request validation, version management and crypto orchestration
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


use crate::checksum;
use crate::context::RequestContext;
use crate::crypto::{CryptoEngine, EngineError};
use crate::envelope;
use crate::error::{KmsError, KmsResult};
use crate::kms::KeyManagementService;
use crate::names::{self, CryptoKeyName, CryptoKeyVersionName, KeyRingName, LocationName, NameError};
use crate::requests::*;
use crate::resources::{
    CryptoKey, CryptoKeyPurpose, CryptoKeyVersion, CryptoKeyVersionTemplate, KeyRing,
};
use crate::store::StateStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stateless KMS service over a store backend and a crypto engine
pub struct KmsService {
    store: Arc<dyn StateStore>,
    engine: Arc<dyn CryptoEngine>,
}

impl KmsService {
    /// Create a new service with a store backend and a crypto engine
    pub fn new(store: Arc<dyn StateStore>, engine: Arc<dyn CryptoEngine>) -> Self {
        Self { store, engine }
    }
}

fn invalid(field: &'static str) -> impl FnOnce(NameError) -> KmsError {
    move |e| KmsError::InvalidArgument(format!("invalid {}: {}", field, e))
}

fn engine_failure(operation: &'static str) -> impl FnOnce(EngineError) -> KmsError {
    move |e| match e {
        EngineError::Context(ctx) => ctx.into(),
        other => KmsError::Internal(format!("{}: {}", operation, other)),
    }
}

fn require(value: &str, field: &str) -> KmsResult<()> {
    if value.is_empty() {
        return Err(KmsError::InvalidArgument(format!("{} is required", field)));
    }
    Ok(())
}

fn reject_page_token(page_token: &str) -> KmsResult<()> {
    if !page_token.is_empty() {
        return Err(KmsError::Unimplemented(
            "pagination is not supported".to_string(),
        ));
    }
    Ok(())
}

fn verify_checksum(data: &[u8], supplied: Option<i64>, field: &str) -> KmsResult<bool> {
    checksum::verify(data, supplied).map_err(|e| {
        warn!(field = field, "Checksum mismatch");
        e
    })
}

#[async_trait]
impl KeyManagementService for KmsService {
    async fn create_key_ring(
        &self,
        ctx: &RequestContext,
        req: CreateKeyRingRequest,
    ) -> KmsResult<KeyRing> {
        ctx.check()?;
        let parent = LocationName::parse(&req.parent).map_err(invalid("parent"))?;
        require(&req.key_ring_id, "key_ring_id")?;

        let name = parent.key_ring(&req.key_ring_id).resource_name();
        KeyRingName::parse(&name).map_err(invalid("key_ring_id"))?;

        let key_ring = KeyRing::new(name);
        ctx.check()?;
        self.store.create_key_ring(key_ring.clone()).await?;

        info!(key_ring = %key_ring.name, "Created key ring");
        Ok(key_ring)
    }

    async fn get_key_ring(
        &self,
        ctx: &RequestContext,
        req: GetKeyRingRequest,
    ) -> KmsResult<KeyRing> {
        ctx.check()?;
        KeyRingName::parse(&req.name).map_err(invalid("name"))?;
        Ok(self.store.get_key_ring(&req.name).await?)
    }

    async fn list_key_rings(
        &self,
        ctx: &RequestContext,
        req: ListKeyRingsRequest,
    ) -> KmsResult<ListKeyRingsResponse> {
        ctx.check()?;
        let parent = LocationName::parse(&req.parent).map_err(invalid("parent"))?;
        reject_page_token(&req.page_token)?;

        let key_rings = self.store.list_key_rings(&parent.resource_name()).await?;
        debug!(parent = %req.parent, count = key_rings.len(), "Listed key rings");
        Ok(ListKeyRingsResponse { key_rings })
    }

    async fn create_crypto_key(
        &self,
        ctx: &RequestContext,
        req: CreateCryptoKeyRequest,
    ) -> KmsResult<CryptoKey> {
        ctx.check()?;
        let key_ring = KeyRingName::parse(&req.parent).map_err(invalid("parent"))?;
        require(&req.crypto_key_id, "crypto_key_id")?;
        let spec = req
            .crypto_key
            .ok_or_else(|| KmsError::InvalidArgument("crypto_key is required".to_string()))?;
        if spec.purpose != CryptoKeyPurpose::EncryptDecrypt {
            return Err(KmsError::InvalidArgument(
                "only ENCRYPT_DECRYPT purpose is supported".to_string(),
            ));
        }

        let key_name = key_ring.crypto_key(&req.crypto_key_id);
        CryptoKeyName::parse(&key_name.resource_name()).map_err(invalid("crypto_key_id"))?;

        let material = self
            .engine
            .generate_key_material(ctx)
            .map_err(engine_failure("failed to generate key material"))?;

        let template = CryptoKeyVersionTemplate::default();
        let primary = CryptoKeyVersion::enabled(key_name.version(1).resource_name(), &template);
        // The request is owned here, so the labels map is already our own copy.
        let crypto_key = CryptoKey {
            name: key_name.resource_name(),
            create_time: Utc::now(),
            labels: spec.labels,
            purpose: CryptoKeyPurpose::EncryptDecrypt,
            version_template: template,
            primary: Some(primary.clone()),
        };

        ctx.check()?;
        self.store
            .create_crypto_key(
                &key_ring.resource_name(),
                crypto_key.clone(),
                primary,
                material,
            )
            .await?;

        info!(crypto_key = %crypto_key.name, "Created crypto key");
        Ok(crypto_key)
    }

    async fn get_crypto_key(
        &self,
        ctx: &RequestContext,
        req: GetCryptoKeyRequest,
    ) -> KmsResult<CryptoKey> {
        ctx.check()?;
        CryptoKeyName::parse(&req.name).map_err(invalid("name"))?;
        Ok(self.store.get_crypto_key(&req.name).await?)
    }

    async fn list_crypto_keys(
        &self,
        ctx: &RequestContext,
        req: ListCryptoKeysRequest,
    ) -> KmsResult<ListCryptoKeysResponse> {
        ctx.check()?;
        KeyRingName::parse(&req.parent).map_err(invalid("parent"))?;
        reject_page_token(&req.page_token)?;

        let crypto_keys = self.store.list_crypto_keys(&req.parent).await?;
        debug!(parent = %req.parent, count = crypto_keys.len(), "Listed crypto keys");
        Ok(ListCryptoKeysResponse { crypto_keys })
    }

    async fn create_crypto_key_version(
        &self,
        ctx: &RequestContext,
        req: CreateCryptoKeyVersionRequest,
    ) -> KmsResult<CryptoKeyVersion> {
        ctx.check()?;
        CryptoKeyName::parse(&req.parent).map_err(invalid("parent"))?;

        let crypto_key = self.store.get_crypto_key(&req.parent).await?;
        let material = self
            .engine
            .generate_key_material(ctx)
            .map_err(engine_failure("failed to generate key material"))?;

        ctx.check()?;
        let version = self
            .store
            .create_next_crypto_key_version(&req.parent, crypto_key.version_template, material)
            .await?;

        info!(version = %version.name, "Created crypto key version");
        Ok(version)
    }

    async fn get_crypto_key_version(
        &self,
        ctx: &RequestContext,
        req: GetCryptoKeyVersionRequest,
    ) -> KmsResult<CryptoKeyVersion> {
        ctx.check()?;
        CryptoKeyVersionName::parse(&req.name).map_err(invalid("name"))?;
        let (version, _) = self.store.get_crypto_key_version(&req.name).await?;
        Ok(version)
    }

    async fn list_crypto_key_versions(
        &self,
        ctx: &RequestContext,
        req: ListCryptoKeyVersionsRequest,
    ) -> KmsResult<ListCryptoKeyVersionsResponse> {
        ctx.check()?;
        CryptoKeyName::parse(&req.parent).map_err(invalid("parent"))?;
        reject_page_token(&req.page_token)?;

        let crypto_key_versions = self.store.list_crypto_key_versions(&req.parent).await?;
        debug!(
            parent = %req.parent,
            count = crypto_key_versions.len(),
            "Listed crypto key versions"
        );
        Ok(ListCryptoKeyVersionsResponse {
            crypto_key_versions,
        })
    }

    async fn update_crypto_key_primary_version(
        &self,
        ctx: &RequestContext,
        req: UpdateCryptoKeyPrimaryVersionRequest,
    ) -> KmsResult<CryptoKey> {
        ctx.check()?;
        CryptoKeyName::parse(&req.name).map_err(invalid("name"))?;
        require(&req.crypto_key_version_id, "crypto_key_version_id")?;

        let version_name = names::format_crypto_key_version(&req.name, &req.crypto_key_version_id);
        ctx.check()?;
        let crypto_key = self
            .store
            .set_primary_version(&req.name, &version_name)
            .await?;

        info!(
            crypto_key = %crypto_key.name,
            primary = %version_name,
            "Updated primary version"
        );
        Ok(crypto_key)
    }

    async fn encrypt(
        &self,
        ctx: &RequestContext,
        req: EncryptRequest,
    ) -> KmsResult<EncryptResponse> {
        ctx.check()?;
        CryptoKeyName::parse(&req.name).map_err(invalid("name"))?;

        let crypto_key = self.store.get_crypto_key(&req.name).await?;
        let primary = crypto_key.primary.ok_or_else(|| {
            KmsError::FailedPrecondition(format!(
                "crypto key {:?} has no primary version",
                req.name
            ))
        })?;

        let verified_plaintext = verify_checksum(&req.plaintext, req.plaintext_crc32c, "plaintext")?;
        let verified_aad = verify_checksum(
            &req.additional_authenticated_data,
            req.additional_authenticated_data_crc32c,
            "additional_authenticated_data",
        )?;

        let (version, material) = self
            .store
            .get_crypto_key_version(&primary.name)
            .await
            .map_err(|e| KmsError::Internal(format!("primary version unavailable: {}", e)))?;

        let ciphertext = self
            .engine
            .encrypt(
                ctx,
                &material,
                &req.plaintext,
                &req.additional_authenticated_data,
            )
            .map_err(engine_failure("encrypt failed"))?;
        let ciphertext = envelope::wrap(&version.name, &ciphertext)
            .map_err(|e| KmsError::Internal(format!("encrypt failed: {}", e)))?;
        let ciphertext_crc32c = checksum::to_wire(checksum::crc32c(&ciphertext));

        debug!(crypto_key = %req.name, version = %version.name, "Encrypted payload");
        Ok(EncryptResponse {
            name: version.name,
            ciphertext,
            ciphertext_crc32c,
            verified_plaintext_crc32c: verified_plaintext,
            verified_additional_authenticated_data_crc32c: verified_aad,
        })
    }

    async fn decrypt(
        &self,
        ctx: &RequestContext,
        req: DecryptRequest,
    ) -> KmsResult<DecryptResponse> {
        ctx.check()?;
        CryptoKeyName::parse(&req.name).map_err(invalid("name"))?;

        let crypto_key = self.store.get_crypto_key(&req.name).await?;

        verify_checksum(&req.ciphertext, req.ciphertext_crc32c, "ciphertext")?;
        verify_checksum(
            &req.additional_authenticated_data,
            req.additional_authenticated_data_crc32c,
            "additional_authenticated_data",
        )?;

        let (version_name, ciphertext) = envelope::unwrap(&req.ciphertext).map_err(|e| {
            KmsError::InvalidArgument(format!("invalid ciphertext payload: {}", e))
        })?;
        let version_ref = CryptoKeyVersionName::parse(&version_name).map_err(|e| {
            KmsError::InvalidArgument(format!("invalid ciphertext payload: {}", e))
        })?;

        // Ciphertext only ever decrypts under the key that produced it, even if
        // this key has a version with the same number.
        if version_ref.parent().resource_name() != req.name {
            warn!(
                crypto_key = %req.name,
                version = %version_name,
                "Rejected ciphertext produced by another crypto key"
            );
            return Err(KmsError::FailedPrecondition(format!(
                "ciphertext was encrypted with a different crypto key than {:?}",
                req.name
            )));
        }

        let (version, material) = self.store.get_crypto_key_version(&version_name).await?;
        let plaintext = self
            .engine
            .decrypt(
                ctx,
                &material,
                &ciphertext,
                &req.additional_authenticated_data,
            )
            .map_err(engine_failure("decrypt failed"))?;

        let used_primary = crypto_key
            .primary
            .as_ref()
            .map_or(false, |primary| primary.name == version.name);

        debug!(
            crypto_key = %req.name,
            version = %version.name,
            used_primary = used_primary,
            "Decrypted payload"
        );
        Ok(DecryptResponse {
            plaintext_crc32c: checksum::to_wire(checksum::crc32c(&plaintext)),
            plaintext,
            used_primary,
        })
    }
}
