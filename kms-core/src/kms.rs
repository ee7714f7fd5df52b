//! KMS operation set
//!
//! Transport-agnostic interface implemented by [`crate::service::KmsService`].
//! Transport adapters and the seeding loader depend on this trait only.
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


use crate::context::RequestContext;
use crate::error::KmsResult;
use crate::requests::*;
use crate::resources::{CryptoKey, CryptoKeyVersion, KeyRing};
use async_trait::async_trait;

/// Trait for Key Management Service implementations
#[async_trait]
pub trait KeyManagementService: Send + Sync {
    async fn create_key_ring(
        &self,
        ctx: &RequestContext,
        req: CreateKeyRingRequest,
    ) -> KmsResult<KeyRing>;

    async fn get_key_ring(&self, ctx: &RequestContext, req: GetKeyRingRequest)
        -> KmsResult<KeyRing>;

    async fn list_key_rings(
        &self,
        ctx: &RequestContext,
        req: ListKeyRingsRequest,
    ) -> KmsResult<ListKeyRingsResponse>;

    /// Create a crypto key and its primary version `1`
    async fn create_crypto_key(
        &self,
        ctx: &RequestContext,
        req: CreateCryptoKeyRequest,
    ) -> KmsResult<CryptoKey>;

    async fn get_crypto_key(
        &self,
        ctx: &RequestContext,
        req: GetCryptoKeyRequest,
    ) -> KmsResult<CryptoKey>;

    async fn list_crypto_keys(
        &self,
        ctx: &RequestContext,
        req: ListCryptoKeysRequest,
    ) -> KmsResult<ListCryptoKeysResponse>;

    /// Add a version with fresh key material; the primary is left unchanged
    async fn create_crypto_key_version(
        &self,
        ctx: &RequestContext,
        req: CreateCryptoKeyVersionRequest,
    ) -> KmsResult<CryptoKeyVersion>;

    async fn get_crypto_key_version(
        &self,
        ctx: &RequestContext,
        req: GetCryptoKeyVersionRequest,
    ) -> KmsResult<CryptoKeyVersion>;

    async fn list_crypto_key_versions(
        &self,
        ctx: &RequestContext,
        req: ListCryptoKeyVersionsRequest,
    ) -> KmsResult<ListCryptoKeyVersionsResponse>;

    async fn update_crypto_key_primary_version(
        &self,
        ctx: &RequestContext,
        req: UpdateCryptoKeyPrimaryVersionRequest,
    ) -> KmsResult<CryptoKey>;

    async fn encrypt(&self, ctx: &RequestContext, req: EncryptRequest)
        -> KmsResult<EncryptResponse>;

    async fn decrypt(&self, ctx: &RequestContext, req: DecryptRequest)
        -> KmsResult<DecryptResponse>;
}
