//! State store interface
//!
//! The store is the single source of truth for key rings, crypto keys and
//! versions. Implementations must:
//! - reject duplicate names with [`StoreError::AlreadyExists`] instead of overwriting,
//! - return values that share nothing with internal state,
//! - list in lexicographic order of resource name,
//! - make every method a single atomic unit with respect to other callers.
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


use crate::crypto::KeyMaterial;
use crate::resources::{CryptoKey, CryptoKeyVersion, CryptoKeyVersionTemplate, KeyRing};
use async_trait::async_trait;
use thiserror::Error;

/// Structural store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{resource} {name:?} not found")]
    NotFound { resource: &'static str, name: String },

    #[error("{resource} {name:?} already exists")]
    AlreadyExists { resource: &'static str, name: String },
}

impl StoreError {
    pub(crate) fn not_found(resource: &'static str, name: &str) -> Self {
        StoreError::NotFound {
            resource,
            name: name.to_string(),
        }
    }

    pub(crate) fn already_exists(resource: &'static str, name: &str) -> Self {
        StoreError::AlreadyExists {
            resource,
            name: name.to_string(),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage backend for KMS resources
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Insert a new key ring
    async fn create_key_ring(&self, key_ring: KeyRing) -> StoreResult<()>;

    async fn get_key_ring(&self, name: &str) -> StoreResult<KeyRing>;

    /// Key rings whose location is exactly `parent`. An unknown location is
    /// simply empty since locations are not stored.
    async fn list_key_rings(&self, parent: &str) -> StoreResult<Vec<KeyRing>>;

    /// Insert a crypto key together with its first version and that
    /// version's material, all or nothing.
    async fn create_crypto_key(
        &self,
        key_ring_name: &str,
        crypto_key: CryptoKey,
        primary_version: CryptoKeyVersion,
        key_material: KeyMaterial,
    ) -> StoreResult<()>;

    async fn get_crypto_key(&self, name: &str) -> StoreResult<CryptoKey>;

    async fn list_crypto_keys(&self, parent: &str) -> StoreResult<Vec<CryptoKey>>;

    /// Insert a version under an explicit name
    async fn create_crypto_key_version(
        &self,
        crypto_key_name: &str,
        version: CryptoKeyVersion,
        key_material: KeyMaterial,
    ) -> StoreResult<()>;

    /// Allocate the next version number and insert the version in one
    /// critical section, so concurrent callers never collide.
    async fn create_next_crypto_key_version(
        &self,
        crypto_key_name: &str,
        template: CryptoKeyVersionTemplate,
        key_material: KeyMaterial,
    ) -> StoreResult<CryptoKeyVersion>;

    /// A version and a copy of its key material
    async fn get_crypto_key_version(
        &self,
        name: &str,
    ) -> StoreResult<(CryptoKeyVersion, KeyMaterial)>;

    async fn list_crypto_key_versions(&self, parent: &str) -> StoreResult<Vec<CryptoKeyVersion>>;

    /// Point the crypto key's primary at `version_name`, which must belong
    /// to that key, and return the updated key.
    async fn set_primary_version(
        &self,
        crypto_key_name: &str,
        version_name: &str,
    ) -> StoreResult<CryptoKey>;
}
