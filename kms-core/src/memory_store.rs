//! In-memory state store implementation
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
use crate::names::{self, CryptoKeyName, CryptoKeyVersionName};
use crate::resources::{
    next_version_number, CryptoKey, CryptoKeyVersion, CryptoKeyVersionTemplate, KeyRing,
};
use crate::store::{StateStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

const KEY_RING: &str = "key ring";
const CRYPTO_KEY: &str = "crypto key";
const CRYPTO_KEY_VERSION: &str = "crypto key version";

struct KeyRingRecord {
    key_ring: KeyRing,
    crypto_keys: BTreeMap<String, CryptoKeyRecord>,
}

struct CryptoKeyRecord {
    crypto_key: CryptoKey,
    versions: BTreeMap<String, VersionRecord>,
}

struct VersionRecord {
    version: CryptoKeyVersion,
    key_material: KeyMaterial,
}

/// Process-lifetime store guarded by a single read-write lock.
///
/// Lookups and listings share the lock; creates and primary changes take it
/// exclusively. Maps are ordered by resource name so listings come out sorted.
/// Everything handed out is a clone of the stored record.
#[derive(Default)]
pub struct MemoryStore {
    key_rings: RwLock<BTreeMap<String, KeyRingRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn find_crypto_key<'a>(
    key_rings: &'a BTreeMap<String, KeyRingRecord>,
    name: &str,
) -> StoreResult<&'a CryptoKeyRecord> {
    let parsed = CryptoKeyName::parse(name).map_err(|_| StoreError::not_found(CRYPTO_KEY, name))?;
    key_rings
        .get(&parsed.parent().resource_name())
        .and_then(|ring| ring.crypto_keys.get(name))
        .ok_or_else(|| StoreError::not_found(CRYPTO_KEY, name))
}

fn find_crypto_key_mut<'a>(
    key_rings: &'a mut BTreeMap<String, KeyRingRecord>,
    name: &str,
) -> StoreResult<&'a mut CryptoKeyRecord> {
    let parsed = CryptoKeyName::parse(name).map_err(|_| StoreError::not_found(CRYPTO_KEY, name))?;
    key_rings
        .get_mut(&parsed.parent().resource_name())
        .and_then(|ring| ring.crypto_keys.get_mut(name))
        .ok_or_else(|| StoreError::not_found(CRYPTO_KEY, name))
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn create_key_ring(&self, key_ring: KeyRing) -> StoreResult<()> {
        let mut key_rings = self.key_rings.write().await;
        if key_rings.contains_key(&key_ring.name) {
            return Err(StoreError::already_exists(KEY_RING, &key_ring.name));
        }

        debug!(key_ring = %key_ring.name, "Storing key ring");
        key_rings.insert(
            key_ring.name.clone(),
            KeyRingRecord {
                key_ring,
                crypto_keys: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn get_key_ring(&self, name: &str) -> StoreResult<KeyRing> {
        let key_rings = self.key_rings.read().await;
        key_rings
            .get(name)
            .map(|record| record.key_ring.clone())
            .ok_or_else(|| StoreError::not_found(KEY_RING, name))
    }

    async fn list_key_rings(&self, parent: &str) -> StoreResult<Vec<KeyRing>> {
        // Names are validated on the way in, so the prefix pins the exact location.
        let prefix = format!("{}/keyRings/", parent);
        let key_rings = self.key_rings.read().await;
        Ok(key_rings
            .range(prefix.clone()..)
            .take_while(|(name, _)| name.starts_with(&prefix))
            .map(|(_, record)| record.key_ring.clone())
            .collect())
    }

    async fn create_crypto_key(
        &self,
        key_ring_name: &str,
        mut crypto_key: CryptoKey,
        primary_version: CryptoKeyVersion,
        key_material: KeyMaterial,
    ) -> StoreResult<()> {
        let mut key_rings = self.key_rings.write().await;
        let ring = key_rings
            .get_mut(key_ring_name)
            .ok_or_else(|| StoreError::not_found(KEY_RING, key_ring_name))?;

        if ring.crypto_keys.contains_key(&crypto_key.name) {
            return Err(StoreError::already_exists(CRYPTO_KEY, &crypto_key.name));
        }

        debug!(
            crypto_key = %crypto_key.name,
            version = %primary_version.name,
            "Storing crypto key with primary version"
        );

        crypto_key.primary = Some(primary_version.clone());
        let mut versions = BTreeMap::new();
        versions.insert(
            primary_version.name.clone(),
            VersionRecord {
                version: primary_version,
                key_material,
            },
        );
        ring.crypto_keys.insert(
            crypto_key.name.clone(),
            CryptoKeyRecord {
                crypto_key,
                versions,
            },
        );
        Ok(())
    }

    async fn get_crypto_key(&self, name: &str) -> StoreResult<CryptoKey> {
        let key_rings = self.key_rings.read().await;
        find_crypto_key(&key_rings, name).map(|record| record.crypto_key.clone())
    }

    async fn list_crypto_keys(&self, parent: &str) -> StoreResult<Vec<CryptoKey>> {
        let key_rings = self.key_rings.read().await;
        let ring = key_rings
            .get(parent)
            .ok_or_else(|| StoreError::not_found(KEY_RING, parent))?;
        Ok(ring
            .crypto_keys
            .values()
            .map(|record| record.crypto_key.clone())
            .collect())
    }

    async fn create_crypto_key_version(
        &self,
        crypto_key_name: &str,
        version: CryptoKeyVersion,
        key_material: KeyMaterial,
    ) -> StoreResult<()> {
        let mut key_rings = self.key_rings.write().await;
        let key = find_crypto_key_mut(&mut key_rings, crypto_key_name)?;

        if key.versions.contains_key(&version.name) {
            return Err(StoreError::already_exists(CRYPTO_KEY_VERSION, &version.name));
        }

        debug!(version = %version.name, "Storing crypto key version");
        key.versions.insert(
            version.name.clone(),
            VersionRecord {
                version,
                key_material,
            },
        );
        Ok(())
    }

    async fn create_next_crypto_key_version(
        &self,
        crypto_key_name: &str,
        template: CryptoKeyVersionTemplate,
        key_material: KeyMaterial,
    ) -> StoreResult<CryptoKeyVersion> {
        let mut key_rings = self.key_rings.write().await;
        let key = find_crypto_key_mut(&mut key_rings, crypto_key_name)?;

        let next = next_version_number(key.versions.values().map(|record| &record.version));
        let name = names::format_crypto_key_version(crypto_key_name, &next.to_string());
        if key.versions.contains_key(&name) {
            return Err(StoreError::already_exists(CRYPTO_KEY_VERSION, &name));
        }

        let version = CryptoKeyVersion::enabled(name, &template);
        debug!(version = %version.name, "Storing crypto key version");
        key.versions.insert(
            version.name.clone(),
            VersionRecord {
                version: version.clone(),
                key_material,
            },
        );
        Ok(version)
    }

    async fn get_crypto_key_version(
        &self,
        name: &str,
    ) -> StoreResult<(CryptoKeyVersion, KeyMaterial)> {
        let parsed = CryptoKeyVersionName::parse(name)
            .map_err(|_| StoreError::not_found(CRYPTO_KEY_VERSION, name))?;
        let key_rings = self.key_rings.read().await;
        let key = find_crypto_key(&key_rings, &parsed.parent().resource_name())
            .map_err(|_| StoreError::not_found(CRYPTO_KEY_VERSION, name))?;
        key.versions
            .get(name)
            .map(|record| (record.version.clone(), record.key_material.clone()))
            .ok_or_else(|| StoreError::not_found(CRYPTO_KEY_VERSION, name))
    }

    async fn list_crypto_key_versions(&self, parent: &str) -> StoreResult<Vec<CryptoKeyVersion>> {
        let key_rings = self.key_rings.read().await;
        let key = find_crypto_key(&key_rings, parent)?;
        Ok(key
            .versions
            .values()
            .map(|record| record.version.clone())
            .collect())
    }

    async fn set_primary_version(
        &self,
        crypto_key_name: &str,
        version_name: &str,
    ) -> StoreResult<CryptoKey> {
        let mut key_rings = self.key_rings.write().await;
        let key = find_crypto_key_mut(&mut key_rings, crypto_key_name)?;

        // A key's version map only holds its own versions.
        let version = key
            .versions
            .get(version_name)
            .map(|record| record.version.clone())
            .ok_or_else(|| StoreError::not_found(CRYPTO_KEY_VERSION, version_name))?;

        key.crypto_key.primary = Some(version);
        Ok(key.crypto_key.clone())
    }
}
