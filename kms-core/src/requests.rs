//! Request and response messages of the KMS operation set
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


use crate::resources::{CryptoKey, CryptoKeyPurpose, CryptoKeyVersion, KeyRing};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateKeyRingRequest {
    /// Location, `projects/{p}/locations/{l}`
    pub parent: String,
    pub key_ring_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetKeyRingRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListKeyRingsRequest {
    pub parent: String,
    /// Must be empty; pagination is not implemented
    pub page_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListKeyRingsResponse {
    pub key_rings: Vec<KeyRing>,
}

/// Caller supplied attributes of a crypto key to create
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKeySpec {
    #[serde(default)]
    pub purpose: CryptoKeyPurpose,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateCryptoKeyRequest {
    /// Key ring name
    pub parent: String,
    pub crypto_key_id: String,
    pub crypto_key: Option<CryptoKeySpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetCryptoKeyRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListCryptoKeysRequest {
    pub parent: String,
    pub page_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCryptoKeysResponse {
    pub crypto_keys: Vec<CryptoKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateCryptoKeyVersionRequest {
    /// Crypto key name; the version number is always assigned by the service
    pub parent: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetCryptoKeyVersionRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListCryptoKeyVersionsRequest {
    pub parent: String,
    pub page_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCryptoKeyVersionsResponse {
    pub crypto_key_versions: Vec<CryptoKeyVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateCryptoKeyPrimaryVersionRequest {
    /// Crypto key name
    pub name: String,
    /// Version id only, e.g. `"2"`
    pub crypto_key_version_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptRequest {
    /// Crypto key name; its primary version is used
    pub name: String,
    pub plaintext: Vec<u8>,
    pub additional_authenticated_data: Vec<u8>,
    pub plaintext_crc32c: Option<i64>,
    pub additional_authenticated_data_crc32c: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptResponse {
    /// The version that actually encrypted the data
    pub name: String,
    pub ciphertext: Vec<u8>,
    /// CRC32C over the returned ciphertext envelope
    pub ciphertext_crc32c: i64,
    pub verified_plaintext_crc32c: bool,
    pub verified_additional_authenticated_data_crc32c: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecryptRequest {
    /// Crypto key name; must be the key that produced `ciphertext`
    pub name: String,
    pub ciphertext: Vec<u8>,
    pub additional_authenticated_data: Vec<u8>,
    pub ciphertext_crc32c: Option<i64>,
    pub additional_authenticated_data_crc32c: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptResponse {
    pub plaintext: Vec<u8>,
    pub plaintext_crc32c: i64,
    /// Whether the decrypting version is the key's current primary
    pub used_primary: bool,
}
