//! KMS resource definitions
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


use crate::names::CryptoKeyVersionName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a crypto key may be used for.
///
/// Only `EncryptDecrypt` can be created; the others exist so that requests
/// naming them are rejected explicitly instead of failing to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CryptoKeyPurpose {
    #[default]
    CryptoKeyPurposeUnspecified,
    EncryptDecrypt,
    AsymmetricSign,
    AsymmetricDecrypt,
    RawEncryptDecrypt,
    Mac,
}

/// Lifecycle state of a version. Versions are created enabled and never transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CryptoKeyVersionState {
    CryptoKeyVersionStateUnspecified,
    #[default]
    Enabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CryptoKeyVersionAlgorithm {
    CryptoKeyVersionAlgorithmUnspecified,
    #[default]
    GoogleSymmetricEncryption,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtectionLevel {
    ProtectionLevelUnspecified,
    #[default]
    Software,
}

/// A named grouping of crypto keys under a project/location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRing {
    pub name: String,
    pub create_time: DateTime<Utc>,
}

impl KeyRing {
    pub fn new(name: String) -> Self {
        Self {
            name,
            create_time: Utc::now(),
        }
    }
}

/// Settings applied to versions created under a crypto key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKeyVersionTemplate {
    pub protection_level: ProtectionLevel,
    pub algorithm: CryptoKeyVersionAlgorithm,
}

/// One individually keyed instance of key material under a crypto key.
///
/// The key material itself lives in the store next to this record and is
/// never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKeyVersion {
    pub name: String,
    pub state: CryptoKeyVersionState,
    pub algorithm: CryptoKeyVersionAlgorithm,
    pub protection_level: ProtectionLevel,
    pub create_time: DateTime<Utc>,
}

impl CryptoKeyVersion {
    /// A freshly created, enabled version following `template`
    pub fn enabled(name: String, template: &CryptoKeyVersionTemplate) -> Self {
        Self {
            name,
            state: CryptoKeyVersionState::Enabled,
            algorithm: template.algorithm,
            protection_level: template.protection_level,
            create_time: Utc::now(),
        }
    }

    /// Numeric suffix of the version name, if the name is well formed
    pub fn version_number(&self) -> Option<u64> {
        CryptoKeyVersionName::parse(&self.name)
            .ok()
            .and_then(|name| name.version_number())
    }
}

/// A purpose-scoped container of versions with one designated primary.
///
/// `primary` is a copy of the active version taken when it was designated,
/// not a live reference; the store refreshes it on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKey {
    pub name: String,
    pub create_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    pub purpose: CryptoKeyPurpose,
    pub version_template: CryptoKeyVersionTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<CryptoKeyVersion>,
}

/// Next version number for a crypto key: one past the highest existing one.
///
/// Numbers are never reused, so gaps left by hypothetical removals stay gaps.
pub fn next_version_number<'a, I>(existing: I) -> u64
where
    I: IntoIterator<Item = &'a CryptoKeyVersion>,
{
    existing
        .into_iter()
        .filter_map(CryptoKeyVersion::version_number)
        .max()
        .unwrap_or(0)
        + 1
}
