//! YAML seeding of key rings, crypto keys and versions
//!
//! A seed document declares resources by id under `projects → locations →
//! keyRings → cryptoKeys`. Resources are created parent first, in id order,
//! and anything that already exists is left as is, so a document can be
//! applied repeatedly.
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


use kms_core::{
    CreateCryptoKeyRequest, CreateCryptoKeyVersionRequest, CreateKeyRingRequest,
    CryptoKeyPurpose, CryptoKeySpec, ErrorKind, KeyManagementService, KmsError, KmsResult,
    ListCryptoKeyVersionsRequest, LocationName, RequestContext,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

const SUPPORTED_PURPOSE: &str = "ENCRYPT_DECRYPT";

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("seed file {0} must be a YAML document (.yaml or .yml)")]
    NotYaml(PathBuf),

    #[error("read seed file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse seed file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("unsupported purpose in seed for {crypto_key}: {purpose}")]
    UnsupportedPurpose { crypto_key: String, purpose: String },

    #[error("create {resource} {name}: {source}")]
    Create {
        resource: &'static str,
        name: String,
        #[source]
        source: KmsError,
    },
}

/// Root of a seed document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedDocument {
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectSeed>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectSeed {
    #[serde(default)]
    pub locations: BTreeMap<String, LocationSeed>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSeed {
    #[serde(default)]
    pub key_rings: BTreeMap<String, KeyRingSeed>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRingSeed {
    #[serde(default)]
    pub crypto_keys: BTreeMap<String, CryptoKeySeed>,
}

/// Subset of crypto key attributes a seed may set
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CryptoKeySeed {
    /// Empty or `ENCRYPT_DECRYPT`
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// One entry per version the key should have. Only the count matters;
    /// ids are always assigned by the service.
    #[serde(default)]
    pub versions: Vec<VersionSeed>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionSeed {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub state: String,
}

impl VersionSeed {
    /// A declared state other than `ENABLED`; versions are always created enabled
    pub fn ignored_state(&self) -> Option<&str> {
        match self.state.as_str() {
            "" | "ENABLED" => None,
            state => Some(state),
        }
    }
}

impl SeedDocument {
    pub fn from_yaml(data: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(data)?)
    }
}

/// What a seeding run actually created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub key_rings: usize,
    pub crypto_keys: usize,
    pub crypto_key_versions: usize,
}

/// Read, parse and apply a seed file
pub async fn apply_seed_file(
    ctx: &RequestContext,
    service: &dyn KeyManagementService,
    path: &Path,
) -> Result<SeedSummary, SeedError> {
    if !kms_config::is_yaml(path) {
        return Err(SeedError::NotYaml(path.to_path_buf()));
    }
    let data = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let doc = SeedDocument::from_yaml(&data)?;

    let summary = apply_seed(ctx, service, &doc).await?;
    info!(
        path = %path.display(),
        key_rings = summary.key_rings,
        crypto_keys = summary.crypto_keys,
        crypto_key_versions = summary.crypto_key_versions,
        "Seed file applied"
    );
    Ok(summary)
}

/// Provision everything `doc` declares through the create operations
pub async fn apply_seed(
    ctx: &RequestContext,
    service: &dyn KeyManagementService,
    doc: &SeedDocument,
) -> Result<SeedSummary, SeedError> {
    let mut summary = SeedSummary::default();

    for (project_id, project) in &doc.projects {
        for (location_id, location) in &project.locations {
            let parent = LocationName {
                project: project_id.clone(),
                location: location_id.clone(),
            };

            for (key_ring_id, key_ring) in &location.key_rings {
                let key_ring_name = parent.key_ring(key_ring_id);
                let created = tolerate_existing(
                    service
                        .create_key_ring(
                            ctx,
                            CreateKeyRingRequest {
                                parent: parent.resource_name(),
                                key_ring_id: key_ring_id.clone(),
                            },
                        )
                        .await,
                )
                .map_err(|source| SeedError::Create {
                    resource: "key ring",
                    name: key_ring_name.resource_name(),
                    source,
                })?;
                if created {
                    summary.key_rings += 1;
                    info!(key_ring = %key_ring_name, "Seeded key ring");
                }

                for (crypto_key_id, seed) in &key_ring.crypto_keys {
                    seed_crypto_key(
                        ctx,
                        service,
                        &key_ring_name.resource_name(),
                        crypto_key_id,
                        seed,
                        &mut summary,
                    )
                    .await?;
                }
            }
        }
    }

    Ok(summary)
}

async fn seed_crypto_key(
    ctx: &RequestContext,
    service: &dyn KeyManagementService,
    key_ring_name: &str,
    crypto_key_id: &str,
    seed: &CryptoKeySeed,
    summary: &mut SeedSummary,
) -> Result<(), SeedError> {
    let crypto_key_name = &format!("{}/cryptoKeys/{}", key_ring_name, crypto_key_id);
    if !seed.purpose.is_empty() && seed.purpose != SUPPORTED_PURPOSE {
        return Err(SeedError::UnsupportedPurpose {
            crypto_key: crypto_key_name.to_string(),
            purpose: seed.purpose.clone(),
        });
    }

    let created = tolerate_existing(
        service
            .create_crypto_key(
                ctx,
                CreateCryptoKeyRequest {
                    parent: key_ring_name.to_string(),
                    crypto_key_id: crypto_key_id.to_string(),
                    crypto_key: Some(CryptoKeySpec {
                        purpose: CryptoKeyPurpose::EncryptDecrypt,
                        labels: seed.labels.clone(),
                    }),
                },
            )
            .await,
    )
    .map_err(|source| SeedError::Create {
        resource: "crypto key",
        name: crypto_key_name.to_string(),
        source,
    })?;
    if created {
        summary.crypto_keys += 1;
        info!(crypto_key = %crypto_key_name, "Seeded crypto key");
    }

    for version in &seed.versions {
        if let Some(state) = version.ignored_state() {
            warn!(
                crypto_key = %crypto_key_name,
                version_id = %version.id,
                state = %state,
                "Seeded versions are always ENABLED; ignoring declared state"
            );
        }
    }

    // Top up to the declared count so re-applying a document adds nothing.
    let existing = service
        .list_crypto_key_versions(
            ctx,
            ListCryptoKeyVersionsRequest {
                parent: crypto_key_name.to_string(),
                page_token: String::new(),
            },
        )
        .await
        .map_err(|source| SeedError::Create {
            resource: "crypto key version",
            name: crypto_key_name.to_string(),
            source,
        })?
        .crypto_key_versions
        .len();

    for _ in existing..seed.versions.len() {
        let version = service
            .create_crypto_key_version(
                ctx,
                CreateCryptoKeyVersionRequest {
                    parent: crypto_key_name.to_string(),
                },
            )
            .await
            .map_err(|source| SeedError::Create {
                resource: "crypto key version",
                name: crypto_key_name.to_string(),
                source,
            })?;
        summary.crypto_key_versions += 1;
        info!(version = %version.name, "Seeded crypto key version");
    }

    Ok(())
}

/// `Ok(true)` if the resource was created, `Ok(false)` if it already existed
fn tolerate_existing<T>(result: KmsResult<T>) -> KmsResult<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
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
                purpose: ENCRYPT_DECRYPT
                labels:
                  team: payments
                versions:
                  - id: "1"
                  - id: "2"
                    state: ENABLED
              bare: {}
"#,
        )
        .unwrap();

        let ring = &doc.projects["demo"].locations["global"].key_rings["app"];
        let keys: Vec<_> = ring.crypto_keys.keys().cloned().collect();
        assert_eq!(keys, vec!["bare", "data"]);

        let data = &ring.crypto_keys["data"];
        assert_eq!(data.purpose, "ENCRYPT_DECRYPT");
        assert_eq!(data.labels["team"], "payments");
        assert_eq!(data.versions.len(), 2);
        assert_eq!(data.versions[1].state, "ENABLED");
        assert!(ring.crypto_keys["bare"].versions.is_empty());
    }

    #[test]
    fn test_ignored_version_state() {
        let version = |state: &str| VersionSeed {
            id: "1".to_string(),
            state: state.to_string(),
        };
        assert_eq!(version("").ignored_state(), None);
        assert_eq!(version("ENABLED").ignored_state(), None);
        assert_eq!(version("DISABLED").ignored_state(), Some("DISABLED"));
        assert_eq!(
            version("DESTROY_SCHEDULED").ignored_state(),
            Some("DESTROY_SCHEDULED")
        );
    }

    #[test]
    fn test_empty_document() {
        let doc = SeedDocument::from_yaml("projects: {}").unwrap();
        assert!(doc.projects.is_empty());
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            SeedDocument::from_yaml("projects: [1, 2]"),
            Err(SeedError::Parse(_))
        ));
    }

    #[test]
    fn test_tolerate_existing() {
        assert_eq!(tolerate_existing(Ok(())), Ok(true));
        assert_eq!(
            tolerate_existing::<()>(Err(KmsError::AlreadyExists("x".to_string()))),
            Ok(false)
        );
        assert_eq!(
            tolerate_existing::<()>(Err(KmsError::NotFound("x".to_string()))),
            Err(KmsError::NotFound("x".to_string()))
        );
    }
}
