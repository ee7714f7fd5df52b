//! Resource name parsing and formatting
//!
//! Names follow the Cloud KMS grammar:
//! `projects/{p}/locations/{l}/keyRings/{k}/cryptoKeys/{c}/cryptoKeyVersions/{v}`.
//! Every level is a flat value type carrying its full ancestry, so formatting
//! a parsed name always yields the original string.
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


use std::fmt;
use thiserror::Error;

const PROJECTS: &str = "projects";
const LOCATIONS: &str = "locations";
const KEY_RINGS: &str = "keyRings";
const CRYPTO_KEYS: &str = "cryptoKeys";
const CRYPTO_KEY_VERSIONS: &str = "cryptoKeyVersions";

/// Maximum length of a project, location, key ring or crypto key identifier
pub const MAX_ID_LEN: usize = 63;

/// A resource name that failed to parse
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind} name {name:?}: {reason}")]
pub struct NameError {
    /// Resource kind that was being parsed (e.g. "key ring")
    pub kind: &'static str,
    /// The offending name, verbatim
    pub name: String,
    /// Why it was rejected
    pub reason: String,
}

impl NameError {
    fn new(kind: &'static str, name: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// `projects/{project}/locations/{location}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationName {
    pub project: String,
    pub location: String,
}

/// `projects/{project}/locations/{location}/keyRings/{key_ring}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyRingName {
    pub project: String,
    pub location: String,
    pub key_ring: String,
}

/// `.../keyRings/{key_ring}/cryptoKeys/{crypto_key}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CryptoKeyName {
    pub project: String,
    pub location: String,
    pub key_ring: String,
    pub crypto_key: String,
}

/// `.../cryptoKeys/{crypto_key}/cryptoKeyVersions/{version}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CryptoKeyVersionName {
    pub project: String,
    pub location: String,
    pub key_ring: String,
    pub crypto_key: String,
    pub version: String,
}

impl LocationName {
    pub fn parse(name: &str) -> Result<Self, NameError> {
        const KIND: &str = "location";
        let parts = split_segments(KIND, name, &[PROJECTS, LOCATIONS])?;
        validate_id(KIND, name, "project", parts[1])?;
        validate_id(KIND, name, "location", parts[3])?;
        Ok(Self {
            project: parts[1].to_string(),
            location: parts[3].to_string(),
        })
    }

    pub fn resource_name(&self) -> String {
        format!("{}/{}/{}/{}", PROJECTS, self.project, LOCATIONS, self.location)
    }

    /// Name of a key ring directly under this location
    pub fn key_ring(&self, key_ring_id: &str) -> KeyRingName {
        KeyRingName {
            project: self.project.clone(),
            location: self.location.clone(),
            key_ring: key_ring_id.to_string(),
        }
    }
}

impl KeyRingName {
    pub fn parse(name: &str) -> Result<Self, NameError> {
        const KIND: &str = "key ring";
        let parts = split_segments(KIND, name, &[PROJECTS, LOCATIONS, KEY_RINGS])?;
        validate_id(KIND, name, "project", parts[1])?;
        validate_id(KIND, name, "location", parts[3])?;
        validate_id(KIND, name, "key_ring", parts[5])?;
        Ok(Self {
            project: parts[1].to_string(),
            location: parts[3].to_string(),
            key_ring: parts[5].to_string(),
        })
    }

    pub fn parent(&self) -> LocationName {
        LocationName {
            project: self.project.clone(),
            location: self.location.clone(),
        }
    }

    pub fn resource_name(&self) -> String {
        format!("{}/{}/{}", self.parent().resource_name(), KEY_RINGS, self.key_ring)
    }

    pub fn crypto_key(&self, crypto_key_id: &str) -> CryptoKeyName {
        CryptoKeyName {
            project: self.project.clone(),
            location: self.location.clone(),
            key_ring: self.key_ring.clone(),
            crypto_key: crypto_key_id.to_string(),
        }
    }
}

impl CryptoKeyName {
    pub fn parse(name: &str) -> Result<Self, NameError> {
        const KIND: &str = "crypto key";
        let parts = split_segments(KIND, name, &[PROJECTS, LOCATIONS, KEY_RINGS, CRYPTO_KEYS])?;
        validate_id(KIND, name, "project", parts[1])?;
        validate_id(KIND, name, "location", parts[3])?;
        validate_id(KIND, name, "key_ring", parts[5])?;
        validate_id(KIND, name, "crypto_key", parts[7])?;
        Ok(Self {
            project: parts[1].to_string(),
            location: parts[3].to_string(),
            key_ring: parts[5].to_string(),
            crypto_key: parts[7].to_string(),
        })
    }

    pub fn parent(&self) -> KeyRingName {
        KeyRingName {
            project: self.project.clone(),
            location: self.location.clone(),
            key_ring: self.key_ring.clone(),
        }
    }

    pub fn resource_name(&self) -> String {
        format!("{}/{}/{}", self.parent().resource_name(), CRYPTO_KEYS, self.crypto_key)
    }

    pub fn version(&self, version: u64) -> CryptoKeyVersionName {
        CryptoKeyVersionName {
            project: self.project.clone(),
            location: self.location.clone(),
            key_ring: self.key_ring.clone(),
            crypto_key: self.crypto_key.clone(),
            version: version.to_string(),
        }
    }
}

impl CryptoKeyVersionName {
    pub fn parse(name: &str) -> Result<Self, NameError> {
        const KIND: &str = "crypto key version";
        let parts = split_segments(
            KIND,
            name,
            &[PROJECTS, LOCATIONS, KEY_RINGS, CRYPTO_KEYS, CRYPTO_KEY_VERSIONS],
        )?;
        validate_id(KIND, name, "project", parts[1])?;
        validate_id(KIND, name, "location", parts[3])?;
        validate_id(KIND, name, "key_ring", parts[5])?;
        validate_id(KIND, name, "crypto_key", parts[7])?;
        validate_version_id(KIND, name, parts[9])?;
        Ok(Self {
            project: parts[1].to_string(),
            location: parts[3].to_string(),
            key_ring: parts[5].to_string(),
            crypto_key: parts[7].to_string(),
            version: parts[9].to_string(),
        })
    }

    pub fn parent(&self) -> CryptoKeyName {
        CryptoKeyName {
            project: self.project.clone(),
            location: self.location.clone(),
            key_ring: self.key_ring.clone(),
            crypto_key: self.crypto_key.clone(),
        }
    }

    pub fn resource_name(&self) -> String {
        format!(
            "{}/{}/{}",
            self.parent().resource_name(),
            CRYPTO_KEY_VERSIONS,
            self.version
        )
    }

    /// Numeric value of the version segment, `None` if it overflows `u64`
    pub fn version_number(&self) -> Option<u64> {
        self.version.parse().ok()
    }
}

macro_rules! display_resource_name {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.resource_name())
            }
        })*
    };
}

display_resource_name!(LocationName, KeyRingName, CryptoKeyName, CryptoKeyVersionName);

/// Build a version name from an already formatted crypto key name.
///
/// `version_id` is appended verbatim; callers that need validation should
/// parse the result.
pub fn format_crypto_key_version(crypto_key_name: &str, version_id: &str) -> String {
    format!("{}/{}/{}", crypto_key_name, CRYPTO_KEY_VERSIONS, version_id)
}

/// Split `name` and check the literal keywords at every even position.
fn split_segments<'a>(
    kind: &'static str,
    name: &'a str,
    keywords: &[&str],
) -> Result<Vec<&'a str>, NameError> {
    let parts: Vec<&str> = name.split('/').collect();
    let expected = keywords.len() * 2;
    if parts.len() != expected {
        return Err(NameError::new(
            kind,
            name,
            format!("expected {} path segments, got {}", expected, parts.len()),
        ));
    }
    for (i, keyword) in keywords.iter().enumerate() {
        let found = parts[i * 2];
        if found != *keyword {
            return Err(NameError::new(
                kind,
                name,
                format!("expected {:?} at segment {}, got {:?}", keyword, i * 2 + 1, found),
            ));
        }
    }
    Ok(parts)
}

fn validate_id(kind: &'static str, name: &str, field: &str, value: &str) -> Result<(), NameError> {
    if value.is_empty() {
        return Err(NameError::new(kind, name, format!("{} must be non-empty", field)));
    }
    let valid_chars = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid_chars || value.len() > MAX_ID_LEN {
        return Err(NameError::new(
            kind,
            name,
            format!("{} must match [a-zA-Z0-9_-]{{1,{}}}", field, MAX_ID_LEN),
        ));
    }
    Ok(())
}

fn validate_version_id(kind: &'static str, name: &str, value: &str) -> Result<(), NameError> {
    if value.is_empty() {
        return Err(NameError::new(kind, name, "version must be non-empty"));
    }
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(NameError::new(kind, name, "version must match [0-9]+"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERSION: &str =
        "projects/demo/locations/global/keyRings/app/cryptoKeys/pair/cryptoKeyVersions/1";

    #[test]
    fn test_parse_and_format_round_trip() {
        let names = [
            "projects/demo/locations/global",
            "projects/demo/locations/global/keyRings/app",
            "projects/demo/locations/global/keyRings/app/cryptoKeys/pair",
            VERSION,
        ];

        assert_eq!(LocationName::parse(names[0]).unwrap().resource_name(), names[0]);
        assert_eq!(KeyRingName::parse(names[1]).unwrap().resource_name(), names[1]);
        assert_eq!(CryptoKeyName::parse(names[2]).unwrap().resource_name(), names[2]);
        assert_eq!(CryptoKeyVersionName::parse(names[3]).unwrap().resource_name(), names[3]);
    }

    #[test]
    fn test_parents_compose_from_ancestry() {
        let version = CryptoKeyVersionName::parse(VERSION).unwrap();
        let key = version.parent();
        assert_eq!(key.crypto_key, "pair");
        assert_eq!(
            key.parent().parent().resource_name(),
            "projects/demo/locations/global"
        );
        assert_eq!(key.version(1), version);
        assert_eq!(version.version_number(), Some(1));
        assert_eq!(version.to_string(), VERSION);
    }

    #[test]
    fn test_builders_match_parse() {
        let location = LocationName::parse("projects/p-1/locations/us_east").unwrap();
        let ring = location.key_ring("ring");
        assert_eq!(
            KeyRingName::parse(&ring.resource_name()).unwrap(),
            ring
        );
        let key = ring.crypto_key("key");
        assert_eq!(
            format_crypto_key_version(&key.resource_name(), "7"),
            key.version(7).resource_name()
        );
    }

    #[test]
    fn test_rejects_wrong_segment_count() {
        let err = KeyRingName::parse("projects/demo/locations/global").unwrap_err();
        assert_eq!(err.kind, "key ring");
        assert!(err.reason.contains("expected 6 path segments"));

        assert!(LocationName::parse("projects/demo/locations/global/").is_err());
        assert!(LocationName::parse("").is_err());
    }

    #[test]
    fn test_rejects_wrong_keyword() {
        let err = CryptoKeyName::parse("projects/demo/locations/global/keyrings/app/cryptoKeys/k")
            .unwrap_err();
        assert!(err.reason.contains("keyRings"));
        assert!(err.to_string().contains("keyrings/app"));
    }

    #[test]
    fn test_rejects_invalid_identifiers() {
        let err = KeyRingName::parse("projects/demo/locations/global/keyRings/").unwrap_err();
        assert_eq!(err.reason, "key_ring must be non-empty");

        let err = KeyRingName::parse("projects/de mo/locations/global/keyRings/app").unwrap_err();
        assert!(err.reason.starts_with("project must match"));

        let long = "a".repeat(MAX_ID_LEN + 1);
        let name = format!("projects/demo/locations/global/keyRings/{}", long);
        assert!(KeyRingName::parse(&name).is_err());

        let max = "a".repeat(MAX_ID_LEN);
        let name = format!("projects/demo/locations/global/keyRings/{}", max);
        assert!(KeyRingName::parse(&name).is_ok());
    }

    #[test]
    fn test_rejects_non_numeric_version() {
        let base = "projects/demo/locations/global/keyRings/app/cryptoKeys/pair/cryptoKeyVersions/";
        let err = CryptoKeyVersionName::parse(&format!("{}v1", base)).unwrap_err();
        assert_eq!(err.reason, "version must match [0-9]+");

        let err = CryptoKeyVersionName::parse(base).unwrap_err();
        assert_eq!(err.reason, "version must be non-empty");
    }
}
