//! Symmetric crypto engine
//!
//! The service treats key material as an opaque blob: it is produced by
//! [`CryptoEngine::generate_key_material`], stored next to its version and
//! handed back to the same engine for every encrypt/decrypt call. Engines
//! keep no per-request state.
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


use crate::context::{ContextError, RequestContext};
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use std::fmt;
use thiserror::Error;

/// Serialized key bytes produced by an engine
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// Never print key bytes.
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial({} bytes)", self.0.len())
    }
}

/// Crypto engine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("Encryption error: {0}")]
    Encrypt(String),

    #[error("Decryption error: {0}")]
    Decrypt(String),
}

/// Authenticated symmetric encryption over opaque key material
pub trait CryptoEngine: Send + Sync {
    /// Produce fresh, independently keyed material
    fn generate_key_material(&self, ctx: &RequestContext) -> Result<KeyMaterial, EngineError>;

    /// Encrypt `plaintext`, binding `associated_data` into the tag only
    fn encrypt(
        &self,
        ctx: &RequestContext,
        material: &KeyMaterial,
        plaintext: &[u8],
        associated_data: &[u8],
    ) -> Result<Vec<u8>, EngineError>;

    /// Inverse of [`CryptoEngine::encrypt`]; fails if anything was tampered with
    fn decrypt(
        &self,
        ctx: &RequestContext,
        material: &KeyMaterial,
        ciphertext: &[u8],
        associated_data: &[u8],
    ) -> Result<Vec<u8>, EngineError>;
}

const MATERIAL_FORMAT_AES256_GCM: u8 = 1;
const AES256_KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// AES-256-GCM engine.
///
/// Material layout: one format byte followed by the 32-byte key.
/// Ciphertext layout: 12-byte random nonce followed by the GCM output.
#[derive(Debug, Default, Clone, Copy)]
pub struct AesGcmEngine;

impl AesGcmEngine {
    pub fn new() -> Self {
        Self
    }

    fn cipher(material: &KeyMaterial) -> Result<Aes256Gcm, EngineError> {
        let bytes = material.as_bytes();
        match bytes.split_first() {
            Some((&MATERIAL_FORMAT_AES256_GCM, key)) if key.len() == AES256_KEY_LEN => {
                Aes256Gcm::new_from_slice(key)
                    .map_err(|e| EngineError::InvalidKeyMaterial(e.to_string()))
            }
            Some((&MATERIAL_FORMAT_AES256_GCM, key)) => Err(EngineError::InvalidKeyMaterial(
                format!("expected {} key bytes, got {}", AES256_KEY_LEN, key.len()),
            )),
            Some((format, _)) => Err(EngineError::InvalidKeyMaterial(format!(
                "unknown material format {}",
                format
            ))),
            None => Err(EngineError::InvalidKeyMaterial("empty key material".to_string())),
        }
    }
}

impl CryptoEngine for AesGcmEngine {
    fn generate_key_material(&self, ctx: &RequestContext) -> Result<KeyMaterial, EngineError> {
        ctx.check()?;
        let mut bytes = vec![0u8; 1 + AES256_KEY_LEN];
        bytes[0] = MATERIAL_FORMAT_AES256_GCM;
        rand::thread_rng().fill_bytes(&mut bytes[1..]);
        Ok(KeyMaterial(bytes))
    }

    fn encrypt(
        &self,
        ctx: &RequestContext,
        material: &KeyMaterial,
        plaintext: &[u8],
        associated_data: &[u8],
    ) -> Result<Vec<u8>, EngineError> {
        ctx.check()?;
        let cipher = Self::cipher(material)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext,
                    aad: associated_data,
                },
            )
            .map_err(|e| EngineError::Encrypt(format!("Encryption failed: {}", e)))?;

        let mut result = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        result.extend_from_slice(&nonce);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    fn decrypt(
        &self,
        ctx: &RequestContext,
        material: &KeyMaterial,
        ciphertext: &[u8],
        associated_data: &[u8],
    ) -> Result<Vec<u8>, EngineError> {
        ctx.check()?;
        if ciphertext.len() < NONCE_LEN {
            return Err(EngineError::Decrypt("ciphertext too short".to_string()));
        }
        let cipher = Self::cipher(material)?;
        let (nonce_bytes, body) = ciphertext.split_at(NONCE_LEN);

        cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: body,
                    aad: associated_data,
                },
            )
            .map_err(|e| EngineError::Decrypt(format!("Decryption failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let ctx = RequestContext::background();
        let engine = AesGcmEngine::new();
        let material = engine.generate_key_material(&ctx).unwrap();

        let ciphertext = engine
            .encrypt(&ctx, &material, b"secure payload", b"aad")
            .unwrap();

        let plaintext = engine.decrypt(&ctx, &material, &ciphertext, b"aad").unwrap();
        assert_eq!(plaintext, b"secure payload");
    }

    #[test]
    fn test_empty_plaintext() {
        let ctx = RequestContext::background();
        let engine = AesGcmEngine::new();
        let material = engine.generate_key_material(&ctx).unwrap();

        let ciphertext = engine.encrypt(&ctx, &material, b"", b"").unwrap();
        assert_eq!(engine.decrypt(&ctx, &material, &ciphertext, b"").unwrap(), b"");
    }

    #[test]
    fn test_aad_mismatch_fails() {
        let ctx = RequestContext::background();
        let engine = AesGcmEngine::new();
        let material = engine.generate_key_material(&ctx).unwrap();

        let ciphertext = engine.encrypt(&ctx, &material, b"payload", b"aad").unwrap();
        let err = engine
            .decrypt(&ctx, &material, &ciphertext, b"bad-aad")
            .unwrap_err();
        assert!(matches!(err, EngineError::Decrypt(_)));
    }

    #[test]
    fn test_materials_are_independent() {
        let ctx = RequestContext::background();
        let engine = AesGcmEngine::new();
        let first = engine.generate_key_material(&ctx).unwrap();
        let second = engine.generate_key_material(&ctx).unwrap();
        assert_ne!(first, second);

        let ciphertext = engine.encrypt(&ctx, &first, b"payload", b"").unwrap();
        assert!(engine.decrypt(&ctx, &second, &ciphertext, b"").is_err());
    }

    #[test]
    fn test_rejects_corrupt_material_and_ciphertext() {
        let ctx = RequestContext::background();
        let engine = AesGcmEngine::new();

        let bogus = KeyMaterial::from_bytes(vec![9; 33]);
        assert!(matches!(
            engine.encrypt(&ctx, &bogus, b"x", b""),
            Err(EngineError::InvalidKeyMaterial(_))
        ));
        let short = KeyMaterial::from_bytes(vec![MATERIAL_FORMAT_AES256_GCM; 8]);
        assert!(engine.encrypt(&ctx, &short, b"x", b"").is_err());

        let material = engine.generate_key_material(&ctx).unwrap();
        assert!(engine.decrypt(&ctx, &material, b"short", b"").is_err());
    }

    #[test]
    fn test_cancelled_context_fails_fast() {
        let engine = AesGcmEngine::new();
        let material = engine
            .generate_key_material(&RequestContext::background())
            .unwrap();

        let cancelled = RequestContext::background();
        cancelled.cancel();

        let cancelled_err = EngineError::Context(ContextError::Cancelled);
        assert_eq!(engine.generate_key_material(&cancelled).unwrap_err(), cancelled_err);
        assert_eq!(
            engine.encrypt(&cancelled, &material, b"data", b"").unwrap_err(),
            cancelled_err
        );
        assert_eq!(
            engine.decrypt(&cancelled, &material, b"ciphertext", b"").unwrap_err(),
            cancelled_err
        );
    }

    #[test]
    fn test_debug_hides_key_bytes() {
        let material = KeyMaterial::from_bytes(vec![0xAB; 33]);
        assert_eq!(format!("{:?}", material), "KeyMaterial(33 bytes)");
    }
}
