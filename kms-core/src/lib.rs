//! Core of the Cloud KMS emulator
//!
//! Resource model and names, the in-memory state store, the AES-GCM crypto
//! engine and the KMS service that ties them together. Transport adapters
//! live in `kms-emulator`.
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


pub mod checksum;
pub mod context;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod kms;
pub mod memory_store;
pub mod names;
pub mod requests;
pub mod resources;
pub mod service;
pub mod store;

pub use context::{ContextError, RequestContext};
pub use crypto::{AesGcmEngine, CryptoEngine, EngineError, KeyMaterial};
pub use error::{ErrorKind, KmsError, KmsResult};
pub use kms::KeyManagementService;
pub use memory_store::MemoryStore;
pub use names::{CryptoKeyName, CryptoKeyVersionName, KeyRingName, LocationName, NameError};
pub use requests::*;
pub use resources::{
    CryptoKey, CryptoKeyPurpose, CryptoKeyVersion, CryptoKeyVersionAlgorithm,
    CryptoKeyVersionState, CryptoKeyVersionTemplate, KeyRing, ProtectionLevel,
};
pub use service::KmsService;
pub use store::{StateStore, StoreError, StoreResult};
