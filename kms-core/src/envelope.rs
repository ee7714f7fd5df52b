//! Ciphertext envelope binding engine output to the version that produced it
//!
//! Layout: `[u16 big-endian name length][version name bytes][engine ciphertext]`.
//! The format is internal and unversioned; only this crate writes or reads it.
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


use thiserror::Error;

const LEN_PREFIX: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("payload too short")]
    TooShort,

    #[error("payload missing ciphertext body")]
    Truncated,

    #[error("version name is not valid UTF-8")]
    InvalidName,

    #[error("version name of {0} bytes does not fit the length prefix")]
    NameTooLong(usize),
}

/// Prefix `ciphertext` with the producing version's name
pub fn wrap(version_name: &str, ciphertext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let name = version_name.as_bytes();
    let len = u16::try_from(name.len()).map_err(|_| EnvelopeError::NameTooLong(name.len()))?;

    let mut buf = Vec::with_capacity(LEN_PREFIX + name.len() + ciphertext.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(name);
    buf.extend_from_slice(ciphertext);
    Ok(buf)
}

/// Split an envelope into `(version_name, engine_ciphertext)`
pub fn unwrap(payload: &[u8]) -> Result<(String, Vec<u8>), EnvelopeError> {
    if payload.len() < LEN_PREFIX {
        return Err(EnvelopeError::TooShort);
    }
    let name_len = usize::from(u16::from_be_bytes([payload[0], payload[1]]));
    let rest = &payload[LEN_PREFIX..];
    if rest.len() < name_len {
        return Err(EnvelopeError::Truncated);
    }
    let (name, ciphertext) = rest.split_at(name_len);
    let name = std::str::from_utf8(name).map_err(|_| EnvelopeError::InvalidName)?;
    Ok((name.to_string(), ciphertext.to_vec()))
}
