//! CRC32C (Castagnoli) checksums used for request/response integrity
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


use crate::error::{KmsError, KmsResult};

/// CRC32C of `data`; empty input yields 0
pub fn crc32c(data: &[u8]) -> u32 {
    if data.is_empty() {
        return 0;
    }
    crc32c::crc32c(data)
}

/// Checksums travel as signed 64-bit integers holding the unsigned 32-bit value
pub fn to_wire(checksum: u32) -> i64 {
    i64::from(checksum)
}

/// Verify a caller supplied checksum.
///
/// Returns `Ok(false)` without computing anything when the checksum is absent
/// or zero, `Ok(true)` when it matches and `InvalidArgument` otherwise.
pub fn verify(data: &[u8], supplied: Option<i64>) -> KmsResult<bool> {
    let supplied = match supplied {
        Some(value) if value != 0 => value,
        _ => return Ok(false),
    };
    if to_wire(crc32c(data)) != supplied {
        return Err(KmsError::InvalidArgument("checksum mismatch".to_string()));
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_known_vectors() {
        assert_eq!(crc32c(b""), 0);
        // RFC 3720 B.4 check value
        assert_eq!(crc32c(b"123456789"), 0xE306_9283);
        assert_eq!(crc32c(&[0u8; 32]), 0x8A91_36AA);
    }

    #[test]
    fn test_wire_value_is_unsigned() {
        assert_eq!(to_wire(u32::MAX), 4_294_967_295);
        assert!(to_wire(0xE306_9283) > 0);
    }

    #[test]
    fn test_verify_skips_absent_or_zero() {
        assert_eq!(verify(b"data", None), Ok(false));
        assert_eq!(verify(b"data", Some(0)), Ok(false));
    }

    #[test]
    fn test_verify_match_and_mismatch() {
        let good = to_wire(crc32c(b"data"));
        assert_eq!(verify(b"data", Some(good)), Ok(true));

        let err = verify(b"data", Some(good + 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.message(), "checksum mismatch");
    }
}
