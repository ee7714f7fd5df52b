//! Error types for KMS operations
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


use crate::context::ContextError;
use crate::crypto::EngineError;
use crate::names::NameError;
use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

/// Stable classification of a [`KmsError`], independent of its message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    FailedPrecondition,
    Unimplemented,
    Internal,
    Cancelled,
}

impl ErrorKind {
    /// Canonical status name, as used by Cloud APIs
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::AlreadyExists => "ALREADY_EXISTS",
            ErrorKind::FailedPrecondition => "FAILED_PRECONDITION",
            ErrorKind::Unimplemented => "UNIMPLEMENTED",
            ErrorKind::Internal => "INTERNAL",
            ErrorKind::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// KMS service errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KmsError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl KmsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KmsError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            KmsError::NotFound(_) => ErrorKind::NotFound,
            KmsError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            KmsError::FailedPrecondition(_) => ErrorKind::FailedPrecondition,
            KmsError::Unimplemented(_) => ErrorKind::Unimplemented,
            KmsError::Internal(_) => ErrorKind::Internal,
            KmsError::Cancelled(_) => ErrorKind::Cancelled,
        }
    }

    /// The message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            KmsError::InvalidArgument(m)
            | KmsError::NotFound(m)
            | KmsError::AlreadyExists(m)
            | KmsError::FailedPrecondition(m)
            | KmsError::Unimplemented(m)
            | KmsError::Internal(m)
            | KmsError::Cancelled(m) => m,
        }
    }
}

impl From<NameError> for KmsError {
    fn from(err: NameError) -> Self {
        KmsError::InvalidArgument(err.to_string())
    }
}

impl From<StoreError> for KmsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => KmsError::NotFound(err.to_string()),
            StoreError::AlreadyExists { .. } => KmsError::AlreadyExists(err.to_string()),
        }
    }
}

impl From<ContextError> for KmsError {
    fn from(err: ContextError) -> Self {
        KmsError::Cancelled(err.to_string())
    }
}

impl From<EngineError> for KmsError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Context(ctx) => ctx.into(),
            other => KmsError::Internal(other.to_string()),
        }
    }
}

/// Result type for KMS operations
pub type KmsResult<T> = Result<T, KmsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_keep_their_kind() {
        let err: KmsError = StoreError::NotFound {
            resource: "key ring",
            name: "projects/p/locations/l/keyRings/r".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.message().contains("keyRings/r"));

        let err: KmsError = StoreError::AlreadyExists {
            resource: "crypto key",
            name: "k".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_engine_cancellation_is_not_internal() {
        let err: KmsError = EngineError::Context(ContextError::Cancelled).into();
        assert_eq!(err.kind(), ErrorKind::Cancelled);

        let err: KmsError = EngineError::Decrypt("tag mismatch".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::InvalidArgument.as_str(), "INVALID_ARGUMENT");
        assert_eq!(ErrorKind::FailedPrecondition.to_string(), "FAILED_PRECONDITION");
    }
}
