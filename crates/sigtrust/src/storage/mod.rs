/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Encrypted, append-only signature storage with audited retrieval.
//!
//! Signatures are serialized to JSON and sealed with AES-256-GCM before they
//! reach a [`SignatureBackend`]. Every retrieval attempt appends one
//! [`AccessLogEntry`](crate::models::AccessLogEntry), whatever its outcome.

mod backend;
mod policy;
mod store;

pub use backend::{InMemorySignatureBackend, SignatureBackend};
pub use policy::{AccessDecision, AccessPolicy, DefaultAccessPolicy};
pub use store::EncryptedSignatureStore;

use thiserror::Error;
use uuid::Uuid;

use crate::crypto::EncryptionError;
use crate::error::{ErrorKind, TransportError};

/// Errors that can occur in the signature store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid storage request: {0}")]
    InvalidRequest(String),

    #[error("Stored signature not found: {0}")]
    NotFound(Uuid),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Storage record already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("Storage encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(#[from] TransportError),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::AccessDenied(_) => ErrorKind::AccessDenied,
            StoreError::AlreadyExists(_)
            | StoreError::Encryption(_)
            | StoreError::Serialization(_)
            | StoreError::Backend(_) => ErrorKind::StorageFailure,
        }
    }
}
