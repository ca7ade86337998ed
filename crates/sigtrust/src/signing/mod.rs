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

//! Signature creation and verification.
//!
//! [`SignatureEngine`] signs document hashes with registry certificates and
//! runs the security check battery on every verification. A failed
//! verification is a [`SignatureVerificationResult`](crate::models::SignatureVerificationResult)
//! value, never a [`SignatureError`].

mod engine;
mod policy;

pub use engine::{SecurityMetrics, SignatureEngine, SignatureRequirements};
pub use policy::{RoleDirectory, StaticRoleDirectory};

use thiserror::Error;

use crate::certificates::CertificateError;
use crate::crypto::SigningError;
use crate::error::ErrorKind;

/// Errors that can occur while creating or verifying signatures.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("Invalid signature payload: {0}")]
    InvalidPayload(String),

    #[error("No active authentication session bound to the signing request")]
    SessionMissing,

    #[error("Session does not belong to the signer: {0}")]
    SessionMismatch(String),

    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error("Signing failed: {0}")]
    Crypto(#[from] SigningError),

    #[error("Failed to encode signed message: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl SignatureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SignatureError::InvalidPayload(_) => ErrorKind::InvalidRequest,
            SignatureError::SessionMissing => ErrorKind::SessionMissing,
            SignatureError::SessionMismatch(_) => ErrorKind::Unauthorized,
            SignatureError::Certificate(e) => e.kind(),
            SignatureError::Crypto(_) | SignatureError::Encoding(_) => ErrorKind::Crypto,
        }
    }
}
