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

//! Certificate registry, revocation handling and private-key custody.
//!
//! - [`CertificateRegistry`] owns the known certificates and their derived status
//! - [`RevocationSource`] is the external revocation list
//! - [`CertificateKeyring`] holds the encrypted private keys used for signing

mod keyring;
mod registry;
mod revocation;

pub use keyring::{CertificateKeyring, EncryptedKeyring};
pub use registry::{CertificateCounts, CertificateRegistry, RevocationUpdate};
pub use revocation::{InMemoryRevocationSource, RevocationSource};

use thiserror::Error;

use crate::error::{ErrorKind, TransportError};

/// Errors that can occur during certificate operations.
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("Certificate not found: {0}")]
    NotFound(String),

    #[error("Certificate has expired or is not yet valid: {0}")]
    Expired(String),

    #[error("Certificate has been revoked: {0}")]
    Revoked(String),

    #[error("No valid certificate available")]
    NoValidCertificate,

    #[error("Certificate already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("No private key held for certificate: {0}")]
    KeyNotFound(String),

    #[error("Keyring error: {0}")]
    Keyring(String),

    #[error("Keyring unavailable: {0}")]
    KeyringUnavailable(TransportError),

    #[error("Revocation list fetch failed: {0}")]
    RevocationFetch(#[from] TransportError),
}

impl CertificateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CertificateError::NotFound(_)
            | CertificateError::Expired(_)
            | CertificateError::Revoked(_)
            | CertificateError::NoValidCertificate
            | CertificateError::KeyNotFound(_) => ErrorKind::CertificateInvalid,
            CertificateError::AlreadyRegistered(_)
            | CertificateError::InvalidKey(_)
            | CertificateError::InvalidPrivateKey(_) => ErrorKind::InvalidRequest,
            CertificateError::Keyring(_) => ErrorKind::Crypto,
            CertificateError::KeyringUnavailable(_) | CertificateError::RevocationFetch(_) => {
                ErrorKind::Transport
            }
        }
    }
}
