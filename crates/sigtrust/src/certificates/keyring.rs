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

//! Custody of certificate private keys.
//!
//! Keys are sealed with AES-256-GCM under a master key as soon as they are
//! handed to the keyring, and only opened for the duration of a signing call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::CertificateError;
use crate::crypto::{open, seal};
use crate::error::TransportError;

/// Holds the private keys of registered certificates.
#[async_trait]
pub trait CertificateKeyring: Send + Sync {
    /// Take custody of the 32-byte Ed25519 private key for a certificate.
    async fn store_key(&self, certificate_id: &str, private_key: &[u8])
        -> Result<(), CertificateError>;

    /// Decrypt the private key for one signing operation.
    ///
    /// A remote keyring that cannot be reached reports
    /// [`CertificateError::KeyringUnavailable`].
    async fn signing_key(&self, certificate_id: &str) -> Result<Vec<u8>, CertificateError>;

    /// Whether a key is held for the certificate.
    async fn has_key(&self, certificate_id: &str) -> bool;
}

/// In-memory keyring that stores every key AES-GCM encrypted.
pub struct EncryptedKeyring {
    master_key: Vec<u8>,
    sealed: RwLock<HashMap<String, Vec<u8>>>,
    available: AtomicBool,
}

impl std::fmt::Debug for EncryptedKeyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedKeyring")
            .field("master_key", &"[REDACTED]")
            .field("keys", &self.sealed.read().len())
            .finish()
    }
}

impl EncryptedKeyring {
    /// Create a keyring sealed under a 32-byte master key.
    pub fn new(master_key: &[u8]) -> Result<Self, CertificateError> {
        if master_key.len() != 32 {
            return Err(CertificateError::Keyring(format!(
                "master key must be 32 bytes, got {}",
                master_key.len()
            )));
        }
        Ok(Self {
            master_key: master_key.to_vec(),
            sealed: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        })
    }

    /// Simulate the key custody service going offline.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), CertificateError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CertificateError::KeyringUnavailable(TransportError::new(
                "keyring",
                "key custody service is not reachable",
            )))
        }
    }
}

#[async_trait]
impl CertificateKeyring for EncryptedKeyring {
    async fn store_key(
        &self,
        certificate_id: &str,
        private_key: &[u8],
    ) -> Result<(), CertificateError> {
        self.ensure_available()?;
        if private_key.len() != 32 {
            return Err(CertificateError::InvalidPrivateKey(format!(
                "must be 32 bytes, got {}",
                private_key.len()
            )));
        }
        let sealed = seal(private_key, &self.master_key)
            .map_err(|e| CertificateError::Keyring(e.to_string()))?;
        self.sealed.write().insert(certificate_id.to_string(), sealed);
        Ok(())
    }

    async fn signing_key(&self, certificate_id: &str) -> Result<Vec<u8>, CertificateError> {
        self.ensure_available()?;
        let sealed = self
            .sealed
            .read()
            .get(certificate_id)
            .cloned()
            .ok_or_else(|| CertificateError::KeyNotFound(certificate_id.to_string()))?;
        open(&sealed, &self.master_key).map_err(|e| CertificateError::Keyring(e.to_string()))
    }

    async fn has_key(&self, certificate_id: &str) -> bool {
        self.sealed.read().contains_key(certificate_id)
    }
}
