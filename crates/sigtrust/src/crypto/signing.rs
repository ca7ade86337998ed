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

//! Ed25519 signing utilities for document signatures.
//!
//! Provides functions for:
//! - Generating Ed25519 keypairs for certificates
//! - Computing SHA256 key fingerprints and document hashes
//! - Signing and verifying canonical signature messages

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Algorithm identifier recorded on certificates and signatures.
pub const ALGORITHM: &str = "ed25519";

/// Ed25519 key size in bits.
pub const KEY_SIZE_BITS: u32 = 256;

/// Errors that can occur during signing operations.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Invalid private key: expected 32 bytes, got {0}")]
    InvalidPrivateKeyLength(usize),

    #[error("Invalid public key: expected 32 bytes, got {0}")]
    InvalidPublicKeyLength(usize),

    #[error("Invalid signature: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("Failed to create verifying key: {0}")]
    KeyCreationFailed(String),

    #[error("Signature verification failed")]
    VerificationFailed,
}

/// A generated Ed25519 keypair.
pub struct GeneratedKeypair {
    /// The 32-byte private key seed (should be encrypted before storage)
    pub private_key: Vec<u8>,
    /// The 32-byte public key
    pub public_key: Vec<u8>,
    /// SHA256 hex fingerprint of the public key
    pub fingerprint: String,
}

impl std::fmt::Debug for GeneratedKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedKeypair")
            .field("private_key", &"<redacted>")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// Generates a new Ed25519 keypair.
pub fn generate_signing_keypair() -> GeneratedKeypair {
    let mut csprng = rand::thread_rng();
    let signing_key = SigningKey::generate(&mut csprng);
    let verifying_key = signing_key.verifying_key();

    let public_key_bytes = verifying_key.to_bytes();
    let fingerprint = compute_key_fingerprint(&public_key_bytes);

    GeneratedKeypair {
        private_key: signing_key.to_bytes().to_vec(),
        public_key: public_key_bytes.to_vec(),
        fingerprint,
    }
}

/// Derives the 32-byte public key from a 32-byte Ed25519 private key seed.
pub fn derive_public_key(private_key: &[u8]) -> Result<Vec<u8>, SigningError> {
    let key_bytes: [u8; 32] = private_key
        .try_into()
        .map_err(|_| SigningError::InvalidPrivateKeyLength(private_key.len()))?;
    Ok(SigningKey::from_bytes(&key_bytes)
        .verifying_key()
        .to_bytes()
        .to_vec())
}

/// Computes the SHA256 hex fingerprint of a public key.
pub fn compute_key_fingerprint(public_key: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(public_key);
    hex::encode(hasher.finalize())
}

/// Computes the content-addressed SHA256 hash of a document.
///
/// The same content always yields the same 64-character hex string, which is
/// what makes it usable both when signing and when checking for tampering.
pub fn compute_document_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Signs a message with a 32-byte Ed25519 private key seed.
///
/// # Errors
///
/// Returns `SigningError` if the private key is malformed.
pub fn sign_message(message: &[u8], private_key: &[u8]) -> Result<Vec<u8>, SigningError> {
    let key_bytes: [u8; 32] = private_key
        .try_into()
        .map_err(|_| SigningError::InvalidPrivateKeyLength(private_key.len()))?;

    let signing_key = SigningKey::from_bytes(&key_bytes);
    let signature = signing_key.sign(message);

    Ok(signature.to_bytes().to_vec())
}

/// Verifies an Ed25519 signature over `message`.
///
/// # Errors
///
/// Returns `SigningError::VerificationFailed` if the signature does not match,
/// or a length error if the key or signature is malformed.
pub fn verify_message(
    message: &[u8],
    signature: &[u8],
    public_key: &[u8],
) -> Result<(), SigningError> {
    let key_bytes: [u8; 32] = public_key
        .try_into()
        .map_err(|_| SigningError::InvalidPublicKeyLength(public_key.len()))?;

    let sig_bytes: [u8; 64] = signature
        .try_into()
        .map_err(|_| SigningError::InvalidSignatureLength(signature.len()))?;

    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| SigningError::KeyCreationFailed(e.to_string()))?;

    let sig = Signature::from_bytes(&sig_bytes);

    verifying_key
        .verify(message, &sig)
        .map_err(|_| SigningError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_keypair() {
        let keypair = generate_signing_keypair();

        assert_eq!(keypair.private_key.len(), 32);
        assert_eq!(keypair.public_key.len(), 32);
        assert_eq!(keypair.fingerprint.len(), 64);
    }

    #[test]
    fn test_derive_public_key_matches_generated() {
        let keypair = generate_signing_keypair();
        assert_eq!(
            derive_public_key(&keypair.private_key).unwrap(),
            keypair.public_key
        );
        assert!(matches!(
            derive_public_key(&[0u8; 31]),
            Err(SigningError::InvalidPrivateKeyLength(31))
        ));
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = generate_signing_keypair();
        let message = b"document D-1 approved";

        let signature = sign_message(message, &keypair.private_key).unwrap();
        assert_eq!(signature.len(), 64);

        assert!(verify_message(message, &signature, &keypair.public_key).is_ok());
    }

    #[test]
    fn test_verify_with_other_key_fails() {
        let signer = generate_signing_keypair();
        let other = generate_signing_keypair();
        let message = b"document D-1 approved";

        let signature = sign_message(message, &signer.private_key).unwrap();

        let result = verify_message(message, &signature, &other.public_key);
        assert!(matches!(result, Err(SigningError::VerificationFailed)));
    }

    #[test]
    fn test_verify_altered_message_fails() {
        let keypair = generate_signing_keypair();
        let signature = sign_message(b"original", &keypair.private_key).unwrap();

        let result = verify_message(b"altered", &signature, &keypair.public_key);
        assert!(matches!(result, Err(SigningError::VerificationFailed)));
    }

    #[test]
    fn test_invalid_lengths() {
        assert!(matches!(
            sign_message(b"m", &[0u8; 16]),
            Err(SigningError::InvalidPrivateKeyLength(16))
        ));
        assert!(matches!(
            verify_message(b"m", &[0u8; 64], &[0u8; 16]),
            Err(SigningError::InvalidPublicKeyLength(16))
        ));
        assert!(matches!(
            verify_message(b"m", &[0u8; 32], &[0u8; 32]),
            Err(SigningError::InvalidSignatureLength(32))
        ));
    }

    #[test]
    fn test_document_hash_is_content_addressed() {
        let hash = compute_document_hash(b"hello world");
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(hash, compute_document_hash(b"hello world"));
        assert_ne!(hash, compute_document_hash(b"hello world!"));
    }
}
