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

//! Cryptographic primitives for document signatures.
//!
//! This module provides:
//! - Ed25519 key generation, signing and verification
//! - SHA256 document hashes and key fingerprints
//! - AES-256-GCM sealing for key material and stored signatures

mod encryption;
mod signing;

pub use encryption::{open, seal, EncryptionError};
pub use signing::{
    compute_document_hash, compute_key_fingerprint, derive_public_key, generate_signing_keypair,
    sign_message, verify_message, GeneratedKeypair, SigningError, ALGORITHM, KEY_SIZE_BITS,
};
