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

//! Domain models for certificates.
//!
//! A [`CertificateRecord`] is the issuance data delivered out-of-band. A
//! [`Certificate`] is the registry's view of that record: the same data plus a
//! status derived from the validity window and the current revocation list.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{compute_key_fingerprint, ALGORITHM, KEY_SIZE_BITS};

/// PEM tag for Ed25519 public keys.
const ED25519_PEM_TAG: &str = "PUBLIC KEY";

/// ASN.1 DER prefix for Ed25519 public keys (SubjectPublicKeyInfo).
const ED25519_DER_PREFIX: [u8; 12] = [
    0x30, 0x2a, // SEQUENCE, 42 bytes
    0x30, 0x05, // SEQUENCE, 5 bytes (algorithm identifier)
    0x06, 0x03, // OID, 3 bytes
    0x2b, 0x65, 0x70, // 1.3.101.112 (Ed25519)
    0x03, 0x21, // BIT STRING, 33 bytes
    0x00, // unused bits
];

/// Kind of identity a certificate attests to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CertificateType {
    DohCertified,
    Organizational,
    Personal,
    Device,
}

impl CertificateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateType::DohCertified => "doh-certified",
            CertificateType::Organizational => "organizational",
            CertificateType::Personal => "personal",
            CertificateType::Device => "device",
        }
    }
}

impl fmt::Display for CertificateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "doh-certified" => Ok(CertificateType::DohCertified),
            "organizational" => Ok(CertificateType::Organizational),
            "personal" => Ok(CertificateType::Personal),
            "device" => Ok(CertificateType::Device),
            other => Err(format!("unknown certificate type: {}", other)),
        }
    }
}

/// Derived certificate status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    Valid,
    Expired,
    Revoked,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Valid => "valid",
            CertificateStatus::Expired => "expired",
            CertificateStatus::Revoked => "revoked",
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assurance level attached to a certificate by its issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceLevel {
    Basic,
    Standard,
    Regulated,
}

/// Public-key descriptor carried by a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyInfo {
    /// Signature algorithm (currently "ed25519")
    pub algorithm: String,
    /// Key size in bits
    pub key_size: u32,
    /// Raw public key bytes
    pub key: Vec<u8>,
    /// SHA256 hex fingerprint of `key`
    pub fingerprint: String,
}

impl PublicKeyInfo {
    /// Describe a raw 32-byte Ed25519 public key.
    pub fn ed25519(key: Vec<u8>) -> Self {
        let fingerprint = compute_key_fingerprint(&key);
        Self {
            algorithm: ALGORITHM.to_string(),
            key_size: KEY_SIZE_BITS,
            key,
            fingerprint,
        }
    }

    /// Encode the key as a PEM SubjectPublicKeyInfo block.
    pub fn to_pem(&self) -> String {
        let mut der = Vec::with_capacity(ED25519_DER_PREFIX.len() + self.key.len());
        der.extend_from_slice(&ED25519_DER_PREFIX);
        der.extend_from_slice(&self.key);

        pem::encode(&pem::Pem::new(ED25519_PEM_TAG, der))
    }

    /// Decode a PEM-encoded Ed25519 public key.
    pub fn from_pem(pem_str: &str) -> Result<Self, String> {
        let pem = pem::parse(pem_str).map_err(|e| e.to_string())?;

        if pem.tag() != ED25519_PEM_TAG {
            return Err(format!(
                "Expected tag '{}', got '{}'",
                ED25519_PEM_TAG,
                pem.tag()
            ));
        }

        let der = pem.contents();
        if der.len() != ED25519_DER_PREFIX.len() + 32 {
            return Err(format!(
                "Invalid DER length: expected {}, got {}",
                ED25519_DER_PREFIX.len() + 32,
                der.len()
            ));
        }
        if der[..ED25519_DER_PREFIX.len()] != ED25519_DER_PREFIX {
            return Err("Invalid DER prefix for Ed25519 key".to_string());
        }

        Ok(Self::ed25519(der[ED25519_DER_PREFIX.len()..].to_vec()))
    }
}

/// Issuance data for a certificate. Created outside this system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub id: String,
    pub certificate_type: CertificateType,
    /// Name of the holder the certificate was issued to
    pub subject: String,
    pub issuer: String,
    /// Start of the validity window (epoch milliseconds on the wire)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub valid_from: DateTime<Utc>,
    /// End of the validity window (epoch milliseconds on the wire)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub valid_to: DateTime<Utc>,
    pub public_key: PublicKeyInfo,
    pub compliance_level: ComplianceLevel,
}

impl CertificateRecord {
    /// Whether `at` falls inside `[valid_from, valid_to]`.
    pub fn is_within_validity(&self, at: DateTime<Utc>) -> bool {
        at >= self.valid_from && at <= self.valid_to
    }

    /// Derive the status at `now` given whether the id is on the revocation list.
    ///
    /// Revocation wins over the validity window. Instants outside the window
    /// (including before `valid_from`) report `Expired`.
    pub fn status_at(&self, now: DateTime<Utc>, revoked: bool) -> CertificateStatus {
        if revoked {
            CertificateStatus::Revoked
        } else if self.is_within_validity(now) {
            CertificateStatus::Valid
        } else {
            CertificateStatus::Expired
        }
    }
}

/// A certificate together with its derived status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Certificate {
    #[serde(flatten)]
    record: CertificateRecord,
    status: CertificateStatus,
}

impl Certificate {
    /// Pair a record with the status the registry derived for it.
    pub(crate) fn derived(record: CertificateRecord, status: CertificateStatus) -> Self {
        Self { record, status }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn status(&self) -> CertificateStatus {
        self.status
    }

    pub fn is_valid(&self) -> bool {
        self.status == CertificateStatus::Valid
    }

    pub fn certificate_type(&self) -> CertificateType {
        self.record.certificate_type
    }

    pub fn public_key(&self) -> &PublicKeyInfo {
        &self.record.public_key
    }

    pub fn record(&self) -> &CertificateRecord {
        &self.record
    }
}
