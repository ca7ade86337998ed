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

//! Domain models for signing requests, signatures and verification results.

use std::fmt;
use std::net::IpAddr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the person signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerIdentity {
    pub user_id: String,
    pub name: String,
    pub role: String,
}

impl SignerIdentity {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            role: role.into(),
        }
    }
}

/// The authentication session a signature was produced under.
///
/// Sessions themselves never outlive the process; this binding is what is
/// kept on the signature so the link survives for later verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBinding {
    pub session_id: Uuid,
    pub user_id: String,
    pub mfa_token_id: Uuid,
    pub ip_address: IpAddr,
    pub device_fingerprint: String,
}

/// A request to sign a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignaturePayload {
    pub document_id: String,
    /// SHA256 hex hash of the document; the tamper-detection anchor
    pub document_hash: String,
    pub signer: SignerIdentity,
    /// Certificate to sign with; the configured default is used when unset
    pub certificate_id: Option<String>,
    pub session: Option<SessionBinding>,
}

impl SignaturePayload {
    pub fn new(
        document_id: impl Into<String>,
        document_hash: impl Into<String>,
        signer: SignerIdentity,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            document_hash: document_hash.into(),
            signer,
            certificate_id: None,
            session: None,
        }
    }

    pub fn with_certificate(mut self, certificate_id: impl Into<String>) -> Self {
        self.certificate_id = Some(certificate_id.into());
        self
    }

    pub fn with_session(mut self, binding: SessionBinding) -> Self {
        self.session = Some(binding);
        self
    }
}

/// Canonical form of everything a signature value commits to.
#[derive(Serialize)]
struct SignedContent<'a> {
    version: u32,
    signature_id: &'a Uuid,
    document_id: &'a str,
    document_hash: &'a str,
    signer: &'a SignerIdentity,
    certificate_id: &'a str,
    certificate_fingerprint: &'a str,
    signed_at_ms: i64,
    session: Option<&'a SessionBinding>,
}

/// A completed digital signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitalSignature {
    pub id: Uuid,
    /// Signature algorithm (currently "ed25519")
    pub algorithm: String,
    /// Base64-encoded signature bytes
    pub signature_value: String,
    pub certificate_id: String,
    /// SHA256 hex fingerprint of the certificate's public key at signing time
    pub certificate_fingerprint: String,
    /// Engine wall-clock time at completion
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub signed_at: DateTime<Utc>,
    pub document_id: String,
    pub document_hash: String,
    pub signer: SignerIdentity,
    pub session: Option<SessionBinding>,
}

impl DigitalSignature {
    /// Current canonical message format version.
    pub const FORMAT_VERSION: u32 = 1;

    /// The exact bytes the signature value was computed over.
    pub fn signed_message(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&SignedContent {
            version: Self::FORMAT_VERSION,
            signature_id: &self.id,
            document_id: &self.document_id,
            document_hash: &self.document_hash,
            signer: &self.signer,
            certificate_id: &self.certificate_id,
            certificate_fingerprint: &self.certificate_fingerprint,
            signed_at_ms: self.signed_at.timestamp_millis(),
            session: self.session.as_ref(),
        })
    }

    /// Decode the raw signature bytes.
    pub fn signature_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.signature_value)
    }

    pub(crate) fn encode_signature(bytes: &[u8]) -> String {
        BASE64.encode(bytes)
    }
}

/// The individual checks run when a signature is verified, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityCheck {
    CertificateExists,
    CertificateValidAtSigning,
    CertificateNotRevoked,
    DocumentHashMatch,
    SignatureIntegrity,
    SessionBinding,
}

impl SecurityCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityCheck::CertificateExists => "certificate_exists",
            SecurityCheck::CertificateValidAtSigning => "certificate_valid_at_signing",
            SecurityCheck::CertificateNotRevoked => "certificate_not_revoked",
            SecurityCheck::DocumentHashMatch => "document_hash_match",
            SecurityCheck::SignatureIntegrity => "signature_integrity",
            SecurityCheck::SessionBinding => "session_binding",
        }
    }
}

impl fmt::Display for SecurityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one security check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityCheckResult {
    pub check: SecurityCheck,
    pub passed: bool,
    pub detail: String,
}

impl SecurityCheckResult {
    pub fn pass(check: SecurityCheck, detail: impl Into<String>) -> Self {
        Self {
            check,
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(check: SecurityCheck, detail: impl Into<String>) -> Self {
        Self {
            check,
            passed: false,
            detail: detail.into(),
        }
    }
}

/// Aggregate verdict over the full check battery. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignatureVerificationResult {
    signature_id: Uuid,
    checks: Vec<SecurityCheckResult>,
    is_valid: bool,
    verified_at: DateTime<Utc>,
}

impl SignatureVerificationResult {
    /// The verdict is the logical AND of every check; an empty battery is invalid.
    pub fn new(
        signature_id: Uuid,
        checks: Vec<SecurityCheckResult>,
        verified_at: DateTime<Utc>,
    ) -> Self {
        let is_valid = !checks.is_empty() && checks.iter().all(|c| c.passed);
        Self {
            signature_id,
            checks,
            is_valid,
            verified_at,
        }
    }

    pub fn signature_id(&self) -> Uuid {
        self.signature_id
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn checks(&self) -> &[SecurityCheckResult] {
        &self.checks
    }

    pub fn verified_at(&self) -> DateTime<Utc> {
        self.verified_at
    }

    /// Look up the result of one check.
    pub fn check(&self, check: SecurityCheck) -> Option<&SecurityCheckResult> {
        self.checks.iter().find(|c| c.check == check)
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &SecurityCheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature() -> DigitalSignature {
        DigitalSignature {
            id: Uuid::new_v4(),
            algorithm: "ed25519".to_string(),
            signature_value: DigitalSignature::encode_signature(&[7u8; 64]),
            certificate_id: "cert-1".to_string(),
            certificate_fingerprint: "ab".repeat(32),
            signed_at: Utc::now(),
            document_id: "D-1".to_string(),
            document_hash: "00".repeat(32),
            signer: SignerIdentity::new("U-1", "Pat Signer", "physician"),
            session: None,
        }
    }

    #[test]
    fn test_signed_message_commits_to_document_hash() {
        let original = signature();
        let mut altered = original.clone();
        altered.document_hash = "11".repeat(32);

        assert_ne!(
            original.signed_message().unwrap(),
            altered.signed_message().unwrap()
        );
    }

    #[test]
    fn test_signature_bytes_decode() {
        assert_eq!(signature().signature_bytes().unwrap(), vec![7u8; 64]);
    }

    #[test]
    fn test_verdict_is_and_of_checks() {
        let id = Uuid::new_v4();
        let all_pass = SignatureVerificationResult::new(
            id,
            vec![
                SecurityCheckResult::pass(SecurityCheck::CertificateExists, "found"),
                SecurityCheckResult::pass(SecurityCheck::SignatureIntegrity, "ok"),
            ],
            Utc::now(),
        );
        assert!(all_pass.is_valid());

        let one_fails = SignatureVerificationResult::new(
            id,
            vec![
                SecurityCheckResult::pass(SecurityCheck::CertificateExists, "found"),
                SecurityCheckResult::fail(SecurityCheck::DocumentHashMatch, "mismatch"),
            ],
            Utc::now(),
        );
        assert!(!one_fails.is_valid());
        assert_eq!(one_fails.failed_checks().count(), 1);
        assert!(
            !one_fails
                .check(SecurityCheck::DocumentHashMatch)
                .unwrap()
                .passed
        );
    }

    #[test]
    fn test_empty_battery_is_invalid() {
        let result = SignatureVerificationResult::new(Uuid::new_v4(), vec![], Utc::now());
        assert!(!result.is_valid());
    }
}
