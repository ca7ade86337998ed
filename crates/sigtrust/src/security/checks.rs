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

//! The fixed verification battery run against every signature.
//!
//! Checks run in a fixed order and never short-circuit, so a result always
//! carries the full diagnostic set. Each check only reads the signature and a
//! registry snapshot.

use std::sync::Arc;

use crate::certificates::CertificateRegistry;
use crate::crypto::verify_message;
use crate::models::{
    Certificate, CertificateStatus, DigitalSignature, SecurityCheck, SecurityCheckResult,
};

/// Runs the security check battery.
#[derive(Debug, Clone)]
pub struct SecurityCheckEngine {
    registry: Arc<CertificateRegistry>,
    require_session_binding: bool,
}

impl SecurityCheckEngine {
    pub fn new(registry: Arc<CertificateRegistry>, require_session_binding: bool) -> Self {
        Self {
            registry,
            require_session_binding,
        }
    }

    /// Run every check against `signature`, optionally comparing its bound
    /// document hash to `expected_hash`.
    pub fn run(
        &self,
        signature: &DigitalSignature,
        expected_hash: Option<&str>,
    ) -> Vec<SecurityCheckResult> {
        let certificate = self.registry.get(&signature.certificate_id);
        let certificate = certificate.as_ref();

        let mut results = vec![
            check_certificate_exists(signature, certificate),
            check_valid_at_signing(signature, certificate),
            check_not_revoked(certificate),
            check_document_hash(signature, expected_hash),
            check_integrity(signature, certificate),
        ];
        if self.require_session_binding || signature.session.is_some() {
            results.push(check_session_binding(signature));
        }
        results
    }
}

fn check_certificate_exists(
    signature: &DigitalSignature,
    certificate: Option<&Certificate>,
) -> SecurityCheckResult {
    match certificate {
        Some(_) => SecurityCheckResult::pass(
            SecurityCheck::CertificateExists,
            format!("certificate {} is registered", signature.certificate_id),
        ),
        None => SecurityCheckResult::fail(
            SecurityCheck::CertificateExists,
            format!("certificate {} is not registered", signature.certificate_id),
        ),
    }
}

fn check_valid_at_signing(
    signature: &DigitalSignature,
    certificate: Option<&Certificate>,
) -> SecurityCheckResult {
    let check = SecurityCheck::CertificateValidAtSigning;
    let Some(certificate) = certificate else {
        return SecurityCheckResult::fail(check, "certificate unavailable");
    };
    let record = certificate.record();
    if record.is_within_validity(signature.signed_at) {
        SecurityCheckResult::pass(
            check,
            format!("signed at {} inside validity window", signature.signed_at),
        )
    } else {
        SecurityCheckResult::fail(
            check,
            format!(
                "signed at {} outside validity window {}..{}",
                signature.signed_at, record.valid_from, record.valid_to
            ),
        )
    }
}

fn check_not_revoked(certificate: Option<&Certificate>) -> SecurityCheckResult {
    let check = SecurityCheck::CertificateNotRevoked;
    match certificate.map(|c| c.status()) {
        None => SecurityCheckResult::fail(check, "certificate unavailable"),
        Some(CertificateStatus::Revoked) => {
            SecurityCheckResult::fail(check, "certificate is on the revocation list")
        }
        Some(_) => SecurityCheckResult::pass(check, "certificate is not revoked"),
    }
}

fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn check_document_hash(
    signature: &DigitalSignature,
    expected_hash: Option<&str>,
) -> SecurityCheckResult {
    let check = SecurityCheck::DocumentHashMatch;
    if !is_sha256_hex(&signature.document_hash) {
        return SecurityCheckResult::fail(check, "bound document hash is malformed");
    }
    match expected_hash {
        None => SecurityCheckResult::pass(check, "no document hash supplied; bound hash is well-formed"),
        Some(expected) if expected.eq_ignore_ascii_case(&signature.document_hash) => {
            SecurityCheckResult::pass(check, "document hash matches")
        }
        Some(expected) => SecurityCheckResult::fail(
            check,
            format!(
                "document hash mismatch: signed {}, supplied {}",
                signature.document_hash, expected
            ),
        ),
    }
}

fn check_integrity(
    signature: &DigitalSignature,
    certificate: Option<&Certificate>,
) -> SecurityCheckResult {
    let check = SecurityCheck::SignatureIntegrity;
    let Some(certificate) = certificate else {
        return SecurityCheckResult::fail(check, "no public key to verify against");
    };
    let key = certificate.public_key();
    if key.fingerprint != signature.certificate_fingerprint {
        return SecurityCheckResult::fail(check, "certificate key fingerprint changed since signing");
    }
    let message = match signature.signed_message() {
        Ok(message) => message,
        Err(e) => return SecurityCheckResult::fail(check, format!("cannot encode message: {}", e)),
    };
    let bytes = match signature.signature_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            return SecurityCheckResult::fail(check, format!("signature value is not base64: {}", e))
        }
    };
    match verify_message(&message, &bytes, &key.key) {
        Ok(()) => SecurityCheckResult::pass(check, format!("{} signature verified", key.algorithm)),
        Err(e) => SecurityCheckResult::fail(check, e.to_string()),
    }
}

fn check_session_binding(signature: &DigitalSignature) -> SecurityCheckResult {
    let check = SecurityCheck::SessionBinding;
    match &signature.session {
        None => SecurityCheckResult::fail(check, "signature carries no session binding"),
        Some(binding) if binding.user_id != signature.signer.user_id => {
            SecurityCheckResult::fail(
                check,
                format!(
                    "session {} belongs to {}, not signer {}",
                    binding.session_id, binding.user_id, signature.signer.user_id
                ),
            )
        }
        Some(binding) => SecurityCheckResult::pass(
            check,
            format!("bound to session {}", binding.session_id),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificates::InMemoryRevocationSource;
    use crate::clock::{Clock, ManualClock};
    use crate::crypto::{compute_document_hash, generate_signing_keypair, sign_message};
    use crate::models::{
        CertificateRecord, CertificateType, ComplianceLevel, PublicKeyInfo, SessionBinding,
        SignerIdentity,
    };
    use chrono::Duration;
    use uuid::Uuid;

    struct Fixture {
        registry: Arc<CertificateRegistry>,
        source: Arc<InMemoryRevocationSource>,
        private_key: Vec<u8>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let source = Arc::new(InMemoryRevocationSource::new());
        let clock = Arc::new(ManualClock::default());
        let registry = Arc::new(CertificateRegistry::new(source.clone(), clock.clone()));
        let keypair = generate_signing_keypair();
        registry
            .register(CertificateRecord {
                id: "cert-1".to_string(),
                certificate_type: CertificateType::Organizational,
                subject: "Clinic".to_string(),
                issuer: "Test CA".to_string(),
                valid_from: clock.now() - Duration::days(1),
                valid_to: clock.now() + Duration::days(30),
                public_key: PublicKeyInfo::ed25519(keypair.public_key.clone()),
                compliance_level: ComplianceLevel::Standard,
            })
            .unwrap();
        Fixture {
            registry,
            source,
            private_key: keypair.private_key.clone(),
            clock,
        }
    }

    fn signed(f: &Fixture, session: Option<SessionBinding>) -> DigitalSignature {
        let cert = f.registry.get("cert-1").unwrap();
        let mut signature = DigitalSignature {
            id: Uuid::new_v4(),
            algorithm: "ed25519".to_string(),
            signature_value: String::new(),
            certificate_id: "cert-1".to_string(),
            certificate_fingerprint: cert.public_key().fingerprint.clone(),
            signed_at: f.clock.now(),
            document_id: "D-1".to_string(),
            document_hash: compute_document_hash(b"document"),
            signer: SignerIdentity::new("U-1", "Pat Signer", "physician"),
            session,
        };
        let bytes = sign_message(&signature.signed_message().unwrap(), &f.private_key).unwrap();
        signature.signature_value = DigitalSignature::encode_signature(&bytes);
        signature
    }

    #[test]
    fn test_clean_signature_passes_every_check() {
        let f = fixture();
        let engine = SecurityCheckEngine::new(f.registry.clone(), false);
        let results = engine.run(&signed(&f, None), None);

        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.passed), "{:?}", results);
    }

    #[test]
    fn test_checks_run_in_fixed_order_without_short_circuit() {
        let f = fixture();
        let engine = SecurityCheckEngine::new(f.registry.clone(), true);
        let mut signature = signed(&f, None);
        signature.certificate_id = "missing".to_string();

        let results = engine.run(&signature, Some(&compute_document_hash(b"other")));
        let order: Vec<_> = results.iter().map(|r| r.check).collect();
        assert_eq!(
            order,
            vec![
                SecurityCheck::CertificateExists,
                SecurityCheck::CertificateValidAtSigning,
                SecurityCheck::CertificateNotRevoked,
                SecurityCheck::DocumentHashMatch,
                SecurityCheck::SignatureIntegrity,
                SecurityCheck::SessionBinding,
            ]
        );
        assert!(results.iter().all(|r| !r.passed));
    }

    #[test]
    fn test_altered_field_breaks_integrity() {
        let f = fixture();
        let engine = SecurityCheckEngine::new(f.registry.clone(), false);
        let mut signature = signed(&f, None);
        signature.signer.role = "administrator".to_string();

        let results = engine.run(&signature, None);
        let integrity = results
            .iter()
            .find(|r| r.check == SecurityCheck::SignatureIntegrity)
            .unwrap();
        assert!(!integrity.passed);
    }

    #[tokio::test]
    async fn test_revoked_certificate_fails_revocation_check_only() {
        let f = fixture();
        let engine = SecurityCheckEngine::new(f.registry.clone(), false);
        let signature = signed(&f, None);
        f.source.revoke("cert-1");
        f.registry.update_revocation_list().await.unwrap();

        let results = engine.run(&signature, None);
        let failed: Vec<_> = results.iter().filter(|r| !r.passed).map(|r| r.check).collect();
        assert_eq!(failed, vec![SecurityCheck::CertificateNotRevoked]);
    }

    #[test]
    fn test_session_binding_must_match_signer() {
        let f = fixture();
        let engine = SecurityCheckEngine::new(f.registry.clone(), true);
        let binding = SessionBinding {
            session_id: Uuid::new_v4(),
            user_id: "U-2".to_string(),
            mfa_token_id: Uuid::new_v4(),
            ip_address: "10.0.0.1".parse().unwrap(),
            device_fingerprint: "device-a".to_string(),
        };

        let results = engine.run(&signed(&f, Some(binding)), None);
        let session = results
            .iter()
            .find(|r| r.check == SecurityCheck::SessionBinding)
            .unwrap();
        assert!(!session.passed);
        assert!(session.detail.contains("U-2"));
    }
}
