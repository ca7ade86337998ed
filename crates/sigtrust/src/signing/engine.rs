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

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{RoleDirectory, SignatureError};
use crate::certificates::{
    CertificateCounts, CertificateError, CertificateKeyring, CertificateRegistry,
};
use crate::clock::Clock;
use crate::config::SigningConfig;
use crate::crypto::{compute_document_hash, sign_message, ALGORITHM};
use crate::models::{
    CaptureRequirements, CertificateType, DigitalSignature, SignaturePayload,
    SignatureVerificationResult,
};
use crate::security::{audit, SecurityCheckEngine};

/// Point-in-time security counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityMetrics {
    pub signatures_created: u64,
    /// Signing requests refused or failed
    pub signing_rejections: u64,
    pub verifications_passed: u64,
    pub verifications_failed: u64,
    pub certificates: CertificateCounts,
    pub last_revocation_refresh: Option<DateTime<Utc>>,
}

/// What signing a document type with a given certificate requires, and what
/// is currently unmet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureRequirements {
    pub document_type: String,
    pub certificate_id: String,
    pub signing_roles: Vec<String>,
    pub allowed_certificate_types: Vec<CertificateType>,
    pub capture: CaptureRequirements,
    pub session_binding_required: bool,
    pub unmet: Vec<String>,
}

impl SignatureRequirements {
    pub fn is_satisfied(&self) -> bool {
        self.unmet.is_empty()
    }
}

#[derive(Debug, Default)]
struct Counters {
    created: AtomicU64,
    rejected: AtomicU64,
    passed: AtomicU64,
    failed: AtomicU64,
}

/// Creates and verifies signatures over document hashes.
pub struct SignatureEngine {
    registry: Arc<CertificateRegistry>,
    keyring: Arc<dyn CertificateKeyring>,
    checks: SecurityCheckEngine,
    roles: Arc<dyn RoleDirectory>,
    config: Arc<SigningConfig>,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

impl SignatureEngine {
    pub fn new(
        registry: Arc<CertificateRegistry>,
        keyring: Arc<dyn CertificateKeyring>,
        roles: Arc<dyn RoleDirectory>,
        config: Arc<SigningConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let checks = SecurityCheckEngine::new(registry.clone(), config.require_session_binding());
        Self {
            registry,
            keyring,
            checks,
            roles,
            config,
            clock,
            counters: Counters::default(),
        }
    }

    /// Resolve the certificate a payload will be signed with: the payload's
    /// own choice, then the configured default, then the first valid one.
    pub fn resolve_certificate_id(&self, requested: Option<&str>) -> Result<String, SignatureError> {
        if let Some(id) = requested.or(self.config.default_certificate_id()) {
            return Ok(id.to_string());
        }
        self.registry
            .select_default_valid()
            .map(|c| c.id().to_string())
            .ok_or(SignatureError::Certificate(CertificateError::NoValidCertificate))
    }

    /// Sign `payload` with its resolved certificate.
    ///
    /// The signing timestamp is taken from the engine clock, truncated to
    /// millisecond precision so the stored form compares equal.
    pub async fn create_signature(
        &self,
        payload: &SignaturePayload,
    ) -> Result<DigitalSignature, SignatureError> {
        match self.sign(payload).await {
            Ok(signature) => {
                self.counters.created.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("sigtrust_signatures_created_total").increment(1);
                audit::log_signature_created(
                    signature.id,
                    &signature.document_id,
                    &signature.signer.user_id,
                    &signature.certificate_id,
                );
                Ok(signature)
            }
            Err(e) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("sigtrust_signing_rejections_total").increment(1);
                audit::log_signature_create_failed(
                    &payload.document_id,
                    &payload.signer.user_id,
                    &e.to_string(),
                );
                Err(e)
            }
        }
    }

    async fn sign(&self, payload: &SignaturePayload) -> Result<DigitalSignature, SignatureError> {
        validate_payload(payload)?;

        match &payload.session {
            None if self.config.require_session_binding() => {
                return Err(SignatureError::SessionMissing)
            }
            Some(binding) if binding.user_id != payload.signer.user_id => {
                return Err(SignatureError::SessionMismatch(format!(
                    "session {} is bound to {}",
                    binding.session_id, binding.user_id
                )))
            }
            _ => {}
        }

        let certificate_id = self.resolve_certificate_id(payload.certificate_id.as_deref())?;
        let certificate = self.registry.require_valid(&certificate_id)?;
        let private_key = self.keyring.signing_key(&certificate_id).await?;

        let now = self.clock.now();
        let signed_at = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);

        let mut signature = DigitalSignature {
            id: Uuid::new_v4(),
            algorithm: ALGORITHM.to_string(),
            signature_value: String::new(),
            certificate_id,
            certificate_fingerprint: certificate.public_key().fingerprint.clone(),
            signed_at,
            document_id: payload.document_id.clone(),
            document_hash: payload.document_hash.to_ascii_lowercase(),
            signer: payload.signer.clone(),
            session: payload.session.clone(),
        };
        let message = signature.signed_message()?;
        let value = sign_message(&message, &private_key)?;
        signature.signature_value = DigitalSignature::encode_signature(&value);

        Ok(signature)
    }

    /// Run the security check battery. A failing signature is reported in
    /// the result, not as an error.
    pub async fn verify_signature(
        &self,
        signature: &DigitalSignature,
        document_hash: Option<&str>,
    ) -> Result<SignatureVerificationResult, SignatureError> {
        let checks = self.checks.run(signature, document_hash);
        let result = SignatureVerificationResult::new(signature.id, checks, self.clock.now());

        if result.is_valid() {
            self.counters.passed.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("sigtrust_verifications_total", "outcome" => "passed").increment(1);
            audit::log_verification_success(
                signature.id,
                &signature.document_id,
                &signature.certificate_id,
            );
        } else {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("sigtrust_verifications_total", "outcome" => "failed").increment(1);
            let failed: Vec<&str> = result.failed_checks().map(|c| c.check.as_str()).collect();
            audit::log_verification_failure(signature.id, &signature.document_id, &failed.join(","));
        }

        Ok(result)
    }

    /// SHA-256 hex digest of document content.
    pub fn generate_document_hash(&self, content: &[u8]) -> String {
        compute_document_hash(content)
    }

    /// Whether `user_id` holds `role` and `role` may sign `document_type`.
    pub fn can_user_sign(&self, user_id: &str, role: &str, document_type: &str) -> bool {
        if user_id.is_empty() || role.is_empty() || document_type.is_empty() {
            return false;
        }
        if !self.roles.has_role(user_id, role) {
            tracing::debug!(user_id = %user_id, role = %role, "Role not held by user");
            return false;
        }
        self.config
            .signing_roles_for(document_type)
            .iter()
            .any(|r| r == role)
    }

    pub fn get_security_metrics(&self) -> SecurityMetrics {
        SecurityMetrics {
            signatures_created: self.counters.created.load(Ordering::Relaxed),
            signing_rejections: self.counters.rejected.load(Ordering::Relaxed),
            verifications_passed: self.counters.passed.load(Ordering::Relaxed),
            verifications_failed: self.counters.failed.load(Ordering::Relaxed),
            certificates: self.registry.counts(),
            last_revocation_refresh: self.registry.last_refreshed_at(),
        }
    }

    /// Report the requirements for signing `document_type` with
    /// `certificate_id` and which of them are currently unmet.
    pub fn validate_signature_requirements(
        &self,
        document_type: &str,
        certificate_id: &str,
    ) -> SignatureRequirements {
        let allowed = self.config.allowed_certificate_types_for(document_type);
        let mut unmet = Vec::new();

        match self.registry.get(certificate_id) {
            None => unmet.push(format!("certificate {} is not registered", certificate_id)),
            Some(certificate) => {
                if !certificate.is_valid() {
                    unmet.push(format!(
                        "certificate {} is {}",
                        certificate_id,
                        certificate.status()
                    ));
                }
                if !allowed.is_empty() && !allowed.contains(&certificate.certificate_type()) {
                    unmet.push(format!(
                        "certificate type {} is not accepted for {}",
                        certificate.certificate_type(),
                        document_type
                    ));
                }
            }
        }

        SignatureRequirements {
            document_type: document_type.to_string(),
            certificate_id: certificate_id.to_string(),
            signing_roles: self.config.signing_roles_for(document_type).to_vec(),
            allowed_certificate_types: allowed.to_vec(),
            capture: self.config.capture_requirements_for(document_type),
            session_binding_required: self.config.require_session_binding(),
            unmet,
        }
    }
}

fn validate_payload(payload: &SignaturePayload) -> Result<(), SignatureError> {
    if payload.document_id.trim().is_empty() {
        return Err(SignatureError::InvalidPayload("document id is empty".to_string()));
    }
    if payload.document_hash.is_empty() {
        return Err(SignatureError::InvalidPayload("document hash is missing".to_string()));
    }
    if !is_sha256_hex(&payload.document_hash) {
        return Err(SignatureError::InvalidPayload(
            "document hash must be a SHA-256 hex digest".to_string(),
        ));
    }
    let signer = &payload.signer;
    if signer.user_id.trim().is_empty() || signer.name.trim().is_empty() || signer.role.trim().is_empty()
    {
        return Err(SignatureError::InvalidPayload(
            "signer identity is incomplete".to_string(),
        ));
    }
    Ok(())
}
