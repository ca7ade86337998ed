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

//! Security audit logging for SIEM integration.
//!
//! This module provides structured audit logging for all security-sensitive operations:
//! - Certificate registration and revocation refresh
//! - Signature creation and verification
//! - MFA challenges and signing sessions
//! - Encrypted storage and every retrieval attempt
//! - Signing workflow progress
//!
//! All events use structured fields compatible with common SIEM systems.
//! MFA codes and key material are never passed to these functions.

use uuid::Uuid;

/// Event types for signing-core operations.
pub mod events {
    /// Certificate registered event type.
    pub const CERTIFICATE_REGISTERED: &str = "certificate.registered";
    /// Certificate newly revoked event type.
    pub const CERTIFICATE_REVOKED: &str = "certificate.revoked";
    /// Revocation list refreshed event type.
    pub const REVOCATION_REFRESHED: &str = "certificate.revocation.refreshed";
    /// Revocation list refresh failure event type.
    pub const REVOCATION_REFRESH_FAILED: &str = "certificate.revocation.refresh_failed";

    /// Signature created event type.
    pub const SIGNATURE_CREATED: &str = "signature.created";
    /// Signature creation failure event type.
    pub const SIGNATURE_CREATE_FAILED: &str = "signature.create_failed";

    /// Verification success event type.
    pub const VERIFICATION_SUCCESS: &str = "verification.success";
    /// Verification failure event type.
    pub const VERIFICATION_FAILURE: &str = "verification.failure";

    /// MFA challenge issued event type.
    pub const MFA_INITIATED: &str = "mfa.initiated";
    /// MFA code accepted event type.
    pub const MFA_VERIFIED: &str = "mfa.verified";
    /// MFA code mismatch event type.
    pub const MFA_MISMATCH: &str = "mfa.mismatch";
    /// MFA challenge hard failure (expired, locked out) event type.
    pub const MFA_FAILED: &str = "mfa.failed";

    /// Signing session created event type.
    pub const SESSION_CREATED: &str = "session.created";
    /// Signing session refused event type.
    pub const SESSION_REJECTED: &str = "session.rejected";
    /// Signing session consumed event type.
    pub const SESSION_CONSUMED: &str = "session.consumed";

    /// Signature stored event type.
    pub const STORAGE_STORED: &str = "storage.stored";
    /// Signature store failure event type.
    pub const STORAGE_STORE_FAILED: &str = "storage.store_failed";
    /// Stored signature accessed event type.
    pub const STORAGE_ACCESSED: &str = "storage.accessed";
    /// Stored signature access denied event type.
    pub const STORAGE_ACCESS_DENIED: &str = "storage.access_denied";

    /// Workflow initialized event type.
    pub const WORKFLOW_INITIALIZED: &str = "workflow.initialized";
    /// Workflow replaced a prior process event type.
    pub const WORKFLOW_REPLACED: &str = "workflow.replaced";
    /// Workflow step advanced event type.
    pub const WORKFLOW_STEP: &str = "workflow.step";
    /// Workflow completed event type.
    pub const WORKFLOW_COMPLETED: &str = "workflow.completed";
    /// Workflow failed event type.
    pub const WORKFLOW_FAILED: &str = "workflow.failed";
}

/// Log a certificate registration.
pub fn log_certificate_registered(certificate_id: &str, certificate_type: &str, fingerprint: &str) {
    tracing::info!(
        event_type = events::CERTIFICATE_REGISTERED,
        certificate_id = %certificate_id,
        certificate_type = %certificate_type,
        key_fingerprint = %fingerprint,
        "Certificate registered"
    );
}

/// Log a certificate that became revoked during a refresh.
pub fn log_certificate_revoked(certificate_id: &str) {
    tracing::warn!(
        event_type = events::CERTIFICATE_REVOKED,
        certificate_id = %certificate_id,
        "Certificate revoked"
    );
}

/// Log a completed revocation list refresh.
pub fn log_revocation_refreshed(newly_revoked: usize, total_revoked: usize) {
    tracing::info!(
        event_type = events::REVOCATION_REFRESHED,
        newly_revoked = newly_revoked,
        total_revoked = total_revoked,
        "Revocation list refreshed"
    );
}

/// Log a failed revocation list refresh. Cached statuses stay in force.
pub fn log_revocation_refresh_failed(error: &str) {
    tracing::error!(
        event_type = events::REVOCATION_REFRESH_FAILED,
        error = %error,
        "Revocation list refresh failed, keeping cached statuses"
    );
}

/// Log a created signature.
pub fn log_signature_created(
    signature_id: Uuid,
    document_id: &str,
    signer_user_id: &str,
    certificate_id: &str,
) {
    tracing::info!(
        event_type = events::SIGNATURE_CREATED,
        signature_id = %signature_id,
        document_id = %document_id,
        signer_user_id = %signer_user_id,
        certificate_id = %certificate_id,
        "Signature created"
    );
}

/// Log a refused or failed signature creation.
pub fn log_signature_create_failed(document_id: &str, signer_user_id: &str, error: &str) {
    tracing::warn!(
        event_type = events::SIGNATURE_CREATE_FAILED,
        document_id = %document_id,
        signer_user_id = %signer_user_id,
        error = %error,
        "Signature creation failed"
    );
}

/// Log a successful verification.
pub fn log_verification_success(signature_id: Uuid, document_id: &str, certificate_id: &str) {
    tracing::info!(
        event_type = events::VERIFICATION_SUCCESS,
        signature_id = %signature_id,
        document_id = %document_id,
        certificate_id = %certificate_id,
        "Signature verification succeeded"
    );
}

/// Log a failed verification with the names of the failing checks.
pub fn log_verification_failure(signature_id: Uuid, document_id: &str, failed_checks: &str) {
    tracing::warn!(
        event_type = events::VERIFICATION_FAILURE,
        signature_id = %signature_id,
        document_id = %document_id,
        failed_checks = %failed_checks,
        "Signature verification failed"
    );
}

/// Log an issued MFA challenge.
pub fn log_mfa_initiated(token_id: Uuid, user_id: &str, method: &str) {
    tracing::info!(
        event_type = events::MFA_INITIATED,
        token_id = %token_id,
        user_id = %user_id,
        method = %method,
        "MFA challenge issued"
    );
}

/// Log an accepted MFA code.
pub fn log_mfa_verified(token_id: Uuid, user_id: &str) {
    tracing::info!(
        event_type = events::MFA_VERIFIED,
        token_id = %token_id,
        user_id = %user_id,
        "MFA challenge verified"
    );
}

/// Log a rejected MFA code.
pub fn log_mfa_mismatch(token_id: Uuid, user_id: &str, remaining_attempts: u32) {
    tracing::warn!(
        event_type = events::MFA_MISMATCH,
        token_id = %token_id,
        user_id = %user_id,
        remaining_attempts = remaining_attempts,
        "MFA code mismatch"
    );
}

/// Log an MFA challenge that can no longer be satisfied.
pub fn log_mfa_failed(token_id: Uuid, reason: &str) {
    tracing::warn!(
        event_type = events::MFA_FAILED,
        token_id = %token_id,
        reason = %reason,
        "MFA challenge failed"
    );
}

/// Log a new signing session.
pub fn log_session_created(session_id: Uuid, user_id: &str, role: &str, ip_address: &str) {
    tracing::info!(
        event_type = events::SESSION_CREATED,
        session_id = %session_id,
        user_id = %user_id,
        role = %role,
        ip_address = %ip_address,
        "Signing session created"
    );
}

/// Log a refused session request.
pub fn log_session_rejected(user_id: &str, reason: &str) {
    tracing::warn!(
        event_type = events::SESSION_REJECTED,
        user_id = %user_id,
        reason = %reason,
        "Signing session rejected"
    );
}

/// Log a session consumed by a completed signing.
pub fn log_session_consumed(session_id: Uuid, user_id: &str) {
    tracing::info!(
        event_type = events::SESSION_CONSUMED,
        session_id = %session_id,
        user_id = %user_id,
        "Signing session consumed"
    );
}

/// Log a stored signature.
pub fn log_signature_stored(storage_id: Uuid, signature_id: Uuid, document_id: &str) {
    tracing::info!(
        event_type = events::STORAGE_STORED,
        storage_id = %storage_id,
        signature_id = %signature_id,
        document_id = %document_id,
        "Signature stored"
    );
}

/// Log a failed store.
pub fn log_signature_store_failed(signature_id: Uuid, error: &str) {
    tracing::error!(
        event_type = events::STORAGE_STORE_FAILED,
        signature_id = %signature_id,
        error = %error,
        "Failed to store signature"
    );
}

/// Log a granted retrieval.
pub fn log_storage_accessed(storage_id: Uuid, user_id: &str, reason: &str) {
    tracing::info!(
        event_type = events::STORAGE_ACCESSED,
        storage_id = %storage_id,
        user_id = %user_id,
        reason = %reason,
        "Stored signature accessed"
    );
}

/// Log a refused retrieval.
pub fn log_storage_access_denied(storage_id: Uuid, user_id: &str, reason: &str, error: &str) {
    tracing::warn!(
        event_type = events::STORAGE_ACCESS_DENIED,
        storage_id = %storage_id,
        user_id = %user_id,
        reason = %reason,
        error = %error,
        "Stored signature access denied"
    );
}

/// Log a new workflow process.
pub fn log_workflow_initialized(process_id: Uuid, document_id: &str, document_type: &str) {
    tracing::info!(
        event_type = events::WORKFLOW_INITIALIZED,
        process_id = %process_id,
        document_id = %document_id,
        document_type = %document_type,
        "Signing workflow initialized"
    );
}

/// Log a process discarded by re-initialization.
pub fn log_workflow_replaced(previous_process_id: Uuid, document_id: &str, previous_step: &str) {
    tracing::warn!(
        event_type = events::WORKFLOW_REPLACED,
        previous_process_id = %previous_process_id,
        document_id = %document_id,
        previous_step = %previous_step,
        "Signing workflow replaced"
    );
}

/// Log a step transition.
pub fn log_workflow_step(process_id: Uuid, from: &str, to: &str) {
    tracing::debug!(
        event_type = events::WORKFLOW_STEP,
        process_id = %process_id,
        from = %from,
        to = %to,
        "Signing workflow advanced"
    );
}

/// Log a completed workflow.
pub fn log_workflow_completed(process_id: Uuid, document_id: &str, storage_id: Uuid) {
    tracing::info!(
        event_type = events::WORKFLOW_COMPLETED,
        process_id = %process_id,
        document_id = %document_id,
        storage_id = %storage_id,
        "Signing workflow completed"
    );
}

/// Log a workflow that reached `Failed`.
pub fn log_workflow_failed(process_id: Uuid, document_id: &str, error: &str) {
    tracing::error!(
        event_type = events::WORKFLOW_FAILED,
        process_id = %process_id,
        document_id = %document_id,
        error = %error,
        "Signing workflow failed"
    );
}
