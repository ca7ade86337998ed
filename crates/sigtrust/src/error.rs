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

//! Shared error vocabulary.
//!
//! Each component owns its own `thiserror` enum. [`ErrorKind`] is the common
//! taxonomy those enums map onto, so callers can render the originating kind
//! of any failure next to its human-readable message.

use std::fmt;
use thiserror::Error;

/// Classification of every failure the signing core can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Selected certificate is missing, expired, or revoked.
    CertificateInvalid,
    /// Signing attempted without a verified, unconsumed MFA token.
    MfaRequired,
    /// The MFA challenge itself failed (expired, locked out).
    MfaVerificationFailed,
    /// Signing attempted with no active authentication session.
    SessionMissing,
    /// A signature capture failed one or more quality thresholds.
    CaptureQualityInsufficient,
    /// Persistence could not complete.
    StorageFailure,
    /// The access policy rejected a retrieval.
    AccessDenied,
    /// A referenced record does not exist.
    NotFound,
    /// The request was malformed (missing fields, empty reason).
    InvalidRequest,
    /// The signer is not authorized for the document type.
    Unauthorized,
    /// A workflow action does not apply to the current step.
    InvalidTransition,
    /// The external transport failed.
    Transport,
    /// A cryptographic primitive failed.
    Crypto,
    /// Configuration could not be loaded or is invalid.
    Configuration,
}

impl ErrorKind {
    /// Stable snake_case name, used in audit events.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::CertificateInvalid => "certificate_invalid",
            ErrorKind::MfaRequired => "mfa_required",
            ErrorKind::MfaVerificationFailed => "mfa_verification_failed",
            ErrorKind::SessionMissing => "session_missing",
            ErrorKind::CaptureQualityInsufficient => "capture_quality_insufficient",
            ErrorKind::StorageFailure => "storage_failure",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::Transport => "transport",
            ErrorKind::Crypto => "crypto",
            ErrorKind::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of an external collaborator reached over the transport boundary
/// (revocation list fetch, MFA code delivery, storage backend).
#[derive(Debug, Clone, Error)]
#[error("{service} unavailable: {message}")]
pub struct TransportError {
    /// Name of the remote service that failed.
    pub service: String,
    /// Description of the failure.
    pub message: String,
}

impl TransportError {
    pub fn new(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            message: message.into(),
        }
    }
}
