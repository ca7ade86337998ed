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

//! Domain models shared across the signing core.
//!
//! These are API-level types; persistence representations stay opaque to
//! callers beyond the storage identifier.

pub mod capture;
pub mod certificate;
pub mod session;
pub mod signature;
pub mod storage;
pub mod workflow;

pub use capture::{
    CaptureFailure, CapturePoint, CaptureRequirements, CaptureValidation, InputMethod,
    SignatureCapture, Stroke,
};
pub use certificate::{
    Certificate, CertificateRecord, CertificateStatus, CertificateType, ComplianceLevel,
    PublicKeyInfo,
};
pub use session::{AuthenticationSession, MfaChallenge, MfaMethod, MfaVerification};
pub use signature::{
    DigitalSignature, SecurityCheck, SecurityCheckResult, SessionBinding, SignaturePayload,
    SignatureVerificationResult, SignerIdentity,
};
pub use storage::{AccessLogEntry, AccessOutcome, StorageStatus, StoredSignatureRecord};
pub use workflow::{SigningProcess, StepTransition, WorkflowStep};
