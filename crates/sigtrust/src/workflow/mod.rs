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

//! The per-document signing workflow.
//!
//! ```text
//! Initialized -> CaptureInProgress -> CaptureValidated -> Authenticating
//!     -> Signing -> Stored -> Complete
//! ```
//!
//! Any non-terminal step can move to `Failed`. Each call to
//! [`SigningWorkflowEngine::process_workflow_step`] takes the [`StepAction`]
//! that completes the current step and advances exactly one step.

mod capture;
mod engine;

pub use capture::validate_signature_capture;
pub use engine::SigningWorkflowEngine;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::certificates::CertificateError;
use crate::error::ErrorKind;
use crate::models::{CaptureValidation, SignatureCapture, SignerIdentity, WorkflowStep};
use crate::signing::SignatureError;
use crate::storage::StoreError;

/// Input for the Signing step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRequest {
    pub signer: SignerIdentity,
    /// SHA-256 hex hash of the document content being signed
    pub document_hash: String,
}

impl SignRequest {
    pub fn new(signer: SignerIdentity, document_hash: impl Into<String>) -> Self {
        Self {
            signer,
            document_hash: document_hash.into(),
        }
    }
}

/// The action that completes the current step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    /// Initialized -> CaptureInProgress
    StartCapture,
    /// CaptureInProgress -> CaptureValidated, if the capture passes
    SubmitCapture(SignatureCapture),
    /// CaptureValidated -> Authenticating
    BeginAuthentication,
    /// Authenticating -> Signing, with an active session
    Authenticate { session_id: Uuid },
    /// Signing -> Stored, once the signature is created and verified
    Sign(SignRequest),
    /// Stored -> Complete, once the signature is persisted
    Store,
}

impl StepAction {
    pub fn name(&self) -> &'static str {
        match self {
            StepAction::StartCapture => "start_capture",
            StepAction::SubmitCapture(_) => "submit_capture",
            StepAction::BeginAuthentication => "begin_authentication",
            StepAction::Authenticate { .. } => "authenticate",
            StepAction::Sign(_) => "sign",
            StepAction::Store => "store",
        }
    }
}

/// Result of a successful step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepAdvance {
    pub process_id: Uuid,
    pub step: WorkflowStep,
    /// `step.number()`
    pub step_number: u8,
}

/// Errors raised by the workflow engine.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Signing process not found: {0}")]
    ProcessNotFound(Uuid),

    #[error("Action '{action}' is not valid at step '{step}'")]
    InvalidTransition {
        step: WorkflowStep,
        action: &'static str,
    },

    #[error("Signing process {0} was replaced or advanced concurrently")]
    ProcessReplaced(Uuid),

    #[error("Invalid workflow request: {0}")]
    InvalidRequest(String),

    #[error("Signature capture did not meet requirements: {}", describe_failures(.0))]
    CaptureQualityInsufficient(CaptureValidation),

    #[error("User {user_id} with role {role} may not sign {document_type}")]
    Unauthorized {
        user_id: String,
        role: String,
        document_type: String,
    },

    #[error("Certificate requirements not met: {}", .0.join("; "))]
    CertificateRequirementsUnmet(Vec<String>),

    #[error("Newly created signature failed verification: {0}")]
    VerificationFailed(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn describe_failures(validation: &CaptureValidation) -> String {
    validation
        .failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::ProcessNotFound(_) => ErrorKind::NotFound,
            WorkflowError::InvalidTransition { .. } | WorkflowError::ProcessReplaced(_) => {
                ErrorKind::InvalidTransition
            }
            WorkflowError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            WorkflowError::CaptureQualityInsufficient(_) => ErrorKind::CaptureQualityInsufficient,
            WorkflowError::Unauthorized { .. } => ErrorKind::Unauthorized,
            WorkflowError::CertificateRequirementsUnmet(_) => ErrorKind::CertificateInvalid,
            WorkflowError::VerificationFailed(_) => ErrorKind::Crypto,
            WorkflowError::Auth(e) => e.kind(),
            WorkflowError::Signature(e) => e.kind(),
            WorkflowError::Certificate(e) => e.kind(),
            WorkflowError::Store(e) => e.kind(),
        }
    }
}
