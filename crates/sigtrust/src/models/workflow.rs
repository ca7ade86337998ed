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

//! Signing-process records tracked by the workflow engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::capture::CaptureValidation;
use super::signature::{DigitalSignature, SignatureVerificationResult, SignerIdentity};

/// Steps of the signing state machine.
///
/// Each non-terminal step names the phase currently in progress; the action
/// that completes that phase advances the process to the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    Initialized,
    CaptureInProgress,
    CaptureValidated,
    Authenticating,
    Signing,
    Stored,
    Complete,
    Failed,
}

impl WorkflowStep {
    /// 1-based position in the happy path. `Failed` is 0.
    pub fn number(&self) -> u8 {
        match self {
            WorkflowStep::Initialized => 1,
            WorkflowStep::CaptureInProgress => 2,
            WorkflowStep::CaptureValidated => 3,
            WorkflowStep::Authenticating => 4,
            WorkflowStep::Signing => 5,
            WorkflowStep::Stored => 6,
            WorkflowStep::Complete => 7,
            WorkflowStep::Failed => 0,
        }
    }

    pub fn next(&self) -> Option<WorkflowStep> {
        match self {
            WorkflowStep::Initialized => Some(WorkflowStep::CaptureInProgress),
            WorkflowStep::CaptureInProgress => Some(WorkflowStep::CaptureValidated),
            WorkflowStep::CaptureValidated => Some(WorkflowStep::Authenticating),
            WorkflowStep::Authenticating => Some(WorkflowStep::Signing),
            WorkflowStep::Signing => Some(WorkflowStep::Stored),
            WorkflowStep::Stored => Some(WorkflowStep::Complete),
            WorkflowStep::Complete | WorkflowStep::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStep::Complete | WorkflowStep::Failed)
    }

    /// Whether the certificate may still be changed at this step.
    pub fn allows_certificate_change(&self) -> bool {
        self.number() >= 1 && self.number() < WorkflowStep::Signing.number()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStep::Initialized => "initialized",
            WorkflowStep::CaptureInProgress => "capture_in_progress",
            WorkflowStep::CaptureValidated => "capture_validated",
            WorkflowStep::Authenticating => "authenticating",
            WorkflowStep::Signing => "signing",
            WorkflowStep::Stored => "stored",
            WorkflowStep::Complete => "complete",
            WorkflowStep::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded step change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTransition {
    pub from: WorkflowStep,
    pub to: WorkflowStep,
    pub at: DateTime<Utc>,
}

/// The process record for one document's signing run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SigningProcess {
    pub process_id: Uuid,
    pub document_id: String,
    pub document_type: String,
    /// Opaque form context supplied by the document system
    pub form_data: Option<serde_json::Value>,
    pub step: WorkflowStep,
    pub certificate_id: Option<String>,
    pub capture: Option<CaptureValidation>,
    pub session_id: Option<Uuid>,
    pub signer: Option<SignerIdentity>,
    pub signature: Option<DigitalSignature>,
    pub verification: Option<SignatureVerificationResult>,
    pub storage_id: Option<Uuid>,
    pub last_error: Option<String>,
    pub history: Vec<StepTransition>,
    /// Incremented by every committed change to the record
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SigningProcess {
    pub(crate) fn new(
        document_type: String,
        document_id: String,
        form_data: Option<serde_json::Value>,
        certificate_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            process_id: Uuid::new_v4(),
            document_id,
            document_type,
            form_data,
            step: WorkflowStep::Initialized,
            certificate_id,
            capture: None,
            session_id: None,
            signer: None,
            signature: None,
            verification: None,
            storage_id: None,
            last_error: None,
            history: Vec::new(),
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn transition(&mut self, to: WorkflowStep, now: DateTime<Utc>) {
        self.history.push(StepTransition {
            from: self.step,
            to,
            at: now,
        });
        self.step = to;
        self.updated_at = now;
    }

    pub fn is_complete(&self) -> bool {
        self.step == WorkflowStep::Complete
    }
}
