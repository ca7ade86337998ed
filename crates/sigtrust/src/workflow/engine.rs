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

//! Signing workflow state machine.
//!
//! Every step runs against a snapshot of the process and commits the result
//! only if the process is still the same record at the same revision. Async
//! work (signing, storage) never holds the process table lock.
//!
//! A process claims its authentication session at Authenticating and spends
//! it when the signature is created, so one session signs one run.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use super::{
    validate_signature_capture, SignRequest, StepAction, StepAdvance, WorkflowError,
};
use crate::auth::AuthenticationManager;
use crate::clock::Clock;
use crate::error::ErrorKind;
use crate::config::SigningConfig;
use crate::models::{
    CaptureRequirements, CaptureValidation, SignatureCapture, SignaturePayload, SigningProcess,
    WorkflowStep,
};
use crate::security::audit;
use crate::signing::{SignatureEngine, SignatureError};
use crate::storage::EncryptedSignatureStore;

#[derive(Debug, Default)]
struct ProcessTable {
    by_document: HashMap<String, SigningProcess>,
    document_of: HashMap<Uuid, String>,
}

impl ProcessTable {
    fn get(&self, process_id: Uuid) -> Option<&SigningProcess> {
        self.document_of
            .get(&process_id)
            .and_then(|document_id| self.by_document.get(document_id))
    }
}

/// How a step ended.
enum StepOutcome {
    /// Move to the next step with the updated record.
    Advance(SigningProcess),
    /// Stay at the current step, keeping the updated record, and report the error.
    Hold(SigningProcess, WorkflowError),
    /// Move to `Failed` and report the error.
    Fail(WorkflowError),
}

/// Drives one signing process per document.
pub struct SigningWorkflowEngine {
    table: RwLock<ProcessTable>,
    signatures: Arc<SignatureEngine>,
    auth: Arc<AuthenticationManager>,
    store: Arc<EncryptedSignatureStore>,
    config: Arc<SigningConfig>,
    clock: Arc<dyn Clock>,
}

impl SigningWorkflowEngine {
    pub fn new(
        signatures: Arc<SignatureEngine>,
        auth: Arc<AuthenticationManager>,
        store: Arc<EncryptedSignatureStore>,
        config: Arc<SigningConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            table: RwLock::new(ProcessTable::default()),
            signatures,
            auth,
            store,
            config,
            clock,
        }
    }

    /// Start a new process for `document_id`, replacing any existing one.
    pub fn initialize_workflow(
        &self,
        document_type: &str,
        document_id: &str,
        form_data: Option<serde_json::Value>,
    ) -> Result<SigningProcess, WorkflowError> {
        if document_type.trim().is_empty() || document_id.trim().is_empty() {
            return Err(WorkflowError::InvalidRequest(
                "document type and document id are required".to_string(),
            ));
        }

        let process = SigningProcess::new(
            document_type.to_string(),
            document_id.to_string(),
            form_data,
            self.config.default_certificate_id().map(str::to_string),
            self.clock.now(),
        );

        let previous = {
            let mut table = self.table.write();
            let previous = table
                .by_document
                .insert(document_id.to_string(), process.clone());
            if let Some(previous) = &previous {
                table.document_of.remove(&previous.process_id);
            }
            table
                .document_of
                .insert(process.process_id, document_id.to_string());
            previous
        };

        if let Some(previous) = previous {
            audit::log_workflow_replaced(previous.process_id, document_id, previous.step.as_str());
        }
        audit::log_workflow_initialized(process.process_id, document_id, document_type);
        Ok(process)
    }

    /// Check a capture against explicit requirements without touching any process.
    pub fn validate_signature_capture(
        &self,
        capture: &SignatureCapture,
        requirements: &CaptureRequirements,
    ) -> CaptureValidation {
        validate_signature_capture(capture, requirements)
    }

    /// Read-only snapshot of the current process for a document.
    pub fn get_workflow_status(&self, document_id: &str) -> Option<SigningProcess> {
        self.table.read().by_document.get(document_id).cloned()
    }

    pub fn get_process(&self, process_id: Uuid) -> Option<SigningProcess> {
        self.table.read().get(process_id).cloned()
    }

    /// Choose the certificate to sign with. Allowed until Signing begins.
    pub fn select_certificate(
        &self,
        process_id: Uuid,
        certificate_id: &str,
    ) -> Result<SigningProcess, WorkflowError> {
        let mut process = self.snapshot(process_id)?;
        if !process.step.allows_certificate_change() {
            return Err(WorkflowError::InvalidTransition {
                step: process.step,
                action: "select_certificate",
            });
        }
        let requirements = self
            .signatures
            .validate_signature_requirements(&process.document_type, certificate_id);
        if !requirements.is_satisfied() {
            return Err(WorkflowError::CertificateRequirementsUnmet(requirements.unmet));
        }

        let revision = process.revision;
        process.certificate_id = Some(certificate_id.to_string());
        process.updated_at = self.clock.now();
        self.commit(revision, &mut process)?;
        Ok(process)
    }

    /// Advance `process_id` by exactly one step.
    ///
    /// On success the process has moved and the new step is returned. On error
    /// the process is either unchanged or, for unrecoverable failures, moved
    /// to `Failed`.
    pub async fn process_workflow_step(
        &self,
        process_id: Uuid,
        action: StepAction,
    ) -> Result<StepAdvance, WorkflowError> {
        let snapshot = self.snapshot(process_id)?;
        let revision = snapshot.revision;
        let from = snapshot.step;

        let outcome = match (from, action) {
            (WorkflowStep::Initialized, StepAction::StartCapture)
            | (WorkflowStep::CaptureValidated, StepAction::BeginAuthentication) => {
                StepOutcome::Advance(snapshot)
            }
            (WorkflowStep::CaptureInProgress, StepAction::SubmitCapture(capture)) => {
                self.capture_step(snapshot, &capture)
            }
            (WorkflowStep::Authenticating, StepAction::Authenticate { session_id }) => {
                self.authenticate_step(snapshot, session_id)
            }
            (WorkflowStep::Signing, StepAction::Sign(request)) => {
                self.sign_step(snapshot, request).await
            }
            (WorkflowStep::Stored, StepAction::Store) => self.store_step(snapshot).await,
            (step, action) => {
                return Err(WorkflowError::InvalidTransition {
                    step,
                    action: action.name(),
                })
            }
        };

        match outcome {
            StepOutcome::Advance(mut process) => {
                let Some(next) = from.next() else {
                    return Err(WorkflowError::InvalidTransition {
                        step: from,
                        action: "advance",
                    });
                };
                process.last_error = None;
                process.transition(next, self.clock.now());
                if let Err(e) = self.commit(revision, &mut process) {
                    if from == WorkflowStep::Authenticating {
                        if let Some(session_id) = process.session_id {
                            self.auth.release_session(session_id, process_id);
                        }
                    }
                    return Err(e);
                }

                audit::log_workflow_step(process_id, from.as_str(), next.as_str());
                if next == WorkflowStep::Complete {
                    if let Some(storage_id) = process.storage_id {
                        audit::log_workflow_completed(process_id, &process.document_id, storage_id);
                    }
                }
                Ok(StepAdvance {
                    process_id,
                    step: next,
                    step_number: next.number(),
                })
            }
            StepOutcome::Hold(mut process, error) => {
                process.last_error = Some(error.to_string());
                process.updated_at = self.clock.now();
                self.commit(revision, &mut process)?;
                Err(error)
            }
            StepOutcome::Fail(error) => {
                self.fail(process_id, revision, &error.to_string())?;
                Err(error)
            }
        }
    }

    fn capture_step(&self, mut process: SigningProcess, capture: &SignatureCapture) -> StepOutcome {
        let requirements = self.config.capture_requirements_for(&process.document_type);
        let validation = validate_signature_capture(capture, &requirements);
        process.capture = Some(validation.clone());
        if validation.passed {
            StepOutcome::Advance(process)
        } else {
            StepOutcome::Hold(process, WorkflowError::CaptureQualityInsufficient(validation))
        }
    }

    fn authenticate_step(&self, mut process: SigningProcess, session_id: Uuid) -> StepOutcome {
        let session = match self.auth.validate_session(session_id) {
            Ok(session) => session,
            Err(e) => return StepOutcome::Hold(process, e.into()),
        };
        if !self
            .signatures
            .can_user_sign(&session.user_id, &session.role, &process.document_type)
        {
            let error = WorkflowError::Unauthorized {
                user_id: session.user_id,
                role: session.role,
                document_type: process.document_type.clone(),
            };
            return StepOutcome::Hold(process, error);
        }

        let certificate_id = match self
            .signatures
            .resolve_certificate_id(process.certificate_id.as_deref())
        {
            Ok(id) => id,
            Err(e) => return StepOutcome::Hold(process, e.into()),
        };
        let requirements = self
            .signatures
            .validate_signature_requirements(&process.document_type, &certificate_id);
        if !requirements.is_satisfied() {
            return StepOutcome::Hold(
                process,
                WorkflowError::CertificateRequirementsUnmet(requirements.unmet),
            );
        }

        if let Err(e) = self.auth.claim_session(session.session_id, process.process_id) {
            return StepOutcome::Hold(process, e.into());
        }
        process.session_id = Some(session.session_id);
        process.certificate_id = Some(certificate_id);
        StepOutcome::Advance(process)
    }

    async fn sign_step(&self, mut process: SigningProcess, request: SignRequest) -> StepOutcome {
        let (Some(session_id), Some(certificate_id)) =
            (process.session_id, process.certificate_id.clone())
        else {
            return StepOutcome::Fail(WorkflowError::InvalidRequest(
                "process reached signing without a session and certificate".to_string(),
            ));
        };

        // Claimed at Authenticating; it must still be live and held by this run.
        let session = match self.auth.claim_session(session_id, process.process_id) {
            Ok(session) => session,
            Err(e) => return StepOutcome::Fail(e.into()),
        };
        if request.signer.user_id != session.user_id || request.signer.role != session.role {
            let error = WorkflowError::Unauthorized {
                user_id: request.signer.user_id,
                role: request.signer.role,
                document_type: process.document_type.clone(),
            };
            return StepOutcome::Hold(process, error);
        }

        let payload = SignaturePayload::new(
            process.document_id.clone(),
            request.document_hash.clone(),
            request.signer.clone(),
        )
        .with_certificate(certificate_id)
        .with_session(session.binding());

        let signature = match self.signatures.create_signature(&payload).await {
            Ok(signature) => signature,
            Err(e @ SignatureError::InvalidPayload(_)) => {
                return StepOutcome::Hold(process, e.into())
            }
            // an unreachable keyring leaves the step retryable
            Err(e) if e.kind() == ErrorKind::Transport => {
                return StepOutcome::Hold(process, e.into())
            }
            Err(e) => return StepOutcome::Fail(e.into()),
        };

        let verification = match self
            .signatures
            .verify_signature(&signature, Some(&request.document_hash))
            .await
        {
            Ok(verification) => verification,
            Err(e) => return StepOutcome::Fail(e.into()),
        };
        if !verification.is_valid() {
            let failed: Vec<&str> = verification
                .failed_checks()
                .map(|c| c.check.as_str())
                .collect();
            return StepOutcome::Fail(WorkflowError::VerificationFailed(failed.join(", ")));
        }

        if let Err(e) = self.auth.consume_session(session_id, process.process_id) {
            return StepOutcome::Fail(e.into());
        }

        process.signer = Some(request.signer);
        process.signature = Some(signature);
        process.verification = Some(verification);
        StepOutcome::Advance(process)
    }

    async fn store_step(&self, mut process: SigningProcess) -> StepOutcome {
        let Some(signature) = process.signature.clone() else {
            return StepOutcome::Fail(WorkflowError::InvalidRequest(
                "process reached storage without a signature".to_string(),
            ));
        };

        let storage_id = match self.store.store_signature(&signature).await {
            Ok(storage_id) => storage_id,
            Err(e) => return StepOutcome::Hold(process, e.into()),
        };

        process.storage_id = Some(storage_id);
        StepOutcome::Advance(process)
    }

    /// Authenticate (if needed), sign and store in one call.
    ///
    /// The process must be at `Authenticating` (with `session_id` given) or
    /// `Signing`. Returns the completed process.
    pub async fn create_workflow_signature(
        &self,
        process_id: Uuid,
        request: SignRequest,
        session_id: Option<Uuid>,
    ) -> Result<SigningProcess, WorkflowError> {
        let process = self.snapshot(process_id)?;
        match process.step {
            WorkflowStep::Authenticating => {
                let session_id = session_id.ok_or(WorkflowError::Signature(
                    SignatureError::SessionMissing,
                ))?;
                self.process_workflow_step(process_id, StepAction::Authenticate { session_id })
                    .await?;
            }
            WorkflowStep::Signing => {}
            step => {
                return Err(WorkflowError::InvalidTransition {
                    step,
                    action: "create_workflow_signature",
                })
            }
        }

        self.process_workflow_step(process_id, StepAction::Sign(request))
            .await?;
        self.process_workflow_step(process_id, StepAction::Store)
            .await?;
        self.snapshot(process_id)
    }

    /// Move a process to `Failed` on the caller's behalf.
    pub fn fail_workflow(
        &self,
        process_id: Uuid,
        reason: &str,
    ) -> Result<SigningProcess, WorkflowError> {
        let process = self.snapshot(process_id)?;
        if process.step.is_terminal() {
            return Err(WorkflowError::InvalidTransition {
                step: process.step,
                action: "fail",
            });
        }
        self.fail(process_id, process.revision, reason)?;
        self.snapshot(process_id)
    }

    pub fn active_process_count(&self) -> usize {
        self.table
            .read()
            .by_document
            .values()
            .filter(|p| !p.step.is_terminal())
            .count()
    }

    fn snapshot(&self, process_id: Uuid) -> Result<SigningProcess, WorkflowError> {
        self.get_process(process_id)
            .ok_or(WorkflowError::ProcessNotFound(process_id))
    }

    fn fail(&self, process_id: Uuid, revision: u64, reason: &str) -> Result<(), WorkflowError> {
        let mut process = self.snapshot(process_id)?;
        process.last_error = Some(reason.to_string());
        process.transition(WorkflowStep::Failed, self.clock.now());
        self.commit(revision, &mut process)?;
        audit::log_workflow_failed(process_id, &process.document_id, reason);
        Ok(())
    }

    /// Replace the stored record if it is still the same process at
    /// `revision`, bumping the revision of both copies.
    fn commit(&self, revision: u64, process: &mut SigningProcess) -> Result<(), WorkflowError> {
        let mut table = self.table.write();
        match table.by_document.get_mut(&process.document_id) {
            Some(current)
                if current.process_id == process.process_id && current.revision == revision =>
            {
                process.revision = revision + 1;
                *current = process.clone();
                Ok(())
            }
            _ => Err(WorkflowError::ProcessReplaced(process.process_id)),
        }
    }
}

impl std::fmt::Debug for SigningWorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningWorkflowEngine")
            .field("processes", &self.table.read().by_document.len())
            .finish()
    }
}
