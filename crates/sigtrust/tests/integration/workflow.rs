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

//! Signing workflow integration tests.

use sigtrust::models::{
    CaptureFailure, CaptureRequirements, CertificateType, InputMethod, MfaMethod,
    SignatureCapture, WorkflowStep,
};
use sigtrust::{ErrorKind, SignRequest, StepAction};

use crate::fixtures::{good_capture, signer, zigzag, TestFixture};

/// Initialize, capture, MFA, session, sign, store, then verify against the
/// original content hash.
#[tokio::test]
async fn test_end_to_end_signing_scenario() {
    let fixture = TestFixture::new();
    fixture
        .register_certificate("cert-1", CertificateType::DohCertified)
        .await;
    let service = &fixture.service;

    let process = service.initialize_workflow("consent", "D-1", None).unwrap();
    let id = process.process_id;
    assert_eq!(process.step, WorkflowStep::Initialized);

    let capture = good_capture();
    assert_eq!(capture.stroke_count(), 6);
    assert_eq!(capture.complexity_score(), 25);
    assert!(
        service
            .validate_signature_capture(&capture, &CaptureRequirements::default())
            .passed
    );

    service
        .process_workflow_step(id, StepAction::StartCapture)
        .await
        .unwrap();
    service
        .process_workflow_step(id, StepAction::SubmitCapture(capture))
        .await
        .unwrap();
    service
        .process_workflow_step(id, StepAction::BeginAuthentication)
        .await
        .unwrap();

    let challenge = service.initiate_mfa("U-1", MfaMethod::Sms).await.unwrap();
    let code = fixture.outbox.last_code_for("U-1").unwrap();
    assert!(service
        .verify_mfa(challenge.token_id, &code)
        .unwrap()
        .is_verified());
    let session = service
        .create_signature_session(
            "U-1",
            "physician",
            challenge.token_id,
            "192.168.10.4".parse().unwrap(),
            "tablet-ward-3",
        )
        .unwrap();

    let hash = service.generate_document_hash(b"I consent to the procedure.");
    let completed = service
        .create_workflow_signature(
            id,
            SignRequest::new(signer(), hash.clone()),
            Some(session.session_id),
        )
        .await
        .unwrap();
    assert!(completed.is_complete());

    let status = service.get_workflow_status("D-1").unwrap();
    assert_eq!(status.step, WorkflowStep::Complete);
    let storage_id = status.storage_id.unwrap();

    let stored = service
        .retrieve_signature(storage_id, "U-1", "confirming my consent signature")
        .await
        .unwrap();
    let result = service
        .verify_signature(&stored, Some(&hash))
        .await
        .unwrap();
    assert!(result.is_valid(), "{:?}", result.checks());
}

#[tokio::test]
async fn test_single_active_process_per_document() {
    let fixture = TestFixture::new();
    let service = &fixture.service;

    let first = service.initialize_workflow("consent", "D-2", None).unwrap();
    service
        .process_workflow_step(first.process_id, StepAction::StartCapture)
        .await
        .unwrap();
    let second = service.initialize_workflow("consent", "D-2", None).unwrap();

    let status = service.get_workflow_status("D-2").unwrap();
    assert_eq!(status.process_id, second.process_id);
    assert_eq!(status.step, WorkflowStep::Initialized);

    let err = service
        .process_workflow_step(first.process_id, StepAction::SubmitCapture(good_capture()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_capture_thresholds() {
    let fixture = TestFixture::new();
    let three = SignatureCapture::new(vec![zigzag(6); 3], 1500, InputMethod::Pen);

    let strict = fixture
        .service
        .validate_signature_capture(&three, &CaptureRequirements::default());
    assert!(!strict.passed);
    assert_eq!(
        strict.failures,
        vec![CaptureFailure::TooFewStrokes {
            required: 5,
            actual: 3
        }]
    );

    let relaxed = fixture.service.validate_signature_capture(
        &three,
        &CaptureRequirements::default().with_min_strokes(3),
    );
    assert!(relaxed.passed);
}

#[tokio::test]
async fn test_authentication_step_requires_session() {
    let fixture = TestFixture::new();
    fixture
        .register_certificate("cert-1", CertificateType::DohCertified)
        .await;
    let service = &fixture.service;
    let id = service
        .initialize_workflow("consent", "D-3", None)
        .unwrap()
        .process_id;
    for action in [
        StepAction::StartCapture,
        StepAction::SubmitCapture(good_capture()),
        StepAction::BeginAuthentication,
    ] {
        service.process_workflow_step(id, action).await.unwrap();
    }

    let err = service
        .create_workflow_signature(
            id,
            SignRequest::new(signer(), service.generate_document_hash(b"x")),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionMissing);

    let err = service
        .process_workflow_step(
            id,
            StepAction::Authenticate {
                session_id: uuid::Uuid::new_v4(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionMissing);
    assert_eq!(
        service.get_workflow_status("D-3").unwrap().step,
        WorkflowStep::Authenticating
    );
}

#[tokio::test]
async fn test_one_session_per_workflow_run() {
    let fixture = TestFixture::new();
    fixture
        .register_certificate("cert-1", CertificateType::DohCertified)
        .await;
    fixture
        .register_certificate("cert-2", CertificateType::DohCertified)
        .await;
    let service = &fixture.service;

    let mut ids = Vec::new();
    for document_id in ["D-5", "D-6"] {
        let id = service
            .initialize_workflow("consent", document_id, None)
            .unwrap()
            .process_id;
        for action in [
            StepAction::StartCapture,
            StepAction::SubmitCapture(good_capture()),
            StepAction::BeginAuthentication,
        ] {
            service.process_workflow_step(id, action).await.unwrap();
        }
        ids.push(id);
    }
    assert_eq!(service.workflow_engine().active_process_count(), 2);
    let selected = service.select_workflow_certificate(ids[1], "cert-2").unwrap();
    assert_eq!(selected.certificate_id.as_deref(), Some("cert-2"));

    let session_id = fixture.open_session("U-1", "physician").await;
    let request = SignRequest::new(signer(), service.generate_document_hash(b"consent"));

    let done = service
        .create_workflow_signature(ids[0], request.clone(), Some(session_id))
        .await
        .unwrap();
    assert_eq!(done.step, WorkflowStep::Complete);

    let err = service
        .create_workflow_signature(ids[1], request.clone(), Some(session_id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionMissing);
    assert_eq!(
        service.get_workflow_status("D-6").unwrap().step,
        WorkflowStep::Authenticating
    );

    let fresh = fixture.open_session("U-1", "physician").await;
    let done = service
        .create_workflow_signature(ids[1], request, Some(fresh))
        .await
        .unwrap();
    assert_eq!(done.certificate_id.as_deref(), Some("cert-2"));
    assert_eq!(fixture.backend.len(), 2);
}

#[tokio::test]
async fn test_document_type_capture_requirements_apply() {
    let config = sigtrust::SigningConfig::builder()
        .document_type(
            "quick-note",
            sigtrust::DocumentTypePolicy {
                capture: CaptureRequirements::default()
                    .with_min_strokes(1)
                    .with_min_duration_ms(100)
                    .with_min_complexity(2),
                ..Default::default()
            },
        )
        .build();
    let fixture = TestFixture::with_config(config);
    let service = &fixture.service;
    let id = service
        .initialize_workflow("quick-note", "D-4", None)
        .unwrap()
        .process_id;
    service
        .process_workflow_step(id, StepAction::StartCapture)
        .await
        .unwrap();

    let initials = SignatureCapture::new(vec![zigzag(3)], 300, InputMethod::Mouse);
    let advance = service
        .process_workflow_step(id, StepAction::SubmitCapture(initials))
        .await
        .unwrap();
    assert_eq!(advance.step, WorkflowStep::CaptureValidated);
    assert_eq!(advance.step_number, 3);
}

#[tokio::test]
async fn test_step_action_wire_format() {
    let action: StepAction =
        serde_json::from_str(r#"{"action":"authenticate","session_id":"6f1c1f0e-2b7a-4a43-9d8e-3f3c2a1b0c9d"}"#)
            .unwrap();
    assert!(matches!(action, StepAction::Authenticate { .. }));

    let json = serde_json::to_value(StepAction::Store).unwrap();
    assert_eq!(json, serde_json::json!({"action": "store"}));
}
