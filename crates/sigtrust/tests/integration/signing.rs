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

//! Signature engine integration tests.

use sigtrust::models::{CertificateType, SecurityCheck, SignaturePayload};
use sigtrust::{DocumentTypePolicy, ErrorKind, SigningConfig};

use crate::fixtures::{signer, TestFixture};

async fn fixture_with_certificate() -> TestFixture {
    let fixture = TestFixture::new();
    fixture
        .register_certificate("cert-1", CertificateType::DohCertified)
        .await;
    fixture
}

async fn bound_payload(fixture: &TestFixture, content: &[u8]) -> SignaturePayload {
    let session_id = fixture.open_session("U-1", "physician").await;
    let session = fixture
        .service
        .authentication()
        .validate_session(session_id)
        .unwrap();
    SignaturePayload::new(
        "D-1",
        fixture.service.generate_document_hash(content),
        signer(),
    )
    .with_certificate("cert-1")
    .with_session(session.binding())
}

#[tokio::test]
async fn test_round_trip_integrity() {
    let fixture = fixture_with_certificate().await;
    let payload = bound_payload(&fixture, b"admission consent").await;

    let signature = fixture.service.create_signature(&payload).await.unwrap();
    let result = fixture
        .service
        .verify_signature(&signature, Some(&payload.document_hash))
        .await
        .unwrap();

    assert!(result.is_valid(), "{:?}", result.checks());
    let order: Vec<_> = result.checks().iter().map(|c| c.check).collect();
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
}

#[tokio::test]
async fn test_tamper_detection() {
    let fixture = fixture_with_certificate().await;
    let payload = bound_payload(&fixture, b"admission consent").await;
    let signature = fixture.service.create_signature(&payload).await.unwrap();

    let other = fixture.service.generate_document_hash(b"admission consent (edited)");
    let result = fixture
        .service
        .verify_signature(&signature, Some(&other))
        .await
        .unwrap();
    assert!(!result.is_valid());
    assert!(!result.check(SecurityCheck::DocumentHashMatch).unwrap().passed);

    let mut forged = signature.clone();
    forged.signer.name = "Someone Else".to_string();
    let result = fixture
        .service
        .verify_signature(&forged, Some(&payload.document_hash))
        .await
        .unwrap();
    assert!(!result.is_valid());
    assert!(!result.check(SecurityCheck::SignatureIntegrity).unwrap().passed);
}

#[tokio::test]
async fn test_revoked_certificate_cannot_sign() {
    let fixture = fixture_with_certificate().await;
    let payload = bound_payload(&fixture, b"transfer order").await;
    fixture.revocations.revoke("cert-1");
    fixture
        .service
        .update_certificate_revocation_list()
        .await
        .unwrap();

    let err = fixture.service.create_signature(&payload).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CertificateInvalid);
    assert_eq!(fixture.service.get_security_metrics().signing_rejections, 1);
}

#[tokio::test]
async fn test_session_signs_only_once() {
    let fixture = fixture_with_certificate().await;
    let payload = bound_payload(&fixture, b"discharge order").await;
    let session_id = payload.session.as_ref().unwrap().session_id;

    fixture.service.create_signature(&payload).await.unwrap();

    let mut second = payload.clone();
    second.document_id = "D-2".to_string();
    let err = fixture.service.create_signature(&second).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionMissing);

    assert!(fixture
        .service
        .authentication()
        .validate_session(session_id)
        .is_err());
    assert_eq!(fixture.service.get_security_metrics().signatures_created, 1);
}

#[tokio::test]
async fn test_failed_signing_keeps_session() {
    let fixture = fixture_with_certificate().await;
    let payload = bound_payload(&fixture, b"transfer order").await;

    let mut unknown_certificate = payload.clone();
    unknown_certificate.certificate_id = Some("cert-missing".to_string());
    let err = fixture
        .service
        .create_signature(&unknown_certificate)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CertificateInvalid);

    // the session was not spent by the rejected attempt
    fixture.service.create_signature(&payload).await.unwrap();
}

#[tokio::test]
async fn test_signing_requires_session_by_default() {
    let fixture = fixture_with_certificate().await;
    let payload = SignaturePayload::new(
        "D-1",
        fixture.service.generate_document_hash(b"x"),
        signer(),
    );

    let err = fixture.service.create_signature(&payload).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionMissing);
}

#[tokio::test]
async fn test_can_user_sign() {
    let fixture = TestFixture::with_config(
        SigningConfig::builder()
            .document_type(
                "controlled-substance",
                DocumentTypePolicy {
                    signing_roles: vec!["physician".to_string()],
                    ..DocumentTypePolicy::default()
                },
            )
            .build(),
    );
    let service = &fixture.service;

    assert!(service.can_user_sign("U-1", "physician", "controlled-substance"));
    assert!(!service.can_user_sign("N-1", "nurse", "controlled-substance"));
    // default roles apply to unlisted document types
    assert!(service.can_user_sign("N-1", "nurse", "consent"));
    // the role must be held by the user
    assert!(!service.can_user_sign("N-1", "physician", "consent"));
    assert!(!service.can_user_sign("C-1", "clerk", "consent"));
}

#[tokio::test]
async fn test_signature_requirements_report_unmet() {
    let fixture = TestFixture::with_config(
        SigningConfig::builder()
            .document_type(
                "death-certificate",
                DocumentTypePolicy {
                    allowed_certificate_types: vec![CertificateType::DohCertified],
                    ..DocumentTypePolicy::default()
                },
            )
            .build(),
    );
    fixture
        .register_certificate("cert-doh", CertificateType::DohCertified)
        .await;
    fixture
        .register_certificate("cert-personal", CertificateType::Personal)
        .await;

    let ok = fixture
        .service
        .validate_signature_requirements("death-certificate", "cert-doh");
    assert!(ok.is_satisfied());
    assert!(ok.session_binding_required);

    let wrong_type = fixture
        .service
        .validate_signature_requirements("death-certificate", "cert-personal");
    assert_eq!(wrong_type.unmet.len(), 1);

    let missing = fixture
        .service
        .validate_signature_requirements("death-certificate", "cert-nope");
    assert!(!missing.is_satisfied());
}

#[tokio::test]
async fn test_security_metrics_track_outcomes() {
    let fixture = fixture_with_certificate().await;
    let payload = bound_payload(&fixture, b"lab order").await;
    let signature = fixture.service.create_signature(&payload).await.unwrap();

    fixture
        .service
        .verify_signature(&signature, Some(&payload.document_hash))
        .await
        .unwrap();
    fixture
        .service
        .verify_signature(&signature, Some(&"0".repeat(64)))
        .await
        .unwrap();

    let metrics = fixture.service.get_security_metrics();
    assert_eq!(metrics.signatures_created, 1);
    assert_eq!(metrics.verifications_passed, 1);
    assert_eq!(metrics.verifications_failed, 1);
    assert_eq!(metrics.certificates.valid, 1);
}
