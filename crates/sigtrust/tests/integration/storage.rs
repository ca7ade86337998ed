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

//! Encrypted signature store integration tests.

use sigtrust::models::{AccessOutcome, CertificateType, DigitalSignature, SignaturePayload, StorageStatus};
use sigtrust::ErrorKind;
use uuid::Uuid;

use crate::fixtures::{signer, TestFixture};

async fn signed(fixture: &TestFixture) -> DigitalSignature {
    fixture
        .register_certificate("cert-1", CertificateType::DohCertified)
        .await;
    let session_id = fixture.open_session("U-1", "physician").await;
    let session = fixture
        .service
        .authentication()
        .validate_session(session_id)
        .unwrap();
    let payload = SignaturePayload::new(
        "D-7",
        fixture.service.generate_document_hash(b"medication administration record"),
        signer(),
    )
    .with_session(session.binding());
    fixture.service.create_signature(&payload).await.unwrap()
}

#[tokio::test]
async fn test_signer_and_auditor_can_read_back() {
    let fixture = TestFixture::new();
    let signature = signed(&fixture).await;
    let storage_id = fixture.service.store_signature(&signature).await.unwrap();
    assert_eq!(fixture.service.signature_store().status(), StorageStatus::Stored);

    let own = fixture
        .service
        .retrieve_signature(storage_id, "U-1", "reviewing my own signature")
        .await
        .unwrap();
    assert_eq!(own, signature);

    let audited = fixture
        .service
        .retrieve_signature(storage_id, "A-1", "quarterly compliance audit")
        .await
        .unwrap();
    assert_eq!(audited, signature);

    // a retrieved signature still verifies against the original content
    let hash = fixture
        .service
        .generate_document_hash(b"medication administration record");
    let result = fixture
        .service
        .verify_signature(&audited, Some(&hash))
        .await
        .unwrap();
    assert!(result.is_valid());
}

#[tokio::test]
async fn test_every_retrieval_is_audited() {
    let fixture = TestFixture::new();
    let signature = signed(&fixture).await;
    let storage_id = fixture.service.store_signature(&signature).await.unwrap();

    let cases = [
        (storage_id, "A-1", "", ErrorKind::InvalidRequest),
        (storage_id, "A-1", "why", ErrorKind::AccessDenied),
        (storage_id, "N-1", "checking a colleague's chart", ErrorKind::AccessDenied),
        (Uuid::new_v4(), "A-1", "quarterly compliance audit", ErrorKind::NotFound),
    ];
    for (id, user, reason, expected) in cases {
        let err = fixture
            .service
            .retrieve_signature(id, user, reason)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), expected, "{} / {:?}", user, reason);
    }

    let log = fixture.service.signature_store().access_log();
    let outcomes: Vec<_> = log.iter().map(|e| e.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            AccessOutcome::Denied,
            AccessOutcome::Denied,
            AccessOutcome::Denied,
            AccessOutcome::NotFound,
        ]
    );
    assert_eq!(log[2].user_id, "N-1");
}

#[tokio::test]
async fn test_failed_store_reports_storage_failure() {
    let fixture = TestFixture::new();
    let signature = signed(&fixture).await;
    fixture.backend.set_available(false);

    let err = fixture
        .service
        .store_signature(&signature)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageFailure);
    assert_eq!(fixture.service.signature_store().status(), StorageStatus::Failed);
    assert!(fixture.backend.is_empty());
}

#[tokio::test]
async fn test_storage_is_append_only() {
    let fixture = TestFixture::new();
    let signature = signed(&fixture).await;

    let first = fixture.service.store_signature(&signature).await.unwrap();
    let second = fixture.service.store_signature(&signature).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(fixture.backend.len(), 2);
}
