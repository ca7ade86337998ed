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

//! Certificate registry integration tests.

use chrono::Duration;
use sigtrust::clock::Clock;
use sigtrust::models::{CertificateStatus, CertificateType};
use sigtrust::ErrorKind;

use crate::fixtures::TestFixture;

#[tokio::test]
async fn test_list_reports_derived_status() {
    let fixture = TestFixture::new();
    let now = fixture.clock.now();
    fixture
        .register_certificate("cert-valid", CertificateType::DohCertified)
        .await;
    fixture
        .register_certificate_window(
            "cert-old",
            CertificateType::Personal,
            now - Duration::days(400),
            now - Duration::days(35),
        )
        .await;

    let listed = fixture.service.list_certificates();
    let statuses: Vec<_> = listed.iter().map(|c| (c.id(), c.status())).collect();
    assert_eq!(
        statuses,
        vec![
            ("cert-valid", CertificateStatus::Valid),
            ("cert-old", CertificateStatus::Expired),
        ]
    );

    assert!(fixture.service.verify_certificate("cert-valid"));
    assert!(!fixture.service.verify_certificate("cert-old"));
    assert!(!fixture.service.verify_certificate("cert-unknown"));
}

#[tokio::test]
async fn test_certificate_expires_as_clock_moves() {
    let fixture = TestFixture::new();
    fixture
        .register_certificate("cert-1", CertificateType::DohCertified)
        .await;
    assert!(fixture.service.verify_certificate("cert-1"));

    fixture.clock.advance(Duration::days(366));
    assert!(!fixture.service.verify_certificate("cert-1"));
    assert_eq!(
        fixture
            .service
            .select_certificate("cert-1")
            .unwrap_err()
            .kind(),
        ErrorKind::CertificateInvalid
    );
}

#[tokio::test]
async fn test_revocation_is_sticky() {
    let fixture = TestFixture::new();
    fixture
        .register_certificate("cert-1", CertificateType::DohCertified)
        .await;
    fixture
        .register_certificate("cert-2", CertificateType::DohCertified)
        .await;

    fixture.revocations.revoke("cert-1");
    let update = fixture
        .service
        .update_certificate_revocation_list()
        .await
        .unwrap();
    assert_eq!(update.newly_revoked, vec!["cert-1".to_string()]);
    assert!(!fixture.service.verify_certificate("cert-1"));

    // The source later drops the id; the registry keeps it revoked.
    fixture.revocations.set_revoked(Vec::<String>::new());
    let update = fixture
        .service
        .update_certificate_revocation_list()
        .await
        .unwrap();
    assert!(update.newly_revoked.is_empty());
    assert_eq!(update.total_revoked, 1);
    assert!(!fixture.service.verify_certificate("cert-1"));
    assert!(fixture.service.verify_certificate("cert-2"));
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_statuses() {
    let fixture = TestFixture::new();
    fixture
        .register_certificate("cert-1", CertificateType::DohCertified)
        .await;
    fixture
        .register_certificate("cert-2", CertificateType::DohCertified)
        .await;
    fixture.revocations.revoke("cert-1");
    fixture
        .service
        .update_certificate_revocation_list()
        .await
        .unwrap();
    let refreshed_at = fixture.service.registry().last_refreshed_at();

    fixture.revocations.revoke("cert-2");
    fixture.revocations.set_available(false);
    let err = fixture
        .service
        .update_certificate_revocation_list()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);

    assert!(!fixture.service.verify_certificate("cert-1"));
    assert!(fixture.service.verify_certificate("cert-2"));
    assert_eq!(fixture.service.registry().last_refreshed_at(), refreshed_at);
}

#[tokio::test]
async fn test_default_selection_skips_invalid() {
    let fixture = TestFixture::new();
    fixture
        .register_certificate("cert-a", CertificateType::DohCertified)
        .await;
    fixture
        .register_certificate("cert-b", CertificateType::Organizational)
        .await;
    fixture.revocations.revoke("cert-a");
    fixture
        .service
        .update_certificate_revocation_list()
        .await
        .unwrap();

    let chosen = fixture.service.registry().select_default_valid().unwrap();
    assert_eq!(chosen.id(), "cert-b");
}

#[tokio::test]
async fn test_public_key_pem_round_trip() {
    let fixture = TestFixture::new();
    let certificate = fixture
        .register_certificate("cert-1", CertificateType::DohCertified)
        .await;

    let pem = certificate.public_key().to_pem();
    assert!(pem.contains("BEGIN PUBLIC KEY"));
    let parsed = sigtrust::models::PublicKeyInfo::from_pem(&pem).unwrap();
    assert_eq!(&parsed, certificate.public_key());
}
