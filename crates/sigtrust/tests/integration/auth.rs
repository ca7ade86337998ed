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

//! MFA and signing-session integration tests.

use std::net::IpAddr;

use chrono::Duration;
use sigtrust::models::{MfaMethod, MfaVerification};
use sigtrust::{ErrorKind, SigningConfig};

use crate::fixtures::TestFixture;

fn ip() -> IpAddr {
    "10.1.2.3".parse().unwrap()
}

/// A six-digit code that differs from `code`.
fn wrong_code(code: &str) -> String {
    let value: u32 = code.parse().unwrap();
    format!("{:06}", (value + 1) % 1_000_000)
}

#[tokio::test]
async fn test_unverified_token_cannot_open_session() {
    let fixture = TestFixture::new();
    let challenge = fixture
        .service
        .initiate_mfa("U-1", MfaMethod::Email)
        .await
        .unwrap();

    let err = fixture
        .service
        .create_signature_session("U-1", "physician", challenge.token_id, ip(), "laptop")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MfaRequired);
}

#[tokio::test]
async fn test_consumed_token_cannot_open_second_session() {
    let fixture = TestFixture::new();
    let token_id = fixture.verified_token("U-1").await;

    fixture
        .service
        .create_signature_session("U-1", "physician", token_id, ip(), "laptop")
        .unwrap();
    let err = fixture
        .service
        .create_signature_session("U-1", "physician", token_id, ip(), "laptop")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MfaRequired);
}

#[tokio::test]
async fn test_token_is_bound_to_its_user() {
    let fixture = TestFixture::new();
    let token_id = fixture.verified_token("U-1").await;

    let err = fixture
        .service
        .create_signature_session("N-1", "nurse", token_id, ip(), "laptop")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MfaRequired);
}

#[tokio::test]
async fn test_mismatch_keeps_challenge_pending() {
    let fixture = TestFixture::new();
    let challenge = fixture
        .service
        .initiate_mfa("U-1", MfaMethod::Sms)
        .await
        .unwrap();
    let code = fixture.outbox.last_code_for("U-1").unwrap();
    assert_eq!(code.len(), 6);

    let first = fixture
        .service
        .verify_mfa(challenge.token_id, &wrong_code(&code))
        .unwrap();
    assert_eq!(
        first,
        MfaVerification::Mismatch {
            remaining_attempts: 4
        }
    );

    let second = fixture
        .service
        .verify_mfa(challenge.token_id, &code)
        .unwrap();
    assert!(second.is_verified());
}

#[tokio::test]
async fn test_too_many_mismatches_lock_the_challenge() {
    let fixture =
        TestFixture::with_config(SigningConfig::builder().mfa_max_attempts(2).build());
    let challenge = fixture
        .service
        .initiate_mfa("U-1", MfaMethod::Authenticator)
        .await
        .unwrap();
    let code = fixture.outbox.last_code_for("U-1").unwrap();
    let wrong = wrong_code(&code);

    assert!(fixture
        .service
        .verify_mfa(challenge.token_id, &wrong)
        .is_ok());
    let err = fixture
        .service
        .verify_mfa(challenge.token_id, &wrong)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MfaVerificationFailed);

    // the right code no longer helps
    let err = fixture
        .service
        .verify_mfa(challenge.token_id, &code)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MfaVerificationFailed);
}

#[tokio::test]
async fn test_expired_challenge_fails_verification() {
    let fixture = TestFixture::new();
    let challenge = fixture
        .service
        .initiate_mfa("U-1", MfaMethod::Sms)
        .await
        .unwrap();
    let code = fixture.outbox.last_code_for("U-1").unwrap();

    fixture.clock.advance(Duration::minutes(6));
    let err = fixture
        .service
        .verify_mfa(challenge.token_id, &code)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MfaVerificationFailed);
}

#[tokio::test]
async fn test_session_expires() {
    let fixture = TestFixture::new();
    let session_id = fixture.open_session("U-1", "physician").await;
    let auth = fixture.service.authentication();
    assert!(auth.validate_session(session_id).is_ok());
    assert_eq!(auth.active_session_count(), 1);

    fixture.clock.advance(Duration::minutes(16));
    let err = auth.validate_session(session_id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionMissing);
    assert_eq!(auth.active_session_count(), 0);
}

#[tokio::test]
async fn test_codes_are_delivered_not_returned() {
    let fixture = TestFixture::new();
    let challenge = fixture
        .service
        .initiate_mfa("U-1", MfaMethod::Sms)
        .await
        .unwrap();

    let delivered = fixture.outbox.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].method, MfaMethod::Sms);
    let rendered = serde_json::to_value(&challenge).unwrap();
    assert!(rendered.get("code").is_none());
}
