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

//! Multi-factor authentication and signing sessions.
//!
//! Per signing attempt: `initiate_mfa` issues a challenge, `verify_mfa`
//! marks it verified, and `create_signature_session` consumes the verified
//! token to open one short-lived session. Sessions live only in memory.

mod delivery;
mod manager;

pub use delivery::{DeliveredCode, InMemoryMfaOutbox, MfaDelivery};
pub use manager::AuthenticationManager;

use thiserror::Error;
use uuid::Uuid;

use crate::error::{ErrorKind, TransportError};

/// Errors that can occur during authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("MFA required: {0}")]
    MfaRequired(String),

    #[error("MFA verification failed: {0}")]
    MfaVerificationFailed(String),

    #[error("MFA challenge not found: {0}")]
    ChallengeNotFound(Uuid),

    #[error("Signing session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Signing session expired: {0}")]
    SessionExpired(Uuid),

    #[error("Signing session {0} is already held by another signing run")]
    SessionClaimed(Uuid),

    #[error("Invalid authentication request: {0}")]
    InvalidRequest(String),

    #[error("MFA code delivery failed: {0}")]
    Delivery(#[from] TransportError),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MfaRequired(_) => ErrorKind::MfaRequired,
            AuthError::MfaVerificationFailed(_) | AuthError::ChallengeNotFound(_) => {
                ErrorKind::MfaVerificationFailed
            }
            AuthError::SessionNotFound(_)
            | AuthError::SessionExpired(_)
            | AuthError::SessionClaimed(_) => ErrorKind::SessionMissing,
            AuthError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            AuthError::Delivery(_) => ErrorKind::Transport,
        }
    }
}
