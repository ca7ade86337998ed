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

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{AuthError, MfaDelivery};
use crate::clock::{lifetime, Clock};
use crate::config::SigningConfig;
use crate::models::{AuthenticationSession, MfaChallenge, MfaMethod, MfaVerification};
use crate::security::audit;

const CODE_DIGITS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChallengeState {
    Pending,
    Verified,
    Consumed,
    Locked,
}

/// Server-side record of a challenge. Only the code digest is kept.
#[derive(Debug, Clone)]
struct Challenge {
    user_id: String,
    method: MfaMethod,
    code_digest: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    failed_attempts: u32,
    state: ChallengeState,
}

/// An open session and the signing run, if any, that holds it.
#[derive(Debug, Clone)]
struct SessionEntry {
    session: AuthenticationSession,
    claimed_by: Option<Uuid>,
}

fn digest(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fixed-time comparison of two equal-length digests.
fn digests_match(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}

fn generate_code() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:0width$}", value, width = CODE_DIGITS)
}

/// Gates signing behind MFA and issues single-use signing sessions.
pub struct AuthenticationManager {
    challenges: RwLock<HashMap<Uuid, Challenge>>,
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    delivery: Arc<dyn MfaDelivery>,
    config: Arc<SigningConfig>,
    clock: Arc<dyn Clock>,
}

impl AuthenticationManager {
    pub fn new(
        delivery: Arc<dyn MfaDelivery>,
        config: Arc<SigningConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            challenges: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            delivery,
            config,
            clock,
        }
    }

    /// Issue a challenge and deliver its code to the user.
    ///
    /// Nothing is recorded when delivery fails.
    pub async fn initiate_mfa(
        &self,
        user_id: &str,
        method: MfaMethod,
    ) -> Result<MfaChallenge, AuthError> {
        if user_id.trim().is_empty() {
            return Err(AuthError::InvalidRequest("user id is empty".to_string()));
        }

        let code = generate_code();
        self.delivery.deliver(user_id, method, &code).await?;

        let token_id = Uuid::new_v4();
        let issued_at = self.clock.now();
        let expires_at = issued_at + lifetime(self.config.mfa_code_ttl());
        self.challenges.write().insert(
            token_id,
            Challenge {
                user_id: user_id.to_string(),
                method,
                code_digest: digest(&code),
                issued_at,
                expires_at,
                failed_attempts: 0,
                state: ChallengeState::Pending,
            },
        );

        audit::log_mfa_initiated(token_id, user_id, method.as_str());
        Ok(MfaChallenge {
            token_id,
            user_id: user_id.to_string(),
            method,
            issued_at,
            expires_at,
        })
    }

    /// Check a submitted code.
    ///
    /// A wrong code is `Ok(Mismatch)` and the challenge stays pending. An
    /// unknown, expired, consumed or locked challenge is an error; the
    /// challenge locks once `mfa_max_attempts` wrong codes were submitted.
    pub fn verify_mfa(&self, token_id: Uuid, code: &str) -> Result<MfaVerification, AuthError> {
        let now = self.clock.now();
        let max_attempts = self.config.mfa_max_attempts();
        let mut challenges = self.challenges.write();
        let challenge = challenges
            .get_mut(&token_id)
            .ok_or(AuthError::ChallengeNotFound(token_id))?;

        match challenge.state {
            ChallengeState::Verified => return Ok(MfaVerification::Verified { token_id }),
            ChallengeState::Consumed => {
                audit::log_mfa_failed(token_id, "already consumed");
                return Err(AuthError::MfaVerificationFailed(
                    "challenge was already used".to_string(),
                ));
            }
            ChallengeState::Locked => {
                audit::log_mfa_failed(token_id, "locked");
                return Err(AuthError::MfaVerificationFailed(
                    "challenge is locked after too many attempts".to_string(),
                ));
            }
            ChallengeState::Pending => {}
        }

        if now >= challenge.expires_at {
            audit::log_mfa_failed(token_id, "expired");
            return Err(AuthError::MfaVerificationFailed(format!(
                "challenge expired at {}",
                challenge.expires_at
            )));
        }

        if digests_match(&digest(code.trim()), &challenge.code_digest) {
            challenge.state = ChallengeState::Verified;
            audit::log_mfa_verified(token_id, &challenge.user_id);
            return Ok(MfaVerification::Verified { token_id });
        }

        challenge.failed_attempts += 1;
        if challenge.failed_attempts >= max_attempts {
            challenge.state = ChallengeState::Locked;
            audit::log_mfa_failed(token_id, "too many attempts");
            return Err(AuthError::MfaVerificationFailed(format!(
                "challenge locked after {} failed attempts",
                challenge.failed_attempts
            )));
        }

        let remaining_attempts = max_attempts - challenge.failed_attempts;
        audit::log_mfa_mismatch(token_id, &challenge.user_id, remaining_attempts);
        Ok(MfaVerification::Mismatch { remaining_attempts })
    }

    /// Consume a verified MFA token and open a signing session.
    pub fn create_signature_session(
        &self,
        user_id: &str,
        role: &str,
        mfa_token_id: Uuid,
        ip_address: IpAddr,
        device_fingerprint: &str,
    ) -> Result<AuthenticationSession, AuthError> {
        if user_id.trim().is_empty() || role.trim().is_empty() {
            return Err(AuthError::InvalidRequest(
                "user id and role are required".to_string(),
            ));
        }
        if device_fingerprint.trim().is_empty() {
            return Err(AuthError::InvalidRequest(
                "device fingerprint is required".to_string(),
            ));
        }

        let now = self.clock.now();
        {
            let mut challenges = self.challenges.write();
            let rejection = match challenges.get_mut(&mfa_token_id) {
                None => Some("unknown MFA token"),
                Some(c) if c.user_id != user_id => Some("MFA token was issued to another user"),
                Some(c) if c.state == ChallengeState::Consumed => Some("MFA token already consumed"),
                Some(c) if c.state != ChallengeState::Verified => Some("MFA token not verified"),
                Some(c) if now >= c.expires_at => Some("MFA token expired"),
                Some(c) => {
                    c.state = ChallengeState::Consumed;
                    None
                }
            };
            if let Some(reason) = rejection {
                audit::log_session_rejected(user_id, reason);
                return Err(AuthError::MfaRequired(reason.to_string()));
            }
        }

        let session = AuthenticationSession {
            session_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            role: role.to_string(),
            mfa_token_id,
            ip_address,
            device_fingerprint: device_fingerprint.to_string(),
            created_at: now,
            expires_at: now + lifetime(self.config.session_ttl()),
        };
        self.sessions.write().insert(
            session.session_id,
            SessionEntry {
                session: session.clone(),
                claimed_by: None,
            },
        );

        audit::log_session_created(
            session.session_id,
            user_id,
            role,
            &ip_address.to_string(),
        );
        Ok(session)
    }

    /// Look up an active session. Expired sessions are dropped on access.
    pub fn validate_session(&self, session_id: Uuid) -> Result<AuthenticationSession, AuthError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write();
        match sessions.get(&session_id) {
            None => Err(AuthError::SessionNotFound(session_id)),
            Some(entry) if entry.session.is_expired_at(now) => {
                sessions.remove(&session_id);
                Err(AuthError::SessionExpired(session_id))
            }
            Some(entry) => Ok(entry.session.clone()),
        }
    }

    /// Reserve an active session for one signing run.
    ///
    /// Claiming again with the same `owner` succeeds; any other owner gets
    /// [`AuthError::SessionClaimed`] until the session is released or consumed.
    pub fn claim_session(
        &self,
        session_id: Uuid,
        owner: Uuid,
    ) -> Result<AuthenticationSession, AuthError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write();
        let expired = match sessions.get(&session_id) {
            None => return Err(AuthError::SessionNotFound(session_id)),
            Some(entry) => entry.session.is_expired_at(now),
        };
        if expired {
            sessions.remove(&session_id);
            return Err(AuthError::SessionExpired(session_id));
        }
        let Some(entry) = sessions.get_mut(&session_id) else {
            return Err(AuthError::SessionNotFound(session_id));
        };
        match entry.claimed_by {
            Some(holder) if holder != owner => {
                audit::log_session_rejected(
                    &entry.session.user_id,
                    "session held by another signing run",
                );
                Err(AuthError::SessionClaimed(session_id))
            }
            Some(_) => Ok(entry.session.clone()),
            None => {
                entry.claimed_by = Some(owner);
                tracing::debug!(session_id = %session_id, owner = %owner, "Signing session claimed");
                Ok(entry.session.clone())
            }
        }
    }

    /// Give up a claim without signing. Other owners' claims are left alone.
    pub fn release_session(&self, session_id: Uuid, owner: Uuid) -> bool {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(&session_id) {
            Some(entry) if entry.claimed_by == Some(owner) => {
                entry.claimed_by = None;
                true
            }
            _ => false,
        }
    }

    /// End a session after its single signing completion.
    ///
    /// The session must be unclaimed or claimed by `owner`. The signing it
    /// authorised has already happened, so expiry is not rechecked.
    pub fn consume_session(
        &self,
        session_id: Uuid,
        owner: Uuid,
    ) -> Result<AuthenticationSession, AuthError> {
        let mut sessions = self.sessions.write();
        match sessions.get(&session_id) {
            None => return Err(AuthError::SessionNotFound(session_id)),
            Some(entry) if entry.claimed_by.is_some_and(|holder| holder != owner) => {
                return Err(AuthError::SessionClaimed(session_id))
            }
            Some(_) => {}
        }
        let entry = sessions
            .remove(&session_id)
            .ok_or(AuthError::SessionNotFound(session_id))?;
        drop(sessions);

        audit::log_session_consumed(session_id, &entry.session.user_id);
        Ok(entry.session)
    }

    /// Drop expired sessions and challenges. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        {
            let mut sessions = self.sessions.write();
            let before = sessions.len();
            sessions.retain(|_, entry| !entry.session.is_expired_at(now));
            removed += before - sessions.len();
        }
        {
            let mut challenges = self.challenges.write();
            let before = challenges.len();
            challenges.retain(|_, c| now < c.expires_at);
            removed += before - challenges.len();
        }
        if removed > 0 {
            tracing::debug!(removed = removed, "Purged expired MFA challenges and sessions");
        }
        removed
    }

    pub fn active_session_count(&self) -> usize {
        let now = self.clock.now();
        self.sessions
            .read()
            .values()
            .filter(|entry| !entry.session.is_expired_at(now))
            .count()
    }

    /// The challenge as the caller sees it, without the code.
    pub fn challenge(&self, token_id: Uuid) -> Option<MfaChallenge> {
        self.challenges.read().get(&token_id).map(|c| MfaChallenge {
            token_id,
            user_id: c.user_id.clone(),
            method: c.method,
            issued_at: c.issued_at,
            expires_at: c.expires_at,
        })
    }
}
