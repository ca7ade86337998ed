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

//! Domain models for MFA challenges and signing sessions.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::signature::SessionBinding;

/// Second-factor delivery method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MfaMethod {
    Sms,
    Email,
    Authenticator,
}

impl MfaMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MfaMethod::Sms => "sms",
            MfaMethod::Email => "email",
            MfaMethod::Authenticator => "authenticator",
        }
    }
}

impl fmt::Display for MfaMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MfaMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sms" => Ok(MfaMethod::Sms),
            "email" => Ok(MfaMethod::Email),
            "authenticator" => Ok(MfaMethod::Authenticator),
            other => Err(format!("unknown MFA method: {}", other)),
        }
    }
}

/// A pending MFA challenge as seen by the caller. Never carries the code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MfaChallenge {
    pub token_id: Uuid,
    pub user_id: String,
    pub method: MfaMethod,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Result of submitting a code against a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MfaVerification {
    /// The code matched; the token can now open one session.
    Verified { token_id: Uuid },
    /// The code did not match; the challenge stays pending.
    Mismatch { remaining_attempts: u32 },
}

impl MfaVerification {
    pub fn is_verified(&self) -> bool {
        matches!(self, MfaVerification::Verified { .. })
    }
}

/// A short-lived, single-use signing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationSession {
    pub session_id: Uuid,
    pub user_id: String,
    pub role: String,
    pub mfa_token_id: Uuid,
    pub ip_address: IpAddr,
    pub device_fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthenticationSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// The binding recorded on signatures produced under this session.
    pub fn binding(&self) -> SessionBinding {
        SessionBinding {
            session_id: self.session_id,
            user_id: self.user_id.clone(),
            mfa_token_id: self.mfa_token_id,
            ip_address: self.ip_address,
            device_fingerprint: self.device_fingerprint.clone(),
        }
    }
}
