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

//! Domain models for encrypted signature storage and its access log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A signature sealed at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSignatureRecord {
    pub storage_id: Uuid,
    pub signature_id: Uuid,
    pub document_id: String,
    /// Signer user id, kept in clear for access-policy decisions
    pub signer_user_id: String,
    /// AES-256-GCM sealed JSON of the `DigitalSignature`
    pub sealed: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

/// Outcome recorded for a retrieval attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessOutcome {
    Granted,
    Denied,
    NotFound,
    Failed,
}

/// One append-only audit entry per retrieval attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub storage_id: Uuid,
    pub user_id: String,
    pub reason: String,
    pub outcome: AccessOutcome,
    pub accessed_at: DateTime<Utc>,
}

/// Status of the most recent store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageStatus {
    Idle,
    Storing,
    Stored,
    Failed,
}
