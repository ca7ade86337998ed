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

use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use super::{AccessDecision, AccessPolicy, SignatureBackend, StoreError};
use crate::clock::Clock;
use crate::crypto::{open, seal};
use crate::models::{
    AccessLogEntry, AccessOutcome, DigitalSignature, StorageStatus, StoredSignatureRecord,
};
use crate::security::audit;

/// Seals signatures at rest and audits every read.
pub struct EncryptedSignatureStore {
    backend: Arc<dyn SignatureBackend>,
    policy: Arc<dyn AccessPolicy>,
    key: Vec<u8>,
    clock: Arc<dyn Clock>,
    status: RwLock<StorageStatus>,
    access_log: RwLock<Vec<AccessLogEntry>>,
}

impl EncryptedSignatureStore {
    /// `key` must be a 32-byte AES-256 key.
    pub fn new(
        backend: Arc<dyn SignatureBackend>,
        policy: Arc<dyn AccessPolicy>,
        key: Vec<u8>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        if key.len() != 32 {
            return Err(StoreError::InvalidRequest(format!(
                "storage key must be 32 bytes, got {}",
                key.len()
            )));
        }
        Ok(Self {
            backend,
            policy,
            key,
            clock,
            status: RwLock::new(StorageStatus::Idle),
            access_log: RwLock::new(Vec::new()),
        })
    }

    /// Status of the most recent store operation.
    pub fn status(&self) -> StorageStatus {
        *self.status.read()
    }

    /// Snapshot of the retrieval audit log, oldest first.
    pub fn access_log(&self) -> Vec<AccessLogEntry> {
        self.access_log.read().clone()
    }

    /// Encrypt and persist a signature. The returned storage id is the only
    /// proof that persistence succeeded.
    pub async fn store_signature(&self, signature: &DigitalSignature) -> Result<Uuid, StoreError> {
        *self.status.write() = StorageStatus::Storing;

        match self.seal_and_put(signature).await {
            Ok(storage_id) => {
                *self.status.write() = StorageStatus::Stored;
                metrics::counter!("sigtrust_signatures_stored_total").increment(1);
                audit::log_signature_stored(storage_id, signature.id, &signature.document_id);
                Ok(storage_id)
            }
            Err(e) => {
                *self.status.write() = StorageStatus::Failed;
                audit::log_signature_store_failed(signature.id, &e.to_string());
                Err(e)
            }
        }
    }

    async fn seal_and_put(&self, signature: &DigitalSignature) -> Result<Uuid, StoreError> {
        let plaintext = serde_json::to_vec(signature)?;
        let sealed = seal(&plaintext, &self.key)?;
        let record = StoredSignatureRecord {
            storage_id: Uuid::new_v4(),
            signature_id: signature.id,
            document_id: signature.document_id.clone(),
            signer_user_id: signature.signer.user_id.clone(),
            sealed,
            stored_at: self.clock.now(),
        };
        let storage_id = record.storage_id;
        self.backend.put(record).await?;
        Ok(storage_id)
    }

    /// Decrypt a stored signature for `user_id`, who must state a reason.
    pub async fn retrieve_signature(
        &self,
        storage_id: Uuid,
        user_id: &str,
        reason: &str,
    ) -> Result<DigitalSignature, StoreError> {
        let result = self.authorized_read(storage_id, user_id, reason).await;

        let outcome = match &result {
            Ok(_) => AccessOutcome::Granted,
            Err(StoreError::NotFound(_)) => AccessOutcome::NotFound,
            Err(StoreError::AccessDenied(_)) | Err(StoreError::InvalidRequest(_)) => {
                AccessOutcome::Denied
            }
            Err(_) => AccessOutcome::Failed,
        };
        self.access_log.write().push(AccessLogEntry {
            storage_id,
            user_id: user_id.to_string(),
            reason: reason.to_string(),
            outcome,
            accessed_at: self.clock.now(),
        });
        metrics::counter!("sigtrust_storage_accesses_total").increment(1);

        match &result {
            Ok(_) => audit::log_storage_accessed(storage_id, user_id, reason),
            Err(e) => audit::log_storage_access_denied(storage_id, user_id, reason, &e.to_string()),
        }
        result
    }

    async fn authorized_read(
        &self,
        storage_id: Uuid,
        user_id: &str,
        reason: &str,
    ) -> Result<DigitalSignature, StoreError> {
        if reason.trim().is_empty() {
            return Err(StoreError::InvalidRequest(
                "an access reason is required".to_string(),
            ));
        }
        if user_id.trim().is_empty() {
            return Err(StoreError::InvalidRequest("user id is required".to_string()));
        }

        let record = self
            .backend
            .get(storage_id)
            .await?
            .ok_or(StoreError::NotFound(storage_id))?;

        if let AccessDecision::Denied(why) = self.policy.authorize(&record, user_id, reason) {
            return Err(StoreError::AccessDenied(why));
        }

        let plaintext = open(&record.sealed, &self.key)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}
