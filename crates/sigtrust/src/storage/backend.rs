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
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::StoreError;
use crate::error::TransportError;
use crate::models::StoredSignatureRecord;

/// Durable home of sealed signature records.
///
/// Append-only: there is no update or delete, corrections are new records.
#[async_trait]
pub trait SignatureBackend: Send + Sync {
    /// Persist a new record. Fails if the storage id is already taken.
    async fn put(&self, record: StoredSignatureRecord) -> Result<(), StoreError>;

    async fn get(&self, storage_id: Uuid) -> Result<Option<StoredSignatureRecord>, StoreError>;
}

/// Process-local backend.
#[derive(Debug)]
pub struct InMemorySignatureBackend {
    records: RwLock<HashMap<Uuid, StoredSignatureRecord>>,
    available: AtomicBool,
}

impl Default for InMemorySignatureBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySignatureBackend {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the backend going offline.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::new("signature-store", "backend is not reachable").into())
        }
    }
}

#[async_trait]
impl SignatureBackend for InMemorySignatureBackend {
    async fn put(&self, record: StoredSignatureRecord) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut records = self.records.write();
        if records.contains_key(&record.storage_id) {
            return Err(StoreError::AlreadyExists(record.storage_id));
        }
        records.insert(record.storage_id, record);
        Ok(())
    }

    async fn get(&self, storage_id: Uuid) -> Result<Option<StoredSignatureRecord>, StoreError> {
        self.ensure_available()?;
        Ok(self.records.read().get(&storage_id).cloned())
    }
}
