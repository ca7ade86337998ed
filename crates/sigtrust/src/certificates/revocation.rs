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

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::TransportError;

/// External source of truth listing revoked certificate ids.
#[async_trait]
pub trait RevocationSource: Send + Sync {
    /// Fetch the current revocation list.
    async fn fetch_revoked(&self) -> Result<Vec<String>, TransportError>;
}

/// Revocation list held in memory. Used in tests and the CLI demo.
#[derive(Debug)]
pub struct InMemoryRevocationSource {
    revoked: RwLock<BTreeSet<String>>,
    available: AtomicBool,
}

impl Default for InMemoryRevocationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRevocationSource {
    pub fn new() -> Self {
        Self {
            revoked: RwLock::new(BTreeSet::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Replace the published list.
    pub fn set_revoked<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.revoked.write() = ids.into_iter().map(Into::into).collect();
    }

    pub fn revoke(&self, id: impl Into<String>) {
        self.revoked.write().insert(id.into());
    }

    /// Simulate the remote list going offline or coming back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl RevocationSource for InMemoryRevocationSource {
    async fn fetch_revoked(&self) -> Result<Vec<String>, TransportError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(TransportError::new(
                "revocation-list",
                "source is not reachable",
            ));
        }
        Ok(self.revoked.read().iter().cloned().collect())
    }
}
