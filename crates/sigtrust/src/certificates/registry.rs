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

//! The certificate registry.
//!
//! The registry holds an immutable [`RegistryState`] snapshot behind a lock.
//! Readers clone the `Arc` and never observe a partially updated status map;
//! writers build a complete replacement and swap it in. Refreshes are
//! serialised so two overlapping refreshes cannot interleave their swaps.
//!
//! Revocation is sticky: an id revoked by any refresh stays revoked for the
//! lifetime of the registry, even when a later list omits it.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;

use super::{CertificateError, RevocationSource};
use crate::clock::Clock;
use crate::crypto::compute_key_fingerprint;
use crate::models::{Certificate, CertificateRecord, CertificateStatus};
use crate::security::audit;

#[derive(Debug, Default)]
struct RegistryState {
    /// Registration order is preserved so the default selection is stable.
    records: IndexMap<String, CertificateRecord>,
    revoked: HashSet<String>,
    refreshed_at: Option<DateTime<Utc>>,
}

/// Result of a successful revocation refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevocationUpdate {
    /// Registered certificates that became revoked in this refresh
    pub newly_revoked: Vec<String>,
    /// Size of the cumulative revocation set
    pub total_revoked: usize,
    pub refreshed_at: DateTime<Utc>,
}

/// Certificate totals by derived status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CertificateCounts {
    pub valid: usize,
    pub expired: usize,
    pub revoked: usize,
}

/// Registry of known certificates, owned by the composition root.
pub struct CertificateRegistry {
    state: RwLock<Arc<RegistryState>>,
    refresh_lock: tokio::sync::Mutex<()>,
    source: Arc<dyn RevocationSource>,
    clock: Arc<dyn Clock>,
}

impl CertificateRegistry {
    pub fn new(source: Arc<dyn RevocationSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(Arc::new(RegistryState::default())),
            refresh_lock: tokio::sync::Mutex::new(()),
            source,
            clock,
        }
    }

    fn snapshot(&self) -> Arc<RegistryState> {
        self.state.read().clone()
    }

    fn derive(&self, state: &RegistryState, record: &CertificateRecord) -> Certificate {
        let status = record.status_at(self.clock.now(), state.revoked.contains(&record.id));
        Certificate::derived(record.clone(), status)
    }

    /// Load an out-of-band issued certificate.
    pub fn register(&self, record: CertificateRecord) -> Result<Certificate, CertificateError> {
        if record.public_key.key.len() != 32 {
            return Err(CertificateError::InvalidKey(format!(
                "expected 32-byte Ed25519 key, got {} bytes",
                record.public_key.key.len()
            )));
        }
        if compute_key_fingerprint(&record.public_key.key) != record.public_key.fingerprint {
            return Err(CertificateError::InvalidKey(
                "fingerprint does not match public key".to_string(),
            ));
        }
        if record.valid_to < record.valid_from {
            return Err(CertificateError::InvalidKey(
                "validity window ends before it starts".to_string(),
            ));
        }

        let mut guard = self.state.write();
        if guard.records.contains_key(&record.id) {
            return Err(CertificateError::AlreadyRegistered(record.id));
        }

        let mut records = guard.records.clone();
        records.insert(record.id.clone(), record.clone());
        let next = RegistryState {
            records,
            revoked: guard.revoked.clone(),
            refreshed_at: guard.refreshed_at,
        };
        let certificate = self.derive(&next, &record);
        *guard = Arc::new(next);
        drop(guard);

        audit::log_certificate_registered(
            &record.id,
            record.certificate_type.as_str(),
            &record.public_key.fingerprint,
        );
        Ok(certificate)
    }

    /// Drop a registration whose private key could not be taken into custody.
    pub(crate) fn deregister(&self, id: &str) -> bool {
        let mut guard = self.state.write();
        if !guard.records.contains_key(id) {
            return false;
        }
        let mut records = guard.records.clone();
        records.shift_remove(id);
        *guard = Arc::new(RegistryState {
            records,
            revoked: guard.revoked.clone(),
            refreshed_at: guard.refreshed_at,
        });
        drop(guard);

        tracing::warn!(certificate_id = %id, "Certificate registration rolled back");
        true
    }

    /// All known certificates with their current status.
    pub fn list_certificates(&self) -> Vec<Certificate> {
        let state = self.snapshot();
        state
            .records
            .values()
            .map(|record| self.derive(&state, record))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Certificate> {
        let state = self.snapshot();
        state.records.get(id).map(|record| self.derive(&state, record))
    }

    /// The first valid certificate in registration order.
    pub fn select_default_valid(&self) -> Option<Certificate> {
        self.list_certificates().into_iter().find(|c| c.is_valid())
    }

    /// Exists, inside its validity window, and not revoked.
    pub fn verify_certificate(&self, id: &str) -> bool {
        self.get(id).is_some_and(|c| c.is_valid())
    }

    /// Resolve a certificate that may be used for signing right now.
    pub fn require_valid(&self, id: &str) -> Result<Certificate, CertificateError> {
        let certificate = self
            .get(id)
            .ok_or_else(|| CertificateError::NotFound(id.to_string()))?;
        match certificate.status() {
            CertificateStatus::Valid => Ok(certificate),
            CertificateStatus::Expired => Err(CertificateError::Expired(id.to_string())),
            CertificateStatus::Revoked => Err(CertificateError::Revoked(id.to_string())),
        }
    }

    /// Fetch the revocation list and recompute statuses.
    ///
    /// On fetch failure the cached statuses are left untouched and the error
    /// is returned.
    pub async fn update_revocation_list(&self) -> Result<RevocationUpdate, CertificateError> {
        let _refresh = self.refresh_lock.lock().await;

        let fetched = match self.source.fetch_revoked().await {
            Ok(ids) => ids,
            Err(e) => {
                audit::log_revocation_refresh_failed(&e.to_string());
                metrics::counter!("sigtrust_revocation_refresh_failures_total").increment(1);
                return Err(e.into());
            }
        };

        let refreshed_at = self.clock.now();
        let mut guard = self.state.write();
        let mut revoked = guard.revoked.clone();
        let mut newly_revoked = Vec::new();
        for id in fetched {
            if revoked.insert(id.clone()) && guard.records.contains_key(&id) {
                newly_revoked.push(id);
            }
        }
        let total_revoked = revoked.len();
        *guard = Arc::new(RegistryState {
            records: guard.records.clone(),
            revoked,
            refreshed_at: Some(refreshed_at),
        });
        drop(guard);

        for id in &newly_revoked {
            audit::log_certificate_revoked(id);
        }
        audit::log_revocation_refreshed(newly_revoked.len(), total_revoked);
        metrics::counter!("sigtrust_revocation_refreshes_total").increment(1);

        Ok(RevocationUpdate {
            newly_revoked,
            total_revoked,
            refreshed_at,
        })
    }

    pub fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot().refreshed_at
    }

    pub fn counts(&self) -> CertificateCounts {
        self.list_certificates()
            .iter()
            .fold(CertificateCounts::default(), |mut counts, c| {
                match c.status() {
                    CertificateStatus::Valid => counts.valid += 1,
                    CertificateStatus::Expired => counts.expired += 1,
                    CertificateStatus::Revoked => counts.revoked += 1,
                }
                counts
            })
    }
}

impl std::fmt::Debug for CertificateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.snapshot();
        f.debug_struct("CertificateRegistry")
            .field("certificates", &state.records.len())
            .field("revoked", &state.revoked.len())
            .field("refreshed_at", &state.refreshed_at)
            .finish()
    }
}
