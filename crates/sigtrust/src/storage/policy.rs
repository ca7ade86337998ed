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

use crate::models::StoredSignatureRecord;
use crate::signing::RoleDirectory;

/// Decision on one retrieval request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied(String),
}

/// Decides whether a user may read a stored signature for a stated reason.
pub trait AccessPolicy: Send + Sync {
    fn authorize(&self, record: &StoredSignatureRecord, user_id: &str, reason: &str)
        -> AccessDecision;
}

/// The signer may always read their own signature; anyone else needs a
/// privileged role. Either way the reason must be substantive.
pub struct DefaultAccessPolicy {
    roles: Arc<dyn RoleDirectory>,
    privileged_roles: Vec<String>,
    min_reason_length: usize,
}

impl DefaultAccessPolicy {
    pub fn new(
        roles: Arc<dyn RoleDirectory>,
        privileged_roles: Vec<String>,
        min_reason_length: usize,
    ) -> Self {
        Self {
            roles,
            privileged_roles,
            min_reason_length,
        }
    }
}

impl AccessPolicy for DefaultAccessPolicy {
    fn authorize(
        &self,
        record: &StoredSignatureRecord,
        user_id: &str,
        reason: &str,
    ) -> AccessDecision {
        let reason_length = reason.trim().chars().count();
        if reason_length < self.min_reason_length {
            return AccessDecision::Denied(format!(
                "access reason must be at least {} characters",
                self.min_reason_length
            ));
        }
        if record.signer_user_id == user_id {
            return AccessDecision::Granted;
        }
        let held = self.roles.roles(user_id);
        if held.iter().any(|r| self.privileged_roles.contains(r)) {
            AccessDecision::Granted
        } else {
            AccessDecision::Denied(format!(
                "{} is neither the signer nor in a privileged role",
                user_id
            ))
        }
    }
}
