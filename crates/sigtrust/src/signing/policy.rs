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

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

/// The user/role directory. Lookups are synchronous; implementations backed
/// by a remote directory are expected to serve from a local cache.
pub trait RoleDirectory: Send + Sync {
    /// Roles currently held by `user_id`. Unknown users hold none.
    fn roles(&self, user_id: &str) -> Vec<String>;

    fn has_role(&self, user_id: &str, role: &str) -> bool {
        self.roles(user_id).iter().any(|r| r == role)
    }
}

/// Directory populated in process.
#[derive(Debug, Default)]
pub struct StaticRoleDirectory {
    assignments: RwLock<HashMap<String, HashSet<String>>>,
}

impl StaticRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&self, user_id: impl Into<String>, role: impl Into<String>) {
        self.assignments
            .write()
            .entry(user_id.into())
            .or_default()
            .insert(role.into());
    }

    pub fn unassign(&self, user_id: &str, role: &str) {
        if let Some(roles) = self.assignments.write().get_mut(user_id) {
            roles.remove(role);
        }
    }

    /// Builder-style assignment for fixtures.
    pub fn with(self, user_id: impl Into<String>, role: impl Into<String>) -> Self {
        self.assign(user_id, role);
        self
    }
}

impl RoleDirectory for StaticRoleDirectory {
    fn roles(&self, user_id: &str) -> Vec<String> {
        let mut roles: Vec<String> = self
            .assignments
            .read()
            .get(user_id)
            .map(|roles| roles.iter().cloned().collect())
            .unwrap_or_default();
        roles.sort();
        roles
    }
}
