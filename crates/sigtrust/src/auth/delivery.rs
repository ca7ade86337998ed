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

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::TransportError;
use crate::models::MfaMethod;

/// Out-of-band channel that delivers MFA codes to users.
#[async_trait]
pub trait MfaDelivery: Send + Sync {
    async fn deliver(
        &self,
        user_id: &str,
        method: MfaMethod,
        code: &str,
    ) -> Result<(), TransportError>;
}

/// A code handed to [`InMemoryMfaOutbox`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredCode {
    pub user_id: String,
    pub method: MfaMethod,
    pub code: String,
    pub delivered_at: DateTime<Utc>,
}

/// Delivery channel that keeps codes in memory for tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryMfaOutbox {
    delivered: Mutex<Vec<DeliveredCode>>,
}

impl InMemoryMfaOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent code sent to `user_id`.
    pub fn last_code_for(&self, user_id: &str) -> Option<String> {
        self.delivered
            .lock()
            .iter()
            .rev()
            .find(|d| d.user_id == user_id)
            .map(|d| d.code.clone())
    }

    pub fn delivered(&self) -> Vec<DeliveredCode> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl MfaDelivery for InMemoryMfaOutbox {
    async fn deliver(
        &self,
        user_id: &str,
        method: MfaMethod,
        code: &str,
    ) -> Result<(), TransportError> {
        self.delivered.lock().push(DeliveredCode {
            user_id: user_id.to_string(),
            method,
            code: code.to_string(),
            delivered_at: Utc::now(),
        });
        Ok(())
    }
}
