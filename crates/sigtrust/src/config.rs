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

//! Configuration for the signing core.
//!
//! Use [`SigningConfig::builder()`] in code, or load a TOML file with
//! [`SigningConfig::from_file`]:
//!
//! ```toml
//! default_certificate_id = "cert-doh-1"
//! session_ttl_secs = 600
//! storage_key = "${SIGTRUST_STORAGE_KEY}"
//!
//! [document_types.consent]
//! signing_roles = ["physician"]
//! allowed_certificate_types = ["doh-certified"]
//!
//! [document_types.consent.capture]
//! min_strokes = 3
//! ```
//!
//! `${VAR}`, `${VAR:-default}` and `${VAR:?message}` are substituted from the
//! environment before parsing.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::models::{CaptureRequirements, CertificateType};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Environment variable substitution failed: {0}")]
    EnvSubstitutionError(String),

    #[error("Invalid configuration value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Per-document-type signing rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DocumentTypePolicy {
    /// Roles allowed to sign; empty falls back to the default signing roles
    pub signing_roles: Vec<String>,
    /// Certificate types accepted; empty accepts every type
    pub allowed_certificate_types: Vec<CertificateType>,
    pub capture: CaptureRequirements,
}

/// Configuration for the signing service.
#[derive(Clone)]
#[non_exhaustive]
pub struct SigningConfig {
    default_certificate_id: Option<String>,
    revocation_refresh_interval: Duration,
    mfa_code_ttl: Duration,
    mfa_max_attempts: u32,
    session_ttl: Duration,
    require_session_binding: bool,
    min_access_reason_length: usize,
    privileged_roles: Vec<String>,
    default_signing_roles: Vec<String>,
    document_types: HashMap<String, DocumentTypePolicy>,
    storage_key: Option<Vec<u8>>,
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("default_certificate_id", &self.default_certificate_id)
            .field(
                "revocation_refresh_interval",
                &self.revocation_refresh_interval,
            )
            .field("mfa_code_ttl", &self.mfa_code_ttl)
            .field("mfa_max_attempts", &self.mfa_max_attempts)
            .field("session_ttl", &self.session_ttl)
            .field("require_session_binding", &self.require_session_binding)
            .field("min_access_reason_length", &self.min_access_reason_length)
            .field("privileged_roles", &self.privileged_roles)
            .field("default_signing_roles", &self.default_signing_roles)
            .field("document_types", &self.document_types)
            .field("storage_key", &self.storage_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl SigningConfig {
    /// Creates a new configuration builder with default values.
    pub fn builder() -> SigningConfigBuilder {
        SigningConfigBuilder::default()
    }

    /// Certificate used when a payload names none.
    pub fn default_certificate_id(&self) -> Option<&str> {
        self.default_certificate_id.as_deref()
    }

    /// Interval for the scheduled revocation refresh.
    pub fn revocation_refresh_interval(&self) -> Duration {
        self.revocation_refresh_interval
    }

    /// Lifetime of an MFA challenge.
    pub fn mfa_code_ttl(&self) -> Duration {
        self.mfa_code_ttl
    }

    /// Mismatches allowed before a challenge locks.
    pub fn mfa_max_attempts(&self) -> u32 {
        self.mfa_max_attempts
    }

    /// Lifetime of a signing session.
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Whether every signature must be bound to an authentication session.
    pub fn require_session_binding(&self) -> bool {
        self.require_session_binding
    }

    /// Minimum non-blank characters in a retrieval reason.
    pub fn min_access_reason_length(&self) -> usize {
        self.min_access_reason_length
    }

    /// Roles allowed to retrieve signatures they did not sign.
    pub fn privileged_roles(&self) -> &[String] {
        &self.privileged_roles
    }

    pub fn default_signing_roles(&self) -> &[String] {
        &self.default_signing_roles
    }

    pub fn document_type(&self, document_type: &str) -> Option<&DocumentTypePolicy> {
        self.document_types.get(document_type)
    }

    /// Roles allowed to sign `document_type`.
    pub fn signing_roles_for(&self, document_type: &str) -> &[String] {
        match self.document_types.get(document_type) {
            Some(policy) if !policy.signing_roles.is_empty() => &policy.signing_roles,
            _ => &self.default_signing_roles,
        }
    }

    /// Capture requirements for `document_type`, or the defaults.
    pub fn capture_requirements_for(&self, document_type: &str) -> CaptureRequirements {
        self.document_types
            .get(document_type)
            .map(|policy| policy.capture.clone())
            .unwrap_or_default()
    }

    /// Certificate types accepted for `document_type`; empty accepts all.
    pub fn allowed_certificate_types_for(&self, document_type: &str) -> &[CertificateType] {
        self.document_types
            .get(document_type)
            .map(|policy| policy.allowed_certificate_types.as_slice())
            .unwrap_or(&[])
    }

    /// 32-byte AES-256 key for signatures at rest.
    pub fn storage_key(&self) -> Option<&[u8]> {
        self.storage_key.as_deref()
    }

    /// Parse configuration from TOML after environment substitution.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let substituted = substitute_env_vars(content)?;
        let file: ConfigFile = toml::from_str(&substituted)?;
        file.into_config()
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

/// Builder for [`SigningConfig`].
pub struct SigningConfigBuilder {
    config: SigningConfig,
}

impl Default for SigningConfigBuilder {
    fn default() -> Self {
        Self {
            config: SigningConfig {
                default_certificate_id: None,
                revocation_refresh_interval: Duration::from_secs(30 * 60),
                mfa_code_ttl: Duration::from_secs(5 * 60),
                mfa_max_attempts: 5,
                session_ttl: Duration::from_secs(15 * 60),
                require_session_binding: true,
                min_access_reason_length: 10,
                privileged_roles: vec!["compliance-officer".to_string(), "auditor".to_string()],
                default_signing_roles: vec![
                    "physician".to_string(),
                    "nurse".to_string(),
                    "administrator".to_string(),
                ],
                document_types: HashMap::new(),
                storage_key: None,
            },
        }
    }
}

impl SigningConfigBuilder {
    /// Sets the fallback certificate.
    pub fn default_certificate_id(mut self, value: impl Into<String>) -> Self {
        self.config.default_certificate_id = Some(value.into());
        self
    }

    /// Sets the scheduled revocation refresh interval.
    pub fn revocation_refresh_interval(mut self, value: Duration) -> Self {
        self.config.revocation_refresh_interval = value;
        self
    }

    /// Sets the MFA challenge lifetime.
    pub fn mfa_code_ttl(mut self, value: Duration) -> Self {
        self.config.mfa_code_ttl = value;
        self
    }

    /// Sets the number of mismatches before a challenge locks.
    pub fn mfa_max_attempts(mut self, value: u32) -> Self {
        self.config.mfa_max_attempts = value;
        self
    }

    /// Sets the signing session lifetime.
    pub fn session_ttl(mut self, value: Duration) -> Self {
        self.config.session_ttl = value;
        self
    }

    pub fn require_session_binding(mut self, value: bool) -> Self {
        self.config.require_session_binding = value;
        self
    }

    pub fn min_access_reason_length(mut self, value: usize) -> Self {
        self.config.min_access_reason_length = value;
        self
    }

    pub fn privileged_roles(mut self, value: Vec<String>) -> Self {
        self.config.privileged_roles = value;
        self
    }

    pub fn default_signing_roles(mut self, value: Vec<String>) -> Self {
        self.config.default_signing_roles = value;
        self
    }

    /// Adds or replaces the rules for one document type.
    pub fn document_type(mut self, name: impl Into<String>, policy: DocumentTypePolicy) -> Self {
        self.config.document_types.insert(name.into(), policy);
        self
    }

    /// Sets the storage encryption key.
    pub fn storage_key(mut self, value: Vec<u8>) -> Self {
        self.config.storage_key = Some(value);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> SigningConfig {
        self.config
    }
}

impl Default for SigningConfig {
    fn default() -> Self {
        SigningConfigBuilder::default().build()
    }
}

/// On-disk form. Durations are whole seconds; unset fields keep defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    default_certificate_id: Option<String>,
    revocation_refresh_interval_secs: Option<u64>,
    mfa_code_ttl_secs: Option<u64>,
    mfa_max_attempts: Option<u32>,
    session_ttl_secs: Option<u64>,
    require_session_binding: Option<bool>,
    min_access_reason_length: Option<usize>,
    privileged_roles: Option<Vec<String>>,
    default_signing_roles: Option<Vec<String>>,
    document_types: HashMap<String, DocumentTypePolicy>,
    /// Hex-encoded 32-byte key
    storage_key: Option<String>,
}

fn non_zero_secs(field: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            field,
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

impl ConfigFile {
    fn into_config(self) -> Result<SigningConfig, ConfigError> {
        let mut builder = SigningConfig::builder();

        if let Some(id) = self.default_certificate_id {
            builder = builder.default_certificate_id(id);
        }
        if let Some(secs) = self.revocation_refresh_interval_secs {
            builder = builder
                .revocation_refresh_interval(non_zero_secs("revocation_refresh_interval_secs", secs)?);
        }
        if let Some(secs) = self.mfa_code_ttl_secs {
            builder = builder.mfa_code_ttl(non_zero_secs("mfa_code_ttl_secs", secs)?);
        }
        if let Some(attempts) = self.mfa_max_attempts {
            if attempts == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "mfa_max_attempts",
                    message: "must be at least 1".to_string(),
                });
            }
            builder = builder.mfa_max_attempts(attempts);
        }
        if let Some(secs) = self.session_ttl_secs {
            builder = builder.session_ttl(non_zero_secs("session_ttl_secs", secs)?);
        }
        if let Some(required) = self.require_session_binding {
            builder = builder.require_session_binding(required);
        }
        if let Some(len) = self.min_access_reason_length {
            builder = builder.min_access_reason_length(len);
        }
        if let Some(roles) = self.privileged_roles {
            builder = builder.privileged_roles(roles);
        }
        if let Some(roles) = self.default_signing_roles {
            builder = builder.default_signing_roles(roles);
        }
        for (name, policy) in self.document_types {
            builder = builder.document_type(name, policy);
        }
        if let Some(key_hex) = self.storage_key {
            let key = hex::decode(key_hex.trim()).map_err(|e| ConfigError::InvalidValue {
                field: "storage_key",
                message: e.to_string(),
            })?;
            if key.len() != 32 {
                return Err(ConfigError::InvalidValue {
                    field: "storage_key",
                    message: format!("expected 32 bytes, got {}", key.len()),
                });
            }
            builder = builder.storage_key(key);
        }

        Ok(builder.build())
    }
}

/// Substitute `${VAR}`, `${VAR:-default}` and `${VAR:?message}` expressions.
fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::EnvSubstitutionError(e.to_string()))?;
    let mut result = content.to_string();

    for cap in re.captures_iter(content) {
        let replacement = process_var_expression(&cap[1])?;
        result = result.replace(&cap[0], &replacement);
    }

    Ok(result)
}

fn process_var_expression(expr: &str) -> Result<String, ConfigError> {
    if let Some((name, default_value)) = expr.split_once(":-") {
        Ok(env::var(name).unwrap_or_else(|_| default_value.to_string()))
    } else if let Some((name, message)) = expr.split_once(":?") {
        env::var(name).map_err(|_| {
            ConfigError::EnvSubstitutionError(format!(
                "Required environment variable '{}' is not set: {}",
                name, message
            ))
        })
    } else {
        env::var(expr).map_err(|_| {
            ConfigError::EnvSubstitutionError(format!(
                "Required environment variable '{}' is not set",
                expr
            ))
        })
    }
}
