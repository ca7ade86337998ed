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

//! The composition root.
//!
//! [`SigningService`] owns one instance of every component and wires them
//! together. Dashboards and forms talk to this facade; the components are
//! also reachable directly for callers that need finer control.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::auth::{AuthError, AuthenticationManager, InMemoryMfaOutbox, MfaDelivery};
use crate::certificates::{
    CertificateError, CertificateKeyring, CertificateRegistry, EncryptedKeyring,
    InMemoryRevocationSource, RevocationSource, RevocationUpdate,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, SigningConfig};
use crate::crypto::derive_public_key;
use crate::error::ErrorKind;
use crate::models::{
    AuthenticationSession, CaptureRequirements, CaptureValidation, Certificate,
    CertificateRecord, DigitalSignature, MfaChallenge, MfaMethod, MfaVerification,
    SignatureCapture, SignaturePayload, SignatureVerificationResult, SigningProcess,
};
use crate::signing::{
    RoleDirectory, SecurityMetrics, SignatureEngine, SignatureError, SignatureRequirements,
    StaticRoleDirectory,
};
use crate::storage::{
    AccessPolicy, DefaultAccessPolicy, EncryptedSignatureStore, InMemorySignatureBackend,
    SignatureBackend, StoreError,
};
use crate::workflow::{SignRequest, SigningWorkflowEngine, StepAction, StepAdvance, WorkflowError};

/// Errors raised while assembling a [`SigningService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Config(e) => e.kind(),
            ServiceError::Certificate(e) => e.kind(),
            ServiceError::Store(e) => e.kind(),
        }
    }
}

fn random_key() -> Vec<u8> {
    let mut key = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

/// Builder for [`SigningService`]. Every collaborator defaults to its
/// in-memory implementation.
pub struct SigningServiceBuilder {
    config: SigningConfig,
    clock: Option<Arc<dyn Clock>>,
    revocation_source: Option<Arc<dyn RevocationSource>>,
    keyring: Option<Arc<dyn CertificateKeyring>>,
    roles: Option<Arc<dyn RoleDirectory>>,
    mfa_delivery: Option<Arc<dyn MfaDelivery>>,
    backend: Option<Arc<dyn SignatureBackend>>,
    access_policy: Option<Arc<dyn AccessPolicy>>,
}

impl SigningServiceBuilder {
    fn new(config: SigningConfig) -> Self {
        Self {
            config,
            clock: None,
            revocation_source: None,
            keyring: None,
            roles: None,
            mfa_delivery: None,
            backend: None,
            access_policy: None,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn revocation_source(mut self, source: Arc<dyn RevocationSource>) -> Self {
        self.revocation_source = Some(source);
        self
    }

    pub fn keyring(mut self, keyring: Arc<dyn CertificateKeyring>) -> Self {
        self.keyring = Some(keyring);
        self
    }

    pub fn role_directory(mut self, roles: Arc<dyn RoleDirectory>) -> Self {
        self.roles = Some(roles);
        self
    }

    pub fn mfa_delivery(mut self, delivery: Arc<dyn MfaDelivery>) -> Self {
        self.mfa_delivery = Some(delivery);
        self
    }

    pub fn signature_backend(mut self, backend: Arc<dyn SignatureBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Replace the default access policy built from the configuration.
    pub fn access_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.access_policy = Some(policy);
        self
    }

    pub fn build(self) -> Result<SigningService, ServiceError> {
        let config = Arc::new(self.config);
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let source = self
            .revocation_source
            .unwrap_or_else(|| Arc::new(InMemoryRevocationSource::new()));
        let keyring: Arc<dyn CertificateKeyring> = match self.keyring {
            Some(keyring) => keyring,
            None => Arc::new(EncryptedKeyring::new(&random_key())?),
        };
        let roles = self
            .roles
            .unwrap_or_else(|| Arc::new(StaticRoleDirectory::new()));
        let delivery = self
            .mfa_delivery
            .unwrap_or_else(|| Arc::new(InMemoryMfaOutbox::new()));
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(InMemorySignatureBackend::new()));
        let policy = self.access_policy.unwrap_or_else(|| {
            Arc::new(DefaultAccessPolicy::new(
                roles.clone(),
                config.privileged_roles().to_vec(),
                config.min_access_reason_length(),
            ))
        });

        let storage_key = match config.storage_key() {
            Some(key) => key.to_vec(),
            None => {
                tracing::warn!(
                    "No storage key configured; using an ephemeral key, stored signatures will not survive a restart"
                );
                random_key()
            }
        };

        let registry = Arc::new(CertificateRegistry::new(source, clock.clone()));
        let signatures = Arc::new(SignatureEngine::new(
            registry.clone(),
            keyring.clone(),
            roles,
            config.clone(),
            clock.clone(),
        ));
        let auth = Arc::new(AuthenticationManager::new(
            delivery,
            config.clone(),
            clock.clone(),
        ));
        let store = Arc::new(EncryptedSignatureStore::new(
            backend,
            policy,
            storage_key,
            clock.clone(),
        )?);
        let workflow = Arc::new(SigningWorkflowEngine::new(
            signatures.clone(),
            auth.clone(),
            store.clone(),
            config.clone(),
            clock,
        ));

        tracing::info!("Signing service initialized");
        Ok(SigningService {
            config,
            registry,
            keyring,
            signatures,
            auth,
            store,
            workflow,
        })
    }
}

/// Handle to the background revocation refresh task.
pub struct RevocationRefresher {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl RevocationRefresher {
    /// Signal the task to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!("Revocation refresher task failed: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Facade over the signing core.
pub struct SigningService {
    config: Arc<SigningConfig>,
    registry: Arc<CertificateRegistry>,
    keyring: Arc<dyn CertificateKeyring>,
    signatures: Arc<SignatureEngine>,
    auth: Arc<AuthenticationManager>,
    store: Arc<EncryptedSignatureStore>,
    workflow: Arc<SigningWorkflowEngine>,
}

impl SigningService {
    pub fn builder(config: SigningConfig) -> SigningServiceBuilder {
        SigningServiceBuilder::new(config)
    }

    /// A service with default configuration and in-memory collaborators.
    pub fn in_memory() -> Result<Self, ServiceError> {
        Self::builder(SigningConfig::default()).build()
    }

    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CertificateRegistry> {
        &self.registry
    }

    pub fn signature_engine(&self) -> &Arc<SignatureEngine> {
        &self.signatures
    }

    pub fn authentication(&self) -> &Arc<AuthenticationManager> {
        &self.auth
    }

    pub fn signature_store(&self) -> &Arc<EncryptedSignatureStore> {
        &self.store
    }

    pub fn workflow_engine(&self) -> &Arc<SigningWorkflowEngine> {
        &self.workflow
    }

    // Certificate operations

    /// Load an externally issued certificate and its private key.
    ///
    /// The private key must belong to the certificate's public key. Nothing
    /// stays registered when the keyring refuses the key.
    pub async fn register_certificate(
        &self,
        record: CertificateRecord,
        private_key: &[u8],
    ) -> Result<Certificate, CertificateError> {
        let derived = derive_public_key(private_key)
            .map_err(|e| CertificateError::InvalidPrivateKey(e.to_string()))?;
        if derived != record.public_key.key {
            return Err(CertificateError::InvalidPrivateKey(format!(
                "key does not match the public key of certificate {}",
                record.id
            )));
        }

        let certificate = self.registry.register(record)?;
        if let Err(e) = self.keyring.store_key(certificate.id(), private_key).await {
            self.registry.deregister(certificate.id());
            return Err(e);
        }
        Ok(certificate)
    }

    pub fn list_certificates(&self) -> Vec<Certificate> {
        self.registry.list_certificates()
    }

    /// Resolve a certificate for signing. Fails unless it is currently valid.
    pub fn select_certificate(&self, certificate_id: &str) -> Result<Certificate, CertificateError> {
        self.registry.require_valid(certificate_id)
    }

    pub fn verify_certificate(&self, certificate_id: &str) -> bool {
        self.registry.verify_certificate(certificate_id)
    }

    pub async fn update_certificate_revocation_list(
        &self,
    ) -> Result<RevocationUpdate, CertificateError> {
        self.registry.update_revocation_list().await
    }

    /// Refresh the revocation list every `revocation_refresh_interval`.
    ///
    /// The first refresh runs immediately. Failures are logged and the
    /// previous statuses stay in force until the next tick.
    pub fn spawn_revocation_refresher(&self) -> RevocationRefresher {
        let registry = self.registry.clone();
        let period = self.config.revocation_refresh_interval();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        // The registry logs the outcome of every refresh.
                        if let Err(e) = registry.update_revocation_list().await {
                            tracing::debug!("Scheduled revocation refresh failed: {}", e);
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            tracing::info!("Revocation refresher shutdown requested");
                            break;
                        }
                    }
                }
            }
        });

        RevocationRefresher {
            handle,
            shutdown_tx,
        }
    }

    // Signature operations

    /// Sign a payload. A session binding on the payload must refer to a
    /// session that is still active, and the session is spent by the
    /// signature: a second payload bound to it gets `SessionMissing`.
    pub async fn create_signature(
        &self,
        payload: &SignaturePayload,
    ) -> Result<DigitalSignature, SignatureError> {
        let Some(binding) = &payload.session else {
            return self.signatures.create_signature(payload).await;
        };

        let attempt = Uuid::new_v4();
        let session = self
            .auth
            .claim_session(binding.session_id, attempt)
            .map_err(|_| SignatureError::SessionMissing)?;
        if session.binding() != *binding {
            self.auth.release_session(session.session_id, attempt);
            return Err(SignatureError::SessionMismatch(format!(
                "binding does not match session {}",
                session.session_id
            )));
        }

        match self.signatures.create_signature(payload).await {
            Ok(signature) => {
                self.auth
                    .consume_session(session.session_id, attempt)
                    .map_err(|_| SignatureError::SessionMissing)?;
                Ok(signature)
            }
            Err(e) => {
                self.auth.release_session(session.session_id, attempt);
                Err(e)
            }
        }
    }

    pub async fn verify_signature(
        &self,
        signature: &DigitalSignature,
        document_hash: Option<&str>,
    ) -> Result<SignatureVerificationResult, SignatureError> {
        self.signatures
            .verify_signature(signature, document_hash)
            .await
    }

    pub fn generate_document_hash(&self, content: &[u8]) -> String {
        self.signatures.generate_document_hash(content)
    }

    pub fn can_user_sign(&self, user_id: &str, role: &str, document_type: &str) -> bool {
        self.signatures.can_user_sign(user_id, role, document_type)
    }

    pub fn get_security_metrics(&self) -> SecurityMetrics {
        self.signatures.get_security_metrics()
    }

    pub fn validate_signature_requirements(
        &self,
        document_type: &str,
        certificate_id: &str,
    ) -> SignatureRequirements {
        self.signatures
            .validate_signature_requirements(document_type, certificate_id)
    }

    // Authentication operations

    pub async fn initiate_mfa(
        &self,
        user_id: &str,
        method: MfaMethod,
    ) -> Result<MfaChallenge, AuthError> {
        self.auth.initiate_mfa(user_id, method).await
    }

    pub fn verify_mfa(&self, token_id: Uuid, code: &str) -> Result<MfaVerification, AuthError> {
        self.auth.verify_mfa(token_id, code)
    }

    pub fn create_signature_session(
        &self,
        user_id: &str,
        role: &str,
        mfa_token_id: Uuid,
        ip_address: IpAddr,
        device_fingerprint: &str,
    ) -> Result<AuthenticationSession, AuthError> {
        self.auth.create_signature_session(
            user_id,
            role,
            mfa_token_id,
            ip_address,
            device_fingerprint,
        )
    }

    // Storage operations

    pub async fn store_signature(&self, signature: &DigitalSignature) -> Result<Uuid, StoreError> {
        self.store.store_signature(signature).await
    }

    pub async fn retrieve_signature(
        &self,
        storage_id: Uuid,
        user_id: &str,
        reason: &str,
    ) -> Result<DigitalSignature, StoreError> {
        self.store
            .retrieve_signature(storage_id, user_id, reason)
            .await
    }

    // Workflow operations

    pub fn initialize_workflow(
        &self,
        document_type: &str,
        document_id: &str,
        form_data: Option<serde_json::Value>,
    ) -> Result<SigningProcess, WorkflowError> {
        self.workflow
            .initialize_workflow(document_type, document_id, form_data)
    }

    pub async fn process_workflow_step(
        &self,
        process_id: Uuid,
        action: StepAction,
    ) -> Result<StepAdvance, WorkflowError> {
        self.workflow.process_workflow_step(process_id, action).await
    }

    /// Choose the certificate for a process. Allowed until Signing begins.
    pub fn select_workflow_certificate(
        &self,
        process_id: Uuid,
        certificate_id: &str,
    ) -> Result<SigningProcess, WorkflowError> {
        self.workflow.select_certificate(process_id, certificate_id)
    }

    pub fn validate_signature_capture(
        &self,
        capture: &SignatureCapture,
        requirements: &CaptureRequirements,
    ) -> CaptureValidation {
        self.workflow
            .validate_signature_capture(capture, requirements)
    }

    pub fn get_workflow_status(&self, document_id: &str) -> Option<SigningProcess> {
        self.workflow.get_workflow_status(document_id)
    }

    pub async fn create_workflow_signature(
        &self,
        process_id: Uuid,
        request: SignRequest,
        session_id: Option<Uuid>,
    ) -> Result<SigningProcess, WorkflowError> {
        self.workflow
            .create_workflow_signature(process_id, request, session_id)
            .await
    }

    pub fn fail_workflow(
        &self,
        process_id: Uuid,
        reason: &str,
    ) -> Result<SigningProcess, WorkflowError> {
        self.workflow.fail_workflow(process_id, reason)
    }
}

impl std::fmt::Debug for SigningService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningService")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("workflow", &self.workflow)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::crypto::generate_signing_keypair;
    use crate::models::{CertificateType, ComplianceLevel, PublicKeyInfo, SignerIdentity};
    use chrono::Duration as ChronoDuration;

    fn record(id: &str, clock: &ManualClock, public_key: Vec<u8>) -> CertificateRecord {
        CertificateRecord {
            id: id.to_string(),
            certificate_type: CertificateType::Personal,
            subject: "Dr. Example".to_string(),
            issuer: "Test CA".to_string(),
            valid_from: clock.now() - ChronoDuration::days(1),
            valid_to: clock.now() + ChronoDuration::days(30),
            public_key: PublicKeyInfo::ed25519(public_key),
            compliance_level: ComplianceLevel::Standard,
        }
    }

    #[tokio::test]
    async fn test_register_and_sign_without_session_binding() {
        let clock = Arc::new(ManualClock::default());
        let service = SigningService::builder(
            SigningConfig::builder()
                .require_session_binding(false)
                .build(),
        )
        .clock(clock.clone())
        .build()
        .unwrap();

        let keypair = generate_signing_keypair();
        service
            .register_certificate(
                record("cert-1", &clock, keypair.public_key.clone()),
                &keypair.private_key,
            )
            .await
            .unwrap();
        assert!(service.verify_certificate("cert-1"));
        assert!(service.select_certificate("cert-1").is_ok());
        assert_eq!(
            service.signature_engine().resolve_certificate_id(None).unwrap(),
            "cert-1"
        );

        let hash = service.generate_document_hash(b"discharge summary");
        let payload = SignaturePayload::new(
            "D-9",
            hash.clone(),
            SignerIdentity::new("U-1", "Pat Signer", "physician"),
        );
        let signature = service.create_signature(&payload).await.unwrap();
        assert_eq!(signature.certificate_id, "cert-1");

        let result = service
            .verify_signature(&signature, Some(&hash))
            .await
            .unwrap();
        assert!(result.is_valid());
        assert_eq!(service.get_security_metrics().signatures_created, 1);
    }

    #[tokio::test]
    async fn test_rejected_private_key_leaves_nothing_registered() {
        let clock = Arc::new(ManualClock::default());
        let service = SigningService::builder(SigningConfig::default())
            .clock(clock.clone())
            .build()
            .unwrap();
        let keypair = generate_signing_keypair();

        let err = service
            .register_certificate(
                record("cert-1", &clock, keypair.public_key.clone()),
                &keypair.private_key[..31],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CertificateError::InvalidPrivateKey(_)));
        assert!(!service.verify_certificate("cert-1"));
        assert!(service.list_certificates().is_empty());

        service
            .register_certificate(
                record("cert-1", &clock, keypair.public_key.clone()),
                &keypair.private_key,
            )
            .await
            .unwrap();
        assert!(service.verify_certificate("cert-1"));
    }

    #[tokio::test]
    async fn test_private_key_must_match_certificate() {
        let clock = Arc::new(ManualClock::default());
        let service = SigningService::builder(SigningConfig::default())
            .clock(clock.clone())
            .build()
            .unwrap();
        let keypair = generate_signing_keypair();
        let other = generate_signing_keypair();

        let err = service
            .register_certificate(
                record("cert-1", &clock, keypair.public_key.clone()),
                &other.private_key,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(service.registry().get("cert-1").is_none());
    }

    #[tokio::test]
    async fn test_keyring_outage_rolls_back_registration() {
        let clock = Arc::new(ManualClock::default());
        let keyring = Arc::new(EncryptedKeyring::new(&[3u8; 32]).unwrap());
        let service = SigningService::builder(SigningConfig::default())
            .clock(clock.clone())
            .keyring(keyring.clone())
            .build()
            .unwrap();
        let keypair = generate_signing_keypair();

        keyring.set_available(false);
        let err = service
            .register_certificate(
                record("cert-1", &clock, keypair.public_key.clone()),
                &keypair.private_key,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(service.registry().get("cert-1").is_none());

        keyring.set_available(true);
        service
            .register_certificate(
                record("cert-1", &clock, keypair.public_key.clone()),
                &keypair.private_key,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stale_session_binding_is_rejected() {
        let service = SigningService::in_memory().unwrap();
        let payload = SignaturePayload::new(
            "D-9",
            service.generate_document_hash(b"x"),
            SignerIdentity::new("U-1", "Pat Signer", "physician"),
        )
        .with_session(crate::models::SessionBinding {
            session_id: Uuid::new_v4(),
            user_id: "U-1".to_string(),
            mfa_token_id: Uuid::new_v4(),
            ip_address: "127.0.0.1".parse().unwrap(),
            device_fingerprint: "device".to_string(),
        });

        let err = service.create_signature(&payload).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionMissing);
    }

    #[tokio::test]
    async fn test_refresher_applies_revocations_and_shuts_down() {
        let clock = Arc::new(ManualClock::default());
        let source = Arc::new(InMemoryRevocationSource::new());
        let service = SigningService::builder(
            SigningConfig::builder()
                .revocation_refresh_interval(Duration::from_millis(10))
                .build(),
        )
        .clock(clock.clone())
        .revocation_source(source.clone())
        .build()
        .unwrap();

        let keypair = generate_signing_keypair();
        service
            .register_certificate(
                record("cert-1", &clock, keypair.public_key.clone()),
                &keypair.private_key,
            )
            .await
            .unwrap();
        source.revoke("cert-1");

        let refresher = service.spawn_revocation_refresher();
        for _ in 0..100 {
            if !service.verify_certificate("cert-1") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!service.verify_certificate("cert-1"));

        refresher.shutdown().await;
    }

    #[test]
    fn test_configured_storage_key_must_be_32_bytes() {
        let err = SigningService::builder(
            SigningConfig::builder().storage_key(vec![1u8; 16]).build(),
        )
        .build()
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
}
