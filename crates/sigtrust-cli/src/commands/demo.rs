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

//! Implementation of the `demo` command.
//!
//! Runs one document through the whole signing workflow using in-memory
//! collaborators and an ephemeral certificate, then prints the final process
//! status and the verification verdict.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, Utc};
use sigtrust::auth::InMemoryMfaOutbox;
use sigtrust::crypto::generate_signing_keypair;
use sigtrust::models::{
    CapturePoint, CertificateRecord, CertificateType, ComplianceLevel, InputMethod, MfaMethod,
    PublicKeyInfo, SignatureCapture, SignerIdentity, Stroke,
};
use sigtrust::signing::StaticRoleDirectory;
use sigtrust::{SignRequest, SigningConfig, SigningService, StepAction};
use tracing::info;

const DEMO_ROLE: &str = "physician";
const DEMO_CERTIFICATE: &str = "demo-certificate";

/// A synthetic handwritten capture: looping strokes drawn over 1.5s.
fn synthetic_capture() -> SignatureCapture {
    let strokes = (0..6)
        .map(|s| {
            Stroke::new(
                (0..8)
                    .map(|i| {
                        let y = if i % 2 == 0 { 0.0 } else { 14.0 };
                        CapturePoint::new((s * 40 + i * 5) as f64, y, (s * 250 + i * 20) as u64)
                            .with_pressure(0.5)
                    })
                    .collect(),
            )
        })
        .collect();
    SignatureCapture::new(strokes, 1500, InputMethod::Pen)
}

pub async fn run(
    config: SigningConfig,
    document_type: &str,
    document_id: &str,
    user_id: &str,
) -> Result<()> {
    let outbox = Arc::new(InMemoryMfaOutbox::new());
    let roles = Arc::new(StaticRoleDirectory::new().with(user_id, DEMO_ROLE));
    let service = SigningService::builder(config)
        .mfa_delivery(outbox.clone())
        .role_directory(roles)
        .build()
        .context("Failed to build signing service")?;

    let keypair = generate_signing_keypair();
    let now = Utc::now();
    service
        .register_certificate(
            CertificateRecord {
                id: DEMO_CERTIFICATE.to_string(),
                certificate_type: CertificateType::DohCertified,
                subject: format!("Demo signer {}", user_id),
                issuer: "sigtrust demo CA".to_string(),
                valid_from: now - Duration::minutes(1),
                valid_to: now + Duration::days(1),
                public_key: PublicKeyInfo::ed25519(keypair.public_key),
                compliance_level: ComplianceLevel::Standard,
            },
            &keypair.private_key,
        )
        .await
        .context("Failed to register demo certificate")?;

    let process = service
        .initialize_workflow(document_type, document_id, None)
        .context("Failed to initialize workflow")?;
    let process_id = process.process_id;
    info!("Initialized signing process {}", process_id);

    for action in [
        StepAction::StartCapture,
        StepAction::SubmitCapture(synthetic_capture()),
        StepAction::BeginAuthentication,
    ] {
        let name = action.name();
        let advance = service
            .process_workflow_step(process_id, action)
            .await
            .with_context(|| format!("Workflow step '{}' failed", name))?;
        info!("Advanced to step {} ({})", advance.step_number, advance.step);
    }

    let challenge = service
        .initiate_mfa(user_id, MfaMethod::Authenticator)
        .await
        .context("Failed to initiate MFA")?;
    let code = outbox
        .last_code_for(user_id)
        .ok_or_else(|| anyhow!("No MFA code was delivered to {}", user_id))?;
    service
        .verify_mfa(challenge.token_id, &code)
        .context("MFA verification failed")?;
    let session = service
        .create_signature_session(
            user_id,
            DEMO_ROLE,
            challenge.token_id,
            "127.0.0.1".parse()?,
            "sigtrust-cli",
        )
        .context("Failed to open signing session")?;

    let content = format!("{}:{}", document_type, document_id);
    let document_hash = service.generate_document_hash(content.as_bytes());
    let signer = SignerIdentity::new(user_id, format!("Demo signer {}", user_id), DEMO_ROLE);
    let completed = service
        .create_workflow_signature(
            process_id,
            SignRequest::new(signer, document_hash.clone()),
            Some(session.session_id),
        )
        .await
        .context("Failed to sign and store the document")?;

    let signature = completed
        .signature
        .as_ref()
        .ok_or_else(|| anyhow!("Completed process carries no signature"))?;
    let verification = service
        .verify_signature(signature, Some(&document_hash))
        .await
        .context("Failed to verify signature")?;

    let output = serde_json::json!({
        "process": completed,
        "verification": verification,
        "metrics": service.get_security_metrics(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
