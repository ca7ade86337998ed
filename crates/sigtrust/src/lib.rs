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

//! # Sigtrust
//!
//! Digital signature and certificate-trust core for clinical and regulated
//! documents. Sigtrust binds a document hash to a signer identity through a
//! certificate, gates signing behind multi-factor authentication, stores the
//! result encrypted at rest, and drives each document through a signing
//! workflow.
//!
//! ## Components
//!
//! - [`certificates::CertificateRegistry`] tracks certificates and their
//!   validity, refreshed against a revocation list
//! - [`security`] runs the verification check battery and emits audit events
//! - [`signing::SignatureEngine`] creates and verifies signatures
//! - [`auth::AuthenticationManager`] issues MFA challenges and single-use
//!   signing sessions
//! - [`storage::EncryptedSignatureStore`] seals signatures and audits every read
//! - [`workflow::SigningWorkflowEngine`] moves one process per document from
//!   `Initialized` to `Complete`
//!
//! [`SigningService`] wires them together.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sigtrust::{SigningConfig, SigningService};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = SigningService::builder(SigningConfig::default()).build()?;
//! let hash = service.generate_document_hash(b"consent form");
//! let process = service.initialize_workflow("consent", "D-1", None)?;
//! println!("{} {}", hash, process.process_id);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod certificates;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod security;
pub mod service;
pub mod signing;
pub mod storage;
pub mod workflow;

pub use auth::{AuthError, AuthenticationManager};
pub use certificates::{CertificateError, CertificateRegistry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, DocumentTypePolicy, SigningConfig};
pub use error::{ErrorKind, TransportError};
pub use service::{RevocationRefresher, ServiceError, SigningService, SigningServiceBuilder};
pub use signing::{SignatureEngine, SignatureError};
pub use storage::{EncryptedSignatureStore, StoreError};
pub use workflow::{SignRequest, SigningWorkflowEngine, StepAction, StepAdvance, WorkflowError};
