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

//! Implementation of the `keygen` command.

use anyhow::Result;
use sigtrust::crypto::generate_signing_keypair;
use sigtrust::models::PublicKeyInfo;
use tracing::warn;

/// Generate a keypair and print its public half as JSON.
pub fn run(show_private: bool) -> Result<()> {
    let keypair = generate_signing_keypair();
    let public_key = PublicKeyInfo::ed25519(keypair.public_key.clone());

    let mut output = serde_json::json!({
        "algorithm": public_key.algorithm,
        "fingerprint": keypair.fingerprint,
        "public_key_pem": public_key.to_pem(),
    });
    if show_private {
        warn!("Printing private key material; store it in the certificate keyring and discard this output");
        output["private_key_hex"] = serde_json::Value::String(hex::encode(&keypair.private_key));
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
