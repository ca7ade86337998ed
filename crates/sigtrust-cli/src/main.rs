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

//! Sigtrust CLI - command-line interface for the sigtrust signing core.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sigtrust::SigningConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

/// Sigtrust - digital signatures and certificate trust for regulated documents
#[derive(Parser)]
#[command(name = "sigtrust")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (can also be set via SIGTRUST_CONFIG)
    #[arg(long, env = "SIGTRUST_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SHA-256 document hash of a file
    Hash {
        /// File to hash
        path: PathBuf,
    },
    /// Generate an Ed25519 certificate keypair
    Keygen {
        /// Also print the private key (hex)
        #[arg(long)]
        show_private: bool,
    },
    /// Run a complete signing workflow against in-memory collaborators
    Demo {
        /// Document id to sign
        #[arg(long, default_value = "D-1")]
        document_id: String,

        /// Document type to sign
        #[arg(long, default_value = "consent")]
        document_type: String,

        /// Signer user id
        #[arg(long, default_value = "U-1")]
        user_id: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<SigningConfig> {
    match path {
        Some(path) => SigningConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(SigningConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Hash { path } => commands::hash::run(&path)?,
        Commands::Keygen { show_private } => commands::keygen::run(show_private)?,
        Commands::Demo {
            document_id,
            document_type,
            user_id,
        } => {
            let config = load_config(cli.config.as_ref())?;
            commands::demo::run(config, &document_type, &document_id, &user_id).await?;
        }
    }

    Ok(())
}
