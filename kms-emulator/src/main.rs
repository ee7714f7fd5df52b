//! KMS Emulator
//!
//! Serves the Cloud KMS key management and symmetric crypto operations over
//! HTTP from an in-memory store. Configured through `KMS_EMULATOR_*`
//! environment variables.
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use anyhow::Result;
use kms_config::EmulatorConfig;
use kms_emulator::Emulator;
use kms_logging::{init_with_format, LogFormat};
use tokio::signal;
use tracing::{error, info};

const SERVICE_NAME: &str = "kms-emulator";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = EmulatorConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize logging
    let format: LogFormat = config
        .log_format
        .parse()
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    init_with_format(format, SERVICE_NAME, &config.log_level());

    info!(
        listen_addr = %config.listen_addr,
        store = %config.store,
        seed_file = ?config.seed_file,
        "Configuration loaded"
    );

    let emulator = Emulator::start(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start emulator: {}", e))?;

    // Wait for shutdown signal
    info!(addr = %emulator.addr(), "KMS Emulator running. Press Ctrl+C to stop.");
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, initiating graceful shutdown");
        }
        Err(err) => {
            error!(error = %err, "Unable to listen for shutdown signal");
        }
    }

    emulator
        .stop()
        .await
        .map_err(|e| anyhow::anyhow!("Emulator shutdown failed: {}", e))?;

    Ok(())
}
