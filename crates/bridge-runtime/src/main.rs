//! # Mesh Bridge
//!
//! HTTP and WebSocket bridge onto an LXMF mesh.
//!
//! Configuration comes from `MB_*` environment variables; see
//! [`bridge_runtime::config`].

use anyhow::Result;
use bridge_runtime::{load_config, BridgeRuntime};
use mesh_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry(&TelemetryConfig::from_env())?;

    let config = load_config()?;
    let runtime = BridgeRuntime::new(config).await?;

    info!("Bridge is running. Press Ctrl+C to stop.");
    runtime
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl+C");
            }
        })
        .await
}
