use chronod::error::Result;
use chronod::node::{NodeConfig, NodeServer};

// ============================================================================
// Time Node Implementation
// ============================================================================

/// Configuration parameters for a time node
///
/// Every field is optional: the base configuration comes from the
/// environment (`NODE_PORT`, `COORDINATOR_URL`, ...) and CLI flags override
/// it.
#[derive(Default)]
pub struct NodeParams {
    pub port: Option<u16>,
    pub advertised_host: Option<String>,
    pub coordinator: Option<String>,
    pub no_forward_logs: bool,
    pub skew_range: Option<i64>,
    pub timeout: Option<u64>,
}

/// Start a time node
pub async fn node_server(params: NodeParams) -> Result<()> {
    let mut config = NodeConfig::from_env()?;

    if let Some(port) = params.port {
        config.bind_address.set_port(port);
    }
    if let Some(host) = params.advertised_host {
        config.advertised_host = host;
    }
    if let Some(url) = params.coordinator {
        config.coordinator_url = url;
    }
    if params.no_forward_logs {
        config.forward_logs = false;
    }
    if let Some(range) = params.skew_range {
        config.skew_range_secs = range;
    }
    if let Some(timeout) = params.timeout {
        config.timeout_secs = timeout;
    }

    config.validate().map_err(chronod::error::Error::NodeConfig)?;

    println!("Starting Time Node");
    println!("==================");
    println!("{}", config.display());
    println!();
    println!("Endpoints:");
    println!("  GET  /time   - Current logical clock value");
    println!("  POST /sync   - Apply a correction");
    println!("  GET  /logs   - Local log history");
    println!("  WS   <any>   - Per-second clock stream");
    println!();
    println!("Node listening on http://{}", config.bind_address);
    println!("Press Ctrl+C to stop.\n");

    let server = NodeServer::new(config)?;

    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await?;

    println!("Node stopped.");
    Ok(())
}
