use chronod::coordinator::{CoordinatorConfig, CoordinatorServer};
use chronod::error::{Error, Result};
use chronod::metrics;

// ============================================================================
// Coordinator Server Implementation
// ============================================================================

/// Configuration parameters for the coordinator server
pub struct CoordinatorParams {
    pub host: String,
    pub port: u16,
    pub authority_url: Option<String>,
    pub request_timeout: u64,
    pub launch_command: Option<String>,
    pub launch_port_min: u16,
    pub launch_port_max: u16,
    pub enable_cors: bool,
    pub enable_logging: bool,
}

/// Start the coordinator server
pub async fn coordinator_server(params: CoordinatorParams) -> Result<()> {
    let CoordinatorParams {
        host,
        port,
        authority_url,
        request_timeout,
        launch_command,
        launch_port_min,
        launch_port_max,
        enable_cors,
        enable_logging,
    } = params;

    println!("Starting Coordinator");
    println!("====================");
    println!("  Host: {host}");
    println!("  Port: {port}");
    println!("  Request Timeout: {request_timeout}s");
    println!("  Launch Ports: {launch_port_min}-{launch_port_max}");
    println!(
        "  CORS: {}",
        if enable_cors { "enabled" } else { "disabled" }
    );
    println!(
        "  Request Logging: {}",
        if enable_logging { "enabled" } else { "disabled" }
    );
    println!();

    // Build bind address
    let bind_address = format!("{host}:{port}")
        .parse()
        .map_err(|_| Error::other(format!("Invalid bind address: {host}:{port}")))?;

    // Create coordinator configuration
    let mut builder = CoordinatorConfig::builder()
        .bind_address(bind_address)
        .request_timeout_secs(request_timeout)
        .launch_port_range(launch_port_min, launch_port_max)
        .enable_cors(enable_cors)
        .enable_request_logging(enable_logging);

    if let Some(url) = authority_url {
        builder = builder.authority_url(url);
    }
    if let Some(command) = launch_command {
        builder = builder.launch_command(command);
    }

    let config = builder.build()?;

    // Register metrics; the coordinator runs without them if this fails
    if let Err(e) = metrics::init_metrics() {
        eprintln!("Warning: Metrics initialization failed: {e}");
    }

    // Create and start server
    let server = CoordinatorServer::new(config)?;

    println!("{}", server.info().display());
    println!();
    println!("API Endpoints:");
    println!("  POST /register     - Register a time node");
    println!("  POST /launch       - Launch a node on a remote host");
    println!("  GET  /instances    - List registered instances");
    println!("  GET  /logs         - Log history");
    println!("  POST /logs         - Ingest a forwarded node log line");
    println!("  POST /sync-clocks  - Trigger a synchronization round");
    println!("  GET  /worldtime    - Proxy the external time authority");
    println!("  GET  /metrics      - Prometheus metrics endpoint");
    println!("  WS   <any path>    - Observer event stream");
    println!();
    println!("Coordinator listening on http://{bind_address}");
    println!("Press Ctrl+C to stop.\n");

    // Start with graceful shutdown
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

    println!("Coordinator stopped.");
    Ok(())
}
