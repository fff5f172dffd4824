use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{coordinator_server, node_server, CoordinatorParams, NodeParams};

#[derive(Parser)]
#[command(
    name = "chronod",
    version,
    about = "Berkeley-style clock synchronization coordinator and time nodes",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the coordinator process
    Coordinator {
        /// Host to bind on
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to bind on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// World-clock service URL used as the synchronization reference
        #[arg(long)]
        authority_url: Option<String>,

        /// Timeout for outbound calls in seconds
        #[arg(long, default_value = "5")]
        request_timeout: u64,

        /// Launch command template ({host} and {port} are substituted)
        #[arg(long)]
        launch_command: Option<String>,

        /// Lowest port assigned to launched nodes
        #[arg(long, default_value = "5000")]
        launch_port_min: u16,

        /// Highest port assigned to launched nodes
        #[arg(long, default_value = "6000")]
        launch_port_max: u16,

        /// Disable CORS
        #[arg(long)]
        no_cors: bool,

        /// Disable request logging
        #[arg(long)]
        no_request_logging: bool,
    },

    /// Run a time node process
    Node {
        /// Port to bind on (overrides NODE_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host announced to the coordinator (overrides ADVERTISED_HOST)
        #[arg(long)]
        advertised_host: Option<String>,

        /// Coordinator base URL (overrides COORDINATOR_URL)
        #[arg(long)]
        coordinator: Option<String>,

        /// Do not forward journal lines to the coordinator
        #[arg(long)]
        no_forward_logs: bool,

        /// Startup skew bound in seconds (overrides SKEW_RANGE_SECS)
        #[arg(long)]
        skew_range: Option<i64>,

        /// Outbound request timeout in seconds (overrides TIMEOUT_SECS)
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    setup_tracing(&cli.log_format, cli.verbose)?;

    tracing::info!("chronod starting");

    match cli.command {
        Commands::Coordinator {
            host,
            port,
            authority_url,
            request_timeout,
            launch_command,
            launch_port_min,
            launch_port_max,
            no_cors,
            no_request_logging,
        } => {
            tracing::info!(
                host = %host,
                port = %port,
                request_timeout = %request_timeout,
                "Starting coordinator command"
            );
            coordinator_server(CoordinatorParams {
                host,
                port,
                authority_url,
                request_timeout,
                launch_command,
                launch_port_min,
                launch_port_max,
                enable_cors: !no_cors,
                enable_logging: !no_request_logging,
            })
            .await?;
        }

        Commands::Node {
            port,
            advertised_host,
            coordinator,
            no_forward_logs,
            skew_range,
            timeout,
        } => {
            tracing::info!(
                port = ?port,
                coordinator = ?coordinator,
                "Starting node command"
            );
            node_server(NodeParams {
                port,
                advertised_host,
                coordinator,
                no_forward_logs,
                skew_range,
                timeout,
            })
            .await?;
        }
    }

    tracing::info!("chronod stopped");
    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("chronod=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("chronod=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
