//! API gateway entry point.
//!
//! ```text
//! api-gateway serve    # auth, rate limiting, routing to users/orders/documents
//! api-gateway balance  # round-robin front over replicated gateway instances
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use api_gateway::admin::{setup_admin_router, AdminState};
use api_gateway::config::{self, GatewayConfig};
use api_gateway::http::{BalancerServer, GatewayServer};
use api_gateway::lifecycle::shutdown::signalled;
use api_gateway::lifecycle::signals::spawn_signal_listener;
use api_gateway::lifecycle::startup::bind;
use api_gateway::lifecycle::{BalancerComponents, GatewayComponents, Shutdown};
use api_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "api-gateway", version, about = "API gateway and front load balancer")]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Run the gateway pipeline (default)
    Serve,
    /// Run the front balancer over the configured gateway instances
    Balance,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref())?;
    logging::init_logging(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-gateway starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_listener(shutdown.clone());

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, &shutdown).await?,
        Command::Balance => balance(&config, &shutdown).await?,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn serve(config: &GatewayConfig, shutdown: &Shutdown) -> Result<(), Box<dyn std::error::Error>> {
    let components = GatewayComponents::build(config)?;
    spawn_admin(config, AdminState::for_gateway(&components, &config.admin.api_key), shutdown).await?;

    let listener = bind(&config.listener.bind_address).await?;
    let server = GatewayServer::new(&components, config).run(listener, shutdown.subscribe());
    if let Some(result) = shutdown.drain(server, grace(config)).await {
        result?;
    }
    Ok(())
}

async fn balance(config: &GatewayConfig, shutdown: &Shutdown) -> Result<(), Box<dyn std::error::Error>> {
    let components = BalancerComponents::build(config)?;
    spawn_admin(config, AdminState::for_balancer(&components, &config.admin.api_key), shutdown).await?;

    let listener = bind(&config.gateway.bind_address).await?;
    let server = BalancerServer::new(&components, config).run(listener, shutdown.subscribe());
    if let Some(result) = shutdown.drain(server, grace(config)).await {
        result?;
    }
    Ok(())
}

fn grace(config: &GatewayConfig) -> Duration {
    Duration::from_secs(config.timeouts.request_secs)
}

async fn spawn_admin(
    config: &GatewayConfig,
    state: AdminState,
    shutdown: &Shutdown,
) -> Result<(), Box<dyn std::error::Error>> {
    if !config.admin.enabled {
        return Ok(());
    }

    let listener = bind(&config.admin.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Admin API listening");

    let router = setup_admin_router(state);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(signalled(rx))
            .await
        {
            tracing::error!(error = %e, "Admin API stopped");
        }
    });
    Ok(())
}
