use clap::Parser;
use tracing::info;

use reminder_core::config::load_dotenv;
use reminder_core::Config;
use reminder_server::{build_router, startup};

/// Alarm reminder HTTP API.
#[derive(Parser, Debug)]
#[command(name = "reminder-server", version, about)]
struct Cli {
    /// Bind address (overrides HOST).
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Store backend, "dynamodb" or "memory" (overrides STORE_BACKEND).
    #[arg(long)]
    store: Option<String>,
}

fn load_config(cli: &Cli) -> Config {
    load_dotenv();
    let mut config = Config::from_env();
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(store) = &cli.store {
        config.store.backend = store.to_lowercase();
    }
    config
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli);
    config.log_summary();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = startup::build_app_state(config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
