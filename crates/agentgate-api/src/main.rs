//! agentgate CLI and REST API entry point.
//!
//! Binary name: `agentgate`
//!
//! Loads settings from the environment, wires the agent runner to its store,
//! model and MCP gateway, registers with the master agent when one is
//! configured, then serves the REST API until Ctrl+C or SIGTERM.

mod cli;
mod http;
mod state;

use std::path::Path;

use clap::Parser;

use agentgate_infra::config::{load_env_file, load_settings};
use agentgate_infra::master::{MasterAgentClient, RegistrationError, load_agent_card};
use agentgate_observe::tracing_setup::{init_tracing, shutdown_tracing};
use agentgate_types::config::Settings;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The env file may carry RUST_LOG, so it is loaded before the subscriber.
    let env_file = load_env_file(cli.env_file.as_deref())?;
    init_tracing(cli.verbose, cli.otel).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    if let Some(path) = &env_file {
        tracing::debug!(path = %path.display(), "loaded env file");
    }

    let mut settings = load_settings()?;

    match cli.command {
        Commands::Config => {
            cli::config::show_config(&settings)?;
        }

        Commands::Serve { host, port } => {
            if let Some(host) = host {
                settings.app.host = host;
            }
            if let Some(port) = port {
                settings.app.port = port;
            }

            let state = AppState::init(settings.clone()).await?;

            if let Some(master) = &settings.master_agent {
                // The agent still serves direct chat when the master is down.
                if let Err(e) = register_with_master(&settings, &master.base_url).await {
                    tracing::warn!(error = %e, master = %master.base_url, "master agent registration failed");
                }
            }

            let addr = format!("{}:{}", settings.app.host, settings.app.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!();
            println!(
                "  {} {} listening on {}",
                console::style("▶").green().bold(),
                console::style(state.runner.app_name()).cyan(),
                console::style(format!("http://{addr}")).underlined()
            );
            println!(
                "  {} gateway '{}' with {} backend server(s), store: {}",
                console::style("·").dim(),
                settings.gateway.name,
                settings.gateway.backend_servers.len(),
                settings.store.backend
            );
            println!();

            let router = http::router::build_router(state);
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }
    }

    shutdown_tracing();
    Ok(())
}

async fn register_with_master(settings: &Settings, base_url: &str) -> Result<(), RegistrationError> {
    let card = load_agent_card(Path::new(&settings.agent.card_path))?;
    let client = MasterAgentClient::new(base_url, settings.gateway.timeout_secs)?;
    client
        .register(&settings.agent.name, &card, settings.agent.base_url.as_deref())
        .await
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
