//! CLI command definitions for the `agentgate` binary.
//!
//! Uses clap derive macros for argument parsing. Settings always come from
//! the environment (optionally primed from an env file); flags only override
//! the listen address.

pub mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Serve an LLM agent that reaches MCP tool servers through a gateway.
#[derive(Parser)]
#[command(name = "agentgate", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Load variables from this file instead of `./.env`.
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Debug-level logs for agentgate and HTTP tracing (`RUST_LOG` wins).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also export spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Listen address (defaults to APP__HOST).
        #[arg(long)]
        host: Option<String>,

        /// Listen port (defaults to APP__PORT).
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the effective configuration as JSON, secrets redacted.
    Config,
}
