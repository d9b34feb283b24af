//! CLI argument definitions, grounded on the teacher's `clap::Parser`
//! shape (`crates/llm-cost-ops-cli/src/cli/mod.rs`), narrowed to the
//! three operator-facing actions a routing proxy needs: running the
//! server, forcing a policy reload, and dry-running a single request.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "routing-brain")]
#[command(about = "Intelligent routing proxy for LLM requests", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file path (TOML). Falls back to `ROUTER_*` env vars
    /// when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server.
    Serve {
        /// Model catalog file (YAML). Falls back to `ROUTER_MODEL_CATALOG`.
        #[arg(long, env = "ROUTER_MODEL_CATALOG")]
        model_catalog: Option<PathBuf>,
    },

    /// Force-reload every department policy from disk without restarting
    /// the server, via `POST /internal/routing/policies/reload`.
    Reload {
        /// Base URL of a running instance.
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        url: String,
    },

    /// Dry-run a single request through C1-C4 without calling a provider,
    /// via `POST /internal/routing/simulate`.
    Simulate {
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        url: String,

        /// JSON file containing the SimulateRequest body.
        #[arg(short, long)]
        file: PathBuf,
    },
}
