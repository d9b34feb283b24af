//! routing-brain — an intelligent routing proxy for LLM requests.
//!
//! Classifies each request's task type, complexity, and risk, then routes
//! it to the cheapest model tier that can serve it safely, with
//! budget-aware downgrades and automatic fallback across providers
//! (SPEC_FULL.md §1-§2).

pub mod api;
pub mod auth;
pub mod budget;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod domain;
pub mod executor;
pub mod observability;
pub mod pipeline;
pub mod policy_engine;
pub mod preanalyzer;
pub mod providers;
pub mod recorder;
pub mod risk;

pub use domain::{Result, RouterError};

pub use api::{build_router, ApiState};
pub use cli::{Cli, Commands};
pub use config::RouterConfig;
pub use pipeline::RoutingPipeline;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initializes baseline tracing for contexts that run before a
/// `RouterConfig` is available (binary startup, test harnesses).
pub fn init() -> Result<()> {
    observability::init_tracing();
    Ok(())
}
