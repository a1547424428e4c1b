//! CLI module for Conductor
//!
//! Provides command-line parsing for the conductor binary. Uses clap for
//! argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};

/// Conductor - supervisor for distributed agent services
#[derive(Parser, Debug)]
#[command(
    name = "conductor",
    version,
    about = "Supervisor-driven orchestration over distributed agent services",
    long_about = "Discovers agent capabilities from running services, plans a \
                  capability sequence for each request with an LLM, and routes \
                  steps to the agents providing them.",
    after_help = "EXAMPLES:\n    \
                  conductor \"research Rust async and email me a summary\"\n    \
                  conductor agents                  # List discovered agents\n    \
                  AGENT_SERVICES=http://localhost:8001 conductor \"...\""
)]
pub struct Cli {
    /// The request to process
    pub request: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover and list agent services and their capabilities
    Agents,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
