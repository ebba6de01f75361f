//! Command-line interface for TaskMaster
//!
//! Provides argument parsing and subcommand handling for the TaskMaster binary.

use clap::{Parser, Subcommand};

/// HTTP front-end for an external task agent
#[derive(Parser)]
#[command(name = "taskmaster")]
#[command(version)]
#[command(about = "HTTP front-end for an external task agent")]
#[command(
    long_about = "TaskMaster accepts task instructions over HTTP, runs the configured agent \
    executable once per task, and exposes request metrics in Prometheus format."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# TaskMaster Configuration
# =========================

# ─────────────────────────────────────────────────────────────────────────────
# SERVER
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on
port = 5000

# ─────────────────────────────────────────────────────────────────────────────
# AGENT
# ─────────────────────────────────────────────────────────────────────────────
#
# The agent is run as: <program> <args...> <instruction>
# It must print a JSON document on stdout and exit 0 on success, or print a
# message on stderr and exit nonzero on failure.

[agent]
program = "python3"
args = ["agent/main.py"]

# Directory the agent runs in. Relative paths are resolved against the
# directory containing this file.
working_dir = "."

# Kill the agent if it runs longer than this many seconds (1-3600).
# Leave unset to wait for as long as the agent runs.
# timeout_seconds = 120

# Maximum number of agent processes running at once.
# Leave unset for no limit (one process per in-flight request).
# max_concurrent = 8

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
# RUST_LOG overrides this when set.
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
"#
}
