//! TaskMaster - HTTP front-end for an external task agent
//!
//! Accepts task instructions over HTTP, runs an external agent executable
//! once per task, and reports request outcomes and latency in Prometheus
//! text format.

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod telemetry;
