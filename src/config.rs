//! Configuration management for TaskMaster
//!
//! Parses TOML configuration files and provides typed access to settings.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Upper bound accepted for `agent.timeout_seconds` (one hour)
const MAX_TIMEOUT_SECONDS: u64 = 3600;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// External agent configuration
///
/// The agent is launched as `program args... <instruction>` from
/// `working_dir`. The instruction is always passed as one extra argument and
/// is never interpreted by a shell.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    #[serde(default = "default_program")]
    program: String,
    #[serde(default = "default_args")]
    args: Vec<String>,
    #[serde(default = "default_working_dir")]
    working_dir: PathBuf,
    /// Optional wall-clock limit for one invocation. Unset means the request
    /// waits for as long as the agent runs.
    #[serde(default)]
    timeout_seconds: Option<u64>,
    /// Optional cap on concurrently running agent processes. Unset means
    /// one process per in-flight request with no limit.
    #[serde(default)]
    max_concurrent: Option<usize>,
}

impl AgentConfig {
    /// Create an agent configuration with no timeout and no concurrency limit
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
            timeout_seconds: None,
            max_concurrent: None,
        }
    }

    /// Set the invocation timeout
    pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Set the concurrency limit
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = Some(max_concurrent);
        self
    }

    /// Get the executable name or path
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the fixed leading arguments
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Get the working directory the agent runs in
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Get the invocation timeout (if configured)
    pub fn timeout_seconds(&self) -> Option<u64> {
        self.timeout_seconds
    }

    /// Get the concurrency limit (if configured)
    pub fn max_concurrent(&self) -> Option<usize> {
        self.max_concurrent
    }

    /// Anchor a relative working directory at `base`
    ///
    /// Absolute paths are left untouched.
    pub fn resolve_working_dir(&mut self, base: &Path) {
        if self.working_dir.is_relative() {
            self.working_dir = base.join(&self.working_dir);
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new(default_program(), default_args(), default_working_dir())
    }
}

fn default_program() -> String {
    "python3".to_string()
}

fn default_args() -> Vec<String> {
    vec!["agent/main.py".to_string()]
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// A relative `agent.working_dir` is resolved against the directory that
    /// contains the file, so the agent location does not depend on where the
    /// server was started from.
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        let mut config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        let base = path
            .as_ref()
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        config.agent.resolve_working_dir(base);

        Ok(config)
    }

    /// Validate configuration values that serde cannot check on its own
    pub fn validate(&self) -> AppResult<()> {
        if self.agent.program.trim().is_empty() {
            return Err(AppError::Config(
                "agent.program must not be empty".to_string(),
            ));
        }

        if let Some(timeout) = self.agent.timeout_seconds {
            if timeout == 0 {
                return Err(AppError::Config(
                    "agent.timeout_seconds must be greater than 0 (omit it to disable the timeout)"
                        .to_string(),
                ));
            }
            if timeout > MAX_TIMEOUT_SECONDS {
                return Err(AppError::Config(format!(
                    "agent.timeout_seconds cannot exceed {} seconds, got {}",
                    MAX_TIMEOUT_SECONDS, timeout
                )));
            }
        }

        if self.agent.max_concurrent == Some(0) {
            return Err(AppError::Config(
                "agent.max_concurrent must be greater than 0 (omit it for no limit)".to_string(),
            ));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}
