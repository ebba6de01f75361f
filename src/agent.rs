//! External agent invocation
//!
//! Runs the configured agent executable once per task, passing the
//! instruction as a discrete argument, and captures everything it writes.

use crate::config::AgentConfig;
use crate::error::{AppError, AppResult};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::Semaphore;

/// Captured result of one agent run
///
/// A nonzero exit is still a successful invocation from the invoker's point
/// of view. Use [`InvocationResult::into_output`] to classify it.
#[derive(Debug)]
pub struct InvocationResult {
    status: ExitStatus,
    stdout: String,
    stderr: String,
    elapsed: Duration,
}

impl InvocationResult {
    /// Whether the agent exited with status zero
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or `None` if the process was terminated by a signal
    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Everything the agent wrote to standard output
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Everything the agent wrote to standard error
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Time from spawn to exit
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Stdout on a zero exit, otherwise `AppError::AgentFailed` carrying the
    /// trimmed stderr text
    pub fn into_output(self) -> AppResult<String> {
        if self.status.success() {
            Ok(self.stdout)
        } else {
            Err(AppError::AgentFailed {
                exit_code: self.status.code(),
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Spawns the external agent
///
/// Clones share the same concurrency limiter.
#[derive(Debug, Clone)]
pub struct AgentInvoker {
    config: Arc<AgentConfig>,
    limiter: Option<Arc<Semaphore>>,
}

impl AgentInvoker {
    pub fn new(config: AgentConfig) -> Self {
        let limiter = config
            .max_concurrent()
            .map(|permits| Arc::new(Semaphore::new(permits)));

        Self {
            config: Arc::new(config),
            limiter,
        }
    }

    /// Get the agent configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Number of agent processes that may still start without waiting,
    /// or `None` when concurrency is unbounded
    pub fn available_slots(&self) -> Option<usize> {
        self.limiter.as_ref().map(|s| s.available_permits())
    }

    /// Build the command for one instruction
    ///
    /// Arguments are passed as a list; nothing goes through a shell.
    fn command(&self, instruction: &str) -> Command {
        let mut cmd = Command::new(self.config.program());
        cmd.args(self.config.args())
            .arg(instruction)
            .current_dir(self.config.working_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Only a timeout may abandon a running agent.
            .kill_on_drop(self.config.timeout_seconds().is_some());
        cmd
    }

    /// Run the agent once and wait for it to exit
    ///
    /// # Errors
    ///
    /// - `AppError::AgentSpawn` if the program cannot be started
    /// - `AppError::AgentTimeout` if a timeout is configured and expires
    pub async fn invoke(&self, instruction: &str) -> AppResult<InvocationResult> {
        let _permit = match &self.limiter {
            Some(limiter) => Some(limiter.clone().acquire_owned().await.map_err(|e| {
                AppError::Internal(format!("agent concurrency limiter closed: {e}"))
            })?),
            None => None,
        };

        let program = self.config.program();
        tracing::debug!(
            program = %program,
            args = ?self.config.args(),
            working_dir = %self.config.working_dir().display(),
            instruction_len = instruction.len(),
            "Spawning agent"
        );

        let start = Instant::now();
        let mut cmd = self.command(instruction);
        let output = cmd.output();

        let output = match self.config.timeout_seconds() {
            Some(timeout_seconds) => {
                match tokio::time::timeout(Duration::from_secs(timeout_seconds), output).await {
                    Ok(result) => result,
                    Err(_elapsed) => {
                        tracing::warn!(
                            program = %program,
                            timeout_seconds,
                            "Agent timed out and was killed"
                        );
                        return Err(AppError::AgentTimeout { timeout_seconds });
                    }
                }
            }
            None => output.await,
        }
        .map_err(|source| AppError::AgentSpawn {
            program: program.to_string(),
            source,
        })?;

        let result = InvocationResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            elapsed: start.elapsed(),
        };

        tracing::debug!(
            program = %program,
            exit_code = ?result.exit_code(),
            stdout_bytes = result.stdout.len(),
            stderr_bytes = result.stderr.len(),
            elapsed_ms = result.elapsed.as_secs_f64() * 1000.0,
            "Agent exited"
        );

        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> AgentInvoker {
        AgentInvoker::new(AgentConfig::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
            std::env::temp_dir(),
        ))
    }

    #[tokio::test]
    async fn test_invoke_captures_stdout_on_success() {
        let invoker = sh(r#"printf '[{"ticker":"AAPL"}]'"#);
        let result = invoker.invoke("AAPL daily summary").await.unwrap();

        assert!(result.success());
        assert_eq!(result.exit_code(), Some(0));
        assert_eq!(result.stdout(), r#"[{"ticker":"AAPL"}]"#);
        assert_eq!(result.stderr(), "");
    }

    #[tokio::test]
    async fn test_instruction_is_a_single_argument() {
        // With `sh -c script`, the next argument becomes $0.
        let invoker = sh(r#"printf '%s' "$0""#);
        let result = invoker.invoke("a b; echo injected").await.unwrap();

        assert_eq!(result.stdout(), "a b; echo injected");
    }

    #[tokio::test]
    async fn test_invoke_captures_stderr_and_exit_code() {
        let invoker = sh("echo '  invalid ticker  ' >&2; exit 3");
        let result = invoker.invoke("XYZ").await.unwrap();

        assert!(!result.success());
        assert_eq!(result.exit_code(), Some(3));
        assert_eq!(result.stderr(), "  invalid ticker  \n");

        match result.into_output() {
            Err(AppError::AgentFailed { exit_code, stderr }) => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr, "invalid ticker");
            }
            other => panic!("expected AgentFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_into_output_returns_stdout_verbatim() {
        let invoker = sh("printf ' {\"a\":1}\\n'");
        let output = invoker.invoke("").await.unwrap().into_output().unwrap();
        assert_eq!(output, " {\"a\":1}\n");
    }

    #[tokio::test]
    async fn test_runs_in_configured_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = AgentInvoker::new(AgentConfig::new(
            "sh",
            vec!["-c".to_string(), "pwd -P".to_string()],
            dir.path(),
        ));
        let result = invoker.invoke("ignored").await.unwrap();

        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(result.stdout().trim(), expected.to_str().unwrap());
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let invoker = AgentInvoker::new(AgentConfig::new(
            "taskmaster-definitely-missing-agent",
            Vec::new(),
            std::env::temp_dir(),
        ));
        let err = invoker.invoke("x").await.unwrap_err();
        assert!(matches!(err, AppError::AgentSpawn { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_timeout_kills_slow_agent() {
        let invoker = AgentInvoker::new(
            AgentConfig::new(
                "sh",
                vec!["-c".to_string(), "sleep 5".to_string()],
                std::env::temp_dir(),
            )
            .with_timeout_seconds(1),
        );
        let start = Instant::now();
        let err = invoker.invoke("x").await.unwrap_err();

        assert!(matches!(err, AppError::AgentTimeout { timeout_seconds: 1 }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_limiter_releases_permit_after_run() {
        let invoker = AgentInvoker::new(
            AgentConfig::new(
                "sh",
                vec!["-c".to_string(), "true".to_string()],
                std::env::temp_dir(),
            )
            .with_max_concurrent(2),
        );
        assert_eq!(invoker.available_slots(), Some(2));
        invoker.invoke("x").await.unwrap();
        assert_eq!(invoker.available_slots(), Some(2));
    }

    #[tokio::test]
    async fn test_unbounded_invoker_has_no_slots() {
        assert_eq!(sh("true").available_slots(), None);
    }

    #[tokio::test]
    async fn test_limiter_serializes_agents() {
        let invoker = AgentInvoker::new(
            AgentConfig::new(
                "sh",
                vec!["-c".to_string(), "sleep 0.3".to_string()],
                std::env::temp_dir(),
            )
            .with_max_concurrent(1),
        );

        let start = Instant::now();
        let (a, b) = tokio::join!(invoker.invoke("a"), invoker.invoke("b"));
        a.unwrap();
        b.unwrap();

        assert!(
            start.elapsed() >= Duration::from_millis(600),
            "two agents ran concurrently despite max_concurrent = 1"
        );
    }
}
