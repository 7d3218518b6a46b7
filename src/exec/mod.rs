//! External command execution.
//!
//! All short-lived `bw` invocations (config, login, unlock, sync) go through
//! the [`CommandRunner`] trait so tests can substitute process execution
//! without touching call sites. The long-running `bw serve` child is spawned
//! separately in [`crate::vault::serve`] because it inherits stdio and never
//! returns an output.

use anyhow::Result;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Result of one external command invocation. `combined` interleaves stdout
/// and stderr, matching what operators see when running `bw` by hand.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub combined: String,
}

impl CommandOutput {
    pub fn trimmed(&self) -> &str {
        self.combined.trim()
    }
}

/// Capability to run an external command to completion, capturing output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> Result<CommandOutput>;
}

/// Runs commands on the real system via `tokio::process`.
#[derive(Debug, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> Result<CommandOutput> {
        debug!("Executing command: {} {}", program, args.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args)
            // Don't inherit stdin — prevent hanging on interactive prompts.
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in envs {
            cmd.env(key, value);
        }

        let output = cmd.output().await?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }

        Ok(CommandOutput {
            success: output.status.success(),
            combined,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_of_successful_command() {
        let runner = SystemRunner;
        let out = runner.run("echo", &["session-token"], &[]).await.unwrap();
        assert!(out.success);
        assert_eq!(out.trimmed(), "session-token");
    }

    #[tokio::test]
    async fn reports_failure_exit_status() {
        let runner = SystemRunner;
        let out = runner.run("false", &[], &[]).await.unwrap();
        assert!(!out.success);
    }

    #[tokio::test]
    async fn passes_environment_to_child() {
        let runner = SystemRunner;
        let out = runner
            .run("sh", &["-c", "printf %s \"$BW_SESSION\""], &[("BW_SESSION", "tok-123")])
            .await
            .unwrap();
        assert!(out.success);
        assert_eq!(out.combined, "tok-123");
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let runner = SystemRunner;
        assert!(runner
            .run("definitely-not-a-real-binary", &[], &[])
            .await
            .is_err());
    }
}
