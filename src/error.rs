use thiserror::Error;

/// Error taxonomy for the sidecar.
///
/// Every variant produced during startup is fatal: the process logs a
/// `FATAL:` line and exits 1. After startup only `Command` can occur (from
/// the `/sync` handler), where it is surfaced to the HTTP caller as a 500
/// with the captured command output as the body.
#[derive(Debug, Error)]
pub enum SidecarError {
    /// A required secret is missing from the environment.
    #[error("missing required environment variables: {0}")]
    Configuration(String),

    /// An external `bw` invocation exited non-zero. `output` carries the
    /// combined stdout+stderr of the failed command.
    #[error("{context}: {output}")]
    Command { context: String, output: String },

    /// The serve API never reported an unlocked vault within the retry
    /// budget.
    #[error("timeout waiting for bw serve to become unlocked after {attempts} attempts")]
    Timeout { attempts: u32 },
}

impl SidecarError {
    pub fn command(context: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Command {
            context: context.into(),
            output: output.into(),
        }
    }
}
