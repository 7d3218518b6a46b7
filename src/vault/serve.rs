use std::process::Stdio;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::info;

/// Spawn the long-running `bw serve` process as a supervised task.
///
/// The child inherits our stdout/stderr so its logs stay visible. If it
/// exits for any reason the whole sidecar is useless, so the supervising
/// task prints a `FATAL:` line and terminates the process. No restarts.
pub fn spawn(port: u16, session: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting 'bw serve' on internal port {}", port);

        let status = Command::new("bw")
            .args([
                "serve",
                "--hostname",
                "0.0.0.0",
                "--port",
                &port.to_string(),
                "--session",
                &session,
            ])
            .env("BW_SESSION", &session)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await;

        match status {
            Ok(status) => eprintln!("FATAL: 'bw serve' process exited: {status}"),
            Err(e) => eprintln!("FATAL: failed to start 'bw serve': {e}"),
        }
        std::process::exit(1);
    })
}
