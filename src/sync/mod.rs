use reqwest::StatusCode;
use std::time::Duration;
use tracing::{info, warn};

/// Periodic sync loop. Funnels through the proxy's own `/sync` endpoint so
/// manual and scheduled syncs share one code path (and one single-flight
/// lock). Failures are logged and the loop continues; this task never
/// terminates the process.
pub async fn run_periodic_sync(host: &str, port: u16, interval: Duration) {
    let sync_url = format!("http://{host}:{port}/sync");
    info!(
        "Starting periodic sync every {} targeting {}",
        humantime::format_duration(interval),
        sync_url
    );

    let client = reqwest::Client::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the initial sync
    // fires after one full interval.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        info!("Periodic sync triggered...");

        let resp = match client.post(&sync_url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Periodic sync failed: {e}");
                continue;
            }
        };

        if resp.status() != StatusCode::OK {
            let status = resp.status();
            match resp.text().await {
                Ok(body) => {
                    warn!("Periodic sync failed with status code: {status}, body: {body}")
                }
                Err(e) => warn!(
                    "Periodic sync failed with status code: {status} and could not read body: {e}"
                ),
            }
        }
    }
}
