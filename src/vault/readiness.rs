use crate::config::RetryPolicy;
use crate::error::SidecarError;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Per-request timeout for status polls. Short on purpose: a hung request
/// must not eat the whole retry budget.
const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

/// Block until the `bw serve` API on `port` reports an unlocked vault.
///
/// Network errors, non-200 responses, and unparseable bodies all consume one
/// attempt from the same budget; there is no separate error counter. Returns
/// as soon as one attempt satisfies [`is_unlocked`].
pub async fn wait_for_unlocked(port: u16, policy: &RetryPolicy) -> Result<(), SidecarError> {
    let status_url = format!("http://127.0.0.1:{port}/status");
    let client = reqwest::Client::new();

    info!("Waiting for 'bw serve' to become ready and unlocked...");

    for attempt in 1..=policy.max_attempts {
        match poll_once(&client, &status_url).await {
            Some(true) => return Ok(()),
            Some(false) => debug!(
                "bw serve responded but vault is not unlocked (attempt {}/{})",
                attempt, policy.max_attempts
            ),
            None => debug!(
                "bw serve not reachable yet (attempt {}/{})",
                attempt, policy.max_attempts
            ),
        }
        tokio::time::sleep(policy.interval).await;
    }

    Err(SidecarError::Timeout {
        attempts: policy.max_attempts,
    })
}

/// One poll attempt. `None` means the request itself failed (connection
/// error, non-200, bad JSON); `Some` carries the predicate result.
async fn poll_once(client: &reqwest::Client, url: &str) -> Option<bool> {
    let resp = client
        .get(url)
        .timeout(STATUS_TIMEOUT)
        .send()
        .await
        .ok()?;
    if resp.status() != reqwest::StatusCode::OK {
        return None;
    }
    let body: Value = resp.json().await.ok()?;
    Some(is_unlocked(&body))
}

/// Unlock predicate over the loosely-typed status payload.
///
/// The serve API has shipped the status in three different places across
/// versions; accept any of them. Missing keys, wrong types, and non-object
/// intermediate nodes are all "not unlocked", never an error.
pub fn is_unlocked(payload: &Value) -> bool {
    if let Some(data) = payload.get("data") {
        if status_field(data.get("template")) {
            return true;
        }
        if data.get("status").and_then(Value::as_str) == Some("unlocked") {
            return true;
        }
    }
    payload.get("status").and_then(Value::as_str) == Some("unlocked")
}

fn status_field(node: Option<&Value>) -> bool {
    node.and_then(|n| n.get("status"))
        .and_then(Value::as_str)
        == Some("unlocked")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unlocked_in_all_three_documented_placements() {
        assert!(is_unlocked(&json!({"status": "unlocked"})));
        assert!(is_unlocked(&json!({"data": {"status": "unlocked"}})));
        assert!(is_unlocked(&json!({
            "data": {"template": {"status": "unlocked"}}
        })));
    }

    #[test]
    fn locked_and_other_strings_are_false() {
        assert!(!is_unlocked(&json!({"status": "locked"})));
        assert!(!is_unlocked(&json!({"data": {"status": "locked"}})));
        assert!(!is_unlocked(
            &json!({"data": {"template": {"status": "locked"}}})
        ));
        assert!(!is_unlocked(&json!({"status": "UNLOCKED"})));
    }

    #[test]
    fn missing_keys_are_false() {
        assert!(!is_unlocked(&json!({})));
        assert!(!is_unlocked(&json!({"data": {}})));
        assert!(!is_unlocked(&json!({"data": {"template": {}}})));
        assert!(!is_unlocked(&json!({"other": "unlocked"})));
    }

    #[test]
    fn wrong_types_are_false_not_panics() {
        assert!(!is_unlocked(&json!({"data": 123})));
        assert!(!is_unlocked(&json!({"data": {"template": []}})));
        assert!(!is_unlocked(&json!({"status": {}})));
        assert!(!is_unlocked(&json!({"status": 1})));
        assert!(!is_unlocked(&json!({"status": null})));
        assert!(!is_unlocked(&json!({"data": {"status": ["unlocked"]}})));
        assert!(!is_unlocked(&json!({"data": {"template": {"status": 7}}})));
        assert!(!is_unlocked(&json!(["unlocked"])));
        assert!(!is_unlocked(&json!("unlocked")));
    }

    #[test]
    fn nested_match_wins_even_with_locked_siblings() {
        assert!(is_unlocked(&json!({
            "status": "locked",
            "data": {"template": {"status": "unlocked"}}
        })));
    }
}
