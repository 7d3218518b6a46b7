use crate::error::SidecarError;
use std::time::Duration;
use tracing::warn;

/// Retry budget for the readiness poll. Attempts and errors share one
/// counter: a failed request consumes an attempt just like a locked status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(1),
        }
    }
}

/// Sidecar configuration, loaded once from the environment at startup and
/// immutable thereafter.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional Bitwarden server host, applied via `bw config server`.
    pub host: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    pub password: String,
    /// Internal port the `bw serve` process binds to.
    pub serve_port: u16,
    /// Public port the proxy server binds to.
    pub proxy_port: u16,
    /// Hostname the periodic sync loop uses to reach the proxy's own
    /// `/sync` endpoint.
    pub proxy_host: String,
    pub disable_sync: bool,
    pub sync_interval: Duration,
    pub retry: RetryPolicy,
}

impl Config {
    /// Load configuration from the process environment. Empty values are
    /// treated as unset. Fails only when a required secret is missing;
    /// malformed optional values fall back to defaults with a warning.
    pub fn from_env() -> Result<Self, SidecarError> {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SidecarError> {
        let client_id = lookup("BW_CLIENTID");
        let client_secret = lookup("BW_CLIENTSECRET");
        let password = lookup("BW_PASSWORD");

        let missing: Vec<&str> = [
            ("BW_CLIENTID", &client_id),
            ("BW_CLIENTSECRET", &client_secret),
            ("BW_PASSWORD", &password),
        ]
        .iter()
        .filter(|(_, v)| v.is_none())
        .map(|(k, _)| *k)
        .collect();

        if !missing.is_empty() {
            return Err(SidecarError::Configuration(missing.join(", ")));
        }

        Ok(Self {
            host: lookup("BW_HOST"),
            client_id: client_id.unwrap(),
            client_secret: client_secret.unwrap(),
            password: password.unwrap(),
            serve_port: parse_or("BW_SERVE_PORT", lookup("BW_SERVE_PORT"), 8088),
            proxy_port: parse_or("BW_PROXY_PORT", lookup("BW_PROXY_PORT"), 8087),
            proxy_host: lookup("BW_PROXY_HOST").unwrap_or_else(|| "localhost".to_string()),
            disable_sync: lookup("BW_DISABLE_SYNC").as_deref() == Some("true"),
            sync_interval: duration_or(
                "BW_SYNC_INTERVAL",
                lookup("BW_SYNC_INTERVAL"),
                Duration::from_secs(120),
            ),
            retry: RetryPolicy {
                max_attempts: parse_or("BW_SERVE_WAIT_RETRIES", lookup("BW_SERVE_WAIT_RETRIES"), 30),
                interval: duration_or(
                    "BW_SERVE_WAIT_INTERVAL",
                    lookup("BW_SERVE_WAIT_INTERVAL"),
                    Duration::from_secs(1),
                ),
            },
        })
    }
}

/// Parse an optional env value, falling back to `default` with a warning on
/// malformed input. Never fatal.
fn parse_or<T: std::str::FromStr + std::fmt::Display + Copy>(
    key: &str,
    raw: Option<String>,
    default: T,
) -> T {
    match raw {
        None => default,
        Some(s) => s.parse().unwrap_or_else(|_| {
            warn!("Invalid value for {} '{}', using default of {}", key, s, default);
            default
        }),
    }
}

/// Parse a humantime duration string (e.g. `2m`, `30s`), falling back to
/// `default` with a warning on malformed input. Never fatal.
fn duration_or(key: &str, raw: Option<String>, default: Duration) -> Duration {
    match raw {
        None => default,
        Some(s) => match humantime::parse_duration(&s) {
            Ok(d) => d,
            Err(e) => {
                warn!(
                    "Invalid duration for {} '{}', using default of {}: {}",
                    key,
                    s,
                    humantime::format_duration(default),
                    e
                );
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("BW_CLIENTID", "user.abc"),
            ("BW_CLIENTSECRET", "secret"),
            ("BW_PASSWORD", "hunter2"),
        ]
    }

    #[test]
    fn defaults_with_only_required_secrets() {
        let config = Config::from_lookup(env(&required())).unwrap();
        assert_eq!(config.serve_port, 8088);
        assert_eq!(config.proxy_port, 8087);
        assert_eq!(config.proxy_host, "localhost");
        assert!(!config.disable_sync);
        assert_eq!(config.sync_interval, Duration::from_secs(120));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.host, None);
    }

    #[test]
    fn missing_secrets_are_listed() {
        let err = Config::from_lookup(env(&[("BW_CLIENTID", "user.abc")])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("BW_CLIENTSECRET"), "{msg}");
        assert!(msg.contains("BW_PASSWORD"), "{msg}");
        assert!(!msg.contains("BW_CLIENTID,"), "{msg}");
    }

    #[test]
    fn overrides_are_applied() {
        let mut vars = required();
        vars.extend([
            ("BW_HOST", "https://vault.example.com"),
            ("BW_SERVE_PORT", "9001"),
            ("BW_PROXY_PORT", "9000"),
            ("BW_PROXY_HOST", "sidecar.internal"),
            ("BW_DISABLE_SYNC", "true"),
            ("BW_SYNC_INTERVAL", "5m"),
            ("BW_SERVE_WAIT_RETRIES", "3"),
            ("BW_SERVE_WAIT_INTERVAL", "250ms"),
        ]);
        let config = Config::from_lookup(env(&vars)).unwrap();
        assert_eq!(config.host.as_deref(), Some("https://vault.example.com"));
        assert_eq!(config.serve_port, 9001);
        assert_eq!(config.proxy_port, 9000);
        assert_eq!(config.proxy_host, "sidecar.internal");
        assert!(config.disable_sync);
        assert_eq!(config.sync_interval, Duration::from_secs(300));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.interval, Duration::from_millis(250));
    }

    #[test]
    fn invalid_sync_interval_falls_back_to_two_minutes() {
        let mut vars = required();
        vars.push(("BW_SYNC_INTERVAL", "not-a-duration"));
        let config = Config::from_lookup(env(&vars)).unwrap();
        assert_eq!(config.sync_interval, Duration::from_secs(120));
    }

    #[test]
    fn invalid_port_falls_back_to_default() {
        let mut vars = required();
        vars.push(("BW_SERVE_PORT", "eighty-eighty-eight"));
        let config = Config::from_lookup(env(&vars)).unwrap();
        assert_eq!(config.serve_port, 8088);
    }
}
