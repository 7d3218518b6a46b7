use crate::config::Config;
use crate::error::SidecarError;
use crate::exec::CommandRunner;
use tracing::info;

/// Run the full authentication sequence and return the session token.
///
/// Order is fixed: optional `bw config server <host>`, then
/// `bw login --apikey`, then `bw unlock --passwordenv BW_PASSWORD --raw`.
/// The trimmed unlock output is the session token. There are no retries —
/// the first non-zero exit aborts startup, since a bad credential cannot
/// resolve itself.
pub async fn login_and_get_session(
    config: &Config,
    runner: &dyn CommandRunner,
) -> Result<String, SidecarError> {
    info!("Executing Bitwarden login...");

    if let Some(host) = &config.host {
        info!("Configuring bw to use the supplied host {}", host);
        let out = run_bw(
            runner,
            &["config", "server", host.as_str()],
            &[],
            "bw config server failed",
        )
        .await?;
        if !out.success {
            return Err(SidecarError::command("bw config server failed", out.combined));
        }
    }

    // API-key login; bw reads the credentials from the environment.
    let login_env = [
        ("BW_CLIENTID", config.client_id.as_str()),
        ("BW_CLIENTSECRET", config.client_secret.as_str()),
    ];
    let out = run_bw(runner, &["login", "--apikey"], &login_env, "bw login failed").await?;
    if !out.success {
        return Err(SidecarError::command("bw login failed", out.combined));
    }
    info!("Logged in successfully");

    info!("Unlocking vault...");
    let unlock_env = [("BW_PASSWORD", config.password.as_str())];
    let out = run_bw(
        runner,
        &["unlock", "--passwordenv", "BW_PASSWORD", "--raw"],
        &unlock_env,
        "bw unlock failed",
    )
    .await?;
    if !out.success {
        return Err(SidecarError::command("bw unlock failed", out.combined));
    }

    Ok(out.trimmed().to_string())
}

async fn run_bw(
    runner: &dyn CommandRunner,
    args: &[&str],
    envs: &[(&str, &str)],
    context: &str,
) -> Result<crate::exec::CommandOutput, SidecarError> {
    runner
        .run("bw", args, envs)
        .await
        .map_err(|e| SidecarError::command(context, e.to_string()))
}
