use bw_sidecar::cli::{Cli, Commands, RunOpts};
use bw_sidecar::config::Config;
use bw_sidecar::exec::{CommandRunner, SystemRunner};
use bw_sidecar::proxy::{self, ProxyState};
use bw_sidecar::{logging, sync, vault};

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(opts) => run(opts).await,
        Commands::Version => println!("bw-sidecar {}", env!("CARGO_PKG_VERSION")),
    }
}

/// Startup is strictly ordered: credential acquisition, then the bw serve
/// launch, then readiness, and only then any traffic-serving task. Every
/// failure before the proxy starts is fatal.
async fn run(opts: RunOpts) {
    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => fatal(&format!("Configuration error: {e}")),
    };
    if let Some(port) = opts.serve_port {
        config.serve_port = port;
    }
    if let Some(port) = opts.proxy_port {
        config.proxy_port = port;
    }

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);

    // 1. Login, unlock, and obtain the session token.
    let session = match vault::auth::login_and_get_session(&config, runner.as_ref()).await {
        Ok(session) => session,
        Err(e) => fatal(&format!("Bitwarden login failed: {e}")),
    };

    // 2. Start 'bw serve' in the background; its exit kills the sidecar.
    vault::serve::spawn(config.serve_port, session.clone());

    // 3. Do not route any traffic until the vault reports unlocked.
    if let Err(e) = vault::readiness::wait_for_unlocked(config.serve_port, &config.retry).await {
        fatal(&format!("Bitwarden serve API failed to initialize: {e}"));
    }
    info!("Bitwarden serve API is ready and unlocked. Authentication successful.");

    // 4. Start the proxy server on the public port.
    let state = ProxyState::new(runner, session, config.serve_port);
    let app = proxy::build_routes(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.proxy_port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => fatal(&format!("Proxy server failed to bind {addr}: {e}")),
    };
    info!("Starting proxy server on port {}", config.proxy_port);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            fatal(&format!("Proxy server failed: {e}"));
        }
    });

    // 5. Start the periodic sync unless disabled.
    if config.disable_sync {
        info!("Automatic sync is disabled.");
    } else {
        let host = config.proxy_host.clone();
        let port = config.proxy_port;
        let interval = config.sync_interval;
        tokio::spawn(async move {
            sync::run_periodic_sync(&host, port, interval).await;
        });
    }

    // Park forever; fatal paths above are the only way out.
    std::future::pending::<()>().await
}

fn fatal(msg: &str) -> ! {
    eprintln!("FATAL: {msg}");
    std::process::exit(1);
}
