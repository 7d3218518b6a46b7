use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bw-sidecar", version, about = "Bitwarden CLI sidecar proxy")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Authenticate, start bw serve, and run the proxy.
    Run(RunOpts),
    /// Print the sidecar version.
    Version,
}

#[derive(clap::Args)]
pub struct RunOpts {
    /// Internal port for the bw serve process (overrides BW_SERVE_PORT).
    #[arg(long)]
    pub serve_port: Option<u16>,
    /// Public port for the proxy server (overrides BW_PROXY_PORT).
    #[arg(long)]
    pub proxy_port: Option<u16>,
}
