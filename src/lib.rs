//! Bitwarden CLI sidecar.
//!
//! Orchestrates `bw login` / `bw unlock`, supervises a `bw serve` child
//! process, gates traffic on the serve API reporting an unlocked vault, and
//! fronts it with a reverse proxy that adds `/healthz`, `/sync`, and a
//! periodic background sync.

pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod proxy;
pub mod sync;
pub mod vault;

pub use config::{Config, RetryPolicy};
pub use error::SidecarError;
