//! Bitwarden CLI orchestration: authentication, the supervised `bw serve`
//! child, and the readiness poll that gates proxy startup.

pub mod auth;
pub mod readiness;
pub mod serve;
