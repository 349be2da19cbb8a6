//! Device automation drivers
//!
//! Thin wrappers over the adb binary and the WebDriverAgent HTTP API. The
//! capture and control layers delegate to these; everything here is plain
//! request/response plumbing with no game knowledge.

pub mod adb;
pub mod wda;

pub use adb::AdbConnection;
pub use wda::WdaClient;

/// Errors from the underlying device drivers.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} exited with {status}: {stderr}")]
    CommandFailed {
        tool: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("unexpected driver output: {0}")]
    UnexpectedOutput(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("device not connected")]
    NotConnected,
    #[error("failed to decode screenshot: {0}")]
    Decode(String),
}
