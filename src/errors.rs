use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures while turning definition files into an index.
///
/// Missing folders, versions or files are not errors: they produce empty
/// index sections. Everything here is surfaced to whoever triggered the
/// rebuild.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed command definitions: {0}")]
    Definitions(#[from] serde_json::Error),
    #[error("malformed enum source: block `{name}` on line {line} has no closing `end`")]
    UnterminatedEnum { name: String, line: usize },
}

/// Failures of a request sent across the process boundary.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("request `{method}` timed out after {after:?}")]
    Timeout { method: &'static str, after: Duration },
    #[error("request `{method}` was cancelled")]
    Cancelled { method: &'static str },
    #[error("request `{method}` failed: {message}")]
    Remote {
        method: &'static str,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid server settings: {0}")]
    Invalid(#[from] serde_json::Error),
}
