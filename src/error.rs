//! Error types for snapshot ingestion and selection handling.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the file-system provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The directory grant was refused or the directory vanished
    #[error("Access to {path} denied: {reason}")]
    AccessDenied { path: PathBuf, reason: String },

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    /// Listing the directory failed mid-session
    #[error("Error listing {path}: {reason}")]
    List { path: PathBuf, reason: String },

    /// Reading a single entry failed
    #[error("Error reading {name}: {reason}")]
    Read { name: String, reason: String },
}

impl ProviderError {
    pub fn access_denied(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::AccessDenied {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

/// A refresh cycle that could not produce any snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("Error accessing directory: {0}")]
    Access(#[from] ProviderError),
}

/// Why a single file was left out of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("read failed: {0}")]
    Read(String),

    /// Usually a file caught mid-write by the node process
    #[error("invalid JSON: {0}")]
    Json(String),

    /// Valid JSON, wrong shape for the file's role
    #[error("unexpected content: {0}")]
    Shape(String),
}

/// Selection events that refer to something not in the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("node {0} is not in the current snapshot")]
    UnknownNode(String),

    #[error("no node selected")]
    NoNodeSelected,

    #[error("node {node} has no {chain}")]
    MissingChain { node: String, chain: String },

    #[error("no chain selected")]
    NoChainSelected,

    #[error("{0} has no blocks")]
    NotABlockChain(String),

    #[error("block #{0} is not in the selected chain")]
    UnknownBlock(i64),
}
