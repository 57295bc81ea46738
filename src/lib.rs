//! chainview - live viewer for node snapshot directories
//!
//! Simulated nodes periodically dump their blockchain, mempool and completed
//! games as JSON files into a shared directory. chainview polls that
//! directory, groups the files into per-node bundles, and keeps the user's
//! node / chain / block selection valid as the files change underneath it.
//!
//! ## Layout
//!
//! - [`classify`] maps filenames to a node id and a file role
//! - [`snapshot`] merges one cycle's files into node bundles
//! - [`game_record`] parses free-text game records
//! - [`reconcile`] carries the selection across snapshots
//! - [`provider`] and [`scheduler`] read the directory on a timer
//! - [`app`], [`ui`] and [`theme`] are the terminal front end
//!
//! The terminal binary and the file watcher need the `native` feature
//! (enabled by default).

// Core modules
pub mod classify;
pub mod error;
pub mod game_record;
pub mod reconcile;
pub mod snapshot;
pub mod types;
pub mod util_text;

// Directory reading and refresh timing
pub mod provider;
pub mod scheduler;

#[cfg(feature = "native")]
pub mod watcher;

pub mod config;

// Front end
pub mod app;
pub mod theme;
pub mod ui;

// Re-export commonly used types
pub use app::App;
pub use classify::{Classifier, FileRole, NodeIdGrammar, RoleMarkers};
pub use config::Config;
pub use error::{ProviderError, RefreshError, SelectionError, SkipReason};
pub use reconcile::{reconcile, Selection};
pub use scheduler::{RefreshEngine, RefreshOutcome, RefreshScheduler};
pub use snapshot::{Snapshot, SnapshotBuilder, ViewerMode};
pub use types::{AppEvent, Block, ChainRef, MempoolEntry, MoveEntry, NodeBundle, RawFile};
