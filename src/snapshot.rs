//! Snapshot builder
//!
//! Groups one refresh cycle's files by node id and merges them into
//! per-node bundles. Bundles are rebuilt from scratch on every cycle.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::classify::{Classifier, FileRole, NodeIdGrammar, RoleMarkers};
use crate::error::SkipReason;
use crate::types::{NodeBundle, NodeId, RawFile};

/// Which directory layout the viewer reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerMode {
    /// `{id}_mainBlockchain.json` + `{id}_mainMempool.json`; both required per node
    Paired,
    /// `{id}_blockchain.json`, `{id}_mempool.json`, `{id}_completeGames.json`; any one suffices
    Rich,
}

impl ViewerMode {
    pub fn default_markers(&self) -> RoleMarkers {
        match self {
            ViewerMode::Paired => RoleMarkers::paired(),
            ViewerMode::Rich => RoleMarkers::rich(),
        }
    }

    pub fn default_grammar(&self) -> NodeIdGrammar {
        match self {
            ViewerMode::Paired => NodeIdGrammar::Integer,
            ViewerMode::Rich => NodeIdGrammar::IntegerOrToken,
        }
    }

    fn keeps(&self, bundle: &NodeBundle) -> bool {
        match self {
            ViewerMode::Paired => bundle.has_pair(),
            ViewerMode::Rich => bundle.has_any(),
        }
    }

    /// Banner text when a cycle finds nothing usable.
    pub fn no_data_message(&self) -> &'static str {
        match self {
            ViewerMode::Paired => {
                "No valid blockchain/mempool file pairs found in the selected directory."
            }
            ViewerMode::Rich => {
                "No valid blockchain, mempool, or completeGames files found in the selected directory."
            }
        }
    }
}

impl std::str::FromStr for ViewerMode {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "paired" | "main" => Ok(ViewerMode::Paired),
            "rich" | "game" => Ok(ViewerMode::Rich),
            _ => Err(anyhow::anyhow!("Invalid mode '{s}'. Valid options: paired, rich")),
        }
    }
}

impl std::fmt::Display for ViewerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewerMode::Paired => write!(f, "paired"),
            ViewerMode::Rich => write!(f, "rich"),
        }
    }
}

/// A file left out of the snapshot, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub name: String,
    pub reason: SkipReason,
}

/// Node bundles of one refresh cycle, keyed by node id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    bundles: BTreeMap<NodeId, NodeBundle>,
    skipped: Vec<SkippedFile>,
}

impl Snapshot {
    pub fn bundle(&self, node_id: &str) -> Option<&NodeBundle> {
        self.bundles.get(node_id)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.bundles.contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// The NoData condition: nothing survived classification and filtering.
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn bundles(&self) -> &BTreeMap<NodeId, NodeBundle> {
        &self.bundles
    }

    /// Bundles in display order (numeric ids numerically, then the rest lexically).
    pub fn ordered(&self) -> Vec<&NodeBundle> {
        let mut out: Vec<&NodeBundle> = self.bundles.values().collect();
        out.sort_by(|a, b| display_order(&a.node_id, &b.node_id));
        out
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    pub(crate) fn with_skipped(mut self, mut skipped: Vec<SkippedFile>) -> Self {
        skipped.append(&mut self.skipped);
        self.skipped = skipped;
        self
    }
}

fn display_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotBuilder {
    mode: ViewerMode,
    classifier: Classifier,
}

impl SnapshotBuilder {
    pub fn new(mode: ViewerMode, classifier: Classifier) -> Self {
        Self { mode, classifier }
    }

    /// Builder with the mode's default markers and node id grammar.
    pub fn for_mode(mode: ViewerMode) -> Self {
        Self::new(
            mode,
            Classifier::new(mode.default_grammar(), mode.default_markers()),
        )
    }

    pub fn mode(&self) -> ViewerMode {
        self.mode
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Merge a batch of parsed files into node bundles.
    ///
    /// Files are applied in the order given; when two files map to the same
    /// (node, role) the later one wins. A file whose JSON does not have the
    /// shape its role needs is skipped without affecting the others.
    pub fn build(&self, files: &[RawFile]) -> Snapshot {
        let mut bundles: BTreeMap<NodeId, NodeBundle> = BTreeMap::new();
        let mut skipped = Vec::new();

        for file in files {
            let Some(class) = self.classifier.classify(&file.name) else {
                log::debug!("ignoring {}", file.name);
                continue;
            };

            let bundle = bundles
                .entry(class.node_id.clone())
                .or_insert_with(|| NodeBundle::new(class.node_id.clone()));

            let applied = match class.role {
                FileRole::Chain => decode(&file.content).map(|v| bundle.blockchain = Some(v)),
                FileRole::Mempool => decode(&file.content).map(|v| bundle.mempool = Some(v)),
                FileRole::CompleteGames => {
                    decode(&file.content).map(|v| bundle.complete_games = Some(v))
                }
            };

            if let Err(reason) = applied {
                log::warn!("skipping {}: {}", file.name, reason);
                skipped.push(SkippedFile {
                    name: file.name.clone(),
                    reason,
                });
            }
        }

        bundles.retain(|id, bundle| {
            let keep = self.mode.keeps(bundle);
            if !keep {
                log::debug!("dropping incomplete bundle for node {id}");
            }
            keep
        });

        Snapshot { bundles, skipped }
    }
}

fn decode<T: DeserializeOwned>(content: &Value) -> Result<T, SkipReason> {
    T::deserialize(content).map_err(|e| SkipReason::Shape(e.to_string()))
}
