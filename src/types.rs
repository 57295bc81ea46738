use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of a simulated node, taken from the filename prefix.
pub type NodeId = String;

/// One file read from the snapshot directory during a refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFile {
    pub name: String,
    pub content: Value,
}

impl RawFile {
    pub fn new(name: impl Into<String>, content: Value) -> Self {
        Self { name: name.into(), content }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub previous_hash: String,
    /// Unix seconds
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub nonce: i64,
    /// Game text blobs (main chain writer)
    #[serde(default)]
    pub games: Vec<String>,
    /// Move objects (per-game chain writer)
    #[serde(default)]
    pub moves: Vec<MoveEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<Value>,
}

impl Block {
    /// Game id rendered as text, whether the writer stored a number or a string.
    pub fn game_id_text(&self) -> Option<String> {
        match self.game_id.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default)]
    pub sender: String,
    #[serde(default, alias = "recipient")]
    pub receiver: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Value>,
}

impl MoveEntry {
    /// Move payload: `data` when present, otherwise `amount`.
    pub fn payload(&self) -> String {
        self.data
            .as_ref()
            .or(self.amount.as_ref())
            .map(value_text)
            .unwrap_or_default()
    }

    pub fn id_text(&self) -> String {
        self.id.as_ref().map(value_text).unwrap_or_default()
    }
}

/// Pending entry as written by either writer: a game text blob, a move object,
/// or anything else we only show raw.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MempoolEntry {
    Text(String),
    Move(MoveEntry),
    Raw(Value),
}

/// Keys that mark an object as a move.
const MOVE_KEYS: [&str; 3] = ["sender", "receiver", "recipient"];

impl From<Value> for MempoolEntry {
    fn from(value: Value) -> Self {
        let looks_like_move = value
            .as_object()
            .is_some_and(|map| MOVE_KEYS.iter().any(|k| map.contains_key(*k)));
        match value {
            Value::String(text) => MempoolEntry::Text(text),
            _ if looks_like_move => match MoveEntry::deserialize(&value) {
                Ok(mv) => MempoolEntry::Move(mv),
                Err(_) => MempoolEntry::Raw(value),
            },
            other => MempoolEntry::Raw(other),
        }
    }
}

impl<'de> Deserialize<'de> for MempoolEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(MempoolEntry::from)
    }
}

/// Merged per-node view built from one refresh cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeBundle {
    pub node_id: NodeId,
    pub blockchain: Option<Vec<Block>>,
    pub mempool: Option<Vec<MempoolEntry>>,
    pub complete_games: Option<Vec<Vec<Block>>>,
}

impl NodeBundle {
    pub fn new(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            blockchain: None,
            mempool: None,
            complete_games: None,
        }
    }

    pub fn has_any(&self) -> bool {
        self.blockchain.is_some() || self.mempool.is_some() || self.complete_games.is_some()
    }

    pub fn has_pair(&self) -> bool {
        self.blockchain.is_some() && self.mempool.is_some()
    }

    /// Resolve a chain reference against this bundle's current content.
    pub fn chain(&self, chain: ChainRef) -> Option<ChainView<'_>> {
        match chain {
            ChainRef::Blockchain => self.blockchain.as_deref().map(ChainView::Blocks),
            ChainRef::Mempool => self.mempool.as_deref().map(ChainView::Mempool),
            ChainRef::CompleteGame(i) => self
                .complete_games
                .as_ref()
                .and_then(|games| games.get(i))
                .map(|g| ChainView::Blocks(g.as_slice())),
        }
    }

    /// Every chain this bundle can show, in display order.
    pub fn chain_refs(&self) -> Vec<ChainRef> {
        let mut refs = Vec::new();
        if self.blockchain.is_some() {
            refs.push(ChainRef::Blockchain);
        }
        if self.mempool.is_some() {
            refs.push(ChainRef::Mempool);
        }
        if let Some(games) = &self.complete_games {
            refs.extend((0..games.len()).map(ChainRef::CompleteGame));
        }
        refs
    }
}

/// Which chain of a node is selected. Complete games are addressed by position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChainRef {
    Blockchain,
    Mempool,
    CompleteGame(usize),
}

impl ChainRef {
    /// Mempools have no block concept.
    pub fn has_blocks(&self) -> bool {
        !matches!(self, ChainRef::Mempool)
    }
}

impl fmt::Display for ChainRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainRef::Blockchain => write!(f, "Blockchain"),
            ChainRef::Mempool => write!(f, "Mempool"),
            ChainRef::CompleteGame(i) => write!(f, "Complete Game {}", i + 1),
        }
    }
}

/// Borrowed content of a resolved chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChainView<'a> {
    Blocks(&'a [Block]),
    Mempool(&'a [MempoolEntry]),
}

impl<'a> ChainView<'a> {
    pub fn len(&self) -> usize {
        match self {
            ChainView::Blocks(b) => b.len(),
            ChainView::Mempool(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn blocks(&self) -> Option<&'a [Block]> {
        match self {
            ChainView::Blocks(b) => Some(b),
            ChainView::Mempool(_) => None,
        }
    }

    /// Find a block by its `index` field (never by array position).
    pub fn find_block(&self, index: i64) -> Option<&'a Block> {
        self.blocks()?.iter().find(|b| b.index == index)
    }
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A refresh cycle started reading the directory
    RefreshStarted,
    /// A refresh cycle finished; applied against the selection current at landing time
    Refreshed(crate::scheduler::RefreshOutcome),
    /// The watched directory changed on disk
    DirectoryChanged,
    Quit,
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_without_index_still_decodes() {
        let blocks: Vec<Block> =
            serde_json::from_value(json!([{"hash": "h0"}, {"index": 1, "moves": [{"receiver": "r", "data": "x"}]}]))
                .unwrap();
        assert_eq!(blocks[0].index, 0);
        assert_eq!(blocks[1].moves[0].sender, "");
        assert_eq!(blocks[1].moves[0].payload(), "x");
    }

    #[test]
    fn test_mempool_entry_kinds() {
        let entries: Vec<MempoolEntry> = serde_json::from_value(json!([
            "Game ID: 1",
            {"recipient": "r", "amount": 5},
            {"sender": 7},
            {"gameId": 2}
        ]))
        .unwrap();
        assert!(matches!(&entries[0], MempoolEntry::Text(_)));
        assert!(matches!(&entries[1], MempoolEntry::Move(m) if m.receiver == "r" && m.sender.is_empty()));
        // sender of the wrong type falls back to raw instead of failing the file
        assert!(matches!(&entries[2], MempoolEntry::Raw(_)));
        assert!(matches!(&entries[3], MempoolEntry::Raw(_)));
    }
}
