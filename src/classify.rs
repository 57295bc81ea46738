//! Filename classifier
//!
//! Maps a snapshot filename such as `3_mainBlockchain.json` to the node it
//! belongs to and the role the file plays for that node.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::types::NodeId;

static SIGNED_INTEGER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?\d+)_").expect("static pattern"));
static TOKEN_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^_]+)_").expect("static pattern"));

/// How the node id is read off the front of a filename.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeIdGrammar {
    /// `-12_...` -> `-12`
    Integer,
    /// `alice_...` -> `alice`
    Token,
    /// Integer form first, token form as fallback
    IntegerOrToken,
}

impl NodeIdGrammar {
    pub fn extract(&self, filename: &str) -> Option<NodeId> {
        let capture = |re: &Regex| {
            re.captures(filename)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        };
        match self {
            NodeIdGrammar::Integer => capture(&SIGNED_INTEGER_PREFIX),
            NodeIdGrammar::Token => capture(&TOKEN_PREFIX),
            NodeIdGrammar::IntegerOrToken => {
                capture(&SIGNED_INTEGER_PREFIX).or_else(|| capture(&TOKEN_PREFIX))
            }
        }
    }
}

impl std::str::FromStr for NodeIdGrammar {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "integer" | "int" => Ok(NodeIdGrammar::Integer),
            "token" => Ok(NodeIdGrammar::Token),
            "integer-or-token" | "int-or-token" => Ok(NodeIdGrammar::IntegerOrToken),
            _ => Err(anyhow::anyhow!(
                "Invalid node id grammar '{s}'. Valid options: integer, token, integer-or-token"
            )),
        }
    }
}

impl std::fmt::Display for NodeIdGrammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeIdGrammar::Integer => write!(f, "integer"),
            NodeIdGrammar::Token => write!(f, "token"),
            NodeIdGrammar::IntegerOrToken => write!(f, "integer-or-token"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileRole {
    Chain,
    Mempool,
    CompleteGames,
}

/// Substring markers that decide a file's role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMarkers {
    pub chain: String,
    pub mempool: String,
    /// Paired layouts carry no complete-games file
    pub complete_games: Option<String>,
}

impl RoleMarkers {
    pub fn paired() -> Self {
        Self {
            chain: "_mainBlockchain.json".into(),
            mempool: "_mainMempool.json".into(),
            complete_games: None,
        }
    }

    pub fn rich() -> Self {
        Self {
            chain: "blockchain.json".into(),
            mempool: "mempool.json".into(),
            complete_games: Some("completeGames.json".into()),
        }
    }

    /// First matching marker wins, checked in chain, mempool, complete-games order.
    pub fn role_of(&self, filename: &str) -> Option<FileRole> {
        if filename.contains(self.chain.as_str()) {
            Some(FileRole::Chain)
        } else if filename.contains(self.mempool.as_str()) {
            Some(FileRole::Mempool)
        } else if self
            .complete_games
            .as_deref()
            .is_some_and(|m| filename.contains(m))
        {
            Some(FileRole::CompleteGames)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub node_id: NodeId,
    pub role: FileRole,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classifier {
    pub grammar: NodeIdGrammar,
    pub markers: RoleMarkers,
}

impl Classifier {
    pub fn new(grammar: NodeIdGrammar, markers: RoleMarkers) -> Self {
        Self { grammar, markers }
    }

    /// `None` for anything that is not a `.json` file, carries no known marker,
    /// or has no node id prefix.
    pub fn classify(&self, filename: &str) -> Option<Classification> {
        if !filename.ends_with(".json") {
            return None;
        }
        let role = self.markers.role_of(filename)?;
        let node_id = self.grammar.extract(filename)?;
        Some(Classification { node_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paired() -> Classifier {
        Classifier::new(NodeIdGrammar::Integer, RoleMarkers::paired())
    }

    fn rich() -> Classifier {
        Classifier::new(NodeIdGrammar::IntegerOrToken, RoleMarkers::rich())
    }

    #[test]
    fn test_paired_files() {
        let c = paired();
        assert_eq!(
            c.classify("1_mainBlockchain.json"),
            Some(Classification { node_id: "1".into(), role: FileRole::Chain })
        );
        assert_eq!(
            c.classify("-4_mainMempool.json"),
            Some(Classification { node_id: "-4".into(), role: FileRole::Mempool })
        );
    }

    #[test]
    fn test_rich_files() {
        let c = rich();
        assert_eq!(
            c.classify("alice_blockchain.json"),
            Some(Classification { node_id: "alice".into(), role: FileRole::Chain })
        );
        assert_eq!(
            c.classify("7_completeGames.json").map(|x| x.role),
            Some(FileRole::CompleteGames)
        );
        assert_eq!(c.classify("7_mempool.json").map(|x| x.role), Some(FileRole::Mempool));
    }

    #[test]
    fn test_ignored_files() {
        let c = paired();
        assert_eq!(c.classify("1_mainBlockchain.json.bak"), None); // not .json
        assert_eq!(c.classify("logs.json"), None); // no marker
        assert_eq!(c.classify("node_mainBlockchain.json"), None); // not an integer id
        assert_eq!(c.classify("mainBlockchain.json"), None);
    }

    #[test]
    fn test_markers_are_case_sensitive() {
        // rich markers must not pick up the paired layout's files
        let c = rich();
        assert_eq!(c.classify("1_mainBlockchain.json"), None);
        assert_eq!(c.classify("1_mainMempool.json"), None);
    }

    #[test]
    fn test_grammar_precedence() {
        assert_eq!(NodeIdGrammar::Integer.extract("12_x.json").as_deref(), Some("12"));
        assert_eq!(NodeIdGrammar::Integer.extract("12abc_x.json"), None);
        assert_eq!(
            NodeIdGrammar::IntegerOrToken.extract("12abc_x.json").as_deref(),
            Some("12abc")
        );
        // first underscore ends the token
        assert_eq!(NodeIdGrammar::Token.extract("a_b_c.json").as_deref(), Some("a"));
        assert_eq!(NodeIdGrammar::Token.extract("_x.json"), None);
    }

    #[test]
    fn test_classify_is_pure() {
        let c = rich();
        let a = c.classify("3_blockchain.json");
        let b = c.classify("3_blockchain.json");
        assert_eq!(a, b);
    }

    #[test]
    fn test_grammar_parsing() {
        assert_eq!("integer".parse::<NodeIdGrammar>().unwrap(), NodeIdGrammar::Integer);
        assert_eq!("TOKEN".parse::<NodeIdGrammar>().unwrap(), NodeIdGrammar::Token);
        assert_eq!(
            "integer-or-token".parse::<NodeIdGrammar>().unwrap(),
            NodeIdGrammar::IntegerOrToken
        );
        assert!("regex".parse::<NodeIdGrammar>().is_err());
    }
}
