//! Game record parser
//!
//! Game blobs are the free-text form a node writes for a game:
//!
//! ```text
//! Game ID: 7
//! Players: <key> <key>
//! Winner ID: -----BEGIN PUBLIC KEY-----...-----END PUBLIC KEY-----
//! Game Complete: Yes
//! Chain Size: 4
//! Moves:
//!   Sender: <pem>, Receiver: <pem>, Move: e2e4
//! ```
//!
//! Records of games still in progress are partially populated, so every field
//! is optional in the text. Parsing never fails; a missing field keeps its
//! zero value.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

const MOVES_MARKER: &str = "Moves:";
const PLAYERS_MARKER: &str = "Players:";

/// Labels that end the free-form players section.
const SECTION_LABELS: &[&str] = &["Winner ID:", "Game Complete:", "Chain Size:", MOVES_MARKER];

static GAME_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Game ID:\s*(\d+)").expect("static pattern"));
static WINNER_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Winner ID:\s*(-----BEGIN PUBLIC KEY-----.+?-----END PUBLIC KEY-----)")
        .expect("static pattern")
});
static GAME_COMPLETE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Game Complete:\s*(Yes|No)").expect("static pattern"));
static CHAIN_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Chain Size:\s*(\d+)").expect("static pattern"));
static MOVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?s)\s*Sender:\s*(-----BEGIN PUBLIC KEY-----.+?-----END PUBLIC KEY-----)",
        r"\s*,\s*Receiver:\s*(-----BEGIN PUBLIC KEY-----.+?-----END PUBLIC KEY-----)",
        r"\s*,\s*Move:\s*(\S+)",
    ))
    .expect("static pattern")
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub game_id: String,
    pub players: Vec<String>,
    /// Empty when no PEM block follows `Winner ID:`
    pub winner_id: String,
    pub game_complete: bool,
    pub chain_size: String,
    pub moves: Vec<GameMove>,
}

impl GameRecord {
    pub fn winner(&self) -> Option<&str> {
        (!self.winner_id.is_empty()).then_some(self.winner_id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameMove {
    pub sender: String,
    pub receiver: String,
    #[serde(rename = "move")]
    pub mv: String,
}

/// Extract a structured record from a game blob.
pub fn parse(text: &str) -> GameRecord {
    GameRecord {
        game_id: capture(&GAME_ID, text).unwrap_or_default(),
        players: players(text),
        winner_id: capture(&WINNER_ID, text)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        game_complete: capture(&GAME_COMPLETE, text).is_some_and(|s| s == "Yes"),
        chain_size: capture(&CHAIN_SIZE, text).unwrap_or_default(),
        moves: moves(text),
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn players(text: &str) -> Vec<String> {
    let Some(start) = text.find(PLAYERS_MARKER) else {
        return Vec::new();
    };
    let rest = &text[start + PLAYERS_MARKER.len()..];
    let end = SECTION_LABELS
        .iter()
        .filter_map(|label| rest.find(label))
        .min()
        .unwrap_or(rest.len());
    rest[..end].split_whitespace().map(str::to_string).collect()
}

fn moves(text: &str) -> Vec<GameMove> {
    // Only the text after the first marker, so keys elsewhere can't pose as moves
    let Some(start) = text.find(MOVES_MARKER) else {
        return Vec::new();
    };
    let section = &text[start + MOVES_MARKER.len()..];
    MOVE.captures_iter(section)
        .map(|c| GameMove {
            sender: c[1].trim().to_string(),
            receiver: c[2].trim().to_string(),
            mv: c[3].trim().to_string(),
        })
        .collect()
}
