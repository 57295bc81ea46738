//! Snapshot building - grouping a directory's files into node bundles

use chainview::error::SkipReason;
use chainview::snapshot::{SnapshotBuilder, ViewerMode};
use chainview::types::{MempoolEntry, RawFile};
use serde_json::json;

fn paired() -> SnapshotBuilder {
    SnapshotBuilder::for_mode(ViewerMode::Paired)
}

fn rich() -> SnapshotBuilder {
    SnapshotBuilder::for_mode(ViewerMode::Rich)
}

#[test]
fn paired_files_merge_into_one_bundle() {
    let files = vec![
        RawFile::new("1_mainBlockchain.json", json!([{"index": 0, "hash": "h0", "previousHash": "0"}])),
        RawFile::new("1_mainMempool.json", json!([])),
    ];
    let snap = paired().build(&files);

    assert_eq!(snap.len(), 1);
    let bundle = snap.bundle("1").expect("node 1");
    assert_eq!(bundle.blockchain.as_ref().map(Vec::len), Some(1));
    assert_eq!(bundle.mempool.as_ref().map(Vec::len), Some(0));
    assert!(bundle.complete_games.is_none());
}

#[test]
fn paired_mode_drops_half_pairs() {
    let files = vec![RawFile::new("2_mainBlockchain.json", json!([{"index": 0}]))];
    let snap = paired().build(&files);

    assert!(snap.is_empty(), "a chain without its mempool is not shown");
    assert_eq!(
        ViewerMode::Paired.no_data_message(),
        "No valid blockchain/mempool file pairs found in the selected directory."
    );
}

#[test]
fn rich_mode_keeps_any_single_file() {
    let files = vec![
        RawFile::new("1_blockchain.json", json!([{"index": 0}])),
        RawFile::new("2_mempool.json", json!(["Game ID: 1"])),
        RawFile::new("alice_completeGames.json", json!([[{"index": 0}], [{"index": 0}, {"index": 1}]])),
    ];
    let snap = rich().build(&files);

    assert_eq!(snap.len(), 3);
    assert!(snap.bundle("1").unwrap().blockchain.is_some());
    assert!(snap.bundle("2").unwrap().mempool.is_some());
    let games = snap.bundle("alice").unwrap().complete_games.as_ref().unwrap();
    assert_eq!(games.len(), 2);
    assert_eq!(games[1].len(), 2);
}

#[test]
fn build_is_idempotent() {
    let files = vec![
        RawFile::new("3_blockchain.json", json!([{"index": 0}, {"index": 1}])),
        RawFile::new("3_mempool.json", json!([{"id": 1, "sender": "a", "recipient": "b", "data": "x"}])),
    ];
    assert_eq!(rich().build(&files), rich().build(&files));
}

#[test]
fn later_file_wins_for_same_role() {
    let files = vec![
        RawFile::new("1_blockchain.json", json!([{"index": 0}])),
        RawFile::new("01_blockchain.json", json!([{"index": 0}, {"index": 1}])),
        RawFile::new("1_blockchain.json", json!([{"index": 0}, {"index": 1}, {"index": 2}])),
    ];
    let snap = rich().build(&files);

    // "01" is its own node id; the second "1_" file replaces the first
    assert_eq!(snap.bundle("1").unwrap().blockchain.as_ref().unwrap().len(), 3);
    assert_eq!(snap.bundle("01").unwrap().blockchain.as_ref().unwrap().len(), 2);
}

#[test]
fn wrong_shape_skips_only_that_file() {
    let files = vec![
        RawFile::new("1_blockchain.json", json!({"not": "a list"})),
        RawFile::new("1_mempool.json", json!([])),
        RawFile::new("2_blockchain.json", json!([{"index": 5}])),
    ];
    let snap = rich().build(&files);

    assert_eq!(snap.len(), 2);
    assert!(snap.bundle("1").unwrap().blockchain.is_none());
    assert!(snap.bundle("1").unwrap().mempool.is_some());
    assert_eq!(snap.skipped().len(), 1);
    assert_eq!(snap.skipped()[0].name, "1_blockchain.json");
    assert!(matches!(snap.skipped()[0].reason, SkipReason::Shape(_)));
}

#[test]
fn unrelated_files_are_ignored() {
    let files = vec![
        RawFile::new("notes.json", json!({})),
        RawFile::new("1_blockchain.json.tmp", json!([])),
        RawFile::new("_blockchain.json", json!([])),
    ];
    let snap = rich().build(&files);
    assert!(snap.is_empty());
    assert!(snap.skipped().is_empty());
}

#[test]
fn mempool_entry_shapes() {
    let files = vec![RawFile::new(
        "1_mempool.json",
        json!([
            "Game ID: 4\nPlayers: a b",
            {"id": 7, "sender": "s", "receiver": "r", "amount": "e2e4"},
            {"gameId": 3, "players": ["a", "b"]}
        ]),
    )];
    let snap = rich().build(&files);
    let pool = snap.bundle("1").unwrap().mempool.as_ref().unwrap();

    assert!(matches!(&pool[0], MempoolEntry::Text(t) if t.starts_with("Game ID")));
    match &pool[1] {
        MempoolEntry::Move(m) => {
            assert_eq!(m.receiver, "r");
            assert_eq!(m.payload(), "e2e4");
            assert_eq!(m.id_text(), "7");
        }
        other => panic!("expected a move, got {other:?}"),
    }
    assert!(matches!(&pool[2], MempoolEntry::Raw(_)));
}

#[test]
fn nodes_are_listed_numerically() {
    let files: Vec<RawFile> = ["10", "2", "-1", "bob", "1"]
        .iter()
        .map(|id| RawFile::new(format!("{id}_mempool.json"), json!([])))
        .collect();
    let snap = rich().build(&files);
    let order: Vec<&str> = snap.ordered().iter().map(|b| b.node_id.as_str()).collect();
    assert_eq!(order, vec!["-1", "1", "2", "10", "bob"]);
}

#[test]
fn loose_blocks_and_moves_keep_the_node() {
    let files = vec![
        RawFile::new(
            "4_mainBlockchain.json",
            json!([{"hash": "genesis"}, {"index": 1, "moves": [{"recipient": "r", "data": "e4"}]}]),
        ),
        RawFile::new("4_mainMempool.json", json!([{"receiver": "r", "amount": 1}])),
    ];
    let snap = paired().build(&files);

    assert!(snap.skipped().is_empty());
    let bundle = snap.bundle("4").expect("node 4 survives");
    let chain = bundle.blockchain.as_ref().unwrap();
    assert_eq!(chain[0].index, 0);
    assert_eq!(chain[1].moves[0].receiver, "r");
    assert!(matches!(&bundle.mempool.as_ref().unwrap()[0], MempoolEntry::Move(m) if m.sender.is_empty()));
}
