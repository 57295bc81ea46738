//! Directory watcher
//!
//! Native only. Turns file-system notifications on the snapshot directory into
//! [`AppEvent::DirectoryChanged`], which the binary answers with a manual
//! refresh trigger.

use anyhow::{Context, Result};
use notify::{Error as NotifyError, Event, EventKind, RecursiveMode, Watcher};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{sleep, Duration};

use crate::types::AppEvent;

const DEBOUNCE: Duration = Duration::from_millis(100);

/// Start watching `dir` (non-recursive) in a background task.
pub fn start_directory_watcher(dir: PathBuf, tx: UnboundedSender<AppEvent>) -> Result<()> {
    let (notify_tx, notify_rx) = tokio::sync::mpsc::unbounded_channel();

    let mut watcher = notify::recommended_watcher(move |res: Result<Event, NotifyError>| {
        if let Ok(event) = res {
            let _ = notify_tx.send(event);
        }
    })
    .context("creating directory watcher")?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("watching {}", dir.display()))?;
    log::info!("👀 Watching {} for changes", dir.display());

    tokio::spawn(async move {
        // the watcher stops when dropped, so the task keeps it alive
        let _watcher = watcher;
        forward_changes(notify_rx, tx).await;
    });
    Ok(())
}

async fn forward_changes(
    mut notify_rx: tokio::sync::mpsc::UnboundedReceiver<Event>,
    tx: UnboundedSender<AppEvent>,
) {
    while let Some(event) = notify_rx.recv().await {
        if !is_relevant(&event) {
            continue;
        }
        // Let the writer finish, then fold the burst into one change
        sleep(DEBOUNCE).await;
        while notify_rx.try_recv().is_ok() {}

        log::debug!("📁 Directory changed: {:?}", event.paths);
        if tx.send(AppEvent::DirectoryChanged).is_err() {
            break;
        }
    }
}

/// Creates, writes and removes of `.json` files.
fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|p| p.extension().is_some_and(|ext| ext == "json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_json_changes_are_relevant() {
        assert!(is_relevant(&event(EventKind::Create(CreateKind::File), "/d/1_blockchain.json")));
        assert!(is_relevant(&event(EventKind::Modify(ModifyKind::Any), "/d/1_mempool.json")));
    }

    #[test]
    fn test_other_changes_are_ignored() {
        assert!(!is_relevant(&event(EventKind::Create(CreateKind::File), "/d/notes.txt")));
        assert!(!is_relevant(&event(EventKind::Access(AccessKind::Any), "/d/1_blockchain.json")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_folds_into_one_change() {
        let (notify_tx, notify_rx) = tokio::sync::mpsc::unbounded_channel();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        for _ in 0..5 {
            notify_tx
                .send(event(EventKind::Modify(ModifyKind::Any), "/d/1_blockchain.json"))
                .unwrap();
        }
        drop(notify_tx);
        forward_changes(notify_rx, tx).await;

        assert!(matches!(rx.recv().await, Some(AppEvent::DirectoryChanged)));
        assert!(rx.recv().await.is_none());
    }
}
