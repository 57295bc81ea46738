use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

use crate::reconcile::{reconcile, Selection};
use crate::scheduler::RefreshOutcome;
use crate::snapshot::{Snapshot, ViewerMode};
use crate::theme::Theme;
use crate::types::{AppEvent, ChainRef, ChainView, NodeBundle};

const TOAST_TTL: Duration = Duration::from_secs(2);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pane {
    Nodes,
    Chains,
    Entries,
}

impl Pane {
    fn next(self) -> Self {
        match self {
            Pane::Nodes => Pane::Chains,
            Pane::Chains => Pane::Entries,
            Pane::Entries => Pane::Nodes,
        }
    }

    fn prev(self) -> Self {
        match self {
            Pane::Nodes => Pane::Entries,
            Pane::Chains => Pane::Nodes,
            Pane::Entries => Pane::Chains,
        }
    }
}

/// Viewer state. Owns the displayed snapshot and the selection; both change
/// only through [`App::on_event`] and the key handlers, all on the UI thread.
pub struct App {
    quit: bool,
    mode: ViewerMode,
    theme: Theme,
    fps: u32,
    pane: Pane,

    snapshot: Option<Snapshot>,
    selection: Selection,

    node_cursor: usize,
    chain_cursor: usize,
    entry_cursor: usize,
    details_scroll: u16,

    // Refresh status
    banner: Option<String>,
    last_refresh: Option<DateTime<Local>>,
    refreshing: bool,
    auto_refresh: bool,
    skipped_files: usize,

    toast_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(mode: ViewerMode, theme: Theme, fps: u32, auto_refresh: bool) -> Self {
        Self {
            quit: false,
            mode,
            theme,
            fps,
            pane: Pane::Nodes,
            snapshot: None,
            selection: Selection::empty(),
            node_cursor: 0,
            chain_cursor: 0,
            entry_cursor: 0,
            details_scroll: 0,
            banner: None,
            last_refresh: None,
            refreshing: false,
            auto_refresh,
            skipped_files: 0,
            toast_message: None,
        }
    }

    // ----- getters -----
    pub fn quit_flag(&self) -> bool { self.quit }
    pub fn mode(&self) -> ViewerMode { self.mode }
    pub fn theme(&self) -> Theme { self.theme }
    pub fn fps(&self) -> u32 { self.fps }
    pub fn pane(&self) -> Pane { self.pane }
    pub fn snapshot(&self) -> Option<&Snapshot> { self.snapshot.as_ref() }
    pub fn selection(&self) -> &Selection { &self.selection }
    pub fn node_cursor(&self) -> usize { self.node_cursor }
    pub fn chain_cursor(&self) -> usize { self.chain_cursor }
    pub fn entry_cursor(&self) -> usize { self.entry_cursor }
    pub fn details_scroll(&self) -> u16 { self.details_scroll }
    pub fn last_refresh(&self) -> Option<&DateTime<Local>> { self.last_refresh.as_ref() }
    pub fn is_refreshing(&self) -> bool { self.refreshing }
    pub fn auto_refresh(&self) -> bool { self.auto_refresh }
    pub fn skipped_files(&self) -> usize { self.skipped_files }

    /// Banner text; set by a failed or empty refresh, cleared by the next good one.
    pub fn error(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Nodes in display order.
    pub fn nodes(&self) -> Vec<&NodeBundle> {
        self.snapshot.as_ref().map(Snapshot::ordered).unwrap_or_default()
    }

    /// Chains of the selected node.
    pub fn chains(&self) -> Vec<ChainRef> {
        self.selection
            .bundle()
            .map(NodeBundle::chain_refs)
            .unwrap_or_default()
    }

    /// Content of the selected chain.
    pub fn entries(&self) -> Option<ChainView<'_>> {
        self.selection.chain_view()
    }

    /// The block popup is open while a block is selected.
    pub fn details_open(&self) -> bool {
        self.selection.block().is_some()
    }

    pub fn show_toast(&mut self, msg: String) {
        self.toast_message = Some((msg, Instant::now()));
    }

    pub fn toast_message(&self) -> Option<&str> {
        self.toast_message
            .as_ref()
            .filter(|(_, at)| at.elapsed() < TOAST_TTL)
            .map(|(msg, _)| msg.as_str())
    }

    // ----- refresh results -----
    pub fn on_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::Quit => self.quit = true,
            AppEvent::RefreshStarted => self.refreshing = true,
            AppEvent::DirectoryChanged => log::debug!("directory changed"),
            AppEvent::Refreshed(outcome) => {
                self.refreshing = false;
                self.apply_outcome(outcome);
            }
        }
    }

    fn apply_outcome(&mut self, outcome: RefreshOutcome) {
        match outcome {
            RefreshOutcome::Snapshot(snapshot) => {
                // Reconcile against the selection held now, not when the read began
                self.selection = reconcile(&self.selection, &snapshot);
                self.skipped_files = snapshot.skipped().len();
                self.snapshot = Some(snapshot);
                self.banner = None;
                self.last_refresh = Some(Local::now());
                if self.mode == ViewerMode::Paired && self.selection.is_empty() {
                    self.auto_select_first_node();
                }
                self.sync_cursors();
            }
            RefreshOutcome::NoData { skipped } => {
                self.skipped_files = skipped.len();
                self.banner = Some(self.mode.no_data_message().to_string());
            }
            RefreshOutcome::Failed(e) => {
                self.banner = Some(e.to_string());
            }
        }
    }

    /// Paired layouts always show a node's blockchain.
    fn auto_select_first_node(&mut self) {
        let Some(snapshot) = self.snapshot.as_ref() else {
            return;
        };
        let Some(first) = snapshot.ordered().first().map(|b| b.node_id.clone()) else {
            return;
        };
        if self.selection.select_node(snapshot, &first).is_ok() {
            let _ = self.selection.select_chain(ChainRef::Blockchain);
            log::debug!("auto-selected node {first}");
        }
    }

    /// Point the cursors at the selection, or keep them in range.
    fn sync_cursors(&mut self) {
        let nodes = self.nodes();
        let node_cursor = self
            .selection
            .node_id()
            .and_then(|id| nodes.iter().position(|b| b.node_id == id))
            .unwrap_or_else(|| clamp(self.node_cursor, nodes.len()));

        let chains = self.chains();
        let chain_cursor = self
            .selection
            .chain_ref()
            .and_then(|c| chains.iter().position(|x| *x == c))
            .unwrap_or_else(|| clamp(self.chain_cursor, chains.len()));

        let entries = self.entries();
        let entry_cursor = match (self.selection.block(), entries.and_then(|v| v.blocks())) {
            (Some(block), Some(blocks)) => blocks
                .iter()
                .position(|b| b.index == block.index)
                .unwrap_or(0),
            _ => clamp(self.entry_cursor, entries.map_or(0, |v| v.len())),
        };

        self.node_cursor = node_cursor;
        self.chain_cursor = chain_cursor;
        self.entry_cursor = entry_cursor;
    }

    // ----- keys -----
    pub fn next_pane(&mut self) {
        self.pane = self.pane.next();
    }

    pub fn prev_pane(&mut self) {
        self.pane = self.pane.prev();
    }

    pub fn up(&mut self) {
        if self.details_open() {
            self.details_scroll = self.details_scroll.saturating_sub(1);
            return;
        }
        match self.pane {
            Pane::Nodes => self.node_cursor = self.node_cursor.saturating_sub(1),
            Pane::Chains => self.chain_cursor = self.chain_cursor.saturating_sub(1),
            Pane::Entries => self.entry_cursor = self.entry_cursor.saturating_sub(1),
        }
    }

    pub fn down(&mut self) {
        if self.details_open() {
            self.details_scroll = self.details_scroll.saturating_add(1);
            return;
        }
        match self.pane {
            Pane::Nodes => self.node_cursor = step(self.node_cursor, self.nodes().len()),
            Pane::Chains => self.chain_cursor = step(self.chain_cursor, self.chains().len()),
            Pane::Entries => {
                let len = self.entries().map_or(0, |v| v.len());
                self.entry_cursor = step(self.entry_cursor, len);
            }
        }
    }

    /// Select whatever is under the cursor in the focused pane.
    pub fn enter(&mut self) {
        match self.pane {
            Pane::Nodes => self.select_node_at_cursor(),
            Pane::Chains => self.select_chain_at_cursor(),
            Pane::Entries => self.select_block_at_cursor(),
        }
    }

    /// Close the innermost open level: block popup, then chain, then node.
    pub fn back(&mut self) {
        if self.selection.block().is_some() {
            self.selection.clear_block();
            self.details_scroll = 0;
        } else if self.selection.chain_ref().is_some() {
            self.selection.clear_chain();
            self.entry_cursor = 0;
            self.pane = Pane::Chains;
        } else if !self.selection.is_empty() {
            self.selection.clear_node();
            self.chain_cursor = 0;
            self.pane = Pane::Nodes;
        }
    }

    /// Flip auto refresh; returns the new state for the scheduler.
    pub fn toggle_auto_refresh(&mut self) -> bool {
        self.auto_refresh = !self.auto_refresh;
        self.show_toast(format!(
            "Auto refresh {}",
            if self.auto_refresh { "on" } else { "off" }
        ));
        self.auto_refresh
    }

    fn select_node_at_cursor(&mut self) {
        let Some(snapshot) = self.snapshot.as_ref() else {
            return;
        };
        let Some(id) = snapshot.ordered().get(self.node_cursor).map(|b| b.node_id.clone()) else {
            return;
        };
        if let Err(e) = self.selection.select_node(snapshot, &id) {
            self.show_toast(e.to_string());
            return;
        }
        self.chain_cursor = 0;
        self.entry_cursor = 0;
        if self.mode == ViewerMode::Paired && self.selection.select_chain(ChainRef::Blockchain).is_ok() {
            self.pane = Pane::Entries;
        } else {
            self.pane = Pane::Chains;
        }
    }

    fn select_chain_at_cursor(&mut self) {
        let Some(chain) = self.chains().get(self.chain_cursor).copied() else {
            return;
        };
        match self.selection.select_chain(chain) {
            Ok(()) => {
                self.entry_cursor = 0;
                self.pane = Pane::Entries;
            }
            Err(e) => self.show_toast(e.to_string()),
        }
    }

    fn select_block_at_cursor(&mut self) {
        let Some(index) = self
            .entries()
            .and_then(|v| v.blocks())
            .and_then(|blocks| blocks.get(self.entry_cursor))
            .map(|b| b.index)
        else {
            return;
        };
        match self.selection.select_block(index) {
            Ok(()) => self.details_scroll = 0,
            Err(e) => self.show_toast(e.to_string()),
        }
    }
}

fn clamp(cursor: usize, len: usize) -> usize {
    cursor.min(len.saturating_sub(1))
}

fn step(cursor: usize, len: usize) -> usize {
    if cursor + 1 < len {
        cursor + 1
    } else {
        cursor
    }
}
