//! Selection state and reconciliation
//!
//! The selection is three levels deep: node, then one of its chains, then a
//! block of that chain. Every level holds the content it was bound to, so the
//! display never has to look anything up. After each refresh [`reconcile`]
//! carries the previous selection onto the new snapshot, rebinding each level
//! to fresh content or clearing it (and everything below it) when its target
//! is gone.

use crate::error::SelectionError;
use crate::snapshot::Snapshot;
use crate::types::{Block, ChainRef, ChainView, NodeBundle};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    node: Option<NodeSelection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeSelection {
    pub bundle: NodeBundle,
    pub chain: Option<ChainSelection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainSelection {
    pub chain: ChainRef,
    /// Always `None` for the mempool
    pub block: Option<Block>,
}

impl Selection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_none()
    }

    pub fn node(&self) -> Option<&NodeSelection> {
        self.node.as_ref()
    }

    pub fn node_id(&self) -> Option<&str> {
        self.node.as_ref().map(|n| n.bundle.node_id.as_str())
    }

    pub fn bundle(&self) -> Option<&NodeBundle> {
        self.node.as_ref().map(|n| &n.bundle)
    }

    pub fn chain_ref(&self) -> Option<ChainRef> {
        self.node.as_ref()?.chain.as_ref().map(|c| c.chain)
    }

    /// Content of the selected chain, as held by the selected bundle.
    pub fn chain_view(&self) -> Option<ChainView<'_>> {
        let node = self.node.as_ref()?;
        node.bundle.chain(node.chain.as_ref()?.chain)
    }

    pub fn block(&self) -> Option<&Block> {
        self.node.as_ref()?.chain.as_ref()?.block.as_ref()
    }

    /// Select a node from the snapshot; chain and block are cleared.
    pub fn select_node(&mut self, snapshot: &Snapshot, node_id: &str) -> Result<(), SelectionError> {
        let bundle = snapshot
            .bundle(node_id)
            .ok_or_else(|| SelectionError::UnknownNode(node_id.to_string()))?;
        self.node = Some(NodeSelection {
            bundle: bundle.clone(),
            chain: None,
        });
        Ok(())
    }

    pub fn clear_node(&mut self) {
        self.node = None;
    }

    /// Select one of the selected node's chains; the block is cleared.
    pub fn select_chain(&mut self, chain: ChainRef) -> Result<(), SelectionError> {
        let node = self.node.as_mut().ok_or(SelectionError::NoNodeSelected)?;
        if node.bundle.chain(chain).is_none() {
            return Err(SelectionError::MissingChain {
                node: node.bundle.node_id.clone(),
                chain: chain.to_string(),
            });
        }
        node.chain = Some(ChainSelection { chain, block: None });
        Ok(())
    }

    pub fn clear_chain(&mut self) {
        if let Some(node) = self.node.as_mut() {
            node.chain = None;
        }
    }

    /// Select a block of the selected chain by its `index` field.
    pub fn select_block(&mut self, index: i64) -> Result<(), SelectionError> {
        let node = self.node.as_mut().ok_or(SelectionError::NoNodeSelected)?;
        let selected = node.chain.as_mut().ok_or(SelectionError::NoChainSelected)?;
        let view = node
            .bundle
            .chain(selected.chain)
            .ok_or_else(|| SelectionError::MissingChain {
                node: node.bundle.node_id.clone(),
                chain: selected.chain.to_string(),
            })?;
        if !selected.chain.has_blocks() {
            return Err(SelectionError::NotABlockChain(selected.chain.to_string()));
        }
        let block = view
            .find_block(index)
            .ok_or(SelectionError::UnknownBlock(index))?;
        selected.block = Some(block.clone());
        Ok(())
    }

    pub fn clear_block(&mut self) {
        if let Some(chain) = self.node.as_mut().and_then(|n| n.chain.as_mut()) {
            chain.block = None;
        }
    }
}

/// Carry `prev` onto a freshly built snapshot.
///
/// Nodes and blocks are matched by identifier (node id, block `index`).
/// Complete games are matched by position since they carry no identifier.
pub fn reconcile(prev: &Selection, snapshot: &Snapshot) -> Selection {
    let Some(prev_node) = prev.node.as_ref() else {
        return Selection::empty();
    };

    let Some(bundle) = snapshot.bundle(&prev_node.bundle.node_id) else {
        log::debug!("selected node {} vanished", prev_node.bundle.node_id);
        return Selection::empty();
    };

    let chain = prev_node
        .chain
        .as_ref()
        .and_then(|prev_chain| reconcile_chain(prev_chain, bundle));

    Selection {
        node: Some(NodeSelection {
            bundle: bundle.clone(),
            chain,
        }),
    }
}

fn reconcile_chain(prev: &ChainSelection, bundle: &NodeBundle) -> Option<ChainSelection> {
    let Some(view) = bundle.chain(prev.chain) else {
        log::debug!("{} of node {} vanished", prev.chain, bundle.node_id);
        return None;
    };

    let block = match (prev.chain.has_blocks(), prev.block.as_ref()) {
        (true, Some(old)) => view.find_block(old.index).cloned(),
        _ => None,
    };

    Some(ChainSelection {
        chain: prev.chain,
        block,
    })
}
