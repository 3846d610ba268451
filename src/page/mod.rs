//! In-memory model of the host page
//!
//! The pipeline does not run inside a browser; the host embedding it owns a
//! `PageDocument` and reports DOM growth over the mutation channel. Nodes
//! live in an arena and are addressed by [`NodeId`], so the pipeline holds
//! only transient references while processing a candidate.

mod mutation;
mod node;

pub use mutation::{mutation_channel, MutationBatch, MutationPublisher};
pub use node::{NodeId, PageNode};

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToxiscanError};

/// Arena-backed document with a fixed root
///
/// Nodes are append-only; removal is not modeled because the pipeline only
/// ever reads elements and paints indicator state onto them.
#[derive(Debug)]
pub struct PageDocument {
    host: String,
    nodes: Vec<PageNode>,
}

impl PageDocument {
    /// Create an empty page for `host` (e.g. `"www.facebook.com"`)
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            nodes: vec![PageNode::new("body")],
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&PageNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut PageNode> {
        self.nodes.get_mut(id.0)
    }

    /// Insert `node` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, mut node: PageNode) -> Result<NodeId> {
        if parent.0 >= self.nodes.len() {
            return Err(ToxiscanError::Page(format!(
                "unknown parent node {}",
                parent.0
            )));
        }
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Pre-order walk of the subtree rooted at `root`, root included
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            out.push(id);
            // Reverse keeps document order under the LIFO stack
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Concatenated text of the node and its descendants, trimmed, with
    /// single spaces between fragments
    pub fn text_content(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        for node_id in self.descendants(id) {
            if let Some(node) = self.node(node_id) {
                let text = node.text.trim();
                if !text.is_empty() {
                    parts.push(text);
                }
            }
        }
        parts.join(" ")
    }

    /// Cheap positional fingerprint used by identity hashing when the page
    /// exposes no native id: (depth, index among siblings)
    pub fn approximate_position(&self, id: NodeId) -> (u32, u32) {
        let mut depth = 0u32;
        let mut current = id;
        while let Some(parent) = self.node(current).and_then(PageNode::parent) {
            depth += 1;
            current = parent;
        }

        let sibling_index = self
            .node(id)
            .and_then(PageNode::parent)
            .and_then(|p| self.node(p))
            .and_then(|parent| parent.children().iter().position(|&c| c == id))
            .unwrap_or(0) as u32;

        (depth, sibling_index)
    }

    /// Load a page from its JSON snapshot
    pub fn from_snapshot(snapshot: PageSnapshot) -> Self {
        let mut doc = PageDocument::new(snapshot.host);
        doc.nodes[0].tag = snapshot.body.tag.clone();
        doc.nodes[0].attrs = snapshot.body.attrs.clone();
        doc.nodes[0].classes = snapshot.body.classes.clone();
        doc.nodes[0].text = snapshot.body.text.clone();
        for child in &snapshot.body.children {
            doc.append_snapshot_node(NodeId(0), child);
        }
        doc
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ToxiscanError::Io {
            source: e,
            context: format!("Failed to read page snapshot: {:?}", path),
        })?;
        let snapshot: PageSnapshot =
            serde_json::from_str(&content).map_err(|e| ToxiscanError::Json {
                source: e,
                context: format!("Failed to parse page snapshot: {:?}", path),
            })?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn to_snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            host: self.host.clone(),
            body: self.snapshot_node(self.root()),
        }
    }

    fn append_snapshot_node(&mut self, parent: NodeId, snapshot: &SnapshotNode) {
        let node = PageNode::new(snapshot.tag.clone());
        // append_child only fails on an unknown parent, which we just created
        let id = self
            .append_child(parent, node)
            .expect("parent exists during snapshot load");
        {
            let node = self.node_mut(id).expect("node just appended");
            node.attrs = snapshot.attrs.clone();
            node.classes = snapshot.classes.clone();
            node.text = snapshot.text.clone();
        }
        for child in &snapshot.children {
            self.append_snapshot_node(id, child);
        }
    }

    fn snapshot_node(&self, id: NodeId) -> SnapshotNode {
        let node = &self.nodes[id.0];
        SnapshotNode {
            tag: node.tag.clone(),
            attrs: node.attrs.clone(),
            classes: node.classes.clone(),
            text: node.text.clone(),
            children: node
                .children
                .iter()
                .map(|&child| self.snapshot_node(child))
                .collect(),
        }
    }
}

/// Serializable page capture, as produced by the recording shim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub host: String,
    pub body: SnapshotNode,
}

/// Nested node form used in snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnapshotNode>,
}
