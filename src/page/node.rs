//! Nodes of the in-memory page model

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Handle to a node inside a [`super::PageDocument`] arena
///
/// Only meaningful for the document that issued it; the pipeline never
/// assumes ownership of the underlying element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(super) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One element of the host page
#[derive(Debug, Clone)]
pub struct PageNode {
    pub tag: String,
    /// Sorted map keeps snapshot serialization stable
    pub attrs: BTreeMap<String, String>,
    pub classes: Vec<String>,
    /// Text directly owned by this node (children carry their own)
    pub text: String,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
}

impl PageNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            classes: Vec::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Builder-style helpers for test pages and snapshot loading
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(name.into(), value.into());
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.attrs.remove(name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !self.has_class(&class) {
            self.classes.push(class);
        }
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_membership() {
        let mut node = PageNode::new("div").with_class("comment");
        assert!(node.has_class("comment"));
        assert!(!node.has_class("Comment"));

        node.add_class("comment");
        assert_eq!(node.classes.len(), 1);

        node.remove_class("comment");
        assert!(!node.has_class("comment"));
    }

    #[test]
    fn test_attrs() {
        let mut node = PageNode::new("div").with_attr("data-commentid", "c1");
        assert_eq!(node.attr("data-commentid"), Some("c1"));

        node.set_attr("data-commentid", "c2");
        assert_eq!(node.attr("data-commentid"), Some("c2"));
        assert_eq!(node.remove_attr("data-commentid"), Some("c2".to_string()));
        assert_eq!(node.attr("data-commentid"), None);
    }
}
