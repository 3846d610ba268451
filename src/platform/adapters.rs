//! Adapter implementations for the supported platforms

use crate::page::{NodeId, PageDocument, PageNode};
use crate::platform::{Platform, PlatformAdapter};

/// Nodes in the subtree under `root` (inclusive) matching `predicate`
fn matching_nodes(
    doc: &PageDocument,
    root: NodeId,
    predicate: impl Fn(&PageNode) -> bool,
) -> Vec<NodeId> {
    doc.descendants(root)
        .into_iter()
        .filter(|&id| doc.node(id).is_some_and(&predicate))
        .collect()
}

/// First descendant of `id` (inclusive) matching `predicate`
fn find_descendant(
    doc: &PageDocument,
    id: NodeId,
    predicate: impl Fn(&PageNode) -> bool,
) -> Option<NodeId> {
    doc.descendants(id)
        .into_iter()
        .find(|&child| doc.node(child).is_some_and(&predicate))
}

/// Facebook threads expose comments as `div[data-commentid]`, or older
/// markup as `div[role=article]` with a `comment` class. Text lives in a
/// `comment-body` descendant when present.
pub struct FacebookAdapter;

impl PlatformAdapter for FacebookAdapter {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    fn locate(&self, doc: &PageDocument, root: NodeId) -> Vec<NodeId> {
        matching_nodes(doc, root, |node| {
            node.attr("data-commentid").is_some()
                || (node.attr("role") == Some("article") && node.has_class("comment"))
        })
    }

    fn extract_text(&self, doc: &PageDocument, id: NodeId) -> String {
        let body = find_descendant(doc, id, |node| node.has_class("comment-body"));
        doc.text_content(body.unwrap_or(id)).trim().to_string()
    }

    fn native_identity(&self, doc: &PageDocument, id: NodeId) -> Option<String> {
        doc.node(id)?.attr("data-commentid").map(str::to_string)
    }
}

/// YouTube renders comments as custom `ytd-comment-renderer` elements; the
/// text sits in the node with `id="content-text"`.
pub struct YoutubeAdapter;

impl PlatformAdapter for YoutubeAdapter {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    fn locate(&self, doc: &PageDocument, root: NodeId) -> Vec<NodeId> {
        matching_nodes(doc, root, |node| {
            node.tag == "ytd-comment-renderer" || node.tag == "ytd-comment-thread-renderer"
        })
    }

    fn extract_text(&self, doc: &PageDocument, id: NodeId) -> String {
        let content = find_descendant(doc, id, |node| node.attr("id") == Some("content-text"));
        doc.text_content(content.unwrap_or(id)).trim().to_string()
    }

    fn native_identity(&self, doc: &PageDocument, id: NodeId) -> Option<String> {
        doc.node(id)?.attr("data-cid").map(str::to_string)
    }
}

/// TikTok tags comment items with `data-e2e` hooks; no stable comment id is
/// exposed, so identity always falls back to the content hash.
pub struct TiktokAdapter;

impl PlatformAdapter for TiktokAdapter {
    fn platform(&self) -> Platform {
        Platform::Tiktok
    }

    fn locate(&self, doc: &PageDocument, root: NodeId) -> Vec<NodeId> {
        matching_nodes(doc, root, |node| {
            matches!(
                node.attr("data-e2e"),
                Some("comment-item") | Some("comment-level-1") | Some("comment-level-2")
            )
        })
    }

    fn extract_text(&self, doc: &PageDocument, id: NodeId) -> String {
        let span = find_descendant(doc, id, |node| node.attr("data-e2e") == Some("comment-text"));
        doc.text_content(span.unwrap_or(id)).trim().to_string()
    }

    fn native_identity(&self, _doc: &PageDocument, _id: NodeId) -> Option<String> {
        None
    }
}

/// Structural fallback: anything that looks like a comment container.
/// Matches leaf-most containers only, so a wrapping `comments` section does
/// not swallow its children.
pub struct GenericAdapter;

impl GenericAdapter {
    fn looks_like_comment(node: &PageNode) -> bool {
        node.classes.iter().any(|c| c.contains("comment"))
            || node.attr("itemprop") == Some("comment")
    }
}

impl PlatformAdapter for GenericAdapter {
    fn platform(&self) -> Platform {
        Platform::Generic
    }

    fn locate(&self, doc: &PageDocument, root: NodeId) -> Vec<NodeId> {
        matching_nodes(doc, root, |node| Self::looks_like_comment(node))
            .into_iter()
            .filter(|&id| {
                // Drop containers whose children also match
                doc.node(id).is_none_or(|node| {
                    !node
                        .children()
                        .iter()
                        .any(|&c| doc.node(c).is_some_and(Self::looks_like_comment))
                })
            })
            .collect()
    }

    fn extract_text(&self, doc: &PageDocument, id: NodeId) -> String {
        doc.text_content(id).trim().to_string()
    }

    fn native_identity(&self, doc: &PageDocument, id: NodeId) -> Option<String> {
        doc.node(id)?.attr("data-comment-id").map(str::to_string)
    }
}
