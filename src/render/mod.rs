//! Indicator rendering onto the page model
//!
//! Paints classification outcomes as attributes and classes on the comment
//! element, the same surface a content script would style via CSS. Markers
//! never obstruct clean or low-confidence comments; only `hate` above the
//! threshold obscures the text behind a single-use reveal control.

use crate::classify::{Category, ClassificationResult};
use crate::page::{NodeId, PageDocument, PageNode};
use crate::settings::PipelineSettings;

/// Marker attribute; value is one of [`MARKER_SUBTLE`], [`MARKER_FLAGGED`]
pub const ATTR_MARKER: &str = "data-toxiscan-marker";
pub const MARKER_SUBTLE: &str = "subtle";
pub const MARKER_FLAGGED: &str = "flagged";

pub const ATTR_CATEGORY: &str = "data-toxiscan-category";
pub const ATTR_CONFIDENCE: &str = "data-toxiscan-confidence";

/// Error affordance attribute; value is the failure kind. An element
/// carrying this attribute never carries a classification marker, so a
/// failure can not be mistaken for a real result.
pub const ATTR_ERROR: &str = "data-toxiscan-error";

/// Class applied to obscured hate-speech comments
pub const CLASS_OBSCURED: &str = "toxiscan-obscured";
/// Set once the user reveals an obscured comment; never cleared
pub const ATTR_REVEALED: &str = "data-toxiscan-revealed";
/// Tag of the appended reveal control element
pub const TAG_REVEAL: &str = "toxiscan-reveal";

/// Stateless renderer; all state lives on the page nodes themselves
#[derive(Debug, Default, Clone, Copy)]
pub struct IndicatorRenderer;

impl IndicatorRenderer {
    /// Paint the indicator for a classified comment
    ///
    /// Re-rendering an already-marked element is a no-op. The ledger keeps
    /// this from happening on the normal path; the guard covers late
    /// results arriving after a stop/start cycle.
    pub fn render(
        &self,
        doc: &mut PageDocument,
        id: NodeId,
        result: &ClassificationResult,
        settings: &PipelineSettings,
    ) {
        let Some(node) = doc.node(id) else {
            tracing::debug!("render target {id:?} vanished from the page");
            return;
        };
        if node.attr(ATTR_MARKER).is_some() || node.attr(ATTR_ERROR).is_some() {
            tracing::debug!("element {id:?} already marked, skipping re-render");
            return;
        }

        let prominent = settings.highlight_enabled
            && result.category != Category::Clean
            && result.confidence >= settings.highlight_threshold;

        let marker = if prominent { MARKER_FLAGGED } else { MARKER_SUBTLE };
        {
            let node = doc.node_mut(id).expect("checked above");
            node.set_attr(ATTR_MARKER, marker);
            node.set_attr(ATTR_CATEGORY, result.category.as_str());
            node.set_attr(ATTR_CONFIDENCE, format!("{:.3}", result.confidence));
        }

        if prominent && result.category == Category::Hate {
            self.obscure(doc, id);
        }
    }

    /// Paint the unobtrusive could-not-analyze affordance
    pub fn render_error(&self, doc: &mut PageDocument, id: NodeId, kind: &str) {
        let Some(node) = doc.node_mut(id) else {
            tracing::debug!("error render target {id:?} vanished from the page");
            return;
        };
        if node.attr(ATTR_MARKER).is_some() || node.attr(ATTR_ERROR).is_some() {
            return;
        }
        node.set_attr(ATTR_ERROR, kind);
    }

    /// One-way reveal of an obscured comment. Returns `true` when this call
    /// removed the obscuring treatment; `false` if there was nothing to
    /// reveal or it was revealed before.
    pub fn reveal(&self, doc: &mut PageDocument, id: NodeId) -> bool {
        let Some(node) = doc.node_mut(id) else {
            return false;
        };
        if !node.has_class(CLASS_OBSCURED) {
            return false;
        }
        node.remove_class(CLASS_OBSCURED);
        node.set_attr(ATTR_REVEALED, "true");
        true
    }

    fn obscure(&self, doc: &mut PageDocument, id: NodeId) {
        {
            let node = doc.node_mut(id).expect("caller verified node");
            // A comment revealed earlier in this session stays readable
            if node.attr(ATTR_REVEALED).is_some() {
                return;
            }
            node.add_class(CLASS_OBSCURED);
        }

        let has_control = doc
            .node(id)
            .map(|node| {
                node.children()
                    .iter()
                    .any(|&c| doc.node(c).is_some_and(|n| n.tag == TAG_REVEAL))
            })
            .unwrap_or(false);
        if !has_control {
            let control = PageNode::new(TAG_REVEAL).with_text("Show comment");
            if let Err(e) = doc.append_child(id, control) {
                tracing::warn!("failed to attach reveal control: {e}");
            }
        }
    }
}
