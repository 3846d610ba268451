//! Mutation events flowing from the host page into the watcher

use tokio::sync::mpsc;

use crate::error::{Result, ToxiscanError};
use crate::page::NodeId;

/// One batch of nodes newly inserted into the document
///
/// Mirrors how browsers report DOM growth: insertions are coalesced, and a
/// batch may contain nodes the pipeline already saw (scroll-back, re-parent).
#[derive(Debug, Clone)]
pub struct MutationBatch {
    pub added: Vec<NodeId>,
}

impl MutationBatch {
    pub fn new(added: Vec<NodeId>) -> Self {
        Self { added }
    }
}

/// Sender half handed to whatever mutates the page
#[derive(Debug, Clone)]
pub struct MutationPublisher {
    tx: mpsc::Sender<MutationBatch>,
}

impl MutationPublisher {
    /// Publish a batch of inserted nodes; errors once the watcher is gone
    pub async fn publish(&self, batch: MutationBatch) -> Result<()> {
        self.tx
            .send(batch)
            .await
            .map_err(|_| ToxiscanError::Pipeline("mutation channel closed".to_string()))
    }
}

/// Create the mutation channel pair: publisher for the host, receiver for
/// the watcher. Bounded so a runaway page applies backpressure instead of
/// growing without limit.
pub fn mutation_channel(buffer: usize) -> (MutationPublisher, mpsc::Receiver<MutationBatch>) {
    let (tx, rx) = mpsc::channel(buffer);
    (MutationPublisher { tx }, rx)
}
