//! The comment-detection pipeline
//!
//! One `DetectionPipeline` is constructed per page injection and owns the
//! dedup ledger and result cache for that page's lifetime; tearing the
//! pipeline down (navigation) is the only bulk clear either ever gets.
//! Candidate flow: locate → length gate → dedup ledger → cache check →
//! remote classify on miss → cache store → indicator render.

mod cache;
mod ledger;
mod watcher;

pub use cache::{normalize_text, ResultCache};
pub use ledger::{identity_for, DedupLedger};
pub use watcher::{MutationWatcher, WatcherState};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::classify::{ClassificationError, ClassificationResult, Classifier, ClassifyRequest};
use crate::page::{NodeId, PageDocument};
use crate::platform::{adapter_for, Platform, PlatformAdapter};
use crate::render::IndicatorRenderer;
use crate::settings::PipelineSettings;

/// A DOM element tentatively identified as a user comment
#[derive(Debug, Clone)]
pub struct CommentCandidate {
    /// Deterministic key preventing reprocessing of the same logical comment
    pub identity: String,
    /// Extracted, trimmed text
    pub text: String,
    /// Transient handle into the page; never owned by the pipeline
    pub node: NodeId,
    /// Platform-native comment id, when the page exposed one
    pub platform_id: Option<String>,
}

/// Event emitted once per classified comment for telemetry subscribers
#[derive(Debug, Clone)]
pub struct ClassifiedComment {
    pub identity: String,
    pub text: String,
    pub platform: Platform,
    pub result: ClassificationResult,
    pub observed_at: DateTime<Utc>,
}

/// Construction-time knobs, sourced from the `[detection]` config section
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Shorter candidates are discarded silently
    pub min_comment_length: usize,
    /// Capacity of the telemetry broadcast channel
    pub event_capacity: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            min_comment_length: 5,
            event_capacity: 128,
        }
    }
}

/// Lock the shared page, recovering the guard if a host panic poisoned it
fn lock_page(doc: &Mutex<PageDocument>) -> MutexGuard<'_, PageDocument> {
    doc.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-page detection pipeline
///
/// The ledger and cache are only touched from the owning task; the page
/// document is shared with the host behind a mutex that is never held
/// across an await point.
pub struct DetectionPipeline<C> {
    doc: Arc<Mutex<PageDocument>>,
    platform: Platform,
    adapter: Box<dyn PlatformAdapter>,
    classifier: Arc<C>,
    ledger: DedupLedger,
    cache: ResultCache,
    renderer: IndicatorRenderer,
    events_tx: broadcast::Sender<ClassifiedComment>,
    min_comment_length: usize,
}

impl<C: Classifier> DetectionPipeline<C> {
    /// Build a pipeline for the page, detecting the platform from its host
    pub fn new(doc: Arc<Mutex<PageDocument>>, classifier: C, options: PipelineOptions) -> Self {
        let platform = Platform::from_host(lock_page(&doc).host());
        let (events_tx, _) = broadcast::channel(options.event_capacity.max(1));
        Self {
            doc,
            platform,
            adapter: adapter_for(platform),
            classifier: Arc::new(classifier),
            ledger: DedupLedger::new(),
            cache: ResultCache::new(),
            renderer: IndicatorRenderer,
            events_tx,
            min_comment_length: options.min_comment_length,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn document(&self) -> Arc<Mutex<PageDocument>> {
        Arc::clone(&self.doc)
    }

    /// Subscribe to per-comment classification events
    pub fn subscribe(&self) -> broadcast::Receiver<ClassifiedComment> {
        self.events_tx.subscribe()
    }

    /// Shared handle to the classifier backend
    pub fn classifier(&self) -> Arc<C> {
        Arc::clone(&self.classifier)
    }

    pub(crate) fn document_root(&self) -> NodeId {
        lock_page(&self.doc).root()
    }

    /// Locate candidates under the given roots and pass them through the
    /// length gate and the dedup ledger. Ledger insertion happens here,
    /// synchronously at discovery time, before any classification is
    /// dispatched.
    pub(crate) fn collect_candidates(&mut self, roots: &[NodeId]) -> Vec<CommentCandidate> {
        let doc = lock_page(&self.doc);

        let mut candidates = Vec::new();
        for &root in roots {
            for id in self.adapter.locate(&doc, root) {
                let text = self.adapter.extract_text(&doc, id);
                if text.chars().count() < self.min_comment_length {
                    tracing::trace!("candidate {id:?} below minimum length, skipping");
                    continue;
                }

                let platform_id = self.adapter.native_identity(&doc, id);
                let identity = identity_for(
                    platform_id.as_deref(),
                    &text,
                    doc.approximate_position(id),
                );
                if !self.ledger.should_process(&identity) {
                    continue;
                }

                candidates.push(CommentCandidate {
                    identity,
                    text,
                    node: id,
                    platform_id,
                });
            }
        }
        candidates
    }

    /// Cached result for this text, if any. A hit means no network call.
    pub(crate) fn cached(&self, text: &str) -> Option<ClassificationResult> {
        self.cache.get(text).cloned()
    }

    pub(crate) fn request_for(&self, candidate: &CommentCandidate) -> ClassifyRequest {
        ClassifyRequest {
            text: candidate.text.clone(),
            platform: self.platform,
            platform_id: candidate.platform_id.clone(),
            metadata: None,
        }
    }

    /// Record a successful classification: cache, paint, notify
    pub(crate) fn complete(
        &mut self,
        candidate: &CommentCandidate,
        result: ClassificationResult,
        settings: &PipelineSettings,
    ) {
        self.cache.put(&candidate.text, result.clone());

        {
            let mut doc = lock_page(&self.doc);
            self.renderer
                .render(&mut doc, candidate.node, &result, settings);
        }

        tracing::debug!(
            identity = %candidate.identity,
            category = result.category.as_str(),
            confidence = result.confidence,
            "comment classified"
        );

        // No subscribers is fine
        let _ = self.events_tx.send(ClassifiedComment {
            identity: candidate.identity.clone(),
            text: candidate.text.clone(),
            platform: self.platform,
            result,
            observed_at: Utc::now(),
        });
    }

    /// Record a failed classification: visible error affordance, no
    /// fabricated result, identity stays burned in the ledger
    pub(crate) fn fail(&mut self, candidate: &CommentCandidate, error: &ClassificationError) {
        tracing::debug!(
            identity = %candidate.identity,
            kind = error.kind(),
            "classification failed: {error}"
        );
        let mut doc = lock_page(&self.doc);
        self.renderer
            .render_error(&mut doc, candidate.node, error.kind());
    }

    /// One synchronous pass over the whole page, classifying sequentially.
    /// This is the user-initiated flow (CLI scan); the watcher drives the
    /// same primitives concurrently.
    pub async fn sweep_once(
        &mut self,
        settings: &PipelineSettings,
    ) -> Vec<(
        CommentCandidate,
        Result<ClassificationResult, ClassificationError>,
    )> {
        let root = self.document_root();
        let candidates = self.collect_candidates(&[root]);
        tracing::info!("sweep found {} new candidates", candidates.len());

        let mut outcomes = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if let Some(hit) = self.cached(&candidate.text) {
                self.complete(&candidate, hit.clone(), settings);
                outcomes.push((candidate, Ok(hit)));
                continue;
            }

            let request = self.request_for(&candidate);
            match self.classifier.classify(request).await {
                Ok(result) => {
                    self.complete(&candidate, result.clone(), settings);
                    outcomes.push((candidate, Ok(result)));
                }
                Err(error) => {
                    self.fail(&candidate, &error);
                    outcomes.push((candidate, Err(error)));
                }
            }
        }
        outcomes
    }
}
