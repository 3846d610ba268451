//! Mutation watcher: the pipeline's observation state machine
//!
//! Consumes DOM-insertion batches and settings changes on channels and
//! drives the detection pipeline. Observation runs only while all of
//! {enabled, platform enabled, authenticated} hold; entering observation
//! sweeps the whole page first, since most comments predate the observer.

use ahash::{HashMap, HashMapExt};
use tokio::sync::{mpsc, watch};

use crate::classify::{ClassificationError, ClassificationResult, Classifier};
use crate::page::MutationBatch;
use crate::pipeline::{normalize_text, CommentCandidate, DetectionPipeline};
use crate::settings::PipelineSettings;

/// Observation state, published on a watch channel for the host to inspect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Stopped,
    Observing,
}

/// Completed classification task flowing back into the watcher loop
struct TaskOutcome {
    candidate: CommentCandidate,
    outcome: Result<ClassificationResult, ClassificationError>,
}

/// Event-loop wrapper around a [`DetectionPipeline`]
///
/// All ledger/cache mutation happens inside `run`'s single task; classify
/// calls are spawned so independent candidates interleave, with their
/// results funneled back through the outcome channel.
pub struct MutationWatcher<C: Classifier + 'static> {
    pipeline: DetectionPipeline<C>,
    settings_rx: watch::Receiver<PipelineSettings>,
    mutations_rx: mpsc::Receiver<MutationBatch>,
    state_tx: watch::Sender<WatcherState>,
    outcomes_tx: mpsc::Sender<TaskOutcome>,
    outcomes_rx: mpsc::Receiver<TaskOutcome>,
    in_flight: usize,
    /// Candidates waiting on an in-flight call for the same normalized
    /// text; keeps identical text at exactly one network call
    pending: HashMap<String, Vec<CommentCandidate>>,
}

impl<C: Classifier + 'static> MutationWatcher<C> {
    pub fn new(
        pipeline: DetectionPipeline<C>,
        settings_rx: watch::Receiver<PipelineSettings>,
        mutations_rx: mpsc::Receiver<MutationBatch>,
    ) -> Self {
        let (state_tx, _) = watch::channel(WatcherState::Stopped);
        let (outcomes_tx, outcomes_rx) = mpsc::channel(256);
        Self {
            pipeline,
            settings_rx,
            mutations_rx,
            state_tx,
            outcomes_tx,
            outcomes_rx,
            in_flight: 0,
            pending: HashMap::new(),
        }
    }

    /// Handle for observing state transitions (e.g. from tests or a popup)
    pub fn state_receiver(&self) -> watch::Receiver<WatcherState> {
        self.state_tx.subscribe()
    }

    fn observing(&self) -> bool {
        *self.state_tx.borrow() == WatcherState::Observing
    }

    /// Run until the mutation channel closes and in-flight work drains.
    /// Dropping the settings store mid-run freezes the current state.
    pub async fn run(mut self) {
        // The gates may already allow observation before any change arrives
        self.apply_settings();

        let mut settings_open = true;
        let mut mutations_open = true;

        loop {
            tokio::select! {
                changed = self.settings_rx.changed(), if settings_open => match changed {
                    Ok(()) => self.apply_settings(),
                    Err(_) => settings_open = false,
                },

                batch = self.mutations_rx.recv(), if mutations_open => match batch {
                    Some(batch) => self.handle_batch(batch),
                    None => mutations_open = false,
                },

                Some(done) = self.outcomes_rx.recv(), if self.in_flight > 0 => {
                    self.finish(done);
                }
            }

            if !mutations_open && self.in_flight == 0 {
                break;
            }
        }

        tracing::info!("mutation watcher drained and shut down");
    }

    /// Re-evaluate the state machine against the current settings snapshot.
    /// Start while observing and stop while stopped are both no-ops.
    fn apply_settings(&mut self) {
        let settings = *self.settings_rx.borrow_and_update();
        let should_observe = settings.observation_allowed();

        if should_observe && !self.observing() {
            self.state_tx.send_replace(WatcherState::Observing);
            tracing::info!(
                platform = self.pipeline.platform().as_str(),
                "observation started"
            );
            self.sweep(&settings);
        } else if !should_observe && self.observing() {
            self.state_tx.send_replace(WatcherState::Stopped);
            tracing::info!("observation stopped");
        }
    }

    /// Full pass over everything currently on the page
    fn sweep(&mut self, settings: &PipelineSettings) {
        let root = self.pipeline.document_root();
        let candidates = self.pipeline.collect_candidates(&[root]);
        tracing::debug!("initial sweep found {} new candidates", candidates.len());
        self.dispatch(candidates, settings);
    }

    fn handle_batch(&mut self, batch: MutationBatch) {
        if !self.observing() {
            tracing::trace!("dropping mutation batch of {} while stopped", batch.added.len());
            return;
        }
        let settings = *self.settings_rx.borrow();
        let candidates = self.pipeline.collect_candidates(&batch.added);
        self.dispatch(candidates, &settings);
    }

    /// Dedup already happened in `collect_candidates`; here each candidate
    /// either resolves from cache immediately or gets its own classify task
    fn dispatch(&mut self, candidates: Vec<CommentCandidate>, settings: &PipelineSettings) {
        for candidate in candidates {
            if let Some(hit) = self.pipeline.cached(&candidate.text) {
                self.pipeline.complete(&candidate, hit, settings);
                continue;
            }

            let key = normalize_text(&candidate.text);
            if let Some(waiters) = self.pending.get_mut(&key) {
                // A call for this exact text is already in flight
                waiters.push(candidate);
                continue;
            }
            self.pending.insert(key, Vec::new());

            let request = self.pipeline.request_for(&candidate);
            let classifier = self.pipeline.classifier();
            let outcomes_tx = self.outcomes_tx.clone();
            self.in_flight += 1;
            tokio::spawn(async move {
                let outcome = classifier.classify(request).await;
                // Receiver lives as long as the watcher; a failed send just
                // means shutdown already won the race
                let _ = outcomes_tx.send(TaskOutcome { candidate, outcome }).await;
            });
        }
    }

    /// A classify task resolved; this may arrive after a stop, in which
    /// case the result still renders (defensively, possibly late)
    fn finish(&mut self, done: TaskOutcome) {
        self.in_flight -= 1;
        let settings = *self.settings_rx.borrow();
        let waiters = self
            .pending
            .remove(&normalize_text(&done.candidate.text))
            .unwrap_or_default();

        match done.outcome {
            Ok(result) => {
                for waiter in &waiters {
                    self.pipeline.complete(waiter, result.clone(), &settings);
                }
                self.pipeline.complete(&done.candidate, result, &settings);
            }
            Err(error) => {
                for waiter in &waiters {
                    self.pipeline.fail(waiter, &error);
                }
                self.pipeline.fail(&done.candidate, &error);
            }
        }
    }
}
