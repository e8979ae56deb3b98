//! Editor session: owns the published [`EditorState`] and wires the submit
//! action to an [`ImageModel`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::editor::{next_synthetic_progress, EditorState, Tab};
use crate::error::CoreError;
use crate::generation::{
    generate, GenerationRequest, GenerationResult, ImageModel, MSG_GENERATION_FAILED,
};
use crate::pipeline::{BatchId, PreviewPipeline};
use crate::upload::{accept_batch, FileRejection, SelectedFile};

/// Default period between synthetic progress ticks.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

type StateSender = Arc<watch::Sender<Arc<EditorState>>>;

/// What happened to one drop.
#[derive(Debug, Clone, Default)]
pub struct DropOutcome {
    /// Batch id given to the drop.
    pub batch_id: BatchId,
    /// Whether the batch replaced the selection. `false` when a newer drop
    /// superseded this one.
    pub applied: bool,
    pub rejections: Vec<FileRejection>,
}

pub struct EditorSession {
    state: StateSender,
    pipeline: PreviewPipeline,
    model: Arc<dyn ImageModel>,
    progress_interval: Duration,
}

impl EditorSession {
    pub fn new(model: Arc<dyn ImageModel>) -> Self {
        Self::with_pipeline(model, PreviewPipeline::new())
    }

    pub fn with_pipeline(model: Arc<dyn ImageModel>, pipeline: PreviewPipeline) -> Self {
        let (state, _) = watch::channel(Arc::new(EditorState::default()));
        Self {
            state: Arc::new(state),
            pipeline,
            model,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<EditorState> {
        Arc::clone(&self.state.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<EditorState>> {
        self.state.subscribe()
    }

    pub fn select_tab(&self, tab: Tab) {
        transition(&self.state, |s| s.with_tab(tab));
    }

    pub fn set_prompt(&self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        transition(&self.state, |s| s.with_prompt(prompt));
    }

    /// Accept a dropped set of files and, once every preview has settled,
    /// replace the selection with it.
    ///
    /// Every drop is a new batch. A drop where nothing passes acceptance
    /// clears the selection and supersedes any batch still decoding.
    pub async fn drop_files(&self, files: Vec<SelectedFile>) -> DropOutcome {
        let batch = accept_batch(files);
        if batch.accepted.is_empty() {
            tracing::debug!(rejected = batch.rejections.len(), "Drop accepted no files");
        }

        let handle = self.pipeline.submit(batch.accepted);
        let batch_id = handle.batch_id;
        let applied = match handle.settled().await {
            Some(set) => {
                let mut applied = false;
                self.state.send_if_modified(|s| {
                    if set.batch_id < s.selection.batch_id {
                        return false;
                    }
                    *s = Arc::new(s.with_selection(Arc::clone(&set)));
                    applied = true;
                    true
                });
                applied
            }
            None => false,
        };

        DropOutcome {
            batch_id,
            applied,
            rejections: batch.rejections,
        }
    }

    /// Run the submit action.
    ///
    /// Fails with a validation error, without contacting the model, when the
    /// submit gate is closed. Otherwise the model is called exactly once and
    /// the outcome is recorded on the snapshot and returned. Upstream error
    /// details are logged, never surfaced.
    pub async fn submit(&self) -> Result<GenerationResult, CoreError> {
        let request = self.begin_submit()?;

        let cancel = CancellationToken::new();
        let ticker = tokio::spawn(tick_progress(
            Arc::clone(&self.state),
            self.progress_interval,
            cancel.clone(),
        ));

        tracing::info!(
            model = self.model.name(),
            images = request.image_input.len(),
            "Submitting generation request",
        );
        let result = match generate(self.model.as_ref(), &request).await {
            Ok(output) => {
                tracing::info!(%output, "Generation succeeded");
                GenerationResult::Success { output }
            }
            Err(err) => {
                tracing::error!(error = %err, "Generation failed");
                GenerationResult::Failure {
                    message: MSG_GENERATION_FAILED.to_string(),
                }
            }
        };

        cancel.cancel();
        if let Err(err) = ticker.await {
            tracing::warn!(error = %err, "Progress ticker did not stop cleanly");
        }

        let finished = result.clone();
        transition(&self.state, move |s| s.finish_processing(finished));
        Ok(result)
    }

    /// Check the gate and mark the session as processing in one step, so two
    /// concurrent submits cannot both pass.
    fn begin_submit(&self) -> Result<GenerationRequest, CoreError> {
        let mut outcome = Err(CoreError::Validation(
            "Submit is not available in the current state".to_string(),
        ));
        self.state.send_if_modified(|s| {
            if !s.can_submit() {
                return false;
            }
            outcome = s.to_generation_request();
            if outcome.is_err() {
                return false;
            }
            *s = Arc::new(s.begin_processing());
            true
        });
        outcome
    }
}

fn transition(state: &StateSender, f: impl FnOnce(&EditorState) -> EditorState) {
    state.send_modify(|s| *s = Arc::new(f(s)));
}

async fn tick_progress(state: StateSender, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately.
    interval.tick().await;
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                transition(&state, |s| s.with_progress(next_synthetic_progress(s.progress)));
            }
        }
    }
}
