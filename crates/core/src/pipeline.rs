//! Asynchronous batch preview pipeline.
//!
//! Every accepted batch is tagged with a batch id drawn from a monotonically
//! increasing counter. Each file in the batch is decoded on the blocking pool
//! concurrently; the outcomes are joined positionally (never in completion
//! order) and the whole [`PreviewSet`] is published in one step through a
//! [`watch`] channel. A batch that is no longer the latest submitted one when
//! it settles is discarded, so a slow stale batch can never overwrite a newer
//! selection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::CoreError;
use crate::preview::{decode_preview, PreviewOutcome, PreviewRepresentation};
use crate::upload::SelectedFile;

/// Identifier of one submitted batch. `0` is the empty initial selection.
pub type BatchId = u64;

/// Function used to turn a file into its preview.
pub type Decoder =
    Arc<dyn Fn(&SelectedFile) -> Result<PreviewRepresentation, CoreError> + Send + Sync>;

/// The selection and its previews, published as a single unit.
///
/// `files` and `previews` always have the same length and order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewSet {
    pub batch_id: BatchId,
    pub files: Vec<SelectedFile>,
    pub previews: Vec<PreviewOutcome>,
}

impl PreviewSet {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Data URIs of every preview that decoded successfully, in order.
    pub fn ready_data_uris(&self) -> Vec<String> {
        self.previews
            .iter()
            .filter_map(|p| p.data_uri().map(str::to_string))
            .collect()
    }
}

/// Decode every file of a batch concurrently and return one outcome per
/// file, in input order.
///
/// A decode task that panics yields a `Failed` outcome at its own index.
pub async fn decode_batch(files: &[SelectedFile], decoder: &Decoder) -> Vec<PreviewOutcome> {
    let tasks: Vec<_> = files
        .iter()
        .cloned()
        .map(|file| {
            let decoder = Arc::clone(decoder);
            tokio::task::spawn_blocking(move || decoder(&file))
        })
        .collect();

    join_all(tasks)
        .await
        .into_iter()
        .enumerate()
        .map(|(index, joined)| match joined {
            Ok(result) => PreviewOutcome::from(result),
            Err(err) => {
                tracing::error!(index, error = %err, "Preview decode task failed");
                PreviewOutcome::Failed {
                    reason: "Preview decode task failed".to_string(),
                }
            }
        })
        .collect()
}

struct Inner {
    decoder: Decoder,
    latest: AtomicU64,
    published: watch::Sender<Arc<PreviewSet>>,
}

/// Publishes the preview set of the most recently submitted batch.
///
/// Cheap to clone; clones share the same counter and channel.
#[derive(Clone)]
pub struct PreviewPipeline {
    inner: Arc<Inner>,
}

/// Handle to a batch submitted with [`PreviewPipeline::submit`].
pub struct BatchHandle {
    pub batch_id: BatchId,
    task: JoinHandle<Option<Arc<PreviewSet>>>,
}

impl BatchHandle {
    /// Wait for the batch to settle.
    ///
    /// Returns the published set, or `None` if the batch was superseded
    /// before it finished decoding.
    pub async fn settled(self) -> Option<Arc<PreviewSet>> {
        match self.task.await {
            Ok(set) => set,
            Err(err) => {
                tracing::error!(batch_id = self.batch_id, error = %err, "Preview batch task failed");
                None
            }
        }
    }
}

impl Default for PreviewPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewPipeline {
    /// Create a pipeline that decodes with [`decode_preview`].
    pub fn new() -> Self {
        Self::with_decoder(Arc::new(decode_preview))
    }

    pub fn with_decoder(decoder: Decoder) -> Self {
        let (published, _) = watch::channel(Arc::new(PreviewSet::default()));
        Self {
            inner: Arc::new(Inner {
                decoder,
                latest: AtomicU64::new(0),
                published,
            }),
        }
    }

    pub fn decoder(&self) -> &Decoder {
        &self.inner.decoder
    }

    /// Subscribe to published preview sets.
    pub fn subscribe(&self) -> watch::Receiver<Arc<PreviewSet>> {
        self.inner.published.subscribe()
    }

    /// The most recently published set.
    pub fn current(&self) -> Arc<PreviewSet> {
        Arc::clone(&self.inner.published.borrow())
    }

    /// Id of the most recently submitted batch (published or not).
    pub fn latest_batch(&self) -> BatchId {
        self.inner.latest.load(Ordering::SeqCst)
    }

    /// Submit a new batch, superseding any batch still in flight.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, files: Vec<SelectedFile>) -> BatchHandle {
        let batch_id = self.inner.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        tracing::debug!(batch_id, files = files.len(), "Preview batch submitted");

        let task = tokio::spawn(async move {
            let previews = decode_batch(&files, &inner.decoder).await;
            let set = Arc::new(PreviewSet {
                batch_id,
                files,
                previews,
            });

            let published = inner.published.send_if_modified(|current| {
                if inner.latest.load(Ordering::SeqCst) != batch_id || current.batch_id > batch_id {
                    return false;
                }
                *current = Arc::clone(&set);
                true
            });

            if published {
                tracing::debug!(batch_id, "Preview batch published");
                Some(set)
            } else {
                tracing::debug!(batch_id, "Discarding stale preview batch");
                None
            }
        });

        BatchHandle { batch_id, task }
    }
}
