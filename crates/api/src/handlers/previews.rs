//! Handler that turns an uploaded batch of images into previews.

use std::collections::HashSet;

use axum::extract::{Multipart, State};
use axum::Json;
use imagecraft_core::pipeline::decode_batch;
use imagecraft_core::preview::PreviewOutcome;
use imagecraft_core::upload::{accept_batch, FileRejection, SelectedFile};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Media type assumed for parts that do not declare one.
const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// One accepted file and its decode outcome.
#[derive(Debug, Serialize)]
pub struct PreviewEntry {
    /// Position of the file in the upload.
    pub index: usize,
    pub file_name: String,
    pub size: usize,
    #[serde(flatten)]
    pub outcome: PreviewOutcome,
}

#[derive(Debug, Serialize)]
pub struct PreviewBatch {
    /// Accepted files in upload order.
    pub previews: Vec<PreviewEntry>,
    pub rejections: Vec<FileRejection>,
}

/// POST /api/v1/previews
///
/// Accept a multipart upload of images, apply the acceptance rules, and
/// decode every accepted file into a data-URI preview. A file that fails to
/// decode is reported in place with `status: "failed"`.
pub async fn create_previews(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<PreviewBatch>>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        // Plain form fields carry no file name.
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let media_type = field
            .content_type()
            .unwrap_or(FALLBACK_MEDIA_TYPE)
            .to_string();

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        files.push(SelectedFile::new(name, media_type, data.to_vec()));
    }

    if files.is_empty() {
        return Err(AppError::BadRequest(
            "No files received in multipart upload".to_string(),
        ));
    }

    let received = files.len();
    let batch = accept_batch(files);
    let rejected: HashSet<usize> = batch.rejections.iter().map(|r| r.index).collect();
    let accepted_indices: Vec<usize> = (0..received).filter(|i| !rejected.contains(i)).collect();

    let outcomes = decode_batch(&batch.accepted, &state.preview_decoder).await;

    let previews: Vec<PreviewEntry> = accepted_indices
        .into_iter()
        .zip(batch.accepted.iter().zip(outcomes))
        .map(|(index, (file, outcome))| PreviewEntry {
            index,
            file_name: file.name.clone(),
            size: file.size(),
            outcome,
        })
        .collect();

    tracing::info!(
        received,
        accepted = previews.len(),
        ready = previews.iter().filter(|p| p.outcome.is_ready()).count(),
        rejected = batch.rejections.len(),
        "Previews created",
    );

    Ok(Json(DataResponse {
        data: PreviewBatch {
            previews,
            rejections: batch.rejections,
        },
    }))
}
