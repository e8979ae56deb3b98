//! Editor state as an immutable snapshot.
//!
//! Every transition returns a new [`EditorState`]; the session replaces the
//! published snapshot atomically, so readers always see a selection whose
//! files and previews agree.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::generation::{GenerationRequest, GenerationResult, MSG_PROMPT_REQUIRED};
use crate::pipeline::PreviewSet;

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

/// Editor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    /// Edit the uploaded images with a prompt.
    #[default]
    Edit,
    /// Generate a new image from a prompt alone.
    Generate,
}

impl Tab {
    pub fn title(self) -> &'static str {
        match self {
            Tab::Edit => "Upload & Edit",
            Tab::Generate => "Generate Image",
        }
    }

    pub fn prompt_label(self) -> &'static str {
        match self {
            Tab::Edit => "Editing Prompt",
            Tab::Generate => "Generation Prompt",
        }
    }
}

// ---------------------------------------------------------------------------
// Synthetic progress
// ---------------------------------------------------------------------------

/// Amount the synthetic progress advances per tick.
pub const SYNTHETIC_PROGRESS_STEP: u8 = 10;
/// Synthetic progress never passes this value until the request finishes.
pub const SYNTHETIC_PROGRESS_CEILING: u8 = 90;

/// Cosmetic phase shown next to the progress bar. It does not reflect any
/// real signal from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Uploading,
    Processing,
    Generating,
    AlmostDone,
}

impl ProgressPhase {
    pub fn from_progress(progress: u8) -> Self {
        match progress {
            0..=29 => ProgressPhase::Uploading,
            30..=59 => ProgressPhase::Processing,
            60..=89 => ProgressPhase::Generating,
            _ => ProgressPhase::AlmostDone,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProgressPhase::Uploading => "Uploading image...",
            ProgressPhase::Processing => "Processing with nano-banana...",
            ProgressPhase::Generating => "Generating result...",
            ProgressPhase::AlmostDone => "Almost done...",
        }
    }
}

/// Next synthetic progress value after one tick.
pub fn next_synthetic_progress(progress: u8) -> u8 {
    progress
        .saturating_add(SYNTHETIC_PROGRESS_STEP)
        .min(SYNTHETIC_PROGRESS_CEILING)
        .max(progress)
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorState {
    pub tab: Tab,
    /// Selected files together with their previews.
    pub selection: Arc<PreviewSet>,
    pub prompt: String,
    pub processing: bool,
    /// Synthetic progress, 0..=100.
    pub progress: u8,
    pub last_result: Option<GenerationResult>,
}

impl EditorState {
    pub fn with_tab(&self, tab: Tab) -> Self {
        Self {
            tab,
            ..self.clone()
        }
    }

    pub fn with_prompt(&self, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..self.clone()
        }
    }

    /// Replace the selection, unless `selection` is older than the current one.
    pub fn with_selection(&self, selection: Arc<PreviewSet>) -> Self {
        if selection.batch_id < self.selection.batch_id {
            return self.clone();
        }
        Self {
            selection,
            ..self.clone()
        }
    }

    pub fn begin_processing(&self) -> Self {
        Self {
            processing: true,
            progress: 0,
            last_result: None,
            ..self.clone()
        }
    }

    /// Set synthetic progress. Ignored when not processing.
    pub fn with_progress(&self, progress: u8) -> Self {
        if !self.processing {
            return self.clone();
        }
        Self {
            progress: progress.min(100),
            ..self.clone()
        }
    }

    pub fn finish_processing(&self, result: GenerationResult) -> Self {
        Self {
            processing: false,
            progress: 100,
            last_result: Some(result),
            ..self.clone()
        }
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    /// Whether the submit action is enabled.
    ///
    /// Edit mode needs at least one selected file and a non-blank prompt;
    /// generate mode needs only the prompt. Never enabled while processing.
    pub fn can_submit(&self) -> bool {
        if self.processing || self.prompt.trim().is_empty() {
            return false;
        }
        match self.tab {
            Tab::Edit => self.selected_count() > 0,
            Tab::Generate => true,
        }
    }

    /// Phase label for the progress bar, shown only while processing.
    pub fn progress_phase(&self) -> Option<ProgressPhase> {
        self.processing
            .then(|| ProgressPhase::from_progress(self.progress))
    }

    pub fn submit_label(&self) -> String {
        if self.processing {
            return "Processing...".to_string();
        }
        match self.tab {
            Tab::Edit if self.selected_count() > 0 => {
                format!("Edit {} Image(s)", self.selected_count())
            }
            Tab::Edit => "Edit Images".to_string(),
            Tab::Generate => "Generate Image".to_string(),
        }
    }

    /// Build the request the submit action sends.
    ///
    /// In edit mode every preview that decoded successfully is attached as an
    /// input image.
    pub fn to_generation_request(&self) -> Result<GenerationRequest, CoreError> {
        if self.prompt.trim().is_empty() {
            return Err(CoreError::Validation(MSG_PROMPT_REQUIRED.to_string()));
        }
        let request = GenerationRequest::new(Some(&self.prompt))?;
        Ok(match self.tab {
            Tab::Edit => request.with_images(self.selection.ready_data_uris()),
            Tab::Generate => request,
        })
    }
}
