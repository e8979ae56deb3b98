//! Acceptance rules for dropped or selected image files.
//!
//! Files that fail these checks are rejected here and never reach the
//! preview pipeline. A batch that accepts more than
//! [`MAX_FILES_PER_BATCH`] files is rejected as a whole, mirroring the
//! drop-zone behaviour the editor front end relies on.

use std::sync::Arc;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum number of files accepted from a single drop.
pub const MAX_FILES_PER_BATCH: usize = 5;
/// Maximum size of a single file (10 MiB).
pub const MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Media types accepted by the drop surface.
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];
/// File extensions accepted by the drop surface (lowercase, without dot).
pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

// ---------------------------------------------------------------------------
// Rejection codes
// ---------------------------------------------------------------------------

pub const REJECT_INVALID_TYPE: &str = "file-invalid-type";
pub const REJECT_TOO_LARGE: &str = "file-too-large";
pub const REJECT_EMPTY: &str = "file-empty";
pub const REJECT_TOO_MANY: &str = "too-many-files";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A user-provided image blob.
///
/// Bytes are shared so the same file can sit in the editor selection and be
/// handed to a decode task without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Size of the file in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Lowercase file extension, if the name has one.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Why a single file was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRejection {
    /// Position of the file in the dropped set.
    pub index: usize,
    pub file_name: String,
    pub code: &'static str,
    pub message: String,
}

/// Result of applying the acceptance rules to one drop.
#[derive(Debug, Clone, Default)]
pub struct AcceptedBatch {
    /// Files that passed every check, in drop order.
    pub accepted: Vec<SelectedFile>,
    pub rejections: Vec<FileRejection>,
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Whether a declared media type is one of [`ACCEPTED_MIME_TYPES`].
///
/// Parameters such as `; charset=` are ignored and the comparison is
/// case-insensitive.
pub fn is_accepted_media_type(media_type: &str) -> bool {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ACCEPTED_MIME_TYPES.contains(&essence.as_str())
}

/// Check a single file against the type and size rules.
pub fn check_file(file: &SelectedFile) -> Result<(), (&'static str, String)> {
    let extension_ok = file
        .extension()
        .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()));
    if !is_accepted_media_type(&file.media_type) || !extension_ok {
        return Err((
            REJECT_INVALID_TYPE,
            format!(
                "File type must be one of {}",
                ACCEPTED_EXTENSIONS
                    .iter()
                    .map(|ext| format!(".{ext}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ));
    }
    if file.size() == 0 {
        return Err((REJECT_EMPTY, "File is empty".to_string()));
    }
    if file.size() > MAX_FILE_SIZE_BYTES {
        return Err((
            REJECT_TOO_LARGE,
            format!("File is larger than {MAX_FILE_SIZE_BYTES} bytes"),
        ));
    }
    Ok(())
}

/// Apply the acceptance rules to a dropped set of files.
///
/// Each file is checked individually first. If more than
/// [`MAX_FILES_PER_BATCH`] files survive, every one of them is rejected
/// with [`REJECT_TOO_MANY`] and nothing is accepted.
pub fn accept_batch(files: Vec<SelectedFile>) -> AcceptedBatch {
    let mut batch = AcceptedBatch::default();
    let mut passed: Vec<(usize, SelectedFile)> = Vec::new();

    for (index, file) in files.into_iter().enumerate() {
        match check_file(&file) {
            Ok(()) => passed.push((index, file)),
            Err((code, message)) => batch.rejections.push(FileRejection {
                index,
                file_name: file.name,
                code,
                message,
            }),
        }
    }

    if passed.len() > MAX_FILES_PER_BATCH {
        for (index, file) in passed {
            batch.rejections.push(FileRejection {
                index,
                file_name: file.name,
                code: REJECT_TOO_MANY,
                message: format!("At most {MAX_FILES_PER_BATCH} files can be selected at once"),
            });
        }
        batch.rejections.sort_by_key(|r| r.index);
        return batch;
    }

    batch.accepted = passed.into_iter().map(|(_, file)| file).collect();
    batch
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
