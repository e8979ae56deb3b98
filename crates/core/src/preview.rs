//! Decoding a selected file into a displayable data-URI preview.
//!
//! The real format is sniffed from the bytes rather than trusted from the
//! declared media type, and only the header is parsed to obtain dimensions.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::ImageReader;
use serde::Serialize;

use crate::error::CoreError;
use crate::upload::{SelectedFile, ACCEPTED_MIME_TYPES};

/// A self-contained preview of an image, usable directly as a display source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewRepresentation {
    /// `data:<media type>;base64,<payload>`.
    pub data_uri: String,
    /// Media type sniffed from the image bytes.
    pub media_type: String,
    pub width: u32,
    pub height: u32,
}

/// Per-file decode result. A batch keeps one outcome per input file, so a
/// failed decode never shifts the position of the files after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PreviewOutcome {
    Ready(PreviewRepresentation),
    Failed { reason: String },
}

impl PreviewOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PreviewOutcome::Ready(_))
    }

    pub fn data_uri(&self) -> Option<&str> {
        match self {
            PreviewOutcome::Ready(preview) => Some(&preview.data_uri),
            PreviewOutcome::Failed { .. } => None,
        }
    }
}

impl From<Result<PreviewRepresentation, CoreError>> for PreviewOutcome {
    fn from(result: Result<PreviewRepresentation, CoreError>) -> Self {
        match result {
            Ok(preview) => PreviewOutcome::Ready(preview),
            Err(err) => PreviewOutcome::Failed {
                reason: err.to_string(),
            },
        }
    }
}

/// Encode raw bytes as a base64 data URI.
pub fn to_data_uri(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{media_type};base64,{}", STANDARD.encode(bytes))
}

/// Decode a selected file into its preview representation.
///
/// Fails when the bytes are not a recognisable image, when the sniffed
/// format is not one the editor accepts, or when the header is corrupt.
pub fn decode_preview(file: &SelectedFile) -> Result<PreviewRepresentation, CoreError> {
    let format = image::guess_format(&file.bytes).map_err(|e| {
        CoreError::Validation(format!("{}: unrecognised image data ({e})", file.name))
    })?;

    let media_type = format.to_mime_type();
    if !ACCEPTED_MIME_TYPES.contains(&media_type) {
        return Err(CoreError::Validation(format!(
            "{}: unsupported image format {media_type}",
            file.name
        )));
    }
    if !file.media_type.eq_ignore_ascii_case(media_type) {
        tracing::debug!(
            file = %file.name,
            declared = %file.media_type,
            sniffed = media_type,
            "Declared media type differs from image content",
        );
    }

    let (width, height) = ImageReader::with_format(Cursor::new(&file.bytes[..]), format)
        .into_dimensions()
        .map_err(|e| CoreError::Validation(format!("{}: corrupt image header ({e})", file.name)))?;

    Ok(PreviewRepresentation {
        data_uri: to_data_uri(media_type, &file.bytes),
        media_type: media_type.to_string(),
        width,
        height,
    })
}
