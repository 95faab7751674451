//! Caption extraction from image filenames.
//!
//! Screenshot libraries name files after the line of dialogue they show,
//! optionally prefixed with a four character ordinal:
//!
//! - `0007_caption text.png` -> `caption text`
//! - `0012-another line.jpg` -> `another line`
//! - `caption.png` -> `caption`

use std::path::Path;

/// Separators that may follow an ordinal prefix, checked in this order.
const ORDINAL_SEPARATORS: [char; 2] = ['_', '-'];

/// Width of an ordinal prefix in ASCII digits.
const ORDINAL_WIDTH: usize = 4;

/// Image extensions eligible for indexing (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

#[derive(Debug, thiserror::Error)]
pub enum CaptionError {
    #[error("file name has no stem: {0}")]
    NoStem(String),

    #[error("file name is not valid UTF-8: {0}")]
    InvalidUtf8(String),
}

/// Check whether a path has one of the indexed image extensions.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Derive a caption from a file name.
///
/// Returns an empty string when the name cannot be parsed; callers treat an
/// empty caption as "skip this file".
pub fn extract_caption(file_name: impl AsRef<Path>) -> String {
    let file_name = file_name.as_ref();
    match try_extract_caption(file_name) {
        Ok(caption) => caption,
        Err(e) => {
            log::warn!("failed to parse file name {}: {}", file_name.display(), e);
            String::new()
        }
    }
}

/// Derive a caption from a file name, reporting why parsing failed.
pub fn try_extract_caption(file_name: &Path) -> Result<String, CaptionError> {
    let stem = file_name
        .file_stem()
        .ok_or_else(|| CaptionError::NoStem(file_name.display().to_string()))?;
    let stem = stem
        .to_str()
        .ok_or_else(|| CaptionError::InvalidUtf8(file_name.display().to_string()))?;

    Ok(strip_ordinal_prefix(stem).unwrap_or(stem).to_string())
}

/// Return the text after a `NNNN_` / `NNNN-` prefix, trimmed.
///
/// A qualifying prefix is exactly four ASCII digits, so only the
/// separator sitting right after them can match; the check order of `_` and
/// `-` never changes the outcome for names containing both.
fn strip_ordinal_prefix(stem: &str) -> Option<&str> {
    ORDINAL_SEPARATORS.iter().find_map(|sep| {
        let (prefix, rest) = stem.split_once(*sep)?;
        let is_ordinal =
            prefix.len() == ORDINAL_WIDTH && prefix.chars().all(|c| c.is_ascii_digit());
        is_ordinal.then(|| rest.trim())
    })
}
