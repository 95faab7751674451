//! Staleness check between the image directory and the persisted index.
//!
//! The check is a file count comparison: it notices images being added or
//! removed, not an image replaced in place under the same total.

use std::path::Path;

use crate::semantic::builder::{count_images, IndexBuilder};
use crate::semantic::embeddings::Embedder;
use crate::semantic::service::SemanticSearchError;
use crate::semantic::storage::IndexStorage;

/// State of the persisted index relative to the image directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// Entry count matches the number of images on disk
    Fresh { entries: usize },
    /// No index yet, or one of its two files is absent
    Missing,
    /// Metadata exists but could not be read
    Unreadable(String),
    /// Image count and entry count differ
    Stale { on_disk: usize, indexed: usize },
}

impl Freshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Freshness::Fresh { .. })
    }
}

/// What [`refresh`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh {
    Unchanged { entries: usize },
    Rebuilt { reason: Freshness, entries: usize },
}

/// Compare the image count under `image_root` with the stored entry count.
pub fn check_freshness(
    image_root: &Path,
    storage: &IndexStorage,
) -> Result<Freshness, SemanticSearchError> {
    if !image_root.is_dir() {
        return Err(SemanticSearchError::ImageRootMissing(image_root.to_path_buf()));
    }

    if !storage.exists() {
        return Ok(Freshness::Missing);
    }

    let indexed = match storage.load_metadata() {
        Ok(metadata) => metadata.len(),
        Err(e) => return Ok(Freshness::Unreadable(e.to_string())),
    };

    let on_disk = count_images(image_root);
    if on_disk == indexed {
        Ok(Freshness::Fresh { entries: indexed })
    } else {
        Ok(Freshness::Stale { on_disk, indexed })
    }
}

/// Rebuild the index through `builder` unless it is fresh.
pub fn refresh<E: Embedder>(
    image_root: &Path,
    builder: &IndexBuilder<'_, E>,
) -> Result<Refresh, SemanticSearchError> {
    let reason = check_freshness(image_root, builder.storage())?;

    match &reason {
        Freshness::Fresh { entries } => {
            log::info!("Index is up to date ({} entries)", entries);
            return Ok(Refresh::Unchanged { entries: *entries });
        }
        Freshness::Missing => log::info!("No index found, building"),
        Freshness::Unreadable(e) => log::warn!("Index metadata unreadable ({}), rebuilding", e),
        Freshness::Stale { on_disk, indexed } => log::info!(
            "Image count changed (on disk: {}, indexed: {}), rebuilding",
            on_disk,
            indexed
        ),
    }

    let index = builder.build(image_root)?;
    Ok(Refresh::Rebuilt {
        reason,
        entries: index.len(),
    })
}

/// Make sure a usable index exists, rebuilding if needed.
///
/// Returns false when the image root is missing or a rebuild failed.
pub fn ensure_fresh<E: Embedder>(image_root: &Path, builder: &IndexBuilder<'_, E>) -> bool {
    match refresh(image_root, builder) {
        Ok(_) => true,
        Err(SemanticSearchError::ImageRootMissing(path)) => {
            log::error!("Image directory {} does not exist", path.display());
            false
        }
        Err(e) => {
            log::error!("Failed to rebuild index: {}", e);
            false
        }
    }
}
