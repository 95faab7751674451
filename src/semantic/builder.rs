//! Index construction from an image directory.
//!
//! Walks the image tree, derives one caption per file, embeds every caption
//! in a single batched call and persists the aligned result.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::semantic::caption::{extract_caption, is_image_file};
use crate::semantic::embeddings::Embedder;
use crate::semantic::index::{ImageIndex, IndexMetadata};
use crate::semantic::preprocess::TextNormalizer;
use crate::semantic::service::SemanticSearchError;
use crate::semantic::storage::IndexStorage;

/// One file that produced a usable caption.
#[derive(Debug, Clone, PartialEq)]
struct Captioned {
    path: String,
    text: String,
    raw_text: String,
}

/// List image files under `root`, recursively, in file-name order.
///
/// Unreadable directory entries are logged and skipped.
pub fn scan_images(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("skipping unreadable entry under {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_image_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Count image files under `root`, recursively.
pub fn count_images(root: &Path) -> usize {
    scan_images(root).len()
}

/// Path of `path` relative to `root`, `/` separated.
///
/// Returns `None` for paths outside `root` or with non UTF-8 components.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    Some(parts.join("/"))
}

/// Builds and persists the image index.
pub struct IndexBuilder<'a, E: Embedder> {
    embedder: &'a E,
    normalizer: &'a TextNormalizer,
    storage: &'a IndexStorage,
}

impl<'a, E: Embedder> IndexBuilder<'a, E> {
    pub fn new(embedder: &'a E, normalizer: &'a TextNormalizer, storage: &'a IndexStorage) -> Self {
        Self {
            embedder,
            normalizer,
            storage,
        }
    }

    pub fn storage(&self) -> &IndexStorage {
        self.storage
    }

    /// Rebuild the whole index from `image_root` and persist it.
    ///
    /// Files whose caption cannot be derived are skipped. If the embedding
    /// call fails nothing is written.
    pub fn build(&self, image_root: &Path) -> Result<ImageIndex, SemanticSearchError> {
        if !image_root.is_dir() {
            return Err(SemanticSearchError::ImageRootMissing(image_root.to_path_buf()));
        }

        let files = scan_images(image_root);
        log::info!("Found {} image files under {}", files.len(), image_root.display());

        let captioned = self.caption_files(image_root, &files);
        log::info!(
            "{} of {} files produced a caption",
            captioned.len(),
            files.len()
        );

        let mut metadata = IndexMetadata::new(Some(self.embedder.name().to_string()));
        for item in captioned {
            metadata.push(item.path, item.text, item.raw_text);
        }

        let rows = self.embed_texts(&metadata.texts)?;
        let index = ImageIndex::from_rows(rows, self.embedder.dimensions(), metadata)?;

        self.storage.save(&index)?;
        log::info!(
            "Saved index with {} entries to {}",
            index.len(),
            self.storage.dir().display()
        );

        Ok(index)
    }

    /// Extract and normalize captions in parallel, keeping file order.
    fn caption_files(&self, image_root: &Path, files: &[PathBuf]) -> Vec<Captioned> {
        let pb = ProgressBar::new(files.len() as u64)
            .with_style(progress_style())
            .with_message("Reading captions");

        let captioned: Vec<Option<Captioned>> = files
            .par_iter()
            .progress_with(pb.clone())
            .map(|path| self.caption_file(image_root, path))
            .collect();

        pb.finish_and_clear();

        captioned.into_iter().flatten().collect()
    }

    fn caption_file(&self, image_root: &Path, path: &Path) -> Option<Captioned> {
        let file_name = path.file_name()?;

        let raw_text = extract_caption(file_name);
        if raw_text.is_empty() {
            log::debug!("no caption for {}", path.display());
            return None;
        }

        let text = self.normalizer.normalize(&raw_text);
        if text.is_empty() {
            log::debug!("caption of {} is empty after normalization", path.display());
            return None;
        }

        let Some(relative) = relative_path(image_root, path) else {
            log::warn!("skipping {}: path is not valid UTF-8", path.display());
            return None;
        };

        Some(Captioned {
            path: relative,
            text,
            raw_text,
        })
    }

    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticSearchError> {
        let spinner = ProgressBar::new_spinner()
            .with_message(format!("Embedding {} captions", texts.len()));
        spinner.enable_steady_tick(Duration::from_millis(120));

        let result = self.embedder.embed_batch(texts);
        spinner.finish_and_clear();

        Ok(result?)
    }
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::preprocess::Passthrough;
    use crate::tests::support::{touch, CharEmbedder, FailingEmbedder};

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new(Box::new(Passthrough))
    }

    #[test]
    fn test_scan_images_filters_and_recurses() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b/0002_two.PNG");
        touch(dir.path(), "0001_one.jpg");
        touch(dir.path(), "c/d/three.jpeg");
        touch(dir.path(), "anim.gif");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "image.webp");

        let found: Vec<String> = scan_images(dir.path())
            .iter()
            .map(|p| relative_path(dir.path(), p).unwrap())
            .collect();

        assert_eq!(
            found,
            vec!["0001_one.jpg", "anim.gif", "b/0002_two.PNG", "c/d/three.jpeg"]
        );
        assert_eq!(count_images(dir.path()), 4);
    }

    #[test]
    fn test_relative_path_uses_forward_slashes() {
        let root = Path::new("/images");
        assert_eq!(
            relative_path(root, &root.join("a").join("b.png")),
            Some("a/b.png".to_string())
        );
        assert_eq!(relative_path(root, Path::new("/elsewhere/b.png")), None);
    }

    #[test]
    fn test_build_skips_empty_captions() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("pict");
        touch(&images, "0001_你好世界.png");
        touch(&images, "0002_.png");
        touch(&images, "0003_--.png");
        touch(&images, "sub/0004_再见.gif");

        let embedder = CharEmbedder::default();
        let normalizer = normalizer();
        let storage = IndexStorage::new(dir.path().join("index"));
        let index = IndexBuilder::new(&embedder, &normalizer, &storage)
            .build(&images)
            .unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.metadata().paths, vec!["0001_你好世界.png", "sub/0004_再见.gif"]);
        assert_eq!(index.metadata().texts, vec!["你好世界", "再见"]);
        assert_eq!(index.model(), Some(embedder.name()));

        for (i, text) in index.metadata().texts.iter().enumerate() {
            let expected = embedder.embed(text).unwrap();
            assert_eq!(index.entry(i).unwrap().vector.to_vec(), expected);
        }

        assert!(storage.exists());
        assert_eq!(storage.load().unwrap().len(), 2);
    }

    #[test]
    fn test_build_keeps_raw_and_normalized_text() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0001_hello_big-world.png");

        let embedder = CharEmbedder::default();
        let normalizer = normalizer();
        let storage = IndexStorage::new(dir.path().join("index"));
        let index = IndexBuilder::new(&embedder, &normalizer, &storage)
            .build(dir.path())
            .unwrap();

        let entry = index.entry(0).unwrap();
        assert_eq!(entry.raw_text, "hello_big-world");
        assert_eq!(entry.text, "hello big world");
    }

    #[test]
    fn test_build_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = CharEmbedder::default();
        let normalizer = normalizer();
        let storage = IndexStorage::new(dir.path().join("index"));

        let result = IndexBuilder::new(&embedder, &normalizer, &storage).build(&dir.path().join("nope"));
        assert!(matches!(result, Err(SemanticSearchError::ImageRootMissing(_))));
        assert!(!storage.exists());
    }

    #[test]
    fn test_embedding_failure_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0001_a.png");

        let normalizer = normalizer();
        let storage = IndexStorage::new(dir.path().join("index"));
        let result = IndexBuilder::new(&FailingEmbedder, &normalizer, &storage).build(dir.path());

        assert!(matches!(result, Err(SemanticSearchError::Embedding(_))));
        assert!(!storage.metadata_exists());
    }
}
