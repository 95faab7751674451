use std::path::{Path, PathBuf};

use crate::semantic::embeddings::{Embedder, EmbeddingError};

/// Create an empty file (and its parent directories) under `root`.
pub fn touch(root: &Path, relative: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("failed to create parent dir");
    }
    std::fs::write(&path, b"").expect("failed to create file");
    path
}

/// Deterministic embedder: a character histogram, one bucket per code point
/// modulo the dimension count. Texts sharing characters score higher, and
/// identical texts score exactly 1.0.
pub struct CharEmbedder {
    dimensions: usize,
}

impl Default for CharEmbedder {
    fn default() -> Self {
        Self { dimensions: 256 }
    }
}

impl Embedder for CharEmbedder {
    fn name(&self) -> &str {
        "char-histogram"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0; self.dimensions];
                for c in text.chars() {
                    vector[c as usize % self.dimensions] += 1.0;
                }
                vector
            })
            .collect())
    }
}

/// Embedder whose every call fails.
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::EmbeddingFailed("model unavailable".to_string()))
    }
}
