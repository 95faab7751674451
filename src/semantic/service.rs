//! Semantic search over the persisted image index.
//!
//! A [`Searcher`] owns the loaded index and the embedding model for its whole
//! lifetime; both are loaded once and reused for every query.

use std::path::PathBuf;

use serde::Serialize;

use crate::semantic::embeddings::{Embedder, EmbeddingError};
use crate::semantic::index::{ImageIndex, IndexError};
use crate::semantic::preprocess::{ConversionError, TextNormalizer};
use crate::semantic::storage::{IndexStorage, IndexStorageError};

/// Errors that can occur during semantic search operations.
#[derive(Debug, thiserror::Error)]
pub enum SemanticSearchError {
    #[error("Image directory not found: {0}")]
    ImageRootMissing(PathBuf),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Storage error: {0}")]
    Storage(#[from] IndexStorageError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Index was built with model '{index}', but '{model}' is loaded")]
    ModelMismatch { index: String, model: String },

    #[error("Query is empty")]
    EmptyQuery,
}

/// One ranked image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Cosine similarity with the query (-1.0 to 1.0)
    pub score: f32,
    /// Normalized caption
    pub text: String,
    /// Image path with the image root applied
    pub path: PathBuf,
    /// Caption for display, underscores removed
    pub raw_text: String,
}

/// Query handle over a loaded index.
pub struct Searcher<E: Embedder> {
    index: ImageIndex,
    model: E,
    normalizer: TextNormalizer,
    image_root: PathBuf,
}

impl<E: Embedder> Searcher<E> {
    /// Load the persisted index and bind it to `model`.
    ///
    /// Fails if either artifact is missing or malformed, or if the index was
    /// produced by a different model.
    pub fn load(
        storage: &IndexStorage,
        image_root: PathBuf,
        model: E,
        normalizer: TextNormalizer,
    ) -> Result<Self, SemanticSearchError> {
        let index = storage.load()?;
        log::info!("Loaded {} index entries from {}", index.len(), storage.dir().display());
        Self::from_index(index, image_root, model, normalizer)
    }

    /// Bind an in-memory index to `model`.
    pub fn from_index(
        index: ImageIndex,
        image_root: PathBuf,
        model: E,
        normalizer: TextNormalizer,
    ) -> Result<Self, SemanticSearchError> {
        if let Some(index_model) = index.model() {
            if !index_model.eq_ignore_ascii_case(model.name()) {
                return Err(SemanticSearchError::ModelMismatch {
                    index: index_model.to_string(),
                    model: model.name().to_string(),
                });
            }
        }

        if index.dimensions() != model.dimensions() {
            return Err(IndexStorageError::Malformed(format!(
                "index vectors have {} dimensions, model '{}' produces {}",
                index.dimensions(),
                model.name(),
                model.dimensions()
            ))
            .into());
        }

        Ok(Self {
            index,
            model,
            normalizer,
            image_root,
        })
    }

    /// Get the number of indexed entries.
    pub fn indexed_count(&self) -> usize {
        self.index.len()
    }

    /// Search for the images whose captions best match `query`.
    ///
    /// Errors are logged and yield no results so an interactive session can
    /// carry on; use [`Searcher::try_search`] to observe them.
    pub fn search(&self, query: &str, top_k: usize, threshold: Option<f32>) -> Vec<SearchResult> {
        match self.try_search(query, top_k, threshold) {
            Ok(results) => results,
            Err(e) => {
                log::error!("Search for {:?} failed: {}", query, e);
                Vec::new()
            }
        }
    }

    /// Search and report failures.
    ///
    /// Returns the `top_k` best entries in descending score order. With a
    /// `threshold`, entries scoring below it are dropped; without one the
    /// `top_k` entries are returned whatever their score.
    pub fn try_search(
        &self,
        query: &str,
        top_k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<SearchResult>, SemanticSearchError> {
        let query_text = self.query_text(query)?;

        if self.index.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.model.embed(&query_text)?;

        let results = self
            .index
            .rank(&query_embedding)?
            .take(top_k)
            .take_while(|ranked| threshold.map_or(true, |t| ranked.score >= t))
            .filter_map(|ranked| {
                let entry = self.index.entry(ranked.position)?;
                Some(SearchResult {
                    score: ranked.score,
                    text: entry.text.to_string(),
                    path: self.resolve(entry.path),
                    raw_text: entry.raw_text.replace('_', ""),
                })
            })
            .collect();

        Ok(results)
    }

    /// Normalize a query the same way captions were normalized.
    fn query_text(&self, query: &str) -> Result<String, SemanticSearchError> {
        let normalized = self.normalizer.normalize(query);
        if !normalized.is_empty() {
            return Ok(normalized);
        }

        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(SemanticSearchError::EmptyQuery);
        }
        Ok(trimmed.to_string())
    }

    /// Join a stored `/` separated relative path onto the image root.
    fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.image_root.clone(), |path, part| path.join(part))
    }
}
