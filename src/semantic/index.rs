//! In-memory image index with cosine similarity ranking.
//!
//! Vectors and caption metadata are kept as parallel sequences aligned by
//! position; row `i` of the vector matrix belongs to `paths[i]`, `texts[i]`
//! and `raw_texts[i]`.

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Caption and path metadata persisted next to the vectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Image paths relative to the image root, `/` separated
    pub paths: Vec<String>,
    /// Normalized captions that were embedded
    pub texts: Vec<String>,
    /// Captions as extracted from the file names
    pub raw_texts: Vec<String>,
    /// Name of the embedding model that produced the vectors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl IndexMetadata {
    pub fn new(model: Option<String>) -> Self {
        Self {
            model,
            ..Default::default()
        }
    }

    /// Number of entries, as counted by `paths`.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn push(&mut self, path: String, text: String, raw_text: String) {
        self.paths.push(path);
        self.texts.push(text);
        self.raw_texts.push(raw_text);
    }

    /// All three arrays have the same length.
    pub fn is_aligned(&self) -> bool {
        self.paths.len() == self.texts.len() && self.paths.len() == self.raw_texts.len()
    }
}

/// Borrowed view of one index row.
#[derive(Debug)]
pub struct IndexEntry<'a> {
    pub path: &'a str,
    pub text: &'a str,
    pub raw_text: &'a str,
    pub vector: ArrayView1<'a, f32>,
}

/// One position in a ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked {
    /// Row in the index
    pub position: usize,
    /// Cosine similarity with the query (-1.0 to 1.0)
    pub score: f32,
}

/// Entries ordered by descending similarity; ties keep index order.
///
/// Single pass: once consumed it has to be recomputed with
/// [`ImageIndex::rank`].
#[derive(Debug)]
pub struct Ranking {
    inner: std::vec::IntoIter<Ranked>,
}

impl Iterator for Ranking {
    type Item = Ranked;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Ranking {}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error(
        "Index arrays are misaligned: {vectors} vectors, {paths} paths, {texts} texts, {raw_texts} raw_texts"
    )]
    Misaligned {
        vectors: usize,
        paths: usize,
        texts: usize,
        raw_texts: usize,
    },

    #[error("Cannot search with zero-norm vector")]
    ZeroNormVector,

    #[error("Vector at row {row} contains NaN or infinite values")]
    NonFinite { row: usize },

    #[error("Query vector contains NaN or infinite values")]
    NonFiniteQuery,
}

/// Brute-force vector index over image captions.
#[derive(Debug, Clone)]
pub struct ImageIndex {
    vectors: Array2<f32>,
    norms: Vec<f32>,
    metadata: IndexMetadata,
}

impl ImageIndex {
    /// Create an index from a vector matrix and its metadata.
    ///
    /// Fails unless the matrix has exactly one row per metadata entry, the
    /// metadata arrays are aligned and every value is finite.
    pub fn new(vectors: Array2<f32>, metadata: IndexMetadata) -> Result<Self, IndexError> {
        if !metadata.is_aligned() || vectors.nrows() != metadata.len() {
            return Err(IndexError::Misaligned {
                vectors: vectors.nrows(),
                paths: metadata.paths.len(),
                texts: metadata.texts.len(),
                raw_texts: metadata.raw_texts.len(),
            });
        }

        if let Some(row) = vectors
            .axis_iter(Axis(0))
            .position(|row| row.iter().any(|v| !v.is_finite()))
        {
            return Err(IndexError::NonFinite { row });
        }

        let norms = vectors.axis_iter(Axis(0)).map(|row| l2_norm(row)).collect();

        Ok(Self {
            vectors,
            norms,
            metadata,
        })
    }

    /// Create an index with no entries.
    pub fn empty(dimensions: usize, model: Option<String>) -> Self {
        Self {
            vectors: Array2::zeros((0, dimensions)),
            norms: Vec::new(),
            metadata: IndexMetadata::new(model),
        }
    }

    /// Create an index from per-entry embeddings.
    pub fn from_rows(
        rows: Vec<Vec<f32>>,
        dimensions: usize,
        metadata: IndexMetadata,
    ) -> Result<Self, IndexError> {
        let count = rows.len();
        let mut flat = Vec::with_capacity(count * dimensions);
        for row in rows {
            if row.len() != dimensions {
                return Err(IndexError::DimensionMismatch {
                    expected: dimensions,
                    got: row.len(),
                });
            }
            flat.extend(row);
        }

        let vectors = Array2::from_shape_vec((count, dimensions), flat).map_err(|_| {
            IndexError::DimensionMismatch {
                expected: dimensions,
                got: 0,
            }
        })?;

        Self::new(vectors, metadata)
    }

    /// Get the embedding dimensions.
    pub fn dimensions(&self) -> usize {
        self.vectors.ncols()
    }

    /// Get the number of entries in the index.
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn vectors(&self) -> &Array2<f32> {
        &self.vectors
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    /// Name of the model that produced the vectors, if recorded.
    pub fn model(&self) -> Option<&str> {
        self.metadata.model.as_deref()
    }

    /// Get the entry at a position.
    pub fn entry(&self, position: usize) -> Option<IndexEntry<'_>> {
        if position >= self.len() {
            return None;
        }

        Some(IndexEntry {
            path: &self.metadata.paths[position],
            text: &self.metadata.texts[position],
            raw_text: &self.metadata.raw_texts[position],
            vector: self.vectors.row(position),
        })
    }

    /// Rank every entry by cosine similarity to the query.
    pub fn rank(&self, query: &[f32]) -> Result<Ranking, IndexError> {
        if query.len() != self.dimensions() {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions(),
                got: query.len(),
            });
        }

        let query = ArrayView1::from(query);
        let query_norm = l2_norm(query);
        if !query_norm.is_finite() {
            return Err(IndexError::NonFiniteQuery);
        }
        if query_norm < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        let mut ranked: Vec<Ranked> = self
            .vectors
            .axis_iter(Axis(0))
            .zip(&self.norms)
            .enumerate()
            .map(|(position, (row, &norm))| Ranked {
                position,
                score: cosine_similarity(query, row, query_norm, norm),
            })
            .collect();

        // sort_by is stable, equal scores stay in index order
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

        Ok(Ranking {
            inner: ranked.into_iter(),
        })
    }
}

/// Compute L2 norm of a vector.
fn l2_norm(v: ArrayView1<'_, f32>) -> f32 {
    v.dot(&v).sqrt()
}

/// Compute cosine similarity between two vectors with precomputed norms.
fn cosine_similarity(
    query: ArrayView1<'_, f32>,
    target: ArrayView1<'_, f32>,
    query_norm: f32,
    target_norm: f32,
) -> f32 {
    if target_norm < f32::EPSILON {
        return 0.0;
    }

    query.dot(&target) / (query_norm * target_norm)
}
