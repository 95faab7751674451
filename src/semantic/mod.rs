//! Semantic search over screenshot captions.
//!
//! Captions are derived from image file names, embedded with a local
//! fastembed model and searched by brute-force cosine similarity.
//!
//! # Architecture
//!
//! - `caption`: File name -> caption extraction
//! - `preprocess`: Script conversion and separator cleanup
//! - `embeddings`: Wraps fastembed for embedding generation
//! - `index`: Aligned in-memory index with cosine ranking
//! - `storage`: `vectors.npy` + `metadata.json` persistence
//! - `builder`: Full index rebuild from an image directory
//! - `freshness`: Image count vs index count staleness check
//! - `service`: Query handle over a loaded index

pub mod builder;
pub mod caption;
pub mod embeddings;
pub mod freshness;
mod index;
pub mod preprocess;
mod service;
mod storage;

pub use builder::IndexBuilder;
pub use embeddings::{Embedder, EmbeddingModel};
pub use freshness::{ensure_fresh, Freshness};
pub use preprocess::TextNormalizer;
pub use service::{SearchResult, Searcher};
pub use storage::IndexStorage;

/// Default embedding model (multilingual, 384 dimensions)
pub const DEFAULT_MODEL: &str = "paraphrase-multilingual-MiniLM-L12-v2";

/// Default script variant captions and queries are converted to
pub const DEFAULT_SCRIPT_VARIANT: &str = "zh-cn";

/// Default number of results per query
pub const DEFAULT_TOP_K: usize = 6;

/// Default batch size for the indexing embedding call
pub const DEFAULT_BATCH_SIZE: usize = 128;
