//! On-disk persistence for the image index.
//!
//! Two artifacts live in the index directory:
//!
//! - `vectors.npy`: NumPy array, `f32`, shape `(entries, dimensions)`, C order
//! - `metadata.json`: `{"paths": [..], "texts": [..], "raw_texts": [..], "model": ".."}`
//!
//! Row `i` of the array belongs to entry `i` of each metadata array.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use ndarray_npy::{read_npy, write_npy};

use crate::semantic::index::{ImageIndex, IndexMetadata};

pub const VECTORS_FILE: &str = "vectors.npy";
pub const METADATA_FILE: &str = "metadata.json";

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexStorageError {
    #[error("Index file not found: {0}")]
    Missing(PathBuf),

    #[error("Malformed index: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode metadata: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write vectors: {0}")]
    WriteVectors(#[from] ndarray_npy::WriteNpyError),
}

/// Storage manager for the index artifacts.
pub struct IndexStorage {
    dir: PathBuf,
}

impl IndexStorage {
    /// Create a storage manager for the given directory.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn vectors_path(&self) -> PathBuf {
        self.dir.join(VECTORS_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Check if the metadata file exists.
    pub fn metadata_exists(&self) -> bool {
        self.metadata_path().is_file()
    }

    /// Check if both artifacts exist.
    pub fn exists(&self) -> bool {
        self.metadata_exists() && self.vectors_path().is_file()
    }

    /// Load only the metadata file.
    pub fn load_metadata(&self) -> Result<IndexMetadata, IndexStorageError> {
        let path = self.metadata_path();
        if !path.is_file() {
            return Err(IndexStorageError::Missing(path));
        }

        let reader = BufReader::new(File::open(&path)?);
        let metadata: IndexMetadata = serde_json::from_reader(reader).map_err(|e| {
            IndexStorageError::Malformed(format!("{}: {}", path.display(), e))
        })?;

        if !metadata.is_aligned() {
            return Err(IndexStorageError::Malformed(format!(
                "{}: paths ({}), texts ({}) and raw_texts ({}) differ in length",
                path.display(),
                metadata.paths.len(),
                metadata.texts.len(),
                metadata.raw_texts.len()
            )));
        }

        Ok(metadata)
    }

    /// Load the full index.
    pub fn load(&self) -> Result<ImageIndex, IndexStorageError> {
        let metadata = self.load_metadata()?;

        let vectors_path = self.vectors_path();
        if !vectors_path.is_file() {
            return Err(IndexStorageError::Missing(vectors_path));
        }

        let vectors: Array2<f32> = read_npy(&vectors_path).map_err(|e| {
            IndexStorageError::Malformed(format!("{}: {}", vectors_path.display(), e))
        })?;

        ImageIndex::new(vectors, metadata).map_err(|e| IndexStorageError::Malformed(e.to_string()))
    }

    /// Save the index, replacing any previous artifacts.
    ///
    /// Both files are written to temporary paths first and renamed into place
    /// once both writes succeeded. If the metadata rename fails the new
    /// vectors are removed again, so a half-replaced pair reads as missing
    /// rather than pairing new vectors with old metadata.
    pub fn save(&self, index: &ImageIndex) -> Result<(), IndexStorageError> {
        std::fs::create_dir_all(&self.dir)?;

        let vectors_path = self.vectors_path();
        let metadata_path = self.metadata_path();
        let vectors_temp = vectors_path.with_extension("tmp");
        let metadata_temp = metadata_path.with_extension("tmp");

        let result = write_npy(&vectors_temp, index.vectors())
            .map_err(IndexStorageError::from)
            .and_then(|_| Self::write_metadata(&metadata_temp, index.metadata()));

        if let Err(e) = result {
            let _ = std::fs::remove_file(&vectors_temp);
            let _ = std::fs::remove_file(&metadata_temp);
            return Err(e);
        }

        if let Err(e) = std::fs::rename(&vectors_temp, &vectors_path) {
            let _ = std::fs::remove_file(&vectors_temp);
            let _ = std::fs::remove_file(&metadata_temp);
            return Err(e.into());
        }

        if let Err(e) = std::fs::rename(&metadata_temp, &metadata_path) {
            let _ = std::fs::remove_file(&vectors_path);
            let _ = std::fs::remove_file(&metadata_temp);
            return Err(e.into());
        }

        Ok(())
    }

    fn write_metadata(path: &Path, metadata: &IndexMetadata) -> Result<(), IndexStorageError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, metadata)?;
        writer.flush()?;

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        Ok(())
    }
}
