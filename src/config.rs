use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::semantic::{
    preprocess, EmbeddingModel, DEFAULT_BATCH_SIZE, DEFAULT_MODEL, DEFAULT_SCRIPT_VARIANT,
    DEFAULT_TOP_K,
};

const CONFIG_FILE: &str = "config.yaml";
const DEFAULT_IMAGE_ROOT: &str = "pict";
const DEFAULT_SCORE_PRECISION: usize = 2;
const DEFAULT_CAPTION_WIDTH: usize = 40;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config is malformed: {0}")]
    Malformed(#[from] serde_yml::Error),

    #[error("invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Configuration for indexing and querying
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SemanticSearchConfig {
    /// Model name for embeddings (e.g., "paraphrase-multilingual-MiniLM-L12-v2")
    #[serde(default = "default_model")]
    pub model: String,

    /// Script variant captions and queries are converted to ("none" to disable)
    #[serde(default = "default_script_variant")]
    pub script_variant: String,

    /// Batch size for the indexing embedding call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of results per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum similarity score [-1.0, 1.0]; unset returns top_k results regardless
    #[serde(default)]
    pub min_score: Option<f32>,
}

impl Default for SemanticSearchConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            script_variant: default_script_variant(),
            batch_size: default_batch_size(),
            top_k: default_top_k(),
            min_score: None,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_script_variant() -> String {
    DEFAULT_SCRIPT_VARIANT.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// How results are rendered in the terminal
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Decimal places shown for similarity scores
    #[serde(default = "default_score_precision")]
    pub score_precision: usize,

    /// Captions longer than this many characters are cut with an ellipsis
    #[serde(default = "default_caption_width")]
    pub caption_width: usize,

    /// Query run once when an interactive session starts
    #[serde(default)]
    pub initial_query: Option<String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            score_precision: default_score_precision(),
            caption_width: default_caption_width(),
            initial_query: None,
        }
    }
}

fn default_score_precision() -> usize {
    DEFAULT_SCORE_PRECISION
}

fn default_caption_width() -> usize {
    DEFAULT_CAPTION_WIDTH
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Image library; relative paths are resolved against the base path
    #[serde(default = "default_image_root")]
    pub image_root: PathBuf,

    /// Where vectors.npy and metadata.json live; defaults to the base path
    #[serde(default)]
    pub index_dir: Option<PathBuf>,

    #[serde(default)]
    pub semantic_search: SemanticSearchConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_root: default_image_root(),
            index_dir: None,
            semantic_search: SemanticSearchConfig::default(),
            display: DisplayConfig::default(),
            base_path: PathBuf::new(),
        }
    }
}

fn default_image_root() -> PathBuf {
    PathBuf::from(DEFAULT_IMAGE_ROOT)
}

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        let sem = &self.semantic_search;

        if !EmbeddingModel::is_supported(&sem.model) {
            return Err(ConfigError::invalid(
                "semantic_search.model",
                format!("unknown model '{}'", sem.model),
            ));
        }

        preprocess::converter_for(&sem.script_variant)
            .map_err(|e| ConfigError::invalid("semantic_search.script_variant", e.to_string()))?;

        if sem.batch_size == 0 {
            return Err(ConfigError::invalid(
                "semantic_search.batch_size",
                "must be greater than 0",
            ));
        }

        if sem.top_k == 0 {
            return Err(ConfigError::invalid(
                "semantic_search.top_k",
                "must be greater than 0",
            ));
        }

        if let Some(min_score) = sem.min_score {
            if !(-1.0..=1.0).contains(&min_score) {
                return Err(ConfigError::invalid(
                    "semantic_search.min_score",
                    format!("must be between -1.0 and 1.0, got {}", min_score),
                ));
            }
        }

        Ok(())
    }

    /// Load `config.yaml` from `base_path`, creating it with defaults if it
    /// does not exist.
    pub fn load_with(base_path: &Path) -> Result<Self, ConfigError> {
        let path = base_path.join(CONFIG_FILE);
        let io_err = |source| ConfigError::Io {
            path: path.clone(),
            source,
        };

        // create new if does not exist
        if !path.exists() {
            std::fs::create_dir_all(base_path).map_err(io_err)?;
            std::fs::write(&path, serde_yml::to_string(&Self::default())?).map_err(io_err)?;
        }

        let config_str = std::fs::read_to_string(&path).map_err(io_err)?;
        let mut config: Self = serde_yml::from_str(&config_str)?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = self.base_path.join(CONFIG_FILE);
        let config_str = serde_yml::to_string(&self)?;
        std::fs::write(&path, config_str).map_err(|source| ConfigError::Io { path, source })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Image library directory, resolved against the base path.
    pub fn image_root(&self) -> PathBuf {
        self.base_path.join(&self.image_root)
    }

    /// Index directory, resolved against the base path.
    pub fn index_dir(&self) -> PathBuf {
        match &self.index_dir {
            Some(dir) => self.base_path.join(dir),
            None => self.base_path.clone(),
        }
    }
}
