use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use homedir::my_home;

use crate::config::Config;
use crate::semantic::{
    ensure_fresh, freshness, Embedder, EmbeddingModel, Freshness, IndexBuilder, IndexStorage,
    Searcher, TextNormalizer,
};

const BASE_PATH_ENV: &str = "PICTSEARCH_BASE_PATH";

/// Application paths structure
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_path: PathBuf,
}

/// Application factory for resolving paths and configuration
pub struct AppFactory;

impl AppFactory {
    /// Get application paths, creating the base directory if needed
    pub fn get_paths() -> Result<AppPaths> {
        let base_path = Self::get_base_path()?;

        std::fs::create_dir_all(&base_path)
            .context("Failed to create application base directory")?;

        Ok(AppPaths { base_path })
    }

    /// Create the application from `config.yaml` under the base path
    pub fn create_app(paths: &AppPaths) -> Result<App> {
        let config = Config::load_with(&paths.base_path).with_context(|| {
            format!("Failed to load config from {}", paths.base_path.display())
        })?;
        Ok(App::new(config))
    }

    /// Get the base path for the application
    fn get_base_path() -> Result<PathBuf> {
        if let Ok(base_path) = std::env::var(BASE_PATH_ENV) {
            return Ok(PathBuf::from(base_path));
        }

        let home = my_home()
            .context("Could not determine home directory")?
            .context("Home directory path is empty")?;
        Ok(home.join(".local/share/pictsearch"))
    }
}

/// Resolved configuration plus the index location derived from it.
pub struct App {
    config: Config,
    storage: IndexStorage,
}

impl App {
    pub fn new(config: Config) -> Self {
        let storage = IndexStorage::new(config.index_dir());
        Self { config, storage }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn image_root(&self) -> PathBuf {
        self.config.image_root()
    }

    pub fn storage(&self) -> &IndexStorage {
        &self.storage
    }

    /// Load the configured embedding model. Downloads it on first use.
    pub fn load_model(&self) -> Result<EmbeddingModel> {
        let sem = &self.config.semantic_search;
        let model = EmbeddingModel::new(&sem.model, self.config.base_path().to_path_buf())
            .with_context(|| format!("Failed to load embedding model '{}'", sem.model))?;
        Ok(model.with_batch_size(sem.batch_size))
    }

    pub fn normalizer(&self) -> Result<TextNormalizer> {
        let variant = &self.config.semantic_search.script_variant;
        TextNormalizer::for_variant(variant)
            .with_context(|| format!("Unsupported script variant '{}'", variant))
    }

    /// Compare the image directory with the persisted index.
    pub fn check(&self) -> Result<Freshness> {
        let image_root = self.image_root();
        freshness::check_freshness(&image_root, &self.storage)
            .with_context(|| format!("Failed to check index for {}", image_root.display()))
    }

    /// Rebuild the index from scratch, returning the entry count.
    pub fn rebuild(&self) -> Result<usize> {
        let model = self.load_model()?;
        self.rebuild_with(&model)
    }

    pub fn rebuild_with<E: Embedder>(&self, model: &E) -> Result<usize> {
        let normalizer = self.normalizer()?;
        let builder = IndexBuilder::new(model, &normalizer, &self.storage);
        let index = builder.build(&self.image_root()).context("Failed to build index")?;
        Ok(index.len())
    }

    /// Bring the index up to date and open it for querying.
    pub fn open_searcher(&self) -> Result<Searcher<EmbeddingModel>> {
        let model = self.load_model()?;
        self.open_searcher_with(model)
    }

    pub fn open_searcher_with<E: Embedder>(&self, model: E) -> Result<Searcher<E>> {
        let image_root = self.image_root();
        if !image_root.is_dir() {
            bail!("Image directory {} does not exist", image_root.display());
        }
        let normalizer = self.normalizer()?;

        let fresh = {
            let builder = IndexBuilder::new(&model, &normalizer, &self.storage);
            ensure_fresh(&image_root, &builder)
        };

        if !fresh {
            if !self.storage.exists() {
                bail!("No index available for {}", image_root.display());
            }
            // image root exists, so only a failed rebuild gets here
            log::warn!("Index could not be refreshed, using the existing one");
        }

        Searcher::load(&self.storage, image_root, model, normalizer)
            .with_context(|| format!("Failed to load index from {}", self.storage.dir().display()))
    }
}
