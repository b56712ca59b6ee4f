use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{Result, TubeError};
use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher, YouTubeApi};
use crate::render::Renderer;
use crate::store::SqliteStore;
use crate::sync::{SyncSettings, Synchronizer};

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub sync: Arc<Synchronizer<SqliteStore>>,
    pub renderer: Renderer,
}

impl AppContext {
    /// Open the store at `db_path`, else `store.path` from the config, else
    /// the default location under the user's data directory.
    pub fn new(config: Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path.or_else(|| config.store.path.clone()) {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let fetcher = Self::http_fetcher(&config)?;
        Self::with_parts(config, store, fetcher)
    }

    /// Wire a context around an existing store and fetcher.
    pub fn with_parts(
        config: Config,
        store: Arc<SqliteStore>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
    ) -> Result<Self> {
        let api = YouTubeApi::new(fetcher, &config.api, config.feed.results_limit)?;
        let sync = Arc::new(Synchronizer::new(
            api,
            store.clone(),
            SyncSettings::from(&config),
        ));
        let renderer = Renderer::new(config.format.clone())?;

        Ok(Self {
            config,
            store,
            sync,
            renderer,
        })
    }

    fn http_fetcher(config: &Config) -> Result<Arc<dyn Fetcher + Send + Sync>> {
        let fetcher = HttpFetcher::with_options(config.api.timeout(), config.api.raw_errors)?;
        Ok(Arc::new(fetcher))
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| TubeError::Config("Could not find data directory".into()))?;
        let tuberss_dir = data_dir.join("tuberss");
        std::fs::create_dir_all(&tuberss_dir)?;
        Ok(tuberss_dir.join("tuberss.db"))
    }
}
