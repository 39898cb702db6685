//! Application state wiring the draft store to a concrete backend.
//!
//! `DraftStore` is generic over the `KvStore` trait; `AppState` pins it to
//! `AppKvStore`, which is SQLite normally and in-memory for `--ephemeral`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use svetu_core::draft::store::DraftStore;
use svetu_core::storage::kv_store::KvStore;
use svetu_core::storage::memory::InMemoryKvStore;
use svetu_infra::config::load_global_config;
use svetu_infra::filesystem::resolve_data_dir;
use svetu_infra::sqlite::kv::SqliteKvStore;
use svetu_infra::sqlite::pool::{DatabasePool, database_url};
use svetu_types::config::GlobalConfig;
use svetu_types::error::StorageError;

/// Backend chosen at startup.
pub enum AppKvStore {
    Sqlite(SqliteKvStore),
    Memory(InMemoryKvStore),
}

impl KvStore for AppKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            Self::Sqlite(store) => store.get(key).await,
            Self::Memory(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            Self::Sqlite(store) => store.set(key, value).await,
            Self::Memory(store) => store.set(key, value).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self {
            Self::Sqlite(store) => store.remove(key).await,
            Self::Memory(store) => store.remove(key).await,
        }
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        match self {
            Self::Sqlite(store) => store.keys_with_prefix(prefix).await,
            Self::Memory(store) => store.keys_with_prefix(prefix).await,
        }
    }
}

pub type ConcreteDraftStore = DraftStore<AppKvStore>;

/// Shared application state.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub drafts: Arc<ConcreteDraftStore>,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load config and open the draft database in the data directory.
    ///
    /// With `ephemeral`, drafts live in memory and vanish on exit.
    pub async fn init(ephemeral: bool) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_global_config(&data_dir).await;

        if ephemeral {
            tracing::info!("Using in-memory draft storage");
            return Ok(Self::from_parts(
                AppKvStore::Memory(InMemoryKvStore::new()),
                config,
                data_dir,
            ));
        }

        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let pool = DatabasePool::new(&database_url(&data_dir))
            .await
            .context("Failed to open draft database")?;

        Ok(Self::from_parts(
            AppKvStore::Sqlite(SqliteKvStore::new(pool)),
            config,
            data_dir,
        ))
    }

    pub fn from_parts(kv: AppKvStore, config: GlobalConfig, data_dir: PathBuf) -> Self {
        let drafts = DraftStore::with_config(kv, &config.drafts);
        Self {
            drafts: Arc::new(drafts),
            config: Arc::new(config),
            data_dir,
        }
    }
}
