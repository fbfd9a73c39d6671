pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::sync::Arc;

use anyhow::Result;

use crate::app::auth::AuthService;
use crate::app::relationships::RelationshipApi;
use crate::config::{AppConfig, RelationshipSettings, StorageBackend};
use crate::infra::db::Db;
use crate::infra::store::{MemoryStore, PgStore, SharedDirectory, SharedStore};

#[derive(Clone)]
pub struct AppState {
    pub relationships: RelationshipApi,
    pub store: SharedStore,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(
        store: SharedStore,
        directory: SharedDirectory,
        auth: AuthService,
        settings: RelationshipSettings,
    ) -> Self {
        Self {
            relationships: RelationshipApi::new(store.clone(), directory, settings),
            store,
            auth,
        }
    }

    /// Builds the state for the configured storage backend.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let auth = AuthService::new(config.paseto_access_key, config.access_ttl_minutes);

        let state = match config.storage_backend {
            StorageBackend::Postgres => {
                let db = Db::connect(config).await?;
                db.migrate().await?;
                let store = Arc::new(PgStore::new(db));
                Self::new(store.clone(), store, auth, config.relationships)
            }
            StorageBackend::Memory => {
                tracing::warn!("using in-memory storage; relationships will not survive a restart");
                let store = Arc::new(MemoryStore::new());
                Self::new(store.clone(), store, auth, config.relationships)
            }
        };

        Ok(state)
    }
}
