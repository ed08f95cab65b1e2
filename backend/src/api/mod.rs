//! API module - HTTP handlers and middleware.

pub mod client_ip;
pub mod download_response;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::error::Result;
use crate::services::artifact_service::ArtifactStore;
use crate::services::auth_service::AuthService;
use crate::services::ledger_service::Ledger;
use crate::services::merge_service::MergeService;
use crate::services::retention_service::RetentionService;
use crate::storage::StorageBackend;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: PgPool,
    pub storage: Arc<dyn StorageBackend>,
    pub merge_service: MergeService,
    pub retention_service: Arc<RetentionService>,
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    /// Wire the services over one storage backend and ledger.
    pub fn new(
        config: Config,
        db: PgPool,
        storage: Arc<dyn StorageBackend>,
        ledger: Arc<dyn Ledger>,
    ) -> Result<Self> {
        let auth_service = Arc::new(AuthService::new(Arc::new(config.clone()))?);
        Ok(Self::with_auth_service(config, db, storage, ledger, auth_service))
    }

    pub fn with_auth_service(
        config: Config,
        db: PgPool,
        storage: Arc<dyn StorageBackend>,
        ledger: Arc<dyn Ledger>,
        auth_service: Arc<AuthService>,
    ) -> Self {
        let store = ArtifactStore::new(storage.clone());
        Self {
            merge_service: MergeService::new(store.clone(), ledger),
            retention_service: Arc::new(RetentionService::new(store)),
            config,
            db,
            storage,
            auth_service,
        }
    }
}

pub type SharedState = Arc<AppState>;
