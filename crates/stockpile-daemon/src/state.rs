//! Application state management

use std::sync::Arc;
use stockpile_core::SnapshotCatalog;
use tracing::info;

use crate::auth::AuthState;
use crate::config::Config;

/// Shared application state
pub struct AppState {
    /// Snapshot files on disk
    pub catalog: SnapshotCatalog,
    /// Password gate and issued sessions
    pub auth: AuthState,
    /// Configuration
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let catalog = SnapshotCatalog::new(&config.surfaces.path);
        let auth = AuthState::new(&config.auth);
        info!(dir = %catalog.dir().display(), "Serving snapshots");

        Arc::new(Self {
            catalog,
            auth,
            config,
        })
    }
}
