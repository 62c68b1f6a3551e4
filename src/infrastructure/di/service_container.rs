//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use tracing::debug;

use crate::application::services::SearchService;
use crate::config::Settings;
use crate::infrastructure::error::InfraResult;
use crate::infrastructure::sqlite::SqliteSearchStore;
use crate::infrastructure::traits::SearchStore;

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Search persistence
    pub store: Arc<dyn SearchStore>,

    /// Saving, loading and rendering of named searches
    pub search: SearchService,
}

impl ServiceContainer {
    /// Create a new service container backed by the configured database.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        debug!("opening database {}", settings.database.display());
        let store = SqliteSearchStore::open(&settings.database)?;
        Ok(Self::with_store(settings, Arc::new(store)))
    }

    /// Create a service container with a custom store (for testing).
    pub fn with_store(settings: Settings, store: Arc<dyn SearchStore>) -> Self {
        let settings = Arc::new(settings);
        let search = SearchService::new(Arc::clone(&store), settings.rebuild_mode());

        Self {
            settings,
            store,
            search,
        }
    }
}
