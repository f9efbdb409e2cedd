//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use tracing::debug;

use crate::application::services::{GraphService, NavigationService, VersionManager};
use crate::application::{ApplicationResult, SharedStore};
use crate::config::Settings;
use crate::infrastructure::traits::{FileJournal, Journal, MemoryJournal};

/// Container holding all application services.
///
/// All services share one store, so writes made through one service are
/// immediately visible to the others.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Storage collaborator
    pub journal: Arc<dyn Journal>,

    pub store: Arc<SharedStore>,
    pub graph: GraphService,
    pub versions: VersionManager,
    pub navigator: NavigationService,
}

impl ServiceContainer {
    /// Create a container backed by the journal file from `settings`.
    pub fn new(settings: Settings) -> ApplicationResult<Self> {
        let journal = FileJournal::new(settings.journal_path(), settings.sync_writes);
        Self::with_journal(settings, Arc::new(journal))
    }

    /// Create a container that keeps everything in memory.
    pub fn in_memory() -> ApplicationResult<Self> {
        Self::with_journal(Settings::default(), Arc::new(MemoryJournal::new()))
    }

    /// Create a service container with a custom journal (for testing).
    pub fn with_journal(settings: Settings, journal: Arc<dyn Journal>) -> ApplicationResult<Self> {
        debug!("opening store from {}", journal.location());
        let store = Arc::new(SharedStore::open(Arc::clone(&journal))?);

        Ok(Self {
            settings: Arc::new(settings),
            journal,
            graph: GraphService::new(Arc::clone(&store)),
            versions: VersionManager::new(Arc::clone(&store)),
            navigator: NavigationService::new(Arc::clone(&store)),
            store,
        })
    }
}
