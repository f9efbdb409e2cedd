//! Shared, journal-backed graph store
//!
//! Owns the single [`GraphStore`] instance of the process. Writers stage a
//! batch under the write lock, append it to the journal and only then apply
//! it, so readers observe either none or all of a batch.

use std::sync::{Arc, RwLock, RwLockReadGuard};

use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{DomainResult, GraphStore, Staging};
use crate::infrastructure::traits::Journal;

pub struct SharedStore {
    state: RwLock<GraphStore>,
    journal: Arc<dyn Journal>,
}

impl SharedStore {
    /// Open a store by replaying everything the journal holds.
    #[instrument(level = "debug", skip(journal))]
    pub fn open(journal: Arc<dyn Journal>) -> ApplicationResult<Self> {
        let location = journal.location();
        let records = journal
            .load()
            .with_location_context("load journal", &location)?;
        let count = records.len();
        let state = GraphStore::from_records(records)?;
        info!("replayed {} records from {}", count, location);
        Ok(Self {
            state: RwLock::new(state),
            journal,
        })
    }

    /// Run `op` against a fresh batch and commit what it staged.
    ///
    /// If `op` fails, the batch does not check out against the store, or the
    /// journal rejects it, nothing is applied and nothing is journaled.
    pub fn commit<T, F>(&self, op: F) -> ApplicationResult<T>
    where
        F: FnOnce(&mut Staging<'_>) -> DomainResult<T>,
    {
        let mut state = self
            .state
            .write()
            .map_err(|_| ApplicationError::LockPoisoned)?;
        let (value, records) = {
            let mut staging = state.stage();
            let value = op(&mut staging)?;
            (value, staging.into_records())
        };
        if records.is_empty() {
            return Ok(value);
        }
        // the journal must never hold a batch the store would reject
        state.check_batch(&records)?;
        self.journal
            .append(&records)
            .with_location_context("append batch", &self.journal.location())?;
        debug!("committing batch of {} records", records.len());
        state.apply_all(records)?;
        Ok(value)
    }

    /// Shared read access; blocks while a batch is being committed.
    pub fn read(&self) -> ApplicationResult<RwLockReadGuard<'_, GraphStore>> {
        self.state.read().map_err(|_| ApplicationError::LockPoisoned)
    }
}
