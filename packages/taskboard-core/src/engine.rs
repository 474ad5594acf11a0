use std::sync::Arc;

use tokio::sync::broadcast;

use crate::accounts::Accounts;
use crate::config::TaskboardConfig;
use crate::error::Result;
use crate::events::{BoardEvent, EventBus};
use crate::migrate::{self, MigrationReport};
use crate::repository::BoardRepository;
use crate::storage::RecordStore;

/// Entry point: migrates the store once, then hands out the repository and
/// accounts that share it.
pub struct Taskboard<S: RecordStore> {
    repo: BoardRepository<S>,
    accounts: Accounts<S>,
    migration: MigrationReport,
}

impl<S: RecordStore> Taskboard<S> {
    pub fn open(store: S, config: &TaskboardConfig) -> Result<Self> {
        let store = Arc::new(store);
        let migration = migrate::run(&*store)?;
        let events = EventBus::new();
        Ok(Self {
            repo: BoardRepository::new(store.clone(), config, events.clone()),
            accounts: Accounts::new(store, config, events),
            migration,
        })
    }

    pub fn boards(&self) -> &BoardRepository<S> {
        &self.repo
    }

    pub fn accounts(&self) -> &Accounts<S> {
        &self.accounts
    }

    /// What startup migration repaired.
    pub fn migration(&self) -> &MigrationReport {
        &self.migration
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.repo.subscribe()
    }
}
