pub mod accounts;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod migrate;
pub mod reorder;
pub mod repository;
pub mod scope;
pub mod storage;
pub mod types;

pub use accounts::Accounts;
pub use config::TaskboardConfig;
pub use engine::Taskboard;
pub use error::{Result, TaskboardError};
pub use events::BoardEvent;
pub use reorder::{CardMove, MoveOutcome};
pub use repository::{BoardRepository, BoardWrite, Committed};
pub use scope::BoardView;
pub use storage::local::LocalStore;
pub use storage::memory::MemoryStore;
pub use storage::{RecordStore, RecordStoreExt, StorageError};
