use crate::storage::StorageError;

/// Errors surfaced to callers of the engine.
///
/// Missing boards, lists or cards are not errors: mutations on them are
/// tolerated no-ops and report `false`/`None` in their result.
#[derive(Debug, thiserror::Error)]
pub enum TaskboardError {
    /// Input rejected before anything was attempted.
    #[error("{0}")]
    Validation(String),

    #[error("Invalid email or password")]
    Auth,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TaskboardError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, TaskboardError>;
