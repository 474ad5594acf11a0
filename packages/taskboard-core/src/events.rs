/// Change notifications published after each committed mutation.
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum BoardEvent {
    BoardCreated {
        board_id: String,
    },
    /// Lists, cards or the name of a board changed.
    BoardUpdated {
        board_id: String,
    },
    BoardDeleted {
        board_id: String,
    },
    SelectionChanged {
        board_id: Option<String>,
    },
    /// The active identity changed (login, logout, registration).
    IdentityChanged {
        user_id: Option<String>,
    },
}

/// Fan-out of [`BoardEvent`]s. Publishing never blocks and having no
/// subscriber is fine.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BoardEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: BoardEvent) {
        log::debug!("[taskboard.events] {:?}", event);
        // Err only means nobody is listening.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
