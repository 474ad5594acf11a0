/// Startup migration of persisted board records.
///
/// Every raw record in the `boards` collection goes through the typed schema
/// before the repository may see it:
/// - `createdBy` missing, null or blank -> dropped; ownership is never guessed
/// - does not fit the `Board` schema -> dropped
/// - board id already seen earlier in the collection -> later copy dropped
/// - list or card id already seen -> reassigned a fresh id
/// - missing `lists` / `cards` / `attachments` -> empty (schema defaults)
///
/// The cleaned collection is written back immediately. Migrating an already
/// clean collection changes nothing.
use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use crate::storage::{RecordStore, RecordStoreExt, StorageError, BOARDS_KEY, USERS_KEY};
use crate::types::{new_id, Board, User};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub kept: usize,
    pub dropped_orphaned: usize,
    pub dropped_malformed: usize,
    pub dropped_duplicate: usize,
    /// List and card ids that collided and were replaced.
    pub reassigned_ids: usize,
    /// Kept boards whose owner is not a registered user.
    pub unknown_owners: usize,
}

impl MigrationReport {
    pub fn dropped(&self) -> usize {
        self.dropped_orphaned + self.dropped_malformed + self.dropped_duplicate
    }

    pub fn is_clean(&self) -> bool {
        self.dropped() == 0 && self.reassigned_ids == 0
    }
}

fn has_owner(raw: &Value) -> bool {
    raw.get("createdBy")
        .and_then(Value::as_str)
        .is_some_and(|owner| !owner.trim().is_empty())
}

/// Validate raw board records into typed boards.
pub fn migrate(raw: Vec<Value>) -> (Vec<Board>, MigrationReport) {
    let mut report = MigrationReport::default();
    let mut board_ids = HashSet::new();
    let mut list_ids = HashSet::new();
    let mut card_ids = HashSet::new();
    let mut boards = Vec::with_capacity(raw.len());

    for (index, record) in raw.into_iter().enumerate() {
        if !has_owner(&record) {
            let id = record.get("id").cloned().unwrap_or(Value::Null);
            log::warn!(
                "[taskboard.migrate] Dropping board {} (record {}): no owner",
                id,
                index
            );
            report.dropped_orphaned += 1;
            continue;
        }

        let mut board: Board = match serde_json::from_value(record) {
            Ok(board) => board,
            Err(e) => {
                log::warn!(
                    "[taskboard.migrate] Dropping malformed board record {}: {}",
                    index,
                    e
                );
                report.dropped_malformed += 1;
                continue;
            }
        };

        if !board_ids.insert(board.id.clone()) {
            log::warn!(
                "[taskboard.migrate] Dropping duplicate of board {}",
                board.id
            );
            report.dropped_duplicate += 1;
            continue;
        }

        for list in &mut board.lists {
            if !list_ids.insert(list.id.clone()) {
                let fresh = new_id();
                log::warn!(
                    "[taskboard.migrate] List id {} on board {} collides, now {}",
                    list.id,
                    board.id,
                    fresh
                );
                list.id = fresh.clone();
                list_ids.insert(fresh);
                report.reassigned_ids += 1;
            }
            for card in &mut list.cards {
                if !card_ids.insert(card.id.clone()) {
                    let fresh = new_id();
                    log::warn!(
                        "[taskboard.migrate] Card id {} on board {} collides, now {}",
                        card.id,
                        board.id,
                        fresh
                    );
                    card.id = fresh.clone();
                    card_ids.insert(fresh);
                    report.reassigned_ids += 1;
                }
            }
        }

        boards.push(board);
    }

    report.kept = boards.len();
    (boards, report)
}

/// Migrate the persisted `boards` collection in place.
pub fn run<S: RecordStore + ?Sized>(store: &S) -> Result<MigrationReport, StorageError> {
    let raw: Vec<Value> = store.read_collection(BOARDS_KEY)?;
    let (boards, mut report) = migrate(raw);

    let users: Vec<User> = store.read_collection(USERS_KEY)?;
    let known: HashSet<&str> = users.iter().map(|u| u.id.as_str()).collect();
    report.unknown_owners = boards
        .iter()
        .filter(|b| !known.contains(b.created_by.as_str()))
        .count();
    if report.unknown_owners > 0 {
        log::warn!(
            "[taskboard.migrate] {} board(s) belong to unregistered users; kept",
            report.unknown_owners
        );
    }

    store.write_collection(BOARDS_KEY, &boards)?;

    if report.is_clean() {
        log::info!("[taskboard.migrate] {} board(s), nothing to repair", report.kept);
    } else {
        log::info!(
            "[taskboard.migrate] Kept {} board(s), dropped {}, reassigned {} id(s)",
            report.kept,
            report.dropped(),
            report.reassigned_ids
        );
    }
    Ok(report)
}
