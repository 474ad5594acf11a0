/// Board, list and card mutations against the persisted full collection.
///
/// Every mutation runs the same cycle:
///   read the full `boards` collection -> locate the target by id ->
///   splice in only the changed fields -> write the full collection ->
///   derive the active user's view.
///
/// A board held by the caller may be stale. It only ever contributes the
/// fields being changed; the rest of the record always comes from the store.
/// Only boards owned by the active user can be edited. Missing targets and
/// other users' boards are tolerated alike: the collection is written back
/// unchanged and the result reports `false` / `None`.
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::config::TaskboardConfig;
use crate::error::{Result, TaskboardError};
use crate::events::{BoardEvent, EventBus};
use crate::reorder::{self, CardMove, MoveOutcome};
use crate::scope::{derive_view, BoardView};
use crate::storage::{
    RecordStore, RecordStoreExt, BOARDS_KEY, CURRENT_USER_KEY, SELECTED_BOARD_KEY,
};
use crate::types::{
    new_id, Attachment, Board, BoardList, BoardPatch, Card, CardPatch, NewAttachment, NewCard,
    User,
};

/// Result of a mutation plus the view derived right after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed<T> {
    pub value: T,
    pub view: BoardView,
}

/// How `update_board` applied its patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardWrite {
    /// Spliced onto the persisted board.
    Merged,
    /// No persisted board had that id; the caller's board was inserted.
    Inserted,
    /// The board belongs to another user, or it is not persisted and the
    /// caller's copy is not owned by the active user.
    Discarded,
}

#[derive(Debug, Clone, Copy)]
enum Focus<'a> {
    Keep,
    Board(&'a str),
}

impl<'a> Focus<'a> {
    fn requested(self) -> Option<&'a str> {
        match self {
            Focus::Keep => None,
            Focus::Board(id) => Some(id),
        }
    }
}

pub struct BoardRepository<S: RecordStore> {
    store: Arc<S>,
    default_lists: Vec<String>,
    events: EventBus,
}

/// The full collection under edit, seen through the active user.
struct Editing {
    boards: Vec<Board>,
    user_id: Option<String>,
}

impl Editing {
    fn owns(&self, board: &Board) -> bool {
        self.user_id.as_deref() == Some(board.created_by.as_str())
    }

    /// A board of the active user. Other users' boards are never handed out.
    fn board_mut(&mut self, board_id: &str) -> Option<&mut Board> {
        let user_id = self.user_id.as_deref()?;
        self.boards
            .iter_mut()
            .find(|b| b.id == board_id && b.created_by == user_id)
    }

    fn list_mut(&mut self, board_id: &str, list_id: &str) -> Option<&mut BoardList> {
        self.board_mut(board_id)?.list_mut(list_id)
    }

    fn card_mut(&mut self, board_id: &str, list_id: &str, card_id: &str) -> Option<&mut Card> {
        self.list_mut(board_id, list_id)?.card_mut(card_id)
    }
}

/// Derive the active user's view from `boards` and persist the resulting
/// selection if it moved.
///
/// `requested` asks for a board to be focused; it only sticks when the board
/// is visible to the active user.
pub(crate) fn sync_view<S: RecordStore + ?Sized>(
    store: &S,
    events: &EventBus,
    boards: &[Board],
    requested: Option<&str>,
) -> Result<BoardView> {
    let user: Option<User> = store.read_record(CURRENT_USER_KEY)?;
    let persisted: Option<String> = store.read_record(SELECTED_BOARD_KEY)?;

    let view = derive_view(
        boards,
        user.as_ref().map(|u| u.id.as_str()),
        requested.or(persisted.as_deref()),
    );

    if view.selected_board_id != persisted {
        match &view.selected_board_id {
            Some(id) => store.write_record(SELECTED_BOARD_KEY, id)?,
            None => store.clear(SELECTED_BOARD_KEY)?,
        }
        events.publish(BoardEvent::SelectionChanged {
            board_id: view.selected_board_id.clone(),
        });
    }
    Ok(view)
}

fn require_name(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TaskboardError::validation(format!("{} cannot be empty", what)));
    }
    Ok(())
}

impl<S: RecordStore> BoardRepository<S> {
    pub(crate) fn new(store: Arc<S>, config: &TaskboardConfig, events: EventBus) -> Self {
        Self {
            store,
            default_lists: config.default_lists.clone(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }

    /// The full persisted collection, across all users.
    pub fn all_boards(&self) -> Result<Vec<Board>> {
        Ok(self.store.read_collection(BOARDS_KEY)?)
    }

    /// Current view without mutating anything but a stale selection.
    pub fn view(&self) -> Result<BoardView> {
        let boards = self.all_boards()?;
        sync_view(&*self.store, &self.events, &boards, None)
    }

    /// Focus a board. Boards outside the active user's scope are ignored and
    /// the selection is re-derived.
    pub fn select_board(&self, board_id: &str) -> Result<BoardView> {
        let boards = self.all_boards()?;
        sync_view(&*self.store, &self.events, &boards, Some(board_id))
    }

    /// Read, edit, write back, derive the view.
    fn commit<T>(
        &self,
        op: &str,
        focus: Focus<'_>,
        edit: impl FnOnce(&mut Editing) -> T,
    ) -> Result<Committed<T>> {
        self.transact(op, focus, |editing| (edit(editing), true))
    }

    /// Like `commit`, but the edit decides whether anything gets written.
    fn transact<T>(
        &self,
        op: &str,
        focus: Focus<'_>,
        edit: impl FnOnce(&mut Editing) -> (T, bool),
    ) -> Result<Committed<T>> {
        let user: Option<User> = self.store.read_record(CURRENT_USER_KEY)?;
        let mut editing = Editing {
            boards: self.all_boards()?,
            user_id: user.map(|u| u.id),
        };
        let (value, persist) = edit(&mut editing);
        let boards = editing.boards;
        if persist {
            self.store.write_collection(BOARDS_KEY, &boards)?;
            log::debug!("[taskboard.repo] {} committed ({} boards)", op, boards.len());
        }
        let view = sync_view(&*self.store, &self.events, &boards, focus.requested())?;
        Ok(Committed { value, view })
    }

    pub fn create_board(&self, name: &str, owner_id: &str) -> Result<Committed<Board>> {
        require_name(name, "Board name")?;
        require_name(owner_id, "Board owner")?;
        let board = Board::new(name, owner_id, &self.default_lists);
        let board_id = board.id.clone();

        let committed = self.commit("create_board", Focus::Board(&board_id), |editing| {
            editing.boards.push(board.clone());
            board
        })?;
        log::info!(
            "[taskboard.repo] Created board {} ({:?}) for {}",
            board_id,
            name,
            owner_id
        );
        self.events.publish(BoardEvent::BoardCreated { board_id });
        Ok(committed)
    }

    /// Splice `patch` onto the persisted copy of `board`.
    ///
    /// `board` is the caller's reference and may be stale; it is only used
    /// for its id, and inserted (with the patch applied) when the store has
    /// no board with that id and the copy belongs to the active user.
    pub fn update_board(&self, board: &Board, patch: BoardPatch) -> Result<Committed<BoardWrite>> {
        if let Some(name) = &patch.name {
            require_name(name, "Board name")?;
        }

        let committed = self.commit("update_board", Focus::Board(&board.id), |editing| {
            if let Some(index) = editing.boards.iter().position(|b| b.id == board.id) {
                if !editing.owns(&editing.boards[index]) {
                    log::warn!(
                        "[taskboard.repo] update_board: board {} is not the active user's",
                        board.id
                    );
                    return BoardWrite::Discarded;
                }
                patch.apply_to(&mut editing.boards[index]);
                return BoardWrite::Merged;
            }
            if !editing.owns(board) {
                log::warn!(
                    "[taskboard.repo] update_board: unknown board {} owned by {:?}, discarded",
                    board.id,
                    board.created_by
                );
                return BoardWrite::Discarded;
            }
            log::warn!(
                "[taskboard.repo] update_board: board {} not in store, inserting caller copy",
                board.id
            );
            let mut inserted = board.clone();
            patch.apply_to(&mut inserted);
            editing.boards.push(inserted);
            BoardWrite::Inserted
        })?;

        if committed.value != BoardWrite::Discarded {
            self.events.publish(BoardEvent::BoardUpdated {
                board_id: board.id.clone(),
            });
        }
        Ok(committed)
    }

    /// Append an empty list. Blank names are allowed.
    pub fn add_list(&self, board_id: &str, name: &str) -> Result<Committed<Option<BoardList>>> {
        let committed = self.commit("add_list", Focus::Keep, |editing| {
            let Some(board) = editing.board_mut(board_id) else {
                log::warn!("[taskboard.repo] add_list: board {} not found", board_id);
                return None;
            };
            let list = BoardList::new(name);
            board.lists.push(list.clone());
            Some(list)
        })?;
        self.publish_updated(board_id, committed.value.is_some());
        Ok(committed)
    }

    /// Remove a list together with its cards.
    pub fn delete_list(&self, board_id: &str, list_id: &str) -> Result<Committed<bool>> {
        let committed = self.commit("delete_list", Focus::Keep, |editing| {
            let Some(board) = editing.board_mut(board_id) else {
                log::warn!("[taskboard.repo] delete_list: board {} not found", board_id);
                return false;
            };
            let before = board.lists.len();
            board.lists.retain(|l| l.id != list_id);
            if board.lists.len() == before {
                log::warn!(
                    "[taskboard.repo] delete_list: list {} not on board {}",
                    list_id,
                    board_id
                );
                return false;
            }
            true
        })?;
        self.publish_updated(board_id, committed.value);
        Ok(committed)
    }

    /// Append a new card stamped with a fresh id, `author_id` and the current time.
    pub fn add_card(
        &self,
        board_id: &str,
        list_id: &str,
        fields: NewCard,
        author_id: &str,
    ) -> Result<Committed<Option<Card>>> {
        require_name(&fields.title, "Card title")?;

        let committed = self.commit("add_card", Focus::Keep, |editing| {
            let Some(list) = editing.list_mut(board_id, list_id) else {
                log::warn!(
                    "[taskboard.repo] add_card: list {} on board {} not found",
                    list_id,
                    board_id
                );
                return None;
            };
            let card = Card {
                id: new_id(),
                title: fields.title,
                description: fields.description,
                assignee: fields.assignee,
                due_date: fields.due_date,
                created_by: author_id.to_string(),
                created_at: Utc::now(),
                attachments: fields
                    .attachments
                    .into_iter()
                    .map(Attachment::from_upload)
                    .collect(),
            };
            list.cards.push(card.clone());
            Some(card)
        })?;
        self.publish_updated(board_id, committed.value.is_some());
        Ok(committed)
    }

    /// Merge `patch` onto a card in place; its position does not change.
    pub fn update_card(
        &self,
        board_id: &str,
        list_id: &str,
        card_id: &str,
        patch: CardPatch,
    ) -> Result<Committed<bool>> {
        if let Some(title) = &patch.title {
            require_name(title, "Card title")?;
        }

        let committed = self.commit("update_card", Focus::Keep, |editing| {
            let Some(card) = editing.card_mut(board_id, list_id, card_id) else {
                log::warn!(
                    "[taskboard.repo] update_card: card {} not found in {}/{}",
                    card_id,
                    board_id,
                    list_id
                );
                return false;
            };
            patch.apply_to(card);
            true
        })?;
        self.publish_updated(board_id, committed.value);
        Ok(committed)
    }

    pub fn delete_card(
        &self,
        board_id: &str,
        list_id: &str,
        card_id: &str,
    ) -> Result<Committed<bool>> {
        let committed = self.commit("delete_card", Focus::Keep, |editing| {
            let Some(list) = editing.list_mut(board_id, list_id) else {
                log::warn!(
                    "[taskboard.repo] delete_card: list {} on board {} not found",
                    list_id,
                    board_id
                );
                return false;
            };
            let before = list.cards.len();
            list.cards.retain(|c| c.id != card_id);
            list.cards.len() != before
        })?;
        self.publish_updated(board_id, committed.value);
        Ok(committed)
    }

    /// Remove a board with everything on it. A selection pointing at it
    /// falls back to the owner's first remaining board.
    pub fn delete_board(&self, board_id: &str) -> Result<Committed<bool>> {
        let committed = self.commit("delete_board", Focus::Keep, |editing| {
            let Some(user_id) = editing.user_id.as_deref() else {
                log::warn!("[taskboard.repo] delete_board: nobody is logged in");
                return false;
            };
            let before = editing.boards.len();
            editing
                .boards
                .retain(|b| b.id != board_id || b.created_by != user_id);
            if editing.boards.len() == before {
                log::warn!("[taskboard.repo] delete_board: board {} not found", board_id);
                return false;
            }
            true
        })?;
        if committed.value {
            log::info!("[taskboard.repo] Deleted board {}", board_id);
            self.events.publish(BoardEvent::BoardDeleted {
                board_id: board_id.to_string(),
            });
        }
        Ok(committed)
    }

    /// Apply a drag-and-drop move to the latest persisted lists of a board.
    /// Moves that change nothing are discarded without a write.
    pub fn move_card(&self, board_id: &str, mv: &CardMove) -> Result<Committed<MoveOutcome>> {
        let committed = self.transact("move_card", Focus::Keep, |editing| {
            let Some(board) = editing.board_mut(board_id) else {
                log::warn!("[taskboard.repo] move_card: board {} not found", board_id);
                return (MoveOutcome::Unchanged, false);
            };
            let result = reorder::apply_move(&board.lists, mv);
            if result.outcome.is_unchanged() {
                log::debug!(
                    "[taskboard.repo] move_card: {:?} on board {} changes nothing",
                    mv,
                    board_id
                );
                return (MoveOutcome::Unchanged, false);
            }
            BoardPatch::lists(result.lists).apply_to(board);
            (result.outcome, true)
        })?;
        self.publish_updated(board_id, !committed.value.is_unchanged());
        Ok(committed)
    }

    pub fn add_attachment(
        &self,
        board_id: &str,
        list_id: &str,
        card_id: &str,
        upload: NewAttachment,
    ) -> Result<Committed<Option<Attachment>>> {
        let committed = self.commit("add_attachment", Focus::Keep, |editing| {
            let Some(card) = editing.card_mut(board_id, list_id, card_id) else {
                log::warn!(
                    "[taskboard.repo] add_attachment: card {} not found in {}/{}",
                    card_id,
                    board_id,
                    list_id
                );
                return None;
            };
            let attachment = Attachment::from_upload(upload);
            card.attachments.push(attachment.clone());
            Some(attachment)
        })?;
        self.publish_updated(board_id, committed.value.is_some());
        Ok(committed)
    }

    pub fn remove_attachment(
        &self,
        board_id: &str,
        list_id: &str,
        card_id: &str,
        attachment_id: &str,
    ) -> Result<Committed<bool>> {
        let committed = self.commit("remove_attachment", Focus::Keep, |editing| {
            let Some(card) = editing.card_mut(board_id, list_id, card_id) else {
                log::warn!(
                    "[taskboard.repo] remove_attachment: card {} not found in {}/{}",
                    card_id,
                    board_id,
                    list_id
                );
                return false;
            };
            let before = card.attachments.len();
            card.attachments.retain(|a| a.id != attachment_id);
            card.attachments.len() != before
        })?;
        self.publish_updated(board_id, committed.value);
        Ok(committed)
    }

    fn publish_updated(&self, board_id: &str, changed: bool) {
        if changed {
            self.events.publish(BoardEvent::BoardUpdated {
                board_id: board_id.to_string(),
            });
        }
    }
}
