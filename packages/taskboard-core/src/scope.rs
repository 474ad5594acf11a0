/// Per-user projection of the full board collection.
///
/// The full collection is never filtered in place; every view is derived from
/// it on demand.
use serde::Serialize;

use crate::types::Board;

/// What the active user sees: their boards and the focused one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub user_id: Option<String>,
    pub boards: Vec<Board>,
    pub selected_board_id: Option<String>,
}

impl BoardView {
    pub fn selected_board(&self) -> Option<&Board> {
        let id = self.selected_board_id.as_deref()?;
        self.board(id)
    }

    pub fn board(&self, board_id: &str) -> Option<&Board> {
        self.boards.iter().find(|b| b.id == board_id)
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }
}

/// Boards owned by `user_id`, in collection order.
pub fn scope(boards: &[Board], user_id: &str) -> Vec<Board> {
    boards
        .iter()
        .filter(|b| b.created_by == user_id)
        .cloned()
        .collect()
}

/// Derive the active user's view.
///
/// No user: empty view, nothing selected. Otherwise the requested selection
/// is kept when it is one of the user's boards, else the first of them is
/// selected, else nothing.
pub fn derive_view(boards: &[Board], user_id: Option<&str>, selected: Option<&str>) -> BoardView {
    let Some(user_id) = user_id else {
        return BoardView::default();
    };
    let scoped = scope(boards, user_id);
    let selected_board_id = selected
        .filter(|id| scoped.iter().any(|b| b.id == *id))
        .map(str::to_string)
        .or_else(|| scoped.first().map(|b| b.id.clone()));
    BoardView {
        user_id: Some(user_id.to_string()),
        boards: scoped,
        selected_board_id,
    }
}

/// Boards whose name contains `term`, ignoring case. A blank term matches all.
pub fn search_boards<'a>(boards: &'a [Board], term: &str) -> Vec<&'a Board> {
    let term = term.trim().to_lowercase();
    boards
        .iter()
        .filter(|b| term.is_empty() || b.name.to_lowercase().contains(&term))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_LIST_NAMES;

    fn board(name: &str, owner: &str) -> Board {
        Board::new(name, owner, DEFAULT_LIST_NAMES)
    }

    fn ids(boards: &[Board]) -> Vec<&str> {
        boards.iter().map(|b| b.id.as_str()).collect()
    }

    #[test]
    fn test_scope_filters_by_owner_in_order() {
        let all = vec![board("a", "u1"), board("b", "u2"), board("c", "u1")];
        let mine = scope(&all, "u1");
        assert_eq!(ids(&mine), vec![all[0].id.as_str(), all[2].id.as_str()]);
        assert!(scope(&all, "u3").is_empty());
    }

    #[test]
    fn test_scopes_partition_collection() {
        let all = vec![
            board("a", "u1"),
            board("b", "u2"),
            board("c", "ghost"),
            board("d", "u2"),
            board("e", "u1"),
        ];
        let u1 = scope(&all, "u1");
        let u2 = scope(&all, "u2");
        assert!(u1.iter().all(|b| b.created_by == "u1"));
        assert!(u2.iter().all(|b| b.created_by == "u2"));

        let orphans: Vec<&Board> = all
            .iter()
            .filter(|b| b.created_by != "u1" && b.created_by != "u2")
            .collect();
        assert_eq!(u1.len() + u2.len() + orphans.len(), all.len());
        for b in &all {
            let hits = u1.iter().chain(u2.iter()).filter(|s| s.id == b.id).count()
                + orphans.iter().filter(|o| o.id == b.id).count();
            assert_eq!(hits, 1);
        }
    }

    #[test]
    fn test_logged_out_view_is_empty() {
        let all = vec![board("a", "u1")];
        let view = derive_view(&all, None, Some(all[0].id.as_str()));
        assert!(view.is_empty());
        assert_eq!(view.selected_board_id, None);
        assert_eq!(view.user_id, None);
    }

    #[test]
    fn test_selection_preserved_when_visible() {
        let all = vec![board("a", "u1"), board("b", "u1")];
        let view = derive_view(&all, Some("u1"), Some(all[1].id.as_str()));
        assert_eq!(view.selected_board_id.as_deref(), Some(all[1].id.as_str()));
        assert_eq!(view.selected_board().unwrap().name, "b");
    }

    #[test]
    fn test_selection_falls_back_to_first_owned() {
        let all = vec![board("other", "u2"), board("a", "u1"), board("b", "u1")];
        let view = derive_view(&all, Some("u1"), Some(all[0].id.as_str()));
        assert_eq!(view.selected_board_id.as_deref(), Some(all[1].id.as_str()));

        let view = derive_view(&all, Some("u1"), None);
        assert_eq!(view.selected_board_id.as_deref(), Some(all[1].id.as_str()));
    }

    #[test]
    fn test_no_boards_no_selection() {
        let all = vec![board("other", "u2")];
        let view = derive_view(&all, Some("u1"), Some("missing"));
        assert!(view.is_empty());
        assert_eq!(view.selected_board_id, None);
        assert_eq!(view.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn test_search_boards_case_insensitive() {
        let all = vec![board("Home chores", "u1"), board("Work", "u1"), board("HOMEWORK", "u1")];
        let found: Vec<&str> = search_boards(&all, "home")
            .into_iter()
            .map(|b| b.name.as_str())
            .collect();
        assert_eq!(found, vec!["Home chores", "HOMEWORK"]);
        assert_eq!(search_boards(&all, "  ").len(), 3);
        assert!(search_boards(&all, "garden").is_empty());
    }
}
