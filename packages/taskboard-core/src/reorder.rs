/// Card moves over a board's lists.
///
/// A move names the dragged card and whatever it was dropped on: another
/// card, or a list (its empty area). Resolution:
/// - source = the list holding the dragged card
/// - target = the first list that holds the drop target card or has its id
/// - either unresolved, or dropped onto itself -> unchanged
/// - same list -> the card takes the target card's index; dropping on the
///   list itself moves it to the end
/// - different lists -> the card is appended to the end of the target list,
///   even when dropped onto a specific card there
///
/// Nothing here touches storage; the repository splices the result in.
use serde::{Deserialize, Serialize};

use crate::types::BoardList;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMove {
    pub dragged_card_id: String,
    /// A card id or a list id.
    pub drop_target_id: String,
}

impl CardMove {
    pub fn new(dragged_card_id: &str, drop_target_id: &str) -> Self {
        Self {
            dragged_card_id: dragged_card_id.to_string(),
            drop_target_id: drop_target_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MoveOutcome {
    Unchanged,
    Reordered {
        list_id: String,
        from: usize,
        to: usize,
    },
    Transferred {
        card_id: String,
        from_list_id: String,
        to_list_id: String,
    },
}

impl MoveOutcome {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, MoveOutcome::Unchanged)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveResult {
    pub lists: Vec<BoardList>,
    pub outcome: MoveOutcome,
}

impl MoveResult {
    fn unchanged(lists: &[BoardList]) -> Self {
        Self {
            lists: lists.to_vec(),
            outcome: MoveOutcome::Unchanged,
        }
    }
}

/// Index of the list holding `card_id`, with the card's index inside it.
pub fn locate_card(lists: &[BoardList], card_id: &str) -> Option<(usize, usize)> {
    lists
        .iter()
        .enumerate()
        .find_map(|(li, list)| list.position_of(card_id).map(|ci| (li, ci)))
}

/// Index of the first list that holds card `target_id` or is list `target_id`.
pub fn resolve_target(lists: &[BoardList], target_id: &str) -> Option<usize> {
    lists
        .iter()
        .position(|list| list.id == target_id || list.position_of(target_id).is_some())
}

/// Move one element from `from` to `to`, shifting the rest. Out-of-range
/// indices return the input unchanged.
pub fn move_item<T: Clone>(items: &[T], from: usize, to: usize) -> Vec<T> {
    let mut out = items.to_vec();
    if from >= out.len() || to >= out.len() || from == to {
        return out;
    }
    let item = out.remove(from);
    out.insert(to, item);
    out
}

pub fn apply_move(lists: &[BoardList], mv: &CardMove) -> MoveResult {
    if mv.dragged_card_id == mv.drop_target_id {
        return MoveResult::unchanged(lists);
    }
    let Some((source, from)) = locate_card(lists, &mv.dragged_card_id) else {
        return MoveResult::unchanged(lists);
    };
    let Some(target) = resolve_target(lists, &mv.drop_target_id) else {
        return MoveResult::unchanged(lists);
    };

    if source == target {
        let cards = &lists[source].cards;
        let to = cards
            .iter()
            .position(|c| c.id == mv.drop_target_id)
            .unwrap_or(cards.len() - 1);
        if to == from {
            return MoveResult::unchanged(lists);
        }
        let mut out = lists.to_vec();
        out[source].cards = move_item(cards, from, to);
        return MoveResult {
            lists: out,
            outcome: MoveOutcome::Reordered {
                list_id: lists[source].id.clone(),
                from,
                to,
            },
        };
    }

    let mut out = lists.to_vec();
    let card = out[source].cards.remove(from);
    out[target].cards.push(card);
    MoveResult {
        lists: out,
        outcome: MoveOutcome::Transferred {
            card_id: mv.dragged_card_id.clone(),
            from_list_id: lists[source].id.clone(),
            to_list_id: lists[target].id.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Card;
    use chrono::Utc;

    fn card(id: &str) -> Card {
        Card {
            id: id.to_string(),
            title: format!("Card {}", id),
            description: String::new(),
            assignee: String::new(),
            due_date: None,
            created_by: "u1".to_string(),
            created_at: Utc::now(),
            attachments: Vec::new(),
        }
    }

    fn list(id: &str, cards: &[&str]) -> BoardList {
        BoardList {
            id: id.to_string(),
            name: id.to_uppercase(),
            cards: cards.iter().map(|c| card(c)).collect(),
        }
    }

    fn ids(list: &BoardList) -> Vec<&str> {
        list.cards.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_move_item() {
        assert_eq!(move_item(&[1, 2, 3, 4], 0, 2), vec![2, 3, 1, 4]);
        assert_eq!(move_item(&[1, 2, 3, 4], 3, 0), vec![4, 1, 2, 3]);
        assert_eq!(move_item(&[1, 2, 3], 1, 1), vec![1, 2, 3]);
        assert_eq!(move_item(&[1, 2, 3], 5, 0), vec![1, 2, 3]);
    }

    #[test]
    fn test_same_list_move_down() {
        let lists = vec![list("todo", &["a", "b", "c", "d"]), list("done", &[])];
        let result = apply_move(&lists, &CardMove::new("a", "c"));
        assert_eq!(ids(&result.lists[0]), vec!["b", "c", "a", "d"]);
        assert_eq!(
            result.outcome,
            MoveOutcome::Reordered {
                list_id: "todo".into(),
                from: 0,
                to: 2,
            }
        );
        assert_eq!(result.lists[1], lists[1]);
    }

    #[test]
    fn test_same_list_move_up() {
        let lists = vec![list("todo", &["a", "b", "c", "d"])];
        let result = apply_move(&lists, &CardMove::new("d", "b"));
        assert_eq!(ids(&result.lists[0]), vec!["a", "d", "b", "c"]);
    }

    #[test]
    fn test_drop_on_own_list_moves_to_end() {
        let lists = vec![list("todo", &["a", "b", "c"])];
        let result = apply_move(&lists, &CardMove::new("a", "todo"));
        assert_eq!(ids(&result.lists[0]), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_cross_list_appends_to_end() {
        let lists = vec![list("todo", &["a", "b"]), list("done", &["x", "y"])];
        let result = apply_move(&lists, &CardMove::new("a", "x"));
        assert_eq!(ids(&result.lists[0]), vec!["b"]);
        assert_eq!(ids(&result.lists[1]), vec!["x", "y", "a"]);
        assert_eq!(result.lists[1].cards[2], lists[0].cards[0]);
        assert_eq!(
            result.outcome,
            MoveOutcome::Transferred {
                card_id: "a".into(),
                from_list_id: "todo".into(),
                to_list_id: "done".into(),
            }
        );
    }

    #[test]
    fn test_cross_list_onto_empty_list() {
        let lists = vec![list("todo", &["a"]), list("doing", &[]), list("done", &[])];
        let result = apply_move(&lists, &CardMove::new("a", "done"));
        assert!(result.lists[0].cards.is_empty());
        assert!(result.lists[1].cards.is_empty());
        assert_eq!(ids(&result.lists[2]), vec!["a"]);
    }

    #[test]
    fn test_noop_cases_return_input() {
        let lists = vec![list("todo", &["a", "b"]), list("done", &["c"])];
        for mv in [
            CardMove::new("a", "a"),
            CardMove::new("zzz", "b"),
            CardMove::new("a", "nowhere"),
            CardMove::new("b", "todo"),
            CardMove::new("c", "done"),
        ] {
            let result = apply_move(&lists, &mv);
            assert_eq!(result.outcome, MoveOutcome::Unchanged, "{:?}", mv);
            assert_eq!(result.lists, lists);
        }
    }

    #[test]
    fn test_input_is_not_mutated() {
        let lists = vec![list("todo", &["a", "b"]), list("done", &[])];
        let snapshot = lists.clone();
        let _ = apply_move(&lists, &CardMove::new("a", "done"));
        let _ = apply_move(&lists, &CardMove::new("b", "a"));
        assert_eq!(lists, snapshot);
    }

    #[test]
    fn test_same_list_preserves_relative_order() {
        let names: Vec<String> = (0..7).map(|i| format!("c{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let lists = vec![list("l", &refs)];

        for from in 0..refs.len() {
            for to in 0..refs.len() {
                let result = apply_move(&lists, &CardMove::new(refs[from], refs[to]));
                let moved = ids(&result.lists[0]);
                assert_eq!(moved.len(), refs.len());
                if from != to {
                    assert_eq!(moved[to], refs[from]);
                }
                let skip = refs[from];
                let others: Vec<&str> = moved.iter().copied().filter(|c| *c != skip).collect();
                let expected: Vec<&str> = refs.iter().copied().filter(|c| *c != skip).collect();
                assert_eq!(others, expected);
            }
        }
    }

    #[test]
    fn test_cross_list_conservation() {
        let lists = vec![
            list("a", &["a1", "a2", "a3"]),
            list("b", &["b1"]),
            list("c", &[]),
        ];
        for (card_id, target) in [("a2", "b1"), ("a1", "c"), ("b1", "a3"), ("a3", "b")] {
            let result = apply_move(&lists, &CardMove::new(card_id, target));
            let (src, _) = locate_card(&lists, card_id).unwrap();
            let dst = resolve_target(&lists, target).unwrap();

            let count = |l: &BoardList| l.cards.iter().filter(|c| c.id == card_id).count();
            assert_eq!(count(&result.lists[src]), 0);
            assert_eq!(count(&result.lists[dst]), 1);
            assert_eq!(result.lists[dst].cards.last().unwrap().id, card_id);
            assert_eq!(result.lists[src].cards.len(), lists[src].cards.len() - 1);
            assert_eq!(result.lists[dst].cards.len(), lists[dst].cards.len() + 1);
            let total: usize = result.lists.iter().map(|l| l.cards.len()).sum();
            assert_eq!(total, 4);
        }
    }
}
