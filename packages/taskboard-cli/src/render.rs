use chrono::NaiveDate;
use taskboard_core::types::{Board, Card, DueStatus, User};
use taskboard_core::BoardView;

pub fn user_line(user: &User) -> String {
    format!("{} <{}> [{}]", user.name, user.email, user.id)
}

/// One line per board, the selected one marked with `*`.
pub fn board_index(view: &BoardView, boards: &[&Board]) -> String {
    if boards.is_empty() {
        return "No boards.".to_string();
    }
    boards
        .iter()
        .map(|b| {
            let marker = if view.selected_board_id.as_deref() == Some(b.id.as_str()) {
                '*'
            } else {
                ' '
            };
            format!("{} {}  ({} cards) [{}]", marker, b.name, b.card_count(), b.id)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn due_label(card: &Card, today: NaiveDate) -> Option<String> {
    let due = card.due_date?;
    let status = match card.due_status(today)? {
        DueStatus::Overdue => "overdue",
        DueStatus::DueToday => "due today",
        DueStatus::Upcoming => "due",
    };
    Some(format!("{} {}", status, due))
}

pub fn board_detail(board: &Board, today: NaiveDate) -> String {
    let mut out = format!("{} [{}]\n", board.name, board.id);
    for list in &board.lists {
        out.push_str(&format!("\n## {} [{}]\n", list.name, list.id));
        if list.cards.is_empty() {
            out.push_str("   (empty)\n");
        }
        for card in &list.cards {
            out.push_str(&format!("   - {} [{}]", card.title, card.id));
            if !card.assignee.is_empty() {
                out.push_str(&format!(" @{}", card.assignee));
            }
            if let Some(label) = due_label(card, today) {
                out.push_str(&format!(" ({})", label));
            }
            out.push('\n');
            if !card.description.is_empty() {
                out.push_str(&format!("     {}\n", card.description));
            }
            for attachment in &card.attachments {
                out.push_str(&format!(
                    "     + {} ({} bytes) [{}]\n",
                    attachment.name, attachment.size, attachment.id
                ));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_core::types::{Card, DEFAULT_LIST_NAMES};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_board_index_marks_selection() {
        let a = Board::new("Alpha", "u1", DEFAULT_LIST_NAMES);
        let b = Board::new("Beta", "u1", DEFAULT_LIST_NAMES);
        let view = BoardView {
            user_id: Some("u1".into()),
            boards: vec![a.clone(), b.clone()],
            selected_board_id: Some(b.id.clone()),
        };
        let text = board_index(&view, &[&a, &b]);
        let lines: Vec<_> = text.lines().collect();
        assert!(lines[0].starts_with("  Alpha"));
        assert!(lines[1].starts_with("* Beta"));
        assert_eq!(board_index(&view, &[]), "No boards.");
    }

    #[test]
    fn test_board_detail_shows_due_status() {
        let mut board = Board::new("Home", "u1", ["To Do"]);
        board.lists[0].cards.push(Card {
            id: "c1".into(),
            title: "Pay rent".into(),
            description: String::new(),
            assignee: "sam".into(),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 31),
            created_by: "u1".into(),
            created_at: Default::default(),
            attachments: Vec::new(),
        });
        let text = board_detail(&board, today());
        assert!(text.contains("- Pay rent [c1] @sam (overdue 2024-05-31)"));
    }
}
