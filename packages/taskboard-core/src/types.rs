use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Lists every new board starts with unless the config overrides them.
pub const DEFAULT_LIST_NAMES: &[&str] = &["To Do", "In Progress", "Done"];

/// Generate a fresh entity id (UUID v4).
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    /// Owning user id. Boards without one never survive migration.
    pub created_by: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub lists: Vec<BoardList>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardList {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assignee: String,
    #[serde(
        default,
        deserialize_with = "deserialize_due_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub uploaded_at: DateTime<Utc>,
    /// Where the attachment body lives (path, URL or data URI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_ref: Option<String>,
}

/// How a card's due date relates to a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DueStatus {
    Overdue,
    DueToday,
    Upcoming,
}

impl Board {
    /// Build a board owned by `owner_id` with one empty list per name.
    pub fn new<I, N>(name: &str, owner_id: &str, list_names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        Self {
            id: new_id(),
            name: name.to_string(),
            created_by: owner_id.to_string(),
            created_at: Utc::now(),
            lists: list_names
                .into_iter()
                .map(|n| BoardList::new(n.as_ref()))
                .collect(),
        }
    }

    pub fn list_mut(&mut self, list_id: &str) -> Option<&mut BoardList> {
        self.lists.iter_mut().find(|l| l.id == list_id)
    }

    pub fn card_count(&self) -> usize {
        self.lists.iter().map(|l| l.cards.len()).sum()
    }
}

impl BoardList {
    pub fn new(name: &str) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            cards: Vec::new(),
        }
    }

    pub fn card_mut(&mut self, card_id: &str) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.id == card_id)
    }

    pub fn position_of(&self, card_id: &str) -> Option<usize> {
        self.cards.iter().position(|c| c.id == card_id)
    }
}

impl Card {
    pub fn due_status(&self, today: NaiveDate) -> Option<DueStatus> {
        let due = self.due_date?;
        Some(if due < today {
            DueStatus::Overdue
        } else if due > today {
            DueStatus::Upcoming
        } else {
            DueStatus::DueToday
        })
    }
}

impl Attachment {
    pub fn from_upload(upload: NewAttachment) -> Self {
        Self {
            id: new_id(),
            name: upload.name,
            size: upload.size,
            mime_type: upload.mime_type,
            uploaded_at: Utc::now(),
            content_ref: upload.content_ref,
        }
    }
}

/// Fields of a card supplied by the caller on creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assignee: String,
    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub attachments: Vec<NewAttachment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttachment {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub content_ref: Option<String>,
}

/// Board fields a caller may change. `None` leaves the persisted value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardPatch {
    pub name: Option<String>,
    pub lists: Option<Vec<BoardList>>,
}

impl BoardPatch {
    pub fn lists(lists: Vec<BoardList>) -> Self {
        Self {
            lists: Some(lists),
            ..Self::default()
        }
    }

    pub fn rename(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn apply_to(self, board: &mut Board) {
        if let Some(name) = self.name {
            board.name = name;
        }
        if let Some(lists) = self.lists {
            board.lists = lists;
        }
    }
}

/// Card fields a caller may change. `due_date: Some(None)` clears the date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
    pub attachments: Option<Vec<Attachment>>,
}

impl CardPatch {
    pub fn apply_to(self, card: &mut Card) {
        if let Some(title) = self.title {
            card.title = title;
        }
        if let Some(description) = self.description {
            card.description = description;
        }
        if let Some(assignee) = self.assignee {
            card.assignee = assignee;
        }
        if let Some(due_date) = self.due_date {
            card.due_date = due_date;
        }
        if let Some(attachments) = self.attachments {
            card.attachments = attachments;
        }
    }
}

/// Registration form fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Profile changes. An empty `password` keeps the current one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<String>,
}

/// Older records store an empty string for "no due date" and sometimes a full
/// timestamp instead of a calendar date.
fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(ts.date_naive()));
    }
    log::warn!("[taskboard.types] Ignoring unparsable due date {:?}", raw);
    Ok(None)
}

/// Attachment ids were once millisecond timestamps stored as numbers.
fn deserialize_flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}
