/// Accounts: registration, login and the active identity.
///
/// The active user lives in the `currentUser` record; every identity switch
/// re-derives the scoped board view.
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::config::TaskboardConfig;
use crate::error::{Result, TaskboardError};
use crate::events::{BoardEvent, EventBus};
use crate::repository::sync_view;
use crate::scope::BoardView;
use crate::storage::{
    RecordStore, RecordStoreExt, StorageError, BOARDS_KEY, CURRENT_USER_KEY, USERS_KEY,
};
use crate::types::{new_id, Board, NewUser, User, UserPatch};

const FILL_ALL_FIELDS: &str = "Please fill in all fields";

pub struct Accounts<S: RecordStore> {
    store: Arc<S>,
    min_password_len: usize,
    events: EventBus,
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn field<'a>(entry: &'a Value, name: &str) -> Option<&'a str> {
    entry.get(name).and_then(Value::as_str)
}

fn to_entry(user: &User) -> Result<Value> {
    serde_json::to_value(user).map_err(|source| {
        StorageError::Encode {
            key: USERS_KEY.to_string(),
            source,
        }
        .into()
    })
}

/// Overwrite the typed fields of a stored entry, keeping any others it carries.
fn splice(entry: &mut Value, user: &User) -> Result<()> {
    match (entry, to_entry(user)?) {
        (Value::Object(existing), Value::Object(fields)) => existing.extend(fields),
        (entry, record) => *entry = record,
    }
    Ok(())
}

impl<S: RecordStore> Accounts<S> {
    pub(crate) fn new(store: Arc<S>, config: &TaskboardConfig, events: EventBus) -> Self {
        Self {
            store,
            min_password_len: config.min_password_len,
            events,
        }
    }

    pub fn users(&self) -> Result<Vec<User>> {
        Ok(self.store.read_collection(USERS_KEY)?)
    }

    /// `users` as stored. Entries that do not parse as [`User`] are kept so
    /// that rewriting the collection never drops them.
    fn stored_users(&self) -> Result<Vec<Value>> {
        Ok(self.store.read_collection(USERS_KEY)?)
    }

    pub fn current_user(&self) -> Result<Option<User>> {
        Ok(self.store.read_record(CURRENT_USER_KEY)?)
    }

    fn check_password_len(&self, password: &str) -> Result<()> {
        if password.chars().count() < self.min_password_len {
            return Err(TaskboardError::validation(format!(
                "Password must be at least {} characters long",
                self.min_password_len
            )));
        }
        Ok(())
    }

    /// Create an account and make it the active identity.
    pub fn register(&self, fields: NewUser) -> Result<(User, BoardView)> {
        if [&fields.name, &fields.email, &fields.password, &fields.confirm_password]
            .iter()
            .any(|f| is_blank(f))
        {
            return Err(TaskboardError::validation(FILL_ALL_FIELDS));
        }
        if fields.password != fields.confirm_password {
            return Err(TaskboardError::validation("Passwords do not match"));
        }
        self.check_password_len(&fields.password)?;

        let mut users = self.stored_users()?;
        if users
            .iter()
            .any(|u| field(u, "email") == Some(fields.email.as_str()))
        {
            return Err(TaskboardError::validation("User with this email already exists"));
        }

        let user = User {
            id: new_id(),
            name: fields.name,
            email: fields.email,
            password: fields.password,
            avatar: None,
            created_at: Utc::now(),
        };
        users.push(to_entry(&user)?);
        self.store.write_collection(USERS_KEY, &users)?;
        log::info!("[taskboard.accounts] Registered user {} ({})", user.name, user.id);

        let view = self.switch_identity(Some(&user))?;
        Ok((user, view))
    }

    /// Exact email and password match against the registered users.
    pub fn login(&self, email: &str, password: &str) -> Result<(User, BoardView)> {
        if is_blank(email) || password.is_empty() {
            return Err(TaskboardError::validation(FILL_ALL_FIELDS));
        }
        let user = self
            .users()?
            .into_iter()
            .find(|u| u.email == email && u.password == password)
            .ok_or(TaskboardError::Auth)?;

        log::info!("[taskboard.accounts] {} logged in", user.id);
        let view = self.switch_identity(Some(&user))?;
        Ok((user, view))
    }

    /// Drop the active identity. The resulting view is empty.
    pub fn logout(&self) -> Result<BoardView> {
        if let Some(user) = self.current_user()? {
            log::info!("[taskboard.accounts] {} logged out", user.id);
        }
        self.switch_identity(None)
    }

    /// Merge profile changes onto the active user and its `users` entry.
    pub fn update_user(&self, patch: UserPatch) -> Result<User> {
        let current = self.current_user()?.ok_or(TaskboardError::Auth)?;

        if patch.name.as_deref().is_some_and(is_blank)
            || patch.email.as_deref().is_some_and(is_blank)
        {
            return Err(TaskboardError::validation(FILL_ALL_FIELDS));
        }
        let password = patch.password.filter(|p| !p.is_empty());
        if let Some(password) = &password {
            self.check_password_len(password)?;
        }

        let mut users = self.stored_users()?;
        if let Some(email) = &patch.email {
            let taken = users.iter().any(|u| {
                field(u, "id") != Some(current.id.as_str())
                    && field(u, "email") == Some(email.as_str())
            });
            if taken {
                return Err(TaskboardError::validation("User with this email already exists"));
            }
        }

        let index = users
            .iter()
            .position(|u| field(u, "id") == Some(current.id.as_str()));
        let mut updated = index
            .and_then(|i| serde_json::from_value::<User>(users[i].clone()).ok())
            .unwrap_or(current);
        if let Some(name) = patch.name {
            updated.name = name;
        }
        if let Some(email) = patch.email {
            updated.email = email;
        }
        if let Some(password) = password {
            updated.password = password;
        }
        if let Some(avatar) = patch.avatar {
            updated.avatar = Some(avatar);
        }

        match index {
            Some(i) => splice(&mut users[i], &updated)?,
            None => log::warn!(
                "[taskboard.accounts] Active user {} is not registered, \
                 profile kept in session only",
                updated.id
            ),
        }
        self.store.write_collection(USERS_KEY, &users)?;
        self.store.write_record(CURRENT_USER_KEY, &updated)?;
        log::debug!("[taskboard.accounts] Updated profile of {}", updated.id);
        Ok(updated)
    }

    fn switch_identity(&self, user: Option<&User>) -> Result<BoardView> {
        match user {
            Some(user) => self.store.write_record(CURRENT_USER_KEY, user)?,
            None => self.store.clear(CURRENT_USER_KEY)?,
        }
        self.events.publish(BoardEvent::IdentityChanged {
            user_id: user.map(|u| u.id.clone()),
        });

        let boards: Vec<Board> = self.store.read_collection(BOARDS_KEY)?;
        sync_view(&*self.store, &self.events, &boards, None)
    }
}
