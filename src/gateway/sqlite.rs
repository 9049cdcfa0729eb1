use std::cell::RefCell;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use super::{Gateway, GatewayError, SessionEvent, TaskFilter};
use crate::listeners::{Listeners, Subscription};
use crate::model::{NewTask, Session, Task, TaskChanges, User};

pub const MIN_PASSWORD_LEN: usize = 6;

/// The embedded backend: users, sessions and tasks in one SQLite
/// database, plus the access token of the caller it is serving.
pub struct SqliteGateway {
    db: Connection,
    access_token: RefCell<Option<String>>,
    session_ttl: Duration,
    listeners: Listeners<SessionEvent>,
}

/// Initialize the backend schema. Safe to run on an existing database.
pub fn init_schema(db: &Connection) -> rusqlite::Result<()> {
    db.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
                  id              TEXT PRIMARY KEY,
                  email           TEXT NOT NULL UNIQUE,
                  password_salt   TEXT NOT NULL,
                  password_hash   TEXT NOT NULL,
                  created_at      TEXT NOT NULL
                  );
         CREATE TABLE IF NOT EXISTS sessions (
                  token           TEXT PRIMARY KEY,
                  user_id         TEXT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
                  expires_at      TEXT NOT NULL
                  );
         CREATE TABLE IF NOT EXISTS tasks (
                  id              TEXT PRIMARY KEY,
                  user_id         TEXT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
                  title           TEXT NOT NULL,
                  description     TEXT,
                  status          INTEGER NOT NULL DEFAULT 0,
                  completion_date TEXT,
                  created_at      TEXT NOT NULL,
                  updated_at      TEXT NOT NULL
                  );
         CREATE INDEX IF NOT EXISTS tasks_owner ON tasks (user_id, created_at);
         CREATE TABLE IF NOT EXISTS recipes (
                  id              TEXT PRIMARY KEY,
                  user_id         TEXT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
                  title           TEXT NOT NULL,
                  ingredients     TEXT NOT NULL DEFAULT '[]',
                  instructions    TEXT,
                  created_at      TEXT NOT NULL,
                  updated_at      TEXT NOT NULL
                  );",
    )
}

impl SqliteGateway {
    /// Open the backend database at `path`, creating the schema if needed.
    pub fn open(path: &Path, session_ttl: Duration) -> Result<Self, GatewayError> {
        let db = Connection::open(path)?;
        Self::with_connection(db, session_ttl)
    }

    pub fn open_in_memory(session_ttl: Duration) -> Result<Self, GatewayError> {
        let db = Connection::open_in_memory()?;
        Self::with_connection(db, session_ttl)
    }

    fn with_connection(db: Connection, session_ttl: Duration) -> Result<Self, GatewayError> {
        db.execute_batch("PRAGMA foreign_keys = ON;")?;
        init_schema(&db)?;
        Ok(SqliteGateway {
            db,
            access_token: RefCell::new(None),
            session_ttl,
            listeners: Listeners::new(),
        })
    }

    /// Present a previously issued access token, as a browser presents
    /// its cookie.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.borrow_mut() = token;
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.borrow().clone()
    }

    /// Resolve the presented token to its user. Expired sessions are
    /// deleted and reported as signed out.
    fn session_user(&self) -> Result<Option<(User, DateTime<Utc>)>, GatewayError> {
        let token = match self.access_token() {
            Some(token) => token,
            None => return Ok(None),
        };

        let found = self
            .db
            .query_row(
                "SELECT u.id, u.email, u.created_at, s.expires_at
                 FROM sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1",
                params![token],
                |row| Ok((user_from_row(row)?, row.get::<_, DateTime<Utc>>(3)?)),
            )
            .optional()?;

        match found {
            Some((user, expires_at)) if expires_at > Utc::now() => Ok(Some((user, expires_at))),
            Some(_) => {
                debug!("session token expired");
                self.db
                    .execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
                self.end_session();
                Ok(None)
            }
            None => {
                debug!("unknown session token");
                self.set_access_token(None);
                Ok(None)
            }
        }
    }

    fn require_user(&self, operation: &'static str, id: &str) -> Result<User, GatewayError> {
        match self.session_user()? {
            Some((user, _)) => Ok(user),
            None => Err(GatewayError::RowPolicy {
                operation,
                id: id.to_string(),
            }),
        }
    }

    fn issue_token(&self, user: &User) -> Result<Session, GatewayError> {
        let expires_at = Utc::now()
            .checked_add_signed(self.session_ttl)
            .ok_or_else(|| GatewayError::Auth("Session lifetime is out of range".to_string()))?;
        let session = Session {
            user: user.clone(),
            access_token: Uuid::new_v4().to_string(),
            expires_at,
        };
        self.db.execute(
            "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
            params![session.access_token, session.user.id, session.expires_at],
        )?;
        Ok(session)
    }

    fn revoke_presented_token(&self) -> Result<(), GatewayError> {
        if let Some(token) = self.access_token() {
            self.db
                .execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        }
        Ok(())
    }

    fn start_session(&self, user: &User) -> Result<Session, GatewayError> {
        self.revoke_presented_token()?;
        let session = self.issue_token(user)?;
        self.set_access_token(Some(session.access_token.clone()));
        self.listeners.emit(&SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    fn end_session(&self) {
        self.set_access_token(None);
        self.listeners.emit(&SessionEvent::SignedOut);
    }

    /// Move the expiry of the presented session to `remaining` from now.
    #[cfg(test)]
    pub(crate) fn expire_session_in(&self, remaining: Duration) {
        let token = self.access_token().expect("no session to expire");
        self.db
            .execute(
                "UPDATE sessions SET expires_at = ?1 WHERE token = ?2",
                params![Utc::now() + remaining, token],
            )
            .unwrap();
    }
}

impl Gateway for SqliteGateway {
    fn current_user(&self) -> Result<Option<User>, GatewayError> {
        Ok(self.session_user()?.map(|(user, _)| user))
    }

    fn refresh_session(&self) -> Result<Option<Session>, GatewayError> {
        let (user, expires_at) = match self.session_user()? {
            Some(found) => found,
            None => return Ok(None),
        };

        // rotate once less than half of the lifetime is left
        if expires_at - Utc::now() > self.session_ttl / 2 {
            return Ok(None);
        }

        self.revoke_presented_token()?;
        let session = self.issue_token(&user)?;
        self.set_access_token(Some(session.access_token.clone()));
        debug!(user = %user.id, "session token rotated");
        self.listeners
            .emit(&SessionEvent::TokenRefreshed(session.clone()));
        Ok(Some(session))
    }

    fn on_session_change(&self, callback: Box<dyn Fn(&SessionEvent)>) -> Subscription {
        self.listeners.subscribe(callback)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Session, GatewayError> {
        let email = normalize_email(email);
        let found = self
            .db
            .query_row(
                "SELECT id, email, created_at, password_salt, password_hash FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok((
                        user_from_row(row)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        match found {
            Some((user, salt, hash)) if hash_password(&salt, password) == hash => {
                info!(user = %user.id, "signed in");
                self.start_session(&user)
            }
            _ => Err(GatewayError::Auth("Invalid login credentials".to_string())),
        }
    }

    fn sign_up(&self, email: &str, password: &str) -> Result<Session, GatewayError> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(GatewayError::Auth("Unable to validate email address: invalid format".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(GatewayError::Auth(format!(
                "Password should be at least {} characters.",
                MIN_PASSWORD_LEN
            )));
        }

        let taken = self
            .db
            .query_row("SELECT count(*) FROM users WHERE email = ?1", params![email], |row| {
                row.get::<_, u32>(0)
            })?;
        if taken > 0 {
            return Err(GatewayError::Auth("User already registered".to_string()));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            created_at: Utc::now(),
        };
        let salt = new_salt();
        self.db.execute(
            "INSERT INTO users (id, email, password_salt, password_hash, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user.id, user.email, salt, hash_password(&salt, password), user.created_at],
        )?;
        info!(user = %user.id, "signed up");
        self.start_session(&user)
    }

    fn sign_out(&self) -> Result<(), GatewayError> {
        self.revoke_presented_token()?;
        info!("signed out");
        self.end_session();
        Ok(())
    }

    fn select_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, GatewayError> {
        let user = match self.session_user()? {
            Some((user, _)) => user,
            // anonymous callers see no rows
            None => return Ok(Vec::new()),
        };

        let mut stmt = self.db.prepare(
            "SELECT id, user_id, title, description, status, completion_date, created_at, updated_at
             FROM tasks
             WHERE user_id = ?1
               AND (?2 IS NULL OR id = ?2)
               AND (?3 IS NULL OR status = ?3)
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let mapped_rows = stmt.query_map(params![user.id, filter.id, filter.status], |row| {
            task_from_row(row)
        })?;

        let mut tasks = Vec::new();
        for task in mapped_rows {
            tasks.push(task?);
        }
        debug!(count = tasks.len(), "selected tasks");
        Ok(tasks)
    }

    fn insert_task(&self, fields: &NewTask) -> Result<(), GatewayError> {
        let user = self.require_user("insert", "(new)")?;
        if fields.user_id != user.id {
            return Err(GatewayError::RowPolicy {
                operation: "insert",
                id: "(new)".to_string(),
            });
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        self.db.execute(
            "INSERT INTO tasks (id, user_id, title, description, status, completion_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                id,
                fields.user_id,
                fields.title,
                fields.description,
                fields.status,
                fields.completion_date,
                now
            ],
        )?;
        debug!(task = %id, "inserted task");
        Ok(())
    }

    fn update_task(&self, id: &str, fields: &TaskChanges) -> Result<(), GatewayError> {
        let user = self.require_user("update", id)?;
        let changed = self.db.execute(
            "UPDATE tasks SET title = ?1, description = ?2, completion_date = ?3, status = ?4, updated_at = ?5
             WHERE id = ?6 AND user_id = ?7",
            params![
                fields.title,
                fields.description,
                fields.completion_date,
                fields.status,
                Utc::now(),
                id,
                user.id
            ],
        )?;
        if changed == 0 {
            return Err(GatewayError::RowPolicy {
                operation: "update",
                id: id.to_string(),
            });
        }
        debug!(task = %id, "updated task");
        Ok(())
    }

    fn delete_task(&self, id: &str) -> Result<(), GatewayError> {
        let user = self.require_user("delete", id)?;
        let deleted = self.db.execute(
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
            params![id, user.id],
        )?;
        if deleted == 0 {
            return Err(GatewayError::RowPolicy {
                operation: "delete",
                id: id.to_string(),
            });
        }
        debug!(task = %id, "deleted task");
        Ok(())
    }
}

/// Return a user from a row in this order: [id, email, created_at]
fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        created_at: row.get(2)?,
    })
}

/// Return a task from a row in this order: [id, user_id, title,
/// description, status, completion_date, created_at, updated_at]
fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        completion_date: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn new_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    to_hex(&bytes)
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
