use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::AppError;
use crate::services::analysis::DashboardMetrics;

const CURRENT_USER_KEY: &str = "current_user";
const USERS_KEY: &str = "users";

fn analyses_key(user_id: &str) -> String {
    format!("analyses:{}", user_id)
}

/// A registered profile. Holds no credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Summary of one analysed upload, kept per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub file_name: String,
    pub dataset_name: String,
    pub metrics: DashboardMetrics,
    pub recommendations: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

pub trait SessionStore: Send + Sync {
    fn current_user(&self) -> Result<Option<UserProfile>, AppError>;

    /// `None` signs the current user out.
    fn set_current_user(&self, user: Option<&UserProfile>) -> Result<(), AppError>;

    fn registered_users(&self) -> Result<Vec<UserProfile>, AppError>;

    /// Fails with `InvalidInput` if the email is already registered.
    fn register_user(&self, name: &str, email: &str) -> Result<UserProfile, AppError>;

    /// Newest first.
    fn recent_analyses(&self, user_id: &str) -> Result<Vec<AnalysisRecord>, AppError>;

    /// Prepends `record`, keeping only the most recent ones.
    fn record_analysis(&self, user_id: &str, record: AnalysisRecord) -> Result<(), AppError>;
}

/// Key-value store of JSON blobs in a single SQLite table.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
    recent_limit: usize,
}

impl SqliteSessionStore {
    pub fn open_in_memory(recent_limit: usize) -> Result<Self, AppError> {
        info!("Opening in-memory session store");
        Self::init(Connection::open_in_memory()?, recent_limit)
    }

    pub fn open(path: &Path, recent_limit: usize) -> Result<Self, AppError> {
        info!("Opening session store at {}", path.display());
        Self::init(Connection::open(path)?, recent_limit)
    }

    fn init(conn: Connection, recent_limit: usize) -> Result<Self, AppError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            recent_limit,
        })
    }
}

fn get_blob<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>, AppError> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
        .optional()?;
    raw.map(|s| serde_json::from_str(&s).map_err(AppError::from))
        .transpose()
}

fn put_blob<T: Serialize>(conn: &Connection, key: &str, value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO kv (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, json],
    )?;
    debug!("Stored {} ({} bytes)", key, json.len());
    Ok(())
}

fn delete_blob(conn: &Connection, key: &str) -> Result<(), AppError> {
    conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
    Ok(())
}

impl SessionStore for SqliteSessionStore {
    fn current_user(&self) -> Result<Option<UserProfile>, AppError> {
        get_blob(&self.conn.lock(), CURRENT_USER_KEY)
    }

    fn set_current_user(&self, user: Option<&UserProfile>) -> Result<(), AppError> {
        let conn = self.conn.lock();
        match user {
            Some(user) => {
                info!("Current user set to {}", user.id);
                put_blob(&conn, CURRENT_USER_KEY, user)
            }
            None => {
                info!("Current user cleared");
                delete_blob(&conn, CURRENT_USER_KEY)
            }
        }
    }

    fn registered_users(&self) -> Result<Vec<UserProfile>, AppError> {
        Ok(get_blob::<Vec<UserProfile>>(&self.conn.lock(), USERS_KEY)?.unwrap_or_default())
    }

    fn register_user(&self, name: &str, email: &str) -> Result<UserProfile, AppError> {
        let name = name.trim();
        let email = email.trim().to_lowercase();
        if name.is_empty() || !email.contains('@') {
            return Err(AppError::InvalidInput("a name and a valid email are required".to_string()));
        }

        let conn = self.conn.lock();
        let mut users = get_blob::<Vec<UserProfile>>(&conn, USERS_KEY)?.unwrap_or_default();
        if users.iter().any(|u| u.email == email) {
            return Err(AppError::InvalidInput(format!("{} is already registered", email)));
        }

        let user = UserProfile {
            id: format!("u{}", users.len() + 1),
            name: name.to_string(),
            email,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        put_blob(&conn, USERS_KEY, &users)?;

        info!("Registered user {}", user.id);
        Ok(user)
    }

    fn recent_analyses(&self, user_id: &str) -> Result<Vec<AnalysisRecord>, AppError> {
        Ok(get_blob::<Vec<AnalysisRecord>>(&self.conn.lock(), &analyses_key(user_id))?.unwrap_or_default())
    }

    fn record_analysis(&self, user_id: &str, record: AnalysisRecord) -> Result<(), AppError> {
        let key = analyses_key(user_id);
        let conn = self.conn.lock();
        let mut records = get_blob::<Vec<AnalysisRecord>>(&conn, &key)?.unwrap_or_default();
        records.insert(0, record);
        records.truncate(self.recent_limit);
        put_blob(&conn, &key, &records)
    }
}
