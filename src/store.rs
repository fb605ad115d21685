//! Durable session storage for the shortly SDK
//!
//! Exactly three fields survive process restarts: the bearer token, the
//! serialized user record, and the expiry instant (epoch milliseconds).
//! They live under fixed keys in one JSON file. The store exposes get,
//! set and clear per field; keeping the triple coherent is the auth
//! controller's job, not the store's.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, ShortlyError};

/// On-disk layout. Field names are the fixed storage keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_expiry: Option<i64>,
}

/// File-backed session store shared between the request client (reads the
/// token) and the auth controller (reads and writes everything).
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    data: Mutex<SessionData>,
}

impl SessionStore {
    /// Open the store, loading any previously persisted session
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = Self::load(&path)?;
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    fn load(path: &Path) -> Result<SessionData> {
        if !path.exists() {
            return Ok(SessionData::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ShortlyError::io("Failed to read session file", e.to_string()))?;

        if content.trim().is_empty() {
            return Ok(SessionData::default());
        }

        serde_json::from_str(&content)
            .map_err(|e| ShortlyError::internal(format!("Failed to parse session file: {}", e)))
    }

    fn save(&self, data: &SessionData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ShortlyError::io("Failed to create session directory", e.to_string())
            })?;
        }

        let content = serde_json::to_string_pretty(data)
            .map_err(|e| ShortlyError::serialization(e.to_string()))?;

        fs::write(&self.path, content)
            .map_err(|e| ShortlyError::io("Failed to write session file", e.to_string()))?;

        Ok(())
    }

    // --- token ---

    pub fn token(&self) -> Option<String> {
        self.data.lock().unwrap().auth_token.clone()
    }

    pub fn set_token(&self, token: impl Into<String>) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.auth_token = Some(token.into());
        self.save(&data)
    }

    pub fn clear_token(&self) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.auth_token = None;
        self.save(&data)
    }

    // --- user ---

    /// The serialized user record as stored
    pub fn user_json(&self) -> Option<String> {
        self.data.lock().unwrap().auth_user.clone()
    }

    pub fn set_user_json(&self, user: impl Into<String>) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.auth_user = Some(user.into());
        self.save(&data)
    }

    pub fn clear_user(&self) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.auth_user = None;
        self.save(&data)
    }

    // --- expiry ---

    /// Session expiry as epoch milliseconds
    pub fn expiry(&self) -> Option<i64> {
        self.data.lock().unwrap().token_expiry
    }

    pub fn set_expiry(&self, epoch_millis: i64) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.token_expiry = Some(epoch_millis);
        self.save(&data)
    }

    pub fn clear_expiry(&self) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.token_expiry = None;
        self.save(&data)
    }

    /// Remove all three session fields in one write
    pub fn clear_all(&self) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        *data = SessionData::default();
        self.save(&data)
    }
}
