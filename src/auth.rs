//! Authentication session controller
//!
//! The single owner of session state: it decides whether the application
//! is logged in, and it is the only writer of the session store. Readers
//! observe state through snapshots or a watch subscription; they never
//! reach into storage directly.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

use crate::client::{ApiClient, Body, RequestOptions};
use crate::error::{Result, ShortlyError};
use crate::model::{AuthResponse, User};
use crate::store::SessionStore;
use crate::version::CURRENT_VERSION;

const INVALID_CREDENTIALS_MESSAGE: &str =
    "Invalid username or password, or client not authorized";
const GENERIC_LOGIN_MESSAGE: &str = "Something went wrong during login. Please try again.";

/// Observable authentication state
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub is_loading: bool,
    pub login_error: Option<String>,
}

impl AuthState {
    /// State on application load, before the stored session is checked
    pub fn initializing() -> Self {
        Self {
            user: None,
            is_loading: true,
            login_error: None,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            user: None,
            is_loading: false,
            login_error: None,
        }
    }

    pub fn authenticated(user: User) -> Self {
        Self {
            user: Some(user),
            is_loading: false,
            login_error: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Snapshot for the `status` command
#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub version: String,
    pub endpoint: String,
    pub authenticated: bool,
    pub username: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Login, logout and startup restoration on top of the request client
/// and the session store.
pub struct AuthSession {
    client: ApiClient,
    store: Arc<SessionStore>,
    state: watch::Sender<AuthState>,
}

impl AuthSession {
    pub fn new(client: ApiClient) -> Self {
        let store = client.store().clone();
        let (state, _) = watch::channel(AuthState::initializing());
        Self {
            client,
            store,
            state,
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Restore the persisted session on startup.
    ///
    /// Missing token or user means Anonymous; a past expiry purges all
    /// three fields. An orphaned token (present with no user record, the
    /// known crash-between-writes gap) is silently discarded.
    pub fn restore(&self) {
        let token = self.store.token();
        let user_json = self.store.user_json();

        let (Some(_), Some(user_json)) = (token, user_json) else {
            self.clear_session();
            self.state.send_replace(AuthState::anonymous());
            return;
        };

        if let Some(expiry) = self.store.expiry() {
            if Utc::now().timestamp_millis() > expiry {
                tracing::debug!("stored session has expired, clearing");
                self.clear_session();
                self.state.send_replace(AuthState::anonymous());
                return;
            }
        }

        match serde_json::from_str::<User>(&user_json) {
            Ok(user) => {
                tracing::debug!(username = %user.username, "session restored");
                self.state.send_replace(AuthState::authenticated(user));
            }
            Err(e) => {
                tracing::warn!(error = %e, "stored user record is unreadable, clearing session");
                self.clear_session();
                self.state.send_replace(AuthState::anonymous());
            }
        }
    }

    /// Exchange credentials for a session.
    ///
    /// Never returns an error: failures come back as `false` with a
    /// readable message in `login_error`, and leave no partial session
    /// state behind.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        self.state.send_replace(AuthState {
            user: None,
            is_loading: true,
            login_error: None,
        });

        match self.try_login(username, password).await {
            Ok(user) => {
                tracing::info!(username = %user.username, "login succeeded");
                self.state.send_replace(AuthState::authenticated(user));
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "login failed");
                self.clear_session();
                self.state.send_replace(AuthState {
                    user: None,
                    is_loading: false,
                    login_error: Some(translate_login_error(&err)),
                });
                false
            }
        }
    }

    async fn try_login(&self, username: &str, password: &str) -> Result<User> {
        let body = Body::Form(vec![
            ("grant_type".to_string(), "password".to_string()),
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
        ]);
        let options = RequestOptions::default().header("Accept", "application/json");

        let response: AuthResponse = self.client.post("/users/login", Some(body), options).await?;

        let (Some(token), Some(_token_type)) = (response.access_token, response.token_type) else {
            return Err(ShortlyError::invalid_response(
                "Login response did not include a token",
            ));
        };

        // Persist the token first so the user fetch is authenticated.
        // Any failure past this point rolls the session back.
        self.store.set_token(token)?;

        let me: Value = self
            .client
            .get("/users/me", RequestOptions::default())
            .await?;

        if me.get("id").and_then(Value::as_u64).is_none() {
            return Err(ShortlyError::invalid_response(
                "Could not fetch the user record",
            ));
        }

        let user: User = serde_json::from_value(me)
            .map_err(|e| ShortlyError::invalid_response(format!("Unusable user record: {}", e)))?;

        self.store.set_user_json(serde_json::to_string(&user)?)?;
        let expiry = Utc::now().timestamp_millis() + self.client.config().token_lifetime;
        self.store.set_expiry(expiry)?;

        Ok(user)
    }

    /// Drop the session. Safe to call when already anonymous.
    pub fn logout(&self) {
        self.clear_session();
        self.state.send_replace(AuthState::anonymous());
    }

    /// Status snapshot for the CLI
    pub fn status(&self) -> StatusInfo {
        let state = self.state();
        StatusInfo {
            version: CURRENT_VERSION.to_string(),
            endpoint: self.client.config().base_url.clone(),
            authenticated: state.is_authenticated(),
            username: state.user.map(|u| u.username),
            expires_at: self
                .store
                .expiry()
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        }
    }

    fn clear_session(&self) {
        if let Err(e) = self.store.clear_all() {
            tracing::warn!(error = %e, "failed to clear session storage");
        }
    }
}

/// Map a login failure to the message shown inline in the UI
fn translate_login_error(err: &ShortlyError) -> String {
    match err.status() {
        Some(400) | Some(401) | Some(403) => err
            .data()
            .and_then(|data| data.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| INVALID_CREDENTIALS_MESSAGE.to_string()),
        _ => {
            let message = err.to_string();
            if message.is_empty() {
                GENERIC_LOGIN_MESSAGE.to_string()
            } else {
                message
            }
        }
    }
}
