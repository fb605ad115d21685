//! Wire types for the shortly API

use serde::{Deserialize, Serialize};

/// Authenticated user record returned by `/users/me`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub role: String,
}

/// Response of the password-grant login endpoint.
///
/// Both fields are optional on the wire; the auth controller rejects a
/// reply that lacks either one.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
}

/// A short URL owned by the authenticated user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlItem {
    pub id: u64,
    pub code: String,
    pub original_url: String,
    pub created_at: String,
    #[serde(rename = "clickCount", default)]
    pub click_count: Option<u64>,
    #[serde(rename = "lastAccessed", default)]
    pub last_accessed: Option<String>,
}

/// Redirect resolution payload: the original URL behind a short code
#[derive(Debug, Clone, Deserialize)]
pub struct RedirectTarget {
    pub url: String,
}

/// Access statistics for a short URL
#[derive(Debug, Clone, Deserialize)]
pub struct UrlStats {
    #[serde(rename = "clickCount")]
    pub click_count: u64,
    #[serde(rename = "lastAccessed", default)]
    pub last_accessed: Option<String>,
}

/// Body of the access-tracking endpoint
#[derive(Debug, Clone, Serialize)]
pub struct UrlAccessData {
    pub timestamp: String,
    #[serde(rename = "userAgent")]
    pub user_agent: String,
    pub referer: Option<String>,
}

/// Body of the short-URL creation endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CreateUrlRequest {
    pub original_url: String,
}

/// Some endpoints return the payload directly, others wrap it in a
/// `{ "data": ... }` envelope. Decoding resolves the shape exactly once
/// at the API boundary.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Payload<T> {
    Enveloped { data: T },
    Bare(T),
}

impl<T> Payload<T> {
    /// Unwrap to the inner payload regardless of shape
    pub fn into_inner(self) -> T {
        match self {
            Payload::Enveloped { data } => data,
            Payload::Bare(inner) => inner,
        }
    }
}
