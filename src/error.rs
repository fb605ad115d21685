//! Unified error handling for the shortly CLI and SDK
//!
//! Every failure carries a unique `EXXX` code for debugging and support:
//! - E1XX: Authentication and session errors
//! - E2XX: Network and API errors
//! - E3XX: File and I/O errors
//! - E4XX: Configuration errors
//! - E5XX: Validation and input errors
//! - E9XX: Internal errors

use std::fmt;
use thiserror::Error;

/// Unified Result type for all shortly operations
pub type Result<T> = std::result::Result<T, ShortlyError>;

/// Error codes for shortly operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication (E1XX)
    /// E101: Authentication failed
    AuthenticationFailed,

    // Network (E2XX)
    /// E201: HTTP request failed
    HttpError,
    /// E202: Request timed out
    RequestTimeout,
    /// E203: API returned error response
    ApiError,
    /// E204: Invalid API response format
    InvalidResponse,

    // File/IO (E3XX)
    /// E301: File read error
    FileReadError,
    /// E302: File write error
    FileWriteError,

    // Configuration (E4XX)
    /// E401: Configuration error
    ConfigError,
    /// E402: Invalid endpoint URL
    InvalidEndpoint,

    // Validation (E5XX)
    /// E501: Invalid input
    InvalidInput,
    /// E502: Invalid URL
    InvalidUrl,

    // Internal (E9XX)
    /// E901: Internal error
    InternalError,
    /// E902: Serialization error
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u16 {
        match self {
            ErrorCode::AuthenticationFailed => 101,

            ErrorCode::HttpError => 201,
            ErrorCode::RequestTimeout => 202,
            ErrorCode::ApiError => 203,
            ErrorCode::InvalidResponse => 204,

            ErrorCode::FileReadError => 301,
            ErrorCode::FileWriteError => 302,

            ErrorCode::ConfigError => 401,
            ErrorCode::InvalidEndpoint => 402,

            ErrorCode::InvalidInput => 501,
            ErrorCode::InvalidUrl => 502,

            ErrorCode::InternalError => 901,
            ErrorCode::SerializationError => 902,
        }
    }

    /// Get the string code (e.g., "E203")
    pub fn as_str(&self) -> String {
        format!("E{}", self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.code())
    }
}

/// Main error type for all shortly operations
#[derive(Error, Debug)]
pub enum ShortlyError {
    // ==================== Authentication Errors (E1XX) ====================
    /// Authentication or session error
    #[error("[{code}] Authentication failed: {message}")]
    Authentication { code: ErrorCode, message: String },

    // ==================== Network Errors (E2XX) ====================
    /// API error with HTTP status and the parsed response body
    #[error("[{code}] API error ({status}): {message}")]
    Api {
        code: ErrorCode,
        status: u16,
        message: String,
        data: serde_json::Map<String, serde_json::Value>,
    },

    /// Request deadline elapsed before a response arrived
    #[error("[E202] Request timed out")]
    Timeout,

    // ==================== File/IO Errors (E3XX) ====================
    /// File or IO error
    #[error("[{code}] {context}: {message}")]
    Io {
        code: ErrorCode,
        context: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // ==================== Configuration Errors (E4XX) ====================
    /// Configuration error
    #[error("[{code}] Configuration error: {message}")]
    Config {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<config::ConfigError>,
    },

    // ==================== Validation Errors (E5XX) ====================
    /// Validation error caught before any network call
    #[error("[{code}] Validation error: {message}")]
    Validation { code: ErrorCode, message: String },

    // ==================== Internal Errors (E9XX) ====================
    /// Internal/Unexpected error
    #[error("[{code}] Internal error: {message}")]
    Internal { code: ErrorCode, message: String },

    /// JSON serialization error
    #[error("[{code}] Serialization error: {message}")]
    Serialization {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

// ==================== Constructor Methods ====================

impl ShortlyError {
    /// Create authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::AuthenticationFailed,
            message: message.into(),
        }
    }

    /// Create API error with an empty data map
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::ApiError,
            status,
            message: message.into(),
            data: serde_json::Map::new(),
        }
    }

    /// Create API error carrying the parsed response body
    pub fn api_with_data(
        status: u16,
        message: impl Into<String>,
        data: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self::Api {
            code: ErrorCode::ApiError,
            status,
            message: message.into(),
            data,
        }
    }

    /// Create invalid response error (success status, unusable payload)
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::InvalidResponse,
            status: 0,
            message: message.into(),
            data: serde_json::Map::new(),
        }
    }

    /// Create IO error with context
    pub fn io(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            code: ErrorCode::FileReadError,
            context: context.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create IO error from std::io::Error
    pub fn io_from_error(context: impl Into<String>, err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorCode::FileWriteError,
            _ => ErrorCode::FileReadError,
        };

        Self::Io {
            code,
            context: context.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::ConfigError,
            message: message.into(),
            source: None,
        }
    }

    /// Create invalid endpoint error
    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::InvalidEndpoint,
            message: message.into(),
            source: None,
        }
    }

    /// Create validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::InvalidInput,
            message: message.into(),
        }
    }

    /// Create invalid URL error
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::InvalidUrl,
            message: message.into(),
        }
    }

    /// Create internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: ErrorCode::InternalError,
            message: message.into(),
        }
    }

    /// Create serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            code: ErrorCode::SerializationError,
            message: message.into(),
            source: None,
        }
    }

    // --- Utility Methods ---

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication { code, .. } => *code,
            Self::Api { code, .. } => *code,
            Self::Timeout => ErrorCode::RequestTimeout,
            Self::Io { code, .. } => *code,
            Self::Config { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::Internal { code, .. } => *code,
            Self::Serialization { code, .. } => *code,
        }
    }

    /// HTTP status associated with this error, if any.
    ///
    /// A timeout reports 408 so callers can treat both request-level
    /// failure kinds uniformly.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Timeout => Some(408),
            _ => None,
        }
    }

    /// Auxiliary data from the failed response body, if any
    pub fn data(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        match self {
            Self::Api { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

// ==================== From Implementations ====================

impl From<std::io::Error> for ShortlyError {
    fn from(err: std::io::Error) -> Self {
        Self::io_from_error("IO operation", err)
    }
}

impl From<reqwest::Error> for ShortlyError {
    fn from(err: reqwest::Error) -> Self {
        // The client enforces its own deadline, but a timeout can still
        // surface from connection setup inside reqwest.
        if err.is_timeout() {
            Self::Timeout
        } else {
            // Transport-level failure with no response: report it as a
            // server-side error so callers see one uniform shape.
            Self::Api {
                code: ErrorCode::HttpError,
                status: 500,
                message: err.to_string(),
                data: serde_json::Map::new(),
            }
        }
    }
}

impl From<serde_json::Error> for ShortlyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            code: ErrorCode::SerializationError,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<config::ConfigError> for ShortlyError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config {
            code: ErrorCode::ConfigError,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<dialoguer::Error> for ShortlyError {
    fn from(err: dialoguer::Error) -> Self {
        Self::Internal {
            code: ErrorCode::InternalError,
            message: format!("Dialog error: {}", err),
        }
    }
}
