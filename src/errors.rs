use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;

/// Every failure the request layer can surface.
///
/// The first four variants are the classified kinds callers are expected to
/// branch on. `AuthExpired` is terminal: the stored credentials are gone and
/// the user has to sign in again.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("http {status}{}", with_message(.message))]
    Http {
        status: StatusCode,
        message: String,
        body: serde_json::Value,
    },

    #[error("request rejected with code {code}: {message}")]
    Validation {
        code: i64,
        status: Option<u16>,
        message: String,
    },

    #[error("re-authentication required: {0}")]
    AuthExpired(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

/// Closed tag for [`Error`], handy for matching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    Http,
    Validation,
    AuthExpired,
    Transport,
    Json,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Http => write!(f, "http_error"),
            ErrorKind::Validation => write!(f, "validation_error"),
            ErrorKind::AuthExpired => write!(f, "auth_expired"),
            ErrorKind::Transport => write!(f, "transport_error"),
            ErrorKind::Json => write!(f, "json_error"),
            ErrorKind::Config => write!(f, "config_error"),
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Http { .. } => ErrorKind::Http,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::AuthExpired(_) => ErrorKind::AuthExpired,
            Error::Transport(_) => ErrorKind::Transport,
            Error::Json(_) => ErrorKind::Json,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// HTTP-equivalent status, when one is known.
    ///
    /// Validation errors only carry a status when the envelope code looked
    /// like an HTTP status.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(status.as_u16()),
            Error::Validation { status, .. } => *status,
            Error::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Human readable message suitable for display.
    pub fn message(&self) -> Cow<'_, str> {
        match self {
            Error::Http { message, .. } | Error::Validation { message, .. } => {
                Cow::Borrowed(message.as_str())
            }
            Error::AuthExpired(message) | Error::Config(message) => {
                Cow::Borrowed(message.as_str())
            }
            other => Cow::Owned(other.to_string()),
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Error::AuthExpired(_))
    }

    pub(crate) fn auth_expired(reason: impl Into<String>) -> Self {
        Error::AuthExpired(reason.into())
    }
}

fn with_message(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {message}")
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
