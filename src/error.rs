//! Error types for the guard client.

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong during a single check-in.
///
/// Every variant ends up as an `Error` state carrying `user_message()`;
/// none of them are fatal to the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckInError {
    /// Scanned or typed content is not a check-in token.
    #[error("malformed token: {0}")]
    Format(String),

    /// Camera or scanner device access was refused.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Transport failure before any HTTP status was received.
    #[error("network error: {0}")]
    Network(String),

    /// Session credential missing, expired or not allowed.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Backend answered with a non-success status. Carries the server's
    /// message when it sent one.
    #[error("server error: {}", .0.as_deref().unwrap_or("no detail"))]
    Server(Option<String>),

    /// Photo acquisition failed (denied, cancelled, or hardware).
    #[error("capture error: {0}")]
    Capture(String),
}

impl CheckInError {
    /// Message shown to the guard.
    pub fn user_message(&self) -> String {
        match self {
            CheckInError::Format(_) => "invalid format".to_owned(),
            CheckInError::Permission(_) => "permission denied".to_owned(),
            CheckInError::Network(_) => "could not reach the server".to_owned(),
            CheckInError::Auth(detail) if !detail.is_empty() => detail.clone(),
            CheckInError::Auth(_) => "session expired, please log in again".to_owned(),
            CheckInError::Server(Some(detail)) => detail.clone(),
            CheckInError::Server(None) => "the server rejected the request".to_owned(),
            CheckInError::Capture(_) => "capture failed".to_owned(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine a home directory for application data")]
    NoDataDir,

    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("not logged in")]
    NotLoggedIn,

    #[error("session file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file is corrupt: {0}")]
    Encoding(#[from] bincode::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_is_passed_through_verbatim() {
        let err = CheckInError::Server(Some("Este QR ya fue utilizado".to_owned()));
        assert_eq!(err.user_message(), "Este QR ya fue utilizado");
    }

    #[test]
    fn fallbacks_when_no_detail() {
        assert_eq!(
            CheckInError::Server(None).user_message(),
            "the server rejected the request"
        );
        assert_eq!(
            CheckInError::Auth(String::new()).user_message(),
            "session expired, please log in again"
        );
        assert_eq!(
            CheckInError::Network("connection refused".to_owned()).user_message(),
            "could not reach the server"
        );
    }

    #[test]
    fn fixed_messages_for_device_errors() {
        assert_eq!(
            CheckInError::Format("2 fields".to_owned()).user_message(),
            "invalid format"
        );
        assert_eq!(
            CheckInError::Capture("cancelled".to_owned()).user_message(),
            "capture failed"
        );
        assert_eq!(
            CheckInError::Permission("camera".to_owned()).user_message(),
            "permission denied"
        );
    }
}
