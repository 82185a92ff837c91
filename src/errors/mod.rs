//! Error handling module for the meal board.
//!
//! Provides a centralized error type with stable codes that the list and form
//! layers turn into log lines or user-visible alerts.

/// Error codes as constants to avoid stringly-typed errors.
#[allow(dead_code)]
pub mod codes {
    pub const DECODE_ERROR: &str = "DECODE_ERROR";
    pub const SUBSCRIPTION_ERROR: &str = "SUBSCRIPTION_ERROR";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const WRITE_ERROR: &str = "WRITE_ERROR";
    pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
}

/// Application error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Snapshot or record had an unexpected shape
    Decode(String),
    /// Live listener failed or was closed by the server
    Subscription(String),
    /// Database rules rejected the request
    PermissionDenied(String),
    /// Field or key failed a local rule
    Validation(String),
    /// Create, update, or remove was rejected by the database
    Write(String),
    /// Network or HTTP failure
    Transport(String),
    /// Invalid configuration value
    Config(String),
}

impl AppError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Decode(_) => codes::DECODE_ERROR,
            AppError::Subscription(_) => codes::SUBSCRIPTION_ERROR,
            AppError::PermissionDenied(_) => codes::PERMISSION_DENIED,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Write(_) => codes::WRITE_ERROR,
            AppError::Transport(_) => codes::TRANSPORT_ERROR,
            AppError::Config(_) => codes::CONFIG_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Decode(msg) => msg.clone(),
            AppError::Subscription(msg) => msg.clone(),
            AppError::PermissionDenied(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Write(msg) => msg.clone(),
            AppError::Transport(msg) => msg.clone(),
            AppError::Config(msg) => msg.clone(),
        }
    }

    /// Whether a listener should stop instead of reconnecting after this error.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppError::PermissionDenied(_) | AppError::Config(_))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Transport error: {:?}", err);
        AppError::Transport(format!("Transport error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Decode(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = AppError::Write("Permission denied".to_string());
        assert_eq!(err.to_string(), "WRITE_ERROR: Permission denied");
    }

    #[test]
    fn test_terminal_errors() {
        assert!(AppError::PermissionDenied("no".into()).is_terminal());
        assert!(!AppError::Transport("reset".into()).is_terminal());
        assert!(!AppError::Subscription("closed".into()).is_terminal());
    }

    #[test]
    fn test_json_error_maps_to_decode() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.error_code(), codes::DECODE_ERROR);
    }
}
