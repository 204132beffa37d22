use std::time::Duration;
use thiserror::Error;

/// Raw failures reported by the browser automation layer.
#[derive(Error, Debug)]
pub enum BrowserAgentError {
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Browser not launched")]
    BrowserNotLaunched,

    #[error("Tab creation failed: {0}")]
    TabCreationFailed(String),

    #[error("No active tab")]
    NoActiveTab,

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Element interaction failed: {0}")]
    InteractionFailed(String),

    #[error("JavaScript execution failed: {0}")]
    JavaScriptFailed(String),

    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Chrome error: {0}")]
    ChromeError(String),
}

pub type Result<T> = std::result::Result<T, BrowserAgentError>;

impl BrowserAgentError {
    pub fn from_any_error<E: std::fmt::Display>(err: E) -> Self {
        BrowserAgentError::ChromeError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for BrowserAgentError {
    fn from(err: tokio::task::JoinError) -> Self {
        BrowserAgentError::ChromeError(format!("browser worker failed: {}", err))
    }
}

/// Classified outcome of a failed acquisition. Callers never need to look
/// past this type at raw automation errors.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("Authentication failed at {role}: {reason}")]
    AuthenticationFailed { role: String, reason: String },

    #[error("Session budget of {budget:?} exhausted")]
    Timeout { budget: Duration },

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Service temporarily unavailable: {0}")]
    TransientUnavailable(String),
}

impl AcquisitionError {
    /// Stable machine-readable code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AcquisitionError::AuthenticationFailed { .. } => "AUTHENTICATION_FAILED",
            AcquisitionError::Timeout { .. } => "TIMEOUT",
            AcquisitionError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            AcquisitionError::TransientUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Everything except a missing account is reported as the service being
    /// unavailable.
    pub fn is_service_unavailable(&self) -> bool {
        !matches!(self, AcquisitionError::AccountNotFound(_))
    }

    /// Only `AccountNotFound` is raised without a live session to snapshot.
    pub fn wants_diagnostics(&self) -> bool {
        !matches!(self, AcquisitionError::AccountNotFound(_))
    }

    /// Short tag used to label diagnostics snapshots.
    pub fn diagnostics_tag(&self) -> String {
        match self {
            AcquisitionError::AuthenticationFailed { role, .. } => format!("auth_{}", role),
            AcquisitionError::Timeout { .. } => "timeout".to_string(),
            AcquisitionError::AccountNotFound(_) => "account_not_found".to_string(),
            AcquisitionError::TransientUnavailable(_) => "unavailable".to_string(),
        }
    }
}

impl From<BrowserAgentError> for AcquisitionError {
    fn from(err: BrowserAgentError) -> Self {
        match err {
            BrowserAgentError::TimeoutError(msg) => {
                AcquisitionError::TransientUnavailable(format!("browser timed out: {}", msg))
            }
            other => AcquisitionError::TransientUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let auth = AcquisitionError::AuthenticationFailed {
            role: "login_trigger".to_string(),
            reason: "no visible element".to_string(),
        };
        assert_eq!(auth.code(), "AUTHENTICATION_FAILED");
        assert_eq!(auth.diagnostics_tag(), "auth_login_trigger");
        assert_eq!(
            AcquisitionError::AccountNotFound("x".into()).code(),
            "ACCOUNT_NOT_FOUND"
        );
        assert_eq!(
            AcquisitionError::TransientUnavailable("down".into()).code(),
            "SERVICE_UNAVAILABLE"
        );
    }

    #[test]
    fn test_not_found_is_reported_distinctly() {
        assert!(!AcquisitionError::AccountNotFound("x".into()).is_service_unavailable());
        assert!(!AcquisitionError::AccountNotFound("x".into()).wants_diagnostics());
        assert!(AcquisitionError::Timeout {
            budget: Duration::from_secs(1)
        }
        .is_service_unavailable());
    }

    #[test]
    fn test_browser_errors_classify_as_transient() {
        let err: AcquisitionError = BrowserAgentError::LaunchFailed("no chrome".into()).into();
        assert!(matches!(err, AcquisitionError::TransientUnavailable(_)));
    }
}
