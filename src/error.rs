//! Error types for the Gravitee gateway reconciler.
//!
//! This module provides the error hierarchy for every stage of a run:
//! parameter validation, authentication, remote management API calls and
//! reconciliation. Every variant maps onto a machine-usable [`ErrorKind`]
//! that is reported back to the invoking orchestrator.

use std::path::PathBuf;
use serde::Serialize;
use thiserror::Error;

/// The main error type for the reconciler.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Authentication errors.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Management API errors.
    #[error("Management API error: {0}")]
    Remote(#[from] RemoteError),

    /// The API referenced by `api_id` does not exist.
    #[error("API not found: {api_id}")]
    NotFound {
        /// Identifier that was looked up.
        api_id: String,
    },

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Machine-usable classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid or contradictory parameters, detected before any network call.
    Configuration,
    /// Credential resolution or token exchange failed.
    Authentication,
    /// The management API answered with a non-2xx status or was unreachable.
    Remote,
    /// The API referenced by `api_id` does not exist.
    NotFound,
    /// The remote answer made an action impossible to carry out.
    Reconcile,
    /// Local IO failure.
    Io,
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The parameter file was not found.
    #[error("Parameter file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The parameter file could not be parsed.
    #[error("Failed to parse parameters: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Parameter validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// No credential strategy could be resolved.
    #[error("No credentials supplied: one of user/password, access_token or token is required")]
    MissingCredentials,

    /// More than one credential strategy was supplied.
    #[error("Conflicting credentials supplied: {strategies}")]
    ConflictingCredentials {
        /// The strategies that were supplied together.
        strategies: String,
    },
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token exchange endpoint rejected the access token.
    #[error("Token exchange failed with status {status}: {body}")]
    ExchangeRejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The token exchange answer did not carry a token.
    #[error("Token exchange returned no token")]
    MissingToken,
}

/// Management API errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Non-2xx response.
    #[error("{method} {path} failed with status {status}: {body}")]
    Status {
        /// HTTP method.
        method: String,
        /// Request path below the base URL.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("Invalid response from {path}: {message}")]
    InvalidResponse {
        /// Request path below the base URL.
        path: String,
        /// Description of the decoding issue.
        message: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The ownership search did not resolve to exactly one user.
    #[error("Transfer ownership expects exactly one user matching '{user}', found {found}")]
    AmbiguousOwner {
        /// Search term.
        user: String,
        /// Number of users found.
        found: usize,
    },

    /// A page references a group that does not exist.
    #[error("Unknown group '{name}' referenced by page {order}")]
    UnknownGroup {
        /// Group name.
        name: String,
        /// Page order (1-based).
        order: u32,
    },

    /// A plan is declared by an identifier the API does not have.
    #[error("Plan '{id}' does not exist on the API")]
    UnknownPlan {
        /// Declared plan identifier.
        id: String,
    },

    /// An action needed an API identifier that is not known.
    #[error("No API identifier available for {action}")]
    MissingApiId {
        /// Action description.
        action: String,
    },

    /// An action failed after earlier actions had already been applied.
    #[error("Action {index} of {total} ({action}) failed: {source}")]
    ActionFailed {
        /// 1-based position of the failing action.
        index: usize,
        /// Number of actions in the plan.
        total: usize,
        /// Action description.
        action: String,
        /// Underlying error.
        #[source]
        source: Box<GatewayError>,
    },
}

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    /// Returns the machine-usable kind of this error.
    ///
    /// An [`ReconcileError::ActionFailed`] wrapper reports the kind of the
    /// underlying failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Auth(_) => ErrorKind::Authentication,
            Self::Remote(_) => ErrorKind::Remote,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Reconcile(ReconcileError::ActionFailed { source, .. }) => source.kind(),
            Self::Reconcile(_) => ErrorKind::Reconcile,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns true if the remote service answered 404.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Remote(RemoteError::Status { status: 404, .. })
        )
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl RemoteError {
    /// Creates a status error.
    #[must_use]
    pub fn status(
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::Status {
            method: method.into(),
            path: path.into(),
            status,
            body: body.into(),
        }
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Configuration => "configuration",
            Self::Authentication => "authentication",
            Self::Remote => "remote",
            Self::NotFound => "not_found",
            Self::Reconcile => "reconcile",
            Self::Io => "io",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = GatewayError::from(ConfigError::MissingCredentials);
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = GatewayError::from(RemoteError::status("GET", "/apis/1", 500, "boom"));
        assert_eq!(err.kind(), ErrorKind::Remote);

        let err = GatewayError::NotFound { api_id: String::from("1") };
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_action_failed_reports_underlying_kind() {
        let err = GatewayError::from(ReconcileError::ActionFailed {
            index: 2,
            total: 3,
            action: String::from("sync pages"),
            source: Box::new(GatewayError::from(RemoteError::status("POST", "/apis/1/pages", 400, "bad"))),
        });
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert!(err.to_string().contains("Action 2 of 3 (sync pages) failed"));
    }

    #[test]
    fn test_is_not_found() {
        let err = GatewayError::from(RemoteError::status("GET", "/apis/1", 404, ""));
        assert!(err.is_not_found());

        let err = GatewayError::from(RemoteError::status("GET", "/apis/1", 403, ""));
        assert!(!err.is_not_found());
    }
}
