//! Core error types for holdthedoor
//!
//! Errors fall into four families, each with its own recovery:
//! credential errors force the unauthenticated state, transient directory
//! errors mark the machine list stale, connection faults return the
//! connection manager to idle, and remote `error` frames are only displayed.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by session operations
#[derive(Error, Debug)]
pub enum HtdError {
    /// Connection error
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
}

/// Terminal connection errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The terminal endpoint URL could not be built
    #[error("Invalid terminal endpoint: {0}")]
    InvalidEndpoint(String),

    /// The socket could not be opened
    #[error("Failed to open socket: {0}")]
    OpenFailed(String),

    /// The socket is gone (closed or its task ended)
    #[error("Socket closed")]
    Closed,

    /// Machine is not in the published directory
    #[error("Machine not found: {0}")]
    MachineNotFound(String),
}

/// Session authentication errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No valid credential is held
    #[error("Not logged in")]
    NotAuthenticated,

    /// The credential has passed its expiry instant
    #[error("Session expired")]
    Expired,

    /// Login was refused; carries the message shown to the operator
    #[error("Login failed: {0}")]
    Login(String),
}

/// Result of a login attempt against the authentication service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// The service answered and refused the credentials
    #[error("{0}")]
    Rejected(String),

    /// The service could not be reached or answered garbage
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Result of a machine list fetch against the registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The registry refused the token (HTTP 401)
    #[error("credential rejected by registry")]
    Unauthorized,

    /// Network failure or unexpected status
    #[error("registry unreachable: {0}")]
    Transport(String),

    /// Response body was not a machine list
    #[error("invalid registry response: {0}")]
    Decode(String),
}

impl DirectoryError {
    /// Whether this failure means the credential is no longer accepted
    pub fn is_credential_error(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
