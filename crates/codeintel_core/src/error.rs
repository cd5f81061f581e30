//! Error types for codeintel_core operations.

use thiserror::Error;

/// Core error type for codeintel_core operations.
#[derive(Error, Debug)]
pub enum CodeintelError {
    /// The language server executable is not installed or not on PATH.
    #[error("language server not found: {0}")]
    ServerNotFound(String),

    /// The language server process could not be started.
    #[error("failed to start language server: {0}")]
    ServerStartFailed(String),

    /// LSP request timed out.
    #[error("LSP request timed out after {timeout_ms}ms: {method}")]
    LspTimeout {
        /// Method name that timed out
        method: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// The connection closed before a response arrived.
    #[error("LSP request cancelled, connection closed: {method}")]
    LspCancelled {
        /// Method name that was waiting
        method: String,
    },

    /// A query was issued before the initialize handshake completed.
    #[error("LSP session not initialized; cannot send {0}")]
    LspNotInitialized(String),

    /// LSP protocol error (framing, unexpected payload shape).
    #[error("LSP protocol error: {0}")]
    LspProtocolError(String),

    /// LSP returned an error response.
    #[error("LSP error {code}: {message}")]
    LspError {
        /// Error code
        code: i64,
        /// Error message
        message: String,
    },

    /// No backend can handle the language.
    #[error("no parser available for language: {0}")]
    UnsupportedLanguage(String),

    /// A backend failed to extract symbols from a file.
    #[error("{backend} failed to parse {path}: {reason}")]
    ParseFailed {
        /// Backend that failed
        backend: String,
        /// File being parsed
        path: String,
        /// Description of the failure
        reason: String,
    },

    /// A built-in extraction pattern failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Path or URI could not be converted.
    #[error("invalid URI: {0}")]
    InvalidUri(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// I/O error during file or pipe operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodeintelError {
    /// True for request deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::LspTimeout { .. })
    }

    /// True when the failure means the backend's tool is missing or gone,
    /// which callers treat as "skip this tier" rather than a hard error.
    pub fn is_server_unavailable(&self) -> bool {
        matches!(
            self,
            Self::ServerNotFound(_) | Self::ServerStartFailed(_) | Self::LspCancelled { .. }
        )
    }

    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ServerNotFound(_) => Some(
                "Install the language server or configure its command under [servers.<language>] in codeintel.toml.",
            ),
            Self::LspTimeout { .. } => {
                Some("The server may still be indexing. Raise [lsp] request_timeout_ms or retry.")
            }
            Self::LspNotInitialized(_) => Some("Call initialize() before issuing queries."),
            Self::UnsupportedLanguage(_) => {
                Some("Run 'codeintel status' to see which languages have a backend.")
            }
            Self::ConfigError(_) => Some("Check codeintel.toml for typos or invalid values."),
            _ => None,
        }
    }
}

/// Convenience Result type for codeintel_core operations.
pub type Result<T> = std::result::Result<T, CodeintelError>;
