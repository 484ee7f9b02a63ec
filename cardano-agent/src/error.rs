//! Unified error types for cardano-agent.
//!
//! This module provides the error hierarchy covering:
//! - Session construction and configuration errors
//! - Per-phase transaction failures (build, sign, submit)
//! - Chain provider errors (HTTP status, network, decoding)
//! - Ledger backend errors
//! - Tool adapter errors

use std::fmt;

/// Boxed error used as the cause of phase failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for cardano-agent operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The main error type for wallet sessions and transaction orchestration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid constructor input or configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The wallet has neither a used nor an unused address.
    #[error("no usable address found for wallet")]
    NoAddress,

    /// Building the unsigned transaction failed.
    #[error("failed to build {context}: {source}")]
    Build {
        /// Operation and identifiers being built.
        context: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// Signing the transaction failed.
    #[error("failed to sign {context}: {source}")]
    Signing {
        /// Operation and identifiers being signed.
        context: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// Submitting the signed transaction failed.
    #[error("failed to submit {context}: {source}")]
    Submission {
        /// Operation and identifiers being submitted.
        context: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// The derived reward address does not match the active network.
    #[error("invalid stake address '{address}': expected prefix '{expected}'")]
    InvalidStakeAddress {
        /// The reward address that was derived.
        address: String,
        /// The prefix required on the active network.
        expected: &'static str,
    },

    /// The active provider lacks the capability required by the operation.
    #[error("{operation} is not supported by the {provider} provider")]
    UnsupportedOperation {
        /// Operation that was attempted.
        operation: &'static str,
        /// Provider that lacks it.
        provider: &'static str,
    },

    /// A chain query failed outside of a transaction phase.
    #[error("{operation} failed: {source}")]
    Provider {
        /// Operation that issued the query.
        operation: String,
        /// Underlying provider error.
        #[source]
        source: ProviderError,
    },
}

impl Error {
    /// Create a configuration error with a message.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a build-phase error.
    #[must_use]
    pub fn build(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Build {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Create a signing-phase error.
    #[must_use]
    pub fn signing(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Signing {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Create a submission-phase error.
    #[must_use]
    pub fn submission(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Submission {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Create a provider query error.
    #[must_use]
    pub fn provider(operation: impl Into<String>, source: ProviderError) -> Self {
        Self::Provider {
            operation: operation.into(),
            source,
        }
    }

    /// Name of the transaction phase this error belongs to, if any.
    #[must_use]
    pub const fn phase(&self) -> Option<&'static str> {
        match self {
            Self::Build { .. } => Some("build"),
            Self::Signing { .. } => Some("sign"),
            Self::Submission { .. } => Some("submit"),
            _ => None,
        }
    }
}

/// Error type for chain provider operations.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ProviderError {
    /// The error kind.
    pub kind: ProviderErrorKind,
    /// The provider name (e.g., "blockfrost", "koios").
    pub provider: Option<String>,
    /// Additional error message.
    pub message: String,
    /// HTTP status code returned by the provider, if any.
    pub status: Option<u16>,
}

/// Categories of provider errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProviderErrorKind {
    /// Authentication or authorization failure.
    Auth,
    /// Rate limit exceeded.
    RateLimited,
    /// Requested resource does not exist.
    NotFound,
    /// Non-success HTTP status.
    HttpStatus,
    /// Network or connection error.
    Network,
    /// Response could not be decoded.
    Decode,
    /// The provider does not offer the capability.
    NotSupported,
}

impl ProviderError {
    fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            provider: None,
            message: message.into(),
            status: None,
        }
    }

    /// Create an error from a non-success HTTP status.
    #[must_use]
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => ProviderErrorKind::Auth,
            404 => ProviderErrorKind::NotFound,
            429 => ProviderErrorKind::RateLimited,
            _ => ProviderErrorKind::HttpStatus,
        };
        Self {
            kind,
            provider: None,
            message: format!("HTTP {status}: {}", body.into()),
            status: Some(status),
        }
    }

    /// Create a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Network, message)
    }

    /// Create a decoding error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Decode, message)
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::NotFound, message)
    }

    /// Create a not-supported error.
    #[must_use]
    pub fn not_supported(feature: impl Into<String>) -> Self {
        Self::new(
            ProviderErrorKind::NotSupported,
            format!("feature not supported: {}", feature.into()),
        )
    }

    /// Attach the provider name.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Check if this is a retryable error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ProviderErrorKind::RateLimited | ProviderErrorKind::Network => true,
            ProviderErrorKind::HttpStatus => self.status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }

    /// Check if the provider reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ProviderErrorKind::NotFound
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{provider}] ")?;
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("request timed out")
        } else if err.is_connect() {
            Self::network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::decode(err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}

/// Error type for ledger backend operations.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// Key material could not be parsed or derived.
    #[error("key derivation failed: {0}")]
    Derivation(String),

    /// Transaction could not be assembled.
    #[error("transaction build failed: {0}")]
    Build(String),

    /// Transaction could not be signed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Transaction bytes are malformed.
    #[error("malformed transaction: {0}")]
    Malformed(String),
}

impl LedgerError {
    /// Create a derivation error.
    #[must_use]
    pub fn derivation(msg: impl Into<String>) -> Self {
        Self::Derivation(msg.into())
    }

    /// Create a build error.
    #[must_use]
    pub fn build(msg: impl Into<String>) -> Self {
        Self::Build(msg.into())
    }

    /// Create a signing error.
    #[must_use]
    pub fn signing(msg: impl Into<String>) -> Self {
        Self::Signing(msg.into())
    }
}

/// Error type for tool execution failures.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ToolError {
    /// Invalid arguments provided to the tool.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The wallet operation behind the tool failed.
    #[error("{0}")]
    Wallet(#[from] Error),

    /// Tool not found.
    #[error("Tool not found: {0}")]
    NotFound(String),
}

impl ToolError {
    /// Create an invalid arguments error.
    #[must_use]
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArguments(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_kinds() {
        assert_eq!(
            ProviderError::http_status(404, "missing").kind,
            ProviderErrorKind::NotFound
        );
        assert_eq!(
            ProviderError::http_status(403, "forbidden").kind,
            ProviderErrorKind::Auth
        );
        assert_eq!(
            ProviderError::http_status(429, "slow down").kind,
            ProviderErrorKind::RateLimited
        );
        assert_eq!(
            ProviderError::http_status(502, "bad gateway").kind,
            ProviderErrorKind::HttpStatus
        );
    }

    #[test]
    fn test_retryable() {
        assert!(ProviderError::network("reset").is_retryable());
        assert!(ProviderError::http_status(429, "").is_retryable());
        assert!(ProviderError::http_status(503, "").is_retryable());
        assert!(!ProviderError::http_status(400, "").is_retryable());
        assert!(!ProviderError::http_status(404, "").is_retryable());
        assert!(!ProviderError::decode("bad json").is_retryable());
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::http_status(500, "boom").with_provider("koios");
        assert_eq!(err.to_string(), "[koios] HTTP 500: boom");
    }

    #[test]
    fn test_phase_errors_name_context_and_cause() {
        let err = Error::build(
            "send_asset to addr_test1xyz",
            LedgerError::build("no inputs"),
        );
        assert_eq!(err.phase(), Some("build"));
        let msg = err.to_string();
        assert!(msg.contains("send_asset to addr_test1xyz"));
        assert!(msg.contains("no inputs"));

        let err = Error::submission("burn", ProviderError::network("timeout"));
        assert_eq!(err.phase(), Some("submit"));
        assert!(Error::NoAddress.phase().is_none());
    }

    #[test]
    fn test_tool_error_from_wallet_error() {
        let err: ToolError = Error::NoAddress.into();
        assert!(matches!(err, ToolError::Wallet(Error::NoAddress)));
        assert_eq!(err.to_string(), "no usable address found for wallet");
    }
}
