//! Error types for the cross-domain bus.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use xdomain_bus::{Bus, Result};
//!
//! fn open_login(bus: &Bus) -> Result<String> {
//!     let url = bus.handler(|envelope| println!("{envelope:?}"), Some("opener"), false)?;
//!     Ok(url.into_string())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::NotReady`], [`Error::UnknownHandlerKind`] |
//! | Relation | [`Error::Syntax`], [`Error::ContextNotFound`], [`Error::BusNotInstalled`] |
//! | Protocol | [`Error::Envelope`] |
//! | Delivery | [`Error::Timeout`], [`Error::ChannelClosed`] |
//! | External | [`Error::Url`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when bus configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Bus has not finished transport negotiation.
    ///
    /// Returned when a handler is requested before [`Bus::init`](crate::Bus::init)
    /// or when `init` is re-entered during negotiation.
    #[error("Bus not ready: {message}")]
    NotReady {
        /// What was attempted.
        message: String,
    },

    /// No factory registered for a handler kind.
    #[error("Unknown handler kind: {kind}")]
    UnknownHandlerKind {
        /// The requested kind key.
        kind: String,
    },

    // ========================================================================
    // Relation Errors
    // ========================================================================
    /// Malformed relation expression.
    ///
    /// Returned when a segment matches none of `opener`, `parent`, `top`
    /// or `frames[name]`.
    #[error("Malformed relation to resolve: {relation}, segment: {segment}")]
    Syntax {
        /// Full input expression.
        relation: String,
        /// The offending segment.
        segment: String,
    },

    /// A well-formed segment leads to no browsing context.
    #[error("No browsing context for segment {segment} of relation {relation}")]
    ContextNotFound {
        /// Full input expression.
        relation: String,
        /// The segment whose link is missing.
        segment: String,
    },

    /// The resolved browsing context has no bus installed.
    #[error("No bus installed in context: {relation}")]
    BusNotInstalled {
        /// Relation that was resolved.
        relation: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Envelope is missing a required field or is otherwise unusable.
    #[error("Envelope error: {message}")]
    Envelope {
        /// Description of the envelope problem.
        message: String,
    },

    // ========================================================================
    // Delivery Errors
    // ========================================================================
    /// Caller-side wait timed out.
    ///
    /// Returned by [`PendingDelivery::timeout`](crate::PendingDelivery::timeout).
    #[error("Timeout after {timeout_ms}ms waiting for {cb}")]
    Timeout {
        /// Correlation id that was waited on.
        cb: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Delivery channel dropped before a message arrived.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a not-ready error.
    #[inline]
    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::NotReady {
            message: message.into(),
        }
    }

    /// Creates an unknown handler kind error.
    #[inline]
    pub fn unknown_handler_kind(kind: impl Into<String>) -> Self {
        Self::UnknownHandlerKind { kind: kind.into() }
    }

    /// Creates a relation syntax error.
    #[inline]
    pub fn syntax(relation: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::Syntax {
            relation: relation.into(),
            segment: segment.into(),
        }
    }

    /// Creates a context not found error.
    #[inline]
    pub fn context_not_found(relation: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::ContextNotFound {
            relation: relation.into(),
            segment: segment.into(),
        }
    }

    /// Creates a bus not installed error.
    #[inline]
    pub fn bus_not_installed(relation: impl Into<String>) -> Self {
        Self::BusNotInstalled {
            relation: relation.into(),
        }
    }

    /// Creates an envelope error.
    #[inline]
    pub fn envelope(message: impl Into<String>) -> Self {
        Self::Envelope {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(cb: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            cb: cb.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error comes from resolving a relation.
    #[inline]
    #[must_use]
    pub fn is_relation_error(&self) -> bool {
        matches!(
            self,
            Self::Syntax { .. } | Self::ContextNotFound { .. } | Self::BusNotInstalled { .. }
        )
    }

    /// Returns `true` if this is a configuration error.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::NotReady { .. }
                | Self::UnknownHandlerKind { .. }
                | Self::Url(_)
        )
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
