//! Type-safe identifiers.
//!
//! Newtype wrappers keep correlation ids and origin tokens from being
//! confused with arbitrary envelope strings.

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Helpers
// ============================================================================

/// Returns a fresh opaque token: `f` followed by 32 hex digits.
///
/// The leading letter keeps the token usable as a JS identifier on the
/// remote end.
#[must_use]
pub fn guid() -> String {
    format!("f{}", Uuid::new_v4().simple())
}

// ============================================================================
// CallbackId
// ============================================================================

/// Correlation id binding a handler URL to a registered callback.
///
/// Ids are opaque strings; inbound ids are taken verbatim from the
/// envelope's `cb` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(String);

impl CallbackId {
    /// Generates a fresh random id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(guid())
    }

    /// Wraps an id received on the wire.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CallbackId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CallbackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
