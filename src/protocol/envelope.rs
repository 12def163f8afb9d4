//! Message envelope types.
//!
//! An envelope is a flat key/value map carrying a correlation id plus the
//! message body across a transport boundary.
//!
//! # Format
//!
//! ```text
//! cb=f3c1...&origin=https%3A%2F%2Fapp.example%2Ff9a2...&relation=opener&transport=native&session=...
//! ```
//!
//! The reserved keys are `cb`, `origin`, `relation` and `transport`; every
//! other key is caller payload and is passed through untouched.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CallbackId;
use crate::transport::TransportKind;

use super::query;

// ============================================================================
// Constants
// ============================================================================

/// Correlation id key.
pub const KEY_CB: &str = "cb";

/// Sender origin key.
pub const KEY_ORIGIN: &str = "origin";

/// Relation key (how the carrier page reaches the receiving window).
pub const KEY_RELATION: &str = "relation";

/// Transport kind key.
pub const KEY_TRANSPORT: &str = "transport";

/// Reserved keys in wire order.
const RESERVED: [&str; 4] = [KEY_CB, KEY_ORIGIN, KEY_RELATION, KEY_TRANSPORT];

// ============================================================================
// Envelope
// ============================================================================

/// A decoded message envelope.
///
/// Values are kept as strings exactly as they travel on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope {
    fields: BTreeMap<String, String>,
}

impl Envelope {
    /// Creates an empty envelope.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a query-encoded envelope.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        Self {
            fields: query::decode(input),
        }
    }

    /// Builds an envelope from a structured JSON object.
    ///
    /// Strings are taken as-is, `null` fields are dropped, and any other
    /// value is stored as its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Envelope`] if `value` is not an object.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::envelope("structured message must be an object"))?;

        let fields = object
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let text = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), text)
            })
            .collect();

        Ok(Self { fields })
    }

    /// Builds an envelope from JSON text holding an object.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if `text` is not valid JSON
    /// - [`Error::Envelope`] if it is not an object
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    /// Sets a field, returning `self` for chaining.
    #[inline]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Sets a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(key.into(), value.into())
    }

    /// Returns a field by key.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Returns all fields.
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Returns the correlation id, if present and non-empty.
    #[must_use]
    pub fn cb(&self) -> Option<CallbackId> {
        self.get(KEY_CB)
            .filter(|id| !id.is_empty())
            .map(CallbackId::from)
    }

    /// Returns the sender origin.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.get(KEY_ORIGIN)
    }

    /// Returns the relation expression.
    #[inline]
    #[must_use]
    pub fn relation(&self) -> Option<&str> {
        self.get(KEY_RELATION)
    }

    /// Returns the transport kind, if present and recognised.
    #[must_use]
    pub fn transport(&self) -> Option<TransportKind> {
        self.get(KEY_TRANSPORT).and_then(|t| t.parse().ok())
    }

    /// Returns the payload fields (everything except the reserved keys).
    pub fn payload(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter(|(k, _)| !RESERVED.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encodes the envelope, reserved keys first.
    #[must_use]
    pub fn to_query(&self) -> String {
        let reserved = RESERVED
            .iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)));
        query::encode(reserved.chain(self.payload()))
    }
}

// ============================================================================
// RawMessage
// ============================================================================

/// An inbound message as handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawMessage {
    /// Query-encoded envelope text.
    Query(String),
    /// Already-structured envelope.
    Envelope(Envelope),
}

impl RawMessage {
    /// Normalizes the message into an envelope.
    #[must_use]
    pub fn into_envelope(self) -> Envelope {
        match self {
            Self::Query(text) => Envelope::parse(&text),
            Self::Envelope(envelope) => envelope,
        }
    }
}

impl From<&str> for RawMessage {
    fn from(s: &str) -> Self {
        Self::Query(s.to_string())
    }
}

impl From<String> for RawMessage {
    fn from(s: String) -> Self {
        Self::Query(s)
    }
}

impl From<Envelope> for RawMessage {
    fn from(envelope: Envelope) -> Self {
        Self::Envelope(envelope)
    }
}

// ============================================================================
// Delivery
// ============================================================================

/// Outcome of dispatching one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A registered callback was invoked.
    Invoked {
        /// Whether the entry stays registered.
        persistent: bool,
    },
    /// No live entry for the id; the message was dropped.
    Stale,
}

impl Delivery {
    /// Returns `true` if a callback ran.
    #[inline]
    #[must_use]
    pub fn is_invoked(&self) -> bool {
        matches!(self, Self::Invoked { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
