//! Wire protocol: envelopes and their query-string encoding.
//!
//! # Message Types
//!
//! | Type | Direction | Description |
//! |------|-----------|-------------|
//! | [`Envelope`] | Both | Flat key/value map with `cb`, `origin`, `relation`, `transport` |
//! | [`RawMessage`] | Inbound | Query text or structured envelope handed to the dispatcher |
//! | [`Delivery`] | Result | Outcome of dispatching a message |

// ============================================================================
// Submodules
// ============================================================================

/// Envelope, raw message and delivery outcome types.
pub mod envelope;

/// Query-string encode/decode.
pub mod query;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::{
    Delivery, Envelope, KEY_CB, KEY_ORIGIN, KEY_RELATION, KEY_TRANSPORT, RawMessage,
};
