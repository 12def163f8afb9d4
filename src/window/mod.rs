//! Browsing contexts and how to reach them.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Host`] | The page the bus runs in |
//! | [`BrowsingContext`] | A window or frame handle |
//! | [`PluginBridge`] | Plugin-hosted local connection |
//! | [`Relation`] | Parsed `opener.frames['x'].parent` style address |

// ============================================================================
// Submodules
// ============================================================================

/// Host, browsing context and plugin traits.
pub mod context;

/// Relation parsing and resolution.
pub mod relation;

// ============================================================================
// Re-exports
// ============================================================================

pub use context::{
    BrowsingContext, ContextRef, Host, MessageListener, PluginBridge, PluginListener,
};
pub use relation::{DEFAULT_RELATION, Relation, Segment, resolve_relation};
