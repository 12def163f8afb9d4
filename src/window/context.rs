//! Browsing context and host abstractions.
//!
//! The bus never touches a browser API directly. A binding (for example a
//! `web-sys` shim or an embedding shell) implements these traits for the
//! page the bus runs in.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::bus::Bus;
use crate::protocol::RawMessage;

// ============================================================================
// Types
// ============================================================================

/// Shared handle to a browsing context.
pub type ContextRef = Arc<dyn BrowsingContext>;

/// Listener for the host's cross-context message event.
///
/// Receives the event's data payload.
pub type MessageListener = Box<dyn Fn(RawMessage) + Send + Sync>;

/// Listener for messages arriving over the plugin bridge.
///
/// Receives the URI-encoded message body as sent by the plugin.
pub type PluginListener = Box<dyn Fn(String) + Send + Sync>;

// ============================================================================
// BrowsingContext
// ============================================================================

/// A window or frame reachable from the current page.
///
/// Each navigation method returns `None` when the link does not exist
/// (no opener, top-level window asked for a parent outside the tree, unknown
/// frame name).
pub trait BrowsingContext: Send + Sync + fmt::Debug {
    /// The window that opened this one.
    fn opener(&self) -> Option<ContextRef>;

    /// The embedding window.
    fn parent(&self) -> Option<ContextRef>;

    /// The top-level window of this frame tree.
    fn top(&self) -> Option<ContextRef>;

    /// A child frame by name or index.
    fn frame(&self, name: &str) -> Option<ContextRef>;

    /// The bus installed in this context, if the page loaded one.
    ///
    /// Only reachable for same-origin contexts.
    fn bus(&self) -> Option<Bus>;
}

// ============================================================================
// Host
// ============================================================================

/// The page the bus runs in.
pub trait Host: Send + Sync {
    /// Full current location, including query and fragment.
    fn location(&self) -> String;

    /// The current browsing context.
    fn window(&self) -> ContextRef;

    /// Whether the runtime offers a native inter-window message primitive.
    fn supports_native_messaging(&self) -> bool;

    /// Subscribes to the native message event.
    fn add_message_listener(&self, listener: MessageListener);

    /// The document's (possibly relaxed) domain.
    fn document_domain(&self) -> String;

    /// The plugin runtime, if one is installed.
    fn plugin(&self) -> Option<Arc<dyn PluginBridge>>;

    /// Turns the page's public entry points into no-ops.
    fn disable_entry_points(&self);

    /// Hides the document.
    fn hide_document(&self);
}

// ============================================================================
// PluginBridge
// ============================================================================

/// A plugin-hosted local communication bridge.
pub trait PluginBridge: Send + Sync {
    /// Whether the installed plugin meets the minimum version.
    fn has_min_version(&self) -> bool;

    /// Runs `callback` once the plugin has loaded (immediately if it has).
    fn on_ready(&self, callback: Box<dyn FnOnce() + Send>);

    /// Starts the local connection bound to `origin`.
    fn init_local_connection(&self, origin: &str, listener: PluginListener);
}
