//! Cross-domain message bus between browsing contexts.
//!
//! A page opens a popup or embeds a frame served from another origin and
//! needs an answer back: a login result, a permission grant, a session. This
//! library hands out *return addresses* (handler URLs) bound to callbacks and
//! routes inbound messages back to the right callback, whatever transport
//! the runtime offers.
//!
//! # Architecture
//!
//! ```text
//!            init()                    handler()                 recv()
//! Host ──► negotiate ──► Transport ──► HandlerUrl ──► remote ──► Dispatcher ──► callback
//!          (native │ plugin │ fragment)   cb, origin,   side       (registry
//!                                        relation,               lookup)
//!                                        transport
//! ```
//!
//! - One transport is selected per bus, once, and never changes
//! - Every handler gets a fresh correlation id (`cb`)
//! - Deliveries for unknown or consumed ids are dropped silently
//! - Carrier pages (fragment mode) dispatch into their relative window with
//!   [`check_and_dispatch`] before anything else runs
//!
//! # Quick Start
//!
//! ```ignore
//! use xdomain_bus::{Bus, Result};
//!
//! fn connect(host: std::sync::Arc<dyn xdomain_bus::Host>) -> Result<()> {
//!     let bus = Bus::builder(host)
//!         .channel_url("https://app.example/channel.html")
//!         .build()?;
//!     bus.init()?;
//!
//!     let url = bus.handler(|envelope| {
//!         println!("session: {:?}", envelope.get("session"));
//!     }, Some("opener"), false)?;
//!
//!     // Hand `url` to the remote side as its return address.
//!     println!("{url}");
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bus`] | [`Bus`], its builder, registry and async adapters |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Correlation ids and guids |
//! | [`protocol`] | Envelope and query encoding |
//! | [`transport`] | Native, plugin and fragment transports |
//! | [`window`] | Host abstractions and relation resolution |

// ============================================================================
// Modules
// ============================================================================

/// The message bus.
///
/// Use [`Bus::builder()`] to create a configured bus.
pub mod bus;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Correlation ids and guids.
pub mod identifiers;

/// Envelope wire format.
pub mod protocol;

/// Transport negotiation and strategies.
pub mod transport;

/// Browsing contexts, host integration and relation expressions.
pub mod window;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Bus types
pub use bus::{
    Bus, BusBuilder, BusConfig, BusPhase, Callback, HandlerArgs, HandlerKinds, HandlerUrl,
    PendingDelivery, Subscription,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::CallbackId;

// Protocol types
pub use protocol::{Delivery, Envelope, RawMessage};

// Transport types
pub use transport::{FRAGMENT_MAGIC, TransportKind, check_and_dispatch};

// Window types
pub use window::{BrowsingContext, Host, PluginBridge, Relation, resolve_relation};
