//! The message bus: handler factory, dispatcher and callback registry.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`BusBuilder`] and validated [`BusConfig`] |
//! | `core` | [`Bus`] negotiation, handler factory and dispatcher |
//! | `factories` | Named handler kinds |
//! | `pending` | Awaitable adapters over handlers |
//! | `registry` | Correlation id to callback map |

// ============================================================================
// Submodules
// ============================================================================

/// Bus builder and configuration.
pub mod builder;

/// The bus handle.
pub mod core;

/// Named handler kinds.
pub mod factories;

/// Awaitable handler adapters.
pub mod pending;

/// Callback registry.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{BusBuilder, BusConfig, DEFAULT_PROXY_URL};
pub use core::{Bus, BusPhase, HandlerUrl, NOOP_URL};
pub use factories::{HandlerArgs, HandlerFactory, HandlerKinds};
pub use pending::{PendingDelivery, Subscription};
pub use registry::{Callback, CallbackRegistry};
