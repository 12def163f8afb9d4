//! Named response-handler kinds.
//!
//! Consumers (login, logout, status checks) register a factory per kind
//! key when the bus is built; handlers are then created by key. Keys are
//! validated at registration so a typo fails at startup, not on the first
//! response.
//!
//! # Example
//!
//! ```ignore
//! let bus = Bus::builder(host)
//!     .handler_kind("auth.status", |args| {
//!         let status = args.get("status").cloned().unwrap_or_default();
//!         Arc::new(move |env| on_status(&status, env))
//!     })
//!     .build()?;
//!
//! let args = HandlerArgs::from([("status".into(), "connected".into())]);
//! let url = bus.named_handler("auth.status", &args, Some("parent"), false)?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

use super::registry::Callback;

// ============================================================================
// Types
// ============================================================================

/// Arguments handed to a factory.
pub type HandlerArgs = BTreeMap<String, String>;

/// Builds a callback for one handler kind.
pub type HandlerFactory = Arc<dyn Fn(&HandlerArgs) -> Callback + Send + Sync>;

/// Dotted lowercase key, e.g. `auth.status`.
static KIND_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)*$").expect("kind key pattern is valid")
});

// ============================================================================
// HandlerKinds
// ============================================================================

/// Validated mapping from kind keys to factories.
#[derive(Clone, Default)]
pub struct HandlerKinds {
    factories: FxHashMap<String, HandlerFactory>,
}

impl fmt::Debug for HandlerKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.kinds()).finish()
    }
}

impl HandlerKinds {
    /// Creates an empty set of kinds.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the key is malformed or already taken.
    pub fn register<F>(&mut self, kind: &str, factory: F) -> Result<()>
    where
        F: Fn(&HandlerArgs) -> Callback + Send + Sync + 'static,
    {
        if !KIND_KEY.is_match(kind) {
            return Err(Error::config(format!(
                "invalid handler kind {kind:?}: expected dotted lowercase key like \"auth.status\""
            )));
        }
        if self.factories.contains_key(kind) {
            return Err(Error::config(format!(
                "handler kind {kind:?} registered twice"
            )));
        }

        self.factories.insert(kind.to_string(), Arc::new(factory));
        Ok(())
    }

    /// Builds a callback for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownHandlerKind`] if nothing is registered.
    pub fn build(&self, kind: &str, args: &HandlerArgs) -> Result<Callback> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| Error::unknown_handler_kind(kind))?;
        Ok(factory(args))
    }

    /// Returns `true` if `kind` is registered.
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered keys, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Number of registered kinds.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if no kinds are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
