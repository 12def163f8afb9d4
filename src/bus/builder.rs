//! Builder pattern for bus configuration.
//!
//! Provides a fluent API for configuring and creating [`Bus`] instances.
//!
//! # Example
//!
//! ```ignore
//! use xdomain_bus::Bus;
//!
//! let bus = Bus::builder(host)
//!     .channel_url("https://app.example/channel.html")
//!     .proxy_url("https://static.example/connect/xd_proxy.php")
//!     .build()?;
//! bus.init()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::{Error, Result};
use crate::window::Host;

use super::core::Bus;
use super::factories::{HandlerArgs, HandlerKinds};
use super::registry::Callback;

// ============================================================================
// Constants
// ============================================================================

/// Proxy endpoint used by the native and plugin transports.
pub const DEFAULT_PROXY_URL: &str = "https://static.ak.fbcdn.net/connect/xd_proxy.php";

// ============================================================================
// BusConfig
// ============================================================================

/// Validated, immutable bus configuration.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Page the remote side reloads in fragment mode.
    channel_url: Option<Url>,
    /// Proxy endpoint for native/plugin return addresses.
    proxy_url: Url,
    /// Named handler factories.
    kinds: HandlerKinds,
}

impl BusConfig {
    /// Returns the externally supplied channel URL.
    #[inline]
    #[must_use]
    pub fn channel_url(&self) -> Option<&Url> {
        self.channel_url.as_ref()
    }

    /// Returns the proxy endpoint.
    #[inline]
    #[must_use]
    pub fn proxy_url(&self) -> &Url {
        &self.proxy_url
    }

    /// Returns the registered handler kinds.
    #[inline]
    #[must_use]
    pub fn kinds(&self) -> &HandlerKinds {
        &self.kinds
    }
}

// ============================================================================
// BusBuilder
// ============================================================================

/// Builder for configuring a [`Bus`] instance.
///
/// Use [`Bus::builder()`] to create a new builder.
pub struct BusBuilder {
    /// Page the bus runs in.
    host: Arc<dyn Host>,
    /// Raw channel URL.
    channel_url: Option<String>,
    /// Raw proxy URL.
    proxy_url: Option<String>,
    /// Handler kinds registered so far.
    kinds: HandlerKinds,
    /// First registration error, reported by `build`.
    kind_error: Option<Error>,
}

impl fmt::Debug for BusBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusBuilder")
            .field("channel_url", &self.channel_url)
            .field("proxy_url", &self.proxy_url)
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// BusBuilder Implementation
// ============================================================================

impl BusBuilder {
    /// Creates a builder for a bus running in `host`.
    #[must_use]
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self {
            host,
            channel_url: None,
            proxy_url: None,
            kinds: HandlerKinds::new(),
            kind_error: None,
        }
    }

    /// Sets the channel URL used by fragment mode.
    ///
    /// Supplying one also rules out the plugin transport.
    ///
    /// # Arguments
    ///
    /// * `url` - Same-origin page the remote side reloads
    #[inline]
    #[must_use]
    pub fn channel_url(mut self, url: impl Into<String>) -> Self {
        self.channel_url = Some(url.into());
        self
    }

    /// Sets the proxy endpoint for native and plugin return addresses.
    ///
    /// Defaults to [`DEFAULT_PROXY_URL`].
    #[inline]
    #[must_use]
    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        self.proxy_url = Some(url.into());
        self
    }

    /// Registers a named handler kind.
    ///
    /// An invalid or duplicate key makes [`build`](Self::build) fail.
    #[must_use]
    pub fn handler_kind<F>(mut self, kind: &str, factory: F) -> Self
    where
        F: Fn(&HandlerArgs) -> Callback + Send + Sync + 'static,
    {
        if let Err(e) = self.kinds.register(kind, factory)
            && self.kind_error.is_none()
        {
            self.kind_error = Some(e);
        }
        self
    }

    /// Replaces all handler kinds with a prebuilt set.
    #[inline]
    #[must_use]
    pub fn handler_kinds(mut self, kinds: HandlerKinds) -> Self {
        self.kinds = kinds;
        self
    }

    /// Builds the bus with validation.
    ///
    /// The bus starts uninitialized; call [`Bus::init`] to negotiate.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a URL does not parse
    /// - [`Error::Config`] if a handler kind was rejected
    pub fn build(self) -> Result<Bus> {
        if let Some(e) = self.kind_error {
            return Err(e);
        }

        let channel_url = self
            .channel_url
            .as_deref()
            .map(|raw| parse_url("channel", raw))
            .transpose()?;
        let proxy_url = parse_url("proxy", self.proxy_url.as_deref().unwrap_or(DEFAULT_PROXY_URL))?;

        let config = BusConfig {
            channel_url,
            proxy_url,
            kinds: self.kinds,
        };

        Ok(Bus::new(self.host, config))
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Parses a configured URL, naming it in the error.
fn parse_url(which: &str, raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| {
        Error::config(format!(
            "invalid {which} URL {raw:?}: {e}\n\
             Example: Bus::builder(host).{which}_url(\"https://app.example/channel.html\")"
        ))
    })
}

// ============================================================================
// Tests
// ============================================================================
