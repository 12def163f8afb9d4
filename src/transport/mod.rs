//! Transport strategies.
//!
//! Exactly one transport is selected per bus, once, by [`negotiate`]. After
//! that the bus only talks to it through the [`Transport`] trait.
//!
//! # Strategies
//!
//! ```text
//! ┌──────────────┐  native message event   ┌──────────────┐
//! │ remote page  │────────────────────────►│  Native      │──┐
//! │ (xd proxy)   │  plugin local conn.     │  Plugin      │──┼──► Bus::recv
//! │              │────────────────────────►│              │  │
//! │              │  reload with marker     │  Fragment    │──┘
//! │              │────────────────────────►│  (carrier)   │
//! └──────────────┘                         └──────────────┘
//! ```
//!
//! # Selection Order
//!
//! 1. Native messaging supported → [`NativeChannel`]
//! 2. No channel URL configured and plugin meets minimum version → [`PluginChannel`]
//! 3. Otherwise → [`FragmentChannel`]
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `native` | Native cross-context message event |
//! | `plugin` | Plugin-hosted local connection |
//! | `fragment` | Same-page reload carrying the envelope in the fragment |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::bus::Bus;
use crate::error::{Error, Result};
use crate::identifiers::guid;
use crate::window::Host;

// ============================================================================
// Submodules
// ============================================================================

/// Fragment (reload) transport and carrier-page dispatch.
pub mod fragment;

/// Native message event transport.
pub mod native;

/// Plugin local-connection transport.
pub mod plugin;

// ============================================================================
// Re-exports
// ============================================================================

pub use fragment::{FRAGMENT_MAGIC, FragmentChannel, check_and_dispatch, is_carrier};
pub use native::NativeChannel;
pub use plugin::PluginChannel;

// ============================================================================
// TransportKind
// ============================================================================

/// The closed set of transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Native inter-window messaging.
    Native,
    /// Plugin-mediated local connection.
    Plugin,
    /// Page reload carrying the envelope in the URL fragment.
    Fragment,
}

impl TransportKind {
    /// Wire name used in the `transport` envelope field.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Plugin => "plugin",
            Self::Fragment => "fragment",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "native" => Ok(Self::Native),
            "plugin" => Ok(Self::Plugin),
            "fragment" => Ok(Self::Fragment),
            other => Err(Error::envelope(format!("unknown transport: {other}"))),
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Capability contract shared by all transports.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Which strategy this is.
    fn kind(&self) -> TransportKind;

    /// Starts listening; called exactly once by the negotiator.
    ///
    /// # Errors
    ///
    /// Implementations report failures to attach their listener.
    fn activate(&self, bus: &Bus) -> Result<()>;

    /// Base of every handler URL; the encoded envelope is appended to it.
    fn return_address(&self, proxy_url: &Url) -> String;
}

// ============================================================================
// OriginContext
// ============================================================================

/// Outcome of negotiation: own origin plus the selected transport.
///
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct OriginContext {
    /// Origin string used for sender binding (absent in fragment mode).
    origin: Option<String>,
    /// Selected transport.
    transport: Arc<dyn Transport>,
}

impl OriginContext {
    /// Returns the own origin string.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Returns the selected transport kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Returns the selected transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

// ============================================================================
// Negotiation
// ============================================================================

/// Probes `host` and selects one transport.
///
/// Does not activate it; the bus does that once the context is recorded.
///
/// # Errors
///
/// Returns [`Error::Url`] if the host location is not a valid URL while an
/// origin must be derived from it.
pub fn negotiate(host: &dyn Host, channel_url: Option<&Url>) -> Result<OriginContext> {
    if host.supports_native_messaging() {
        let location = Url::parse(&host.location())?;
        let origin = format!("{}://{}/{}", location.scheme(), authority(&location), guid());
        debug!(origin = %origin, "Selected native transport");

        return Ok(OriginContext {
            origin: Some(origin),
            transport: Arc::new(NativeChannel::new()),
        });
    }

    if channel_url.is_none()
        && let Some(plugin) = host.plugin().filter(|p| p.has_min_version())
    {
        let location = Url::parse(&host.location())?;
        let origin = format!(
            "{}://{}/{}",
            location.scheme(),
            host.document_domain(),
            guid()
        );
        debug!(origin = %origin, "Selected plugin transport");

        return Ok(OriginContext {
            origin: Some(origin.clone()),
            transport: Arc::new(PluginChannel::new(plugin, origin)),
        });
    }

    let target = match channel_url {
        Some(url) => url.to_string(),
        None => {
            warn!("No native or plugin transport and no channel URL; fragment mode will reload the current page");
            host.location()
        }
    };
    debug!(channel_url = %target, "Selected fragment transport");

    Ok(OriginContext {
        origin: None,
        transport: Arc::new(FragmentChannel::new(target)),
    })
}

/// `host[:port]` as `window.location.host` reports it.
fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Handler base for transports that go through the proxy endpoint.
///
/// The `#?=&` tail keeps server-side redirects from splicing their own
/// parameters in front of the fragment.
pub(crate) fn proxy_return_address(proxy_url: &Url) -> String {
    let mut base = proxy_url.clone();
    base.set_fragment(None);
    format!("{base}#?=&")
}

// ============================================================================
// Tests
// ============================================================================
