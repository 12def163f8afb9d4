//! Fragment transport.
//!
//! There is no listener. The remote side navigates a hidden frame or popup
//! to the channel URL carrying [`FRAGMENT_MAGIC`] and the envelope in the
//! fragment. When that page loads, [`check_and_dispatch`] recognises it as a
//! carrier, shuts its public entry points off, hides it, and calls the
//! dispatcher of the bus in the window named by the envelope's `relation`
//! (same origin, so the call is direct).
//!
//! # Carrier URL
//!
//! ```text
//! https://app.example/channel.html?fb_xd_fragment#?=&cb=f..&relation=parent&transport=fragment&...
//! ```

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, info};
use url::Url;

use crate::bus::Bus;
use crate::error::{Error, Result};
use crate::protocol::{Delivery, Envelope};
use crate::window::{Host, Relation};

use super::{Transport, TransportKind};

// ============================================================================
// Constants
// ============================================================================

/// Marker distinguishing a carrier page load from ordinary navigation.
pub const FRAGMENT_MAGIC: &str = "fb_xd_fragment";

// ============================================================================
// FragmentChannel
// ============================================================================

/// Delivers by reloading the channel page with the envelope in its fragment.
#[derive(Debug, Clone)]
pub struct FragmentChannel {
    /// Page the remote side reloads.
    channel_url: String,
}

impl FragmentChannel {
    /// Creates the fragment transport targeting `channel_url`.
    #[must_use]
    pub fn new(channel_url: impl Into<String>) -> Self {
        Self {
            channel_url: channel_url.into(),
        }
    }

    /// Returns the channel URL.
    #[inline]
    #[must_use]
    pub fn channel_url(&self) -> &str {
        &self.channel_url
    }
}

impl Transport for FragmentChannel {
    fn kind(&self) -> TransportKind {
        TransportKind::Fragment
    }

    fn activate(&self, _bus: &Bus) -> Result<()> {
        debug!(channel_url = %self.channel_url, "Fragment transport has no listener");
        Ok(())
    }

    fn return_address(&self, _proxy_url: &Url) -> String {
        let base = match self.channel_url.find('#') {
            Some(index) if index > 0 => &self.channel_url[..index],
            _ => self.channel_url.as_str(),
        };
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{base}{separator}{FRAGMENT_MAGIC}#?=&")
    }
}

// ============================================================================
// Carrier Dispatch
// ============================================================================

/// Returns `true` if `location` is a carrier page load.
#[inline]
#[must_use]
pub fn is_carrier(location: &str) -> bool {
    location.find(FRAGMENT_MAGIC).is_some_and(|index| index > 0)
}

/// Runs carrier-page dispatch for the page hosted by `host`.
///
/// Must run before any of the page's normal entry points. Returns
/// `Ok(None)` for ordinary page loads.
///
/// # Errors
///
/// - [`Error::Envelope`] if the fragment has no `relation`
/// - [`Error::Syntax`] / [`Error::ContextNotFound`] if the relation does not resolve
/// - [`Error::BusNotInstalled`] if the target window has no bus
pub fn check_and_dispatch(host: &dyn Host) -> Result<Option<Delivery>> {
    let location = host.location();
    if !is_carrier(&location) {
        return Ok(None);
    }

    host.disable_entry_points();
    host.hide_document();

    let fragment = location.split_once('#').map_or("", |(_, f)| f);
    let envelope = Envelope::parse(fragment);

    let relation = envelope
        .relation()
        .ok_or_else(|| Error::envelope("carrier fragment has no relation"))?;
    let relation = Relation::parse(relation)?;

    let target = relation.resolve(&host.window())?;
    let bus = target
        .bus()
        .ok_or_else(|| Error::bus_not_installed(relation.as_str()))?;

    let delivery = bus.recv(envelope);
    info!(relation = %relation, ?delivery, "Carrier page dispatched");
    Ok(Some(delivery))
}

// ============================================================================
// Tests
// ============================================================================
