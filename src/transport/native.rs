//! Native cross-context message event transport.

use tracing::{debug, trace};
use url::Url;

use crate::bus::Bus;
use crate::error::Result;
use crate::protocol::RawMessage;

use super::{Transport, TransportKind, proxy_return_address};

// ============================================================================
// NativeChannel
// ============================================================================

/// Receives envelopes through the host's native message event.
///
/// The event's data payload is handed to the dispatcher unmodified.
#[derive(Debug, Default)]
pub struct NativeChannel;

impl NativeChannel {
    /// Creates the native transport.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Transport for NativeChannel {
    fn kind(&self) -> TransportKind {
        TransportKind::Native
    }

    fn activate(&self, bus: &Bus) -> Result<()> {
        let weak = bus.downgrade();

        bus.host().add_message_listener(Box::new(move |data: RawMessage| {
            let Some(bus) = weak.upgrade() else {
                trace!("Message event after bus dropped");
                return;
            };
            bus.recv(data);
        }));

        debug!("Native message listener attached");
        Ok(())
    }

    fn return_address(&self, proxy_url: &Url) -> String {
        proxy_return_address(proxy_url)
    }
}

// ============================================================================
// Tests
// ============================================================================
