//! Plugin local-connection transport.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};
use url::Url;

use crate::bus::Bus;
use crate::error::Result;
use crate::window::PluginBridge;

use super::{Transport, TransportKind, proxy_return_address};

// ============================================================================
// PluginChannel
// ============================================================================

/// Receives envelopes through a plugin-hosted local connection bound to the
/// bus origin. Message bodies arrive URI-encoded.
pub struct PluginChannel {
    /// The plugin runtime.
    plugin: Arc<dyn PluginBridge>,
    /// Origin the connection is bound to.
    origin: String,
}

impl fmt::Debug for PluginChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginChannel")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl PluginChannel {
    /// Creates the plugin transport.
    #[must_use]
    pub fn new(plugin: Arc<dyn PluginBridge>, origin: impl Into<String>) -> Self {
        Self {
            plugin,
            origin: origin.into(),
        }
    }
}

impl Transport for PluginChannel {
    fn kind(&self) -> TransportKind {
        TransportKind::Plugin
    }

    fn activate(&self, bus: &Bus) -> Result<()> {
        let weak = bus.downgrade();
        let plugin = Arc::clone(&self.plugin);
        let origin = self.origin.clone();

        self.plugin.on_ready(Box::new(move || {
            debug!(origin = %origin, "Plugin ready, starting local connection");
            plugin.init_local_connection(
                &origin,
                Box::new(move |message: String| {
                    let Some(bus) = weak.upgrade() else {
                        trace!("Plugin message after bus dropped");
                        return;
                    };
                    bus.recv(decode_message(&message));
                }),
            );
        }));

        Ok(())
    }

    fn return_address(&self, proxy_url: &Url) -> String {
        proxy_return_address(proxy_url)
    }
}

/// Undoes the plugin's URI encoding of the whole message.
fn decode_message(message: &str) -> String {
    match urlencoding::decode(message) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            trace!(error = %e, "Plugin message not valid UTF-8 after decoding");
            message.to_string()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
