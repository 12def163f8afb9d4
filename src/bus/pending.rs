//! Awaitable handler adapters.
//!
//! [`Bus::request`] and [`Bus::subscribe`] wrap a registered handler in a
//! channel so async callers can await deliveries instead of passing a
//! closure. Dropping either adapter unregisters its handler.
//!
//! | Adapter | Registration | Channel |
//! |---------|--------------|---------|
//! | [`PendingDelivery`] | one-shot | `oneshot` |
//! | [`Subscription`] | persistent | unbounded `mpsc` |
//!
//! [`Bus::request`]: super::Bus::request
//! [`Bus::subscribe`]: super::Bus::subscribe

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::CallbackId;
use crate::protocol::Envelope;

use super::core::WeakBus;

// ============================================================================
// PendingDelivery
// ============================================================================

/// A one-shot handler awaiting its delivery.
///
/// Resolves to the delivered envelope, or to [`Error::ChannelClosed`] if the
/// handler can no longer fire (bus dropped, handler removed, or the page is
/// a carrier and nothing was registered).
pub struct PendingDelivery {
    /// Registry id; `None` when nothing was registered.
    id: Option<CallbackId>,
    /// Delivery slot filled by the callback.
    rx: oneshot::Receiver<Envelope>,
    /// Bus to unregister from on drop.
    bus: WeakBus,
}

impl fmt::Debug for PendingDelivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingDelivery")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl PendingDelivery {
    pub(crate) fn new(
        id: Option<CallbackId>,
        rx: oneshot::Receiver<Envelope>,
        bus: WeakBus,
    ) -> Self {
        Self { id, rx, bus }
    }

    /// Returns the correlation id of the underlying handler.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&CallbackId> {
        self.id.as_ref()
    }

    /// Waits at most `duration` for the delivery.
    ///
    /// The handler is unregistered when this returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if nothing arrived in time
    /// - [`Error::ChannelClosed`] if the handler can no longer fire
    pub async fn timeout(mut self, duration: Duration) -> Result<Envelope> {
        match timeout(duration, &mut self).await {
            Ok(result) => result,
            Err(_) => {
                let cb = self.id.as_ref().map_or("-", CallbackId::as_str);
                debug!(cb, timeout_ms = duration.as_millis() as u64, "Delivery timed out");
                Err(Error::timeout(cb, duration.as_millis() as u64))
            }
        }
    }
}

impl Future for PendingDelivery {
    type Output = Result<Envelope>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map_err(Error::from)
    }
}

impl Drop for PendingDelivery {
    fn drop(&mut self) {
        unregister(&self.bus, self.id.as_ref());
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// A persistent handler delivering into a stream.
///
/// Yields `None` once the bus is gone.
pub struct Subscription {
    /// Registry id; `None` when nothing was registered.
    id: Option<CallbackId>,
    /// Deliveries in arrival order.
    rx: mpsc::UnboundedReceiver<Envelope>,
    /// Bus to unregister from on drop.
    bus: WeakBus,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Subscription {
    pub(crate) fn new(
        id: Option<CallbackId>,
        rx: mpsc::UnboundedReceiver<Envelope>,
        bus: WeakBus,
    ) -> Self {
        Self { id, rx, bus }
    }

    /// Returns the correlation id of the underlying handler.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&CallbackId> {
        self.id.as_ref()
    }

    /// Receives the next delivery.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Returns a delivery that has already arrived, without waiting.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Envelope;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        unregister(&self.bus, self.id.as_ref());
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn unregister(bus: &WeakBus, id: Option<&CallbackId>) {
    let (Some(bus), Some(id)) = (bus.upgrade(), id) else {
        return;
    };
    if bus.remove_handler(id) {
        trace!(cb = %id, "Adapter dropped, handler removed");
    }
}

// ============================================================================
// Tests
// ============================================================================
