//! The cross-domain message bus.
//!
//! One [`Bus`] lives per page. It negotiates a transport once, hands out
//! handler URLs bound to registered callbacks, and dispatches inbound
//! envelopes to them.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──init()──► Negotiating ──► Ready(transport)
//! ```
//!
//! `Ready` is terminal: the transport never changes afterwards.
//!
//! # Example
//!
//! ```ignore
//! let bus = Bus::builder(host).build()?;
//! bus.init()?;
//!
//! let url = bus.handler(|envelope| {
//!     println!("session: {:?}", envelope.get("session"));
//! }, Some("opener"), false)?;
//!
//! provisioner.open_popup(url.as_str());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::identifiers::CallbackId;
use crate::protocol::{
    Delivery, Envelope, KEY_CB, KEY_ORIGIN, KEY_RELATION, KEY_TRANSPORT, RawMessage,
};
use crate::transport::{OriginContext, TransportKind, is_carrier, negotiate};
use crate::window::{DEFAULT_RELATION, Host, Relation};

use super::builder::{BusBuilder, BusConfig};
use super::factories::HandlerArgs;
use super::pending::{PendingDelivery, Subscription};
use super::registry::{Callback, CallbackRegistry};

// ============================================================================
// Constants
// ============================================================================

/// URL returned on carrier pages; loading it does nothing.
///
/// The trailing `//` turns anything a caller appends into a comment.
pub const NOOP_URL: &str = "javascript:false;//";

// ============================================================================
// Types
// ============================================================================

/// Internal negotiation state.
enum BusState {
    Uninitialized,
    Negotiating,
    Ready(OriginContext),
}

/// Public view of the negotiation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusPhase {
    /// `init` has not run.
    Uninitialized,
    /// `init` is running.
    Negotiating,
    /// A transport is selected and active.
    Ready(TransportKind),
}

/// Internal shared state for a bus.
pub(crate) struct BusInner {
    /// Page the bus runs in.
    host: Arc<dyn Host>,
    /// Validated configuration.
    config: BusConfig,
    /// Negotiation state.
    state: RwLock<BusState>,
    /// Live callbacks.
    registry: CallbackRegistry,
}

// ============================================================================
// HandlerUrl
// ============================================================================

/// A return address bound to a registered callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerUrl {
    /// Registry id; `None` for the no-op URL.
    id: Option<CallbackId>,
    /// The URL to hand to the remote side.
    url: String,
}

impl HandlerUrl {
    /// The no-op URL returned on carrier pages.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            id: None,
            url: NOOP_URL.to_string(),
        }
    }

    /// Returns the correlation id, if a callback was registered.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&CallbackId> {
        self.id.as_ref()
    }

    /// Returns `true` for the no-op URL.
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.id.is_none()
    }

    /// Returns the URL.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Consumes the handle, returning the URL.
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.url
    }
}

impl fmt::Display for HandlerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

// ============================================================================
// Bus
// ============================================================================

/// Handle to a page's cross-domain message bus.
///
/// Cloning is cheap; all clones share one registry and one transport.
#[derive(Clone)]
pub struct Bus {
    /// Shared inner state.
    pub(crate) inner: Arc<BusInner>,
}

/// Non-owning bus handle held by transport listeners.
#[derive(Clone)]
pub(crate) struct WeakBus {
    inner: Weak<BusInner>,
}

impl WeakBus {
    /// Returns the bus if it is still alive.
    pub(crate) fn upgrade(&self) -> Option<Bus> {
        self.inner.upgrade().map(|inner| Bus { inner })
    }
}

// ============================================================================
// Bus - Display
// ============================================================================

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("phase", &self.phase())
            .field("origin", &self.origin())
            .field("handlers", &self.inner.registry.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Bus - Constructor
// ============================================================================

impl Bus {
    /// Creates a builder for a bus running in `host`.
    #[inline]
    #[must_use]
    pub fn builder(host: Arc<dyn Host>) -> BusBuilder {
        BusBuilder::new(host)
    }

    /// Creates an uninitialized bus.
    pub(crate) fn new(host: Arc<dyn Host>, config: BusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                host,
                config,
                state: RwLock::new(BusState::Uninitialized),
                registry: CallbackRegistry::new(),
            }),
        }
    }

    /// Returns a non-owning handle.
    pub(crate) fn downgrade(&self) -> WeakBus {
        WeakBus {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Returns the host.
    #[inline]
    pub(crate) fn host(&self) -> &Arc<dyn Host> {
        &self.inner.host
    }
}

// ============================================================================
// Bus - Negotiation
// ============================================================================

impl Bus {
    /// Selects and activates a transport.
    ///
    /// Idempotent: once a transport is chosen, later calls return it
    /// unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::NotReady`] if called again while negotiation is running
    /// - [`Error::Url`] if the host location cannot be parsed
    pub fn init(&self) -> Result<TransportKind> {
        {
            let mut state = self.inner.state.write();
            match &*state {
                BusState::Ready(ctx) => return Ok(ctx.kind()),
                BusState::Negotiating => {
                    return Err(Error::not_ready("init re-entered during negotiation"));
                }
                BusState::Uninitialized => *state = BusState::Negotiating,
            }
        }

        let ctx = negotiate(self.inner.host.as_ref(), self.inner.config.channel_url())
            .and_then(|ctx| ctx.transport().activate(self).map(|()| ctx));

        let mut state = self.inner.state.write();
        match ctx {
            Ok(ctx) => {
                let kind = ctx.kind();
                info!(transport = %kind, origin = ?ctx.origin(), "Bus ready");
                *state = BusState::Ready(ctx);
                Ok(kind)
            }
            Err(e) => {
                debug!(error = %e, "Negotiation failed");
                *state = BusState::Uninitialized;
                Err(e)
            }
        }
    }

    /// Returns the negotiation phase.
    #[must_use]
    pub fn phase(&self) -> BusPhase {
        match &*self.inner.state.read() {
            BusState::Uninitialized => BusPhase::Uninitialized,
            BusState::Negotiating => BusPhase::Negotiating,
            BusState::Ready(ctx) => BusPhase::Ready(ctx.kind()),
        }
    }

    /// Returns the selected transport, once ready.
    #[must_use]
    pub fn transport(&self) -> Option<TransportKind> {
        match self.phase() {
            BusPhase::Ready(kind) => Some(kind),
            _ => None,
        }
    }

    /// Returns the own origin string, once ready (never set in fragment mode).
    #[must_use]
    pub fn origin(&self) -> Option<String> {
        self.origin_context()
            .and_then(|ctx| ctx.origin().map(str::to_string))
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Returns a copy of the negotiated context.
    fn origin_context(&self) -> Option<OriginContext> {
        match &*self.inner.state.read() {
            BusState::Ready(ctx) => Some(ctx.clone()),
            _ => None,
        }
    }
}

// ============================================================================
// Bus - Handler Factory
// ============================================================================

impl Bus {
    /// Registers `callback` and returns the URL that will invoke it.
    ///
    /// # Arguments
    ///
    /// * `callback` - Called with the full inbound envelope
    /// * `relation` - How the carrier page reaches this window (default `opener`)
    /// * `persistent` - Keep the registration after the first delivery
    ///
    /// On a page that is itself a fragment carrier this returns
    /// [`HandlerUrl::noop`] and registers nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::Syntax`] if `relation` is malformed
    /// - [`Error::NotReady`] if [`init`](Self::init) has not completed
    pub fn handler<F>(
        &self,
        callback: F,
        relation: Option<&str>,
        persistent: bool,
    ) -> Result<HandlerUrl>
    where
        F: Fn(Envelope) + Send + Sync + 'static,
    {
        self.register_handler(Arc::new(callback), relation, persistent)
    }

    /// Like [`handler`](Self::handler), building the callback from a
    /// registered handler kind.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownHandlerKind`] if `kind` was not registered
    /// - as [`handler`](Self::handler)
    pub fn named_handler(
        &self,
        kind: &str,
        args: &HandlerArgs,
        relation: Option<&str>,
        persistent: bool,
    ) -> Result<HandlerUrl> {
        let callback = self.inner.config.kinds().build(kind, args)?;
        self.register_handler(callback, relation, persistent)
    }

    /// Registers a one-shot handler whose delivery can be awaited.
    ///
    /// Dropping the returned [`PendingDelivery`] unregisters the handler.
    ///
    /// # Errors
    ///
    /// As [`handler`](Self::handler).
    pub fn request(&self, relation: Option<&str>) -> Result<(HandlerUrl, PendingDelivery)> {
        let (tx, rx) = oneshot::channel();
        let slot = Mutex::new(Some(tx));

        let url = self.handler(
            move |envelope| {
                if let Some(tx) = slot.lock().take() {
                    let _ = tx.send(envelope);
                }
            },
            relation,
            false,
        )?;

        let pending = PendingDelivery::new(url.id().cloned(), rx, self.downgrade());
        Ok((url, pending))
    }

    /// Registers a persistent handler whose deliveries arrive as a stream.
    ///
    /// Dropping the returned [`Subscription`] unregisters the handler.
    ///
    /// # Errors
    ///
    /// As [`handler`](Self::handler).
    pub fn subscribe(&self, relation: Option<&str>) -> Result<(HandlerUrl, Subscription)> {
        let (tx, rx) = mpsc::unbounded_channel();

        let url = self.handler(
            move |envelope| {
                let _ = tx.send(envelope);
            },
            relation,
            true,
        )?;

        let subscription = Subscription::new(url.id().cloned(), rx, self.downgrade());
        Ok((url, subscription))
    }

    /// Unregisters a handler. Returns `true` if it was live.
    ///
    /// This is the only way to cancel an outstanding handler.
    pub fn remove_handler(&self, id: &CallbackId) -> bool {
        self.inner.registry.remove(id.as_str())
    }

    /// Returns `true` if `id` is registered.
    #[must_use]
    pub fn is_registered(&self, id: &CallbackId) -> bool {
        self.inner.registry.contains(id.as_str())
    }

    /// Number of live handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Shared path for all handler constructors.
    fn register_handler(
        &self,
        callback: Callback,
        relation: Option<&str>,
        persistent: bool,
    ) -> Result<HandlerUrl> {
        if is_carrier(&self.inner.host.location()) {
            debug!("Handler requested on a carrier page, returning no-op URL");
            return Ok(HandlerUrl::noop());
        }

        let relation = relation.unwrap_or(DEFAULT_RELATION);
        Relation::parse(relation)?;

        let ctx = self
            .origin_context()
            .ok_or_else(|| Error::not_ready("handler requested before init"))?;

        let id = self.inner.registry.register(callback, persistent);

        let mut envelope = Envelope::new()
            .with(KEY_CB, id.as_str())
            .with(KEY_RELATION, relation)
            .with(KEY_TRANSPORT, ctx.kind().as_str());
        if let Some(origin) = ctx.origin() {
            envelope.insert(KEY_ORIGIN, origin);
        }

        let url = format!(
            "{}{}",
            ctx.transport().return_address(self.inner.config.proxy_url()),
            envelope.to_query()
        );

        debug!(cb = %id, relation, persistent, transport = %ctx.kind(), "Handler registered");
        Ok(HandlerUrl { id: Some(id), url })
    }
}

// ============================================================================
// Bus - Dispatcher
// ============================================================================

impl Bus {
    /// Routes an inbound message to its callback.
    ///
    /// Unknown, stale or missing ids are dropped silently.
    pub fn recv(&self, message: impl Into<RawMessage>) -> Delivery {
        let envelope = message.into().into_envelope();

        let Some(id) = envelope.cb() else {
            trace!("Message without cb ignored");
            return Delivery::Stale;
        };

        let Some((callback, persistent)) = self.inner.registry.take(id.as_str()) else {
            trace!(cb = %id, "No live handler, message dropped");
            return Delivery::Stale;
        };

        debug!(cb = %id, persistent, "Dispatching envelope");
        callback(envelope);
        Delivery::Invoked { persistent }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::protocol::query;
    use crate::testing::{FakeHost, FakePlugin, init_tracing};
    use crate::window::{ContextRef, MessageListener, PluginBridge};

    /// Native host that calls `init` again while its listener is attached.
    struct ReentrantHost {
        page: Arc<FakeHost>,
        bus: Mutex<Option<WeakBus>>,
        nested: Mutex<Option<Result<TransportKind>>>,
    }

    impl Host for ReentrantHost {
        fn location(&self) -> String {
            self.page.location()
        }

        fn window(&self) -> ContextRef {
            self.page.window()
        }

        fn supports_native_messaging(&self) -> bool {
            true
        }

        fn add_message_listener(&self, listener: MessageListener) {
            let bus = self.bus.lock().as_ref().and_then(WeakBus::upgrade);
            if let Some(bus) = bus {
                *self.nested.lock() = Some(bus.init());
            }
            self.page.add_message_listener(listener);
        }

        fn document_domain(&self) -> String {
            self.page.document_domain()
        }

        fn plugin(&self) -> Option<Arc<dyn PluginBridge>> {
            None
        }

        fn disable_entry_points(&self) {}

        fn hide_document(&self) {}
    }

    fn native_bus() -> (Arc<FakeHost>, Bus) {
        init_tracing();
        let host = FakeHost::builder("https://app.example/page").native().build();
        let bus = Bus::builder(host.clone()).build().unwrap();
        bus.init().unwrap();
        (host, bus)
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(Envelope) + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        (hits, move |_: Envelope| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    }

    /// Decodes the envelope part of a handler URL.
    fn envelope_of(url: &HandlerUrl) -> Envelope {
        let (_, tail) = url.as_str().split_once('#').unwrap();
        Envelope::parse(tail)
    }

    #[test]
    fn test_phases() {
        let host = FakeHost::builder("https://app.example/").native().build();
        let bus = Bus::builder(host).build().unwrap();
        assert_eq!(bus.phase(), BusPhase::Uninitialized);
        assert_eq!(bus.transport(), None);

        bus.init().unwrap();
        assert_eq!(bus.phase(), BusPhase::Ready(TransportKind::Native));
    }

    #[test]
    fn test_init_is_idempotent() {
        let host = FakeHost::builder("https://app.example/").native().build();
        let bus = Bus::builder(host.clone()).build().unwrap();

        assert_eq!(bus.init().unwrap(), TransportKind::Native);
        let origin = bus.origin();

        host.set_native(false);
        assert_eq!(bus.init().unwrap(), TransportKind::Native);
        assert_eq!(bus.origin(), origin);
        assert_eq!(host.listener_count(), 1);
    }

    #[test]
    fn test_init_reentered_while_negotiating() {
        let host = Arc::new(ReentrantHost {
            page: FakeHost::builder("https://app.example/").build(),
            bus: Mutex::new(None),
            nested: Mutex::new(None),
        });
        let bus = Bus::builder(host.clone()).build().unwrap();
        *host.bus.lock() = Some(bus.downgrade());

        assert_eq!(bus.init().unwrap(), TransportKind::Native);

        let nested = host.nested.lock().take().unwrap();
        assert!(matches!(nested, Err(Error::NotReady { .. })));
        assert_eq!(bus.phase(), BusPhase::Ready(TransportKind::Native));
        assert_eq!(host.page.listener_count(), 1);
    }

    #[test]
    fn test_init_failure_allows_retry() {
        let host = FakeHost::builder("not a url").native().build();
        let bus = Bus::builder(host.clone()).build().unwrap();

        assert!(matches!(bus.init(), Err(Error::Url(_))));
        assert_eq!(bus.phase(), BusPhase::Uninitialized);

        host.set_location("https://app.example/");
        assert_eq!(bus.init().unwrap(), TransportKind::Native);
    }

    #[test]
    fn test_handler_before_init() {
        let host = FakeHost::builder("https://app.example/").native().build();
        let bus = Bus::builder(host).build().unwrap();
        let err = bus.handler(|_| {}, None, false).unwrap_err();
        assert!(matches!(err, Error::NotReady { .. }));
        assert_eq!(bus.handler_count(), 0);
    }

    #[test]
    fn test_native_handler_url() {
        let (_host, bus) = native_bus();
        let url = bus.handler(|_| {}, Some("opener"), false).unwrap();

        assert!(url.as_str().starts_with(
            "https://static.ak.fbcdn.net/connect/xd_proxy.php#?=&cb="
        ));
        let envelope = envelope_of(&url);
        assert_eq!(envelope.transport(), Some(TransportKind::Native));
        assert_eq!(envelope.relation(), Some("opener"));
        assert_eq!(envelope.origin().map(str::to_string), bus.origin());

        let id = envelope.cb().unwrap();
        assert_eq!(Some(&id), url.id());
        assert!(bus.is_registered(&id));
    }

    #[test]
    fn test_default_relation_is_opener() {
        let (_host, bus) = native_bus();
        let url = bus.handler(|_| {}, None, false).unwrap();
        assert_eq!(envelope_of(&url).relation(), Some("opener"));
    }

    #[test]
    fn test_malformed_relation_rejected() {
        let (_host, bus) = native_bus();
        let err = bus.handler(|_| {}, Some("frames[x"), false).unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
        assert_eq!(bus.handler_count(), 0);
    }

    #[test]
    fn test_ids_distinct() {
        let (_host, bus) = native_bus();
        let ids: HashSet<_> = (0..200)
            .map(|i| {
                bus.handler(|_| {}, None, i % 2 == 0)
                    .unwrap()
                    .id()
                    .cloned()
                    .unwrap()
            })
            .collect();
        assert_eq!(ids.len(), 200);
        assert_eq!(bus.handler_count(), 200);
    }

    #[test]
    fn test_one_shot_delivery() {
        let (_host, bus) = native_bus();
        let (hits, callback) = counter();
        let url = bus.handler(callback, Some("opener"), false).unwrap();
        let id = url.id().unwrap().clone();

        let message = format!("cb={id}&result=ok");
        assert_eq!(bus.recv(message.as_str()), Delivery::Invoked { persistent: false });
        assert_eq!(bus.recv(message.as_str()), Delivery::Stale);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!bus.is_registered(&id));
    }

    #[test]
    fn test_persistent_delivery() {
        let (_host, bus) = native_bus();
        let (hits, callback) = counter();
        let url = bus.handler(callback, Some("parent"), true).unwrap();
        let id = url.id().unwrap().clone();

        for _ in 0..5 {
            let delivery = bus.recv(Envelope::new().with("cb", id.as_str()));
            assert_eq!(delivery, Delivery::Invoked { persistent: true });
        }

        assert_eq!(hits.load(Ordering::SeqCst), 5);
        assert!(bus.is_registered(&id));
    }

    #[test]
    fn test_callback_receives_full_envelope() {
        let (_host, bus) = native_bus();
        let got = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&got);
        let url = bus
            .handler(move |env| *slot.lock() = Some(env), None, false)
            .unwrap();

        let message = format!(
            "cb={}&origin=https%3A%2F%2Fremote.example&relation=opener&transport=native&session=%7B%22uid%22%3A1%7D",
            url.id().unwrap()
        );
        bus.recv(message.clone());

        let env = got.lock().take().unwrap();
        assert_eq!(env.fields(), &query::decode(&message));
        assert_eq!(env.get("session"), Some("{\"uid\":1}"));
    }

    #[test]
    fn test_unknown_id_is_silent() {
        let (_host, bus) = native_bus();
        let (hits, callback) = counter();
        bus.handler(callback, None, false).unwrap();

        assert_eq!(bus.recv("cb=999&origin=x"), Delivery::Stale);
        assert_eq!(bus.recv("origin=x"), Delivery::Stale);
        assert_eq!(bus.recv(""), Delivery::Stale);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(bus.handler_count(), 1);
    }

    #[test]
    fn test_remove_handler_cancels() {
        let (_host, bus) = native_bus();
        let (hits, callback) = counter();
        let url = bus.handler(callback, None, true).unwrap();
        let id = url.id().unwrap().clone();

        assert!(bus.remove_handler(&id));
        assert_eq!(bus.recv(format!("cb={id}")), Delivery::Stale);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(!bus.remove_handler(&id));
    }

    #[test]
    fn test_callback_may_reenter_bus() {
        let (_host, bus) = native_bus();
        let inner_bus = bus.clone();
        let nested = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&nested);

        let url = bus
            .handler(
                move |_| {
                    let next = inner_bus.handler(|_| {}, None, false).unwrap();
                    *slot.lock() = Some(next);
                },
                None,
                false,
            )
            .unwrap();

        bus.recv(format!("cb={}", url.id().unwrap()));
        let next = nested.lock().take().unwrap();
        assert!(bus.is_registered(next.id().unwrap()));
    }

    #[test]
    fn test_persistent_callback_may_remove_itself() {
        let (_host, bus) = native_bus();
        let inner_bus = bus.clone();
        let own_id: Arc<Mutex<Option<CallbackId>>> = Arc::new(Mutex::new(None));
        let own = Arc::clone(&own_id);
        let (hits, count) = counter();

        let url = bus
            .handler(
                move |env| {
                    count(env);
                    if let Some(id) = own.lock().as_ref() {
                        inner_bus.remove_handler(id);
                    }
                },
                None,
                true,
            )
            .unwrap();
        let id = url.id().unwrap().clone();
        *own_id.lock() = Some(id.clone());

        assert!(bus.recv(format!("cb={id}")).is_invoked());
        assert_eq!(bus.recv(format!("cb={id}")), Delivery::Stale);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_plugin_handler_url() {
        let host = FakeHost::builder("http://www.app.example/")
            .domain("app.example")
            .plugin(FakePlugin::new(true))
            .build();
        let bus = Bus::builder(host)
            .proxy_url("https://cdn.example/xd_proxy.php")
            .build()
            .unwrap();
        assert_eq!(bus.init().unwrap(), TransportKind::Plugin);

        let url = bus.handler(|_| {}, Some("parent"), false).unwrap();
        assert!(url.as_str().starts_with("https://cdn.example/xd_proxy.php#?=&cb="));
        let envelope = envelope_of(&url);
        assert_eq!(envelope.transport(), Some(TransportKind::Plugin));
        assert!(envelope.origin().unwrap().starts_with("http://app.example/"));
    }

    #[test]
    fn test_fragment_handler_url() {
        let host = FakeHost::builder("https://app.example/index.html").build();
        let bus = Bus::builder(host)
            .channel_url("https://app.example/channel.html#ignored")
            .build()
            .unwrap();
        assert_eq!(bus.init().unwrap(), TransportKind::Fragment);
        assert_eq!(bus.origin(), None);

        let url = bus.handler(|_| {}, Some("parent"), false).unwrap();
        let id = url.id().unwrap();
        assert_eq!(
            url.as_str(),
            format!(
                "https://app.example/channel.html?fb_xd_fragment#?=&cb={id}&relation=parent&transport=fragment"
            )
        );
    }

    #[test]
    fn test_fragment_defaults_to_current_location() {
        let host = FakeHost::builder("https://app.example/index.html?lang=en").build();
        let bus = Bus::builder(host).build().unwrap();
        bus.init().unwrap();

        let url = bus.handler(|_| {}, None, false).unwrap();
        assert!(url
            .as_str()
            .starts_with("https://app.example/index.html?lang=en&fb_xd_fragment#?=&"));
    }

    #[test]
    fn test_carrier_page_returns_noop() {
        let host = FakeHost::builder(
            "https://app.example/channel.html?fb_xd_fragment#?=&cb=f1&relation=parent",
        )
        .native()
        .build();
        let bus = Bus::builder(host).build().unwrap();
        bus.init().unwrap();

        let url = bus.handler(|_| {}, Some("parent"), false).unwrap();
        assert!(url.is_noop());
        assert_eq!(url.as_str(), NOOP_URL);
        assert_eq!(bus.handler_count(), 0);
    }

    #[test]
    fn test_carrier_guard_precedes_init_check() {
        let host =
            FakeHost::builder("https://app.example/c.html?fb_xd_fragment#?=&relation=parent").build();
        let bus = Bus::builder(host).build().unwrap();
        assert!(bus.handler(|_| {}, None, false).unwrap().is_noop());
    }

    #[test]
    fn test_named_handler() {
        let host = FakeHost::builder("https://app.example/").native().build();
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&statuses);

        let bus = Bus::builder(host)
            .handler_kind("auth.status", move |args| {
                let status = args.get("status").cloned().unwrap_or_default();
                let sink = Arc::clone(&sink);
                Arc::new(move |env: Envelope| {
                    sink.lock().push((status.clone(), env.get("session").map(str::to_string)));
                })
            })
            .build()
            .unwrap();
        bus.init().unwrap();

        let args = HandlerArgs::from([("status".to_string(), "connected".to_string())]);
        let url = bus
            .named_handler("auth.status", &args, Some("parent"), false)
            .unwrap();
        bus.recv(format!("cb={}&session=s1", url.id().unwrap()));

        assert_eq!(
            statuses.lock().as_slice(),
            [("connected".to_string(), Some("s1".to_string()))]
        );

        let err = bus
            .named_handler("auth.logout", &args, None, false)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownHandlerKind { .. }));
    }

    #[test]
    fn test_debug_output() {
        let (_host, bus) = native_bus();
        let text = format!("{bus:?}");
        assert!(text.contains("Ready(Native)"), "{text}");
    }
}
