//! In-memory hosts, windows and plugins for tests.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use url::Url;

use crate::bus::Bus;
use crate::bus::core::WeakBus;
use crate::protocol::RawMessage;
use crate::window::{
    BrowsingContext, ContextRef, Host, MessageListener, PluginBridge, PluginListener,
};

// ============================================================================
// Tracing
// ============================================================================

/// Installs a test-writer subscriber filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// FakeWindow
// ============================================================================

/// A browsing context with settable links.
///
/// `parent` and `top` point at the window itself until set, like a
/// top-level browser window.
pub struct FakeWindow {
    name: String,
    opener: Mutex<Option<Weak<FakeWindow>>>,
    parent: Mutex<Weak<FakeWindow>>,
    top: Mutex<Weak<FakeWindow>>,
    frames: Mutex<FxHashMap<String, Arc<FakeWindow>>>,
    bus: Mutex<Option<WeakBus>>,
}

impl FakeWindow {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            name: name.to_string(),
            opener: Mutex::new(None),
            parent: Mutex::new(this.clone()),
            top: Mutex::new(this.clone()),
            frames: Mutex::new(FxHashMap::default()),
            bus: Mutex::new(None),
        })
    }

    pub fn set_opener(&self, opener: &Arc<FakeWindow>) {
        *self.opener.lock() = Some(Arc::downgrade(opener));
    }

    pub fn set_parent(&self, parent: &Arc<FakeWindow>) {
        *self.parent.lock() = Arc::downgrade(parent);
    }

    pub fn set_top(&self, top: &Arc<FakeWindow>) {
        *self.top.lock() = Arc::downgrade(top);
    }

    pub fn add_frame(&self, name: &str, frame: &Arc<FakeWindow>) {
        self.frames.lock().insert(name.to_string(), Arc::clone(frame));
    }

    /// Makes `bus` reachable through [`BrowsingContext::bus`].
    pub fn install_bus(&self, bus: &Bus) {
        *self.bus.lock() = Some(bus.downgrade());
    }

    /// Returns `true` if `context` is `window`.
    pub fn is(context: &ContextRef, window: &Arc<FakeWindow>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(context), Arc::as_ptr(window))
    }

    fn upgrade(link: &Weak<FakeWindow>) -> Option<ContextRef> {
        link.upgrade().map(|w| w as ContextRef)
    }
}

impl fmt::Debug for FakeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeWindow").field("name", &self.name).finish()
    }
}

impl BrowsingContext for FakeWindow {
    fn opener(&self) -> Option<ContextRef> {
        self.opener.lock().as_ref().and_then(Self::upgrade)
    }

    fn parent(&self) -> Option<ContextRef> {
        Self::upgrade(&self.parent.lock())
    }

    fn top(&self) -> Option<ContextRef> {
        Self::upgrade(&self.top.lock())
    }

    fn frame(&self, name: &str) -> Option<ContextRef> {
        self.frames
            .lock()
            .get(name)
            .map(|frame| Arc::clone(frame) as ContextRef)
    }

    fn bus(&self) -> Option<Bus> {
        self.bus.lock().as_ref().and_then(WeakBus::upgrade)
    }
}

// ============================================================================
// FakePlugin
// ============================================================================

/// A plugin bridge whose readiness and traffic are driven by the test.
pub struct FakePlugin {
    min_version: bool,
    ready: Mutex<bool>,
    waiting: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
    connection: Mutex<Option<(String, Arc<PluginListener>)>>,
}

impl FakePlugin {
    /// A plugin that is already loaded.
    pub fn new(min_version: bool) -> Arc<Self> {
        let plugin = Self::deferred(min_version);
        *plugin.ready.lock() = true;
        plugin
    }

    /// A plugin that loads when [`fire_ready`](Self::fire_ready) is called.
    pub fn deferred(min_version: bool) -> Arc<Self> {
        Arc::new(Self {
            min_version,
            ready: Mutex::new(false),
            waiting: Mutex::new(Vec::new()),
            connection: Mutex::new(None),
        })
    }

    pub fn fire_ready(&self) {
        *self.ready.lock() = true;
        let waiting = std::mem::take(&mut *self.waiting.lock());
        for callback in waiting {
            callback();
        }
    }

    /// Origin the local connection was bound to.
    pub fn bound_origin(&self) -> Option<String> {
        self.connection
            .lock()
            .as_ref()
            .map(|(origin, _)| origin.clone())
    }

    /// Sends `message` over the local connection, as the plugin would.
    pub fn deliver(&self, message: &str) {
        let listener = self
            .connection
            .lock()
            .as_ref()
            .map(|(_, listener)| Arc::clone(listener));
        if let Some(listener) = listener {
            listener(message.to_string());
        }
    }
}

impl PluginBridge for FakePlugin {
    fn has_min_version(&self) -> bool {
        self.min_version
    }

    fn on_ready(&self, callback: Box<dyn FnOnce() + Send>) {
        if *self.ready.lock() {
            callback();
        } else {
            self.waiting.lock().push(callback);
        }
    }

    fn init_local_connection(&self, origin: &str, listener: PluginListener) {
        *self.connection.lock() = Some((origin.to_string(), Arc::new(listener)));
    }
}

// ============================================================================
// FakeHost
// ============================================================================

/// A page with a configurable location and capabilities.
pub struct FakeHost {
    location: Mutex<String>,
    window: Arc<FakeWindow>,
    native: AtomicBool,
    domain: Option<String>,
    plugin: Option<Arc<FakePlugin>>,
    listeners: Mutex<Vec<Arc<MessageListener>>>,
    entry_points_disabled: AtomicBool,
    hidden: AtomicBool,
}

/// Builder for [`FakeHost`].
pub struct FakeHostBuilder {
    location: String,
    native: bool,
    domain: Option<String>,
    plugin: Option<Arc<FakePlugin>>,
}

impl FakeHostBuilder {
    /// Enables native messaging.
    pub fn native(mut self) -> Self {
        self.native = true;
        self
    }

    /// Overrides the document domain (defaults to the location host).
    pub fn domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_string());
        self
    }

    pub fn plugin(mut self, plugin: Arc<FakePlugin>) -> Self {
        self.plugin = Some(plugin);
        self
    }

    pub fn build(self) -> Arc<FakeHost> {
        Arc::new(FakeHost {
            location: Mutex::new(self.location),
            window: FakeWindow::new("self"),
            native: AtomicBool::new(self.native),
            domain: self.domain,
            plugin: self.plugin,
            listeners: Mutex::new(Vec::new()),
            entry_points_disabled: AtomicBool::new(false),
            hidden: AtomicBool::new(false),
        })
    }
}

impl FakeHost {
    pub fn builder(location: impl Into<String>) -> FakeHostBuilder {
        FakeHostBuilder {
            location: location.into(),
            native: false,
            domain: None,
            plugin: None,
        }
    }

    pub fn set_location(&self, location: &str) {
        *self.location.lock() = location.to_string();
    }

    pub fn set_native(&self, native: bool) {
        self.native.store(native, Ordering::SeqCst);
    }

    /// The page's own window.
    pub fn window_handle(&self) -> Arc<FakeWindow> {
        Arc::clone(&self.window)
    }

    /// Fires the native message event.
    pub fn post_message(&self, message: RawMessage) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(message.clone());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn entry_points_disabled(&self) -> bool {
        self.entry_points_disabled.load(Ordering::SeqCst)
    }

    pub fn hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }
}

impl Host for FakeHost {
    fn location(&self) -> String {
        self.location.lock().clone()
    }

    fn window(&self) -> ContextRef {
        self.window_handle()
    }

    fn supports_native_messaging(&self) -> bool {
        self.native.load(Ordering::SeqCst)
    }

    fn add_message_listener(&self, listener: MessageListener) {
        self.listeners.lock().push(Arc::new(listener));
    }

    fn document_domain(&self) -> String {
        self.domain.clone().unwrap_or_else(|| {
            Url::parse(&self.location())
                .ok()
                .and_then(|url| url.host_str().map(str::to_string))
                .unwrap_or_default()
        })
    }

    fn plugin(&self) -> Option<Arc<dyn PluginBridge>> {
        self.plugin
            .as_ref()
            .map(|plugin| Arc::clone(plugin) as Arc<dyn PluginBridge>)
    }

    fn disable_entry_points(&self) {
        self.entry_points_disabled.store(true, Ordering::SeqCst);
    }

    fn hide_document(&self) {
        self.hidden.store(true, Ordering::SeqCst);
    }
}
