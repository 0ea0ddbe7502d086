//! The windowing context.
//!
//! A [`WindowContext`] is the single owner of everything the dispatch engine
//! keeps between calls: the native backend, the one-time class registration,
//! the last-error slot, the exit hook and the table of per-window states.
//! Independent contexts share nothing.

use std::cell::RefCell;
use std::fmt;
use std::num::NonZeroUsize;
use std::rc::Rc;

use static_assertions::assert_not_impl_any;

use crate::backend::{NativeBackend, Position, Size, WindowDescriptor, WindowHandle};
use crate::class::{ClassRegistry, WindowClass};
use crate::config::{ContextBuilder, ContextConfig};
use crate::dispatch::{Dispatcher, Outcome};
use crate::error::{ErrorCode, ErrorRegistry, Result, WindowError};
use crate::logging::targets;
use crate::message::{RawMessage, codes};
use crate::state::{StateTable, WindowState};

/// Callback invoked with the exit code of a quit notification.
pub type ExitHook = Rc<dyn Fn(i32)>;

/// Owner of the native backend and all engine state.
///
/// # Example
///
/// ```
/// use horizon_lattice_window::{HeadlessBackend, WindowContext};
///
/// let backend = HeadlessBackend::new();
/// let ctx = WindowContext::new(backend.clone());
///
/// let window = ctx.create(400, 100, Some("Window 1"), None).unwrap();
/// let state = ctx.state(window).unwrap();
/// state.event.window.close.set(|ctx, _, state| {
///     state.set_running(false);
///     ctx.request_exit(0);
/// });
///
/// backend.post_close(window);
/// while state.is_running() {
///     ctx.pump(None);
/// }
/// ```
pub struct WindowContext {
    backend: Box<dyn NativeBackend>,
    config: ContextConfig,
    classes: ClassRegistry,
    pub(crate) errors: ErrorRegistry,
    pub(crate) states: StateTable,
    dispatcher: Dispatcher,
    exit_hook: RefCell<Option<ExitHook>>,
}

// Dispatch happens on the thread that pumps.
assert_not_impl_any!(WindowContext: Send, Sync);

impl WindowContext {
    /// Create a context with the default configuration.
    pub fn new(backend: impl NativeBackend + 'static) -> Self {
        Self::with_config(backend, ContextConfig::default())
    }

    /// Create a context with a custom configuration.
    pub fn with_config(backend: impl NativeBackend + 'static, config: ContextConfig) -> Self {
        tracing::debug!(target: targets::CORE, class = %config.class_name, "creating window context");
        Self {
            backend: Box::new(backend),
            classes: ClassRegistry::new(WindowClass::new(config.class_name.clone())),
            errors: ErrorRegistry::new(),
            states: StateTable::new(config.max_windows),
            dispatcher: Dispatcher::new(),
            exit_hook: RefCell::new(None),
            config,
        }
    }

    /// Start building a context with custom configuration.
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// The native backend this context drives.
    pub fn backend(&self) -> &dyn NativeBackend {
        self.backend.as_ref()
    }

    /// The window class every window of this context is created from.
    pub fn window_class(&self) -> &WindowClass {
        self.classes.class()
    }

    /// Whether the window class has been registered successfully.
    pub fn is_class_registered(&self) -> bool {
        self.classes.is_registered()
    }

    // =========================================================================
    // Window lifecycle
    // =========================================================================

    /// Create a hidden window.
    ///
    /// Registers the window class on first use. The creation notification is
    /// dispatched before this returns, so a successful result always has a
    /// [`WindowState`] attached.
    ///
    /// # Errors
    ///
    /// Every failure is also recorded in the last-error slot:
    ///
    /// - [`WindowError::RegisterClass`] if class registration failed, now or
    ///   on an earlier call;
    /// - [`WindowError::CreateWindow`] if the backend refused the window;
    /// - [`WindowError::AllocateState`] if the state could not be allocated.
    ///   The native window has been destroyed again.
    #[tracing::instrument(skip(self), target = "horizon_lattice_window", level = "debug")]
    pub fn create(
        &self,
        width: i32,
        height: i32,
        title: Option<&str>,
        parent: Option<WindowHandle>,
    ) -> Result<WindowHandle> {
        if let Err(err) = self.classes.ensure_registered(self.backend()) {
            return Err(self.fail(err));
        }

        let descriptor = WindowDescriptor {
            class_name: self.classes.class().name().to_string(),
            size: Size::new(width, height),
            title: title.map(str::to_owned),
            parent,
        };
        let created = self.backend.create_window(&descriptor);
        // Whatever the backend raised while creating, success or not.
        self.flush_sent();

        let window = match created {
            Ok(window) => window,
            Err(source) => {
                tracing::error!(target: targets::CORE, %source, "native window creation failed");
                return Err(self.fail(WindowError::CreateWindow(source)));
            }
        };

        if !self.states.contains(window) {
            // No state was attached, so the native window must not outlive
            // this call.
            tracing::warn!(target: targets::CORE, %window, "window created without state, destroying it");
            self.backend.destroy_window(window);
            self.flush_sent();
            return Err(self.fail(WindowError::AllocateState));
        }

        tracing::debug!(target: targets::CORE, %window, "window created");
        Ok(window)
    }

    /// Destroy a window.
    ///
    /// The destruction notification is dispatched before this returns: the
    /// destroy callback (if any) runs, then the window's state is released.
    /// The handle must not be used afterwards.
    #[tracing::instrument(skip(self), target = "horizon_lattice_window", level = "debug")]
    pub fn destroy(&self, window: WindowHandle) {
        self.backend.destroy_window(window);
        self.flush_sent();
    }

    /// The state attached to `window`, if it is alive.
    pub fn state(&self, window: WindowHandle) -> Option<Rc<WindowState>> {
        self.states.get(window)
    }

    /// Number of windows with an attached state.
    pub fn window_count(&self) -> usize {
        self.states.len()
    }

    /// Handles of every window with an attached state.
    pub fn windows(&self) -> Vec<WindowHandle> {
        self.states.handles()
    }

    // =========================================================================
    // Pass-throughs
    // =========================================================================

    pub fn set_title(&self, window: WindowHandle, title: &str) {
        self.backend.set_title(window, title);
        self.flush_sent();
    }

    pub fn title(&self, window: WindowHandle) -> Option<String> {
        self.backend.title(window)
    }

    pub fn set_size(&self, window: WindowHandle, width: i32, height: i32) {
        self.backend.set_size(window, Size::new(width, height));
        self.flush_sent();
    }

    pub fn size(&self, window: WindowHandle) -> Option<Size> {
        self.backend.size(window)
    }

    pub fn set_position(&self, window: WindowHandle, x: i32, y: i32) {
        self.backend.set_position(window, Position::new(x, y));
        self.flush_sent();
    }

    pub fn position(&self, window: WindowHandle) -> Option<Position> {
        self.backend.position(window)
    }

    pub fn show(&self, window: WindowHandle) {
        self.backend.show(window);
        self.flush_sent();
    }

    pub fn hide(&self, window: WindowHandle) {
        self.backend.hide(window);
        self.flush_sent();
    }

    pub fn minimize(&self, window: WindowHandle) {
        self.backend.minimize(window);
        self.flush_sent();
    }

    pub fn maximize(&self, window: WindowHandle) {
        self.backend.maximize(window);
        self.flush_sent();
    }

    // =========================================================================
    // Run loop
    // =========================================================================

    /// Dispatch every pending notification without blocking.
    ///
    /// With `filter` set only notifications for that window are taken, plus
    /// thread-wide ones such as quit. A quit notification invokes the exit
    /// hook with its exit code and ends this call; anything still pending
    /// stays queued. At most [`ContextConfig::pump_budget`] notifications are
    /// taken when a budget is configured.
    ///
    /// Returns the number of notifications taken from the queue.
    #[tracing::instrument(skip(self), target = "horizon_lattice_window::pump", level = "trace")]
    pub fn pump(&self, filter: Option<WindowHandle>) -> usize {
        let mut taken = 0;
        loop {
            if let Some(budget) = self.config.pump_budget.map(NonZeroUsize::get)
                && taken >= budget
            {
                tracing::trace!(target: targets::PUMP, budget, "pump budget exhausted");
                break;
            }
            let Some(message) = self.backend.peek_message(filter) else {
                break;
            };
            taken += 1;

            if message.code == codes::QUIT {
                self.run_exit_hook(message.exit_code());
                break;
            }

            self.route(&message);
            self.flush_sent();
        }
        taken
    }

    /// Queue a quit notification carrying `exit_code`.
    ///
    /// A later [`pump`](Self::pump) observes it and calls the exit hook.
    pub fn request_exit(&self, exit_code: i32) {
        tracing::debug!(target: targets::PUMP, exit_code, "exit requested");
        self.backend.post_quit(exit_code);
    }

    /// Install the exit hook, replacing any previous one.
    pub fn set_exit_hook<F>(&self, hook: F)
    where
        F: Fn(i32) + 'static,
    {
        let previous = self.exit_hook.replace(Some(Rc::new(hook)));
        drop(previous);
    }

    pub fn exit_hook(&self) -> Option<ExitHook> {
        self.exit_hook.borrow().clone()
    }

    /// Remove and return the exit hook.
    pub fn clear_exit_hook(&self) -> Option<ExitHook> {
        self.exit_hook.replace(None)
    }

    fn run_exit_hook(&self, exit_code: i32) {
        let hook = self.exit_hook();
        match hook {
            Some(hook) => {
                tracing::debug!(target: targets::PUMP, exit_code, "quit observed, calling exit hook");
                hook(exit_code);
            }
            None => {
                tracing::debug!(target: targets::PUMP, exit_code, "quit observed, no exit hook installed");
            }
        }
    }

    // =========================================================================
    // Errors
    // =========================================================================

    /// The code of the most recent failure, or [`ErrorCode::None`].
    pub fn last_error(&self) -> ErrorCode {
        self.errors.last()
    }

    fn fail(&self, err: WindowError) -> WindowError {
        self.errors.record(err.code());
        err
    }

    // =========================================================================
    // Routing
    // =========================================================================

    fn route(&self, message: &RawMessage) {
        if self.dispatcher.dispatch(self, message) == Outcome::Default {
            self.backend.default_handling(message);
        }
    }

    /// Dispatch every notification the backend raised synchronously.
    fn flush_sent(&self) {
        while let Some(message) = self.backend.next_sent() {
            self.route(&message);
        }
    }
}

impl fmt::Debug for WindowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowContext")
            .field("config", &self.config)
            .field("classes", &self.classes)
            .field("windows", &self.states.len())
            .field("last_error", &self.errors.last())
            .field("has_exit_hook", &self.exit_hook.borrow().is_some())
            .finish()
    }
}
