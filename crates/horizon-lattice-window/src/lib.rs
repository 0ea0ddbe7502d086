//! Callback-based window event dispatch for Horizon Lattice.
//!
//! This crate turns the notification stream of a native window system into
//! typed per-window callbacks and manages the lifetime of the state attached
//! to every window:
//!
//! - **Window Context**: owner of the backend, the one-time class
//!   registration, the last-error slot and the exit hook
//! - **Window State**: per-window event table, running flag and user data,
//!   allocated on creation and released on destruction
//! - **Event Table**: optional callback slots for window, keyboard, mouse and
//!   pen events
//! - **Dispatcher**: decodes raw notification parameters and invokes the
//!   matching slot, or falls back to default native handling
//! - **Message Pump**: non-blocking drain of pending notifications with
//!   quit detection
//! - **Backends**: an in-memory [`HeadlessBackend`], and a winit backend
//!   behind the `winit` feature
//!
//! # Example
//!
//! ```
//! use horizon_lattice_window::{HeadlessBackend, WindowContext};
//!
//! let backend = HeadlessBackend::new();
//! let ctx = WindowContext::new(backend.clone());
//!
//! let window = ctx.create(400, 100, Some("Window 1"), None).unwrap();
//! let state = ctx.state(window).unwrap();
//!
//! state.event.window.maximize.set(|ctx, window, _| {
//!     ctx.set_title(window, "Maximized Window");
//! });
//! state.event.window.close.set(|ctx, _, state| {
//!     state.set_running(false);
//!     ctx.request_exit(0);
//! });
//!
//! backend.post_maximize(window);
//! backend.post_close(window);
//! while state.is_running() {
//!     ctx.pump(None);
//! }
//! assert_eq!(ctx.title(window).as_deref(), Some("Maximized Window"));
//! ```
//!
//! # Errors
//!
//! ```
//! use horizon_lattice_window::{ErrorCode, HeadlessBackend, WindowContext, error_message};
//!
//! let backend = HeadlessBackend::new();
//! backend.set_fail_window_creation(true);
//! let ctx = WindowContext::new(backend);
//!
//! assert!(ctx.create(100, 100, None, None).is_err());
//! assert_eq!(ctx.last_error(), ErrorCode::CreateWindowFailed);
//! assert_eq!(error_message(ctx.last_error().as_raw()), "Failed to create window");
//! ```

mod backend;
mod class;
mod config;
mod context;
mod dispatch;
mod error;
mod event;
pub mod headless;
pub mod logging;
pub mod message;
mod state;
#[cfg(all(
    feature = "winit",
    any(target_os = "windows", target_os = "macos", target_os = "linux")
))]
mod winit_backend;

pub use backend::{
    NativeBackend, PenInfo, Position, Size, TOUCH_DOWN, TOUCH_MOVE, TOUCH_UP, TouchInput,
    WindowDescriptor, WindowHandle,
};
pub use class::WindowClass;
pub use config::{ContextBuilder, ContextConfig, DEFAULT_CLASS_NAME, DEFAULT_MAX_TOUCH_POINTS};
pub use context::{ExitHook, WindowContext};
pub use error::{
    BackendError, ErrorCode, Result, UNKNOWN_ERROR_MESSAGE, WindowError, error_message,
};
pub use event::{
    ButtonSlot, EventTable, FileDropSlot, KeySlot, KeyboardEvents, MouseButton, MouseEvents,
    PairSlot, PenSample, PenSlot, TouchPoint, TouchSlot, WheelSlot, WindowEvents, WindowSlot,
};
pub use headless::{DEFAULT_HANDLED_CAPACITY, HeadlessBackend, Placement};
pub use message::{MessageKind, RawMessage, codes};
pub use state::WindowState;
#[cfg(all(
    feature = "winit",
    any(target_os = "windows", target_os = "macos", target_os = "linux")
))]
pub use winit_backend::WinitBackend;
