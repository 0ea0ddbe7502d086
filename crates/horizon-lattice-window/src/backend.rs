//! The native window backend seam.
//!
//! The dispatch engine never talks to a window system directly. Everything it
//! needs (creating and destroying windows, geometry and title pass-throughs,
//! reading pending notifications, resolving touch/pen/drop payloads) goes
//! through [`NativeBackend`].
//!
//! Backends report two kinds of notifications:
//!
//! - **posted** notifications sit in a queue until [`NativeBackend::peek_message`]
//!   removes them during a pump;
//! - **sent** notifications are raised synchronously by a backend call (for
//!   example the creation notification raised inside
//!   [`NativeBackend::create_window`]). The context drains them through
//!   [`NativeBackend::next_sent`] right after every backend call.

use std::fmt;

use crate::class::WindowClass;
use crate::error::BackendError;
use crate::message::RawMessage;

/// Opaque, non-owning reference to a native window.
///
/// The handle is valid from successful creation until its destruction
/// notification has been processed. Using it afterwards is a logic error;
/// backends ignore operations on unknown handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(u64);

impl WindowHandle {
    /// Wrap a backend-specific raw window identifier.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The backend-specific raw window identifier.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Window size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Window position in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Everything the backend needs to create a native window.
///
/// Windows are always created hidden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowDescriptor {
    /// Name of the registered window class.
    pub class_name: String,
    /// Requested size.
    pub size: Size,
    /// Optional initial title.
    pub title: Option<String>,
    /// Optional parent window.
    pub parent: Option<WindowHandle>,
}

/// Touch point flag: the contact moved.
pub const TOUCH_MOVE: u32 = 0x0001;
/// Touch point flag: the contact started.
pub const TOUCH_DOWN: u32 = 0x0002;
/// Touch point flag: the contact ended.
pub const TOUCH_UP: u32 = 0x0004;

/// One entry of a native touch payload.
///
/// Coordinates are expressed in hundredths of a pixel, the way the native
/// touch API reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchInput {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    /// Combination of [`TOUCH_MOVE`], [`TOUCH_DOWN`] and [`TOUCH_UP`].
    pub flags: u32,
}

impl TouchInput {
    /// Build an input from whole-pixel coordinates.
    pub fn from_pixels(id: u32, x: i32, y: i32, flags: u32) -> Self {
        Self {
            id,
            x: x * 100,
            y: y * 100,
            flags,
        }
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag == flag
    }
}

/// Pen state queried from the backend for a pointer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PenInfo {
    /// Pressure in the range 0..=1024.
    pub pressure: u32,
    pub tilt_x: i32,
    pub tilt_y: i32,
}

/// Capability interface over a native window system.
///
/// All methods take `&self`: a backend is shared with user callbacks that run
/// while a dispatch is in progress, so implementations keep their own state
/// behind interior mutability and must never hold a borrow across a return.
pub trait NativeBackend {
    /// Register the window class used for every window of a context.
    fn register_class(&self, class: &WindowClass) -> Result<(), BackendError>;

    /// Create a hidden native window.
    ///
    /// On success the backend must raise a creation notification as a sent
    /// notification before returning.
    fn create_window(&self, descriptor: &WindowDescriptor) -> Result<WindowHandle, BackendError>;

    /// Destroy a native window, raising its destruction notification as a
    /// sent notification.
    fn destroy_window(&self, window: WindowHandle);

    fn set_title(&self, window: WindowHandle, title: &str);
    fn title(&self, window: WindowHandle) -> Option<String>;
    fn set_size(&self, window: WindowHandle, size: Size);
    fn size(&self, window: WindowHandle) -> Option<Size>;
    fn set_position(&self, window: WindowHandle, position: Position);
    fn position(&self, window: WindowHandle) -> Option<Position>;
    fn show(&self, window: WindowHandle);
    fn hide(&self, window: WindowHandle);
    fn minimize(&self, window: WindowHandle);
    fn maximize(&self, window: WindowHandle);

    /// Remove and return the next posted notification.
    ///
    /// With a filter only notifications for that window (and thread-wide
    /// notifications such as quit) are returned. Must not block.
    fn peek_message(&self, filter: Option<WindowHandle>) -> Option<RawMessage>;

    /// Remove and return the next sent notification, if any.
    fn next_sent(&self) -> Option<RawMessage>;

    /// Post a thread-wide quit notification carrying `exit_code`.
    fn post_quit(&self, exit_code: i32);

    /// Default native processing for a notification nobody handled.
    fn default_handling(&self, message: &RawMessage);

    /// Query pen state for a pointer id.
    fn pen_info(&self, _pointer_id: u32) -> Option<PenInfo> {
        None
    }

    /// Resolve the touch payload carried by a touch notification.
    fn touch_inputs(&self, _message: &RawMessage) -> Option<Vec<TouchInput>> {
        None
    }

    /// Release the touch payload carried by a touch notification.
    fn close_touch_input(&self, _message: &RawMessage) {}

    /// Resolve the paths carried by a file-drop notification.
    fn dropped_files(&self, _message: &RawMessage) -> Vec<String> {
        Vec::new()
    }

    /// Release the payload carried by a file-drop notification.
    fn release_drop(&self, _message: &RawMessage) {}
}
