//! The per-window event table.
//!
//! An [`EventTable`] is a fixed set of optional callback slots grouped by
//! source: window lifecycle, keyboard, mouse and pen. A slot is either empty
//! (the notification falls through to default native handling) or holds
//! exactly one callback.
//!
//! Slots use interior mutability so that a callback can replace any slot of
//! its own window, including the one that is currently running:
//!
//! ```
//! use horizon_lattice_window::{HeadlessBackend, WindowContext, WindowHandle, WindowState};
//!
//! fn first(_: &WindowContext, _: WindowHandle, state: &WindowState) {
//!     state.event.window.redraw.set(second);
//! }
//!
//! fn second(_: &WindowContext, _: WindowHandle, state: &WindowState) {
//!     state.event.window.redraw.set(first);
//! }
//!
//! let ctx = WindowContext::new(HeadlessBackend::new());
//! let window = ctx.create(320, 240, None, None).unwrap();
//! ctx.state(window).unwrap().event.window.redraw.set(first);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::backend::WindowHandle;
use crate::context::WindowContext;
use crate::state::WindowState;

/// Normalized mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MouseButton {
    Left = 1,
    Right = 2,
    Middle = 3,
    Extra1 = 4,
    Extra2 = 5,
}

impl MouseButton {
    pub fn as_raw(self) -> u8 {
        self as u8
    }
}

/// One normalized touch contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TouchPoint {
    /// Contact identifier, stable while the contact lasts.
    pub id: u32,
    /// Position in whole pixels.
    pub x: i32,
    pub y: i32,
    /// Movement since the previous report of the same contact.
    pub dx: i32,
    pub dy: i32,
}

/// Normalized pen report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PenSample {
    pub pointer_id: u32,
    /// Pressure in the range 0..=1024.
    pub pressure: i32,
    pub tilt_x: i32,
    pub tilt_y: i32,
}

macro_rules! callback_slot {
    ($(#[$meta:meta])* $name:ident $(, $arg:ty)*) => {
        $(#[$meta])*
        #[derive(Default)]
        pub struct $name {
            callback: RefCell<Option<Rc<dyn Fn(&WindowContext, WindowHandle, &WindowState $(, $arg)*)>>>,
        }

        impl $name {
            /// Install `callback`, replacing any previous one.
            pub fn set<F>(&self, callback: F)
            where
                F: Fn(&WindowContext, WindowHandle, &WindowState $(, $arg)*) + 'static,
            {
                let previous = self.callback.replace(Some(Rc::new(callback)));
                drop(previous);
            }

            /// Empty the slot.
            pub fn clear(&self) {
                let previous = self.callback.replace(None);
                drop(previous);
            }

            pub fn is_set(&self) -> bool {
                self.callback.borrow().is_some()
            }

            /// Snapshot of the current callback.
            ///
            /// The snapshot stays valid even if the slot is replaced while it runs.
            pub(crate) fn current(
                &self,
            ) -> Option<Rc<dyn Fn(&WindowContext, WindowHandle, &WindowState $(, $arg)*)>> {
                self.callback.borrow().clone()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("set", &self.is_set())
                    .finish()
            }
        }
    };
}

callback_slot!(
    /// Slot for notifications without parameters.
    WindowSlot
);
callback_slot!(
    /// Slot for notifications carrying an `(x, y)` or `(width, height)` pair.
    PairSlot, i32, i32
);
callback_slot!(
    /// Slot for key notifications; receives the virtual key code.
    KeySlot, i32
);
callback_slot!(
    /// Slot for mouse button notifications.
    ButtonSlot, MouseButton
);
callback_slot!(
    /// Slot for wheel notifications; receives the signed wheel delta.
    WheelSlot, i32
);
callback_slot!(
    /// Slot for file drops; invoked once per dropped path.
    FileDropSlot, &str
);
callback_slot!(
    /// Slot for touch notifications; invoked once per contact.
    TouchSlot, &TouchPoint
);
callback_slot!(
    /// Slot for pen updates.
    PenSlot, &PenSample
);

/// Window lifecycle callbacks.
#[derive(Debug, Default)]
pub struct WindowEvents {
    /// The window is being destroyed; runs before its state is released.
    pub destroy: WindowSlot,
    /// The user or the system asked the window to close.
    pub close: WindowSlot,
    /// The client area changed size; receives `(width, height)`.
    pub resize: PairSlot,
    /// The window moved; receives `(x, y)`.
    pub moved: PairSlot,
    pub focus: WindowSlot,
    pub unfocus: WindowSlot,
    /// The window needs to be redrawn.
    pub redraw: WindowSlot,
    pub minimize: WindowSlot,
    pub maximize: WindowSlot,
    pub show: WindowSlot,
    pub hide: WindowSlot,
    pub file_drop: FileDropSlot,
    pub touch: TouchSlot,
}

/// Keyboard callbacks.
#[derive(Debug, Default)]
pub struct KeyboardEvents {
    pub down: KeySlot,
    pub up: KeySlot,
}

/// Mouse callbacks.
#[derive(Debug, Default)]
pub struct MouseEvents {
    /// The cursor moved in the client area; receives `(x, y)`.
    pub moved: PairSlot,
    pub down: ButtonSlot,
    pub up: ButtonSlot,
    pub wheel: WheelSlot,
}

/// All callback slots of one window. Every slot starts empty.
#[derive(Debug, Default)]
pub struct EventTable {
    pub window: WindowEvents,
    pub key: KeyboardEvents,
    pub mouse: MouseEvents,
    pub pen: PenSlot,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty every slot.
    pub fn reset(&self) {
        let w = &self.window;
        for slot in [
            &w.destroy, &w.close, &w.focus, &w.unfocus, &w.redraw, &w.minimize, &w.maximize,
            &w.show, &w.hide,
        ] {
            slot.clear();
        }
        w.resize.clear();
        w.moved.clear();
        w.file_drop.clear();
        w.touch.clear();

        self.key.down.clear();
        self.key.up.clear();

        self.mouse.moved.clear();
        self.mouse.down.clear();
        self.mouse.up.clear();
        self.mouse.wheel.clear();

        self.pen.clear();
    }

    /// Number of slots that currently hold a callback.
    pub fn installed(&self) -> usize {
        let w = &self.window;
        let simple = [
            &w.destroy, &w.close, &w.focus, &w.unfocus, &w.redraw, &w.minimize, &w.maximize,
            &w.show, &w.hide,
        ]
        .into_iter()
        .filter(|slot| slot.is_set())
        .count();

        let others = [
            w.resize.is_set(),
            w.moved.is_set(),
            w.file_drop.is_set(),
            w.touch.is_set(),
            self.key.down.is_set(),
            self.key.up.is_set(),
            self.mouse.moved.is_set(),
            self.mouse.down.is_set(),
            self.mouse.up.is_set(),
            self.mouse.wheel.is_set(),
            self.pen.is_set(),
        ]
        .into_iter()
        .filter(|&set| set)
        .count();

        simple + others
    }

    /// Whether every slot is empty.
    pub fn is_empty(&self) -> bool {
        self.installed() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_is_empty() {
        let table = EventTable::new();
        assert!(table.is_empty());
        assert!(!table.window.close.is_set());
        assert!(!table.pen.is_set());
    }

    #[test]
    fn test_set_clear_and_reset() {
        let table = EventTable::new();
        table.window.close.set(|_, _, _| {});
        table.window.resize.set(|_, _, _, _, _| {});
        table.key.down.set(|_, _, _, _| {});
        table.mouse.down.set(|_, _, _, _| {});
        table.window.file_drop.set(|_, _, _, _path| {});
        assert_eq!(table.installed(), 5);

        table.window.close.clear();
        assert_eq!(table.installed(), 4);

        table.reset();
        assert!(table.is_empty());
    }

    #[test]
    fn test_snapshot_survives_replacement() {
        let table = EventTable::new();
        table.window.redraw.set(|_, _, _| {});
        let snapshot = table.window.redraw.current();
        table.window.redraw.clear();
        assert!(snapshot.is_some());
        assert!(table.window.redraw.current().is_none());
    }

    #[test]
    fn test_mouse_button_values() {
        assert_eq!(MouseButton::Left.as_raw(), 1);
        assert_eq!(MouseButton::Right.as_raw(), 2);
        assert_eq!(MouseButton::Middle.as_raw(), 3);
        assert_eq!(MouseButton::Extra1.as_raw(), 4);
        assert_eq!(MouseButton::Extra2.as_raw(), 5);
    }
}
