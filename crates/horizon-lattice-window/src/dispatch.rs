//! Routing of native notifications to per-window callbacks.
//!
//! The [`Dispatcher`] holds a lookup table keyed by [`MessageKind`]. Each
//! entry is a handler that decodes the raw parameters of that kind, looks up
//! the window's [`WindowState`](crate::WindowState), and invokes the matching
//! slot of its event table. A handler reports [`Outcome::Default`] when no
//! callback ran, in which case the context asks the backend for default
//! native handling.

use std::collections::HashMap;

use crate::backend::WindowHandle;
use crate::context::WindowContext;
use crate::error::ErrorCode;
use crate::event::{MouseButton, PenSample};
use crate::logging::targets;
use crate::message::{MessageKind, RawMessage, codes, hiword, loword, signed_pair, unsigned_pair};
use crate::state::StateAllocError;

/// Result of dispatching one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// A callback consumed the notification.
    Handled,
    /// Nothing consumed it; default native handling applies.
    Default,
}

type Handler = fn(&WindowContext, &RawMessage, WindowHandle) -> Outcome;

/// Invoke one slot of the window's event table.
///
/// Falls back to [`Outcome::Default`] when the window has no state or the
/// slot is empty. The callback is snapshotted before it runs.
macro_rules! fire {
    ($ctx:expr, $window:expr, |$state:ident| $slot:expr $(, $arg:expr)*) => {{
        let Some($state) = $ctx.states.get($window) else {
            return Outcome::Default;
        };
        let Some(callback) = $slot.current() else {
            return Outcome::Default;
        };
        callback($ctx, $window, &$state $(, $arg)*);
        Outcome::Handled
    }};
}

const ROUTES: &[(MessageKind, Handler)] = &[
    (MessageKind::Create, on_create),
    (MessageKind::Destroy, on_destroy),
    (MessageKind::Close, on_close),
    (MessageKind::Size, on_size),
    (MessageKind::Move, on_move),
    (MessageKind::SetFocus, on_focus),
    (MessageKind::KillFocus, on_unfocus),
    (MessageKind::Paint, on_paint),
    (MessageKind::KeyDown, on_key_down),
    (MessageKind::KeyUp, on_key_up),
    (MessageKind::MouseMove, on_mouse_move),
    (MessageKind::LeftButtonDown, on_left_down),
    (MessageKind::LeftButtonUp, on_left_up),
    (MessageKind::RightButtonDown, on_right_down),
    (MessageKind::RightButtonUp, on_right_up),
    (MessageKind::MiddleButtonDown, on_middle_down),
    (MessageKind::MiddleButtonUp, on_middle_up),
    (MessageKind::ExtraButtonDown, on_extra_down),
    (MessageKind::ExtraButtonUp, on_extra_up),
    (MessageKind::MouseWheel, on_wheel),
    (MessageKind::SysCommand, on_sys_command),
    (MessageKind::ShowWindow, on_show_window),
    (MessageKind::DropFiles, on_drop_files),
    (MessageKind::Touch, on_touch),
    (MessageKind::PointerUpdate, on_pointer_update),
];

/// Lookup table from notification kind to handler.
pub(crate) struct Dispatcher {
    routes: HashMap<MessageKind, Handler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            routes: ROUTES.iter().copied().collect(),
        }
    }

    #[cfg(test)]
    pub fn handles(&self, kind: MessageKind) -> bool {
        self.routes.contains_key(&kind)
    }

    /// Route `message` to the callback it concerns.
    ///
    /// Quit notifications are never routed here; the pump consumes them.
    pub fn dispatch(&self, ctx: &WindowContext, message: &RawMessage) -> Outcome {
        let Some(kind) = message.kind() else {
            tracing::trace!(target: targets::DISPATCH, code = message.code, "unknown notification");
            return Outcome::Default;
        };
        let Some(window) = message.window else {
            return Outcome::Default;
        };
        let Some(handler) = self.routes.get(&kind) else {
            return Outcome::Default;
        };

        let outcome = handler(ctx, message, window);
        tracing::trace!(target: targets::DISPATCH, ?kind, %window, ?outcome, "dispatched");
        outcome
    }
}

fn on_create(ctx: &WindowContext, _: &RawMessage, window: WindowHandle) -> Outcome {
    match ctx.states.allocate(window) {
        Ok(_) => tracing::debug!(target: targets::DISPATCH, %window, "window state allocated"),
        Err(StateAllocError::AlreadyAttached(_)) => {
            tracing::warn!(target: targets::DISPATCH, %window, "duplicate creation notification ignored");
        }
        Err(err) => {
            tracing::warn!(target: targets::DISPATCH, %window, %err, "window state allocation failed");
            ctx.errors.record(ErrorCode::AllocateStateFailed);
            ctx.backend().destroy_window(window);
        }
    }
    Outcome::Handled
}

fn on_destroy(ctx: &WindowContext, _: &RawMessage, window: WindowHandle) -> Outcome {
    let outcome = match ctx.states.get(window) {
        Some(state) => match state.event.window.destroy.current() {
            Some(callback) => {
                callback(ctx, window, &state);
                Outcome::Handled
            }
            None => Outcome::Default,
        },
        None => Outcome::Default,
    };

    // Released whether or not a destroy callback ran. Emptying the state
    // first frees it even while callbacks or callers still hold it.
    if let Some(state) = ctx.states.release(window) {
        state.clear();
    }
    outcome
}

fn on_close(ctx: &WindowContext, _: &RawMessage, window: WindowHandle) -> Outcome {
    fire!(ctx, window, |state| state.event.window.close)
}

fn on_size(ctx: &WindowContext, message: &RawMessage, window: WindowHandle) -> Outcome {
    let (width, height) = unsigned_pair(message.lparam);
    fire!(ctx, window, |state| state.event.window.resize, width, height)
}

fn on_move(ctx: &WindowContext, message: &RawMessage, window: WindowHandle) -> Outcome {
    let (x, y) = signed_pair(message.lparam);
    fire!(ctx, window, |state| state.event.window.moved, x, y)
}

fn on_focus(ctx: &WindowContext, _: &RawMessage, window: WindowHandle) -> Outcome {
    fire!(ctx, window, |state| state.event.window.focus)
}

fn on_unfocus(ctx: &WindowContext, _: &RawMessage, window: WindowHandle) -> Outcome {
    fire!(ctx, window, |state| state.event.window.unfocus)
}

fn on_paint(ctx: &WindowContext, _: &RawMessage, window: WindowHandle) -> Outcome {
    fire!(ctx, window, |state| state.event.window.redraw)
}

fn on_key_down(ctx: &WindowContext, message: &RawMessage, window: WindowHandle) -> Outcome {
    fire!(ctx, window, |state| state.event.key.down, message.wparam as i32)
}

fn on_key_up(ctx: &WindowContext, message: &RawMessage, window: WindowHandle) -> Outcome {
    fire!(ctx, window, |state| state.event.key.up, message.wparam as i32)
}

fn on_mouse_move(ctx: &WindowContext, message: &RawMessage, window: WindowHandle) -> Outcome {
    let (x, y) = signed_pair(message.lparam);
    fire!(ctx, window, |state| state.event.mouse.moved, x, y)
}

fn button_down(ctx: &WindowContext, window: WindowHandle, button: MouseButton) -> Outcome {
    fire!(ctx, window, |state| state.event.mouse.down, button)
}

fn button_up(ctx: &WindowContext, window: WindowHandle, button: MouseButton) -> Outcome {
    fire!(ctx, window, |state| state.event.mouse.up, button)
}

/// Which extra button an extra-button notification refers to.
fn extra_button(message: &RawMessage) -> MouseButton {
    if hiword(message.wparam) == codes::XBUTTON1 {
        MouseButton::Extra1
    } else {
        MouseButton::Extra2
    }
}

fn on_left_down(ctx: &WindowContext, _: &RawMessage, window: WindowHandle) -> Outcome {
    button_down(ctx, window, MouseButton::Left)
}

fn on_left_up(ctx: &WindowContext, _: &RawMessage, window: WindowHandle) -> Outcome {
    button_up(ctx, window, MouseButton::Left)
}

fn on_right_down(ctx: &WindowContext, _: &RawMessage, window: WindowHandle) -> Outcome {
    button_down(ctx, window, MouseButton::Right)
}

fn on_right_up(ctx: &WindowContext, _: &RawMessage, window: WindowHandle) -> Outcome {
    button_up(ctx, window, MouseButton::Right)
}

fn on_middle_down(ctx: &WindowContext, _: &RawMessage, window: WindowHandle) -> Outcome {
    button_down(ctx, window, MouseButton::Middle)
}

fn on_middle_up(ctx: &WindowContext, _: &RawMessage, window: WindowHandle) -> Outcome {
    button_up(ctx, window, MouseButton::Middle)
}

fn on_extra_down(ctx: &WindowContext, message: &RawMessage, window: WindowHandle) -> Outcome {
    button_down(ctx, window, extra_button(message))
}

fn on_extra_up(ctx: &WindowContext, message: &RawMessage, window: WindowHandle) -> Outcome {
    button_up(ctx, window, extra_button(message))
}

fn on_wheel(ctx: &WindowContext, message: &RawMessage, window: WindowHandle) -> Outcome {
    let delta = i32::from(hiword(message.wparam) as i16);
    fire!(ctx, window, |state| state.event.mouse.wheel, delta)
}

fn on_sys_command(ctx: &WindowContext, message: &RawMessage, window: WindowHandle) -> Outcome {
    match message.wparam as u32 & codes::SC_MASK {
        codes::SC_MINIMIZE => fire!(ctx, window, |state| state.event.window.minimize),
        codes::SC_MAXIMIZE => fire!(ctx, window, |state| state.event.window.maximize),
        _ => Outcome::Default,
    }
}

fn on_show_window(ctx: &WindowContext, message: &RawMessage, window: WindowHandle) -> Outcome {
    if message.wparam != 0 {
        fire!(ctx, window, |state| state.event.window.show)
    } else {
        fire!(ctx, window, |state| state.event.window.hide)
    }
}

fn on_drop_files(ctx: &WindowContext, message: &RawMessage, window: WindowHandle) -> Outcome {
    let Some(state) = ctx.states.get(window) else {
        return Outcome::Default;
    };
    let Some(callback) = state.event.window.file_drop.current() else {
        return Outcome::Default;
    };

    let paths = ctx.backend().dropped_files(message);
    tracing::debug!(target: targets::DISPATCH, %window, count = paths.len(), "files dropped");
    for path in &paths {
        callback(ctx, window, &state, path);
    }
    ctx.backend().release_drop(message);
    Outcome::Handled
}

fn on_touch(ctx: &WindowContext, message: &RawMessage, window: WindowHandle) -> Outcome {
    let Some(state) = ctx.states.get(window) else {
        return Outcome::Default;
    };
    let Some(callback) = state.event.window.touch.current() else {
        return Outcome::Default;
    };
    let Some(inputs) = ctx.backend().touch_inputs(message) else {
        tracing::warn!(target: targets::DISPATCH, %window, "touch notification without payload");
        return Outcome::Default;
    };

    let reported = usize::from(loword(message.wparam));
    let count = reported.min(ctx.config().max_touch_points);
    for input in inputs.iter().take(count) {
        let point = state.track_touch(input);
        callback(ctx, window, &state, &point);
    }
    ctx.backend().close_touch_input(message);
    Outcome::Handled
}

fn on_pointer_update(ctx: &WindowContext, message: &RawMessage, window: WindowHandle) -> Outcome {
    let Some(state) = ctx.states.get(window) else {
        return Outcome::Default;
    };
    let Some(callback) = state.event.pen.current() else {
        return Outcome::Default;
    };

    let pointer_id = u32::from(loword(message.wparam));
    match ctx.backend().pen_info(pointer_id) {
        Some(info) => {
            let sample = PenSample {
                pointer_id,
                pressure: i32::try_from(info.pressure).unwrap_or(i32::MAX),
                tilt_x: info.tilt_x,
                tilt_y: info.tilt_y,
            };
            callback(ctx, window, &state, &sample);
        }
        None => {
            tracing::trace!(target: targets::DISPATCH, %window, pointer_id, "no pen info for pointer");
        }
    }
    Outcome::Handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessBackend;

    #[test]
    fn test_every_window_kind_is_routed() {
        let dispatcher = Dispatcher::new();
        for kind in MessageKind::all() {
            assert_eq!(dispatcher.handles(kind), kind != MessageKind::Quit, "{kind:?}");
        }
    }

    #[test]
    fn test_unknown_and_thread_wide_messages_default() {
        let ctx = WindowContext::new(HeadlessBackend::new());
        let dispatcher = Dispatcher::new();
        let window = ctx.create(10, 10, None, None).unwrap();

        let unknown = RawMessage::new(Some(window), 0x7FFF, 0, 0);
        assert_eq!(dispatcher.dispatch(&ctx, &unknown), Outcome::Default);
        assert_eq!(dispatcher.dispatch(&ctx, &RawMessage::quit(0)), Outcome::Default);
    }

    #[test]
    fn test_message_without_state_defaults() {
        let ctx = WindowContext::new(HeadlessBackend::new());
        let dispatcher = Dispatcher::new();
        let stranger = WindowHandle::from_raw(0xdead);
        assert_eq!(
            dispatcher.dispatch(&ctx, &RawMessage::close(stranger)),
            Outcome::Default
        );
        assert_eq!(
            dispatcher.dispatch(&ctx, &RawMessage::destroy(stranger)),
            Outcome::Default
        );
    }

    #[test]
    fn test_empty_slot_defaults_and_set_slot_handles() {
        let ctx = WindowContext::new(HeadlessBackend::new());
        let dispatcher = Dispatcher::new();
        let window = ctx.create(10, 10, None, None).unwrap();
        let redraw = RawMessage::redraw(window);

        assert_eq!(dispatcher.dispatch(&ctx, &redraw), Outcome::Default);
        ctx.state(window).unwrap().event.window.redraw.set(|_, _, _| {});
        assert_eq!(dispatcher.dispatch(&ctx, &redraw), Outcome::Handled);
    }

    #[test]
    fn test_unrelated_system_command_defaults() {
        let ctx = WindowContext::new(HeadlessBackend::new());
        let dispatcher = Dispatcher::new();
        let window = ctx.create(10, 10, None, None).unwrap();
        let state = ctx.state(window).unwrap();
        state.event.window.minimize.set(|_, _, _| {});
        state.event.window.maximize.set(|_, _, _| {});

        let restore = RawMessage::system_command(window, codes::SC_RESTORE);
        assert_eq!(dispatcher.dispatch(&ctx, &restore), Outcome::Default);

        // Low four bits are reserved and ignored.
        let minimize = RawMessage::system_command(window, codes::SC_MINIMIZE | 0x2);
        assert_eq!(dispatcher.dispatch(&ctx, &minimize), Outcome::Handled);
    }
}
