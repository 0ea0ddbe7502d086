//! A [`NativeBackend`] on top of winit.
//!
//! winit owns the platform event loop, so this backend drives it in
//! non-blocking steps: whenever the dispatch engine asks for a pending
//! notification and none is queued, the loop is pumped once with a zero
//! timeout and the window events it produced are translated into
//! [`RawMessage`]s.
//!
//! Enabled with the `winit` cargo feature.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::time::Duration;

use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseScrollDelta, TouchPhase, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId};

use crate::backend::{
    NativeBackend, Position, Size, TOUCH_DOWN, TOUCH_MOVE, TOUCH_UP, TouchInput, WindowDescriptor,
    WindowHandle,
};
use crate::class::WindowClass;
use crate::error::BackendError;
use crate::event::MouseButton;
use crate::logging::targets;
use crate::message::{RawMessage, clamp_signed_word, clamp_word, codes};

/// Touch and file-drop payloads waiting to be resolved by the dispatcher.
#[derive(Debug, Default)]
struct Payloads {
    next: usize,
    touches: HashMap<isize, Vec<TouchInput>>,
    drops: HashMap<usize, Vec<String>>,
}

impl Payloads {
    fn next_id(&mut self) -> usize {
        self.next += 1;
        self.next
    }
}

struct NativeWindow {
    window: Window,
    parent: Option<WindowHandle>,
}

#[derive(Default)]
struct Shared {
    classes: HashSet<String>,
    windows: HashMap<WindowHandle, NativeWindow>,
    ids: HashMap<WindowId, WindowHandle>,
    next_handle: u64,
    posted: VecDeque<RawMessage>,
    sent: VecDeque<RawMessage>,
    payloads: Payloads,
}

/// Collects the window events of one pump step.
struct Collector<'a> {
    shared: &'a mut Shared,
}

impl ApplicationHandler for Collector<'_> {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(&window) = self.shared.ids.get(&id) else {
            return;
        };
        if let Some(message) = translate(window, event, &mut self.shared.payloads) {
            self.shared.posted.push_back(message);
        }
    }
}

/// Native backend driving a winit event loop.
pub struct WinitBackend {
    event_loop: RefCell<EventLoop<()>>,
    shared: RefCell<Shared>,
}

impl WinitBackend {
    /// Create the backend and its event loop.
    ///
    /// # Errors
    ///
    /// Fails if winit cannot create an event loop, for example when one
    /// already exists in this process.
    pub fn new() -> Result<Self, BackendError> {
        let event_loop = EventLoop::new().map_err(|e| BackendError::Os(e.to_string()))?;
        Ok(Self {
            event_loop: RefCell::new(event_loop),
            shared: RefCell::new(Shared::default()),
        })
    }

    /// Run one non-blocking step of the winit event loop.
    fn pump_native(&self) {
        let mut shared = self.shared.borrow_mut();
        let mut collector = Collector {
            shared: &mut shared,
        };
        let status = self
            .event_loop
            .borrow_mut()
            .pump_app_events(Some(Duration::ZERO), &mut collector);
        if let PumpStatus::Exit(code) = status {
            tracing::debug!(target: targets::BACKEND, code, "winit event loop exited");
            shared.posted.push_back(RawMessage::quit(code));
        }
    }

    fn with_window(&self, window: WindowHandle, f: impl FnOnce(&Window)) {
        match self.shared.borrow().windows.get(&window) {
            Some(native) => f(&native.window),
            None => tracing::trace!(target: targets::BACKEND, %window, "unknown window ignored"),
        }
    }
}

impl NativeBackend for WinitBackend {
    fn register_class(&self, class: &WindowClass) -> Result<(), BackendError> {
        // winit has no window classes; only remember the name.
        if !self.shared.borrow_mut().classes.insert(class.name().to_string()) {
            return Err(BackendError::ClassExists(class.name().to_string()));
        }
        Ok(())
    }

    fn create_window(&self, descriptor: &WindowDescriptor) -> Result<WindowHandle, BackendError> {
        if !self.shared.borrow().classes.contains(&descriptor.class_name) {
            return Err(BackendError::UnknownClass(descriptor.class_name.clone()));
        }

        let attrs = Window::default_attributes()
            .with_title(descriptor.title.clone().unwrap_or_default())
            .with_inner_size(PhysicalSize::new(
                u32::try_from(descriptor.size.width).unwrap_or(0).max(1),
                u32::try_from(descriptor.size.height).unwrap_or(0).max(1),
            ))
            .with_visible(false);

        #[allow(deprecated)]
        let window = self
            .event_loop
            .borrow()
            .create_window(attrs)
            .map_err(|e| BackendError::Os(e.to_string()))?;

        let mut shared = self.shared.borrow_mut();
        shared.next_handle += 1;
        let handle = WindowHandle::from_raw(shared.next_handle);
        shared.ids.insert(window.id(), handle);
        shared.windows.insert(
            handle,
            NativeWindow {
                window,
                parent: descriptor.parent,
            },
        );
        shared.sent.push_back(RawMessage::create(handle));
        tracing::debug!(target: targets::BACKEND, window = %handle, "winit window created");
        Ok(handle)
    }

    fn destroy_window(&self, window: WindowHandle) {
        let children: Vec<WindowHandle> = {
            let mut shared = self.shared.borrow_mut();
            let Some(native) = shared.windows.remove(&window) else {
                return;
            };
            shared.ids.remove(&native.window.id());
            shared.posted.retain(|message| message.window != Some(window));
            shared.sent.push_back(RawMessage::destroy(window));
            shared
                .windows
                .iter()
                .filter(|(_, child)| child.parent == Some(window))
                .map(|(&handle, _)| handle)
                .collect()
        };
        for child in children {
            self.destroy_window(child);
        }
    }

    fn set_title(&self, window: WindowHandle, title: &str) {
        self.with_window(window, |w| w.set_title(title));
    }

    fn title(&self, window: WindowHandle) -> Option<String> {
        self.shared.borrow().windows.get(&window).map(|n| n.window.title())
    }

    fn set_size(&self, window: WindowHandle, size: Size) {
        self.with_window(window, |w| {
            let requested = PhysicalSize::new(
                u32::try_from(size.width).unwrap_or(0),
                u32::try_from(size.height).unwrap_or(0),
            );
            let _ = w.request_inner_size(requested);
        });
    }

    fn size(&self, window: WindowHandle) -> Option<Size> {
        self.shared.borrow().windows.get(&window).map(|n| {
            let size = n.window.inner_size();
            Size::new(
                i32::try_from(size.width).unwrap_or(i32::MAX),
                i32::try_from(size.height).unwrap_or(i32::MAX),
            )
        })
    }

    fn set_position(&self, window: WindowHandle, position: Position) {
        self.with_window(window, |w| {
            w.set_outer_position(PhysicalPosition::new(position.x, position.y));
        });
    }

    fn position(&self, window: WindowHandle) -> Option<Position> {
        let shared = self.shared.borrow();
        let position = shared.windows.get(&window)?.window.outer_position().ok()?;
        Some(Position::new(position.x, position.y))
    }

    fn show(&self, window: WindowHandle) {
        self.with_window(window, |w| w.set_visible(true));
        self.shared
            .borrow_mut()
            .sent
            .push_back(RawMessage::show_window(window, true));
    }

    fn hide(&self, window: WindowHandle) {
        self.with_window(window, |w| w.set_visible(false));
        self.shared
            .borrow_mut()
            .sent
            .push_back(RawMessage::show_window(window, false));
    }

    fn minimize(&self, window: WindowHandle) {
        self.with_window(window, |w| w.set_minimized(true));
    }

    fn maximize(&self, window: WindowHandle) {
        self.with_window(window, |w| w.set_maximized(true));
    }

    fn peek_message(&self, filter: Option<WindowHandle>) -> Option<RawMessage> {
        let matches =
            |message: &RawMessage| message.window.is_none() || filter.is_none() || message.window == filter;

        if !self.shared.borrow().posted.iter().any(matches) {
            self.pump_native();
        }
        let mut shared = self.shared.borrow_mut();
        let index = shared.posted.iter().position(matches)?;
        shared.posted.remove(index)
    }

    fn next_sent(&self) -> Option<RawMessage> {
        self.shared.borrow_mut().sent.pop_front()
    }

    fn post_quit(&self, exit_code: i32) {
        self.shared
            .borrow_mut()
            .posted
            .push_back(RawMessage::quit(exit_code));
    }

    fn default_handling(&self, message: &RawMessage) {
        let Some(window) = message.window else {
            return;
        };
        match message.code {
            codes::CLOSE => self.destroy_window(window),
            codes::SYS_COMMAND => match message.wparam as u32 & codes::SC_MASK {
                codes::SC_MINIMIZE => self.minimize(window),
                codes::SC_MAXIMIZE => self.maximize(window),
                _ => {}
            },
            codes::DROP_FILES => self.release_drop(message),
            codes::TOUCH => self.close_touch_input(message),
            _ => {}
        }
    }

    fn touch_inputs(&self, message: &RawMessage) -> Option<Vec<TouchInput>> {
        self.shared
            .borrow()
            .payloads
            .touches
            .get(&message.lparam)
            .cloned()
    }

    fn close_touch_input(&self, message: &RawMessage) {
        self.shared
            .borrow_mut()
            .payloads
            .touches
            .remove(&message.lparam);
    }

    fn dropped_files(&self, message: &RawMessage) -> Vec<String> {
        self.shared
            .borrow()
            .payloads
            .drops
            .get(&message.wparam)
            .cloned()
            .unwrap_or_default()
    }

    fn release_drop(&self, message: &RawMessage) {
        self.shared
            .borrow_mut()
            .payloads
            .drops
            .remove(&message.wparam);
    }
}

impl fmt::Debug for WinitBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.borrow();
        f.debug_struct("WinitBackend")
            .field("windows", &shared.windows.len())
            .field("posted", &shared.posted.len())
            .finish()
    }
}

fn map_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Left),
        winit::event::MouseButton::Right => Some(MouseButton::Right),
        winit::event::MouseButton::Middle => Some(MouseButton::Middle),
        winit::event::MouseButton::Back => Some(MouseButton::Extra1),
        winit::event::MouseButton::Forward => Some(MouseButton::Extra2),
        winit::event::MouseButton::Other(_) => None,
    }
}

/// Map a physical key to its Windows virtual-key code.
///
/// Key notifications carry virtual-key codes on every backend. Keys with no
/// virtual-key equivalent are not reported.
fn virtual_key(key: PhysicalKey) -> Option<u32> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    let vk = match code {
        KeyCode::KeyA => 0x41,
        KeyCode::KeyB => 0x42,
        KeyCode::KeyC => 0x43,
        KeyCode::KeyD => 0x44,
        KeyCode::KeyE => 0x45,
        KeyCode::KeyF => 0x46,
        KeyCode::KeyG => 0x47,
        KeyCode::KeyH => 0x48,
        KeyCode::KeyI => 0x49,
        KeyCode::KeyJ => 0x4A,
        KeyCode::KeyK => 0x4B,
        KeyCode::KeyL => 0x4C,
        KeyCode::KeyM => 0x4D,
        KeyCode::KeyN => 0x4E,
        KeyCode::KeyO => 0x4F,
        KeyCode::KeyP => 0x50,
        KeyCode::KeyQ => 0x51,
        KeyCode::KeyR => 0x52,
        KeyCode::KeyS => 0x53,
        KeyCode::KeyT => 0x54,
        KeyCode::KeyU => 0x55,
        KeyCode::KeyV => 0x56,
        KeyCode::KeyW => 0x57,
        KeyCode::KeyX => 0x58,
        KeyCode::KeyY => 0x59,
        KeyCode::KeyZ => 0x5A,
        KeyCode::Digit0 => 0x30,
        KeyCode::Digit1 => 0x31,
        KeyCode::Digit2 => 0x32,
        KeyCode::Digit3 => 0x33,
        KeyCode::Digit4 => 0x34,
        KeyCode::Digit5 => 0x35,
        KeyCode::Digit6 => 0x36,
        KeyCode::Digit7 => 0x37,
        KeyCode::Digit8 => 0x38,
        KeyCode::Digit9 => 0x39,
        KeyCode::Numpad0 => 0x60,
        KeyCode::Numpad1 => 0x61,
        KeyCode::Numpad2 => 0x62,
        KeyCode::Numpad3 => 0x63,
        KeyCode::Numpad4 => 0x64,
        KeyCode::Numpad5 => 0x65,
        KeyCode::Numpad6 => 0x66,
        KeyCode::Numpad7 => 0x67,
        KeyCode::Numpad8 => 0x68,
        KeyCode::Numpad9 => 0x69,
        KeyCode::F1 => 0x70,
        KeyCode::F2 => 0x71,
        KeyCode::F3 => 0x72,
        KeyCode::F4 => 0x73,
        KeyCode::F5 => 0x74,
        KeyCode::F6 => 0x75,
        KeyCode::F7 => 0x76,
        KeyCode::F8 => 0x77,
        KeyCode::F9 => 0x78,
        KeyCode::F10 => 0x79,
        KeyCode::F11 => 0x7A,
        KeyCode::F12 => 0x7B,
        KeyCode::F13 => 0x7C,
        KeyCode::F14 => 0x7D,
        KeyCode::F15 => 0x7E,
        KeyCode::F16 => 0x7F,
        KeyCode::F17 => 0x80,
        KeyCode::F18 => 0x81,
        KeyCode::F19 => 0x82,
        KeyCode::F20 => 0x83,
        KeyCode::F21 => 0x84,
        KeyCode::F22 => 0x85,
        KeyCode::F23 => 0x86,
        KeyCode::F24 => 0x87,
        KeyCode::Backspace => 0x08,
        KeyCode::Tab => 0x09,
        KeyCode::Enter => 0x0D,
        KeyCode::NumpadEnter => 0x0D,
        KeyCode::Pause => 0x13,
        KeyCode::CapsLock => 0x14,
        KeyCode::Escape => 0x1B,
        KeyCode::Space => 0x20,
        KeyCode::PageUp => 0x21,
        KeyCode::PageDown => 0x22,
        KeyCode::End => 0x23,
        KeyCode::Home => 0x24,
        KeyCode::ArrowLeft => 0x25,
        KeyCode::ArrowUp => 0x26,
        KeyCode::ArrowRight => 0x27,
        KeyCode::ArrowDown => 0x28,
        KeyCode::PrintScreen => 0x2C,
        KeyCode::Insert => 0x2D,
        KeyCode::Delete => 0x2E,
        KeyCode::SuperLeft => 0x5B,
        KeyCode::SuperRight => 0x5C,
        KeyCode::ContextMenu => 0x5D,
        KeyCode::NumpadMultiply => 0x6A,
        KeyCode::NumpadAdd => 0x6B,
        KeyCode::NumpadSubtract => 0x6D,
        KeyCode::NumpadDecimal => 0x6E,
        KeyCode::NumpadDivide => 0x6F,
        KeyCode::NumLock => 0x90,
        KeyCode::ScrollLock => 0x91,
        KeyCode::ShiftLeft => 0xA0,
        KeyCode::ShiftRight => 0xA1,
        KeyCode::ControlLeft => 0xA2,
        KeyCode::ControlRight => 0xA3,
        KeyCode::AltLeft => 0xA4,
        KeyCode::AltRight => 0xA5,
        KeyCode::Semicolon => 0xBA,
        KeyCode::Equal => 0xBB,
        KeyCode::Comma => 0xBC,
        KeyCode::Minus => 0xBD,
        KeyCode::Period => 0xBE,
        KeyCode::Slash => 0xBF,
        KeyCode::Backquote => 0xC0,
        KeyCode::BracketLeft => 0xDB,
        KeyCode::Backslash => 0xDC,
        KeyCode::BracketRight => 0xDD,
        KeyCode::Quote => 0xDE,
        _ => return None,
    };
    Some(vk)
}

/// Translate one winit window event into the raw notification vocabulary.
fn translate(window: WindowHandle, event: WindowEvent, payloads: &mut Payloads) -> Option<RawMessage> {
    let message = match event {
        WindowEvent::CloseRequested => RawMessage::close(window),
        WindowEvent::Resized(size) => RawMessage::resize(
            window,
            clamp_word(i32::try_from(size.width).unwrap_or(i32::MAX)),
            clamp_word(i32::try_from(size.height).unwrap_or(i32::MAX)),
        ),
        WindowEvent::Moved(position) => RawMessage::moved(
            window,
            clamp_signed_word(position.x),
            clamp_signed_word(position.y),
        ),
        WindowEvent::Focused(true) => RawMessage::focus(window),
        WindowEvent::Focused(false) => RawMessage::unfocus(window),
        WindowEvent::RedrawRequested => RawMessage::redraw(window),
        WindowEvent::KeyboardInput { event, .. } => {
            let key = virtual_key(event.physical_key)?;
            match event.state {
                ElementState::Pressed => RawMessage::key_down(window, key),
                ElementState::Released => RawMessage::key_up(window, key),
            }
        }
        WindowEvent::CursorMoved { position, .. } => {
            RawMessage::mouse_move(window, position.x as i16, position.y as i16)
        }
        WindowEvent::MouseInput { state, button, .. } => {
            let button = map_button(button)?;
            match state {
                ElementState::Pressed => RawMessage::button_down(window, button),
                ElementState::Released => RawMessage::button_up(window, button),
            }
        }
        WindowEvent::MouseWheel { delta, .. } => {
            let delta = match delta {
                MouseScrollDelta::LineDelta(_, lines) => lines * f32::from(codes::WHEEL_DELTA),
                MouseScrollDelta::PixelDelta(pixels) => pixels.y as f32,
            };
            RawMessage::wheel(window, delta as i16)
        }
        WindowEvent::DroppedFile(path) => {
            let id = payloads.next_id();
            payloads.drops.insert(id, vec![path.display().to_string()]);
            RawMessage::drop_files(window, id)
        }
        WindowEvent::Touch(touch) => {
            let flags = match touch.phase {
                TouchPhase::Started => TOUCH_DOWN,
                TouchPhase::Moved => TOUCH_MOVE,
                TouchPhase::Ended | TouchPhase::Cancelled => TOUCH_UP,
            };
            let input = TouchInput {
                id: touch.id as u32,
                x: (touch.location.x * 100.0) as i32,
                y: (touch.location.y * 100.0) as i32,
                flags,
            };
            let id = payloads.next_id() as isize;
            payloads.touches.insert(id, vec![input]);
            RawMessage::touch(window, 1, id)
        }
        _ => return None,
    };
    Some(message)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    const WINDOW: WindowHandle = WindowHandle::from_raw(1);

    #[test]
    fn test_translate_window_events() {
        let mut payloads = Payloads::default();
        assert_eq!(
            translate(WINDOW, WindowEvent::CloseRequested, &mut payloads),
            Some(RawMessage::close(WINDOW))
        );
        assert_eq!(
            translate(WINDOW, WindowEvent::Focused(false), &mut payloads),
            Some(RawMessage::unfocus(WINDOW))
        );
        assert_eq!(
            translate(WINDOW, WindowEvent::Resized(PhysicalSize::new(640, 480)), &mut payloads),
            Some(RawMessage::resize(WINDOW, 640, 480))
        );
        assert_eq!(
            translate(WINDOW, WindowEvent::Moved(PhysicalPosition::new(-10, 70_000)), &mut payloads),
            Some(RawMessage::moved(WINDOW, -10, i16::MAX))
        );
        assert_eq!(
            translate(WINDOW, WindowEvent::RedrawRequested, &mut payloads),
            Some(RawMessage::redraw(WINDOW))
        );
        assert_eq!(translate(WINDOW, WindowEvent::Destroyed, &mut payloads), None);
    }

    #[test]
    fn test_virtual_key_codes() {
        assert_eq!(virtual_key(PhysicalKey::Code(KeyCode::KeyA)), Some(0x41));
        assert_eq!(virtual_key(PhysicalKey::Code(KeyCode::KeyZ)), Some(0x5A));
        assert_eq!(virtual_key(PhysicalKey::Code(KeyCode::Digit7)), Some(0x37));
        assert_eq!(virtual_key(PhysicalKey::Code(KeyCode::F1)), Some(0x70));
        assert_eq!(virtual_key(PhysicalKey::Code(KeyCode::F24)), Some(0x87));
        assert_eq!(virtual_key(PhysicalKey::Code(KeyCode::Escape)), Some(0x1B));
        assert_eq!(virtual_key(PhysicalKey::Code(KeyCode::ArrowDown)), Some(0x28));
        assert_eq!(virtual_key(PhysicalKey::Code(KeyCode::Numpad3)), Some(0x63));
        assert_eq!(virtual_key(PhysicalKey::Code(KeyCode::Fn)), None);
    }

    #[test]
    fn test_translate_dropped_file() {
        let mut payloads = Payloads::default();
        let message = translate(
            WINDOW,
            WindowEvent::DroppedFile(PathBuf::from("notes.txt")),
            &mut payloads,
        )
        .unwrap();

        assert_eq!(message.code, codes::DROP_FILES);
        assert_eq!(
            payloads.drops.get(&message.wparam),
            Some(&vec!["notes.txt".to_string()])
        );
    }

    #[test]
    fn test_map_button() {
        assert_eq!(map_button(winit::event::MouseButton::Back), Some(MouseButton::Extra1));
        assert_eq!(map_button(winit::event::MouseButton::Forward), Some(MouseButton::Extra2));
        assert_eq!(map_button(winit::event::MouseButton::Other(9)), None);
    }
}
