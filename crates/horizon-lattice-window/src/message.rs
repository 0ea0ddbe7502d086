//! Raw native notifications.
//!
//! A [`RawMessage`] is a notification exactly as a native window system
//! delivers it: a numeric code plus two untyped parameters. The values in
//! [`codes`] follow the Win32 message numbering, which every backend uses as
//! the common vocabulary. The dispatcher decodes the parameters; backends use
//! the constructors here to encode them.

use crate::backend::WindowHandle;
use crate::event::MouseButton;

/// Native notification codes.
pub mod codes {
    pub const CREATE: u32 = 0x0001;
    pub const DESTROY: u32 = 0x0002;
    pub const MOVE: u32 = 0x0003;
    pub const SIZE: u32 = 0x0005;
    pub const SET_FOCUS: u32 = 0x0007;
    pub const KILL_FOCUS: u32 = 0x0008;
    pub const PAINT: u32 = 0x000F;
    pub const CLOSE: u32 = 0x0010;
    pub const QUIT: u32 = 0x0012;
    pub const SHOW_WINDOW: u32 = 0x0018;
    pub const KEY_DOWN: u32 = 0x0100;
    pub const KEY_UP: u32 = 0x0101;
    pub const SYS_COMMAND: u32 = 0x0112;
    pub const MOUSE_MOVE: u32 = 0x0200;
    pub const LBUTTON_DOWN: u32 = 0x0201;
    pub const LBUTTON_UP: u32 = 0x0202;
    pub const RBUTTON_DOWN: u32 = 0x0204;
    pub const RBUTTON_UP: u32 = 0x0205;
    pub const MBUTTON_DOWN: u32 = 0x0207;
    pub const MBUTTON_UP: u32 = 0x0208;
    pub const MOUSE_WHEEL: u32 = 0x020A;
    pub const XBUTTON_DOWN: u32 = 0x020B;
    pub const XBUTTON_UP: u32 = 0x020C;
    pub const DROP_FILES: u32 = 0x0233;
    pub const TOUCH: u32 = 0x0240;
    pub const POINTER_UPDATE: u32 = 0x0245;

    /// System command subtypes carried by [`SYS_COMMAND`].
    pub const SC_MINIMIZE: u32 = 0xF020;
    pub const SC_MAXIMIZE: u32 = 0xF030;
    pub const SC_CLOSE: u32 = 0xF060;
    pub const SC_RESTORE: u32 = 0xF120;

    /// The low four bits of a system command are reserved by the system.
    pub const SC_MASK: u32 = 0xFFF0;

    /// Extra button selectors carried in the high word of an x-button message.
    pub const XBUTTON1: u16 = 0x0001;
    pub const XBUTTON2: u16 = 0x0002;

    /// One wheel notch.
    pub const WHEEL_DELTA: i16 = 120;
}

/// Low 16 bits of a parameter.
pub const fn loword(value: usize) -> u16 {
    (value & 0xFFFF) as u16
}

/// Bits 16..32 of a parameter.
pub const fn hiword(value: usize) -> u16 {
    ((value >> 16) & 0xFFFF) as u16
}

/// Pack two words into a parameter.
pub const fn make_param(low: u16, high: u16) -> usize {
    ((high as usize) << 16) | low as usize
}

/// Decode an unsigned width/height pair.
pub fn unsigned_pair(lparam: isize) -> (i32, i32) {
    let bits = lparam as usize;
    (i32::from(loword(bits)), i32::from(hiword(bits)))
}

/// Decode a signed x/y pair.
pub fn signed_pair(lparam: isize) -> (i32, i32) {
    let bits = lparam as usize;
    (
        i32::from(loword(bits) as i16),
        i32::from(hiword(bits) as i16),
    )
}

/// Clamp a pixel extent into an unsigned parameter word.
pub(crate) fn clamp_word(value: i32) -> u16 {
    u16::try_from(value.max(0)).unwrap_or(u16::MAX)
}

/// Clamp a signed coordinate into a parameter word.
pub(crate) fn clamp_signed_word(value: i32) -> i16 {
    i16::try_from(value).unwrap_or(if value < 0 { i16::MIN } else { i16::MAX })
}

/// A native notification as reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMessage {
    /// Target window, `None` for thread-wide notifications.
    pub window: Option<WindowHandle>,
    pub code: u32,
    pub wparam: usize,
    pub lparam: isize,
}

impl RawMessage {
    pub const fn new(window: Option<WindowHandle>, code: u32, wparam: usize, lparam: isize) -> Self {
        Self {
            window,
            code,
            wparam,
            lparam,
        }
    }

    const fn simple(window: WindowHandle, code: u32) -> Self {
        Self::new(Some(window), code, 0, 0)
    }

    pub const fn create(window: WindowHandle) -> Self {
        Self::simple(window, codes::CREATE)
    }

    pub const fn destroy(window: WindowHandle) -> Self {
        Self::simple(window, codes::DESTROY)
    }

    pub const fn close(window: WindowHandle) -> Self {
        Self::simple(window, codes::CLOSE)
    }

    pub const fn focus(window: WindowHandle) -> Self {
        Self::simple(window, codes::SET_FOCUS)
    }

    pub const fn unfocus(window: WindowHandle) -> Self {
        Self::simple(window, codes::KILL_FOCUS)
    }

    pub const fn redraw(window: WindowHandle) -> Self {
        Self::simple(window, codes::PAINT)
    }

    /// Thread-wide quit notification.
    pub const fn quit(exit_code: i32) -> Self {
        Self::new(None, codes::QUIT, exit_code as isize as usize, 0)
    }

    /// Exit code carried by a quit notification.
    pub fn exit_code(&self) -> i32 {
        self.wparam as isize as i32
    }

    pub fn resize(window: WindowHandle, width: u16, height: u16) -> Self {
        Self::new(Some(window), codes::SIZE, 0, make_param(width, height) as isize)
    }

    pub fn moved(window: WindowHandle, x: i16, y: i16) -> Self {
        Self::new(
            Some(window),
            codes::MOVE,
            0,
            make_param(x as u16, y as u16) as isize,
        )
    }

    pub fn key_down(window: WindowHandle, key: u32) -> Self {
        Self::new(Some(window), codes::KEY_DOWN, key as usize, 0)
    }

    pub fn key_up(window: WindowHandle, key: u32) -> Self {
        Self::new(Some(window), codes::KEY_UP, key as usize, 0)
    }

    pub fn mouse_move(window: WindowHandle, x: i16, y: i16) -> Self {
        Self::new(
            Some(window),
            codes::MOUSE_MOVE,
            0,
            make_param(x as u16, y as u16) as isize,
        )
    }

    pub fn button_down(window: WindowHandle, button: MouseButton) -> Self {
        let (code, wparam) = match button {
            MouseButton::Left => (codes::LBUTTON_DOWN, 0),
            MouseButton::Right => (codes::RBUTTON_DOWN, 0),
            MouseButton::Middle => (codes::MBUTTON_DOWN, 0),
            MouseButton::Extra1 => (codes::XBUTTON_DOWN, make_param(0, codes::XBUTTON1)),
            MouseButton::Extra2 => (codes::XBUTTON_DOWN, make_param(0, codes::XBUTTON2)),
        };
        Self::new(Some(window), code, wparam, 0)
    }

    pub fn button_up(window: WindowHandle, button: MouseButton) -> Self {
        let (code, wparam) = match button {
            MouseButton::Left => (codes::LBUTTON_UP, 0),
            MouseButton::Right => (codes::RBUTTON_UP, 0),
            MouseButton::Middle => (codes::MBUTTON_UP, 0),
            MouseButton::Extra1 => (codes::XBUTTON_UP, make_param(0, codes::XBUTTON1)),
            MouseButton::Extra2 => (codes::XBUTTON_UP, make_param(0, codes::XBUTTON2)),
        };
        Self::new(Some(window), code, wparam, 0)
    }

    pub fn wheel(window: WindowHandle, delta: i16) -> Self {
        Self::new(
            Some(window),
            codes::MOUSE_WHEEL,
            make_param(0, delta as u16),
            0,
        )
    }

    pub fn system_command(window: WindowHandle, command: u32) -> Self {
        Self::new(Some(window), codes::SYS_COMMAND, command as usize, 0)
    }

    pub fn show_window(window: WindowHandle, visible: bool) -> Self {
        Self::new(Some(window), codes::SHOW_WINDOW, usize::from(visible), 0)
    }

    /// Touch notification; `payload` identifies the backend-side input list.
    pub fn touch(window: WindowHandle, count: u16, payload: isize) -> Self {
        Self::new(Some(window), codes::TOUCH, count as usize, payload)
    }

    pub fn pointer_update(window: WindowHandle, pointer_id: u16) -> Self {
        Self::new(Some(window), codes::POINTER_UPDATE, pointer_id as usize, 0)
    }

    /// File-drop notification; `payload` identifies the backend-side path list.
    pub fn drop_files(window: WindowHandle, payload: usize) -> Self {
        Self::new(Some(window), codes::DROP_FILES, payload, 0)
    }

    /// The normalized kind of this notification, if it is one the engine knows.
    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_code(self.code)
    }
}

/// Notification kinds the dispatcher knows how to route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Create,
    Destroy,
    Close,
    Size,
    Move,
    SetFocus,
    KillFocus,
    Paint,
    KeyDown,
    KeyUp,
    MouseMove,
    LeftButtonDown,
    LeftButtonUp,
    RightButtonDown,
    RightButtonUp,
    MiddleButtonDown,
    MiddleButtonUp,
    ExtraButtonDown,
    ExtraButtonUp,
    MouseWheel,
    SysCommand,
    ShowWindow,
    DropFiles,
    Touch,
    PointerUpdate,
    Quit,
}

const KIND_CODES: &[(u32, MessageKind)] = &[
    (codes::CREATE, MessageKind::Create),
    (codes::DESTROY, MessageKind::Destroy),
    (codes::CLOSE, MessageKind::Close),
    (codes::SIZE, MessageKind::Size),
    (codes::MOVE, MessageKind::Move),
    (codes::SET_FOCUS, MessageKind::SetFocus),
    (codes::KILL_FOCUS, MessageKind::KillFocus),
    (codes::PAINT, MessageKind::Paint),
    (codes::KEY_DOWN, MessageKind::KeyDown),
    (codes::KEY_UP, MessageKind::KeyUp),
    (codes::MOUSE_MOVE, MessageKind::MouseMove),
    (codes::LBUTTON_DOWN, MessageKind::LeftButtonDown),
    (codes::LBUTTON_UP, MessageKind::LeftButtonUp),
    (codes::RBUTTON_DOWN, MessageKind::RightButtonDown),
    (codes::RBUTTON_UP, MessageKind::RightButtonUp),
    (codes::MBUTTON_DOWN, MessageKind::MiddleButtonDown),
    (codes::MBUTTON_UP, MessageKind::MiddleButtonUp),
    (codes::XBUTTON_DOWN, MessageKind::ExtraButtonDown),
    (codes::XBUTTON_UP, MessageKind::ExtraButtonUp),
    (codes::MOUSE_WHEEL, MessageKind::MouseWheel),
    (codes::SYS_COMMAND, MessageKind::SysCommand),
    (codes::SHOW_WINDOW, MessageKind::ShowWindow),
    (codes::DROP_FILES, MessageKind::DropFiles),
    (codes::TOUCH, MessageKind::Touch),
    (codes::POINTER_UPDATE, MessageKind::PointerUpdate),
    (codes::QUIT, MessageKind::Quit),
];

impl MessageKind {
    /// Every known kind.
    pub fn all() -> impl Iterator<Item = MessageKind> {
        KIND_CODES.iter().map(|&(_, kind)| kind)
    }

    pub fn from_code(code: u32) -> Option<Self> {
        KIND_CODES
            .iter()
            .find(|&&(known, _)| known == code)
            .map(|&(_, kind)| kind)
    }

    pub fn code(self) -> u32 {
        KIND_CODES
            .iter()
            .find(|&&(_, kind)| kind == self)
            .map(|&(code, _)| code)
            .unwrap_or_default()
    }
}
