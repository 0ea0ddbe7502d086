//! An in-memory native backend.
//!
//! [`HeadlessBackend`] keeps windows in a slot map and notifications in two
//! queues, with no window system behind it. It behaves like a native window
//! system as far as the dispatch engine can tell: creation, destruction,
//! visibility and geometry changes raise sent notifications, closing a window
//! by default destroys it, and system commands minimize or maximize.
//!
//! The backend is a cheap handle; clones share the same windows and queues.
//! Keep one clone outside the context to inject notifications:
//!
//! ```
//! use horizon_lattice_window::{HeadlessBackend, WindowContext};
//!
//! let backend = HeadlessBackend::new();
//! let ctx = WindowContext::new(backend.clone());
//! let window = ctx.create(640, 480, None, None).unwrap();
//!
//! backend.post_resize(window, 800, 600);
//! assert_eq!(ctx.pump(None), 1);
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use slotmap::{Key, KeyData, SlotMap, new_key_type};

use crate::backend::{NativeBackend, PenInfo, Position, Size, TouchInput, WindowDescriptor, WindowHandle};
use crate::class::WindowClass;
use crate::error::BackendError;
use crate::event::MouseButton;
use crate::logging::targets;
use crate::message::{RawMessage, clamp_signed_word, clamp_word, codes};

new_key_type! {
    struct WindowKey;
}

/// Screen size a maximized window fills unless changed.
pub const DEFAULT_SCREEN_SIZE: Size = Size::new(1920, 1080);

/// Number of default-handled notifications kept for inspection. Older ones
/// are discarded first.
pub const DEFAULT_HANDLED_CAPACITY: usize = 256;

/// Show state of a headless window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    #[default]
    Normal,
    Minimized,
    Maximized,
}

#[derive(Debug)]
struct NativeWindow {
    class_name: String,
    title: String,
    size: Size,
    position: Position,
    visible: bool,
    placement: Placement,
    parent: Option<WindowHandle>,
    /// Geometry to return to when leaving the maximized or minimized state.
    restore: Option<(Size, Position)>,
}

#[derive(Debug)]
struct Inner {
    classes: HashSet<String>,
    registration_attempts: usize,
    windows: SlotMap<WindowKey, NativeWindow>,
    posted: VecDeque<RawMessage>,
    sent: VecDeque<RawMessage>,
    pens: HashMap<u32, PenInfo>,
    touches: HashMap<isize, Vec<TouchInput>>,
    drops: HashMap<usize, Vec<String>>,
    next_payload: usize,
    default_handled: VecDeque<RawMessage>,
    screen: Size,
    fail_class_registration: bool,
    fail_window_creation: bool,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            classes: HashSet::new(),
            registration_attempts: 0,
            windows: SlotMap::with_key(),
            posted: VecDeque::new(),
            sent: VecDeque::new(),
            pens: HashMap::new(),
            touches: HashMap::new(),
            drops: HashMap::new(),
            next_payload: 1,
            default_handled: VecDeque::new(),
            screen: DEFAULT_SCREEN_SIZE,
            fail_class_registration: false,
            fail_window_creation: false,
        }
    }
}

fn to_handle(key: WindowKey) -> WindowHandle {
    WindowHandle::from_raw(key.data().as_ffi())
}

fn to_key(window: WindowHandle) -> WindowKey {
    WindowKey::from(KeyData::from_ffi(window.as_raw()))
}

impl Inner {
    fn window(&self, window: WindowHandle) -> Option<&NativeWindow> {
        self.windows.get(to_key(window))
    }

    fn window_mut(&mut self, window: WindowHandle) -> Option<&mut NativeWindow> {
        self.windows.get_mut(to_key(window))
    }

    fn payload_id(&mut self) -> usize {
        let id = self.next_payload;
        self.next_payload += 1;
        id
    }

    fn children_of(&self, parent: WindowHandle) -> Vec<WindowHandle> {
        self.windows
            .iter()
            .filter(|(_, window)| window.parent == Some(parent))
            .map(|(key, _)| to_handle(key))
            .collect()
    }
}

/// In-memory implementation of [`NativeBackend`].
#[derive(Clone, Default)]
pub struct HeadlessBackend {
    inner: Rc<RefCell<Inner>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Notification injection
    // =========================================================================

    /// Queue an arbitrary posted notification.
    pub fn post(&self, message: RawMessage) {
        tracing::trace!(target: targets::BACKEND, code = message.code, "posting notification");
        self.inner.borrow_mut().posted.push_back(message);
    }

    pub fn post_close(&self, window: WindowHandle) {
        self.post(RawMessage::close(window));
    }

    pub fn post_system_command(&self, window: WindowHandle, command: u32) {
        self.post(RawMessage::system_command(window, command));
    }

    pub fn post_minimize(&self, window: WindowHandle) {
        self.post_system_command(window, codes::SC_MINIMIZE);
    }

    pub fn post_maximize(&self, window: WindowHandle) {
        self.post_system_command(window, codes::SC_MAXIMIZE);
    }

    pub fn post_resize(&self, window: WindowHandle, width: u16, height: u16) {
        self.post(RawMessage::resize(window, width, height));
    }

    pub fn post_move(&self, window: WindowHandle, x: i16, y: i16) {
        self.post(RawMessage::moved(window, x, y));
    }

    pub fn post_focus(&self, window: WindowHandle) {
        self.post(RawMessage::focus(window));
    }

    pub fn post_unfocus(&self, window: WindowHandle) {
        self.post(RawMessage::unfocus(window));
    }

    pub fn post_redraw(&self, window: WindowHandle) {
        self.post(RawMessage::redraw(window));
    }

    pub fn post_key_down(&self, window: WindowHandle, key: u32) {
        self.post(RawMessage::key_down(window, key));
    }

    pub fn post_key_up(&self, window: WindowHandle, key: u32) {
        self.post(RawMessage::key_up(window, key));
    }

    pub fn post_mouse_move(&self, window: WindowHandle, x: i16, y: i16) {
        self.post(RawMessage::mouse_move(window, x, y));
    }

    pub fn post_button_down(&self, window: WindowHandle, button: MouseButton) {
        self.post(RawMessage::button_down(window, button));
    }

    pub fn post_button_up(&self, window: WindowHandle, button: MouseButton) {
        self.post(RawMessage::button_up(window, button));
    }

    pub fn post_wheel(&self, window: WindowHandle, delta: i16) {
        self.post(RawMessage::wheel(window, delta));
    }

    pub fn post_show_window(&self, window: WindowHandle, visible: bool) {
        self.post(RawMessage::show_window(window, visible));
    }

    /// Queue a touch notification reporting `inputs`.
    pub fn post_touch(&self, window: WindowHandle, inputs: Vec<TouchInput>) {
        let count = u16::try_from(inputs.len()).unwrap_or(u16::MAX);
        let payload = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.payload_id() as isize;
            inner.touches.insert(id, inputs);
            id
        };
        self.post(RawMessage::touch(window, count, payload));
    }

    /// Record `info` for `pointer_id` and queue a pen update for it.
    pub fn post_pen(&self, window: WindowHandle, pointer_id: u16, info: PenInfo) {
        self.inner.borrow_mut().pens.insert(u32::from(pointer_id), info);
        self.post(RawMessage::pointer_update(window, pointer_id));
    }

    /// Queue a pen update without recording pen info for the pointer.
    pub fn post_unknown_pen(&self, window: WindowHandle, pointer_id: u16) {
        self.post(RawMessage::pointer_update(window, pointer_id));
    }

    /// Queue a file-drop notification carrying `paths`.
    pub fn post_file_drop(&self, window: WindowHandle, paths: Vec<String>) {
        let payload = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.payload_id();
            inner.drops.insert(id, paths);
            id
        };
        self.post(RawMessage::drop_files(window, payload));
    }

    // =========================================================================
    // Failure switches
    // =========================================================================

    /// Make every class registration fail.
    pub fn set_fail_class_registration(&self, fail: bool) {
        self.inner.borrow_mut().fail_class_registration = fail;
    }

    /// Make every window creation fail.
    pub fn set_fail_window_creation(&self, fail: bool) {
        self.inner.borrow_mut().fail_window_creation = fail;
    }

    /// Size a maximized window fills.
    pub fn set_screen_size(&self, size: Size) {
        self.inner.borrow_mut().screen = size;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Number of successful class registrations.
    pub fn class_registrations(&self) -> usize {
        self.inner.borrow().classes.len()
    }

    /// Number of class registration attempts, failed ones included.
    pub fn class_registration_attempts(&self) -> usize {
        self.inner.borrow().registration_attempts
    }

    pub fn live_windows(&self) -> usize {
        self.inner.borrow().windows.len()
    }

    pub fn is_alive(&self, window: WindowHandle) -> bool {
        self.inner.borrow().window(window).is_some()
    }

    /// Number of posted notifications not yet taken.
    pub fn pending_messages(&self) -> usize {
        self.inner.borrow().posted.len()
    }

    pub fn is_visible(&self, window: WindowHandle) -> bool {
        self.inner.borrow().window(window).is_some_and(|w| w.visible)
    }

    pub fn placement(&self, window: WindowHandle) -> Option<Placement> {
        self.inner.borrow().window(window).map(|w| w.placement)
    }

    pub fn parent(&self, window: WindowHandle) -> Option<WindowHandle> {
        self.inner.borrow().window(window).and_then(|w| w.parent)
    }

    /// Name of the class `window` was created from.
    pub fn class_of(&self, window: WindowHandle) -> Option<String> {
        self.inner.borrow().window(window).map(|w| w.class_name.clone())
    }

    /// Take the notifications that fell through to default handling since
    /// the last call, oldest first.
    ///
    /// At most [`DEFAULT_HANDLED_CAPACITY`] of the most recent ones are kept.
    pub fn take_default_handled(&self) -> Vec<RawMessage> {
        self.inner.borrow_mut().default_handled.drain(..).collect()
    }

    /// Touch payloads not yet closed.
    pub fn open_touch_payloads(&self) -> usize {
        self.inner.borrow().touches.len()
    }

    /// File-drop payloads not yet released.
    pub fn open_drop_payloads(&self) -> usize {
        self.inner.borrow().drops.len()
    }

    fn restore(&self, window: WindowHandle) {
        let mut inner = self.inner.borrow_mut();
        let Some(native) = inner.window_mut(window) else {
            return;
        };
        native.placement = Placement::Normal;
        let Some((size, position)) = native.restore.take() else {
            return;
        };
        native.size = size;
        native.position = position;
        inner
            .sent
            .push_back(RawMessage::moved(window, clamp_signed_word(position.x), clamp_signed_word(position.y)));
        inner
            .sent
            .push_back(RawMessage::resize(window, clamp_word(size.width), clamp_word(size.height)));
    }
}

impl NativeBackend for HeadlessBackend {
    fn register_class(&self, class: &WindowClass) -> Result<(), BackendError> {
        let mut inner = self.inner.borrow_mut();
        inner.registration_attempts += 1;
        if inner.fail_class_registration {
            return Err(BackendError::Os("class registration refused".into()));
        }
        if !inner.classes.insert(class.name().to_string()) {
            return Err(BackendError::ClassExists(class.name().to_string()));
        }
        tracing::trace!(target: targets::BACKEND, class = class.name(), "class registered");
        Ok(())
    }

    fn create_window(&self, descriptor: &WindowDescriptor) -> Result<WindowHandle, BackendError> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_window_creation {
            return Err(BackendError::Os("window creation refused".into()));
        }
        if !inner.classes.contains(&descriptor.class_name) {
            return Err(BackendError::UnknownClass(descriptor.class_name.clone()));
        }
        if let Some(parent) = descriptor.parent
            && inner.window(parent).is_none()
        {
            return Err(BackendError::InvalidWindow(parent));
        }

        let key = inner.windows.insert(NativeWindow {
            class_name: descriptor.class_name.clone(),
            title: descriptor.title.clone().unwrap_or_default(),
            size: descriptor.size,
            position: Position::default(),
            visible: false,
            placement: Placement::Normal,
            parent: descriptor.parent,
            restore: None,
        });
        let window = to_handle(key);
        inner.sent.push_back(RawMessage::create(window));
        tracing::trace!(target: targets::BACKEND, %window, "native window created");
        Ok(window)
    }

    fn destroy_window(&self, window: WindowHandle) {
        let children = {
            let mut inner = self.inner.borrow_mut();
            if inner.windows.remove(to_key(window)).is_none() {
                tracing::trace!(target: targets::BACKEND, %window, "destroy of unknown window ignored");
                return;
            }
            inner.posted.retain(|message| message.window != Some(window));
            inner.sent.push_back(RawMessage::destroy(window));
            tracing::trace!(target: targets::BACKEND, %window, "native window destroyed");
            inner.children_of(window)
        };
        for child in children {
            self.destroy_window(child);
        }
    }

    fn set_title(&self, window: WindowHandle, title: &str) {
        if let Some(native) = self.inner.borrow_mut().window_mut(window) {
            native.title = title.to_string();
        }
    }

    fn title(&self, window: WindowHandle) -> Option<String> {
        self.inner.borrow().window(window).map(|w| w.title.clone())
    }

    fn set_size(&self, window: WindowHandle, size: Size) {
        let mut inner = self.inner.borrow_mut();
        let Some(native) = inner.window_mut(window) else {
            return;
        };
        native.size = size;
        inner
            .sent
            .push_back(RawMessage::resize(window, clamp_word(size.width), clamp_word(size.height)));
    }

    fn size(&self, window: WindowHandle) -> Option<Size> {
        self.inner.borrow().window(window).map(|w| w.size)
    }

    fn set_position(&self, window: WindowHandle, position: Position) {
        let mut inner = self.inner.borrow_mut();
        let Some(native) = inner.window_mut(window) else {
            return;
        };
        native.position = position;
        inner
            .sent
            .push_back(RawMessage::moved(window, clamp_signed_word(position.x), clamp_signed_word(position.y)));
    }

    fn position(&self, window: WindowHandle) -> Option<Position> {
        self.inner.borrow().window(window).map(|w| w.position)
    }

    fn show(&self, window: WindowHandle) {
        let mut inner = self.inner.borrow_mut();
        let Some(native) = inner.window_mut(window) else {
            return;
        };
        if !native.visible {
            native.visible = true;
            inner.sent.push_back(RawMessage::show_window(window, true));
        }
    }

    fn hide(&self, window: WindowHandle) {
        let mut inner = self.inner.borrow_mut();
        let Some(native) = inner.window_mut(window) else {
            return;
        };
        if native.visible {
            native.visible = false;
            inner.sent.push_back(RawMessage::show_window(window, false));
        }
    }

    fn minimize(&self, window: WindowHandle) {
        let mut inner = self.inner.borrow_mut();
        let Some(native) = inner.window_mut(window) else {
            return;
        };
        if native.placement == Placement::Minimized {
            return;
        }
        if native.restore.is_none() {
            native.restore = Some((native.size, native.position));
        }
        native.placement = Placement::Minimized;
        inner.sent.push_back(RawMessage::resize(window, 0, 0));
    }

    fn maximize(&self, window: WindowHandle) {
        let mut inner = self.inner.borrow_mut();
        let screen = inner.screen;
        let Some(native) = inner.window_mut(window) else {
            return;
        };
        if native.placement == Placement::Maximized {
            return;
        }
        if native.restore.is_none() {
            native.restore = Some((native.size, native.position));
        }
        native.placement = Placement::Maximized;
        native.size = screen;
        native.position = Position::default();
        let became_visible = !native.visible;
        native.visible = true;

        if became_visible {
            inner.sent.push_back(RawMessage::show_window(window, true));
        }
        inner.sent.push_back(RawMessage::moved(window, 0, 0));
        inner
            .sent
            .push_back(RawMessage::resize(window, clamp_word(screen.width), clamp_word(screen.height)));
    }

    fn peek_message(&self, filter: Option<WindowHandle>) -> Option<RawMessage> {
        let mut inner = self.inner.borrow_mut();
        let index = inner.posted.iter().position(|message| {
            message.window.is_none() || filter.is_none() || message.window == filter
        })?;
        inner.posted.remove(index)
    }

    fn next_sent(&self) -> Option<RawMessage> {
        self.inner.borrow_mut().sent.pop_front()
    }

    fn post_quit(&self, exit_code: i32) {
        self.post(RawMessage::quit(exit_code));
    }

    fn default_handling(&self, message: &RawMessage) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.default_handled.len() == DEFAULT_HANDLED_CAPACITY {
                inner.default_handled.pop_front();
            }
            inner.default_handled.push_back(*message);
        }
        let Some(window) = message.window else {
            return;
        };

        match message.code {
            codes::CLOSE => self.destroy_window(window),
            codes::SYS_COMMAND => match message.wparam as u32 & codes::SC_MASK {
                codes::SC_MINIMIZE => self.minimize(window),
                codes::SC_MAXIMIZE => self.maximize(window),
                codes::SC_RESTORE => self.restore(window),
                codes::SC_CLOSE => self.inner.borrow_mut().sent.push_back(RawMessage::close(window)),
                _ => {}
            },
            codes::DROP_FILES => self.release_drop(message),
            codes::TOUCH => self.close_touch_input(message),
            _ => {}
        }
    }

    fn pen_info(&self, pointer_id: u32) -> Option<PenInfo> {
        self.inner.borrow().pens.get(&pointer_id).copied()
    }

    fn touch_inputs(&self, message: &RawMessage) -> Option<Vec<TouchInput>> {
        self.inner.borrow().touches.get(&message.lparam).cloned()
    }

    fn close_touch_input(&self, message: &RawMessage) {
        self.inner.borrow_mut().touches.remove(&message.lparam);
    }

    fn dropped_files(&self, message: &RawMessage) -> Vec<String> {
        self.inner
            .borrow()
            .drops
            .get(&message.wparam)
            .cloned()
            .unwrap_or_default()
    }

    fn release_drop(&self, message: &RawMessage) {
        self.inner.borrow_mut().drops.remove(&message.wparam);
    }
}

impl fmt::Debug for HeadlessBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("HeadlessBackend")
            .field("windows", &inner.windows.len())
            .field("posted", &inner.posted.len())
            .field("sent", &inner.sent.len())
            .finish()
    }
}
