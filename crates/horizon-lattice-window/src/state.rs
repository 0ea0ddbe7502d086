//! Per-window state and the side table that attaches it to window handles.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::backend::{TOUCH_MOVE, TOUCH_UP, TouchInput, WindowHandle};
use crate::event::{EventTable, TouchPoint};
use crate::logging::targets;

/// Mutable data attached to one native window.
///
/// Allocated when the window's creation notification is dispatched and
/// released after its destruction notification. While the window is alive
/// [`WindowContext::state`](crate::WindowContext::state) always returns the
/// same state.
pub struct WindowState {
    /// Callback slots for this window.
    pub event: EventTable,
    running: Cell<bool>,
    user_data: RefCell<Option<Rc<dyn Any>>>,
    /// Last known position of each active touch contact.
    contacts: RefCell<HashMap<u32, (i32, i32)>>,
}

impl WindowState {
    pub(crate) fn new() -> Self {
        Self {
            event: EventTable::new(),
            running: Cell::new(true),
            user_data: RefCell::new(None),
            contacts: RefCell::new(HashMap::new()),
        }
    }

    /// Application-controlled running flag. Starts `true`; the engine never
    /// changes it afterwards.
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn set_running(&self, running: bool) {
        self.running.set(running);
    }

    /// The opaque user data, if any.
    pub fn user_data(&self) -> Option<Rc<dyn Any>> {
        self.user_data.borrow().clone()
    }

    /// The user data downcast to `T`.
    pub fn user_data_as<T: Any>(&self) -> Option<Rc<T>> {
        self.user_data().and_then(|data| data.downcast::<T>().ok())
    }

    /// Attach `data`, dropping any previous user data.
    pub fn set_user_data<T: Any>(&self, data: T) {
        self.set_user_data_rc(Rc::new(data));
    }

    /// Attach already shared user data.
    pub fn set_user_data_rc(&self, data: Rc<dyn Any>) {
        let previous = self.user_data.replace(Some(data));
        drop(previous);
    }

    /// Detach and return the user data.
    pub fn take_user_data(&self) -> Option<Rc<dyn Any>> {
        self.user_data.replace(None)
    }

    /// Drop everything the state holds: callbacks, user data and touch
    /// contacts.
    ///
    /// Callbacks that captured the state itself would otherwise keep it
    /// alive after its window is gone.
    pub(crate) fn clear(&self) {
        self.event.reset();
        drop(self.take_user_data());
        self.contacts.borrow_mut().clear();
    }

    /// Normalize a native touch input to whole pixels and compute its delta
    /// against the previous report of the same contact.
    pub(crate) fn track_touch(&self, input: &TouchInput) -> TouchPoint {
        let x = input.x / 100;
        let y = input.y / 100;

        let mut contacts = self.contacts.borrow_mut();
        let (dx, dy) = match contacts.get(&input.id) {
            Some(&(last_x, last_y)) if input.has_flag(TOUCH_MOVE) => (x - last_x, y - last_y),
            _ => (0, 0),
        };

        if input.has_flag(TOUCH_UP) {
            contacts.remove(&input.id);
        } else {
            contacts.insert(input.id, (x, y));
        }

        TouchPoint {
            id: input.id,
            x,
            y,
            dx,
            dy,
        }
    }
}

impl fmt::Debug for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowState")
            .field("event", &self.event)
            .field("running", &self.running.get())
            .field("has_user_data", &self.user_data.borrow().is_some())
            .finish()
    }
}

impl Drop for WindowState {
    fn drop(&mut self) {
        tracing::trace!(target: targets::STATE, "window state released");
    }
}

/// Why a window state could not be allocated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub(crate) enum StateAllocError {
    #[error("window limit of {0} reached")]
    LimitReached(usize),
    #[error("out of memory while growing the state table")]
    OutOfMemory,
    #[error("window {0} already has a state")]
    AlreadyAttached(WindowHandle),
}

/// Side table mapping live window handles to their state.
pub(crate) struct StateTable {
    states: RefCell<HashMap<WindowHandle, Rc<WindowState>>>,
    limit: Option<usize>,
}

impl StateTable {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            states: RefCell::new(HashMap::new()),
            limit,
        }
    }

    /// Allocate a fresh state and attach it to `window`.
    pub fn allocate(&self, window: WindowHandle) -> Result<Rc<WindowState>, StateAllocError> {
        let mut states = self.states.borrow_mut();
        if states.contains_key(&window) {
            return Err(StateAllocError::AlreadyAttached(window));
        }
        if let Some(limit) = self.limit
            && states.len() >= limit
        {
            return Err(StateAllocError::LimitReached(limit));
        }
        states
            .try_reserve(1)
            .map_err(|_| StateAllocError::OutOfMemory)?;

        let state = Rc::new(WindowState::new());
        states.insert(window, Rc::clone(&state));
        tracing::trace!(target: targets::STATE, %window, live = states.len(), "window state attached");
        Ok(state)
    }

    pub fn get(&self, window: WindowHandle) -> Option<Rc<WindowState>> {
        self.states.borrow().get(&window).cloned()
    }

    /// Detach the state of `window`.
    ///
    /// The state itself is dropped once the last in-flight dispatch lets go
    /// of it.
    pub fn release(&self, window: WindowHandle) -> Option<Rc<WindowState>> {
        let released = self.states.borrow_mut().remove(&window);
        if released.is_some() {
            tracing::trace!(target: targets::STATE, %window, "window state detached");
        }
        released
    }

    pub fn contains(&self, window: WindowHandle) -> bool {
        self.states.borrow().contains_key(&window)
    }

    pub fn len(&self) -> usize {
        self.states.borrow().len()
    }

    pub fn handles(&self) -> Vec<WindowHandle> {
        let mut handles: Vec<_> = self.states.borrow().keys().copied().collect();
        handles.sort();
        handles
    }
}
