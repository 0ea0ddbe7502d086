//! Tests for window creation, destruction and state lifetime.

use std::cell::Cell;
use std::rc::Rc;

use horizon_lattice_window::{
    BackendError, ContextBuilder, ErrorCode, HeadlessBackend, NativeBackend, Position,
    RawMessage, Size, WindowClass, WindowContext, WindowDescriptor, WindowError, WindowHandle,
};

/// User data that counts how often it is dropped.
struct DropCounter(Rc<Cell<usize>>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn test_class_registered_at_most_once() {
    let backend = HeadlessBackend::new();
    let ctx = WindowContext::new(backend.clone());
    assert!(!ctx.is_class_registered());

    for _ in 0..5 {
        ctx.create(100, 100, None, None).unwrap();
    }

    assert!(ctx.is_class_registered());
    assert_eq!(backend.class_registration_attempts(), 1);
    assert_eq!(ctx.window_count(), 5);
}

#[test]
fn test_failed_registration_fails_every_creation() {
    let backend = HeadlessBackend::new();
    backend.set_fail_class_registration(true);
    let ctx = WindowContext::new(backend.clone());

    for _ in 0..4 {
        let err = ctx.create(100, 100, Some("never"), None).unwrap_err();
        assert!(matches!(err, WindowError::RegisterClass { .. }));
        assert_eq!(ctx.last_error(), ErrorCode::RegisterClassFailed);
    }

    // No retry, even after the native side would accept the class.
    backend.set_fail_class_registration(false);
    assert!(ctx.create(100, 100, None, None).is_err());
    assert_eq!(backend.class_registration_attempts(), 1);
    assert_eq!(backend.live_windows(), 0);
}

#[test]
fn test_native_creation_failure() {
    let backend = HeadlessBackend::new();
    backend.set_fail_window_creation(true);
    let ctx = WindowContext::new(backend.clone());

    let err = ctx.create(100, 100, None, None).unwrap_err();
    assert!(matches!(err, WindowError::CreateWindow(_)));
    assert_eq!(ctx.last_error(), ErrorCode::CreateWindowFailed);

    // The class stays registered; the next creation succeeds.
    backend.set_fail_window_creation(false);
    ctx.create(100, 100, None, None).unwrap();
    assert_eq!(backend.class_registration_attempts(), 1);
}

#[test]
fn test_unknown_parent_is_a_creation_failure() {
    let ctx = WindowContext::new(HeadlessBackend::new());
    let parent = ctx.create(100, 100, None, None).unwrap();
    ctx.destroy(parent);

    let err = ctx.create(50, 50, None, Some(parent)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::CreateWindowFailed);
}

#[test]
fn test_fresh_state_until_callbacks_are_set() {
    let ctx = WindowContext::new(HeadlessBackend::new());
    let window = ctx.create(400, 100, Some("Window 1"), None).unwrap();

    let state = ctx.state(window).unwrap();
    assert!(state.is_running());
    assert!(state.event.is_empty());
    assert!(state.user_data().is_none());

    state.event.window.close.set(|_, _, _| {});
    assert_eq!(ctx.state(window).unwrap().event.installed(), 1);
}

#[test]
fn test_windows_start_hidden() {
    let backend = HeadlessBackend::new();
    let ctx = WindowContext::new(backend.clone());
    let window = ctx.create(100, 100, None, None).unwrap();
    assert!(!backend.is_visible(window));

    ctx.show(window);
    assert!(backend.is_visible(window));
}

#[test]
fn test_destroy_frees_state_once_without_callback() {
    let ctx = WindowContext::new(HeadlessBackend::new());
    let window = ctx.create(100, 100, None, None).unwrap();
    let drops = Rc::new(Cell::new(0));
    ctx.state(window)
        .unwrap()
        .set_user_data(DropCounter(Rc::clone(&drops)));

    ctx.destroy(window);

    assert_eq!(drops.get(), 1);
    assert!(ctx.state(window).is_none());
    assert_eq!(ctx.window_count(), 0);

    // Destroying again does not free anything twice.
    ctx.destroy(window);
    assert_eq!(drops.get(), 1);
}

#[test]
fn test_destroy_frees_state_once_with_callback() {
    let ctx = WindowContext::new(HeadlessBackend::new());
    let window = ctx.create(100, 100, None, None).unwrap();
    let drops = Rc::new(Cell::new(0));
    let seen_alive = Rc::new(Cell::new(false));

    let state = ctx.state(window).unwrap();
    state.set_user_data(DropCounter(Rc::clone(&drops)));
    let flag = Rc::clone(&seen_alive);
    state.event.window.destroy.set(move |ctx, window, state| {
        // The state is still attached while the callback runs.
        flag.set(ctx.state(window).is_some() && state.user_data().is_some());
    });
    drop(state);

    ctx.destroy(window);

    assert!(seen_alive.get());
    assert_eq!(drops.get(), 1);
    assert!(ctx.state(window).is_none());
}

#[test]
fn test_destroy_frees_state_captured_by_its_own_callback() {
    let ctx = WindowContext::new(HeadlessBackend::new());
    let window = ctx.create(100, 100, None, None).unwrap();
    let drops = Rc::new(Cell::new(0));

    let state = ctx.state(window).unwrap();
    state.set_user_data(DropCounter(Rc::clone(&drops)));
    let captured = Rc::clone(&state);
    state.event.window.close.set(move |_, _, _| captured.set_running(false));
    let weak = Rc::downgrade(&state);
    drop(state);

    ctx.destroy(window);

    assert_eq!(drops.get(), 1);
    assert!(weak.upgrade().is_none());
}

#[test]
fn test_destroy_empties_state_still_held_by_caller() {
    let ctx = WindowContext::new(HeadlessBackend::new());
    let window = ctx.create(100, 100, None, None).unwrap();
    let drops = Rc::new(Cell::new(0));

    let state = ctx.state(window).unwrap();
    state.set_user_data(DropCounter(Rc::clone(&drops)));
    state.event.window.close.set(|_, _, _| {});

    ctx.destroy(window);

    assert_eq!(drops.get(), 1);
    assert!(state.user_data().is_none());
    assert!(state.event.is_empty());
}

#[test]
fn test_default_close_destroys_window() {
    let backend = HeadlessBackend::new();
    let ctx = WindowContext::new(backend.clone());
    let window = ctx.create(100, 100, None, None).unwrap();
    let destroyed = Rc::new(Cell::new(false));
    let flag = Rc::clone(&destroyed);
    ctx.state(window)
        .unwrap()
        .event
        .window
        .destroy
        .set(move |_, _, _| flag.set(true));

    backend.post_close(window);
    ctx.pump(None);

    assert!(destroyed.get());
    assert!(!backend.is_alive(window));
    assert!(ctx.state(window).is_none());
}

#[test]
fn test_destroying_parent_destroys_children() {
    let backend = HeadlessBackend::new();
    let ctx = WindowContext::new(backend.clone());
    let parent = ctx.create(200, 200, None, None).unwrap();
    let child = ctx.create(50, 50, None, Some(parent)).unwrap();
    assert_eq!(backend.parent(child), Some(parent));

    ctx.destroy(parent);

    assert!(ctx.state(child).is_none());
    assert_eq!(ctx.window_count(), 0);
    assert_eq!(backend.live_windows(), 0);
}

#[test]
fn test_state_allocation_failure_destroys_native_window() {
    let backend = HeadlessBackend::new();
    let ctx = ContextBuilder::new().max_windows(1).build(backend.clone());

    let first = ctx.create(100, 100, None, None).unwrap();
    let err = ctx.create(100, 100, None, None).unwrap_err();

    assert!(matches!(err, WindowError::AllocateState));
    assert_eq!(ctx.last_error(), ErrorCode::AllocateStateFailed);
    assert_eq!(backend.live_windows(), 1);
    assert_eq!(ctx.windows(), vec![first]);

    // Room again once the first window is gone.
    ctx.destroy(first);
    ctx.create(100, 100, None, None).unwrap();
}

#[test]
fn test_last_error_is_overwritten() {
    let backend = HeadlessBackend::new();
    let ctx = ContextBuilder::new().max_windows(0).build(backend.clone());

    ctx.create(1, 1, None, None).unwrap_err();
    assert_eq!(ctx.last_error(), ErrorCode::AllocateStateFailed);

    backend.set_fail_window_creation(true);
    ctx.create(1, 1, None, None).unwrap_err();
    assert_eq!(ctx.last_error(), ErrorCode::CreateWindowFailed);
}

#[test]
fn test_independent_contexts() {
    let first = WindowContext::new(HeadlessBackend::new());
    let failing = HeadlessBackend::new();
    failing.set_fail_class_registration(true);
    let second = WindowContext::new(failing);

    assert!(second.create(1, 1, None, None).is_err());
    assert!(first.create(1, 1, None, None).is_ok());
    assert_eq!(first.last_error(), ErrorCode::None);
}

#[test]
fn test_class_name_from_config() {
    let backend = HeadlessBackend::new();
    let ctx = ContextBuilder::new().class_name("editor").build(backend.clone());
    let window = ctx.create(1, 1, None, None).unwrap();

    assert_eq!(ctx.window_class().name(), "editor");
    assert_eq!(backend.class_of(window).as_deref(), Some("editor"));
    assert!(ctx.backend().title(window).is_some());
}

/// Backend that swallows the creation notification of every window.
struct SilentCreation(HeadlessBackend);

impl NativeBackend for SilentCreation {
    fn register_class(&self, class: &WindowClass) -> Result<(), BackendError> {
        self.0.register_class(class)
    }

    fn create_window(&self, descriptor: &WindowDescriptor) -> Result<WindowHandle, BackendError> {
        let window = self.0.create_window(descriptor)?;
        while self.0.next_sent().is_some() {}
        Ok(window)
    }

    fn destroy_window(&self, window: WindowHandle) {
        self.0.destroy_window(window);
    }

    fn set_title(&self, window: WindowHandle, title: &str) {
        self.0.set_title(window, title);
    }

    fn title(&self, window: WindowHandle) -> Option<String> {
        self.0.title(window)
    }

    fn set_size(&self, window: WindowHandle, size: Size) {
        self.0.set_size(window, size);
    }

    fn size(&self, window: WindowHandle) -> Option<Size> {
        self.0.size(window)
    }

    fn set_position(&self, window: WindowHandle, position: Position) {
        self.0.set_position(window, position);
    }

    fn position(&self, window: WindowHandle) -> Option<Position> {
        self.0.position(window)
    }

    fn show(&self, window: WindowHandle) {
        self.0.show(window);
    }

    fn hide(&self, window: WindowHandle) {
        self.0.hide(window);
    }

    fn minimize(&self, window: WindowHandle) {
        self.0.minimize(window);
    }

    fn maximize(&self, window: WindowHandle) {
        self.0.maximize(window);
    }

    fn peek_message(&self, filter: Option<WindowHandle>) -> Option<RawMessage> {
        self.0.peek_message(filter)
    }

    fn next_sent(&self) -> Option<RawMessage> {
        self.0.next_sent()
    }

    fn post_quit(&self, exit_code: i32) {
        self.0.post_quit(exit_code);
    }

    fn default_handling(&self, message: &RawMessage) {
        self.0.default_handling(message);
    }
}

#[test]
fn test_missing_creation_notification_destroys_native_window() {
    let backend = HeadlessBackend::new();
    let ctx = WindowContext::new(SilentCreation(backend.clone()));

    let err = ctx.create(100, 100, None, None).unwrap_err();

    assert!(matches!(err, WindowError::AllocateState));
    assert_eq!(ctx.last_error(), ErrorCode::AllocateStateFailed);
    assert_eq!(backend.live_windows(), 0);
    assert_eq!(ctx.window_count(), 0);
}
