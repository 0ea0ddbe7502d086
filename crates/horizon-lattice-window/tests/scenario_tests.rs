//! End-to-end run loop scenarios.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use horizon_lattice_window::{HeadlessBackend, WindowContext, WindowHandle, WindowState};

const MAXIMIZED: &str = "Maximized Window";
const MAXIMIZED_ANOTHER: &str = "Maximized(another) Window";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn on_maximize(ctx: &WindowContext, window: WindowHandle, state: &WindowState) {
    ctx.set_title(window, MAXIMIZED);
    state.event.window.maximize.set(on_maximize_another);
}

fn on_maximize_another(ctx: &WindowContext, window: WindowHandle, state: &WindowState) {
    ctx.set_title(window, MAXIMIZED_ANOTHER);
    state.event.window.maximize.set(on_maximize);
}

fn on_close(ctx: &WindowContext, _: WindowHandle, state: &WindowState) {
    state.set_running(false);
    ctx.request_exit(0);
}

#[test]
fn test_maximize_toggle_then_close() {
    init_tracing();
    let backend = HeadlessBackend::new();
    let ctx = WindowContext::new(backend.clone());
    let exit_codes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&exit_codes);
    ctx.set_exit_hook(move |code| sink.borrow_mut().push(code));

    let window = ctx.create(400, 100, Some("Window 1"), None).unwrap();
    ctx.show(window);
    let state = ctx.state(window).unwrap();
    state.event.window.close.set(on_close);
    state.event.window.maximize.set(on_maximize);

    let mut titles = Vec::new();
    backend.post_maximize(window);
    ctx.pump(None);
    titles.extend(ctx.title(window));

    backend.post_maximize(window);
    ctx.pump(None);
    titles.extend(ctx.title(window));

    backend.post_close(window);
    let mut iterations = 0;
    while state.is_running() {
        ctx.pump(None);
        iterations += 1;
        assert!(iterations < 10, "run loop did not terminate");
    }

    assert_eq!(titles, vec![MAXIMIZED, MAXIMIZED_ANOTHER]);
    assert_eq!(iterations, 1);
    assert_eq!(*exit_codes.borrow(), vec![0]);
    // The close was handled, so the window is still alive.
    assert!(backend.is_alive(window));
    assert_eq!(ctx.title(window).as_deref(), Some(MAXIMIZED_ANOTHER));
}

#[test]
fn test_quit_is_observed_in_a_later_pump() {
    let backend = HeadlessBackend::new();
    let ctx = WindowContext::new(backend.clone());
    let window = ctx.create(400, 100, Some("Window 1"), None).unwrap();
    let exit_code = Rc::new(Cell::new(None));
    let sink = Rc::clone(&exit_code);
    ctx.set_exit_hook(move |code| sink.set(Some(code)));

    // Exit requested outside of a pump, behind an ordinary notification.
    backend.post_redraw(window);
    ctx.request_exit(3);
    assert_eq!(exit_code.get(), None);

    assert_eq!(ctx.pump(None), 2);
    assert_eq!(exit_code.get(), Some(3));
}

#[test]
fn test_exit_hook_runs_once_per_quit() {
    let ctx = WindowContext::new(HeadlessBackend::new());
    let calls = Rc::new(Cell::new(0));
    let sink = Rc::clone(&calls);
    ctx.set_exit_hook(move |_| sink.set(sink.get() + 1));

    ctx.request_exit(0);
    ctx.request_exit(1);

    assert_eq!(ctx.pump(None), 1);
    assert_eq!(calls.get(), 1);
    assert_eq!(ctx.pump(None), 1);
    assert_eq!(calls.get(), 2);
    assert_eq!(ctx.pump(None), 0);
}

#[test]
fn test_exit_hook_may_replace_itself() {
    let ctx = Rc::new(WindowContext::new(HeadlessBackend::new()));
    let codes = Rc::new(RefCell::new(Vec::new()));

    let weak = Rc::downgrade(&ctx);
    let sink = Rc::clone(&codes);
    ctx.set_exit_hook(move |code| {
        sink.borrow_mut().push(code);
        if let Some(ctx) = weak.upgrade() {
            ctx.clear_exit_hook();
        }
    });

    ctx.request_exit(5);
    ctx.request_exit(6);
    ctx.pump(None);
    ctx.pump(None);

    assert_eq!(*codes.borrow(), vec![5]);
    assert!(ctx.exit_hook().is_none());
}

#[test]
fn test_two_windows_shared_loop() {
    init_tracing();
    let backend = HeadlessBackend::new();
    let ctx = WindowContext::new(backend.clone());
    let open = Rc::new(Cell::new(2));

    let mut windows = Vec::new();
    for title in ["left", "right"] {
        let window = ctx.create(200, 200, Some(title), None).unwrap();
        let counter = Rc::clone(&open);
        ctx.state(window)
            .unwrap()
            .event
            .window
            .destroy
            .set(move |ctx, _, _| {
                counter.set(counter.get() - 1);
                if counter.get() == 0 {
                    ctx.request_exit(0);
                }
            });
        windows.push(window);
    }

    let exited = Rc::new(Cell::new(false));
    let flag = Rc::clone(&exited);
    ctx.set_exit_hook(move |_| flag.set(true));

    // Default close handling destroys each window.
    backend.post_close(windows[0]);
    backend.post_close(windows[1]);
    while !exited.get() {
        ctx.pump(None);
    }

    assert_eq!(ctx.window_count(), 0);
    assert_eq!(backend.live_windows(), 0);
}
