//! Runs the maximize/close sequence against the headless backend.
//!
//! ```sh
//! RUST_LOG=trace cargo run -p horizon-lattice-window --example maximize_toggle
//! ```

use horizon_lattice_window::{
    HeadlessBackend, WindowContext, WindowHandle, WindowState, error_message,
};

fn on_maximize(ctx: &WindowContext, window: WindowHandle, state: &WindowState) {
    ctx.set_title(window, "Maximized Window");
    state.event.window.maximize.set(on_maximize_another);
}

fn on_maximize_another(ctx: &WindowContext, window: WindowHandle, state: &WindowState) {
    ctx.set_title(window, "Maximized(another) Window");
    state.event.window.maximize.set(on_maximize);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let backend = HeadlessBackend::new();
    let ctx = WindowContext::new(backend.clone());
    ctx.set_exit_hook(|code| println!("exit hook called with {code}"));

    let window = match ctx.create(400, 100, Some("Window 1"), None) {
        Ok(window) => window,
        Err(err) => {
            eprintln!("{err} ({})", error_message(ctx.last_error().as_raw()));
            std::process::exit(1);
        }
    };
    ctx.show(window);

    let state = ctx.state(window).expect("state attached after create");
    state.event.window.maximize.set(on_maximize);
    state.event.window.close.set(|ctx, _, state| {
        state.set_running(false);
        ctx.request_exit(0);
    });

    for _ in 0..2 {
        backend.post_maximize(window);
        ctx.pump(None);
        println!("title: {}", ctx.title(window).unwrap_or_default());
    }

    backend.post_close(window);
    while state.is_running() {
        ctx.pump(None);
    }
}
