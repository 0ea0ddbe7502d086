//! Tracing integration for the window dispatch engine.
//!
//! The engine logs through the `tracing` crate and never installs a
//! subscriber itself. Applications pick one:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_lattice_window::dispatch=trace")
//!     .init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Engine-wide target.
    pub const CORE: &str = "horizon_lattice_window";
    /// Notification routing.
    pub const DISPATCH: &str = "horizon_lattice_window::dispatch";
    /// Message pump and exit hook.
    pub const PUMP: &str = "horizon_lattice_window::pump";
    /// Window class registration.
    pub const CLASS: &str = "horizon_lattice_window::class";
    /// Per-window state lifecycle.
    pub const STATE: &str = "horizon_lattice_window::state";
    /// Backend implementations.
    pub const BACKEND: &str = "horizon_lattice_window::backend";
}
