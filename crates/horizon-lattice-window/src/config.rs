//! Configuration for a [`WindowContext`].

use std::num::NonZeroUsize;

use crate::backend::NativeBackend;
use crate::context::WindowContext;

/// Default name of the window class registered by a context.
pub const DEFAULT_CLASS_NAME: &str = "horizon-lattice-window";

/// Default upper bound on the touch contacts delivered per notification.
pub const DEFAULT_MAX_TOUCH_POINTS: usize = 10;

/// Configuration for a [`WindowContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Name of the window class registered on first window creation.
    pub class_name: String,
    /// Maximum number of touch contacts delivered for one touch notification.
    pub max_touch_points: usize,
    /// Maximum number of live windows. `None` means unlimited.
    pub max_windows: Option<usize>,
    /// Maximum number of notifications one pump call processes. `None` drains
    /// the queue.
    pub pump_budget: Option<NonZeroUsize>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            class_name: DEFAULT_CLASS_NAME.to_string(),
            max_touch_points: DEFAULT_MAX_TOUCH_POINTS,
            max_windows: None,
            pump_budget: None,
        }
    }
}

impl ContextConfig {
    /// Create a configuration with the given class name.
    pub fn with_class_name(name: impl Into<String>) -> Self {
        Self {
            class_name: name.into(),
            ..Default::default()
        }
    }
}

/// Builder for creating a [`WindowContext`] with custom configuration.
///
/// ```
/// use horizon_lattice_window::{ContextBuilder, HeadlessBackend};
///
/// let ctx = ContextBuilder::new()
///     .class_name("editor")
///     .max_windows(4)
///     .build(HeadlessBackend::new());
/// assert_eq!(ctx.config().class_name, "editor");
/// ```
#[derive(Debug, Default)]
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class_name(mut self, name: impl Into<String>) -> Self {
        self.config.class_name = name.into();
        self
    }

    pub fn max_touch_points(mut self, count: usize) -> Self {
        self.config.max_touch_points = count;
        self
    }

    pub fn max_windows(mut self, count: usize) -> Self {
        self.config.max_windows = Some(count);
        self
    }

    /// Limit how many notifications one pump call takes. A budget of 0 means
    /// no limit.
    pub fn pump_budget(mut self, count: usize) -> Self {
        self.config.pump_budget = NonZeroUsize::new(count);
        self
    }

    /// Build the context on top of `backend`.
    pub fn build(self, backend: impl NativeBackend + 'static) -> WindowContext {
        WindowContext::with_config(backend, self.config)
    }
}
