//! One-time window class registration.

use std::cell::Cell;

use crate::backend::NativeBackend;
use crate::error::WindowError;
use crate::logging::targets;

/// The native window type every window of a context is created from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowClass {
    name: String,
}

impl WindowClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Registration {
    Pending,
    Registered,
    Failed,
}

/// Registers the window class on first use.
///
/// Registration is attempted at most once. A failure is terminal: every later
/// request fails without touching the backend again.
#[derive(Debug)]
pub(crate) struct ClassRegistry {
    class: WindowClass,
    registration: Cell<Registration>,
}

impl ClassRegistry {
    pub fn new(class: WindowClass) -> Self {
        Self {
            class,
            registration: Cell::new(Registration::Pending),
        }
    }

    pub fn class(&self) -> &WindowClass {
        &self.class
    }

    pub fn is_registered(&self) -> bool {
        self.registration.get() == Registration::Registered
    }

    pub fn ensure_registered(&self, backend: &dyn NativeBackend) -> Result<(), WindowError> {
        match self.registration.get() {
            Registration::Registered => Ok(()),
            Registration::Failed => Err(self.failure()),
            Registration::Pending => match backend.register_class(&self.class) {
                Ok(()) => {
                    tracing::debug!(target: targets::CLASS, class = self.class.name(), "window class registered");
                    self.registration.set(Registration::Registered);
                    Ok(())
                }
                Err(err) => {
                    tracing::error!(target: targets::CLASS, class = self.class.name(), %err, "window class registration failed");
                    self.registration.set(Registration::Failed);
                    Err(self.failure())
                }
            },
        }
    }

    fn failure(&self) -> WindowError {
        WindowError::RegisterClass {
            class: self.class.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessBackend;

    #[test]
    fn test_registers_once() {
        let backend = HeadlessBackend::new();
        let registry = ClassRegistry::new(WindowClass::new("main"));
        assert!(!registry.is_registered());

        registry.ensure_registered(&backend).unwrap();
        registry.ensure_registered(&backend).unwrap();

        assert!(registry.is_registered());
        assert_eq!(backend.class_registrations(), 1);
    }

    #[test]
    fn test_failure_is_terminal() {
        let backend = HeadlessBackend::new();
        backend.set_fail_class_registration(true);
        let registry = ClassRegistry::new(WindowClass::new("main"));

        assert!(registry.ensure_registered(&backend).is_err());

        // Even once the backend would accept it, no retry happens.
        backend.set_fail_class_registration(false);
        let err = registry.ensure_registered(&backend).unwrap_err();
        assert!(matches!(err, WindowError::RegisterClass { ref class } if class == "main"));
        assert_eq!(backend.class_registration_attempts(), 1);
        assert!(!registry.is_registered());
    }
}
