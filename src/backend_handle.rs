use crate::{backends::ActiveBackend, level::LevelRequest, BackendId, CanonicalLevel};
use std::sync::Arc;

/// Controls the levels of the backend that was configured.
///
/// A `BackendHandle` is returned from
/// [`LoggingSystem::ensure_configured`](crate::LoggingSystem::ensure_configured).
/// Clones share the same backend state. As long as no backend was configured,
/// the handle addresses the no-op backend and silently accepts all calls.
///
/// Level names are case-insensitive; besides the canonical names, `warning`,
/// `severe` and `all` are understood. Unknown names do not fail, they switch the
/// logger off. An empty logger name addresses the root (default) level.
///
/// ```rust
/// use logging_setup::{markers, LoggingSystem};
///
/// let system = LoggingSystem::builder()
///     .markers(markers::Markers::new([markers::STDERR_LOGGER]))
///     .build();
/// let handle = system.ensure_configured().unwrap();
/// handle.set_level("my::db", Some("warn"));
/// handle.enable("my::db::pool");
/// ```
#[derive(Clone, Debug)]
pub struct BackendHandle(Arc<ActiveBackend>);

impl BackendHandle {
    pub(crate) fn new(backend: ActiveBackend) -> Self {
        Self(Arc::new(backend))
    }

    pub(crate) fn no_op() -> Self {
        Self::new(ActiveBackend::NoOp)
    }

    /// Which backend is controlled.
    #[must_use]
    pub fn id(&self) -> BackendId {
        self.0.id()
    }

    /// True if no backend was configured.
    #[must_use]
    pub fn is_no_op(&self) -> bool {
        self.id() == BackendId::NoOp
    }

    /// Access to the backend-specific state.
    #[must_use]
    pub fn backend(&self) -> &ActiveBackend {
        &self.0
    }

    /// Sets the level of a logger.
    ///
    /// `None` removes an explicit level, so that the logger inherits again.
    /// Unknown level names switch the logger off.
    pub fn set_level(&self, logger: &str, o_level: Option<&str>) {
        self.0.set_level(logger, LevelRequest::from_name(o_level));
    }

    /// Like [`BackendHandle::set_level`], with a typed level.
    pub fn set_canonical_level(&self, logger: &str, o_level: Option<CanonicalLevel>) {
        self.0.set_level(logger, LevelRequest::from(o_level));
    }

    /// Lets everything of the logger through, the same as level name `all`.
    ///
    /// Backends with levels below `trace` open those as well.
    pub fn enable(&self, logger: &str) {
        self.0.set_level(logger, LevelRequest::All);
    }

    /// Switches the logger off.
    pub fn disable(&self, logger: &str) {
        self.set_canonical_level(logger, Some(CanonicalLevel::Off));
    }

    /// Sets the logger to `info`.
    pub fn set_info(&self, logger: &str) {
        self.set_canonical_level(logger, Some(CanonicalLevel::Info));
    }

    /// Sets the logger to `warn`.
    pub fn set_warn(&self, logger: &str) {
        self.set_canonical_level(logger, Some(CanonicalLevel::Warn));
    }

    /// Sets the logger to `error`.
    pub fn set_error(&self, logger: &str) {
        self.set_canonical_level(logger, Some(CanonicalLevel::Error));
    }

    /// The level that currently applies to the logger, `None` for the no-op backend.
    #[must_use]
    pub fn effective_level(&self, logger: &str) -> Option<CanonicalLevel> {
        self.0.effective_level(logger)
    }

    /// True if both handles control the very same backend instance.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::BackendHandle;
    use crate::{
        backends::{stderr_backend, ActiveBackend, Severity},
        BackendId, CanonicalLevel,
    };

    // Own levels, not shared with the live logger of other tests.
    fn stderr_handle() -> BackendHandle {
        BackendHandle::new(stderr_backend::initialize(&mut &b".level = INFO"[..], None).unwrap())
    }

    #[test]
    fn no_op_accepts_everything() {
        let handle = BackendHandle::no_op();
        assert!(handle.is_no_op());
        handle.set_level("a", Some("debug"));
        handle.set_level("a", Some("bogus"));
        handle.set_level("a", None);
        handle.enable("a");
        handle.disable("a");
        assert_eq!(handle.effective_level("a"), None);
    }

    #[test]
    fn sugar_maps_to_levels() {
        let handle = stderr_handle();
        assert_eq!(handle.id(), BackendId::Stderr);

        handle.set_warn("app");
        assert_eq!(handle.effective_level("app::io"), Some(CanonicalLevel::Warn));
        handle.set_error("app");
        assert_eq!(handle.effective_level("app"), Some(CanonicalLevel::Error));
        handle.disable("app");
        assert_eq!(handle.effective_level("app"), Some(CanonicalLevel::Off));
        handle.set_level("app", None);
        assert_eq!(handle.effective_level("app"), Some(CanonicalLevel::Info));

        let clone = handle.clone();
        assert!(clone.same_as(&handle));
        assert!(!BackendHandle::no_op().same_as(&handle));
    }

    #[test]
    fn enable_opens_all_native_levels() {
        let handle = stderr_handle();
        let ActiveBackend::Stderr(stderr) = handle.backend() else {
            panic!("unexpected backend {:?}", handle.backend());
        };

        handle.enable("app");
        assert_eq!(stderr.explicit_level("app"), Some(Severity::All));
        assert!(stderr.is_enabled("app::deep", Severity::Finest));
        assert_eq!(handle.effective_level("app"), Some(CanonicalLevel::Trace));

        handle.set_level("app", Some("trace"));
        assert_eq!(stderr.explicit_level("app"), Some(Severity::Finest));
        handle.set_level("app", Some("ALL"));
        assert_eq!(stderr.explicit_level("app"), Some(Severity::All));
    }
}
