//! Free functions that operate on the process-wide [`LoggingSystem`].
//!
//! They are meant for hosts that do not want to pass a `LoggingSystem` around:
//!
//! ```rust
//! use logging_setup::log_ctl;
//!
//! log_ctl::log_logging_setup(true);
//! log_ctl::ensure_configured().unwrap();
//! log_ctl::set_warn("noisy::dependency").unwrap();
//! ```
//!
//! Which backends are installed is taken from the environment, see
//! [`LoggingSystem::from_env`], unless the host installed its own instance
//! with [`LoggingSystem::install_global`] before the first call.

use crate::{BackendHandle, LoggingSetupError, LoggingSystem};

/// See [`LoggingSystem::ensure_configured`].
///
/// # Errors
///
/// See [`LoggingSystem::ensure_configured`].
pub fn ensure_configured() -> Result<BackendHandle, LoggingSetupError> {
    LoggingSystem::global().ensure_configured()
}

/// See [`LoggingSystem::allow_reset`].
pub fn allow_reset(allow: bool) {
    LoggingSystem::global().allow_reset(allow);
}

/// See [`LoggingSystem::set_path_base`].
pub fn set_path_base(o_path_base: Option<&str>) {
    LoggingSystem::global().set_path_base(o_path_base);
}

/// See [`LoggingSystem::get_path_base`].
#[must_use]
pub fn get_path_base() -> Option<String> {
    LoggingSystem::global().get_path_base()
}

/// See [`LoggingSystem::log_logging_setup`].
pub fn log_logging_setup(verbose: bool) {
    LoggingSystem::global().log_logging_setup(verbose);
}

/// See [`LoggingSystem::handle`].
#[must_use]
pub fn handle() -> BackendHandle {
    LoggingSystem::global().handle()
}

/// See [`LoggingSystem::set_level`].
///
/// # Errors
///
/// See [`LoggingSystem::ensure_configured`].
pub fn set_level(logger: &str, o_level: Option<&str>) -> Result<(), LoggingSetupError> {
    LoggingSystem::global().set_level(logger, o_level)
}

/// See [`LoggingSystem::enable`].
///
/// # Errors
///
/// See [`LoggingSystem::ensure_configured`].
pub fn enable(logger: &str) -> Result<(), LoggingSetupError> {
    LoggingSystem::global().enable(logger)
}

/// See [`LoggingSystem::disable`].
///
/// # Errors
///
/// See [`LoggingSystem::ensure_configured`].
pub fn disable(logger: &str) -> Result<(), LoggingSetupError> {
    LoggingSystem::global().disable(logger)
}

/// See [`LoggingSystem::set_info`].
///
/// # Errors
///
/// See [`LoggingSystem::ensure_configured`].
pub fn set_info(logger: &str) -> Result<(), LoggingSetupError> {
    LoggingSystem::global().set_info(logger)
}

/// See [`LoggingSystem::set_warn`].
///
/// # Errors
///
/// See [`LoggingSystem::ensure_configured`].
pub fn set_warn(logger: &str) -> Result<(), LoggingSetupError> {
    LoggingSystem::global().set_warn(logger)
}

/// See [`LoggingSystem::set_error`].
///
/// # Errors
///
/// See [`LoggingSystem::ensure_configured`].
pub fn set_error(logger: &str) -> Result<(), LoggingSetupError> {
    LoggingSystem::global().set_error(logger)
}
