use super::{logspec_backend::LogspecLogger, stderr_backend::StderrLogger};
use crate::LoggingSetupError;
use log::Log;
use std::sync::{OnceLock, PoisonError, RwLock};

// The `log::Log` that is registered once per process; it forwards every
// record to the logger of the backend that was configured last.
struct LogRouter {
    target: RwLock<Option<RoutedLogger>>,
}

#[derive(Clone, Debug)]
pub(crate) enum RoutedLogger {
    Logspec(LogspecLogger),
    Stderr(StderrLogger),
}

static ROUTER: LogRouter = LogRouter {
    target: RwLock::new(None),
};

// false if someone else registered a logger first
static REGISTERED: OnceLock<bool> = OnceLock::new();

pub(crate) fn route_to(logger: RoutedLogger) -> Result<(), LoggingSetupError> {
    if !*REGISTERED.get_or_init(|| log::set_logger(&ROUTER).is_ok()) {
        return Err(LoggingSetupError::EngineTaken("log logger"));
    }
    *ROUTER
        .target
        .write()
        .unwrap_or_else(PoisonError::into_inner) = Some(logger);
    Ok(())
}

// The logger that records currently go to.
pub(crate) fn current() -> Option<RoutedLogger> {
    ROUTER
        .target
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

impl Log for LogRouter {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        match *self.target.read().unwrap_or_else(PoisonError::into_inner) {
            Some(RoutedLogger::Logspec(ref logger)) => logger.enabled(metadata),
            Some(RoutedLogger::Stderr(ref logger)) => logger.enabled(metadata),
            None => false,
        }
    }

    fn log(&self, record: &log::Record) {
        match *self.target.read().unwrap_or_else(PoisonError::into_inner) {
            Some(RoutedLogger::Logspec(ref logger)) => logger.log(record),
            Some(RoutedLogger::Stderr(ref logger)) => logger.log(record),
            None => {}
        }
    }

    fn flush(&self) {
        if let Some(ref logger) = *self.target.read().unwrap_or_else(PoisonError::into_inner) {
            match logger {
                RoutedLogger::Logspec(logger) => logger.flush(),
                RoutedLogger::Stderr(logger) => logger.flush(),
            }
        }
    }
}
