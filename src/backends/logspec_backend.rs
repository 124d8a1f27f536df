use super::{
    log_router::{self, RoutedLogger},
    read_to_string, without_comments, ActiveBackend,
};
use crate::{level::LevelRequest, CanonicalLevel, LogSpecification, LoggingSetupError};
use log::LevelFilter;
use std::{
    io::{self, Read, Write},
    sync::{Arc, PoisonError, RwLock},
};

/// The backend for the `log` facade, driven by a [`LogSpecification`].
///
/// Records are written to stderr if the module filters let them pass and,
/// with feature `textfilter`, if their text matches the text filter.
/// Every change also adapts `log::max_level()`.
#[derive(Debug)]
pub struct LogspecBackend {
    logger: LogspecLogger,
}

// Cheap to clone; all clones share the same specification.
#[derive(Clone, Debug)]
pub(crate) struct LogspecLogger {
    spec: Arc<RwLock<LogSpecification>>,
}

pub(crate) fn initialize(
    input: &mut dyn Read,
    name: Option<&str>,
) -> Result<ActiveBackend, LoggingSetupError> {
    let content = read_to_string(input)?;
    // the built-in default is toml
    let spec = match name {
        Some(name) if !name.ends_with(".toml") => LogSpecification::parse(
            without_comments(&content, &['#'])
                .map(|(_, line)| line)
                .collect::<Vec<_>>()
                .join(","),
        )?,
        _ => LogSpecification::from_toml(&content)?,
    };
    let logger = LogspecLogger::new(spec);
    log_router::route_to(RoutedLogger::Logspec(logger.clone()))?;
    log::set_max_level(logger.max_level());
    Ok(ActiveBackend::Logspec(LogspecBackend { logger }))
}

// Continues with the specification of the live logger, if there is one.
pub(crate) fn attach() -> ActiveBackend {
    let logger = match log_router::current() {
        Some(RoutedLogger::Logspec(logger)) => logger,
        _ => {
            let logger = LogspecLogger::new(LogSpecification::global(LevelFilter::Info));
            if log_router::route_to(RoutedLogger::Logspec(logger.clone())).is_ok() {
                log::set_max_level(logger.max_level());
            }
            logger
        }
    };
    ActiveBackend::Logspec(LogspecBackend { logger })
}

impl LogspecBackend {
    pub(crate) fn set_level(&self, module: &str, request: LevelRequest) {
        let module = if module.is_empty() {
            None
        } else {
            Some(module)
        };
        let max_level = {
            let mut spec = self.logger.write();
            match native_level(request) {
                None => spec.remove_module(module),
                Some(level_filter) => spec.set_module_level(module, level_filter),
            }
            spec.max_level()
        };
        log::set_max_level(max_level);
    }

    /// A copy of the current log specification.
    #[must_use]
    pub fn spec(&self) -> LogSpecification {
        self.logger.read().clone()
    }

    /// The shared log specification that level changes are applied to.
    #[must_use]
    pub fn shared_spec(&self) -> Arc<RwLock<LogSpecification>> {
        Arc::clone(&self.logger.spec)
    }

    /// The level filter that applies to the given module.
    #[must_use]
    pub fn level_for(&self, module: &str) -> LevelFilter {
        self.logger.read().level_for(module)
    }

    /// The explicitly configured level filter for exactly this module, if any.
    #[must_use]
    pub fn explicit_level(&self, module: &str) -> Option<LevelFilter> {
        self.logger.read().explicit_level(module)
    }
}

impl LogspecLogger {
    fn new(spec: LogSpecification) -> Self {
        Self {
            spec: Arc::new(RwLock::new(spec)),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, LogSpecification> {
        self.spec.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, LogSpecification> {
        self.spec.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn max_level(&self) -> LevelFilter {
        self.read().max_level()
    }

    // Writes the record if the specification lets it pass.
    fn write_record(&self, record: &log::Record, w: &mut dyn Write) -> io::Result<()> {
        let spec = self.read();
        if record.level() > spec.level_for(record.target()) {
            return Ok(());
        }
        #[cfg(feature = "textfilter")]
        if let Some(filter) = spec.text_filter() {
            if !filter.is_match(&record.args().to_string()) {
                return Ok(());
            }
        }
        writeln!(
            w,
            "{} [{}] {}",
            record.level(),
            record.module_path().unwrap_or("<unnamed>"),
            record.args()
        )
    }
}

impl log::Log for LogspecLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.read().level_for(metadata.target())
    }

    fn log(&self, record: &log::Record) {
        // nowhere to report a failing stderr
        self.write_record(record, &mut io::stderr().lock()).ok();
    }

    fn flush(&self) {
        io::stderr().flush().ok();
    }
}

// Unsupported names fail closed.
fn native_level(request: LevelRequest) -> Option<LevelFilter> {
    match request {
        LevelRequest::Unset => None,
        LevelRequest::Unsupported => Some(LevelFilter::Off),
        LevelRequest::All => Some(LevelFilter::Trace),
        LevelRequest::Level(level) => Some(match level {
            CanonicalLevel::Trace => LevelFilter::Trace,
            CanonicalLevel::Debug => LevelFilter::Debug,
            CanonicalLevel::Info => LevelFilter::Info,
            CanonicalLevel::Warn => LevelFilter::Warn,
            CanonicalLevel::Error => LevelFilter::Error,
            CanonicalLevel::Off => LevelFilter::Off,
        }),
    }
}

pub(crate) fn to_canonical(level: LevelFilter) -> CanonicalLevel {
    match level {
        LevelFilter::Trace => CanonicalLevel::Trace,
        LevelFilter::Debug => CanonicalLevel::Debug,
        LevelFilter::Info => CanonicalLevel::Info,
        LevelFilter::Warn => CanonicalLevel::Warn,
        LevelFilter::Error => CanonicalLevel::Error,
        LevelFilter::Off => CanonicalLevel::Off,
    }
}
