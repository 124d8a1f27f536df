use super::{
    log_router::{self, RoutedLogger},
    read_to_string, without_comments, ActiveBackend,
};
use crate::{level::LevelRequest, CanonicalLevel, LoggingSetupError};
use std::{
    collections::BTreeMap,
    fmt,
    io::{self, Read, Write},
    str::FromStr,
    sync::{Arc, PoisonError, RwLock},
};

/// Native levels of the minimal stderr logger, most verbose first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Everything.
    All,
    /// Highly detailed tracing.
    Finest,
    /// Fairly detailed tracing.
    Finer,
    /// Tracing.
    Fine,
    /// Static configuration messages.
    Config,
    /// Informational messages.
    Info,
    /// Potential problems.
    Warning,
    /// Serious failures.
    Severe,
    /// Nothing.
    Off,
}

impl Severity {
    /// Translates a native level back into the canonical vocabulary.
    #[must_use]
    pub fn to_canonical(self) -> CanonicalLevel {
        match self {
            Self::All | Self::Finest | Self::Finer => CanonicalLevel::Trace,
            Self::Fine => CanonicalLevel::Debug,
            Self::Config | Self::Info => CanonicalLevel::Info,
            Self::Warning => CanonicalLevel::Warn,
            Self::Severe => CanonicalLevel::Error,
            Self::Off => CanonicalLevel::Off,
        }
    }

    /// The severity of a record of the `log` facade.
    #[must_use]
    pub fn from_log_level(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Severe,
            log::Level::Warn => Self::Warning,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Fine,
            log::Level::Trace => Self::Finest,
        }
    }

    /// The name as used in properties files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Finest => "FINEST",
            Self::Finer => "FINER",
            Self::Fine => "FINE",
            Self::Config => "CONFIG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Severe => "SEVERE",
            Self::Off => "OFF",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = LoggingSetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::All,
            Self::Finest,
            Self::Finer,
            Self::Fine,
            Self::Config,
            Self::Info,
            Self::Warning,
            Self::Severe,
            Self::Off,
        ]
        .into_iter()
        .find(|severity| severity.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| LoggingSetupError::LevelFilter(format!("unknown severity: {s}")))
    }
}

/// The minimal stderr logger.
///
/// Logger names form a hierarchy along `.` and `::` separators;
/// a logger without own level inherits from its closest ancestor,
/// and finally from the root level.
/// Records of the `log` facade are written to stderr, with their target as logger name.
#[derive(Debug)]
pub struct StderrBackend {
    logger: StderrLogger,
}

// Cheap to clone; all clones share the same levels.
#[derive(Clone, Debug)]
pub(crate) struct StderrLogger {
    levels: Arc<RwLock<Levels>>,
}

#[derive(Debug, Default)]
struct Levels {
    root: Option<Severity>,
    loggers: BTreeMap<String, Severity>,
}

const LEVEL_SUFFIX: &str = ".level";

pub(crate) fn initialize(
    input: &mut dyn Read,
    _name: Option<&str>,
) -> Result<ActiveBackend, LoggingSetupError> {
    let content = read_to_string(input)?;
    let mut levels = Levels::default();
    for (line_no, line) in without_comments(&content, &['#', '!']) {
        let Some((key, value)) = line.split_once('=') else {
            return Err(LoggingSetupError::Properties {
                line: line_no,
                reason: format!("expected 'key = value', found '{line}'"),
            });
        };
        let key = key.trim();
        // handlers, formatters etc. are not interpreted here
        let Some(logger) = key.strip_suffix(LEVEL_SUFFIX) else {
            continue;
        };
        let severity =
            value
                .parse::<Severity>()
                .map_err(|e| LoggingSetupError::Properties {
                    line: line_no,
                    reason: e.to_string(),
                })?;
        if logger.is_empty() {
            levels.root = Some(severity);
        } else {
            levels.loggers.insert(logger.to_string(), severity);
        }
    }
    let logger = StderrLogger::new(levels);
    log_router::route_to(RoutedLogger::Stderr(logger.clone()))?;
    // levels are inherited at runtime, so the facade can not pre-filter
    log::set_max_level(log::LevelFilter::Trace);
    Ok(ActiveBackend::Stderr(StderrBackend { logger }))
}

// Continues with the levels of the live logger, if there is one.
pub(crate) fn attach() -> ActiveBackend {
    let logger = match log_router::current() {
        Some(RoutedLogger::Stderr(logger)) => logger,
        _ => {
            let logger = StderrLogger::new(Levels {
                root: Some(Severity::Info),
                loggers: BTreeMap::new(),
            });
            if log_router::route_to(RoutedLogger::Stderr(logger.clone())).is_ok() {
                log::set_max_level(log::LevelFilter::Trace);
            }
            logger
        }
    };
    ActiveBackend::Stderr(StderrBackend { logger })
}

impl StderrBackend {
    pub(crate) fn set_level(&self, logger: &str, request: LevelRequest) {
        let mut levels = self.logger.write();
        match (native_level(request), logger.is_empty()) {
            (None, true) => levels.root = None,
            (None, false) => {
                levels.loggers.remove(logger);
            }
            (Some(severity), true) => levels.root = Some(severity),
            (Some(severity), false) => {
                levels.loggers.insert(logger.to_string(), severity);
            }
        }
    }

    /// The severity that applies to the given logger.
    #[must_use]
    pub fn level_for(&self, logger: &str) -> Severity {
        self.logger.read().level_for(logger)
    }

    /// The explicitly configured severity for exactly this logger, if any.
    #[must_use]
    pub fn explicit_level(&self, logger: &str) -> Option<Severity> {
        self.logger.read().loggers.get(logger).copied()
    }

    /// True if a message of the given severity would be written for the logger.
    #[must_use]
    pub fn is_enabled(&self, logger: &str, severity: Severity) -> bool {
        self.logger.read().is_enabled(logger, severity)
    }
}

impl Levels {
    fn level_for(&self, logger: &str) -> Severity {
        let mut name = logger;
        loop {
            if let Some(severity) = self.loggers.get(name) {
                return *severity;
            }
            match parent_of(name) {
                Some(parent) => name = parent,
                None => return self.root.unwrap_or(Severity::Info),
            }
        }
    }

    fn is_enabled(&self, logger: &str, severity: Severity) -> bool {
        let threshold = self.level_for(logger);
        threshold != Severity::Off && severity != Severity::Off && severity >= threshold
    }
}

impl StderrLogger {
    fn new(levels: Levels) -> Self {
        Self {
            levels: Arc::new(RwLock::new(levels)),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Levels> {
        self.levels.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Levels> {
        self.levels.write().unwrap_or_else(PoisonError::into_inner)
    }

    // Writes the record if the logger's level lets it pass.
    fn write_record(&self, record: &log::Record, w: &mut dyn Write) -> io::Result<()> {
        let severity = Severity::from_log_level(record.level());
        if !self.read().is_enabled(record.target(), severity) {
            return Ok(());
        }
        writeln!(w, "{severity} [{}] {}", record.target(), record.args())
    }
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.read()
            .is_enabled(metadata.target(), Severity::from_log_level(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        // nowhere to report a failing stderr
        self.write_record(record, &mut io::stderr().lock()).ok();
    }

    fn flush(&self) {
        io::stderr().flush().ok();
    }
}

fn parent_of(name: &str) -> Option<&str> {
    match (name.rfind("::"), name.rfind('.')) {
        (Some(a), Some(b)) => Some(&name[..a.max(b)]),
        (Some(a), None) => Some(&name[..a]),
        (None, Some(b)) => Some(&name[..b]),
        (None, None) => None,
    }
}

// Unsupported names fail closed.
fn native_level(request: LevelRequest) -> Option<Severity> {
    match request {
        LevelRequest::Unset => None,
        LevelRequest::Unsupported => Some(Severity::Off),
        LevelRequest::All => Some(Severity::All),
        LevelRequest::Level(level) => Some(match level {
            CanonicalLevel::Trace => Severity::Finest,
            CanonicalLevel::Debug => Severity::Fine,
            CanonicalLevel::Info => Severity::Info,
            CanonicalLevel::Warn => Severity::Warning,
            CanonicalLevel::Error => Severity::Severe,
            CanonicalLevel::Off => Severity::Off,
        }),
    }
}
