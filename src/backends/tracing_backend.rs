use super::{read_to_string, without_comments, ActiveBackend};
use crate::{defaults, level::LevelRequest, CanonicalLevel, LogSpecification, LoggingSetupError};
use std::{
    collections::BTreeMap,
    fmt,
    io::Read,
    sync::{OnceLock, PoisonError, RwLock},
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt as tracing_fmt, layer::SubscriberExt, reload, EnvFilter, Registry};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

// `None` if someone else installed the global subscriber first.
static SUBSCRIBER: OnceLock<Option<FilterHandle>> = OnceLock::new();

/// The `tracing` backend.
///
/// The first configuration installs the process-wide subscriber: a registry
/// with a reloadable [`EnvFilter`] and a formatting layer that writes to stderr.
/// Every level change rebuilds the filter from the current directives and
/// swaps it in.
#[derive(Debug)]
pub struct TracingBackend {
    directives: RwLock<Directives>,
    o_filter_handle: Option<FilterHandle>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Directives {
    default: Option<LevelFilter>,
    targets: BTreeMap<String, LevelFilter>,
    // span and field directives are passed through untouched
    other: Vec<String>,
}

pub(crate) fn initialize(
    input: &mut dyn Read,
    name: Option<&str>,
) -> Result<ActiveBackend, LoggingSetupError> {
    let content = read_to_string(input)?;
    let directives = if name.is_some_and(|name| name.ends_with(".toml")) {
        let logspec = LogSpecification::from_toml(&content)?;
        #[cfg(feature = "textfilter")]
        if logspec.text_filter().is_some() {
            return Err(LoggingSetupError::Parse(
                vec!["global_pattern is not supported for tracing".to_string()],
                logspec,
            ));
        }
        Directives::from_logspec(&logspec)
    } else {
        let joined = without_comments(&content, &['#'])
            .flat_map(|(_, line)| line.split(','))
            .map(str::trim)
            .filter(|directive| !directive.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        // validate with tracing's own parser before splitting
        EnvFilter::builder().parse(&joined)?;
        Directives::parse(&joined)?
    };
    let filter_handle = install().ok_or(LoggingSetupError::EngineTaken("tracing subscriber"))?;
    let backend = TracingBackend {
        directives: RwLock::new(directives),
        o_filter_handle: Some(filter_handle),
    };
    backend.apply();
    Ok(ActiveBackend::Tracing(backend))
}

// Continues with the filter that is currently installed.
pub(crate) fn attach() -> ActiveBackend {
    let o_filter_handle = install();
    let directives = o_filter_handle
        .as_ref()
        .and_then(|handle| handle.with_current(ToString::to_string).ok())
        .and_then(|current| Directives::parse(&current).ok())
        .unwrap_or_default();
    ActiveBackend::Tracing(TracingBackend {
        directives: RwLock::new(directives),
        o_filter_handle,
    })
}

fn install() -> Option<FilterHandle> {
    SUBSCRIBER
        .get_or_init(|| {
            let (filter, filter_handle) =
                reload::Layer::new(EnvFilter::builder().parse_lossy(defaults::TRACING_FILTER));
            let subscriber = Registry::default()
                .with(filter)
                .with(tracing_fmt::layer().with_writer(std::io::stderr));
            tracing::subscriber::set_global_default(subscriber)
                .ok()
                .map(|()| filter_handle)
        })
        .clone()
}

impl TracingBackend {
    pub(crate) fn set_level(&self, target: &str, request: LevelRequest) {
        {
            let mut directives = self
                .directives
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            match native_level(request) {
                None if target.is_empty() => directives.default = None,
                None => {
                    directives.targets.remove(target);
                }
                Some(level) if target.is_empty() => directives.default = Some(level),
                Some(level) => {
                    directives.targets.insert(target.to_string(), level);
                }
            }
        }
        self.apply();
    }

    // Swaps the current directives into the installed subscriber.
    fn apply(&self) {
        if let Some(ref filter_handle) = self.o_filter_handle {
            // fails only if the subscriber was dropped, and the global one never is
            filter_handle.reload(self.env_filter()).ok();
        }
    }

    /// True if the level changes reach the installed `tracing` subscriber.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.o_filter_handle.is_some()
    }

    /// The level filter that applies to the given target.
    ///
    /// The longest matching target prefix wins; without a match the default
    /// directive applies, and without a default everything is off.
    #[must_use]
    pub fn level_for(&self, target: &str) -> LevelFilter {
        let directives = self
            .directives
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        directives
            .targets
            .iter()
            .filter(|(prefix, _)| target.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, level)| *level)
            .or(directives.default)
            .unwrap_or(LevelFilter::OFF)
    }

    /// The explicitly configured level for exactly this target, if any.
    #[must_use]
    pub fn explicit_level(&self, target: &str) -> Option<LevelFilter> {
        self.directives
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .targets
            .get(target)
            .copied()
    }

    /// The current directives, in `EnvFilter` syntax.
    #[must_use]
    pub fn directives(&self) -> String {
        self.directives
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .to_string()
    }

    /// Builds a fresh `EnvFilter` from the current directives.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::OFF.into())
            .parse_lossy(self.directives())
    }
}

impl Directives {
    fn parse(s: &str) -> Result<Self, LoggingSetupError> {
        let mut directives = Self::default();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part.contains('[') || part.contains('{') {
                directives.other.push(part.to_string());
            } else if let Some((target, level)) = part.rsplit_once('=') {
                let level = parse_level_filter(level)?;
                directives.targets.insert(target.trim().to_string(), level);
            } else if let Ok(level) = parse_level_filter(part) {
                directives.default = Some(level);
            } else {
                directives
                    .targets
                    .insert(part.to_string(), LevelFilter::TRACE);
            }
        }
        Ok(directives)
    }

    fn from_logspec(logspec: &LogSpecification) -> Self {
        let mut directives = Self::default();
        for mf in logspec.module_filters() {
            let level = from_log_level_filter(mf.level_filter);
            match mf.module_name {
                Some(ref name) => {
                    directives.targets.insert(name.clone(), level);
                }
                None => directives.default = Some(level),
            }
        }
        directives
    }
}

impl fmt::Display for Directives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(self.targets.len() + self.other.len() + 1);
        if let Some(level) = self.default {
            parts.push(level.to_string().to_lowercase());
        }
        for (target, level) in &self.targets {
            parts.push(format!("{target}={}", level.to_string().to_lowercase()));
        }
        parts.extend(self.other.iter().cloned());
        f.write_str(&parts.join(","))
    }
}

fn parse_level_filter(s: &str) -> Result<LevelFilter, LoggingSetupError> {
    s.trim()
        .parse::<LevelFilter>()
        .map_err(|e| LoggingSetupError::LevelFilter(format!("{e}: {s}")))
}

// Unsupported names fail closed.
fn native_level(request: LevelRequest) -> Option<LevelFilter> {
    match request {
        LevelRequest::Unset => None,
        LevelRequest::Unsupported => Some(LevelFilter::OFF),
        LevelRequest::All => Some(LevelFilter::TRACE),
        LevelRequest::Level(level) => Some(match level {
            CanonicalLevel::Trace => LevelFilter::TRACE,
            CanonicalLevel::Debug => LevelFilter::DEBUG,
            CanonicalLevel::Info => LevelFilter::INFO,
            CanonicalLevel::Warn => LevelFilter::WARN,
            CanonicalLevel::Error => LevelFilter::ERROR,
            CanonicalLevel::Off => LevelFilter::OFF,
        }),
    }
}

pub(crate) fn to_canonical(level: LevelFilter) -> CanonicalLevel {
    if level == LevelFilter::TRACE {
        CanonicalLevel::Trace
    } else if level == LevelFilter::DEBUG {
        CanonicalLevel::Debug
    } else if level == LevelFilter::INFO {
        CanonicalLevel::Info
    } else if level == LevelFilter::WARN {
        CanonicalLevel::Warn
    } else if level == LevelFilter::ERROR {
        CanonicalLevel::Error
    } else {
        CanonicalLevel::Off
    }
}

fn from_log_level_filter(level: log::LevelFilter) -> LevelFilter {
    match level {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::{initialize, ActiveBackend, TracingBackend};
    use crate::level::LevelRequest;
    use crate::{CanonicalLevel, LoggingSetupError};
    use tracing::level_filters::LevelFilter;

    fn init(content: &str, name: Option<&str>) -> Result<TracingBackend, LoggingSetupError> {
        match initialize(&mut content.as_bytes(), name)? {
            ActiveBackend::Tracing(backend) => Ok(backend),
            other => panic!("unexpected backend {other:?}"),
        }
    }

    #[test]
    fn filter_syntax() {
        let backend = init("# comment\nwarn\nmy_crate::db=debug, my_crate=info\n", None).unwrap();
        assert_eq!(backend.level_for("my_crate::db::pool"), LevelFilter::DEBUG);
        assert_eq!(backend.level_for("my_crate::web"), LevelFilter::INFO);
        assert_eq!(backend.level_for("other"), LevelFilter::WARN);
        assert_eq!(backend.directives(), "warn,my_crate=info,my_crate::db=debug");
        let filter = backend.env_filter().to_string();
        for directive in ["warn", "my_crate=info", "my_crate::db=debug"] {
            assert!(filter.split(',').any(|d| d == directive), "{directive} in {filter}");
        }
    }

    #[test]
    fn toml_syntax() {
        let backend = init(
            "global_level = \"error\"\n[modules]\n\"a::b\" = \"trace\"\n",
            Some("tracing.toml"),
        )
        .unwrap();
        assert_eq!(backend.level_for("a::b"), LevelFilter::TRACE);
        assert_eq!(backend.level_for("c"), LevelFilter::ERROR);
    }

    #[cfg(feature = "textfilter")]
    #[test]
    fn text_filter_is_rejected() {
        assert!(matches!(
            init("global_level = \"info\"\nglobal_pattern = \"x\"", Some("tracing.toml")),
            Err(LoggingSetupError::Parse(..))
        ));
    }

    #[test]
    fn malformed_filter_is_rejected() {
        assert!(matches!(
            init("my_crate=loud", Some("tracing.filter")),
            Err(LoggingSetupError::Filter(_))
        ));
    }

    #[test]
    fn levels_map_to_native_and_fail_closed() {
        let backend = init("info", None).unwrap();
        backend.set_level("my::logger", LevelRequest::Level(CanonicalLevel::Warn));
        assert_eq!(backend.explicit_level("my::logger"), Some(LevelFilter::WARN));

        backend.set_level("my::logger", LevelRequest::Unsupported);
        assert_eq!(backend.explicit_level("my::logger"), Some(LevelFilter::OFF));

        backend.set_level("my::logger", LevelRequest::Unset);
        assert_eq!(backend.explicit_level("my::logger"), None);
        assert_eq!(backend.level_for("my::logger"), LevelFilter::INFO);

        backend.set_level("", LevelRequest::Level(CanonicalLevel::Debug));
        assert_eq!(backend.level_for("anything"), LevelFilter::DEBUG);

        backend.set_level("chatty", LevelRequest::All);
        assert_eq!(backend.explicit_level("chatty"), Some(LevelFilter::TRACE));
    }

    #[test]
    fn empty_directives_switch_everything_off() {
        let backend = init("", Some("tracing.filter")).unwrap();
        assert_eq!(backend.directives(), "");
        assert_eq!(backend.env_filter().to_string(), "off");
    }
}
