use crate::LoggingSetupError;
use log::LevelFilter;
#[cfg(feature = "textfilter")]
use regex::Regex;
use serde_derive::Deserialize;
use std::{collections::BTreeMap, fmt};

/// Defines which log lines are written, per module (or logger name),
/// and optionally by a text filter.
///
/// A `LogSpecification` can be parsed from a string that works essentially
/// like `env_logger`'s, but is a bit more tolerant with spaces:
///
/// ```text
/// <log_level_spec> ::= single_log_level_spec[{,single_log_level_spec}][/<text_filter>]
/// <single_log_level_spec> ::= <path_to_module>|<log_level>|<path_to_module>=<log_level>
/// <text_filter> ::= <regex>
/// ```
///
/// * If you just specify the module, without `log_level`, all levels will be traced for this module.
/// * If you just specify a log level, this will be applied as default to all modules without
///   explicit log level assigment.
/// * The module names are compared as Strings, with the side effect that a specified module filter
///   affects all modules whose name starts with this String.
///
/// It can also be read from a toml document:
///
/// ```toml
/// global_level = "info"
/// global_pattern = "foo"
///
/// [modules]
/// "mod1::mod2" = "debug"
/// "mod3" = "trace"
/// ```
#[derive(Clone, Debug, Default)]
pub struct LogSpecification {
    module_filters: Vec<ModuleFilter>,
    #[cfg(feature = "textfilter")]
    textfilter: Option<Regex>,
}

/// Defines which level filter to use for a given module (or as default, if no module is given).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleFilter {
    /// The module name, or `None` for the default.
    pub module_name: Option<String>,
    /// The level filter.
    pub level_filter: LevelFilter,
}

#[derive(Clone, Debug, Deserialize)]
struct LogSpecFileFormat {
    global_level: Option<String>,
    global_pattern: Option<String>,
    #[serde(default)]
    modules: BTreeMap<String, String>,
}

impl LogSpecification {
    /// Everything is switched off.
    #[must_use]
    pub fn off() -> Self {
        Self::default()
    }

    /// Returns a `LogSpecification` where all traces are switched on with the given level.
    #[must_use]
    pub fn global(level_filter: LevelFilter) -> Self {
        Self {
            module_filters: vec![ModuleFilter {
                module_name: None,
                level_filter,
            }],
            #[cfg(feature = "textfilter")]
            textfilter: None,
        }
    }

    /// Returns a log specification from a String
    /// (e.g: "crate1, crate2::mod_a, crate3::mod_x = error /foo").
    ///
    /// # Errors
    ///
    /// [`LoggingSetupError::Parse`] if the input is malformed; the error carries
    /// the specification that results from the parts that could be understood.
    pub fn parse<S: AsRef<str>>(spec: S) -> Result<Self, LoggingSetupError> {
        let spec = spec.as_ref();
        let mut parse_errs = Vec::<String>::new();
        let mut dirs = Vec::<ModuleFilter>::new();

        let mut parts = spec.split('/');
        let mods = parts.next();
        #[cfg(feature = "textfilter")]
        let filter = parts.next();
        #[cfg(not(feature = "textfilter"))]
        let _ = parts.next();
        if parts.next().is_some() {
            push_err(
                &format!("invalid log spec '{spec}' (too many '/'s), ignoring it"),
                &mut parse_errs,
            );
            return parse_err(parse_errs, Self::off());
        }
        if let Some(m) = mods {
            for s in m.split(',') {
                let s = s.trim();
                if s.is_empty() {
                    continue;
                }
                let mut parts = s.split('=');
                let (log_level, name) =
                    match (parts.next(), parts.next().map(str::trim), parts.next()) {
                        (Some(part_0), None, None) => {
                            if contains_whitespace(part_0) {
                                push_err(
                                    &format!("ignoring invalid part in log spec '{part_0}'"),
                                    &mut parse_errs,
                                );
                                continue;
                            }
                            // if the single argument is a log-level string, treat that as
                            // global fallback
                            match parse_level_filter(part_0) {
                                Ok(level_filter) => (level_filter, None),
                                Err(_) => (LevelFilter::Trace, Some(part_0)),
                            }
                        }
                        (Some(part_0), Some(""), None) => {
                            if contains_whitespace(part_0) {
                                push_err(
                                    &format!("ignoring invalid part in log spec '{part_0}'"),
                                    &mut parse_errs,
                                );
                                continue;
                            }
                            (LevelFilter::Trace, Some(part_0))
                        }
                        (Some(part_0), Some(part_1), None) => {
                            if contains_whitespace(part_0.trim()) {
                                push_err(
                                    &format!("ignoring invalid part in log spec '{part_0}'"),
                                    &mut parse_errs,
                                );
                                continue;
                            }
                            match parse_level_filter(part_1) {
                                Ok(level_filter) => (level_filter, Some(part_0.trim())),
                                Err(e) => {
                                    push_err(&e.to_string(), &mut parse_errs);
                                    continue;
                                }
                            }
                        }
                        _ => {
                            push_err(
                                &format!("ignoring invalid part in log spec '{s}'"),
                                &mut parse_errs,
                            );
                            continue;
                        }
                    };
                dirs.push(ModuleFilter {
                    module_name: name.map(ToString::to_string),
                    level_filter: log_level,
                });
            }
        }

        #[cfg(feature = "textfilter")]
        let textfilter = filter.and_then(|filter| match Regex::new(filter) {
            Ok(re) => Some(re),
            Err(e) => {
                push_err(&format!("invalid regex filter - {e}"), &mut parse_errs);
                None
            }
        });

        let logspec = Self {
            module_filters: dirs.level_sort(),
            #[cfg(feature = "textfilter")]
            textfilter,
        };

        if parse_errs.is_empty() {
            Ok(logspec)
        } else {
            parse_err(parse_errs, logspec)
        }
    }

    /// Reads a log specification from a toml document.
    ///
    /// # Errors
    ///
    /// [`LoggingSetupError::Toml`] if the document is not valid toml,
    /// [`LoggingSetupError::LevelFilter`] if a level is unknown,
    /// [`LoggingSetupError::Parse`] if the pattern is invalid.
    pub fn from_toml<S: AsRef<str>>(s: S) -> Result<Self, LoggingSetupError> {
        let ls_t: LogSpecFileFormat = toml::from_str(s.as_ref())?;
        let mut parse_errs = Vec::<String>::new();
        let mut module_filters = Vec::<ModuleFilter>::new();

        if let Some(s) = ls_t.global_level {
            module_filters.push(ModuleFilter {
                module_name: None,
                level_filter: parse_level_filter(s)?,
            });
        }

        for (k, v) in ls_t.modules {
            module_filters.push(ModuleFilter {
                module_name: Some(k),
                level_filter: parse_level_filter(v)?,
            });
        }

        #[cfg(feature = "textfilter")]
        let textfilter = match ls_t.global_pattern {
            None => None,
            Some(s) => match Regex::new(&s) {
                Ok(re) => Some(re),
                Err(e) => {
                    push_err(&format!("invalid global_pattern: {e}"), &mut parse_errs);
                    None
                }
            },
        };
        #[cfg(not(feature = "textfilter"))]
        if ls_t.global_pattern.is_some() {
            push_err(
                "global_pattern is only supported with feature textfilter",
                &mut parse_errs,
            );
        }

        let logspec = Self {
            module_filters: module_filters.level_sort(),
            #[cfg(feature = "textfilter")]
            textfilter,
        };
        if parse_errs.is_empty() {
            Ok(logspec)
        } else {
            parse_err(parse_errs, logspec)
        }
    }

    /// Reveals whether any logging is switched on at all.
    #[must_use]
    pub fn is_off(&self) -> bool {
        self.module_filters
            .iter()
            .all(|mf| mf.level_filter == LevelFilter::Off)
    }

    /// Provides a reference to the module filters, longest module name first,
    /// the default filter (if any) last.
    #[must_use]
    pub fn module_filters(&self) -> &[ModuleFilter] {
        &self.module_filters
    }

    /// Provides a reference to the text filter.
    #[cfg(feature = "textfilter")]
    #[must_use]
    pub fn text_filter(&self) -> Option<&Regex> {
        self.textfilter.as_ref()
    }

    /// The level filter that applies to the given module or logger name.
    ///
    /// The most specific matching module filter wins; without any match the
    /// default filter applies, and without a default everything is off.
    #[must_use]
    pub fn level_for(&self, module: &str) -> LevelFilter {
        self.module_filters
            .iter()
            .find(|mf| {
                mf.module_name
                    .as_ref()
                    .is_none_or(|name| module.starts_with(name.as_str()))
            })
            .map_or(LevelFilter::Off, |mf| mf.level_filter)
    }

    /// The explicitly configured filter for exactly this module, if any.
    #[must_use]
    pub fn explicit_level(&self, module: &str) -> Option<LevelFilter> {
        self.module_filters
            .iter()
            .find(|mf| mf.module_name.as_deref() == Some(module))
            .map(|mf| mf.level_filter)
    }

    /// The most verbose level that any filter lets pass.
    #[must_use]
    pub fn max_level(&self) -> LevelFilter {
        self.module_filters
            .iter()
            .map(|mf| mf.level_filter)
            .max()
            .unwrap_or(LevelFilter::Off)
    }

    /// Sets the filter for one module, replacing an existing one for the same name.
    ///
    /// `None` as name addresses the default filter.
    pub fn set_module_level(&mut self, module_name: Option<&str>, level_filter: LevelFilter) {
        let filters = std::mem::take(&mut self.module_filters);
        let mut filters: Vec<ModuleFilter> = filters
            .into_iter()
            .filter(|mf| mf.module_name.as_deref() != module_name)
            .collect();
        filters.push(ModuleFilter {
            module_name: module_name.map(ToString::to_string),
            level_filter,
        });
        self.module_filters = filters.level_sort();
    }

    /// Removes the filter for one module, so that it inherits again.
    pub fn remove_module(&mut self, module_name: Option<&str>) {
        self.module_filters
            .retain(|mf| mf.module_name.as_deref() != module_name);
    }
}

impl fmt::Display for LogSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut write_comma = false;
        // default filter first
        for mf in self.module_filters.iter().rev() {
            if write_comma {
                f.write_str(", ")?;
            }
            match mf.module_name {
                Some(ref name) => write!(f, "{name} = {}", mf.level_filter.as_str())?,
                None => f.write_str(mf.level_filter.as_str())?,
            }
            write_comma = true;
        }
        #[cfg(feature = "textfilter")]
        if let Some(ref regex) = self.textfilter {
            write!(f, "/{regex}")?;
        }
        Ok(())
    }
}

fn push_err(s: &str, parse_errs: &mut Vec<String>) {
    parse_errs.push(s.to_string());
}

fn parse_err(
    errors: Vec<String>,
    logspec: LogSpecification,
) -> Result<LogSpecification, LoggingSetupError> {
    Err(LoggingSetupError::Parse(errors, logspec))
}

fn parse_level_filter<S: AsRef<str>>(s: S) -> Result<LevelFilter, LoggingSetupError> {
    match s.as_ref().trim().to_lowercase().as_ref() {
        "off" => Ok(LevelFilter::Off),
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        _ => Err(LoggingSetupError::LevelFilter(format!(
            "unknown level filter: {}",
            s.as_ref()
        ))),
    }
}

fn contains_whitespace(s: &str) -> bool {
    s.chars().any(char::is_whitespace)
}

trait LevelSort {
    fn level_sort(self) -> Vec<ModuleFilter>;
}
impl LevelSort for Vec<ModuleFilter> {
    // Longest module names first, the default filter last,
    // so that the first match during lookup is the most specific one.
    fn level_sort(mut self) -> Vec<ModuleFilter> {
        self.sort_by(|a, b| {
            let a_len = a.module_name.as_ref().map_or(0, String::len);
            let b_len = b.module_name.as_ref().map_or(0, String::len);
            b_len
                .cmp(&a_len)
                .then_with(|| a.module_name.cmp(&b.module_name))
        });
        self
    }
}
