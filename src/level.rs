use std::fmt;
use std::str::FromStr;

/// The backend-independent level vocabulary.
///
/// Every backend translates these into its own native enumeration.
/// The variants are ordered from the most verbose to the most restrictive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanonicalLevel {
    /// Everything is written.
    Trace,
    /// Debug and above.
    Debug,
    /// Info and above.
    Info,
    /// Warnings and errors.
    Warn,
    /// Errors only.
    Error,
    /// Nothing is written.
    Off,
}

impl CanonicalLevel {
    /// All canonical levels, most verbose first.
    pub const ALL: [CanonicalLevel; 6] = [
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Off,
    ];

    /// Looks up a level by name, ignoring ASCII case.
    ///
    /// Besides the canonical names, `warning`, `severe` and `all` are accepted
    /// as aliases for `warn`, `error` and `trace`.
    /// Returns `None` for anything else.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let level = if name.eq_ignore_ascii_case("trace") || name.eq_ignore_ascii_case("all") {
            Self::Trace
        } else if name.eq_ignore_ascii_case("debug") {
            Self::Debug
        } else if name.eq_ignore_ascii_case("info") {
            Self::Info
        } else if name.eq_ignore_ascii_case("warn") || name.eq_ignore_ascii_case("warning") {
            Self::Warn
        } else if name.eq_ignore_ascii_case("error") || name.eq_ignore_ascii_case("severe") {
            Self::Error
        } else if name.eq_ignore_ascii_case("off") {
            Self::Off
        } else {
            return None;
        };
        Some(level)
    }

    /// The lower-case canonical name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for CanonicalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown level name with [`str::parse`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownLevel(pub String);

impl fmt::Display for UnknownLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown level name '{}'", self.0)
    }
}

impl std::error::Error for UnknownLevel {}

impl FromStr for CanonicalLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownLevel(s.to_string()))
    }
}

/// How a requested level name was understood.
///
/// `Unset` stands for "inherit from the parent"; `All` lets every native level
/// pass, also those below `trace`; `Unsupported` is any name outside the
/// vocabulary and makes backends fail closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LevelRequest {
    Unset,
    All,
    Level(CanonicalLevel),
    Unsupported,
}

impl LevelRequest {
    pub(crate) fn from_name(o_name: Option<&str>) -> Self {
        match o_name {
            None => Self::Unset,
            Some(name) if name.trim().eq_ignore_ascii_case("all") => Self::All,
            Some(name) => match CanonicalLevel::from_name(name) {
                Some(level) => Self::Level(level),
                None => Self::Unsupported,
            },
        }
    }
}

impl From<Option<CanonicalLevel>> for LevelRequest {
    fn from(o_level: Option<CanonicalLevel>) -> Self {
        o_level.map_or(Self::Unset, Self::Level)
    }
}

#[cfg(test)]
mod tests {
    use super::{CanonicalLevel, LevelRequest};

    #[test]
    fn names_and_aliases() {
        assert_eq!(CanonicalLevel::from_name("TRACE"), Some(CanonicalLevel::Trace));
        assert_eq!(CanonicalLevel::from_name("all"), Some(CanonicalLevel::Trace));
        assert_eq!(CanonicalLevel::from_name("Warning"), Some(CanonicalLevel::Warn));
        assert_eq!(CanonicalLevel::from_name("severe"), Some(CanonicalLevel::Error));
        assert_eq!(CanonicalLevel::from_name(" off "), Some(CanonicalLevel::Off));
        assert_eq!(CanonicalLevel::from_name("bogus"), None);
        assert!("fine".parse::<CanonicalLevel>().is_err());
    }

    #[test]
    fn canonical_names_round_trip() {
        for level in CanonicalLevel::ALL {
            assert_eq!(level.as_str().parse::<CanonicalLevel>(), Ok(level));
        }
    }

    #[test]
    fn level_requests() {
        assert_eq!(LevelRequest::from_name(None), LevelRequest::Unset);
        assert_eq!(
            LevelRequest::from_name(Some("info")),
            LevelRequest::Level(CanonicalLevel::Info)
        );
        assert_eq!(LevelRequest::from_name(Some(" ALL ")), LevelRequest::All);
        assert_eq!(
            LevelRequest::from_name(Some("verbose")),
            LevelRequest::Unsupported
        );
    }
}
