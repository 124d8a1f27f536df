//! Facts about the running environment that decide which backend is present.
//!
//! A marker is the symbolic name of an installed component, e.g. a logging
//! engine or the bridge that routes the `log` facade into it. Whoever sets up
//! the process registers the markers of the components it links in; the
//! detector only asks whether a marker is known.

use std::{
    collections::BTreeSet,
    fmt,
    sync::{PoisonError, RwLock},
};

/// The `tracing-subscriber` engine.
pub const TRACING_ENGINE: &str = "tracing-subscriber";
/// The bridge that forwards `log` records into `tracing`.
pub const TRACING_BRIDGE: &str = "tracing-log";
/// The log specification engine.
pub const LOGSPEC_ENGINE: &str = "logspec-engine";
/// The bridge that lets the `log` facade use the log specification engine.
pub const LOGSPEC_BRIDGE: &str = "logspec-log-bridge";
/// The minimal stderr logger; it is its own bridge.
pub const STDERR_LOGGER: &str = "stderr-logger";
/// A pre-configured simple binding that brings its own setup.
pub const SIMPLE_LOGGER: &str = "simple-logger";
/// A formatting variant of the simple binding; only reported.
pub const FMT_SIMPLE: &str = "fmt-simple";

/// Environment variable with a comma-separated list of installed markers.
pub const MARKERS_ENV_VAR: &str = "LOGGING_SETUP_MARKERS";

/// Error of a marker lookup.
///
/// The detector treats any such error as "marker absent".
#[derive(Debug)]
pub struct MarkerLookupError(pub String);

impl fmt::Display for MarkerLookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for MarkerLookupError {}

/// Answers whether a marker is present in the running environment.
pub trait MarkerLookup: Send + Sync {
    /// Looks up a marker.
    ///
    /// # Errors
    ///
    /// Implementations may fail, e.g. if the underlying registry can not be read.
    fn lookup(&self, marker: &str) -> Result<bool, MarkerLookupError>;

    /// Like `lookup`, but failures count as absence.
    fn has_marker(&self, marker: &str) -> bool {
        self.lookup(marker).unwrap_or(false)
    }
}

impl<F> MarkerLookup for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn lookup(&self, marker: &str) -> Result<bool, MarkerLookupError> {
        Ok(self(marker))
    }
}

/// A registry of installed markers.
///
/// ```rust
/// use logging_setup::markers::{self, MarkerLookup, Markers};
///
/// let installed = Markers::new([markers::TRACING_ENGINE, markers::TRACING_BRIDGE]);
/// assert!(installed.has_marker(markers::TRACING_BRIDGE));
/// ```
#[derive(Debug, Default)]
pub struct Markers {
    installed: RwLock<BTreeSet<String>>,
}

impl Markers {
    /// Creates a registry with the given markers.
    #[must_use]
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            installed: RwLock::new(markers.into_iter().map(Into::into).collect()),
        }
    }

    /// Creates a registry from the environment variable [`MARKERS_ENV_VAR`].
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(MARKERS_ENV_VAR)
            .map(|value| Self::parse_list(&value))
            .unwrap_or_default()
    }

    /// Creates a registry from a comma-separated list.
    #[must_use]
    pub fn parse_list(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|marker| !marker.is_empty()),
        )
    }

    /// Adds a marker.
    pub fn register<S: Into<String>>(&self, marker: S) {
        self.installed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(marker.into());
    }

    /// Removes a marker.
    pub fn unregister(&self, marker: &str) {
        self.installed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(marker);
    }

    /// The registered markers, sorted.
    #[must_use]
    pub fn installed(&self) -> Vec<String> {
        self.installed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl MarkerLookup for Markers {
    fn lookup(&self, marker: &str) -> Result<bool, MarkerLookupError> {
        self.installed
            .read()
            .map(|installed| installed.contains(marker))
            .map_err(|_| MarkerLookupError("marker registry is poisoned".to_string()))
    }
}
