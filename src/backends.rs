//! The live state of the supported backends.
//!
//! Each backend translates the [`CanonicalLevel`]s into its own native
//! level enumeration and keeps the per-logger levels that were set.
//! The backends for the `log` facade share one registered `log::Log`,
//! which forwards to the backend that was configured last; the `tracing`
//! backend installs the global subscriber.

mod log_router;
pub(crate) mod logspec_backend;
pub(crate) mod stderr_backend;
pub(crate) mod tracing_backend;

pub use self::{
    logspec_backend::LogspecBackend,
    stderr_backend::{Severity, StderrBackend},
    tracing_backend::TracingBackend,
};
use crate::{level::LevelRequest, BackendId, CanonicalLevel};
use std::io::Read;

/// A configured backend.
#[derive(Debug)]
pub enum ActiveBackend {
    /// `tracing`.
    Tracing(TracingBackend),
    /// The `log` facade with a log specification.
    Logspec(LogspecBackend),
    /// The minimal stderr logger.
    Stderr(StderrBackend),
    /// Nothing to control.
    NoOp,
}

impl ActiveBackend {
    /// Which backend this is.
    #[must_use]
    pub fn id(&self) -> BackendId {
        match self {
            Self::Tracing(_) => BackendId::Tracing,
            Self::Logspec(_) => BackendId::Logspec,
            Self::Stderr(_) => BackendId::Stderr,
            Self::NoOp => BackendId::NoOp,
        }
    }

    // An empty logger name addresses the root/default level.
    pub(crate) fn set_level(&self, logger: &str, request: LevelRequest) {
        match self {
            Self::Tracing(b) => b.set_level(logger, request),
            Self::Logspec(b) => b.set_level(logger, request),
            Self::Stderr(b) => b.set_level(logger, request),
            Self::NoOp => {}
        }
    }

    /// The level that currently applies to the given logger, expressed canonically.
    ///
    /// Returns `None` for the no-op backend, which has no notion of levels.
    #[must_use]
    pub fn effective_level(&self, logger: &str) -> Option<CanonicalLevel> {
        match self {
            Self::Tracing(b) => Some(tracing_backend::to_canonical(b.level_for(logger))),
            Self::Logspec(b) => Some(logspec_backend::to_canonical(b.level_for(logger))),
            Self::Stderr(b) => Some(b.level_for(logger).to_canonical()),
            Self::NoOp => None,
        }
    }
}

pub(crate) fn read_to_string(input: &mut dyn Read) -> Result<String, crate::LoggingSetupError> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    Ok(std::str::from_utf8(&bytes)?.to_string())
}

// Drops comment lines and blank lines.
pub(crate) fn without_comments<'a>(
    content: &'a str,
    comment_markers: &'a [char],
) -> impl Iterator<Item = (usize, &'a str)> + 'a {
    content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(move |(_, line)| !line.is_empty() && !line.starts_with(comment_markers))
}
