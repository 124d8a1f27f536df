use crate::LogSpecification;
use std::{error::Error as StdError, fmt};
use thiserror::Error;

/// Describes errors in the setup of the logging backend.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LoggingSetupError {
    /// The chosen backend rejected its configuration.
    ///
    /// Rejected files and resources are only reported; `ensure_configured`
    /// returns this error when the built-in default is rejected as well.
    /// No other backend is tried once a winner was chosen.
    #[error("{backend} could not be initialized from {origin}")]
    Initialization {
        /// Display name of the backend.
        backend: &'static str,
        /// Name of the configuration source, or `built-in default`.
        origin: String,
        /// What went wrong.
        #[source]
        source: Box<LoggingSetupError>,
    },

    /// Reading a configuration stream failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Configuration content is not valid UTF-8.
    #[error("configuration is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    /// A toml log specification could not be parsed.
    #[error("invalid toml log specification")]
    Toml(#[from] toml::de::Error),

    /// A `tracing` filter directive could not be parsed.
    #[error("invalid tracing filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    /// Some error occured during parsing a log specification.
    #[error("parse error(s): {0:?}, resulting logspec: {1:?}")]
    Parse(Vec<String>, LogSpecification),

    /// A line of a properties configuration could not be understood.
    #[error("line {line} of the properties configuration: {reason}")]
    Properties {
        /// One-based line number.
        line: usize,
        /// What is wrong with the line.
        reason: String,
    },

    /// Invalid level filter.
    #[error("invalid level filter: {0}")]
    LevelFilter(String),

    /// The process-wide logging engine is already occupied by someone else,
    /// e.g. another `log::Log` or another global `tracing` subscriber.
    #[error("another {0} is installed already")]
    EngineTaken(&'static str),

    /// The process-wide [`LoggingSystem`](crate::LoggingSystem) exists already.
    #[error("the global logging system was already installed or used")]
    GlobalAlreadyInstalled,

    /// Some synchronization object is poisoned.
    #[error("some synchronization object is poisoned")]
    Poison,
}

impl LoggingSetupError {
    pub(crate) fn initialization(
        backend: &'static str,
        origin: Option<&str>,
        source: LoggingSetupError,
    ) -> Self {
        Self::Initialization {
            backend,
            origin: origin.unwrap_or("built-in default").to_string(),
            source: Box::new(source),
        }
    }
}

// Renders an error together with its sources.
pub(crate) struct ErrorChain<'a>(pub(crate) &'a dyn StdError);

impl fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut o_source = self.0.source();
        while let Some(source) = o_source {
            write!(f, ": {source}")?;
            o_source = source.source();
        }
        Ok(())
    }
}
