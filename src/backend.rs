use crate::{
    backends::{logspec_backend, stderr_backend, tracing_backend, ActiveBackend},
    defaults, markers, LoggingSetupError,
};
use std::{fmt, io::Read};

/// Stable identifier of a supported backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BackendId {
    /// `tracing`, configured through a `tracing-subscriber` filter.
    Tracing,
    /// The `log` facade, configured through a [`LogSpecification`](crate::LogSpecification).
    Logspec,
    /// The minimal built-in stderr logger.
    Stderr,
    /// Does nothing.
    NoOp,
}

impl BackendId {
    /// The symbolic name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tracing => "tracing",
            Self::Logspec => "logspec",
            Self::Stderr => "stderr",
            Self::NoOp => "no-op",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pair of markers that both must be present.
///
/// Typically the logging engine and the bridge that routes the facade into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DetectionPredicate {
    /// The logging engine.
    pub engine: &'static str,
    /// The integration bridge.
    pub bridge: &'static str,
}

// Configures a backend from a configuration stream.
// The name is the file or resource that was read, or None for the built-in default.
pub(crate) type InitFn =
    fn(&mut dyn Read, Option<&str>) -> Result<ActiveBackend, LoggingSetupError>;

/// Immutable description of one supported backend.
pub struct BackendDescriptor {
    /// Stable identifier.
    pub id: BackendId,
    /// Human-readable name for diagnostics.
    pub display_name: &'static str,
    /// The backend is present if both markers of at least one pair are present.
    pub detection_predicates: &'static [DetectionPredicate],
    /// Base names of configuration files and resources, in the order they are tried.
    pub candidate_filenames: &'static [&'static str],
    /// Key of the property that records where the configuration came from.
    pub system_property_key: Option<&'static str>,
    /// Compiled-in fallback configuration.
    pub default_config: &'static [u8],
    pub(crate) init: InitFn,
    pub(crate) attach: fn() -> ActiveBackend,
}

impl BackendDescriptor {
    /// True for backends that are chosen by detection; false for the no-op backend.
    #[must_use]
    pub fn is_real(&self) -> bool {
        self.id != BackendId::NoOp
    }

    /// Position in the registry; lower values win.
    #[must_use]
    pub fn priority(&self) -> usize {
        REGISTRY
            .iter()
            .position(|descriptor| descriptor.id == self.id)
            .unwrap_or(REGISTRY.len())
    }

    // Configures the backend from the given stream.
    pub(crate) fn initialize(
        &self,
        input: &mut dyn Read,
        name: Option<&str>,
    ) -> Result<ActiveBackend, LoggingSetupError> {
        (self.init)(input, name)
            .map_err(|e| LoggingSetupError::initialization(self.display_name, name, e))
    }

    // A live handle for a backend that was configured by someone else.
    pub(crate) fn attach(&self) -> ActiveBackend {
        (self.attach)()
    }
}

impl fmt::Debug for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendDescriptor")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for BackendDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for BackendDescriptor {}

/// All supported backends, highest priority first.
///
/// The order is fixed: `tracing` outranks the `log`-based log specification,
/// which outranks the minimal stderr logger, which outranks no-op.
pub static REGISTRY: [BackendDescriptor; 4] = [
    BackendDescriptor {
        id: BackendId::Tracing,
        display_name: "tracing",
        detection_predicates: &[DetectionPredicate {
            engine: markers::TRACING_ENGINE,
            bridge: markers::TRACING_BRIDGE,
        }],
        candidate_filenames: &["tracing.toml", "tracing.filter"],
        system_property_key: Some("TRACING_CONFIG_FILE"),
        default_config: defaults::TRACING_FILTER.as_bytes(),
        init: tracing_backend::initialize,
        attach: tracing_backend::attach,
    },
    BackendDescriptor {
        id: BackendId::Logspec,
        display_name: "logspec",
        detection_predicates: &[DetectionPredicate {
            engine: markers::LOGSPEC_ENGINE,
            bridge: markers::LOGSPEC_BRIDGE,
        }],
        candidate_filenames: &["logspec.toml", "log.spec"],
        system_property_key: Some("LOGSPEC_CONFIG_FILE"),
        default_config: defaults::LOGSPEC_TOML.as_bytes(),
        init: logspec_backend::initialize,
        attach: logspec_backend::attach,
    },
    BackendDescriptor {
        id: BackendId::Stderr,
        display_name: "stderr",
        detection_predicates: &[DetectionPredicate {
            engine: markers::STDERR_LOGGER,
            bridge: markers::STDERR_LOGGER,
        }],
        candidate_filenames: &["logging.properties"],
        system_property_key: Some("LOGGING_CONFIG_FILE"),
        default_config: defaults::STDERR_PROPERTIES.as_bytes(),
        init: stderr_backend::initialize,
        attach: stderr_backend::attach,
    },
    BackendDescriptor {
        id: BackendId::NoOp,
        display_name: "NoOp",
        detection_predicates: &[],
        candidate_filenames: &[],
        system_property_key: None,
        default_config: b"",
        init: initialize_no_op,
        attach: attach_no_op,
    },
];

/// Looks up a descriptor by id.
#[must_use]
pub fn descriptor(id: BackendId) -> &'static BackendDescriptor {
    match id {
        BackendId::Tracing => &REGISTRY[0],
        BackendId::Logspec => &REGISTRY[1],
        BackendId::Stderr => &REGISTRY[2],
        BackendId::NoOp => &REGISTRY[3],
    }
}

fn initialize_no_op(
    _input: &mut dyn Read,
    _name: Option<&str>,
) -> Result<ActiveBackend, LoggingSetupError> {
    Ok(ActiveBackend::NoOp)
}

fn attach_no_op() -> ActiveBackend {
    ActiveBackend::NoOp
}

#[cfg(test)]
mod tests {
    use super::{descriptor, BackendId, REGISTRY};

    #[test]
    fn registry_is_ordered_by_priority() {
        for (index, d) in REGISTRY.iter().enumerate() {
            assert_eq!(d.priority(), index);
            assert_eq!(descriptor(d.id).id, d.id);
        }
        assert_eq!(REGISTRY[0].id, BackendId::Tracing);
        assert_eq!(REGISTRY[3].id, BackendId::NoOp);
        assert!(!descriptor(BackendId::NoOp).is_real());
    }

    #[test]
    fn real_backends_have_defaults_and_keys() {
        for d in REGISTRY.iter().filter(|d| d.is_real()) {
            assert!(!d.default_config.is_empty());
            assert!(d.system_property_key.is_some());
            assert!(!d.candidate_filenames.is_empty());
            assert!(!d.detection_predicates.is_empty());
        }
    }
}
