// only enables the `doc_cfg` feature when the `docsrs` configuration attribute is defined
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! Finds out which logging backend a process has installed, configures it once
//! from the first configuration source it can find, and lets the process
//! change log levels at runtime without knowing which backend it talks to.
//!
//! ```rust
//! use logging_setup::{markers, LoggingSystem};
//!
//! let system = LoggingSystem::builder()
//!     .markers(markers::Markers::new([
//!         markers::TRACING_ENGINE,
//!         markers::TRACING_BRIDGE,
//!     ]))
//!     .build();
//! let handle = system.ensure_configured().unwrap();
//! handle.set_level("my_crate::db", Some("debug"));
//! handle.disable("hyper");
//! ```
//!
//! The setup runs in four steps:
//!
//! * the installed backends are detected by asking a [`MarkerLookup`](markers::MarkerLookup)
//!   for the markers of their engine and of their `log` bridge; a backend counts
//!   only if both are there,
//! * if several backends are installed, the one that comes first in [`REGISTRY`] wins,
//!   and the conflict is reported,
//! * the configuration of the winner is searched: first as file in the working directory,
//!   then as resource by bare name, then as resource below the path base
//!   (default `log-conf/`); if nothing is found, the backend's built-in default is used,
//! * the backend is initialized, and a [`BackendHandle`] to control its levels
//!   is returned.
//!
//! Everything the setup does is reported on stderr with prefix `[Logging setup] `,
//! if [`LoggingSystem::log_logging_setup`] is switched on; conflicts and
//! half-installed backends are always reported.
//!
//! | Backend   | Markers                                | Files                            | Property              |
//! |-----------|----------------------------------------|----------------------------------|-----------------------|
//! | `tracing` | `tracing-subscriber`, `tracing-log`    | `tracing.toml`, `tracing.filter` | `TRACING_CONFIG_FILE` |
//! | `logspec` | `logspec-engine`, `logspec-log-bridge` | `logspec.toml`, `log.spec`       | `LOGSPEC_CONFIG_FILE` |
//! | `stderr`  | `stderr-logger`                        | `logging.properties`             | `LOGGING_CONFIG_FILE` |

mod backend;
mod backend_handle;
mod defaults;
mod detector;
mod level;
mod locator;
mod log_specification;
mod logging_system;
mod properties;
mod resolver;
mod setup_error;

pub mod backends;
pub mod diagnostics;
pub mod log_ctl;
pub mod markers;
pub mod resources;

pub use crate::backend::{descriptor, BackendDescriptor, BackendId, DetectionPredicate, REGISTRY};
pub use crate::backend_handle::BackendHandle;
pub use crate::level::{CanonicalLevel, UnknownLevel};
pub use crate::locator::{ConfigSource, Located, SourceKind, DEFAULT_PATH_BASE};
pub use crate::log_specification::{LogSpecification, ModuleFilter};
pub use crate::logging_system::{LoggingSystem, LoggingSystemBuilder, SetupState, TRACE_ENV_VAR};
pub use crate::properties::Properties;
pub use crate::resolver::{resolve, ResolutionOutcome, ResolutionReason, Signals};
pub use crate::resources::Resources;
pub use crate::setup_error::LoggingSetupError;
