use crate::{
    backend_handle::BackendHandle,
    detector::Detector,
    diagnostics::{DiagnosticSink, Diagnostics, StderrSink},
    locator::{ConfigSourceLocator, Located, Search, DEFAULT_PATH_BASE},
    markers::{self, MarkerLookup, Markers},
    resolver::{ResolutionOutcome, Resolver, Signals},
    setup_error::ErrorChain,
    BackendDescriptor, BackendId, LoggingSetupError, Properties, Resources,
};
use std::{
    cell::RefCell,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, OnceLock, PoisonError, RwLock,
    },
};

/// Environment variable that switches on the verbose trace of the setup (`true` or `1`).
pub const TRACE_ENV_VAR: &str = "LOGGING_SETUP_TRACE";

static GLOBAL: OnceLock<LoggingSystem> = OnceLock::new();

static NEXT_SYSTEM_ID: AtomicU64 = AtomicU64::new(0);

struct CachedHandle {
    system: u64,
    generation: u64,
    handle: BackendHandle,
}

thread_local! {
    // Lets the fast path hand out the handle without touching the lock.
    static HANDLE_CACHE: RefCell<Vec<CachedHandle>> = const { RefCell::new(Vec::new()) };
}

/// Whether a backend was configured in the current epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupState {
    /// [`LoggingSystem::ensure_configured`] did not run yet, or a reset was allowed since.
    Uninitialized,
    /// The setup ran; the handle controls the given backend.
    Configured(BackendId),
}

#[derive(Debug)]
struct BootstrapState {
    reset_allowed: bool,
    last_outcome: Option<ResolutionOutcome>,
}

/// Finds out which logging backend is installed, configures it once, and
/// gives access to its levels.
///
/// A `LoggingSystem` is an explicit context object: create one with
/// [`LoggingSystem::builder`] and pass it to whoever needs logging control,
/// or use the process-wide instance from [`LoggingSystem::global`]
/// (see also module [`log_ctl`](crate::log_ctl)).
///
/// The first call of [`LoggingSystem::ensure_configured`] detects the installed
/// backends, picks the one with the highest priority, locates its configuration
/// and initializes it. All further calls return the same handle without doing
/// anything, until [`LoggingSystem::allow_reset`] is called with `true`.
///
/// ```rust
/// use logging_setup::{markers, LoggingSystem};
/// use std::sync::Arc;
///
/// let installed = Arc::new(markers::Markers::new([
///     markers::LOGSPEC_ENGINE,
///     markers::LOGSPEC_BRIDGE,
/// ]));
/// let system = LoggingSystem::builder()
///     .shared_markers(installed)
///     .log_setup(true)
///     .build();
/// let handle = system.ensure_configured().unwrap();
/// handle.set_level("my::module", Some("debug"));
/// ```
pub struct LoggingSystem {
    id: u64,
    initialized: AtomicBool,
    bootstrap: Mutex<BootstrapState>,
    handle: RwLock<BackendHandle>,
    // incremented after every change of `handle`
    handle_generation: AtomicU64,
    path_base: RwLock<Option<String>>,
    diagnostics: Diagnostics,
    markers: Arc<dyn MarkerLookup>,
    properties: Properties,
    resources: Resources,
    working_dir: Option<PathBuf>,
}

impl LoggingSystem {
    /// Starts the configuration of an independent instance.
    #[must_use]
    pub fn builder() -> LoggingSystemBuilder {
        LoggingSystemBuilder::default()
    }

    /// Creates an instance that takes its facts from the process environment.
    ///
    /// Installed markers are read from
    /// [`MARKERS_ENV_VAR`](crate::markers::MARKERS_ENV_VAR), resource roots from
    /// [`RESOURCE_PATH_ENV_VAR`](crate::resources::RESOURCE_PATH_ENV_VAR),
    /// and the verbose trace is switched on by [`TRACE_ENV_VAR`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::builder()
            .markers(Markers::from_env())
            .resources(Resources::from_env())
            .log_setup(trace_from_env())
            .build()
    }

    /// The process-wide instance.
    ///
    /// Unless [`LoggingSystem::install_global`] was called before, it is
    /// created from the environment, see [`LoggingSystem::from_env`].
    #[must_use]
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(Self::from_env)
    }

    /// Makes this instance the process-wide one.
    ///
    /// # Errors
    ///
    /// [`LoggingSetupError::GlobalAlreadyInstalled`] if the process-wide instance
    /// was already installed or used.
    pub fn install_global(self) -> Result<&'static Self, LoggingSetupError> {
        GLOBAL
            .set(self)
            .map_err(|_| LoggingSetupError::GlobalAlreadyInstalled)?;
        Ok(Self::global())
    }

    /// Makes sure that the logging backend is configured, and returns its handle.
    ///
    /// Only the first call in an epoch does real work; concurrent first callers
    /// are serialized and all get the same handle. If no backend is installed,
    /// or a pre-configured binding brings its own setup, the handle is a no-op.
    ///
    /// # Errors
    ///
    /// [`LoggingSetupError::Initialization`] if the chosen backend rejects its
    /// built-in default, e.g. because another logger occupies the global engine.
    /// Rejected files and resources are skipped. The handle then stays a no-op,
    /// and no other backend is tried.
    ///
    /// [`LoggingSetupError::Poison`] if a previous setup attempt panicked.
    pub fn ensure_configured(&self) -> Result<BackendHandle, LoggingSetupError> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(self.handle());
        }

        let mut bootstrap = self
            .bootstrap
            .lock()
            .map_err(|_| LoggingSetupError::Poison)?;
        if self.initialized.load(Ordering::Acquire) || !bootstrap.reset_allowed {
            return Ok(self.handle());
        }
        bootstrap.reset_allowed = false;

        let result = self.run_pipeline(&mut bootstrap);
        if let Ok(ref handle) = result {
            *self.handle.write().unwrap_or_else(PoisonError::into_inner) = handle.clone();
            self.handle_generation.fetch_add(1, Ordering::Release);
        }
        self.initialized.store(true, Ordering::Release);
        result
    }

    // Detector, resolver, locator, backend.
    fn run_pipeline(
        &self,
        bootstrap: &mut BootstrapState,
    ) -> Result<BackendHandle, LoggingSetupError> {
        let detector = Detector {
            markers: &*self.markers,
            diagnostics: &self.diagnostics,
        };
        // the simple binding brings its own setup; nothing else is looked at
        let simple_binding = detector.has_marker(markers::SIMPLE_LOGGER);
        let (signals, detected) = if simple_binding {
            (
                Signals {
                    simple_binding,
                    fmt_simple: false,
                },
                Vec::new(),
            )
        } else {
            (
                Signals {
                    simple_binding,
                    fmt_simple: detector.has_marker(markers::FMT_SIMPLE),
                },
                detector.detect(),
            )
        };
        let outcome = Resolver {
            diagnostics: &self.diagnostics,
        }
        .resolve(signals, &detected);
        let o_winner = outcome.winner;
        bootstrap.last_outcome = Some(outcome);

        let Some(winner) = o_winner else {
            return Ok(BackendHandle::no_op());
        };

        let path_base = self.get_path_base();
        let search = self
            .locator(path_base.as_deref())
            .search(winner, |source| {
                winner.initialize(&mut source.reader(), source.name.as_deref())
            })?;
        let handle = match search {
            Search::AlreadyConfigured { .. } => {
                let current = self.handle();
                if current.id() == winner.id {
                    current
                } else {
                    BackendHandle::new(winner.attach())
                }
            }
            Search::Accepted(source, backend) => {
                if let (Some(key), Some(value)) =
                    (winner.system_property_key, source.property_value)
                {
                    self.properties.set(key, value);
                }
                BackendHandle::new(backend)
            }
        };
        self.diagnostics
            .log_logging(format_args!("Configured {}", winner.display_name));
        Ok(handle)
    }

    /// Allows or forbids that the next [`LoggingSystem::ensure_configured`]
    /// runs the setup again.
    ///
    /// `true` starts a new epoch: the next call re-scans the environment even if
    /// nothing changed. `false` only clears the flag; if it is called before the
    /// first setup, the setup is skipped altogether and the host's own
    /// configuration stays untouched.
    pub fn allow_reset(&self, allow: bool) {
        let mut bootstrap = self
            .bootstrap
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        bootstrap.reset_allowed = allow;
        if allow {
            self.initialized.store(false, Ordering::Release);
        }
    }

    /// Sets the directory prefix for the second resource lookup of each
    /// candidate file name; `None` disables that lookup.
    ///
    /// A missing trailing `/` is added; an empty prefix counts as `None`.
    pub fn set_path_base(&self, o_path_base: Option<&str>) {
        *self
            .path_base
            .write()
            .unwrap_or_else(PoisonError::into_inner) = normalize_path_base(o_path_base);
    }

    /// The current resource path base, by default `log-conf/`.
    #[must_use]
    pub fn get_path_base(&self) -> Option<String> {
        self.path_base
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Switches the verbose trace of the setup on or off.
    pub fn log_logging_setup(&self, verbose: bool) {
        self.diagnostics.set_verbose(verbose);
    }

    /// The current handle; a no-op handle as long as nothing was configured.
    #[must_use]
    pub fn handle(&self) -> BackendHandle {
        let generation = self.handle_generation.load(Ordering::Acquire);
        HANDLE_CACHE
            .try_with(|cache| {
                let mut cache = cache.borrow_mut();
                if let Some(cached) = cache
                    .iter()
                    .find(|cached| cached.system == self.id && cached.generation == generation)
                {
                    return cached.handle.clone();
                }
                let handle = self.stored_handle();
                cache.retain(|cached| cached.system != self.id);
                cache.push(CachedHandle {
                    system: self.id,
                    generation,
                    handle: handle.clone(),
                });
                handle
            })
            // the thread is shutting down
            .unwrap_or_else(|_| self.stored_handle())
    }

    fn stored_handle(&self) -> BackendHandle {
        self.handle
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// [`LoggingSystem::ensure_configured`], with failures reported to the
    /// diagnostic sink instead of being returned.
    pub fn config(&self) -> BackendHandle {
        match self.ensure_configured() {
            Ok(handle) => handle,
            Err(e) => {
                self.diagnostics
                    .log_always(format_args!("setup failed: {}", ErrorChain(&e)));
                self.handle()
            }
        }
    }

    /// Whether the setup ran in the current epoch.
    #[must_use]
    pub fn state(&self) -> SetupState {
        if self.initialized.load(Ordering::Acquire) {
            SetupState::Configured(self.handle().id())
        } else {
            SetupState::Uninitialized
        }
    }

    /// The resolution of the last setup, if there was one.
    #[must_use]
    pub fn last_resolution(&self) -> Option<ResolutionOutcome> {
        self.bootstrap
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_outcome
            .clone()
    }

    /// The fully installed backends, highest priority first.
    ///
    /// Only inspects the environment, nothing is configured.
    #[must_use]
    pub fn detect(&self) -> Vec<&'static BackendDescriptor> {
        Detector {
            markers: &*self.markers,
            diagnostics: &self.diagnostics,
        }
        .detect()
    }

    /// Searches the configuration of the given backend, without applying it.
    #[must_use]
    pub fn locate(&self, descriptor: &BackendDescriptor) -> Located {
        let path_base = self.get_path_base();
        self.locator(path_base.as_deref()).locate(descriptor)
    }

    fn locator<'a>(&'a self, path_base: Option<&'a str>) -> ConfigSourceLocator<'a> {
        ConfigSourceLocator {
            working_dir: self.working_dir.as_deref(),
            resources: &self.resources,
            properties: &self.properties,
            path_base,
            diagnostics: &self.diagnostics,
        }
    }

    /// The property namespace in which the origin of the configuration is recorded.
    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Sets the level of a logger, after making sure the backend is configured.
    ///
    /// See [`BackendHandle::set_level`].
    ///
    /// # Errors
    ///
    /// See [`LoggingSystem::ensure_configured`].
    pub fn set_level(&self, logger: &str, o_level: Option<&str>) -> Result<(), LoggingSetupError> {
        self.ensure_configured()?.set_level(logger, o_level);
        Ok(())
    }

    /// Lets everything of the logger through.
    ///
    /// # Errors
    ///
    /// See [`LoggingSystem::ensure_configured`].
    pub fn enable(&self, logger: &str) -> Result<(), LoggingSetupError> {
        self.ensure_configured()?.enable(logger);
        Ok(())
    }

    /// Switches the logger off.
    ///
    /// # Errors
    ///
    /// See [`LoggingSystem::ensure_configured`].
    pub fn disable(&self, logger: &str) -> Result<(), LoggingSetupError> {
        self.ensure_configured()?.disable(logger);
        Ok(())
    }

    /// Sets the logger to `info`.
    ///
    /// # Errors
    ///
    /// See [`LoggingSystem::ensure_configured`].
    pub fn set_info(&self, logger: &str) -> Result<(), LoggingSetupError> {
        self.ensure_configured()?.set_info(logger);
        Ok(())
    }

    /// Sets the logger to `warn`.
    ///
    /// # Errors
    ///
    /// See [`LoggingSystem::ensure_configured`].
    pub fn set_warn(&self, logger: &str) -> Result<(), LoggingSetupError> {
        self.ensure_configured()?.set_warn(logger);
        Ok(())
    }

    /// Sets the logger to `error`.
    ///
    /// # Errors
    ///
    /// See [`LoggingSystem::ensure_configured`].
    pub fn set_error(&self, logger: &str) -> Result<(), LoggingSetupError> {
        self.ensure_configured()?.set_error(logger);
        Ok(())
    }
}

impl Drop for LoggingSystem {
    fn drop(&mut self) {
        HANDLE_CACHE
            .try_with(|cache| cache.borrow_mut().retain(|cached| cached.system != self.id))
            .ok();
    }
}

impl std::fmt::Debug for LoggingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingSystem")
            .field("state", &self.state())
            .field("path_base", &self.get_path_base())
            .field("diagnostics", &self.diagnostics)
            .field("resources", &self.resources)
            .field("working_dir", &self.working_dir)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`LoggingSystem`].
///
/// Without further configuration, no marker is installed, resources are not
/// searched, the configuration files are expected in the current directory,
/// and diagnostics go to stderr.
pub struct LoggingSystemBuilder {
    path_base: Option<String>,
    log_setup: bool,
    working_dir: Option<PathBuf>,
    resources: Resources,
    markers: Arc<dyn MarkerLookup>,
    sink: Arc<dyn DiagnosticSink>,
    properties: Properties,
}

impl Default for LoggingSystemBuilder {
    fn default() -> Self {
        Self {
            path_base: Some(DEFAULT_PATH_BASE.to_string()),
            log_setup: false,
            working_dir: None,
            resources: Resources::new(),
            markers: Arc::new(Markers::default()),
            sink: Arc::new(StderrSink),
            properties: Properties::new(),
        }
    }
}

impl LoggingSystemBuilder {
    /// Sets the resource path base, see [`LoggingSystem::set_path_base`].
    #[must_use]
    pub fn path_base(mut self, o_path_base: Option<&str>) -> Self {
        self.path_base = normalize_path_base(o_path_base);
        self
    }

    /// Switches the verbose trace of the setup on or off.
    #[must_use]
    pub fn log_setup(mut self, verbose: bool) -> Self {
        self.log_setup = verbose;
        self
    }

    /// The directory in which configuration files are searched.
    #[must_use]
    pub fn working_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Appends a resource root directory.
    #[must_use]
    pub fn resource_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.resources.add_root(root);
        self
    }

    /// Registers a compiled-in resource.
    #[must_use]
    pub fn embedded_resource<S: Into<String>>(mut self, name: S, content: &'static [u8]) -> Self {
        self.resources.add_embedded(name, content);
        self
    }

    /// Replaces the resources.
    #[must_use]
    pub fn resources(mut self, resources: Resources) -> Self {
        self.resources = resources;
        self
    }

    /// The marker lookup the detection is based on.
    #[must_use]
    pub fn markers<M: MarkerLookup + 'static>(mut self, markers: M) -> Self {
        self.markers = Arc::new(markers);
        self
    }

    /// Like [`LoggingSystemBuilder::markers`], for a lookup that is shared with the caller.
    #[must_use]
    pub fn shared_markers(mut self, markers: Arc<dyn MarkerLookup>) -> Self {
        self.markers = markers;
        self
    }

    /// Where diagnostic lines are written.
    #[must_use]
    pub fn diagnostic_sink<S: DiagnosticSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// The property namespace in which the origin of the configuration is recorded.
    #[must_use]
    pub fn properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Creates the [`LoggingSystem`]; nothing is detected or configured yet.
    #[must_use]
    pub fn build(self) -> LoggingSystem {
        LoggingSystem {
            id: NEXT_SYSTEM_ID.fetch_add(1, Ordering::Relaxed),
            initialized: AtomicBool::new(false),
            bootstrap: Mutex::new(BootstrapState {
                reset_allowed: true,
                last_outcome: None,
            }),
            handle: RwLock::new(BackendHandle::no_op()),
            handle_generation: AtomicU64::new(0),
            path_base: RwLock::new(self.path_base),
            diagnostics: Diagnostics::new(self.sink, self.log_setup),
            markers: self.markers,
            properties: self.properties,
            resources: self.resources,
            working_dir: self.working_dir,
        }
    }
}

fn normalize_path_base(o_path_base: Option<&str>) -> Option<String> {
    let path_base = o_path_base.filter(|p| !p.is_empty())?;
    if path_base.ends_with('/') {
        Some(path_base.to_string())
    } else {
        Some(format!("{path_base}/"))
    }
}

fn trace_from_env() -> bool {
    std::env::var(TRACE_ENV_VAR)
        .is_ok_and(|value| value == "1" || value.eq_ignore_ascii_case("true"))
}
