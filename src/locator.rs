use crate::{
    diagnostics::Diagnostics,
    resources::{Resource, Resources},
    setup_error::ErrorChain,
    BackendDescriptor, Properties,
};
use std::{
    borrow::Cow,
    convert::Infallible,
    error::Error,
    fs,
    io::Read,
    path::{Path, PathBuf},
};

/// Default resource path base, see [`LoggingSystem::set_path_base`](crate::LoggingSystem::set_path_base).
pub const DEFAULT_PATH_BASE: &str = "log-conf/";

/// Outcome of the search for a backend configuration.
#[derive(Debug)]
pub enum Located {
    /// The backend's property is already set; nothing needs to be read.
    AlreadyConfigured {
        /// The property key.
        key: &'static str,
        /// Its value.
        value: String,
    },
    /// A configuration to hand to the backend.
    Source(ConfigSource),
}

/// Where a configuration came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// A file, relative to the working directory.
    File,
    /// A resource, by bare name or below the path base.
    Resource,
    /// The backend's compiled-in default.
    Default,
}

/// A configuration that was found, read completely into memory.
#[derive(Debug)]
pub struct ConfigSource {
    /// Content of the configuration.
    pub content: Cow<'static, [u8]>,
    /// The name that tells the backend which syntax to expect;
    /// `None` for the built-in default.
    pub name: Option<String>,
    /// What kind of source this is.
    pub kind: SourceKind,
    /// The value to record under the backend's property once the backend
    /// accepted the configuration; `None` for the built-in default.
    pub property_value: Option<String>,
}

impl ConfigSource {
    /// A reader over the content.
    #[must_use]
    pub fn reader(&self) -> impl Read + '_ {
        &*self.content
    }
}

// What a search for a backend configuration ended with.
pub(crate) enum Search<T> {
    AlreadyConfigured { key: &'static str, value: String },
    Accepted(ConfigSource, T),
}

// Walks the candidate sources of a backend; the first one that is accepted wins.
pub(crate) struct ConfigSourceLocator<'a> {
    pub(crate) working_dir: Option<&'a Path>,
    pub(crate) resources: &'a Resources,
    pub(crate) properties: &'a Properties,
    pub(crate) path_base: Option<&'a str>,
    pub(crate) diagnostics: &'a Diagnostics,
}

impl ConfigSourceLocator<'_> {
    // The first source that exists, without trying to apply it.
    pub(crate) fn locate(&self, descriptor: &BackendDescriptor) -> Located {
        match self.search(descriptor, |_| Ok::<_, Infallible>(())) {
            Ok(Search::AlreadyConfigured { key, value }) => Located::AlreadyConfigured { key, value },
            Ok(Search::Accepted(source, ())) => Located::Source(source),
            Err(never) => match never {},
        }
    }

    // Offers the candidate sources to `accept`, in search order.
    // A rejected file or resource is reported and skipped;
    // only a rejected built-in default is returned as error.
    pub(crate) fn search<T, E, F>(
        &self,
        descriptor: &BackendDescriptor,
        mut accept: F,
    ) -> Result<Search<T>, E>
    where
        F: FnMut(&ConfigSource) -> Result<T, E>,
        E: Error,
    {
        if let Some((key, value)) = self.already_set(descriptor) {
            self.diagnostics.log_logging(format_args!("already set"));
            return Ok(Search::AlreadyConfigured { key, value });
        }

        self.diagnostics
            .log_logging(format_args!("Setup: {}", descriptor.display_name));

        for filename in descriptor.candidate_filenames {
            if let Some(found) = self.offer(self.try_file(filename), &mut accept) {
                return Ok(found);
            }
            if let Some(found) = self.offer(self.try_resource(filename), &mut accept) {
                return Ok(found);
            }
            if let Some(path_base) = self.path_base {
                let resource_name = format!("{path_base}{filename}");
                if let Some(found) = self.offer(self.try_resource(&resource_name), &mut accept) {
                    return Ok(found);
                }
            }
        }

        self.diagnostics
            .log_logging(format_args!("Use default setup"));
        let default = ConfigSource {
            content: Cow::Borrowed(descriptor.default_config),
            name: None,
            kind: SourceKind::Default,
            property_value: None,
        };
        let accepted = accept(&default)?;
        Ok(Search::Accepted(default, accepted))
    }

    fn offer<T, E, F>(&self, o_source: Option<ConfigSource>, accept: &mut F) -> Option<Search<T>>
    where
        F: FnMut(&ConfigSource) -> Result<T, E>,
        E: Error,
    {
        let source = o_source?;
        match accept(&source) {
            Ok(accepted) => Some(Search::Accepted(source, accepted)),
            Err(e) => {
                self.diagnostics.log_logging(format_args!(
                    "{} rejected: {}",
                    source.name.as_deref().unwrap_or_default(),
                    ErrorChain(&e)
                ));
                None
            }
        }
    }

    fn already_set(&self, descriptor: &BackendDescriptor) -> Option<(&'static str, String)> {
        let key = descriptor.system_property_key?;
        let value = self.properties.get(key)?;
        self.diagnostics
            .log_logging(format_args!("{key} = {value}"));
        Some((key, value))
    }

    fn try_file(&self, filename: &str) -> Option<ConfigSource> {
        self.diagnostics
            .log_logging(format_args!("try file {filename}"));
        let path = match self.working_dir {
            Some(dir) => dir.join(filename),
            None => PathBuf::from(filename),
        };
        if !path.exists() {
            return None;
        }
        self.diagnostics
            .log_logging(format_args!("found file:{}", path.display()));
        match fs::read(&path) {
            Ok(content) => Some(ConfigSource {
                content: Cow::Owned(content),
                name: Some(path.display().to_string()),
                kind: SourceKind::File,
                property_value: Some(format!("file:{}", path.display())),
            }),
            Err(e) => {
                self.diagnostics
                    .log_logging(format_args!("cannot read {}: {e}", path.display()));
                None
            }
        }
    }

    fn try_resource(&self, resource_name: &str) -> Option<ConfigSource> {
        self.diagnostics
            .log_logging(format_args!("try resource {resource_name}"));
        let resource: Resource = self.resources.find(resource_name)?;
        self.diagnostics
            .log_logging(format_args!("found via resources {}", resource.location));
        match resource.read() {
            Ok(content) => Some(ConfigSource {
                content,
                name: Some(resource_name.to_string()),
                kind: SourceKind::Resource,
                property_value: Some(resource.location),
            }),
            Err(e) => {
                self.diagnostics.log_logging(format_args!(
                    "cannot read {}: {e}",
                    resource.location
                ));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigSourceLocator, Located, Search, SourceKind, DEFAULT_PATH_BASE};
    use crate::{
        backend::{descriptor, BackendId},
        diagnostics::{BufferSink, Diagnostics},
        LoggingSetupError, Properties, Resources,
    };
    use std::{path::Path, sync::Arc};

    struct Fixture {
        resources: Resources,
        properties: Properties,
        diagnostics: Diagnostics,
        sink: BufferSink,
    }

    impl Fixture {
        fn new() -> Self {
            let sink = BufferSink::new();
            Self {
                resources: Resources::new(),
                properties: Properties::isolated(),
                diagnostics: Diagnostics::new(Arc::new(sink.clone()), true),
                sink,
            }
        }

        fn locator<'a>(&'a self, working_dir: Option<&'a Path>) -> ConfigSourceLocator<'a> {
            ConfigSourceLocator {
                working_dir,
                resources: &self.resources,
                properties: &self.properties,
                path_base: Some(DEFAULT_PATH_BASE),
                diagnostics: &self.diagnostics,
            }
        }
    }

    fn source(located: Located) -> super::ConfigSource {
        match located {
            Located::Source(source) => source,
            Located::AlreadyConfigured { key, value } => panic!("already configured: {key}={value}"),
        }
    }

    #[test]
    fn falls_back_to_the_default() {
        let fixture = Fixture::new();
        let dir = temp_dir::TempDir::new().unwrap();
        let logspec = descriptor(BackendId::Logspec);

        let source = source(fixture.locator(Some(dir.path())).locate(logspec));
        assert_eq!(source.kind, SourceKind::Default);
        assert_eq!(&*source.content, logspec.default_config);
        assert_eq!(source.name, None);
        assert_eq!(source.property_value, None);
        assert!(fixture.sink.contains("Use default setup"));
    }

    #[test]
    fn file_wins_over_resources() {
        let mut fixture = Fixture::new();
        fixture
            .resources
            .add_embedded("logspec.toml", b"global_level = \"warn\"");
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.path().join("logspec.toml");
        std::fs::write(&path, "global_level = \"debug\"").unwrap();

        let source = source(
            fixture
                .locator(Some(dir.path()))
                .locate(descriptor(BackendId::Logspec)),
        );
        assert_eq!(source.kind, SourceKind::File);
        assert_eq!(&*source.content, b"global_level = \"debug\"");
        assert_eq!(
            source.property_value,
            Some(format!("file:{}", path.display()))
        );
        assert!(!fixture.sink.contains("try resource"));
    }

    #[test]
    fn resources_by_bare_name_then_below_path_base() {
        let mut fixture = Fixture::new();
        fixture
            .resources
            .add_embedded("log-conf/logging.properties", b".level = FINE");
        let dir = temp_dir::TempDir::new().unwrap();

        let source = source(
            fixture
                .locator(Some(dir.path()))
                .locate(descriptor(BackendId::Stderr)),
        );
        assert_eq!(source.kind, SourceKind::Resource);
        assert_eq!(source.name.as_deref(), Some("log-conf/logging.properties"));
        assert_eq!(
            source.property_value.as_deref(),
            Some("embedded:log-conf/logging.properties")
        );
        let lines = fixture.sink.lines();
        let bare = lines
            .iter()
            .position(|l| l.ends_with("try resource logging.properties"))
            .unwrap();
        let prefixed = lines
            .iter()
            .position(|l| l.ends_with("try resource log-conf/logging.properties"))
            .unwrap();
        assert!(bare < prefixed);
    }

    #[test]
    fn already_set_short_circuits() {
        let fixture = Fixture::new();
        fixture
            .properties
            .set("TRACING_CONFIG_FILE", "file:/etc/tracing.toml");
        match fixture.locator(None).locate(descriptor(BackendId::Tracing)) {
            Located::AlreadyConfigured { key, value } => {
                assert_eq!(key, "TRACING_CONFIG_FILE");
                assert_eq!(value, "file:/etc/tracing.toml");
            }
            Located::Source(source) => panic!("unexpected source {source:?}"),
        }
        assert!(!fixture.sink.contains("try file"));
    }

    #[test]
    fn no_op_yields_its_empty_default() {
        let fixture = Fixture::new();
        let source = source(fixture.locator(None).locate(descriptor(BackendId::NoOp)));
        assert_eq!(source.kind, SourceKind::Default);
        assert!(source.content.is_empty());
    }

    #[test]
    fn rejected_candidates_are_skipped() {
        let mut fixture = Fixture::new();
        fixture
            .resources
            .add_embedded("log-conf/logspec.toml", b"global_level = \"warn\"");
        let dir = temp_dir::TempDir::new().unwrap();
        std::fs::write(dir.path().join("logspec.toml"), "global_level = [").unwrap();

        let mut offered = Vec::new();
        let search = fixture
            .locator(Some(dir.path()))
            .search(descriptor(BackendId::Logspec), |source| {
                offered.push(source.kind);
                if source.kind == SourceKind::File {
                    Err(LoggingSetupError::LevelFilter("broken".to_string()))
                } else {
                    Ok(source.content.len())
                }
            })
            .unwrap();
        match search {
            Search::Accepted(source, len) => {
                assert_eq!(source.name.as_deref(), Some("log-conf/logspec.toml"));
                assert_eq!(len, source.content.len());
            }
            Search::AlreadyConfigured { key, .. } => panic!("already configured: {key}"),
        }
        assert_eq!(offered, vec![SourceKind::File, SourceKind::Resource]);
        assert!(fixture.sink.contains("logspec.toml rejected: invalid level filter: broken"));
    }

    #[test]
    fn rejected_default_is_returned() {
        let fixture = Fixture::new();
        let dir = temp_dir::TempDir::new().unwrap();
        std::fs::write(dir.path().join("logging.properties"), "broken").unwrap();

        let mut attempts = 0;
        let result = fixture
            .locator(Some(dir.path()))
            .search(descriptor(BackendId::Stderr), |_| {
                attempts += 1;
                Err::<(), _>(LoggingSetupError::EngineTaken("log logger"))
            });
        assert!(matches!(result, Err(LoggingSetupError::EngineTaken(_))));
        assert_eq!(attempts, 2);
    }
}
