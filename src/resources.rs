//! Named configuration resources, looked up by relative name.
//!
//! Resources are searched in an ordered list of root directories first,
//! then among the resources that were compiled into the binary.

use std::{
    borrow::Cow,
    collections::BTreeMap,
    fs,
    path::PathBuf,
};

/// Environment variable with a platform-specific path list of resource roots.
pub const RESOURCE_PATH_ENV_VAR: &str = "LOGGING_SETUP_RESOURCE_PATH";

// Locations that contain one of these come from test builds and are skipped.
const TEST_ARTIFACT_MARKERS: &[&str] = &["test-classes", "-tests.jar", "/tests/", "\\tests\\"];

/// Ordered resource roots plus embedded resources.
#[derive(Clone, Debug, Default)]
pub struct Resources {
    roots: Vec<PathBuf>,
    embedded: BTreeMap<String, &'static [u8]>,
}

/// A resource that was found.
#[derive(Clone, Debug)]
pub struct Resource {
    /// Where it was found: `file:<absolute path>` or `embedded:<name>`.
    pub location: String,
    pub(crate) origin: ResourceOrigin,
}

#[derive(Clone, Debug)]
pub(crate) enum ResourceOrigin {
    File(PathBuf),
    Embedded(&'static [u8]),
}

impl Resources {
    /// No roots, no embedded resources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Roots from the environment variable [`RESOURCE_PATH_ENV_VAR`].
    #[must_use]
    pub fn from_env() -> Self {
        let mut resources = Self::new();
        if let Some(paths) = std::env::var_os(RESOURCE_PATH_ENV_VAR) {
            resources.roots.extend(std::env::split_paths(&paths));
        }
        resources
    }

    /// Appends a root directory.
    pub fn add_root<P: Into<PathBuf>>(&mut self, root: P) {
        self.roots.push(root.into());
    }

    /// Registers a compiled-in resource, e.g. from `include_bytes!`.
    pub fn add_embedded<S: Into<String>>(&mut self, name: S, content: &'static [u8]) {
        self.embedded.insert(name.into(), content);
    }

    /// The root directories, in search order.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Finds a resource by relative name.
    ///
    /// Returns `None` if no root has it, or if the only match
    /// looks like a test artifact.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<Resource> {
        self.roots
            .iter()
            .map(|root| root.join(name))
            .find(|path| path.is_file())
            .map(|path| {
                let absolute = fs::canonicalize(&path).unwrap_or(path);
                Resource {
                    location: format!("file:{}", absolute.display()),
                    origin: ResourceOrigin::File(absolute),
                }
            })
            .or_else(|| {
                self.embedded.get(name).map(|content| Resource {
                    location: format!("embedded:{name}"),
                    origin: ResourceOrigin::Embedded(*content),
                })
            })
            .filter(|resource| !is_test_artifact(&resource.location))
    }
}

impl Resource {
    // Reads the whole content.
    pub(crate) fn read(&self) -> std::io::Result<Cow<'static, [u8]>> {
        match self.origin {
            ResourceOrigin::File(ref path) => Ok(Cow::Owned(fs::read(path)?)),
            ResourceOrigin::Embedded(content) => Ok(Cow::Borrowed(content)),
        }
    }
}

pub(crate) fn is_test_artifact(location: &str) -> bool {
    TEST_ARTIFACT_MARKERS
        .iter()
        .any(|marker| location.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::{is_test_artifact, Resources};

    #[test]
    fn test_artifacts_are_recognized() {
        assert!(is_test_artifact("file:/build/test-classes/log4j2.xml"));
        assert!(is_test_artifact("file:/repo/crate/tests/logspec.toml"));
        assert!(!is_test_artifact("file:/etc/my-app/logspec.toml"));
        assert!(!is_test_artifact("embedded:logspec.toml"));
    }

    #[test]
    fn roots_come_before_embedded() {
        let dir = temp_dir::TempDir::new().unwrap();
        std::fs::write(dir.path().join("log.spec"), "debug").unwrap();

        let mut resources = Resources::new();
        resources.add_embedded("log.spec", b"info");
        resources.add_embedded("logspec.toml", b"global_level = \"warn\"");
        resources.add_root(dir.path());

        let found = resources.find("log.spec").unwrap();
        assert!(found.location.starts_with("file:"));
        assert_eq!(&*found.read().unwrap(), b"debug");

        let found = resources.find("logspec.toml").unwrap();
        assert_eq!(found.location, "embedded:logspec.toml");

        assert!(resources.find("missing.toml").is_none());
    }
}
