use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

/// Process-lifetime key/value namespace that records where a backend's
/// configuration came from.
///
/// Values written by the setup live in memory only. Lookups fall back to the
/// process environment, so that e.g. an exported `LOGSPEC_CONFIG_FILE`
/// counts as "already configured" as well.
#[derive(Debug)]
pub struct Properties {
    values: RwLock<HashMap<String, String>>,
    consult_env: bool,
}

impl Default for Properties {
    fn default() -> Self {
        Self::new()
    }
}

impl Properties {
    /// An empty namespace that also consults the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            consult_env: true,
        }
    }

    /// An empty namespace that ignores the process environment.
    #[must_use]
    pub fn isolated() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            consult_env: false,
        }
    }

    /// Looks up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let value = self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        if value.is_some() || !self.consult_env {
            value
        } else {
            std::env::var(key).ok()
        }
    }

    /// Sets a value.
    pub fn set<K: Into<String>, V: Into<String>>(&self, key: K, value: V) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Removes a value that was set with [`Properties::set`].
    pub fn remove(&self, key: &str) -> Option<String> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }
}
