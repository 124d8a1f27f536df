#![allow(dead_code)]

use logging_setup::{
    diagnostics::BufferSink, markers::Markers, LoggingSystem, LoggingSystemBuilder, Properties,
};
use std::{path::Path, sync::Arc};
use temp_dir::TempDir;

// A logging system with its own working directory, marker registry,
// property namespace and diagnostic buffer.
pub struct Fixture {
    pub system: LoggingSystem,
    pub sink: BufferSink,
    pub markers: Arc<Markers>,
    pub dir: TempDir,
}

pub fn fixture(installed: &[&str]) -> Fixture {
    fixture_with(installed, |builder| builder)
}

pub fn fixture_with<F>(installed: &[&str], configure: F) -> Fixture
where
    F: FnOnce(LoggingSystemBuilder) -> LoggingSystemBuilder,
{
    let dir = TempDir::new().unwrap();
    let sink = BufferSink::new();
    let markers = Arc::new(Markers::new(installed.iter().copied()));
    let builder = LoggingSystem::builder()
        .shared_markers(markers.clone())
        .working_dir(dir.path())
        .properties(Properties::isolated())
        .diagnostic_sink(sink.clone())
        .log_setup(true);
    Fixture {
        system: configure(builder).build(),
        sink,
        markers,
        dir,
    }
}

pub fn write_file(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}
