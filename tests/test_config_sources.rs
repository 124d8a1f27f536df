mod test_utils;

use logging_setup::{
    backends::{ActiveBackend, Severity},
    markers, BackendId, CanonicalLevel,
};
use test_utils::write_file;

const LOGSPEC: &[&str] = &[markers::LOGSPEC_ENGINE, markers::LOGSPEC_BRIDGE];

#[test]
fn test_file_in_working_directory() {
    let f = test_utils::fixture(LOGSPEC);
    write_file(
        f.dir.path(),
        "logspec.toml",
        r#"
global_level = "warn"

[modules]
"my_app::db" = "debug"
"#,
    );

    let handle = f.system.ensure_configured().unwrap();
    assert_eq!(handle.effective_level("my_app::db::pool"), Some(CanonicalLevel::Debug));
    assert_eq!(handle.effective_level("my_app::web"), Some(CanonicalLevel::Warn));

    let path = f.dir.path().join("logspec.toml");
    assert_eq!(
        f.system.properties().get("LOGSPEC_CONFIG_FILE"),
        Some(format!("file:{}", path.display()))
    );
    assert!(!f.sink.contains("try resource"));
    assert!(!f.sink.contains("Use default setup"));
}

#[test]
fn test_second_candidate_name() {
    let f = test_utils::fixture(LOGSPEC);
    write_file(f.dir.path(), "log.spec", "# app defaults\nerror\nmy_app = trace\n");

    let handle = f.system.ensure_configured().unwrap();
    assert_eq!(handle.effective_level("my_app"), Some(CanonicalLevel::Trace));
    assert_eq!(handle.effective_level("other"), Some(CanonicalLevel::Error));

    // every attempt for the first name precedes the second name
    let lines = f.sink.lines();
    let pos = |fragment: &str| lines.iter().position(|l| l.ends_with(fragment)).unwrap();
    assert!(pos("try resource log-conf/logspec.toml") < pos("try file log.spec"));
}

#[test]
fn test_resource_below_path_base() {
    let resources = temp_dir::TempDir::new().unwrap();
    write_file(
        resources.path(),
        "log-conf/logging.properties",
        "handlers = stderr\n.level = WARNING\nmy.db.level = FINE\n",
    );
    let f = test_utils::fixture_with(&[markers::STDERR_LOGGER], |b| {
        b.resource_root(resources.path())
    });

    let handle = f.system.ensure_configured().unwrap();
    let ActiveBackend::Stderr(stderr) = handle.backend() else {
        panic!("unexpected backend {:?}", handle.backend());
    };
    assert_eq!(stderr.level_for("my.db.pool"), Severity::Fine);
    assert_eq!(stderr.level_for("my.web"), Severity::Warning);

    let origin = f.system.properties().get("LOGGING_CONFIG_FILE").unwrap();
    assert!(origin.starts_with("file:"));
    assert!(origin.ends_with("logging.properties"));
}

#[test]
fn test_path_base() {
    let resources = temp_dir::TempDir::new().unwrap();
    write_file(resources.path(), "custom/log.spec", "debug");
    let f = test_utils::fixture_with(LOGSPEC, |b| b.resource_root(resources.path()));

    f.system.set_path_base(Some("custom"));
    assert_eq!(f.system.get_path_base().as_deref(), Some("custom/"));
    let handle = f.system.ensure_configured().unwrap();
    assert_eq!(handle.effective_level("x"), Some(CanonicalLevel::Debug));

    // without path base, the resource is not found
    f.system.allow_reset(true);
    f.system.properties().remove("LOGSPEC_CONFIG_FILE");
    f.system.set_path_base(None);
    f.sink.clear();
    let handle = f.system.ensure_configured().unwrap();
    assert_eq!(handle.effective_level("x"), Some(CanonicalLevel::Info));
    assert!(!f.sink.contains("try resource custom/"));
    assert!(f.sink.contains("Use default setup"));
}

#[test]
fn test_embedded_resource() {
    let f = test_utils::fixture_with(
        &[markers::TRACING_ENGINE, markers::TRACING_BRIDGE],
        |b| b.embedded_resource("tracing.filter", b"warn,my_app=trace\n"),
    );

    let handle = f.system.ensure_configured().unwrap();
    assert_eq!(handle.effective_level("my_app::x"), Some(CanonicalLevel::Trace));
    assert_eq!(handle.effective_level("hyper"), Some(CanonicalLevel::Warn));
    assert_eq!(
        f.system.properties().get("TRACING_CONFIG_FILE").as_deref(),
        Some("embedded:tracing.filter")
    );
}

#[test]
fn test_test_artifacts_are_skipped() {
    let resources = temp_dir::TempDir::new().unwrap();
    write_file(resources.path(), "test-classes/log.spec", "trace");
    let f = test_utils::fixture_with(LOGSPEC, |b| {
        b.resource_root(resources.path().join("test-classes"))
    });

    let handle = f.system.ensure_configured().unwrap();
    assert_eq!(handle.effective_level("x"), Some(CanonicalLevel::Info));
    assert!(f.sink.contains("Use default setup"));
}

#[test]
fn test_already_configured() {
    let f = test_utils::fixture(LOGSPEC);
    write_file(f.dir.path(), "logspec.toml", "global_level = \"trace\"\n");
    f.system
        .properties()
        .set("LOGSPEC_CONFIG_FILE", "file:/etc/my_app/logspec.toml");

    let handle = f.system.ensure_configured().unwrap();
    assert_eq!(handle.id(), BackendId::Logspec);
    assert!(f.sink.contains("already set"));
    assert!(!f.sink.contains("try file"));
    // the file was not read
    assert_ne!(handle.effective_level("x"), Some(CanonicalLevel::Trace));
    assert_eq!(
        f.system.properties().get("LOGSPEC_CONFIG_FILE").as_deref(),
        Some("file:/etc/my_app/logspec.toml")
    );
}

#[test]
fn test_malformed_file_falls_back_to_default() {
    let f = test_utils::fixture(&[markers::STDERR_LOGGER, markers::TRACING_ENGINE]);
    write_file(f.dir.path(), "logging.properties", "no separator\n");

    let handle = f.system.ensure_configured().unwrap();
    assert_eq!(handle.id(), BackendId::Stderr);
    assert_eq!(handle.effective_level("x"), Some(CanonicalLevel::Info));
    assert!(f.sink.contains("logging.properties rejected: stderr could not be initialized"));
    assert!(f.sink.contains("Use default setup"));
    assert_eq!(f.system.properties().get("LOGGING_CONFIG_FILE"), None);

    // a reset reads the repaired file
    write_file(f.dir.path(), "logging.properties", ".level = SEVERE\n");
    f.system.allow_reset(true);
    let handle = f.system.ensure_configured().unwrap();
    assert_eq!(handle.effective_level("x"), Some(CanonicalLevel::Error));
    assert!(f.system.properties().get("LOGGING_CONFIG_FILE").is_some());
}

#[test]
fn test_malformed_file_falls_back_to_resource() {
    let resources = temp_dir::TempDir::new().unwrap();
    write_file(resources.path(), "log-conf/tracing.filter", "warn,my_app=debug\n");
    let f = test_utils::fixture_with(&[markers::TRACING_ENGINE, markers::TRACING_BRIDGE], |b| {
        b.resource_root(resources.path())
    });
    write_file(f.dir.path(), "tracing.filter", "my_app=loudest\n");

    let handle = f.system.ensure_configured().unwrap();
    assert_eq!(handle.id(), BackendId::Tracing);
    assert_eq!(handle.effective_level("my_app::db"), Some(CanonicalLevel::Debug));
    assert_eq!(handle.effective_level("hyper"), Some(CanonicalLevel::Warn));
    assert!(f.sink.contains("tracing.filter rejected: tracing could not be initialized"));
    assert!(!f.sink.contains("Use default setup"));

    let origin = f.system.properties().get("TRACING_CONFIG_FILE").unwrap();
    assert!(origin.ends_with("log-conf/tracing.filter"));
}
