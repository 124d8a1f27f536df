mod test_utils;

use logging_setup::{backends::ActiveBackend, markers, BackendId};
use test_utils::write_file;
use tracing::Level;

// The global subscriber can be set only once per process, so everything
// that looks at it lives in this single test.
#[test]
fn test_live_tracing() {
    assert!(!tracing::dispatcher::has_been_set());

    let f = test_utils::fixture(&[markers::TRACING_ENGINE, markers::TRACING_BRIDGE]);
    write_file(f.dir.path(), "tracing.filter", "warn\nmy_app=debug\n");
    let handle = f.system.ensure_configured().unwrap();
    assert_eq!(handle.id(), BackendId::Tracing);
    assert!(tracing::dispatcher::has_been_set());
    let ActiveBackend::Tracing(backend) = handle.backend() else {
        panic!("unexpected backend {:?}", handle.backend());
    };
    assert!(backend.is_live());

    assert!(tracing::enabled!(target: "my_app", Level::DEBUG));
    assert!(!tracing::enabled!(target: "hyper", Level::INFO));
    assert!(tracing::enabled!(target: "hyper", Level::WARN));

    handle.set_level("hyper", Some("info"));
    assert!(tracing::enabled!(target: "hyper", Level::INFO));

    handle.disable("my_app");
    assert!(!tracing::enabled!(target: "my_app", Level::ERROR));

    handle.enable("my_app");
    assert!(tracing::enabled!(target: "my_app", Level::TRACE));

    // a second system shares the installed subscriber
    let f = test_utils::fixture(&[markers::TRACING_ENGINE, markers::TRACING_BRIDGE]);
    let handle = f.system.ensure_configured().unwrap();
    assert_eq!(handle.id(), BackendId::Tracing);
    assert!(!tracing::enabled!(target: "my_app", Level::DEBUG));
    assert!(tracing::enabled!(target: "my_app", Level::INFO));
}
