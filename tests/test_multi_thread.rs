mod test_utils;

use logging_setup::{markers, BackendHandle, BackendId, CanonicalLevel};
use std::{
    sync::{Arc, Barrier},
    thread,
};

const NO_OF_THREADS: usize = 8;

#[test]
fn test_concurrent_first_calls() {
    let f = Arc::new(test_utils::fixture(&[
        markers::LOGSPEC_ENGINE,
        markers::LOGSPEC_BRIDGE,
        markers::STDERR_LOGGER,
    ]));
    let barrier = Arc::new(Barrier::new(NO_OF_THREADS));

    let workers: Vec<_> = (0..NO_OF_THREADS)
        .map(|_| {
            let f = Arc::clone(&f);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                f.system.ensure_configured().unwrap()
            })
        })
        .collect();
    let handles: Vec<BackendHandle> = workers
        .into_iter()
        .map(|worker| worker.join().unwrap())
        .collect();

    assert_eq!(handles[0].id(), BackendId::Logspec);
    for handle in &handles[1..] {
        assert!(handle.same_as(&handles[0]));
    }
    // the pipeline ran once
    assert_eq!(
        f.sink
            .lines()
            .iter()
            .filter(|line| line.contains("Setup: logspec"))
            .count(),
        1
    );
    assert_eq!(
        f.sink
            .lines()
            .iter()
            .filter(|line| line.contains("Found logspec and stderr setups"))
            .count(),
        1
    );
}

#[test]
fn test_concurrent_level_changes() {
    let f = Arc::new(test_utils::fixture(&[markers::STDERR_LOGGER]));
    let handle = f.system.ensure_configured().unwrap();
    let barrier = Arc::new(Barrier::new(NO_OF_THREADS));

    let workers: Vec<_> = (0..NO_OF_THREADS)
        .map(|index| {
            let handle = handle.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for round in 0..100 {
                    let logger = format!("worker{index}");
                    if round % 2 == 0 {
                        handle.set_warn(&logger);
                    } else {
                        handle.set_error(&logger);
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    for index in 0..NO_OF_THREADS {
        assert_eq!(
            handle.effective_level(&format!("worker{index}")),
            Some(CanonicalLevel::Error)
        );
    }
}
