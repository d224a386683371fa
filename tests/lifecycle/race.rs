//! Concurrent creates for the same id.

use std::sync::{Arc, Barrier};
use std::thread;

use textcat_registry::{ModelStatus, RegistryError};

use crate::support::{create_input, forced_input, service, status_of};

const CONTENDERS: usize = 8;

#[test]
fn exactly_one_plain_create_wins() {
    let service = Arc::new(service());
    let barrier = Arc::new(Barrier::new(CONTENDERS));

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|_| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                service.create_model(create_input("contested"))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, RegistryError::ModelAlreadyExists { .. })));

    assert_eq!(service.sender().pending("training"), 1);
    let entry = service.get_model("contested").unwrap();
    assert_eq!(entry.task_id.as_deref(), Some(winners[0].task_id.as_str()));
}

#[test]
fn concurrent_forced_creates_all_succeed_last_writer_wins() {
    let service = Arc::new(service());
    service.create_model(create_input("m")).unwrap();
    let barrier = Arc::new(Barrier::new(CONTENDERS));

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|_| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                service.create_model(forced_input("m"))
            })
        })
        .collect();

    let tickets: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();

    assert_eq!(status_of(&service, "m"), Some(ModelStatus::Started));
    let owner = service.get_model("m").unwrap().task_id.unwrap();
    assert!(tickets.iter().any(|t| t.task_id == owner));
    assert_eq!(service.sender().pending("training"), CONTENDERS + 1);
}
