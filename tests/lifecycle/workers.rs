//! The training pool running against the service end to end.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use textcat_registry::{
    ImmediateTrainer, ModelStatus, ServiceConfig, TrainingFailure, TrainingRequest,
};

use crate::support::{
    config, create_input, forced_input, service, service_with, status_of, wait_until,
};

#[test]
fn pool_trains_every_queued_model() {
    let service = service_with(&ServiceConfig {
        worker_count: 2,
        ..config()
    });
    let pool = service
        .spawn_workers(ImmediateTrainer, service.sender().clone())
        .unwrap();
    assert_eq!(pool.size(), 2);

    for id in ["a", "b", "c"] {
        service.create_model(create_input(id)).unwrap();
    }

    wait_until("all models active", || {
        ["a", "b", "c"]
            .iter()
            .all(|id| status_of(&service, id) == Some(ModelStatus::Active))
    });

    let stats = pool.stop();
    assert_eq!(stats.trained, 3);
    assert_eq!(stats.completed(), 3);
    assert!(stats.polls >= 3);

    let queue = service.sender();
    assert_eq!(queue.pending("training"), 0);
    assert_eq!(queue.in_flight(), 0);
    assert_eq!(queue.acknowledged().len(), 3);
}

#[test]
fn failing_routine_marks_model_failed() {
    let service = service();
    let pool = service
        .spawn_workers(
            |r: &TrainingRequest| -> Result<(), TrainingFailure> {
                Err(TrainingFailure::new(format!("cannot read {}", r.training_object)))
            },
            service.sender().clone(),
        )
        .unwrap();

    service.create_model(create_input("m")).unwrap();
    wait_until("model failed", || {
        status_of(&service, "m") == Some(ModelStatus::Failed)
    });

    let stats = pool.stop();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.trained, 0);
}

#[test]
fn delete_during_training_is_not_resurrected() {
    let service = service();
    let started = Arc::new(Barrier::new(2));
    let proceed = Arc::new(Barrier::new(2));

    let routine = {
        let started = Arc::clone(&started);
        let proceed = Arc::clone(&proceed);
        move |_: &TrainingRequest| -> Result<(), TrainingFailure> {
            started.wait();
            proceed.wait();
            Ok(())
        }
    };
    let pool = service
        .spawn_workers(routine, service.sender().clone())
        .unwrap();

    service.create_model(create_input("m")).unwrap();
    started.wait();
    service.delete_model("m").unwrap();
    proceed.wait();

    wait_until("job acknowledged", || {
        service.sender().acknowledged().len() == 1
    });
    let stats = pool.stop();

    assert_eq!(stats.orphaned, 1);
    assert_eq!(stats.trained, 0);
    assert_eq!(status_of(&service, "m"), None);
}

#[test]
fn forced_restart_during_training_wins_over_old_task() {
    let service = service();
    let started = Arc::new(Barrier::new(2));
    let proceed = Arc::new(Barrier::new(2));

    // Only the first training run blocks.
    let routine = {
        let started = Arc::clone(&started);
        let proceed = Arc::clone(&proceed);
        move |r: &TrainingRequest| -> Result<(), TrainingFailure> {
            if r.training_object == "trainingSet.json" {
                started.wait();
                proceed.wait();
            }
            Ok(())
        }
    };
    let pool = service
        .spawn_workers(routine, service.sender().clone())
        .unwrap();

    let first = service.create_model(create_input("m")).unwrap();
    started.wait();
    let second = service.create_model(forced_input("m")).unwrap();
    proceed.wait();

    wait_until("both jobs acknowledged", || {
        service.sender().acknowledged().len() == 2
    });
    let stats = pool.stop();

    assert_eq!(stats.stale, 1);
    assert_eq!(stats.trained, 1);

    let entry = service.get_model("m").unwrap();
    assert_eq!(entry.status, ModelStatus::Active);
    assert_eq!(entry.task_id.as_deref(), Some(second.task_id.as_str()));
    assert_ne!(first.task_id, second.task_id);
}

#[test]
fn redelivered_job_is_idempotent() {
    let service = service();
    let pool = service
        .spawn_workers(ImmediateTrainer, service.sender().clone())
        .unwrap();

    let ticket = service.create_model(create_input("m")).unwrap();
    wait_until("model active", || {
        status_of(&service, "m") == Some(ModelStatus::Active)
    });
    wait_until("job acknowledged", || {
        service.sender().acknowledged().len() == 1
    });

    service
        .sender()
        .redeliver("training", &ticket.task_id)
        .unwrap();
    wait_until("redelivery acknowledged", || {
        service.sender().acknowledged().len() == 2
    });

    let stats = pool.stop();
    assert_eq!(stats.trained, 1);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(status_of(&service, "m"), Some(ModelStatus::Active));
}

#[test]
fn store_outage_returns_job_to_queue() {
    let service = service();
    service.create_model(create_input("m")).unwrap();
    service.registry().store().set_unavailable(true);

    let pool = service
        .spawn_workers(ImmediateTrainer, service.sender().clone())
        .unwrap();
    thread::sleep(Duration::from_millis(100));
    assert!(service.sender().acknowledged().is_empty());

    service.registry().store().set_unavailable(false);
    wait_until("model active", || {
        status_of(&service, "m") == Some(ModelStatus::Active)
    });

    let stats = pool.stop();
    assert!(stats.errored >= 1);
    assert_eq!(stats.trained, 1);
}
