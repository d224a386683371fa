//! Create, force-replace, list and delete without any workers running.

use textcat_registry::{
    CreateModelInput, ModelStatus, RegistryError, TRAINING_STARTED, TRAIN_JOB_TYPE,
};

use crate::support::{create_input, forced_input, service, status_of};

#[test]
fn tc01_create_conflict_then_forced_replace() {
    let service = service();

    let first = service.create_model(create_input("tc-01")).unwrap();
    assert_eq!(first.status, TRAINING_STARTED);
    assert_eq!(first.model_id, "tc-01");
    assert_eq!(status_of(&service, "tc-01"), Some(ModelStatus::Started));

    let err = service.create_model(create_input("tc-01")).unwrap_err();
    assert!(matches!(err, RegistryError::ModelAlreadyExists { ref id } if id == "tc-01"));
    assert_eq!(service.sender().pending("training"), 1);

    let forced = service.create_model(forced_input("tc-01")).unwrap();
    assert_ne!(forced.task_id, first.task_id);

    let replaced = forced.replaced.expect("forced create returns the old record");
    assert_eq!(replaced.task_id.as_deref(), Some(first.task_id.as_str()));

    let entry = service.get_model("tc-01").unwrap();
    assert_eq!(entry.status, ModelStatus::Started);
    assert_eq!(entry.task_id.as_deref(), Some(forced.task_id.as_str()));
    assert_eq!(entry.data.unwrap().training_object, "trainingSet-v2.json");

    let jobs = service.sender().sent();
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|j| j.job_type == TRAIN_JOB_TYPE));
}

#[test]
fn forced_create_resets_finished_model() {
    let service = service();
    service.create_model(create_input("m")).unwrap();
    service
        .registry()
        .update_status("m", ModelStatus::Failed)
        .unwrap();

    service.create_model(forced_input("m")).unwrap();
    assert_eq!(status_of(&service, "m"), Some(ModelStatus::Started));
}

#[test]
fn forced_create_of_new_id_creates() {
    let service = service();
    let ticket = service.create_model(forced_input("fresh")).unwrap();
    assert!(ticket.replaced.is_none());
    assert_eq!(status_of(&service, "fresh"), Some(ModelStatus::Started));
}

#[test]
fn list_is_empty_then_shows_started_entry() {
    let service = service();
    assert!(service.list_models().unwrap().is_empty());

    service.create_model(create_input("m1")).unwrap();

    let models = service.list_models().unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].id, "m1");
    assert_eq!(models[0].status, ModelStatus::Started);

    let data = models[0].data.as_ref().unwrap();
    assert_eq!(data.s3bucket, "albert-textcats");
    assert_eq!(data.n_texts, 500);
    assert_eq!(data.n_iter, 10);
}

#[test]
fn list_keeps_malformed_records() {
    let service = service();
    service.create_model(create_input("good")).unwrap();
    service
        .registry()
        .store()
        .put_raw("bad", "{not json", ModelStatus::Active)
        .unwrap();

    let models = service.list_models().unwrap();
    assert_eq!(models.len(), 2);

    let bad = models.iter().find(|m| m.id == "bad").unwrap();
    assert!(bad.data.is_none());
    assert!(bad.decode_error.is_some());
}

#[test]
fn delete_absent_is_not_found() {
    let service = service();
    let err = service.delete_model("ghost").unwrap_err();
    assert!(matches!(err, RegistryError::NotFound { ref id } if id == "ghost"));
}

#[test]
fn delete_present_removes_record() {
    let service = service();
    service.create_model(create_input("m")).unwrap();

    let deleted = service.delete_model("m").unwrap();
    assert_eq!(deleted.id, "m");
    assert_eq!(deleted.status, ModelStatus::Started);

    assert_eq!(status_of(&service, "m"), None);
    assert!(service.list_models().unwrap().is_empty());
}

#[test]
fn missing_fields_are_rejected_before_any_write() {
    let service = service();
    let input: CreateModelInput =
        serde_json::from_str(r#"{"id": "m", "s3bucket": "b"}"#).unwrap();

    let err = service.create_model(input).unwrap_err();
    assert!(matches!(err, RegistryError::Validation(_)));
    assert_eq!(err.status_code(), 400);
    assert!(service.registry().store().is_empty());
    assert!(service.sender().sent().is_empty());
}

#[test]
fn enqueue_failure_leaves_failed_record() {
    let service = service();
    service.sender().set_unavailable(true);

    let err = service.create_model(create_input("m")).unwrap_err();
    assert!(matches!(err, RegistryError::Queue(_)));
    assert_eq!(status_of(&service, "m"), Some(ModelStatus::Failed));

    service.sender().set_unavailable(false);
    let err = service.create_model(create_input("m")).unwrap_err();
    assert!(matches!(err, RegistryError::ModelAlreadyExists { .. }));

    service.create_model(forced_input("m")).unwrap();
    assert_eq!(status_of(&service, "m"), Some(ModelStatus::Started));
}

#[test]
fn store_outage_is_a_store_error() {
    let service = service();
    service.registry().store().set_unavailable(true);

    let err = service.create_model(create_input("m")).unwrap_err();
    assert!(matches!(err, RegistryError::Store(_)));
    assert!(service.sender().sent().is_empty());
}
