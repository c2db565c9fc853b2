//! Error handling and edge case tests.

use parking_lot::Mutex;
use record_facade::{
    args, AckCallback, Arg, ArgumentField, FacadeError, OperationalError, RecordConfig,
    RecordEvent, RecordEventKind, RecordRegistry, SubscriptionCallback,
};
use serde_json::json;
use std::sync::Arc;

fn registry() -> RecordRegistry {
    RecordRegistry::new(RecordConfig::default())
}

fn errors_of(doc: &record_facade::RecordFacade) -> Arc<Mutex<Vec<OperationalError>>> {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let clone = Arc::clone(&errors);
    doc.on(RecordEventKind::Error, move |event| {
        if let RecordEvent::Error(error) = event {
            clone.lock().push(error.clone());
        }
    });
    errors
}

// --- Caller Errors ---

#[test]
fn test_set_arity_errors() {
    let doc = registry().get_record("doc").unwrap();

    let result = doc.set(&[]);
    assert_eq!(result.unwrap_err().field(), Some(ArgumentField::Arity));

    let ack = AckCallback::new(|_| {});
    let result = doc.set(&args!["a", json!(1), ack, true]);
    assert_eq!(result.unwrap_err().field(), Some(ArgumentField::Arity));
}

#[test]
fn test_empty_path_for_every_write_style() {
    let doc = registry().get_record("doc").unwrap();
    let ack = AckCallback::new(|_| {});

    for args in [
        args!["", json!(1)],
        args!["", json!(1), ack.clone()],
    ] {
        let err = doc.set(&args).unwrap_err();
        assert_eq!(err.field(), Some(ArgumentField::Path));
        let err = doc.set_with_ack(&args).unwrap_err();
        assert_eq!(err.field(), Some(ArgumentField::Path));
    }
}

#[test]
fn test_separator_only_paths_are_caller_errors() {
    let doc = registry().get_record("doc").unwrap();
    doc.set(&args![json!({"a": 1})]).unwrap();

    for path in [".", "/", "[]", "./[]"] {
        let err = doc.set(&args![path, json!(5)]).unwrap_err();
        assert_eq!(err.field(), Some(ArgumentField::Path));
        let err = doc.erase(path).unwrap_err();
        assert_eq!(err.field(), Some(ArgumentField::Path));
    }
    assert_eq!(doc.get(None), json!({"a": 1}));
}

#[test]
fn test_error_message_names_field() {
    let doc = registry().get_record("doc").unwrap();
    let err = doc.set(&args!["p", json!(1), "nope"]).unwrap_err();
    assert!(err.to_string().contains("callback"));
}

#[test]
fn test_rejected_write_changes_nothing() {
    let doc = registry().get_record("doc").unwrap();
    let _ = doc.set(&[Arg::Undefined]);
    assert_eq!(doc.version(), 0);
    assert_eq!(doc.get(None), json!({}));
}

#[test]
fn test_unsubscribe_after_discard() {
    let doc = registry().get_record("doc").unwrap();
    let callback = SubscriptionCallback::new(|_| {});
    doc.subscribe(&args![callback.clone()]).unwrap();
    doc.discard();

    assert!(matches!(
        doc.unsubscribe(&args![callback]),
        Err(FacadeError::Discarded(name)) if name == "doc"
    ));
}

// --- Operational Errors ---

#[test]
fn test_write_after_delete_is_reported_not_returned() {
    let registry = registry();
    let doc = registry.get_record("doc").unwrap();
    let errors = errors_of(&doc);

    doc.delete(None);
    doc.set(&args!["a", json!(1)]).unwrap();

    assert_eq!(
        *errors.lock(),
        vec![OperationalError::RecordDeleted("doc".into())]
    );
}

#[test]
fn test_delete_twice_acknowledges_with_error() {
    let doc = registry().get_record("doc").unwrap();
    let acks = Arc::new(Mutex::new(Vec::new()));

    for _ in 0..2 {
        let clone = Arc::clone(&acks);
        doc.delete(Some(AckCallback::new(move |err| {
            clone.lock().push(err.cloned())
        })));
    }

    assert_eq!(
        *acks.lock(),
        vec![None, Some(OperationalError::RecordDeleted("doc".into()))]
    );
}

#[test]
fn test_subscribe_to_deleted_record_reports_error() {
    let doc = registry().get_record("doc").unwrap();
    let errors = errors_of(&doc);
    doc.delete(None);

    doc.subscribe(&args!["a", SubscriptionCallback::new(|_| {})])
        .unwrap();

    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], OperationalError::SubscriptionFailed(_)));
}

#[test]
fn test_injected_failure_reaches_listener_unchanged() {
    let registry = registry();
    let doc = registry.get_record("doc").unwrap();
    let errors = errors_of(&doc);

    let failure = OperationalError::LoadFailed("timeout after 3 attempts".into());
    registry.record("doc").unwrap().report_error(failure.clone());

    assert_eq!(*errors.lock(), vec![failure]);
}

#[test]
fn test_oversized_index_is_rejected_not_panicking() {
    let doc = registry().get_record("doc").unwrap();
    let errors = errors_of(&doc);
    doc.set(&args![json!({"list": [1]})]).unwrap();

    doc.set(&args!["list[18446744073709551615]", json!(1)]).unwrap();
    doc.set(&args!["list[100000000000]", json!(1)]).unwrap();

    let acks = Arc::new(Mutex::new(Vec::new()));
    let clone = Arc::clone(&acks);
    let ack = AckCallback::new(move |err| clone.lock().push(err.cloned()));
    doc.set_with_ack(&args!["list[100000000000]", json!(1), ack])
        .unwrap();

    assert_eq!(doc.get(None), json!({"list": [1]}));
    assert_eq!(doc.version(), 1);
    assert_eq!(errors.lock().len(), 2);
    assert!(errors
        .lock()
        .iter()
        .all(|err| matches!(err, OperationalError::WriteRejected(_))));
    assert!(matches!(
        acks.lock().as_slice(),
        [Some(OperationalError::WriteRejected(_))]
    ));
}

#[test]
fn test_unbalanced_brackets_are_plain_segments() {
    let doc = registry().get_record("doc").unwrap();

    doc.set(&args!["a[3", json!(true)]).unwrap();
    doc.set(&args!["]", json!(1)]).unwrap();

    assert_eq!(doc.get(Some("a[3]")), json!(true));
    assert_eq!(doc.get(Some("]")), json!(1));
}
