//! Property tests for argument normalization.

use proptest::prelude::*;
use record_facade::{
    normalize_set, normalize_subscribe, AckCallback, Arg, ArgumentField, RecordRegistry,
    SubscribeRequest, SubscriptionCallback,
};
use serde_json::{json, Value};

// ── Helpers ─────────────────────────────────────────────────────────────

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z]{0,6}".prop_map(Value::String),
    ]
}

fn object_strategy() -> impl Strategy<Value = Value> {
    proptest::collection::btree_map("[a-z]{1,4}", scalar_strategy(), 0..4)
        .prop_map(|map| json!(map))
}

fn path_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,5}([./][a-z0-9]{1,3}){0,3}"
}

fn arg_strategy() -> impl Strategy<Value = Arg> {
    prop_oneof![
        Just(Arg::Undefined),
        scalar_strategy().prop_map(Arg::Value),
        object_strategy().prop_map(Arg::Value),
        Just(Arg::Ack(AckCallback::new(|_| {}))),
        Just(Arg::Listener(SubscriptionCallback::new(|_| {}))),
    ]
}

proptest! {
    #[test]
    fn path_and_data_always_map_positionally(path in path_strategy(), data in object_strategy()) {
        let request = normalize_set(&[Arg::from(path.clone()), Arg::from(data.clone())], 0).unwrap();
        prop_assert_eq!(request.path, Some(path));
        prop_assert_eq!(request.data, Some(data));
        prop_assert!(request.callback.is_none());
    }

    #[test]
    fn object_with_ack_is_whole_record_write(data in object_strategy()) {
        let ack = AckCallback::new(|_| {});
        let request = normalize_set(&[Arg::from(data.clone()), Arg::from(ack.clone())], 0).unwrap();
        prop_assert_eq!(request.path, None);
        prop_assert_eq!(request.data, Some(data));
        prop_assert_eq!(request.callback, Some(ack));
    }

    #[test]
    fn unsupported_arity_always_fails(args in proptest::collection::vec(arg_strategy(), 4..8)) {
        let err = normalize_set(&args, 0).unwrap_err();
        prop_assert_eq!(err.field(), Some(ArgumentField::Arity));
    }

    #[test]
    fn empty_path_always_fails(data in scalar_strategy(), with_ack in any::<bool>()) {
        let mut args = vec![Arg::from(""), Arg::from(data)];
        if with_ack {
            args.push(Arg::from(AckCallback::new(|_| {})));
        }
        let err = normalize_set(&args, 0).unwrap_err();
        prop_assert_eq!(err.field(), Some(ArgumentField::Path));
    }

    #[test]
    fn set_never_panics(args in proptest::collection::vec(arg_strategy(), 0..5), start in 0usize..3) {
        if let Ok(request) = normalize_set(&args, start) {
            if let Some(path) = &request.path {
                prop_assert!(!path.is_empty());
            } else {
                prop_assert!(request.data.is_some());
            }
        }
    }

    #[test]
    fn subscribe_slots_independent_of_order(
        path in path_strategy(),
        trigger_now in any::<bool>(),
        order in Just(vec![0usize, 1, 2]).prop_shuffle(),
    ) {
        let callback = SubscriptionCallback::new(|_| {});
        let pieces = [
            Arg::from(path.clone()),
            Arg::from(callback.clone()),
            Arg::from(trigger_now),
        ];
        let shuffled: Vec<Arg> = order.iter().map(|&i| pieces[i].clone()).collect();

        let request = normalize_subscribe(&shuffled);
        prop_assert_eq!(request, normalize_subscribe(&pieces));
    }

    #[test]
    fn subscribe_is_idempotent(args in proptest::collection::vec(arg_strategy(), 0..5)) {
        let once = normalize_subscribe(&args);
        let twice: SubscribeRequest = normalize_subscribe(&[Arg::Subscription(once.clone())]);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn arbitrary_write_paths_keep_record_an_object(
        paths in proptest::collection::vec(".{0,16}|[a-z]{1,3}\\[[0-9]{1,20}\\]", 1..6),
        data in scalar_strategy(),
    ) {
        let registry = RecordRegistry::default();
        let doc = registry.get_record("doc").unwrap();
        for path in &paths {
            let _ = doc.set(&[Arg::from(path.as_str()), Arg::from(data.clone())]);
            let _ = doc.get(Some(path));
            let _ = doc.erase(path);
        }
        prop_assert!(doc.get(None).is_object());
    }
}
