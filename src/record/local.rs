//! In-process record backend.

use crate::config::RecordConfig;
use crate::error::OperationalError;
use crate::events::{CapabilityEvent, CapabilityListener, ListenerId, Listeners, RecordEventKind};
use crate::types::{AckCallback, MergeStrategy, SetRequest, Subscription, SubscriptionCallback};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use super::capability::RecordCapability;
use super::path;

/// Mutable record state, guarded by one lock.
struct LocalState {
    value: Value,
    version: u64,
    ready: bool,
    deleted: bool,
    discarded: bool,
    /// Users that acquired the record and have not discarded it yet.
    usages: usize,
    subscriptions: Vec<Subscription>,
    /// `trigger_now` subscriptions waiting for the record to become ready.
    pending_triggers: Vec<Subscription>,
    merge_strategy: Option<MergeStrategy>,
}

/// Callbacks collected under the lock, run after it is released.
type Deliveries = Vec<(SubscriptionCallback, Value)>;

/// A record whose state lives in this process.
///
/// Writes apply immediately, bump the version and notify subscriptions
/// whose value changed. Callbacks never run while the state lock is held,
/// so they may call back into the record.
pub struct LocalRecord {
    name: String,
    state: Mutex<LocalState>,
    listeners: Listeners<CapabilityEvent>,
}

impl LocalRecord {
    pub fn new(name: impl Into<String>, config: RecordConfig) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(LocalState {
                value: config.initial_value,
                version: 0,
                ready: config.ready,
                deleted: false,
                discarded: false,
                usages: 0,
                subscriptions: Vec::new(),
                pending_triggers: Vec::new(),
                merge_strategy: None,
            }),
            listeners: Listeners::new(),
        }
    }

    /// Register one more user. Each user releases with `discard`.
    pub fn acquire(&self) {
        self.state.lock().usages += 1;
    }

    pub fn usages(&self) -> usize {
        self.state.lock().usages
    }

    pub fn is_discarded(&self) -> bool {
        self.state.lock().discarded
    }

    pub fn is_deleted(&self) -> bool {
        self.state.lock().deleted
    }

    /// Registrations currently held, across all users.
    pub fn subscription_count(&self) -> usize {
        self.state.lock().subscriptions.len()
    }

    /// Listeners attached for `kind`, facades' relays included.
    pub fn listener_count(&self, kind: RecordEventKind) -> usize {
        self.listeners.listener_count(kind)
    }

    pub fn merge_strategy(&self) -> Option<MergeStrategy> {
        self.state.lock().merge_strategy.clone()
    }

    /// Flip to ready, emit "ready" and fire waiting `trigger_now`
    /// subscriptions. No-op if already ready.
    pub fn mark_ready(&self) {
        let deliveries = {
            let mut state = self.state.lock();
            if state.ready {
                return;
            }
            state.ready = true;
            let pending = std::mem::take(&mut state.pending_triggers);
            pending
                .into_iter()
                .map(|sub| {
                    let value = read(&state.value, sub.path.as_deref());
                    (sub.callback, value)
                })
                .collect::<Deliveries>()
        };

        debug!(record = %self.name, "record ready");
        self.listeners.emit(&CapabilityEvent::Ready);
        deliver(deliveries);
    }

    /// Surface an operational failure on the "error" signal.
    pub fn report_error(&self, error: OperationalError) {
        self.listeners.emit(&CapabilityEvent::Error(error));
    }

    fn apply(&self, request: SetRequest) -> (Deliveries, Result<(), OperationalError>) {
        let mut state = self.state.lock();
        if state.deleted {
            return (
                Vec::new(),
                Err(OperationalError::RecordDeleted(self.name.clone())),
            );
        }

        let before = state.value.clone();
        match (request.path.as_deref(), request.data) {
            (Some(target), data) => {
                if let Err(error) = path::set(&mut state.value, target, data) {
                    state.value = before;
                    return (Vec::new(), Err(error));
                }
            }
            (None, Some(data)) => state.value = data,
            (None, None) => {
                return (
                    Vec::new(),
                    Err(OperationalError::WriteRejected(
                        "whole-record write without data".to_string(),
                    )),
                )
            }
        }

        if state.value == before {
            return (Vec::new(), Ok(()));
        }
        state.version += 1;

        let deliveries = state
            .subscriptions
            .iter()
            .filter_map(|sub| {
                let old = read(&before, sub.path.as_deref());
                let new = read(&state.value, sub.path.as_deref());
                (old != new).then(|| (sub.callback.clone(), new))
            })
            .collect();
        (deliveries, Ok(()))
    }

    fn complete(&self, outcome: Result<(), OperationalError>, callback: Option<AckCallback>, ack: bool) {
        match (outcome, callback) {
            (Ok(()), Some(callback)) => callback.call(None),
            (Ok(()), None) => {}
            (Err(error), Some(callback)) if ack => callback.call(Some(&error)),
            (Err(error), callback) => {
                if let Some(callback) = callback {
                    callback.call(Some(&error));
                }
                self.report_error(error);
            }
        }
    }

    fn write(&self, mut request: SetRequest, ack: bool) {
        let callback = request.callback.take();
        let (deliveries, outcome) = self.apply(request);
        deliver(deliveries);
        self.complete(outcome, callback, ack);
    }
}

fn read(value: &Value, at: Option<&str>) -> Value {
    match at {
        Some(at) => path::get(value, at).cloned().unwrap_or(Value::Null),
        None => value.clone(),
    }
}

fn deliver(deliveries: Deliveries) {
    for (callback, value) in deliveries {
        callback.call(&value);
    }
}

impl RecordCapability for LocalRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> u64 {
        self.state.lock().version
    }

    fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    fn get(&self, path: Option<&str>) -> Value {
        read(&self.state.lock().value, path)
    }

    /// Failures go to the "error" signal, and to the callback if present.
    fn set(&self, request: SetRequest) {
        self.write(request, false);
    }

    /// Failures go to the callback when there is one, otherwise to the
    /// "error" signal.
    fn set_with_ack(&self, request: SetRequest) {
        self.write(request, true);
    }

    fn subscribe(&self, subscription: Subscription) {
        let immediate = {
            let mut state = self.state.lock();
            if state.deleted {
                drop(state);
                self.report_error(OperationalError::SubscriptionFailed(format!(
                    "{} was deleted",
                    self.name
                )));
                return;
            }
            state.subscriptions.push(subscription.clone());
            match (subscription.trigger_now, state.ready) {
                (true, true) => Some(read(&state.value, subscription.path.as_deref())),
                (true, false) => {
                    state.pending_triggers.push(subscription.clone());
                    None
                }
                (false, _) => None,
            }
        };

        if let Some(value) = immediate {
            subscription.callback.call(&value);
        }
    }

    fn unsubscribe(&self, subscription: Subscription) {
        let mut state = self.state.lock();
        if let Some(index) = state.subscriptions.iter().position(|s| *s == subscription) {
            state.subscriptions.remove(index);
        }
        if let Some(index) = state.pending_triggers.iter().position(|s| *s == subscription) {
            state.pending_triggers.remove(index);
        }
    }

    fn discard(&self) {
        {
            let mut state = self.state.lock();
            state.usages = state.usages.saturating_sub(1);
            if state.usages > 0 || state.discarded {
                return;
            }
            state.discarded = true;
            state.subscriptions.clear();
            state.pending_triggers.clear();
        }

        debug!(record = %self.name, "record discarded by its last user");
        self.listeners.emit(&CapabilityEvent::Discarded);
    }

    fn delete(&self, callback: Option<AckCallback>) {
        let outcome = {
            let mut state = self.state.lock();
            if state.deleted {
                Err(OperationalError::RecordDeleted(self.name.clone()))
            } else {
                state.deleted = true;
                state.value = Value::Object(serde_json::Map::new());
                state.subscriptions.clear();
                state.pending_triggers.clear();
                Ok(())
            }
        };

        if outcome.is_ok() {
            debug!(record = %self.name, "record deleted");
            self.listeners.emit(&CapabilityEvent::Deleted);
        }
        self.complete(outcome, callback, true);
    }

    fn set_merge_strategy(&self, strategy: MergeStrategy) {
        self.state.lock().merge_strategy = Some(strategy);
    }

    fn on(&self, kind: RecordEventKind, listener: CapabilityListener) -> ListenerId {
        self.listeners.on(kind, listener)
    }

    fn off(&self, id: ListenerId) -> bool {
        self.listeners.off(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn recording() -> (Arc<Mutex<Vec<Value>>>, SubscriptionCallback) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let clone = Arc::clone(&seen);
        (
            seen,
            SubscriptionCallback::new(move |value| clone.lock().push(value.clone())),
        )
    }

    fn subscription(path: Option<&str>, callback: &SubscriptionCallback, trigger_now: bool) -> Subscription {
        Subscription {
            path: path.map(str::to_string),
            callback: callback.clone(),
            trigger_now,
        }
    }

    fn write(path: Option<&str>, data: Value) -> SetRequest {
        SetRequest {
            path: path.map(str::to_string),
            data: Some(data),
            callback: None,
        }
    }

    #[test]
    fn test_write_bumps_version_and_notifies_changed_paths() {
        let record = LocalRecord::new("user/1", RecordConfig::default());
        let (names, on_name) = recording();
        let (ages, on_age) = recording();
        record.subscribe(subscription(Some("name"), &on_name, false));
        record.subscribe(subscription(Some("age"), &on_age, false));

        record.set(write(Some("name"), json!("ada")));

        assert_eq!(record.version(), 1);
        assert_eq!(*names.lock(), vec![json!("ada")]);
        assert!(ages.lock().is_empty());
        assert_eq!(record.get(None), json!({"name": "ada"}));
    }

    #[test]
    fn test_identical_write_is_noop() {
        let record = LocalRecord::new("r", RecordConfig::default());
        record.set(write(None, json!({"a": 1})));
        record.set(write(None, json!({"a": 1})));
        assert_eq!(record.version(), 1);
    }

    #[test]
    fn test_trigger_now_waits_for_ready() {
        let record = LocalRecord::new(
            "r",
            RecordConfig {
                initial_value: json!({"a": 1}),
                ready: false,
            },
        );
        let (seen, callback) = recording();
        record.subscribe(subscription(Some("a"), &callback, true));
        assert!(seen.lock().is_empty());

        record.mark_ready();
        assert_eq!(*seen.lock(), vec![json!(1)]);
    }

    #[test]
    fn test_unsubscribe_removes_one_registration() {
        let record = LocalRecord::new("r", RecordConfig::default());
        let (_, callback) = recording();
        record.subscribe(subscription(Some("a"), &callback, false));
        record.subscribe(subscription(Some("a"), &callback, false));

        record.unsubscribe(subscription(Some("a"), &callback, false));
        assert_eq!(record.subscription_count(), 1);
    }

    #[test]
    fn test_discard_waits_for_last_user() {
        let record = LocalRecord::new("r", RecordConfig::default());
        record.acquire();
        record.acquire();

        record.discard();
        assert!(!record.is_discarded());
        record.discard();
        assert!(record.is_discarded());
    }

    #[test]
    fn test_write_after_delete_reports_error() {
        let record = LocalRecord::new("r", RecordConfig::default());
        let errors = Arc::new(Mutex::new(Vec::new()));
        let clone = Arc::clone(&errors);
        record.on(
            RecordEventKind::Error,
            Arc::new(move |event: &CapabilityEvent| clone.lock().push(event.clone())),
        );

        record.delete(None);
        record.set(write(Some("a"), json!(1)));

        assert_eq!(
            *errors.lock(),
            vec![CapabilityEvent::Error(OperationalError::RecordDeleted("r".into()))]
        );
    }

    #[test]
    fn test_ack_receives_error_instead_of_signal() {
        let record = LocalRecord::new("r", RecordConfig::default());
        let signals = Arc::new(Mutex::new(0));
        let clone = Arc::clone(&signals);
        record.on(
            RecordEventKind::Error,
            Arc::new(move |_: &CapabilityEvent| *clone.lock() += 1),
        );
        record.delete(None);

        let acks = Arc::new(Mutex::new(Vec::new()));
        let ack_clone = Arc::clone(&acks);
        let mut request = write(Some("a"), json!(1));
        request.callback = Some(AckCallback::new(move |err| {
            ack_clone.lock().push(err.cloned())
        }));
        record.set_with_ack(request);

        assert_eq!(
            *acks.lock(),
            vec![Some(OperationalError::RecordDeleted("r".into()))]
        );
        assert_eq!(*signals.lock(), 0);
    }

    #[test]
    fn test_last_discard_clears_registrations() {
        let record = LocalRecord::new("r", RecordConfig::default());
        record.acquire();
        record.acquire();
        let (seen, callback) = recording();
        record.subscribe(subscription(Some("a"), &callback, false));

        record.discard();
        assert_eq!(record.subscription_count(), 1);
        record.discard();
        assert_eq!(record.subscription_count(), 0);

        record.set(write(Some("a"), json!(1)));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_rejected_path_write_leaves_value_untouched() {
        let record = LocalRecord::new(
            "r",
            RecordConfig {
                initial_value: json!({"list": [1]}),
                ready: true,
            },
        );
        let errors = Arc::new(Mutex::new(Vec::new()));
        let clone = Arc::clone(&errors);
        record.on(
            RecordEventKind::Error,
            Arc::new(move |event: &CapabilityEvent| clone.lock().push(event.clone())),
        );

        record.set(write(Some("list[18446744073709551615]"), json!(1)));
        record.set(write(Some("fresh.list[100000000000]"), json!(1)));
        record.set(write(Some("."), json!(5)));

        assert_eq!(record.get(None), json!({"list": [1]}));
        assert_eq!(record.version(), 0);
        assert_eq!(errors.lock().len(), 3);
        assert!(errors
            .lock()
            .iter()
            .all(|event| matches!(event, CapabilityEvent::Error(OperationalError::WriteRejected(_)))));
    }
}
