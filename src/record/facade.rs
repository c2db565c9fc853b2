//! Per-consumer facade over a shared record.

use crate::error::{ArgumentField, FacadeError, Result};
use crate::events::{
    CapabilityEvent, EventStream, ListenerId, Listeners, RecordEvent, RecordEventKind,
    StreamConfig,
};
use crate::normalize::{normalize_set, normalize_subscribe};
use crate::types::{AckCallback, Arg, MergeStrategy, SetRequest, Subscription};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

use super::capability::RecordCapability;

struct FacadeInner {
    capability: Arc<dyn RecordCapability>,
    /// Subscriptions this facade registered, in registration order.
    subscriptions: Mutex<Vec<Subscription>>,
    discarded: AtomicBool,
    listeners: Listeners<RecordEvent>,
    /// Relays registered on the capability, removed on drop.
    relays: Mutex<Vec<ListenerId>>,
}

impl Drop for FacadeInner {
    fn drop(&mut self) {
        for id in self.relays.get_mut().drain(..) {
            self.capability.off(id);
        }
    }
}

/// One consumer's view of a record.
///
/// Any number of facades may wrap the same capability. Each tracks only the
/// subscriptions it registered itself, so discarding one facade never
/// touches another's. Clones share the same facade.
///
/// Malformed calls fail synchronously with [`FacadeError`]; operational
/// failures arrive later on the "error" signal.
#[derive(Clone)]
pub struct RecordFacade {
    inner: Arc<FacadeInner>,
}

impl RecordFacade {
    /// Wrap `capability` and start relaying its four lifecycle signals.
    pub fn new(capability: Arc<dyn RecordCapability>) -> Self {
        let inner = Arc::new(FacadeInner {
            capability,
            subscriptions: Mutex::new(Vec::new()),
            discarded: AtomicBool::new(false),
            listeners: Listeners::new(),
            relays: Mutex::new(Vec::new()),
        });

        let relays: Vec<ListenerId> = RecordEventKind::ALL
            .into_iter()
            .map(|kind| {
                let weak: Weak<FacadeInner> = Arc::downgrade(&inner);
                inner.capability.on(
                    kind,
                    Arc::new(move |event: &CapabilityEvent| {
                        if let Some(inner) = weak.upgrade() {
                            RecordFacade { inner }.relay(event);
                        }
                    }),
                )
            })
            .collect();
        *inner.relays.lock() = relays;

        RecordFacade { inner }
    }

    fn relay(&self, event: &CapabilityEvent) {
        let event = match event {
            CapabilityEvent::Ready => RecordEvent::Ready(self.clone()),
            CapabilityEvent::Discarded => RecordEvent::Discarded,
            CapabilityEvent::Deleted => RecordEvent::Deleted,
            CapabilityEvent::Error(error) => RecordEvent::Error(error.clone()),
        };
        self.inner.listeners.emit(&event);
    }

    pub fn name(&self) -> &str {
        self.inner.capability.name()
    }

    pub fn version(&self) -> u64 {
        self.inner.capability.version()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.capability.is_ready()
    }

    pub fn is_discarded(&self) -> bool {
        self.inner.discarded.load(Ordering::SeqCst)
    }

    /// The wrapped capability.
    pub fn capability(&self) -> &Arc<dyn RecordCapability> {
        &self.inner.capability
    }

    /// True if both handles are the same facade.
    pub fn ptr_eq(&self, other: &RecordFacade) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // --- Reads and writes ---

    /// Value at `path`, or the whole record.
    pub fn get(&self, path: Option<&str>) -> Value {
        self.inner.capability.get(path)
    }

    /// Write using any of the overloaded call styles:
    /// `[data]`, `[path, data]`, `[data, ack]`, `[path, data, ack]`.
    pub fn set(&self, args: &[Arg]) -> Result<()> {
        let request = normalize_set(args, 0)?;
        self.inner.capability.set(request);
        Ok(())
    }

    /// Like [`RecordFacade::set`]; the acknowledgement, if any, fires once
    /// the write is applied or rejected.
    pub fn set_with_ack(&self, args: &[Arg]) -> Result<()> {
        let request = normalize_set(args, 0)?;
        self.inner.capability.set_with_ack(request);
        Ok(())
    }

    /// Remove the value at `path`.
    pub fn erase(&self, path: &str) -> Result<()> {
        let request = erase_request(path, None)?;
        self.inner.capability.set(request);
        Ok(())
    }

    pub fn erase_with_ack(&self, path: &str, callback: AckCallback) -> Result<()> {
        let request = erase_request(path, Some(callback))?;
        self.inner.capability.set_with_ack(request);
        Ok(())
    }

    // --- Subscriptions ---

    /// Subscribe with any combination of a path string, a
    /// [`crate::SubscriptionCallback`] and a `trigger_now` boolean, or a
    /// single [`crate::SubscribeRequest`]. A callback is always required.
    pub fn subscribe(&self, args: &[Arg]) -> Result<()> {
        self.ensure_active()?;
        let subscription = normalize_subscribe(args).into_subscription()?;

        self.inner.subscriptions.lock().push(subscription.clone());
        debug!(record = %self.name(), path = ?subscription.path, "subscribed");
        self.inner.capability.subscribe(subscription);
        Ok(())
    }

    /// With a callback, drop one tracked `(path, callback)` entry and
    /// forward the unsubscribe even when nothing here matched. Without a
    /// callback, drop every tracked entry on the path. A call naming
    /// neither is rejected; use [`RecordFacade::discard`] to drop everything.
    pub fn unsubscribe(&self, args: &[Arg]) -> Result<()> {
        self.ensure_active()?;
        let request = normalize_subscribe(args);
        if request.path.is_none() && request.callback.is_none() {
            return Err(FacadeError::invalid(
                ArgumentField::Arity,
                "unsubscribe needs a path or a callback",
            ));
        }

        let removed = {
            let mut tracked = self.inner.subscriptions.lock();
            match &request.callback {
                Some(callback) => {
                    if let Some(index) = tracked
                        .iter()
                        .position(|sub| sub.matches(request.path.as_deref(), callback))
                    {
                        tracked.remove(index);
                    }
                    vec![Subscription {
                        path: request.path.clone(),
                        callback: callback.clone(),
                        trigger_now: false,
                    }]
                }
                None => {
                    let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *tracked)
                        .into_iter()
                        .partition(|sub| sub.path == request.path);
                    *tracked = kept;
                    removed
                }
            }
        };

        debug!(record = %self.name(), path = ?request.path, count = removed.len(), "unsubscribed");
        for subscription in removed {
            self.inner.capability.unsubscribe(subscription);
        }
        Ok(())
    }

    /// Snapshot of the subscriptions this facade tracks.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.inner.subscriptions.lock().clone()
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.lock().len()
    }

    /// Unsubscribe everything this facade registered, then release the
    /// record. Further subscribe/unsubscribe calls fail; a second discard
    /// does nothing.
    pub fn discard(&self) {
        if self.inner.discarded.swap(true, Ordering::SeqCst) {
            return;
        }

        let tracked = std::mem::take(&mut *self.inner.subscriptions.lock());
        debug!(record = %self.name(), subscriptions = tracked.len(), "discarding facade");
        for subscription in tracked {
            self.inner.capability.unsubscribe(subscription);
        }
        self.inner.capability.discard()
    }

    /// Delete the record for everyone. Tracking is left alone; "deleted"
    /// follows on the event channel.
    pub fn delete(&self, callback: Option<AckCallback>) {
        debug!(record = %self.name(), "deleting record");
        self.inner.capability.delete(callback);
    }

    pub fn set_merge_strategy(&self, strategy: MergeStrategy) {
        self.inner.capability.set_merge_strategy(strategy);
    }

    // --- Lifecycle signals ---

    pub fn on(
        &self,
        kind: RecordEventKind,
        listener: impl Fn(&RecordEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner.listeners.on(kind, Arc::new(listener))
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.listeners.off(id)
    }

    /// Channel-backed alternative to [`RecordFacade::on`].
    pub fn event_stream(&self, config: StreamConfig) -> EventStream<RecordEvent> {
        self.inner.listeners.stream(config)
    }

    /// Run `callback` now if the record is ready, otherwise on the next
    /// "ready" signal.
    pub fn when_ready(&self, callback: impl Fn(&RecordFacade) + Send + Sync + 'static) {
        if self.is_ready() {
            callback(self);
            return;
        }
        self.inner.listeners.once(
            RecordEventKind::Ready,
            Arc::new(move |event: &RecordEvent| {
                if let RecordEvent::Ready(facade) = event {
                    callback(facade);
                }
            }),
        );
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_discarded() {
            return Err(FacadeError::Discarded(self.name().to_string()));
        }
        Ok(())
    }
}

fn erase_request(path: &str, callback: Option<AckCallback>) -> Result<SetRequest> {
    if path.is_empty() {
        return Err(FacadeError::invalid(
            ArgumentField::Path,
            "path must not be empty",
        ));
    }
    if !super::path::has_segments(path) {
        return Err(FacadeError::invalid(
            ArgumentField::Path,
            "path must name at least one segment",
        ));
    }
    Ok(SetRequest {
        path: Some(path.to_string()),
        data: None,
        callback,
    })
}

impl fmt::Debug for RecordFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordFacade")
            .field("name", &self.name())
            .field("version", &self.version())
            .field("ready", &self.is_ready())
            .field("subscriptions", &self.subscription_count())
            .field("discarded", &self.is_discarded())
            .finish()
    }
}
