//! Listener registry that fans events out to callbacks and channels.

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{trace, warn};

use super::types::{Event, EventStream, ListenerId, RecordEventKind, StreamConfig};

enum Sink<E> {
    Callback(Arc<dyn Fn(&E) + Send + Sync>),
    Channel(Sender<E>),
}

struct Entry<E> {
    id: ListenerId,
    /// None = every kind.
    kinds: Option<Vec<RecordEventKind>>,
    once: bool,
    sink: Sink<E>,
}

impl<E> Entry<E> {
    fn wants(&self, kind: RecordEventKind) -> bool {
        match &self.kinds {
            Some(kinds) => kinds.contains(&kind),
            None => true,
        }
    }
}

/// Registered listeners, in registration order.
///
/// Callbacks run after the internal lock is released, so a listener may
/// register or remove listeners on the same registry.
pub struct Listeners<E> {
    entries: Arc<Mutex<Vec<Entry<E>>>>,
    next_id: AtomicU64,
}

impl<E: Event> Listeners<E> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Register a callback for one kind.
    pub fn on(&self, kind: RecordEventKind, listener: Arc<dyn Fn(&E) + Send + Sync>) -> ListenerId {
        self.insert(Some(vec![kind]), false, Sink::Callback(listener))
    }

    /// Register a callback that is removed after its first delivery.
    pub fn once(
        &self,
        kind: RecordEventKind,
        listener: Arc<dyn Fn(&E) + Send + Sync>,
    ) -> ListenerId {
        self.insert(Some(vec![kind]), true, Sink::Callback(listener))
    }

    /// Open a bounded channel receiving the configured kinds. The stream
    /// unregisters itself when dropped.
    pub fn stream(&self, config: StreamConfig) -> EventStream<E> {
        let (sender, receiver) = bounded(config.buffer_size);
        let id = self.insert(config.kinds, false, Sink::Channel(sender));
        let entries: Weak<Mutex<Vec<Entry<E>>>> = Arc::downgrade(&self.entries);
        EventStream {
            id,
            receiver,
            detach: Some(Box::new(move || {
                if let Some(entries) = entries.upgrade() {
                    let removed = take_entry(&entries, id);
                    trace!(listener = id.0, removed = removed.is_some(), "event stream dropped");
                }
            })),
        }
    }

    fn insert(&self, kinds: Option<Vec<RecordEventKind>>, once: bool, sink: Sink<E>) -> ListenerId {
        let id = self.next_id();
        self.entries.lock().push(Entry {
            id,
            kinds,
            once,
            sink,
        });
        id
    }

    /// Remove a listener or stream. Returns false if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        take_entry(&self.entries, id).is_some()
    }

    /// Number of listeners that would receive `kind`.
    pub fn listener_count(&self, kind: RecordEventKind) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.wants(kind))
            .count()
    }

    /// Deliver `event` to every listener of its kind. Streams whose buffer
    /// is full or whose receiver is gone are removed.
    pub fn emit(&self, event: &E) {
        let kind = event.kind();
        let mut callbacks = Vec::new();
        let mut dropped = Vec::new();

        {
            let mut entries = self.entries.lock();
            let mut kept = Vec::with_capacity(entries.len());
            for entry in entries.drain(..) {
                if !entry.wants(kind) {
                    kept.push(entry);
                    continue;
                }
                let keep = match &entry.sink {
                    Sink::Callback(callback) => {
                        callbacks.push(Arc::clone(callback));
                        !entry.once
                    }
                    Sink::Channel(sender) => match sender.try_send(event.clone()) {
                        Ok(()) => true,
                        Err(crossbeam_channel::TrySendError::Full(_)) => {
                            warn!(listener = entry.id.0, %kind, "event stream overflowed, dropping it");
                            false
                        }
                        Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
                    },
                };
                if keep {
                    kept.push(entry);
                } else {
                    dropped.push(entry);
                }
            }
            *entries = kept;
        }
        // Removed channels may hold the last handle to their owner.
        drop(dropped);

        for callback in callbacks {
            callback(event);
        }
    }
}

/// Unregister `id`, dropping the entry after the lock is released.
fn take_entry<E>(entries: &Mutex<Vec<Entry<E>>>, id: ListenerId) -> Option<Entry<E>> {
    let mut entries = entries.lock();
    let position = entries.iter().position(|entry| entry.id == id)?;
    Some(entries.remove(position))
}

impl<E: Event> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}
