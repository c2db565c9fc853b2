//! Lifecycle event types.

use crate::error::OperationalError;
use crate::record::RecordFacade;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The four lifecycle signals a record emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordEventKind {
    Ready,
    Discarded,
    Deleted,
    Error,
}

impl RecordEventKind {
    pub const ALL: [RecordEventKind; 4] = [
        RecordEventKind::Ready,
        RecordEventKind::Discarded,
        RecordEventKind::Deleted,
        RecordEventKind::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordEventKind::Ready => "ready",
            RecordEventKind::Discarded => "discarded",
            RecordEventKind::Deleted => "deleted",
            RecordEventKind::Error => "error",
        }
    }
}

impl fmt::Display for RecordEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordEventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown record event: {s}"))
    }
}

/// Anything that can be fanned out through [`super::Listeners`].
pub trait Event: Clone + Send + 'static {
    fn kind(&self) -> RecordEventKind;
}

/// Signal emitted by an underlying record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "error", rename_all = "snake_case")]
pub enum CapabilityEvent {
    Ready,
    Discarded,
    Deleted,
    Error(OperationalError),
}

impl Event for CapabilityEvent {
    fn kind(&self) -> RecordEventKind {
        match self {
            CapabilityEvent::Ready => RecordEventKind::Ready,
            CapabilityEvent::Discarded => RecordEventKind::Discarded,
            CapabilityEvent::Deleted => RecordEventKind::Deleted,
            CapabilityEvent::Error(_) => RecordEventKind::Error,
        }
    }
}

/// Signal emitted by a [`RecordFacade`]. `Ready` carries the facade itself,
/// the others pass the record's payload through untouched.
#[derive(Clone, Debug)]
pub enum RecordEvent {
    Ready(RecordFacade),
    Discarded,
    Deleted,
    Error(OperationalError),
}

impl Event for RecordEvent {
    fn kind(&self) -> RecordEventKind {
        match self {
            RecordEvent::Ready(_) => RecordEventKind::Ready,
            RecordEvent::Discarded => RecordEventKind::Discarded,
            RecordEvent::Deleted => RecordEventKind::Deleted,
            RecordEvent::Error(_) => RecordEventKind::Error,
        }
    }
}

/// Callback registered on an underlying record.
pub type CapabilityListener = Arc<dyn Fn(&CapabilityEvent) + Send + Sync>;

/// Unique identifier for a registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Configuration for a channel-backed event stream.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Max buffered events before the stream is dropped.
    /// Default: 1000
    pub buffer_size: usize,

    /// Kinds to deliver (None = all kinds).
    pub kinds: Option<Vec<RecordEventKind>>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            kinds: None,
        }
    }
}

impl StreamConfig {
    /// Only deliver the given kinds.
    pub fn kinds(kinds: Vec<RecordEventKind>) -> Self {
        Self {
            kinds: Some(kinds),
            ..Default::default()
        }
    }
}

/// Receiving end of an event stream. The channel disconnects once the
/// stream is removed, either explicitly or after its buffer overflowed.
/// Dropping the stream removes it from the registry that feeds it.
pub struct EventStream<E> {
    pub id: ListenerId,
    pub receiver: crossbeam_channel::Receiver<E>,
    pub(super) detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl<E> Drop for EventStream<E> {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl<E> EventStream<E> {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<E, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<E, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<E, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
