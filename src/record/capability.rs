//! The underlying record a facade wraps.

use crate::events::{CapabilityListener, ListenerId, RecordEventKind};
use crate::types::{AckCallback, MergeStrategy, SetRequest, Subscription};
use serde_json::Value;

/// A synchronized record owned elsewhere: it holds the true state and does
/// the network work. Facades only forward canonical requests to it.
///
/// Implementations report operational failures through the
/// [`RecordEventKind::Error`] signal (or an acknowledgement callback), never
/// through return values.
pub trait RecordCapability: Send + Sync {
    fn name(&self) -> &str;

    /// Advanced by the record on every applied change.
    fn version(&self) -> u64;

    fn is_ready(&self) -> bool;

    /// Current value at `path`, or the whole value. Missing paths read as
    /// `Value::Null`.
    fn get(&self, path: Option<&str>) -> Value;

    fn set(&self, request: SetRequest);

    /// Like [`RecordCapability::set`], but the request's callback is invoked
    /// exactly once when the write is applied or rejected.
    fn set_with_ack(&self, request: SetRequest);

    fn subscribe(&self, subscription: Subscription);

    /// Drop one registration matching `(path, callback)`.
    fn unsubscribe(&self, subscription: Subscription);

    /// Release one user's interest in the record.
    fn discard(&self);

    fn delete(&self, callback: Option<AckCallback>);

    fn set_merge_strategy(&self, strategy: MergeStrategy);

    fn on(&self, kind: RecordEventKind, listener: CapabilityListener) -> ListenerId;

    fn off(&self, id: ListenerId) -> bool;
}
