//! Core types shared by the normalizer, the facade and record backends.

use crate::error::OperationalError;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Acknowledgement for a write or delete: `None` on success.
#[derive(Clone)]
pub struct AckCallback(Arc<dyn Fn(Option<&OperationalError>) + Send + Sync>);

impl AckCallback {
    pub fn new(f: impl Fn(Option<&OperationalError>) + Send + Sync + 'static) -> Self {
        AckCallback(Arc::new(f))
    }

    pub fn call(&self, error: Option<&OperationalError>) {
        (self.0)(error)
    }

    /// Identity comparison; two callbacks are the same only if they share
    /// one allocation.
    pub fn same_as(&self, other: &AckCallback) -> bool {
        Arc::as_ptr(&self.0) as *const () == Arc::as_ptr(&other.0) as *const ()
    }
}

impl PartialEq for AckCallback {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for AckCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AckCallback({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Receives the value at the subscribed path; a missing value arrives as
/// `Value::Null`.
#[derive(Clone)]
pub struct SubscriptionCallback(Arc<dyn Fn(&Value) + Send + Sync>);

impl SubscriptionCallback {
    pub fn new(f: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        SubscriptionCallback(Arc::new(f))
    }

    pub fn call(&self, value: &Value) {
        (self.0)(value)
    }

    pub fn same_as(&self, other: &SubscriptionCallback) -> bool {
        Arc::as_ptr(&self.0) as *const () == Arc::as_ptr(&other.0) as *const ()
    }
}

impl PartialEq for SubscriptionCallback {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for SubscriptionCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SubscriptionCallback({:p})",
            Arc::as_ptr(&self.0) as *const ()
        )
    }
}

/// A loosely-typed positional argument, as accepted by the overloaded
/// `set`/`subscribe` call styles.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    /// An explicitly missing argument.
    Undefined,
    /// Any JSON datum, strings and booleans included.
    Value(Value),
    /// A write/delete acknowledgement.
    Ack(AckCallback),
    /// A subscription callback.
    Listener(SubscriptionCallback),
    /// An already-normalized subscribe request.
    Subscription(SubscribeRequest),
}

impl Arg {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Arg::Value(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Arg::Ack(_) | Arg::Listener(_))
    }

    /// Objects and arrays; `null` does not count.
    pub fn is_object_like(&self) -> bool {
        matches!(self, Arg::Value(Value::Object(_) | Value::Array(_)))
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Value(Value::String(s.to_string()))
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Value(Value::String(s))
    }
}

impl From<bool> for Arg {
    fn from(b: bool) -> Self {
        Arg::Value(Value::Bool(b))
    }
}

impl From<AckCallback> for Arg {
    fn from(callback: AckCallback) -> Self {
        Arg::Ack(callback)
    }
}

impl From<SubscriptionCallback> for Arg {
    fn from(callback: SubscriptionCallback) -> Self {
        Arg::Listener(callback)
    }
}

impl From<SubscribeRequest> for Arg {
    fn from(request: SubscribeRequest) -> Self {
        Arg::Subscription(request)
    }
}

/// Build a `Vec<Arg>` from heterogeneous values.
///
/// ```ignore
/// let args = args!["pets.0", json!({"name": "rex"}), ack];
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Arg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Arg::from($arg)),+]
    };
}

/// Canonical write request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetRequest {
    /// Path into the record value; `None` targets the whole record.
    pub path: Option<String>,
    /// Value to write; `None` with a path erases that path.
    pub data: Option<Value>,
    pub callback: Option<AckCallback>,
}

/// Canonical subscribe request as produced by the normalizer. Nothing here
/// is validated; see [`SubscribeRequest::into_subscription`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubscribeRequest {
    pub path: Option<String>,
    pub callback: Option<SubscriptionCallback>,
    pub trigger_now: Option<bool>,
}

impl SubscribeRequest {
    /// Validate that a callback is present.
    pub fn into_subscription(self) -> crate::Result<Subscription> {
        let callback = self
            .callback
            .ok_or(crate::FacadeError::MissingCallback)?;
        Ok(Subscription {
            path: self.path,
            callback,
            trigger_now: self.trigger_now.unwrap_or(false),
        })
    }
}

/// A validated subscription. Identity is the `(path, callback)` pair.
#[derive(Clone, Debug)]
pub struct Subscription {
    pub path: Option<String>,
    pub callback: SubscriptionCallback,
    pub trigger_now: bool,
}

impl Subscription {
    pub fn matches(&self, path: Option<&str>, callback: &SubscriptionCallback) -> bool {
        self.path.as_deref() == path && self.callback.same_as(callback)
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other.path.as_deref(), &other.callback)
    }
}

/// Both sides of a concurrent write.
#[derive(Clone, Copy, Debug)]
pub struct MergeConflict<'a> {
    pub local: &'a Value,
    pub local_version: u64,
    pub remote: &'a Value,
    pub remote_version: u64,
}

/// Conflict resolution policy. Opaque to the facade.
#[derive(Clone)]
pub struct MergeStrategy {
    name: String,
    resolve: Arc<dyn Fn(&MergeConflict<'_>) -> Value + Send + Sync>,
}

impl MergeStrategy {
    pub fn new(
        name: impl Into<String>,
        resolve: impl Fn(&MergeConflict<'_>) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            resolve: Arc::new(resolve),
        }
    }

    /// Keep whatever the server holds.
    pub fn remote_wins() -> Self {
        Self::new("remote_wins", |conflict| conflict.remote.clone())
    }

    /// Keep the local value.
    pub fn local_wins() -> Self {
        Self::new("local_wins", |conflict| conflict.local.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolve(&self, conflict: &MergeConflict<'_>) -> Value {
        (self.resolve)(conflict)
    }
}

impl fmt::Debug for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MergeStrategy({})", self.name)
    }
}
