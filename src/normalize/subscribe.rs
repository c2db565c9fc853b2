//! Subscribe-style argument normalization.

use crate::types::{Arg, SubscribeRequest};
use tracing::trace;

/// Normalize subscribe/unsubscribe arguments.
///
/// A lone [`Arg::Subscription`] is returned as is. Otherwise slots are
/// filled by type, first match wins: the first string is the path, the
/// first [`Arg::Listener`] the callback, the first boolean `trigger_now`.
/// Everything else is ignored.
///
/// The callback is not required here; callers validate with
/// [`SubscribeRequest::into_subscription`].
pub fn normalize_subscribe(args: &[Arg]) -> SubscribeRequest {
    if let [Arg::Subscription(request)] = args {
        return request.clone();
    }

    let mut request = SubscribeRequest::default();
    for arg in args {
        match arg {
            Arg::Value(serde_json::Value::String(path)) if request.path.is_none() => {
                request.path = Some(path.clone());
            }
            Arg::Value(serde_json::Value::Bool(flag)) if request.trigger_now.is_none() => {
                request.trigger_now = Some(*flag);
            }
            Arg::Listener(callback) if request.callback.is_none() => {
                request.callback = Some(callback.clone());
            }
            _ => {}
        }
    }

    trace!(
        path = ?request.path,
        has_callback = request.callback.is_some(),
        trigger_now = ?request.trigger_now,
        "normalized subscribe"
    );
    request
}
