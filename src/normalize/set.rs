//! Set-style argument normalization.

use crate::error::{ArgumentField, FacadeError, Result};
use crate::record::path;
use crate::types::{AckCallback, Arg, SetRequest};
use serde_json::Value;
use tracing::{trace, warn};

/// Classification of one request slot before validation.
#[derive(Clone, Debug, PartialEq)]
enum Slot<T> {
    Absent,
    Present(T),
    /// Supplied, but failed its type check.
    Invalid,
}

#[derive(Debug)]
struct SetSlots {
    path: Slot<String>,
    data: Slot<Value>,
    callback: Slot<AckCallback>,
}

impl Default for SetSlots {
    fn default() -> Self {
        Self {
            path: Slot::Absent,
            data: Slot::Absent,
            callback: Slot::Absent,
        }
    }
}

/// Normalize `args[start..]` into a [`SetRequest`].
///
/// Accepts one to three arguments:
/// - `[data]`
/// - `[path, data]` or `[data, callback]`
/// - `[path, data, callback]`
pub fn normalize_set(args: &[Arg], start: usize) -> Result<SetRequest> {
    let rest = args.get(start..).unwrap_or_default();

    let slots = match rest {
        [data] => one_argument(data),
        [first, second] => two_arguments(first, second),
        [path, data, callback] => three_arguments(path, data, callback),
        _ => {
            warn!(count = rest.len(), "set called with unsupported argument count");
            return Err(FacadeError::invalid(
                ArgumentField::Arity,
                format!("expected 1 to 3 arguments, got {}", rest.len()),
            ));
        }
    };

    let request = validate(slots)?;
    trace!(path = ?request.path, has_callback = request.callback.is_some(), "normalized set");
    Ok(request)
}

/// `[data]`: only a whole-record object counts.
fn one_argument(data: &Arg) -> SetSlots {
    SetSlots {
        data: root_data(data),
        ..Default::default()
    }
}

/// `[path, data]` when the first argument is a string and the second is
/// plain data, otherwise `[data, callback]`.
fn two_arguments(first: &Arg, second: &Arg) -> SetSlots {
    let mut slots = SetSlots::default();

    if is_nested_data(second) {
        if let Some(path) = first.as_str() {
            slots.path = Slot::Present(path.to_string());
        }
    }

    if matches!(slots.path, Slot::Present(_)) {
        slots.data = nested_data(second);
    } else {
        slots.data = root_data(first);
        slots.callback = ack_callback(second);
    }

    slots
}

/// `[path, data, callback]`, strictly positional.
fn three_arguments(path: &Arg, data: &Arg, callback: &Arg) -> SetSlots {
    SetSlots {
        path: match path.as_str() {
            Some(path) => Slot::Present(path.to_string()),
            None => Slot::Invalid,
        },
        data: nested_data(data),
        callback: ack_callback(callback),
    }
}

fn validate(slots: SetSlots) -> Result<SetRequest> {
    let path = match slots.path {
        Slot::Present(path) if path.is_empty() => {
            return Err(reject(ArgumentField::Path, "path must not be empty"))
        }
        Slot::Present(target) if !path::has_segments(&target) => {
            return Err(reject(ArgumentField::Path, "path must name at least one segment"))
        }
        Slot::Present(path) => Some(path),
        Slot::Invalid => return Err(reject(ArgumentField::Path, "path must be a string")),
        Slot::Absent => None,
    };

    let data = match slots.data {
        Slot::Present(data) => Some(data),
        Slot::Invalid => {
            return Err(reject(ArgumentField::Data, "data must not be a function"))
        }
        Slot::Absent if path.is_none() => {
            return Err(reject(
                ArgumentField::Data,
                "whole-record writes require an object or array",
            ))
        }
        Slot::Absent => None,
    };

    let callback = match slots.callback {
        Slot::Present(callback) => Some(callback),
        Slot::Invalid => {
            return Err(reject(
                ArgumentField::Callback,
                "callback must be an acknowledgement function",
            ))
        }
        Slot::Absent => None,
    };

    Ok(SetRequest {
        path,
        data,
        callback,
    })
}

fn reject(field: ArgumentField, reason: &str) -> FacadeError {
    warn!(%field, reason, "rejected set arguments");
    FacadeError::invalid(field, reason)
}

fn is_nested_data(arg: &Arg) -> bool {
    matches!(arg, Arg::Undefined | Arg::Value(_))
}

fn root_data(arg: &Arg) -> Slot<Value> {
    match arg {
        Arg::Value(value) if arg.is_object_like() => Slot::Present(value.clone()),
        _ => Slot::Absent,
    }
}

fn nested_data(arg: &Arg) -> Slot<Value> {
    match arg {
        Arg::Undefined => Slot::Absent,
        Arg::Value(value) => Slot::Present(value.clone()),
        _ => Slot::Invalid,
    }
}

fn ack_callback(arg: &Arg) -> Slot<AckCallback> {
    match arg {
        Arg::Ack(callback) => Slot::Present(callback.clone()),
        _ => Slot::Invalid,
    }
}
