//! Error types for the record facade.
//!
//! Two disjoint classes: [`FacadeError`] is returned synchronously for
//! malformed calls, [`OperationalError`] only ever travels through the
//! "error" notification channel or an acknowledgement callback.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which part of a call signature was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentField {
    Path,
    Data,
    Callback,
    Arity,
}

impl fmt::Display for ArgumentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgumentField::Path => "path",
            ArgumentField::Data => "data",
            ArgumentField::Callback => "callback",
            ArgumentField::Arity => "arity",
        };
        f.write_str(name)
    }
}

/// Caller errors. Never retried.
#[derive(Debug, Error)]
pub enum FacadeError {
    #[error("Invalid {field} argument: {reason}")]
    InvalidArgument {
        field: ArgumentField,
        reason: String,
    },

    #[error("Subscription requires a callback")]
    MissingCallback,

    #[error("Record facade already discarded: {0}")]
    Discarded(String),

    #[error("Invalid record name: {0:?}")]
    InvalidName(String),
}

impl FacadeError {
    pub(crate) fn invalid(field: ArgumentField, reason: impl Into<String>) -> Self {
        FacadeError::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }

    /// The offending field, for argument and callback errors.
    pub fn field(&self) -> Option<ArgumentField> {
        match self {
            FacadeError::InvalidArgument { field, .. } => Some(*field),
            FacadeError::MissingCallback => Some(ArgumentField::Callback),
            FacadeError::Discarded(_) | FacadeError::InvalidName(_) => None,
        }
    }
}

/// Failures reported asynchronously by the underlying record.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum OperationalError {
    #[error("Write rejected: {0}")]
    WriteRejected(String),

    #[error("Record failed to load: {0}")]
    LoadFailed(String),

    #[error("Subscription failed: {0}")]
    SubscriptionFailed(String),

    #[error("Record deleted: {0}")]
    RecordDeleted(String),

    #[error("{0}")]
    Other(String),
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, FacadeError>;
