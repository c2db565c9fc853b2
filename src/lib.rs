//! # Record Facade
//!
//! A client-side facade over named, versioned, subscribable records.
//!
//! ## Core Concepts
//!
//! - **Normalization**: overloaded `set`/`subscribe` call styles are
//!   classified into one canonical request
//! - **Facades**: per-consumer handles that track their own subscriptions,
//!   so one consumer can discard its interest without disturbing others
//! - **Capabilities**: the synchronized record a facade forwards to
//! - **Events**: "ready", "discarded", "deleted" and "error" signals
//!
//! ## Example
//!
//! ```ignore
//! use record_facade::{args, RecordRegistry, SubscriptionCallback};
//! use serde_json::json;
//!
//! let registry = RecordRegistry::default();
//! let user = registry.get_record("user/42")?;
//!
//! let on_name = SubscriptionCallback::new(|name| println!("name: {name}"));
//! user.subscribe(&args!["name", on_name])?;
//!
//! user.set(&args![json!({"name": "Ada", "langs": ["en"]})])?;
//! user.set(&args!["langs[1]", "fr"])?;
//!
//! user.discard();
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod normalize;
pub mod record;
pub mod registry;
pub mod types;

// Re-exports
pub use config::RecordConfig;
pub use error::{ArgumentField, FacadeError, OperationalError, Result};
pub use events::{
    CapabilityEvent, CapabilityListener, EventStream, ListenerId, Listeners, RecordEvent,
    RecordEventKind, StreamConfig,
};
pub use normalize::{normalize_set, normalize_subscribe};
pub use record::{LocalRecord, RecordCapability, RecordFacade};
pub use registry::RecordRegistry;
pub use types::*;
