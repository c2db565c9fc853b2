//! Records and the per-consumer facade over them.
//!
//! - [`RecordCapability`]: the synchronized record a facade forwards to
//! - [`RecordFacade`]: one consumer's handle, tracking its own subscriptions
//! - [`LocalRecord`]: an in-process capability
//!
//! # Example
//!
//! ```ignore
//! let record = Arc::new(LocalRecord::new("user/42", RecordConfig::default()));
//! record.acquire();
//! let user = RecordFacade::new(record);
//!
//! let on_name = SubscriptionCallback::new(|name| println!("name is now {name}"));
//! user.subscribe(&args!["name", on_name.clone(), true])?;
//! user.set(&args!["name", "Ada"])?;
//! user.discard();
//! ```

mod capability;
mod facade;
mod local;
pub mod path;

pub use capability::RecordCapability;
pub use facade::RecordFacade;
pub use local::LocalRecord;
