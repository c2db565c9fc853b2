//! Lifecycle notifications: "ready", "discarded", "deleted" and "error".
//!
//! Records and facades each own a [`Listeners`] registry. Consumers attach
//! either callbacks or bounded channel streams:
//!
//! ```ignore
//! let stream = facade.event_stream(StreamConfig::default());
//! match stream.recv()? {
//!     RecordEvent::Ready(record) => println!("{} is ready", record.name()),
//!     RecordEvent::Error(err) => eprintln!("{err}"),
//!     _ => {}
//! }
//! ```

mod listeners;
mod types;

pub use listeners::Listeners;
pub use types::{
    CapabilityEvent, CapabilityListener, Event, EventStream, ListenerId, RecordEvent,
    RecordEventKind, StreamConfig,
};
