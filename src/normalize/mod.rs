//! Argument normalization for the overloaded record call styles.
//!
//! Applications call `set` and `subscribe` with loosely-typed positional
//! arguments. The functions here classify such a list into one canonical
//! request:
//! - [`normalize_set`] dispatches on argument count to one rule per arity
//!   and validates the result
//! - [`normalize_subscribe`] assigns slots by argument type, regardless of
//!   position
//!
//! # Example
//!
//! ```ignore
//! let request = normalize_set(&args!["pets.0", json!({"name": "rex"})], 0)?;
//! assert_eq!(request.path.as_deref(), Some("pets.0"));
//! ```

mod set;
mod subscribe;

pub use set::normalize_set;
pub use subscribe::normalize_subscribe;
