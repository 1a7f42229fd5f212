//! Core types for the canopy cache
//!
//! This crate defines the data model shared by every layer:
//! - [`KeyPath`]: dotted-string / segment-sequence key codec
//! - [`Value`]: tagged value tree with nested path traversal
//! - [`CacheEvent`]: the record delivered to subscriber callbacks
//! - [`Error`]: the error taxonomy
//!
//! Everything here is pure data: no locks, no timers, no I/O.

pub mod error;
pub mod event;
pub mod path;
pub mod value;

pub use error::{Error, Result};
pub use event::{CacheEvent, EventKind};
pub use path::KeyPath;
pub use value::Value;
