//! Shared error taxonomy for the receipt indexing and query engine.
//!
//! Kept as its own crate, in the shape of the workspace it was lifted from,
//! so the error type has no dependency on the engine's own modules.

pub mod error;

pub use error::{from_store_error, EngineError, ErrorDetail, Result};
