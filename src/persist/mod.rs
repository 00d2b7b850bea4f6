//! Persistence of engine states.
//!
//! The engine itself never touches the filesystem. A [`DocumentStore`] takes
//! the plain [`EngineState`](crate::engine::EngineState) an engine exports and
//! keeps it as one JSON document per name.

mod document;

pub use document::{DocumentStore, PersistError, PersistResult};
