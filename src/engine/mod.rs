//! The versioning engine.
//!
//! [`VersionEngine`] is the only owner of the commit graph, branch table,
//! staging area and head pointer. Operations are split by concern:
//!
//! - `versioning`: staging, commits, reset/revert/checkout/delete and the
//!   branch lifecycle
//! - `history`: branch-isolated listings and the ownership check used by
//!   reset and revert
//! - `state`: export/import of the whole engine as plain data
//! - `clock`: strictly increasing commit timestamps

mod clock;
mod history;
mod state;
mod versioning;

pub use clock::Clock;
pub use state::EngineState;
pub use versioning::VersionEngine;
