//! storage layer for blockvcs
//!
//! This module holds the data the versioning engine owns. Nothing outside
//! the engine mutates these stores; they are exposed read-only through
//! [`crate::engine::VersionEngine`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      VersionEngine                          │
//! │   (commit, checkout, reset, revert, branch lifecycle)       │
//! └─────────────────────────────────────────────────────────────┘
//!          │               │               │              │
//!          ▼               ▼               ▼              ▼
//!   ┌────────────┐  ┌────────────┐  ┌────────────┐  ┌──────────┐
//!   │   refs     │  │  staging   │  │    head    │  │  commit  │
//!   │ (branches) │  │ (pending)  │  │ (checkout) │  │ (graph)  │
//!   └────────────┘  └────────────┘  └────────────┘  └──────────┘
//!          │               │               │              │
//!          └───────────────┴───────┬───────┴──────────────┘
//!                                  ▼
//!                           ┌────────────┐
//!                           │  snapshot  │
//!                           │  (items)   │
//!                           └────────────┘
//! ```

mod commit;
mod error;
mod head;
mod refs;
mod snapshot;
mod staging;
mod types;

pub use commit::{Ancestors, Commit, CommitGraph, CommitMessage};
pub use error::{StorageError, StorageResult};
pub use head::HeadPointer;
pub use refs::{Branch, BranchTable};
pub use snapshot::{Item, ItemKind, Snapshot, SnapshotIter};
pub use staging::StagingArea;
pub use types::{BranchId, BranchName, CommitId, InvalidNameError};
