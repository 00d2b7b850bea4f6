//! blockvcs - branch/commit versioning for item trees
//!
//! This crate versions a tree of items (todos, text, headings) the way git
//! versions files: stage a snapshot, commit it, branch, check out, reset,
//! revert. Everything lives in memory inside one [`engine::VersionEngine`];
//! the [`persist`] layer saves its exported state as a JSON document and the
//! [`api`] layer puts a request/response boundary in front of it.
//!
//! # Example
//!
//! ```
//! use blockvcs::engine::VersionEngine;
//! use blockvcs::storage::{BranchName, Item, Snapshot};
//!
//! let mut engine = VersionEngine::new();
//! engine.add(Snapshot::new(vec![Item::todo("Buy milk")]));
//! let first = engine.commit("first").unwrap();
//!
//! let feature = engine
//!     .create_and_checkout_branch(BranchName::new("feature").unwrap(), None)
//!     .unwrap();
//! assert_eq!(engine.current_branch_id(), &feature.id);
//! assert_eq!(engine.list_commits()[0].id, first.id);
//! ```

pub mod api;
pub mod engine;
pub mod persist;
pub mod storage;
