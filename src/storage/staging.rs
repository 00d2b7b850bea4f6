//! Staging area: the pending snapshot of each branch.

use std::collections::{BTreeMap, HashMap};

use crate::storage::snapshot::Snapshot;
use crate::storage::types::BranchId;

/// Working trees waiting to be committed, one per branch.
#[derive(Debug, Clone, Default)]
pub struct StagingArea {
    pending: HashMap<BranchId, Snapshot>,
}

impl StagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// replace the pending snapshot of `branch`; an empty snapshot clears it
    pub fn stage(&mut self, branch: &BranchId, snapshot: Snapshot) {
        if snapshot.is_empty() {
            self.pending.remove(branch);
        } else {
            self.pending.insert(branch.clone(), snapshot);
        }
    }

    pub fn get(&self, branch: &BranchId) -> Option<&Snapshot> {
        self.pending.get(branch)
    }

    /// true when `branch` has something to commit
    pub fn has_changes(&self, branch: &BranchId) -> bool {
        self.pending.get(branch).is_some_and(|s| !s.is_empty())
    }

    /// remove and return the pending snapshot of `branch`
    pub fn take(&mut self, branch: &BranchId) -> Option<Snapshot> {
        self.pending.remove(branch)
    }

    pub fn clear(&mut self, branch: &BranchId) {
        self.pending.remove(branch);
    }

    /// sorted copy for export
    pub(crate) fn to_map(&self) -> BTreeMap<BranchId, Snapshot> {
        self.pending
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
