//! Exportable engine state.
//!
//! `EngineState` is the plain-data form of a [`VersionEngine`]: what a
//! persistence collaborator saves and later hands back. Loading never fails;
//! an inconsistent state is repaired and every repair is logged.
//!
//! Document format:
//! ```text
//! {
//!   "commits": [ { "id", "message", "timestamp", "tree", "parentId"?, "branchId" } ],
//!   "branches": [ { "id", "name", "headId"?, "forkPoint"? } ],
//!   "currentBranch": "01hx...",
//!   "head": { "commitId": "01hx...", "detached": false },
//!   "staging": { "<branch id>": [ ...items ] }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::clock::Clock;
use crate::engine::versioning::VersionEngine;
use crate::storage::{
    Branch, BranchId, BranchName, BranchTable, Commit, CommitGraph, HeadPointer, Snapshot,
    StagingArea,
};

/// Serializable snapshot of everything the engine owns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    #[serde(default)]
    pub commits: Vec<Commit>,
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub current_branch: Option<BranchId>,
    #[serde(default)]
    pub head: HeadPointer,
    #[serde(default)]
    pub staging: BTreeMap<BranchId, Snapshot>,
}

impl VersionEngine {
    /// Copy out the full state. Commits are ordered oldest first.
    pub fn export_state(&self) -> EngineState {
        let mut commits: Vec<Commit> = self.graph.iter().cloned().collect();
        commits.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

        EngineState {
            commits,
            branches: self.branches.list().to_vec(),
            current_branch: Some(self.current.clone()),
            head: self.head.clone(),
            staging: self.staging.to_map(),
        }
    }

    /// Rebuild an engine from an exported state, repairing what does not
    /// line up.
    pub fn from_state(state: EngineState) -> Self {
        let mut graph = CommitGraph::new();
        for commit in state.commits {
            if graph.contains(&commit.id) {
                warn!(commit = %commit.id, "dropping duplicate commit");
                continue;
            }
            graph.restore(commit);
        }

        let mut branches = BranchTable::new();
        for mut branch in state.branches {
            if branch.head_id.as_ref().is_some_and(|h| !graph.contains(h)) {
                warn!(branch = %branch.id, "clearing unresolvable branch head");
                branch.head_id = None;
            }
            if branch.fork_point.as_ref().is_some_and(|f| !graph.contains(f)) {
                warn!(branch = %branch.id, "clearing unresolvable fork point");
                branch.fork_point = None;
            }
            let id = branch.id.clone();
            if branches.insert(branch).is_err() {
                warn!(branch = %id, "dropping duplicate branch");
            }
        }

        let current = match state.current_branch {
            Some(id) if branches.contains(&id) => id,
            requested => {
                if branches.is_empty() {
                    warn!("no branches in state, creating the default branch");
                    let branch = Branch::new(BranchName::default_branch(), None);
                    let id = branch.id.clone();
                    branches = BranchTable::with_initial(branch);
                    id
                } else {
                    let first = branches.list()[0].id.clone();
                    if let Some(requested) = requested {
                        warn!(requested = %requested, fallback = %first, "active branch not found");
                    }
                    first
                }
            }
        };

        let active_head = branches.get(&current).and_then(|b| b.head_id.clone());
        let mut head = state.head;
        let consistent = match (&head.commit_id, head.detached) {
            (Some(id), true) => graph.contains(id),
            (commit_id, false) => commit_id == &active_head,
            (None, true) => false,
        };
        if !consistent {
            warn!("head pointer out of sync, attaching to active branch head");
            head.attach(active_head);
        }

        let mut staging = StagingArea::new();
        for (branch, snapshot) in state.staging {
            if !branches.contains(&branch) {
                warn!(branch = %branch, "dropping staged snapshot of unknown branch");
                continue;
            }
            staging.stage(&branch, snapshot);
        }

        let newest = graph.iter().map(|c| c.timestamp).max();

        Self {
            graph,
            branches,
            staging,
            head,
            current,
            clock: Clock::starting_after(newest),
        }
    }
}
