//! Branch-isolated history walks.
//!
//! A listing starts at a commit and follows parent ids. Commits labelled with
//! the walking branch are always part of its history. A commit labelled with
//! another branch is only admitted when it sits on the parent chain of both
//! the branch's own head and its fork point, i.e. it is history the branch
//! was created from. The walk stops at the first commit that fails this
//! check, so nothing behind a corrupted parent link or a sibling's commit is
//! listed.

use std::collections::HashSet;

use tracing::debug;

use crate::engine::versioning::VersionEngine;
use crate::storage::{Branch, BranchId, Commit, CommitGraph, CommitId, StorageError, StorageResult};

/// Walks one branch's view of the graph.
pub(crate) struct HistoryWalk<'g> {
    graph: &'g CommitGraph,
    branch: &'g Branch,
    own: Option<HashSet<CommitId>>,
    shared: Option<HashSet<CommitId>>,
}

impl<'g> HistoryWalk<'g> {
    pub(crate) fn new(graph: &'g CommitGraph, branch: &'g Branch) -> Self {
        Self {
            graph,
            branch,
            own: None,
            shared: None,
        }
    }

    /// ancestors of the fork point, computed on first use
    fn shared(&mut self) -> &HashSet<CommitId> {
        let (graph, branch) = (self.graph, self.branch);
        self.shared
            .get_or_insert_with(|| graph.reachable_from(branch.fork_point.as_ref()))
    }

    /// ancestors of the branch's own head
    fn own(&mut self) -> &HashSet<CommitId> {
        let (graph, branch) = (self.graph, self.branch);
        self.own
            .get_or_insert_with(|| graph.reachable_from(branch.head_id.as_ref()))
    }

    fn admits(&mut self, commit: &Commit) -> bool {
        commit.branch_id == self.branch.id
            || (self.own().contains(&commit.id) && self.shared().contains(&commit.id))
    }

    /// history from `start`, newest first
    pub(crate) fn walk(mut self, start: Option<&CommitId>) -> Vec<&'g Commit> {
        let graph = self.graph;
        let mut out = Vec::new();
        for commit in graph.ancestors(start) {
            if !self.admits(commit) {
                break;
            }
            out.push(commit);
        }
        out
    }
}

impl VersionEngine {
    /// `git log`
    ///
    /// Commits of the active branch reachable from the head pointer, newest
    /// first. Detached heads list from the checked-out commit.
    pub fn list_commits(&self) -> Vec<&Commit> {
        let Some(branch) = self.current_branch() else {
            return Vec::new();
        };
        let commits = HistoryWalk::new(&self.graph, branch).walk(self.head.commit_id());
        debug!(branch = %branch.id, count = commits.len(), "listed commits");
        commits
    }

    /// `git log <branch>`
    ///
    /// Like [`list_commits`](Self::list_commits) but walked from the given
    /// branch's own head.
    pub fn branch_history(&self, id: &BranchId) -> StorageResult<Vec<&Commit>> {
        let branch = self.branches.resolve(id)?;
        Ok(HistoryWalk::new(&self.graph, branch).walk(branch.head_id.as_ref()))
    }

    /// true if `id` is part of the active branch's history
    pub fn owns(&self, id: &CommitId) -> bool {
        self.branch_history(&self.current)
            .map(|history| history.iter().any(|c| &c.id == id))
            .unwrap_or(false)
    }

    /// fail with `ForeignCommit` unless the active branch owns `id`
    pub(crate) fn ensure_owned(&self, id: &CommitId) -> StorageResult<()> {
        if self.owns(id) {
            Ok(())
        } else {
            Err(StorageError::ForeignCommit {
                commit: id.clone(),
                branch: self.current.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::state::EngineState;
    use crate::engine::versioning::VersionEngine;
    use crate::storage::{BranchName, CommitId, Item, Snapshot};

    fn commit(engine: &mut VersionEngine, message: &str) -> CommitId {
        engine.add(Snapshot::new(vec![Item::todo(message)]));
        engine.commit(message).unwrap().id
    }

    fn messages(engine: &VersionEngine) -> Vec<String> {
        engine.list_commits().iter().map(|c| c.message.clone()).collect()
    }

    #[test]
    fn test_owns() {
        let mut engine = VersionEngine::new();
        let c1 = commit(&mut engine, "c1");
        let b = engine
            .create_and_checkout_branch(BranchName::new("b").unwrap(), None)
            .unwrap();
        let b1 = commit(&mut engine, "b1");

        assert!(engine.owns(&c1));
        assert!(engine.owns(&b1));
        assert!(engine.ensure_owned(&c1).is_ok());

        let default_id = engine.list_branches()[0].id.clone();
        engine.checkout_branch(&default_id).unwrap();
        assert!(!engine.owns(&b1));
        assert!(engine.ensure_owned(&b1).is_err());
        assert_eq!(engine.branch_history(&b.id).unwrap().len(), 2);
    }

    #[test]
    fn test_corrupted_parent_chain_stops_at_fork() {
        let mut engine = VersionEngine::new();
        let default_id = engine.current_branch_id().clone();
        commit(&mut engine, "c1");
        let c2 = commit(&mut engine, "c2");
        let c3 = commit(&mut engine, "c3");

        let f = engine
            .create_and_checkout_branch(BranchName::new("f").unwrap(), Some(&c2))
            .unwrap();
        let f1 = commit(&mut engine, "f1");

        // point f1 at the default branch's later commit
        let mut state: EngineState = engine.export_state();
        for c in &mut state.commits {
            if c.id == f1 {
                c.parent_id = Some(c3.clone());
            }
        }
        let engine = VersionEngine::from_state(state);

        assert_eq!(engine.current_branch_id(), &f.id);
        assert_eq!(messages(&engine), vec!["f1"]);

        let default_history: Vec<_> = engine
            .branch_history(&default_id)
            .unwrap()
            .iter()
            .map(|c| c.message.clone())
            .collect();
        assert_eq!(default_history, vec!["c3", "c2", "c1"]);
    }

    #[test]
    fn test_detached_on_sibling_commit_lists_nothing_foreign() {
        let mut engine = VersionEngine::new();
        let default_id = engine.current_branch_id().clone();
        commit(&mut engine, "c1");
        engine
            .create_and_checkout_branch(BranchName::new("b").unwrap(), None)
            .unwrap();
        let b1 = commit(&mut engine, "b1");

        engine.checkout_branch(&default_id).unwrap();
        engine.checkout_commit(&b1).unwrap();

        assert!(engine.is_detached());
        assert_eq!(engine.get_head().unwrap().id, b1);
        assert!(engine.list_commits().is_empty());
    }

    #[test]
    fn test_cyclic_chain_terminates() {
        let mut engine = VersionEngine::new();
        let c1 = commit(&mut engine, "c1");
        let c2 = commit(&mut engine, "c2");

        let mut state = engine.export_state();
        for c in &mut state.commits {
            if c.id == c1 {
                c.parent_id = Some(c2.clone());
            }
        }
        let engine = VersionEngine::from_state(state);
        assert_eq!(messages(&engine), vec!["c2", "c1"]);
    }
}
