//! Commits and the commit graph.
//!
//! Commits are immutable once created. The graph is an arena keyed by
//! [`CommitId`]: commits refer to their parent by id, never by reference, so
//! removing a commit can at worst leave a dangling id behind. Every traversal
//! here treats a missing parent as the end of the chain and carries a visited
//! set, so a corrupted (even cyclic) parent chain still terminates.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::snapshot::Snapshot;
use crate::storage::types::{BranchId, CommitId};

/// a recorded snapshot plus its link to history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub id: CommitId,
    pub message: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub tree: Snapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommitId>,
    pub branch_id: BranchId,
}

impl Commit {
    /// true for a commit that starts a history
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// first line of the message
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or(&self.message)
    }
}

/// Append-mostly store of commits keyed by id.
#[derive(Debug, Clone, Default)]
pub struct CommitGraph {
    commits: HashMap<CommitId, Commit>,
}

impl CommitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// add a freshly created commit
    ///
    /// The id must be new and the parent, if any, must already be present.
    pub fn insert(&mut self, commit: Commit) -> StorageResult<()> {
        if self.commits.contains_key(&commit.id) {
            return Err(StorageError::Internal(format!(
                "duplicate commit id {}",
                commit.id
            )));
        }
        if let Some(parent) = &commit.parent_id {
            if !self.commits.contains_key(parent) {
                return Err(StorageError::Internal(format!(
                    "commit {} references unknown parent {}",
                    commit.id, parent
                )));
            }
        }
        self.commits.insert(commit.id.clone(), commit);
        Ok(())
    }

    /// add a commit coming from an imported state
    ///
    /// Imported commits may arrive in any order and may reference parents that
    /// no longer exist, so the parent check is skipped.
    pub(crate) fn restore(&mut self, commit: Commit) {
        self.commits.insert(commit.id.clone(), commit);
    }

    pub fn get(&self, id: &CommitId) -> Option<&Commit> {
        self.commits.get(id)
    }

    pub fn contains(&self, id: &CommitId) -> bool {
        self.commits.contains_key(id)
    }

    pub(crate) fn remove(&mut self, id: &CommitId) -> Option<Commit> {
        self.commits.remove(id)
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// all commits, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &Commit> {
        self.commits.values()
    }

    /// walk the parent chain starting at (and including) `start`
    pub fn ancestors(&self, start: Option<&CommitId>) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            next: start.cloned(),
            visited: HashSet::new(),
        }
    }

    /// true if `ancestor` is `descendant` itself or sits on its parent chain
    pub fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> bool {
        if ancestor == descendant {
            return true;
        }
        self.ancestors(Some(descendant)).any(|c| &c.id == ancestor)
    }

    /// true if the parent chain of `id` (excluding `id`) passes through `target`
    pub fn descends_from(&self, id: &CommitId, target: &CommitId) -> bool {
        let Some(commit) = self.commits.get(id) else {
            return false;
        };
        match &commit.parent_id {
            Some(parent) if parent == target => true,
            Some(parent) => self.ancestors(Some(parent)).any(|c| &c.id == target),
            None => false,
        }
    }

    /// every commit whose parent chain passes through `target`
    pub fn descendants_of(&self, target: &CommitId) -> Vec<CommitId> {
        self.commits
            .keys()
            .filter(|id| *id != target && self.descends_from(id, target))
            .cloned()
            .collect()
    }

    /// ids reachable from any of the given starting points, starts included
    pub fn reachable_from<'a, I>(&self, starts: I) -> HashSet<CommitId>
    where
        I: IntoIterator<Item = &'a CommitId>,
    {
        let mut seen = HashSet::new();
        for start in starts {
            for commit in self.ancestors(Some(start)) {
                if !seen.insert(commit.id.clone()) {
                    // the rest of this chain was already collected
                    break;
                }
            }
        }
        seen
    }
}

/// Parent-chain iterator with a cycle guard.
///
/// Stops at a missing commit, at a root, or at the first id seen twice.
pub struct Ancestors<'g> {
    graph: &'g CommitGraph,
    next: Option<CommitId>,
    visited: HashSet<CommitId>,
}

impl<'g> Iterator for Ancestors<'g> {
    type Item = &'g Commit;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        if !self.visited.insert(id.clone()) {
            return None;
        }
        let commit = self.graph.get(&id)?;
        self.next = commit.parent_id.clone();
        Some(commit)
    }
}

/// message formatting for engine-generated commits
pub struct CommitMessage;

impl CommitMessage {
    /// default message for a revert
    pub fn revert(original: &str) -> String {
        format!("revert: {}", original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::snapshot::Item;

    fn commit(id: &str, parent: Option<&str>) -> Commit {
        Commit {
            id: CommitId::new(id).unwrap(),
            message: format!("msg {}", id),
            timestamp: Utc::now(),
            tree: Snapshot::new(vec![Item::todo(id)]),
            parent_id: parent.map(|p| CommitId::new(p).unwrap()),
            branch_id: BranchId::new("main").unwrap(),
        }
    }

    fn id(s: &str) -> CommitId {
        CommitId::new(s).unwrap()
    }

    fn linear() -> CommitGraph {
        let mut graph = CommitGraph::new();
        graph.insert(commit("c1", None)).unwrap();
        graph.insert(commit("c2", Some("c1"))).unwrap();
        graph.insert(commit("c3", Some("c2"))).unwrap();
        graph
    }

    #[test]
    fn test_insert_requires_existing_parent() {
        let mut graph = CommitGraph::new();
        let result = graph.insert(commit("c2", Some("c1")));
        assert!(matches!(result, Err(StorageError::Internal(_))));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut graph = linear();
        assert!(graph.insert(commit("c2", Some("c1"))).is_err());
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_ancestors_newest_first() {
        let graph = linear();
        let ids: Vec<_> = graph.ancestors(Some(&id("c3"))).map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c3", "c2", "c1"]);
        assert_eq!(graph.ancestors(None).count(), 0);
    }

    #[test]
    fn test_ancestors_stop_at_missing_parent() {
        let mut graph = linear();
        graph.remove(&id("c2"));
        let ids: Vec<_> = graph.ancestors(Some(&id("c3"))).map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c3"]);
    }

    #[test]
    fn test_ancestors_cycle_guard() {
        let mut graph = CommitGraph::new();
        graph.restore(commit("a", Some("b")));
        graph.restore(commit("b", Some("a")));
        assert_eq!(graph.ancestors(Some(&id("a"))).count(), 2);
        assert!(!graph.is_ancestor(&id("zzz"), &id("a")));
        assert!(graph.descendants_of(&id("x")).is_empty());
    }

    #[test]
    fn test_ancestry_queries() {
        let mut graph = linear();
        graph.insert(commit("side", Some("c1"))).unwrap();

        assert!(graph.is_ancestor(&id("c1"), &id("c3")));
        assert!(graph.is_ancestor(&id("c3"), &id("c3")));
        assert!(!graph.is_ancestor(&id("c3"), &id("c1")));
        assert!(!graph.is_ancestor(&id("c2"), &id("side")));

        assert!(graph.descends_from(&id("c3"), &id("c1")));
        assert!(!graph.descends_from(&id("c1"), &id("c1")));

        let mut below_c1 = graph.descendants_of(&id("c1"));
        below_c1.sort();
        assert_eq!(below_c1, vec![id("c2"), id("c3"), id("side")]);
    }

    #[test]
    fn test_reachable_from() {
        let mut graph = linear();
        graph.insert(commit("side", Some("c1"))).unwrap();
        let reachable = graph.reachable_from([&id("c2"), &id("side")]);
        assert_eq!(reachable.len(), 3);
        assert!(!reachable.contains(&id("c3")));
    }

    #[test]
    fn test_commit_wire_format() {
        let c = commit("c2", Some("c1"));
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["parentId"], "c1");
        assert_eq!(json["branchId"], "main");
        assert!(json["timestamp"].is_i64());

        let root = serde_json::to_value(&commit("c1", None)).unwrap();
        assert!(root.get("parentId").is_none());
    }

    #[test]
    fn test_commit_helpers() {
        let mut c = commit("c1", None);
        c.message = "first line\nbody".to_string();
        assert!(c.is_root());
        assert_eq!(c.summary(), "first line");
        assert_eq!(CommitMessage::revert("add A"), "revert: add A");
    }
}
