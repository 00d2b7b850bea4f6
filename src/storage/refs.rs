//! Branch table.
//!
//! Branches are named, movable pointers into the commit graph. The table owns
//! no commit data; it only stores ids that the engine keeps resolvable.
//!
//! Besides its head, each branch remembers the commit it was forked from.
//! History listings use the fork point to decide which commits labelled with
//! another branch id still count as this branch's history.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{BranchId, BranchName, CommitId};

/// a named line of history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: BranchId,
    pub name: BranchName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_id: Option<CommitId>,
    /// commit this branch was created from, if it shares history with another branch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_point: Option<CommitId>,
}

impl Branch {
    /// a new branch with a generated id
    pub fn new(name: BranchName, head_id: Option<CommitId>) -> Self {
        Self {
            id: BranchId::generate(),
            name,
            head_id,
            fork_point: None,
        }
    }

    /// set the fork point (builder style)
    pub fn forked_at(mut self, fork_point: Option<CommitId>) -> Self {
        self.fork_point = fork_point;
        self
    }

    /// true when the branch has no commits yet
    pub fn is_empty(&self) -> bool {
        self.head_id.is_none()
    }
}

/// Branches in creation order.
#[derive(Debug, Clone, Default)]
pub struct BranchTable {
    branches: Vec<Branch>,
}

impl BranchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// a table holding just `branch`
    pub(crate) fn with_initial(branch: Branch) -> Self {
        Self {
            branches: vec![branch],
        }
    }

    /// add a branch; ids must be unique
    pub fn insert(&mut self, branch: Branch) -> StorageResult<()> {
        if self.contains(&branch.id) {
            return Err(StorageError::Internal(format!(
                "duplicate branch id {}",
                branch.id
            )));
        }
        self.branches.push(branch);
        Ok(())
    }

    pub fn get(&self, id: &BranchId) -> Option<&Branch> {
        self.branches.iter().find(|b| &b.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &BranchId) -> Option<&mut Branch> {
        self.branches.iter_mut().find(|b| &b.id == id)
    }

    /// look up a branch or fail with `BranchNotFound`
    pub fn resolve(&self, id: &BranchId) -> StorageResult<&Branch> {
        self.get(id)
            .ok_or_else(|| StorageError::BranchNotFound(id.clone()))
    }

    pub fn contains(&self, id: &BranchId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn remove(&mut self, id: &BranchId) -> Option<Branch> {
        let index = self.branches.iter().position(|b| &b.id == id)?;
        Some(self.branches.remove(index))
    }

    /// move a branch head
    pub(crate) fn set_head(&mut self, id: &BranchId, head: Option<CommitId>) -> StorageResult<()> {
        let branch = self
            .get_mut(id)
            .ok_or_else(|| StorageError::BranchNotFound(id.clone()))?;
        branch.head_id = head;
        Ok(())
    }

    /// redirect every head and fork point that points into `removed`
    ///
    /// Returns the ids of branches whose head moved.
    pub(crate) fn retarget(
        &mut self,
        removed: &HashSet<CommitId>,
        fallback: Option<&CommitId>,
    ) -> Vec<BranchId> {
        let mut moved = Vec::new();
        for branch in &mut self.branches {
            if branch.head_id.as_ref().is_some_and(|h| removed.contains(h)) {
                branch.head_id = fallback.cloned();
                moved.push(branch.id.clone());
            }
            if branch.fork_point.as_ref().is_some_and(|f| removed.contains(f)) {
                branch.fork_point = fallback.cloned();
            }
        }
        moved
    }

    pub fn list(&self) -> &[Branch] {
        &self.branches
    }

    pub fn iter(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// heads and fork points of every branch except `except`
    pub(crate) fn anchors_except(&self, except: &BranchId) -> Vec<&CommitId> {
        self.branches
            .iter()
            .filter(|b| &b.id != except)
            .flat_map(|b| b.head_id.iter().chain(b.fork_point.iter()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(s: &str) -> CommitId {
        CommitId::new(s).unwrap()
    }

    fn named(name: &str, head: Option<&str>) -> Branch {
        Branch::new(BranchName::new(name).unwrap(), head.map(cid))
    }

    #[test]
    fn test_branch_lifecycle() {
        let mut table = BranchTable::new();
        let feature = named("feature", None);
        let id = feature.id.clone();

        table.insert(feature).unwrap();
        assert!(table.contains(&id));
        assert!(table.resolve(&id).unwrap().is_empty());

        table.set_head(&id, Some(cid("c1"))).unwrap();
        assert_eq!(table.get(&id).unwrap().head_id, Some(cid("c1")));

        let removed = table.remove(&id).unwrap();
        assert_eq!(removed.name.as_str(), "feature");
        assert!(table.is_empty());
        assert!(matches!(table.resolve(&id), Err(StorageError::BranchNotFound(_))));
    }

    #[test]
    fn test_duplicate_branch_error() {
        let mut table = BranchTable::new();
        let branch = named("a", None);
        table.insert(branch.clone()).unwrap();
        assert!(matches!(table.insert(branch), Err(StorageError::Internal(_))));
    }

    #[test]
    fn test_list_keeps_creation_order() {
        let mut table = BranchTable::new();
        for name in ["default", "feature", "fix"] {
            table.insert(named(name, None)).unwrap();
        }
        let names: Vec<_> = table.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["default", "feature", "fix"]);
    }

    #[test]
    fn test_retarget() {
        let mut table = BranchTable::new();
        let a = named("a", Some("c3"));
        let b = named("b", Some("c1")).forked_at(Some(cid("c3")));
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        table.insert(a).unwrap();
        table.insert(b).unwrap();

        let removed: HashSet<_> = [cid("c3")].into_iter().collect();
        let moved = table.retarget(&removed, Some(&cid("c2")));

        assert_eq!(moved, vec![a_id.clone()]);
        assert_eq!(table.get(&a_id).unwrap().head_id, Some(cid("c2")));
        assert_eq!(table.get(&b_id).unwrap().head_id, Some(cid("c1")));
        assert_eq!(table.get(&b_id).unwrap().fork_point, Some(cid("c2")));
    }

    #[test]
    fn test_anchors_except() {
        let mut table = BranchTable::new();
        let a = named("a", Some("c1"));
        let b = named("b", Some("c5")).forked_at(Some(cid("c2")));
        let a_id = a.id.clone();
        table.insert(a).unwrap();
        table.insert(b).unwrap();

        let anchors = table.anchors_except(&a_id);
        assert_eq!(anchors, vec![&cid("c5"), &cid("c2")]);
    }
}
