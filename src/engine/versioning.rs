//! The versioning engine.
//!
//! `VersionEngine` exclusively owns the commit graph, the branch table, the
//! staging area and the head pointer. Every operation validates all of its
//! preconditions before the first mutation, so a failed call leaves the
//! engine exactly as it was.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::engine::clock::Clock;
use crate::storage::{
    Branch, BranchId, BranchName, BranchTable, Commit, CommitGraph, CommitId, CommitMessage,
    HeadPointer, Snapshot, StagingArea, StorageError, StorageResult,
};

/// Branch/commit versioning engine over item snapshots.
#[derive(Debug, Clone)]
pub struct VersionEngine {
    pub(crate) graph: CommitGraph,
    pub(crate) branches: BranchTable,
    pub(crate) staging: StagingArea,
    pub(crate) head: HeadPointer,
    pub(crate) current: BranchId,
    pub(crate) clock: Clock,
}

impl Default for VersionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionEngine {
    /// A fresh engine with a single empty branch named `default`.
    pub fn new() -> Self {
        Self::with_default_branch(BranchName::default_branch())
    }

    /// A fresh engine whose initial branch has the given name.
    pub fn with_default_branch(name: BranchName) -> Self {
        let branch = Branch::new(name, None);
        let current = branch.id.clone();
        Self {
            graph: CommitGraph::new(),
            branches: BranchTable::with_initial(branch),
            staging: StagingArea::new(),
            head: HeadPointer::default(),
            current,
            clock: Clock::new(),
        }
    }

    // ==================== Queries ====================

    /// The commit currently checked out, if any.
    pub fn get_head(&self) -> Option<&Commit> {
        self.head.commit_id().and_then(|id| self.graph.get(id))
    }

    pub fn head_pointer(&self) -> &HeadPointer {
        &self.head
    }

    pub fn is_detached(&self) -> bool {
        self.head.is_detached()
    }

    pub fn current_branch(&self) -> Option<&Branch> {
        self.branches.get(&self.current)
    }

    pub fn current_branch_id(&self) -> &BranchId {
        &self.current
    }

    pub fn list_branches(&self) -> &[Branch] {
        self.branches.list()
    }

    pub fn get_branch(&self, id: &BranchId) -> Option<&Branch> {
        self.branches.get(id)
    }

    /// `git show`
    pub fn get_commit(&self, id: &CommitId) -> Option<&Commit> {
        self.graph.get(id)
    }

    /// The commit graph, read-only.
    pub fn commits(&self) -> &CommitGraph {
        &self.graph
    }

    /// Pending snapshot of the active branch.
    pub fn staged(&self) -> Option<&Snapshot> {
        self.staging.get(&self.current)
    }

    /// the active branch, or `BranchNotFound` if the table lost it
    pub(crate) fn active(&self) -> StorageResult<&Branch> {
        self.branches.resolve(&self.current)
    }

    // ==================== Commits ====================

    /// `git add`
    ///
    /// Replaces the pending snapshot of the active branch. An empty snapshot
    /// clears staging for the branch.
    pub fn add(&mut self, snapshot: Snapshot) {
        debug!(
            branch = %self.current,
            items = snapshot.item_count(),
            "staging snapshot"
        );
        self.staging.stage(&self.current, snapshot);
    }

    /// `git commit -m <message>`
    ///
    /// Records the staged snapshot on top of the active branch head, moves
    /// the branch and an attached head pointer to it, and clears staging.
    pub fn commit(&mut self, message: impl Into<String>) -> StorageResult<Commit> {
        let branch_id = self.current.clone();
        if !self.staging.has_changes(&branch_id) {
            return Err(StorageError::NothingStaged { branch: branch_id });
        }
        let parent_id = self.active()?.head_id.clone();

        let tree = self
            .staging
            .take(&branch_id)
            .ok_or_else(|| StorageError::NothingStaged { branch: branch_id.clone() })?;

        let commit = Commit {
            id: CommitId::generate(),
            message: message.into(),
            timestamp: self.clock.tick(),
            tree,
            parent_id,
            branch_id: branch_id.clone(),
        };

        if let Err(e) = self.graph.insert(commit.clone()) {
            self.staging.stage(&branch_id, commit.tree);
            return Err(e);
        }

        self.branches.set_head(&branch_id, Some(commit.id.clone()))?;
        self.head.attach(Some(commit.id.clone()));

        info!(commit = %commit.id, branch = %branch_id, "committed: {}", commit.summary());
        Ok(commit)
    }

    /// `git reset --hard <commit>`
    ///
    /// Destructive. Deletes every commit of the active branch whose parent
    /// chain passes through `id`, then moves the branch head and the head
    /// pointer to `id`. Commits still reachable from another branch are kept.
    pub fn reset_to_commit(&mut self, id: &CommitId) -> StorageResult<&Commit> {
        let target_branch = self
            .graph
            .get(id)
            .ok_or_else(|| StorageError::CommitNotFound(id.clone()))?
            .branch_id
            .clone();
        self.ensure_owned(id)?;

        let current = self.current.clone();
        let protected = self
            .graph
            .reachable_from(self.branches.anchors_except(&current));

        let doomed: Vec<CommitId> = self
            .graph
            .iter()
            .filter(|c| c.branch_id == current && &c.id != id)
            .filter(|c| !protected.contains(&c.id))
            .filter(|c| self.graph.descends_from(&c.id, id))
            .map(|c| c.id.clone())
            .collect();

        for doomed_id in &doomed {
            self.graph.remove(doomed_id);
        }

        if let Some(branch) = self.branches.get_mut(&current) {
            branch.head_id = Some(id.clone());
            if target_branch != current {
                // the branch now starts from shared history at `id`
                branch.fork_point = Some(id.clone());
            }
        }
        self.head.attach(Some(id.clone()));

        info!(
            target = %id,
            branch = %current,
            removed = doomed.len(),
            "reset branch"
        );
        self.graph
            .get(id)
            .ok_or_else(|| StorageError::CommitNotFound(id.clone()))
    }

    /// `git revert <commit>`
    ///
    /// Re-applies the snapshot of `id` as a new tip of the active branch.
    /// Existing commits are left untouched.
    pub fn revert_commit(&mut self, id: &CommitId, message: Option<&str>) -> StorageResult<Commit> {
        let target = self
            .graph
            .get(id)
            .ok_or_else(|| StorageError::CommitNotFound(id.clone()))?;
        self.ensure_owned(id)?;

        let message = match message {
            Some(m) => m.to_string(),
            None => CommitMessage::revert(&target.message),
        };
        let tree = target.tree.clone();
        let parent_id = self.active()?.head_id.clone();
        let branch_id = self.current.clone();

        let commit = Commit {
            id: CommitId::generate(),
            message,
            timestamp: self.clock.tick(),
            tree,
            parent_id,
            branch_id: branch_id.clone(),
        };
        self.graph.insert(commit.clone())?;
        self.branches.set_head(&branch_id, Some(commit.id.clone()))?;
        self.head.attach(Some(commit.id.clone()));

        info!(commit = %commit.id, target = %id, branch = %branch_id, "reverted");
        Ok(commit)
    }

    /// `git checkout <commit>`
    ///
    /// Moves the head pointer to any existing commit and marks it detached.
    /// No branch moves.
    pub fn checkout_commit(&mut self, id: &CommitId) -> StorageResult<&Commit> {
        if !self.graph.contains(id) {
            return Err(StorageError::CommitNotFound(id.clone()));
        }
        self.head.detach(id.clone());
        debug!(commit = %id, "detached head");
        self.graph
            .get(id)
            .ok_or_else(|| StorageError::CommitNotFound(id.clone()))
    }

    /// Delete a commit and everything built on top of it.
    ///
    /// Every commit whose parent chain passes through `id` goes too, on any
    /// branch. Branch heads and fork points inside the removed set move to the
    /// parent of `id` (or become absent). Returns the removed ids, sorted.
    pub fn delete_commit(&mut self, id: &CommitId) -> StorageResult<Vec<CommitId>> {
        let parent = self
            .graph
            .get(id)
            .ok_or_else(|| StorageError::CommitNotFound(id.clone()))?
            .parent_id
            .clone();

        let mut removed: HashSet<CommitId> = self.graph.descendants_of(id).into_iter().collect();
        removed.insert(id.clone());
        let fallback = parent.filter(|p| self.graph.contains(p) && !removed.contains(p));

        for gone in &removed {
            self.graph.remove(gone);
        }
        let moved = self.branches.retarget(&removed, fallback.as_ref());

        if self.head.commit_id().is_some_and(|h| removed.contains(h)) {
            match (&fallback, self.head.is_detached()) {
                (Some(parent), true) => self.head.detach(parent.clone()),
                _ => {
                    let tip = self.branches.get(&self.current).and_then(|b| b.head_id.clone());
                    self.head.attach(tip);
                }
            }
        }

        let mut removed: Vec<CommitId> = removed.into_iter().collect();
        removed.sort();
        info!(
            commit = %id,
            removed = removed.len(),
            branches_moved = moved.len(),
            "deleted commit"
        );
        Ok(removed)
    }

    // ==================== Branches ====================

    /// `git branch <name> [<commit>]`
    ///
    /// The new branch starts at `from`, else at the checked-out commit, else
    /// empty. The active branch does not change.
    pub fn create_branch(&mut self, name: BranchName, from: Option<&CommitId>) -> StorageResult<Branch> {
        let source = match from {
            Some(id) if !self.graph.contains(id) => {
                return Err(StorageError::CommitNotFound(id.clone()));
            }
            Some(id) => Some(id.clone()),
            None => self.head.commit_id.clone(),
        };

        let branch = Branch::new(name, source.clone()).forked_at(source);
        self.branches.insert(branch.clone())?;

        info!(branch = %branch.id, name = %branch.name, "created branch");
        Ok(branch)
    }

    /// `git checkout -b <name> [<commit>]`
    pub fn create_and_checkout_branch(
        &mut self,
        name: BranchName,
        from: Option<&CommitId>,
    ) -> StorageResult<Branch> {
        let branch = self.create_branch(name, from)?;
        self.checkout_branch(&branch.id)?;
        Ok(branch)
    }

    /// `git branch -d <branch>`
    ///
    /// Commits made on the branch stay in the graph.
    pub fn delete_branch(&mut self, id: &BranchId) -> StorageResult<Branch> {
        if id == &self.current {
            return Err(StorageError::ActiveBranchDeletion(id.clone()));
        }
        let removed = self
            .branches
            .remove(id)
            .ok_or_else(|| StorageError::BranchNotFound(id.clone()))?;
        self.staging.clear(id);

        info!(branch = %id, name = %removed.name, "deleted branch");
        Ok(removed)
    }

    /// `git checkout <branch>`
    pub fn checkout_branch(&mut self, id: &BranchId) -> StorageResult<&Branch> {
        let head_id = self.branches.resolve(id)?.head_id.clone();

        self.current = id.clone();
        if head_id.is_none() {
            self.staging.clear(id);
        }
        self.head.attach(head_id);

        debug!(branch = %id, "checked out branch");
        self.branches.resolve(id)
    }

    /// Create a branch from the active branch.
    ///
    /// Shallow (`full_history == false`): the new branch points at the same
    /// head and shares its commits. Deep: the whole ancestor chain is copied
    /// oldest first with fresh ids, relinked to each other and attributed to
    /// the new branch.
    pub fn clone_branch(&mut self, name: BranchName, full_history: bool) -> StorageResult<Branch> {
        let source_head = self.active()?.head_id.clone();
        let mut branch = Branch::new(name, source_head.clone()).forked_at(source_head.clone());

        let mut copies = Vec::new();
        if full_history {
            let mut chain: Vec<&Commit> = self.graph.ancestors(source_head.as_ref()).collect();
            chain.reverse();

            let mut prev: Option<CommitId> = None;
            for original in chain {
                let copy = Commit {
                    id: CommitId::generate(),
                    message: original.message.clone(),
                    timestamp: original.timestamp,
                    tree: original.tree.clone(),
                    parent_id: prev.take(),
                    branch_id: branch.id.clone(),
                };
                prev = Some(copy.id.clone());
                copies.push(copy);
            }
            branch.head_id = prev;
            branch.fork_point = None;
        }

        self.branches.insert(branch.clone())?;
        for (i, copy) in copies.iter().enumerate() {
            if let Err(e) = self.graph.insert(copy.clone()) {
                for inserted in &copies[..i] {
                    self.graph.remove(&inserted.id);
                }
                self.branches.remove(&branch.id);
                return Err(e);
            }
        }

        info!(
            branch = %branch.id,
            name = %branch.name,
            copied = copies.len(),
            "cloned branch"
        );
        Ok(branch)
    }
}
