//! Head pointer.

use serde::{Deserialize, Serialize};

use crate::storage::types::CommitId;

/// Which commit is checked out, and whether it is detached from the active
/// branch tip.
///
/// `detached == false` means `commit_id` equals the active branch's head.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadPointer {
    #[serde(default)]
    pub commit_id: Option<CommitId>,
    #[serde(default)]
    pub detached: bool,
}

impl HeadPointer {
    /// follow a branch tip
    pub fn attach(&mut self, commit_id: Option<CommitId>) {
        self.commit_id = commit_id;
        self.detached = false;
    }

    /// view an arbitrary commit without moving any branch
    pub fn detach(&mut self, commit_id: CommitId) {
        self.commit_id = Some(commit_id);
        self.detached = true;
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn commit_id(&self) -> Option<&CommitId> {
        self.commit_id.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_and_detach() {
        let mut head = HeadPointer::default();
        assert!(head.commit_id().is_none());
        assert!(!head.is_detached());

        head.detach(CommitId::new("c1").unwrap());
        assert!(head.is_detached());
        assert_eq!(head.commit_id().map(CommitId::as_str), Some("c1"));

        head.attach(None);
        assert!(!head.is_detached());
        assert!(head.commit_id().is_none());
    }
}
