//! Request/response boundary over one engine instance.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::engine::VersionEngine;
use crate::persist::{DocumentStore, PersistError};
use crate::storage::{
    Branch, BranchId, BranchName, Commit, CommitId, Snapshot, StorageError,
};

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced at the request boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("malformed request: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// short error name carried in the error body
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Storage(e) => e.kind(),
            ApiError::Persist(_) => "persist",
            ApiError::BadRequest(_) | ApiError::Json(_) => "badRequest",
            ApiError::Internal(_) => "internal",
        }
    }

    /// `{ "error": <message>, "kind": <kind> }`
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({ "error": self.to_string(), "kind": self.kind() }).to_string()
    }
}

/// Serialized form of an [`ApiError`].
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

/// Service configuration options.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding the documents.
    pub data_dir: PathBuf,
    /// Name of the document to load and save.
    pub document: String,
    /// Name of the branch a fresh document starts with.
    pub default_branch_name: String,
    /// Load and save the document at all.
    pub persist: bool,
    /// Save after every successful mutating request.
    pub autosave: bool,
    /// Log every request at debug level.
    pub verbose: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            document: "workspace".into(),
            default_branch_name: BranchName::DEFAULT.into(),
            persist: true,
            autosave: true,
            verbose: false,
        }
    }
}

impl ServiceConfig {
    /// A configuration that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            persist: false,
            autosave: false,
            ..Default::default()
        }
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn document(mut self, name: impl Into<String>) -> Self {
        self.document = name.into();
        self
    }

    pub fn default_branch_name(mut self, name: impl Into<String>) -> Self {
        self.default_branch_name = name.into();
        self
    }

    pub fn persist(mut self, value: bool) -> Self {
        self.persist = value;
        self
    }

    pub fn autosave(mut self, value: bool) -> Self {
        self.autosave = value;
        self
    }

    pub fn verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }
}

/// One operation per request, tagged by `op`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    /// replace the staged snapshot of the active branch
    Stage { tree: Snapshot },
    /// stage `tree` and commit it
    Commit {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        tree: Snapshot,
    },
    ListCommits,
    GetCommit { commit_id: CommitId },
    GetHead,
    CheckoutCommit { commit_id: CommitId },
    DeleteCommit { commit_id: CommitId },
    ResetToCommit { commit_id: CommitId },
    RevertCommit {
        commit_id: CommitId,
        #[serde(default)]
        message: Option<String>,
    },
    CreateBranch {
        name: String,
        #[serde(default)]
        from_commit_id: Option<CommitId>,
        #[serde(default)]
        checkout: bool,
    },
    DeleteBranch { branch_id: BranchId },
    CheckoutBranch { branch_id: BranchId },
    CloneBranch {
        name: String,
        #[serde(default)]
        full_history: bool,
    },
    ListBranches,
}

impl Request {
    /// true for requests that can change engine state
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Request::ListCommits
                | Request::GetCommit { .. }
                | Request::GetHead
                | Request::ListBranches
        )
    }

    pub fn op(&self) -> &'static str {
        match self {
            Request::Stage { .. } => "stage",
            Request::Commit { .. } => "commit",
            Request::ListCommits => "listCommits",
            Request::GetCommit { .. } => "getCommit",
            Request::GetHead => "getHead",
            Request::CheckoutCommit { .. } => "checkoutCommit",
            Request::DeleteCommit { .. } => "deleteCommit",
            Request::ResetToCommit { .. } => "resetToCommit",
            Request::RevertCommit { .. } => "revertCommit",
            Request::CreateBranch { .. } => "createBranch",
            Request::DeleteBranch { .. } => "deleteBranch",
            Request::CheckoutBranch { .. } => "checkoutBranch",
            Request::CloneBranch { .. } => "cloneBranch",
            Request::ListBranches => "listBranches",
        }
    }
}

/// Successful response bodies. Serialized without a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum Response {
    Staged {
        staged: Option<Snapshot>,
    },
    Commit {
        commit: Commit,
    },
    Commits {
        commits: Vec<Commit>,
    },
    Head {
        head: Option<Commit>,
    },
    History {
        commits: Vec<Commit>,
        head: Option<Commit>,
    },
    CheckedOut {
        head: Option<Commit>,
        commits: Vec<Commit>,
        current_branch: Option<Branch>,
    },
    BranchCreated {
        branch: Branch,
        branches: Vec<Branch>,
        current_branch: Option<Branch>,
    },
    BranchDeleted {
        deleted: Branch,
        branches: Vec<Branch>,
        current_branch: Option<Branch>,
    },
    Branches {
        branches: Vec<Branch>,
        current_branch: Option<Branch>,
    },
}

/// Owns one engine and, optionally, the document it is saved to.
pub struct Service {
    engine: VersionEngine,
    store: Option<DocumentStore>,
    config: ServiceConfig,
}

impl Service {
    /// Open the configured document, creating it if missing.
    pub fn open(config: ServiceConfig) -> ApiResult<Self> {
        let branch_name = BranchName::new(&config.default_branch_name).map_err(StorageError::from)?;
        if !config.persist {
            return Ok(Self {
                engine: VersionEngine::with_default_branch(branch_name),
                store: None,
                config,
            });
        }

        let store = DocumentStore::new(&config.data_dir);
        let engine = store.load_or_init(&config.document, branch_name)?;
        Ok(Self {
            engine,
            store: Some(store),
            config,
        })
    }

    /// A service over a fresh engine, without persistence.
    pub fn in_memory() -> Self {
        Self {
            engine: VersionEngine::new(),
            store: None,
            config: ServiceConfig::in_memory(),
        }
    }

    pub fn engine(&self) -> &VersionEngine {
        &self.engine
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Write the engine state to the document store, if any.
    pub fn save(&self) -> ApiResult<()> {
        if let Some(store) = &self.store {
            store.save(&self.config.document, &self.engine.export_state())?;
        }
        Ok(())
    }

    /// Dispatch one request.
    pub fn handle(&mut self, request: Request) -> ApiResult<Response> {
        if self.config.verbose {
            debug!(op = request.op(), request = ?request, "handling request");
        }
        let mutating = request.is_mutating();
        let response = self.dispatch(request)?;

        if mutating && self.config.autosave {
            if let Err(e) = self.save() {
                warn!(error = %e, "autosave failed");
            }
        }
        Ok(response)
    }

    /// Parse a JSON request, dispatch it and serialize the response.
    pub fn handle_json(&mut self, input: &str) -> ApiResult<String> {
        let request: Request = serde_json::from_str(input)?;
        let response = self.handle(request)?;
        encode(&response)
    }

    fn dispatch(&mut self, request: Request) -> ApiResult<Response> {
        let engine = &mut self.engine;
        let response = match request {
            Request::Stage { tree } => {
                engine.add(tree);
                Response::Staged {
                    staged: engine.staged().cloned(),
                }
            }
            Request::Commit { message, tree } => {
                let message = message
                    .filter(|m| !m.trim().is_empty())
                    .ok_or_else(|| ApiError::BadRequest("commit message required".into()))?;
                if tree.is_empty() {
                    return Err(ApiError::BadRequest("nothing to commit".into()));
                }
                engine.add(tree);
                Response::Commit {
                    commit: engine.commit(message)?,
                }
            }
            Request::ListCommits => Response::Commits {
                commits: owned(engine.list_commits()),
            },
            Request::GetCommit { commit_id } => {
                let commit = engine
                    .get_commit(&commit_id)
                    .cloned()
                    .ok_or(StorageError::CommitNotFound(commit_id))?;
                Response::Commit { commit }
            }
            Request::GetHead => Response::Head {
                head: engine.get_head().cloned(),
            },
            Request::CheckoutCommit { commit_id } => Response::Head {
                head: Some(engine.checkout_commit(&commit_id)?.clone()),
            },
            Request::DeleteCommit { commit_id } => {
                engine.delete_commit(&commit_id)?;
                history(engine)
            }
            Request::ResetToCommit { commit_id } => {
                engine.reset_to_commit(&commit_id)?;
                history(engine)
            }
            Request::RevertCommit { commit_id, message } => Response::Commit {
                commit: engine.revert_commit(&commit_id, message.as_deref())?,
            },
            Request::CreateBranch {
                name,
                from_commit_id,
                checkout,
            } => {
                let name = BranchName::new(name).map_err(StorageError::from)?;
                let branch = if checkout {
                    engine.create_and_checkout_branch(name, from_commit_id.as_ref())?
                } else {
                    engine.create_branch(name, from_commit_id.as_ref())?
                };
                Response::BranchCreated {
                    branch,
                    branches: engine.list_branches().to_vec(),
                    current_branch: engine.current_branch().cloned(),
                }
            }
            Request::DeleteBranch { branch_id } => {
                let deleted = engine.delete_branch(&branch_id)?;
                Response::BranchDeleted {
                    deleted,
                    branches: engine.list_branches().to_vec(),
                    current_branch: engine.current_branch().cloned(),
                }
            }
            Request::CheckoutBranch { branch_id } => {
                engine.checkout_branch(&branch_id)?;
                Response::CheckedOut {
                    head: engine.get_head().cloned(),
                    commits: owned(engine.list_commits()),
                    current_branch: engine.current_branch().cloned(),
                }
            }
            Request::CloneBranch { name, full_history } => {
                let name = BranchName::new(name).map_err(StorageError::from)?;
                let branch = engine.clone_branch(name, full_history)?;
                Response::BranchCreated {
                    branch,
                    branches: engine.list_branches().to_vec(),
                    current_branch: engine.current_branch().cloned(),
                }
            }
            Request::ListBranches => Response::Branches {
                branches: engine.list_branches().to_vec(),
                current_branch: engine.current_branch().cloned(),
            },
        };
        Ok(response)
    }
}

fn owned(commits: Vec<&Commit>) -> Vec<Commit> {
    commits.into_iter().cloned().collect()
}

fn history(engine: &VersionEngine) -> Response {
    Response::History {
        commits: owned(engine.list_commits()),
        head: engine.get_head().cloned(),
    }
}

/// serialize a response; a failure here is `Internal`, never a bad request
fn encode(response: &Response) -> ApiResult<String> {
    serde_json::to_string(response).map_err(|e| ApiError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn call(service: &mut Service, request: Value) -> Value {
        let out = service.handle_json(&request.to_string()).unwrap();
        serde_json::from_str(&out).unwrap()
    }

    fn call_err(service: &mut Service, request: Value) -> ApiError {
        service.handle_json(&request.to_string()).unwrap_err()
    }

    fn tree(title: &str) -> Value {
        json!([{ "id": title, "type": "todo", "title": title, "completed": false, "children": [] }])
    }

    #[test]
    fn test_commit_and_list() {
        let mut service = Service::in_memory();
        let out = call(&mut service, json!({ "op": "commit", "message": "c1", "tree": tree("A") }));
        assert_eq!(out["commit"]["message"], "c1");
        assert_eq!(out["commit"]["tree"][0]["title"], "A");

        let listed = call(&mut service, json!({ "op": "listCommits" }));
        assert_eq!(listed["commits"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_commit_validation() {
        let mut service = Service::in_memory();
        let err = call_err(&mut service, json!({ "op": "commit", "tree": tree("A") }));
        assert_eq!(err.kind(), "badRequest");

        let err = call_err(&mut service, json!({ "op": "commit", "message": "x", "tree": [] }));
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(service.engine().commits().is_empty());
    }

    #[test]
    fn test_malformed_request() {
        let mut service = Service::in_memory();
        let err = service.handle_json("{ \"op\": \"explode\" }").unwrap_err();
        assert!(matches!(err, ApiError::Json(_)));
        let body: Value = serde_json::from_str(&err.to_json()).unwrap();
        assert_eq!(body["kind"], "badRequest");
        assert!(body["error"].is_string());
    }

    #[test]
    fn test_internal_error_kind() {
        let err = ApiError::Internal("response encoding failed".into());
        assert_eq!(err.kind(), "internal");
        let body: Value = serde_json::from_str(&err.to_json()).unwrap();
        assert_eq!(body["kind"], "internal");
        assert_eq!(body["error"], "internal error: response encoding failed");

        // a well-formed request still encodes through the same path
        let mut service = Service::in_memory();
        let out = service.handle_json(r#"{"op": "listCommits"}"#).unwrap();
        assert!(serde_json::from_str::<Value>(&out).is_ok());
    }

    #[test]
    fn test_checkout_commit_and_head() {
        let mut service = Service::in_memory();
        let c1 = call(&mut service, json!({ "op": "commit", "message": "c1", "tree": tree("A") }));
        call(&mut service, json!({ "op": "commit", "message": "c2", "tree": tree("B") }));
        let c1_id = c1["commit"]["id"].clone();

        let out = call(&mut service, json!({ "op": "checkoutCommit", "commitId": c1_id }));
        assert_eq!(out["head"]["id"], c1_id);

        let head = call(&mut service, json!({ "op": "getHead" }));
        assert_eq!(head["head"]["message"], "c1");
        assert!(service.engine().is_detached());
    }

    #[test]
    fn test_not_found_error_body() {
        let mut service = Service::in_memory();
        let err = call_err(&mut service, json!({ "op": "checkoutCommit", "commitId": "nope" }));
        assert_eq!(err.kind(), "commitNotFound");
        assert_eq!(err.to_body().error, "commit not found: nope");
    }

    #[test]
    fn test_delete_commit_response() {
        let mut service = Service::in_memory();
        call(&mut service, json!({ "op": "commit", "message": "c1", "tree": tree("A") }));
        let c2 = call(&mut service, json!({ "op": "commit", "message": "c2", "tree": tree("B") }));

        let out = call(
            &mut service,
            json!({ "op": "deleteCommit", "commitId": c2["commit"]["id"] }),
        );
        assert_eq!(out["commits"].as_array().unwrap().len(), 1);
        assert_eq!(out["head"]["message"], "c1");
    }

    #[test]
    fn test_branch_requests() {
        let mut service = Service::in_memory();
        call(&mut service, json!({ "op": "commit", "message": "c1", "tree": tree("A") }));

        let created = call(&mut service, json!({ "op": "createBranch", "name": "feature" }));
        assert_eq!(created["branches"].as_array().unwrap().len(), 2);
        assert_eq!(created["currentBranch"]["name"], "default");
        let feature_id = created["branch"]["id"].clone();

        let out = call(&mut service, json!({ "op": "checkoutBranch", "branchId": feature_id }));
        assert_eq!(out["currentBranch"]["id"], feature_id);
        assert_eq!(out["commits"].as_array().unwrap().len(), 1);
        assert_eq!(out["head"]["message"], "c1");

        let err = call_err(&mut service, json!({ "op": "deleteBranch", "branchId": feature_id }));
        assert_eq!(err.kind(), "activeBranchDeletion");

        let listed = call(&mut service, json!({ "op": "listBranches" }));
        let default_id = listed["branches"][0]["id"].clone();
        call(&mut service, json!({ "op": "checkoutBranch", "branchId": default_id }));
        let out = call(&mut service, json!({ "op": "deleteBranch", "branchId": feature_id }));
        assert_eq!(out["deleted"]["name"], "feature");
        assert_eq!(out["branches"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_create_branch_with_checkout() {
        let mut service = Service::in_memory();
        let out = call(
            &mut service,
            json!({ "op": "createBranch", "name": "feature", "checkout": true }),
        );
        assert_eq!(out["currentBranch"]["name"], "feature");

        let err = call_err(&mut service, json!({ "op": "createBranch", "name": "   " }));
        assert_eq!(err.kind(), "invalidName");
    }

    #[test]
    fn test_reset_revert_and_clone() {
        let mut service = Service::in_memory();
        let c1 = call(&mut service, json!({ "op": "commit", "message": "c1", "tree": tree("A") }));
        call(&mut service, json!({ "op": "commit", "message": "c2", "tree": tree("B") }));
        let c1_id = c1["commit"]["id"].clone();

        let reverted = call(&mut service, json!({ "op": "revertCommit", "commitId": c1_id }));
        assert_eq!(reverted["commit"]["message"], "revert: c1");
        assert_eq!(reverted["commit"]["tree"], c1["commit"]["tree"]);

        let reset = call(&mut service, json!({ "op": "resetToCommit", "commitId": c1_id }));
        assert_eq!(reset["commits"].as_array().unwrap().len(), 1);

        let cloned = call(
            &mut service,
            json!({ "op": "cloneBranch", "name": "copy", "fullHistory": true }),
        );
        assert_eq!(cloned["branch"]["name"], "copy");
        assert_ne!(cloned["branch"]["headId"], c1_id);
        assert_eq!(service.engine().commits().len(), 2);
    }

    #[test]
    fn test_stage_request() {
        let mut service = Service::in_memory();
        let out = call(&mut service, json!({ "op": "stage", "tree": tree("A") }));
        assert_eq!(out["staged"][0]["title"], "A");
        assert_eq!(service.engine().staged().unwrap().len(), 1);
    }

    #[test]
    fn test_request_wire_names() {
        let request: Request = serde_json::from_value(json!({
            "op": "createBranch",
            "name": "b",
            "fromCommitId": "c1"
        }))
        .unwrap();
        assert_eq!(
            request,
            Request::CreateBranch {
                name: "b".into(),
                from_commit_id: Some(CommitId::new("c1").unwrap()),
                checkout: false,
            }
        );
        assert!(request.is_mutating());
        assert!(!Request::ListBranches.is_mutating());
        assert_eq!(request.op(), "createBranch");
    }

    #[test]
    fn test_autosave_persists_across_open() {
        let dir = TempDir::new().unwrap();
        let config = ServiceConfig::default().data_dir(dir.path()).document("doc");

        let mut service = Service::open(config.clone()).unwrap();
        call(&mut service, json!({ "op": "commit", "message": "c1", "tree": tree("A") }));
        call(&mut service, json!({ "op": "createBranch", "name": "feature" }));

        let reopened = Service::open(config).unwrap();
        assert_eq!(reopened.engine().commits().len(), 1);
        assert_eq!(reopened.engine().list_branches().len(), 2);
        assert_eq!(reopened.engine().get_head().unwrap().message, "c1");
    }

    #[test]
    fn test_no_autosave() {
        let dir = TempDir::new().unwrap();
        let config = ServiceConfig::default()
            .data_dir(dir.path())
            .autosave(false);

        let mut service = Service::open(config.clone()).unwrap();
        call(&mut service, json!({ "op": "commit", "message": "c1", "tree": tree("A") }));
        assert!(Service::open(config.clone()).unwrap().engine().commits().is_empty());

        service.save().unwrap();
        assert_eq!(Service::open(config).unwrap().engine().commits().len(), 1);
    }

    #[test]
    fn test_open_with_custom_branch_name() {
        let config = ServiceConfig::in_memory().default_branch_name("main");
        let service = Service::open(config).unwrap();
        assert_eq!(service.engine().current_branch().unwrap().name.as_str(), "main");

        let bad = ServiceConfig::in_memory().default_branch_name("");
        assert!(matches!(Service::open(bad), Err(ApiError::Storage(_))));
    }
}
