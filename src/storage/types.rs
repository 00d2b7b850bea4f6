//! core type-safe identifiers and names for the storage layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque commit identifier.
///
/// Generated ids are lowercase ULIDs, but any non-empty string is accepted
/// when an id arrives from a request or a stored document. Commit ids are
/// never derived from content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommitId(String);

impl CommitId {
    /// parse a CommitId from caller input
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidNameError> {
        let id = id.into();
        validate_id(&id)?;
        Ok(Self(id))
    }

    /// generate a fresh ULID-based id
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// short form of the id, for display
    pub fn short(&self) -> &str {
        short(&self.0)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque branch identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BranchId(String);

impl BranchId {
    /// parse a BranchId from caller input
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidNameError> {
        let id = id.into();
        validate_id(&id)?;
        Ok(Self(id))
    }

    /// generate a fresh ULID-based id
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        short(&self.0)
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for BranchId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn validate_id(id: &str) -> Result<(), InvalidNameError> {
    if id.is_empty() {
        return Err(InvalidNameError::Empty);
    }
    if id.len() > 128 {
        return Err(InvalidNameError::TooLong(id.len()));
    }
    if let Some((position, char)) = id.chars().enumerate().find(|(_, c)| c.is_whitespace() || c.is_control()) {
        return Err(InvalidNameError::InvalidCharacter { char, position });
    }
    Ok(())
}

fn short(id: &str) -> &str {
    // ULIDs are ASCII; anything else falls back to the full id
    id.get(..7).unwrap_or(id)
}

/// A validated, human-facing branch name.
///
/// Names are display labels only: two branches may share a name since
/// identity is carried by [`BranchId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchName(String);

impl BranchName {
    /// name given to the branch every fresh engine starts with
    pub const DEFAULT: &'static str = "default";

    const MAX_LEN: usize = 128;

    /// create a new BranchName; surrounding whitespace is trimmed
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        let name = name.trim();

        if name.is_empty() {
            return Err(InvalidNameError::Empty);
        }
        let len = name.chars().count();
        if len > Self::MAX_LEN {
            return Err(InvalidNameError::TooLong(len));
        }
        for (i, c) in name.chars().enumerate() {
            if c.is_control() {
                return Err(InvalidNameError::InvalidCharacter { char: c, position: i });
            }
        }

        Ok(Self(name.to_string()))
    }

    /// the default branch name
    pub fn default_branch() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// error type for invalid names and ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidNameError {
    Empty,
    TooLong(usize),
    InvalidCharacter { char: char, position: usize },
}

impl fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "name cannot be empty"),
            Self::TooLong(len) => write!(f, "name too long: {} characters", len),
            Self::InvalidCharacter { char, position } => {
                write!(f, "invalid character {:?} at position {}", char, position)
            }
        }
    }
}

impl std::error::Error for InvalidNameError {}
