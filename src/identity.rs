//! Copyright owner identities used in destination paths

use crate::error::{Error, Result};
use std::fmt;

/// Identifier of the copyright owner of imported media.
///
/// Used as a directory name below each event directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(Error::Config("Owner id must not be empty".into()));
        }
        if trimmed == "." || trimmed == ".." || trimmed.contains(['/', '\\']) {
            return Err(Error::Config(format!(
                "Owner id '{}' cannot be used as a directory name",
                id
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
