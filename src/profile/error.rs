use std::path::PathBuf;

use thiserror::Error;

/// Failures loading, saving or generating a security profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("cannot read security profile {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("security profile {} is not valid JSON: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize security profile: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("cannot analyze project {}: {reason}", dir.display())]
    Analysis { dir: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, ProfileError>;
