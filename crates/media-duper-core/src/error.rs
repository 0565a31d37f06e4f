use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cannot decode '{}': {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("Action failed: {0}")]
    Action(#[from] ActionError),

    #[error("Scan cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Failures of the fingerprint store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("'{path}' already has a distinct record")]
    Conflict { path: String },

    #[error("Store lock poisoned")]
    Poisoned,
}

/// A delete or move that could not be carried out. Files and records are left as they were.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Failed to delete '{}': {source}", .path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to move '{}' to '{}': {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No relocation directory configured, cannot move '{}'", .path.display())]
    NoDestination { path: PathBuf },

    #[error("Cannot move '{}' to '{}': {source}", .from.display(), .to.display())]
    Conflict {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: StoreError,
    },
}
