use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StowageError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Document codec error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Storage not initialized: {0}")]
    NotInitialized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}
