//! Error types for engine operations.

use crate::types::RequestId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not the owner of {0}")]
    Ownership(String),

    #[error("Request {0} is no longer pending")]
    AlreadyDecided(RequestId),

    #[error("No candidate window has remaining capacity")]
    SlotConflict,
}

pub type Result<T> = std::result::Result<T, EngineError>;
