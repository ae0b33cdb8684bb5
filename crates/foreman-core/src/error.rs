//! Error types for Foreman Core.

use crate::storage::StorageError;
use crate::workflow::orchestrator::OrchestratorError;
use crate::workflow::step::StepError;
use thiserror::Error;

/// Core error type for Foreman operations.
#[derive(Error, Debug)]
pub enum ForemanError {
    /// Orchestration errors
    #[error("Orchestration error: {0}")]
    Orchestration(#[from] OrchestratorError),

    /// Step execution errors
    #[error("Step error: {0}")]
    Step(#[from] StepError),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Model validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Foreman operations.
pub type Result<T> = std::result::Result<T, ForemanError>;
