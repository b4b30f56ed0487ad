//! Terraform harness errors

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while driving Terraform
#[derive(Debug, Error)]
pub enum TerraformError {
    /// Workspace file or process I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A terraform command exited unsuccessfully
    #[error("terraform {operation} failed: {message}")]
    Command {
        /// Operation that failed (init, refresh, plan, apply, destroy)
        operation: String,
        /// Error diagnostics reported by Terraform
        message: String,
    },

    /// A terraform command did not finish in time
    #[error("terraform {0} timed out after {1:?}")]
    Timeout(String, Duration),

    /// Terraform output or state was not what the harness expected
    #[error("Invalid Terraform state: {0}")]
    InvalidState(String),
}
