use thiserror::Error;

/// Failures that stop a pass (and the run) outright.
///
/// Per-item failures are not represented here; they are collected as
/// [`ErrorRecord`](crate::migration::errors::ErrorRecord)s and reported after the pass.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("transport failure on {path}: {message}")]
    Transport { path: String, message: String },

    #[error("refusing to modify the protected source environment: {0}")]
    ProtectionViolation(String),
}

impl MigrationError {
    pub fn transport(path: &str, message: impl Into<String>) -> Self {
        MigrationError::Transport {
            path: path.to_string(),
            message: message.into(),
        }
    }
}
