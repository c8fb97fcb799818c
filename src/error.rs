//! Error types for the wire-plan compiler

use thiserror::Error;

use crate::analyze::Diagnostics;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;

/// Compiler errors
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("duplicate declaration of type '{name}' in module '{module}'")]
    DuplicateType { module: String, name: String },

    /// One or more fatal diagnostics were recorded. No plan reaches the
    /// emitter when this is returned.
    #[error("compilation failed with {} fatal diagnostic(s)\n{diagnostics}", diagnostics.error_count())]
    Failed { diagnostics: Diagnostics },
}

impl CompileError {
    /// The diagnostics that caused the failure, when available
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            CompileError::Failed { diagnostics } => Some(diagnostics),
            _ => None,
        }
    }
}
