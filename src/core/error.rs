//! Error taxonomy for compiling and running pipes

use crate::core::item::PathNotFound;
use thiserror::Error;

/// Result type for pipe operations
pub type PipeResult<T> = Result<T, PipeError>;

/// Errors raised while compiling or pulling a pipe
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipeError {
    /// Malformed or incomplete pipe graph
    #[error("invalid pipe definition: {0}")]
    Definition(String),

    /// The definition document could not be decoded
    #[error("failed to decode pipe definition: {0}")]
    Decode(String),

    /// A referenced sub-pipe is unknown to the pipe store
    #[error("pipe '{0}' not found")]
    PipeNotFound(String),

    /// The wiring of one pipe contains a cycle
    #[error("cycle detected in wiring of pipe '{pipe}' involving module '{module}'")]
    Cycle { pipe: String, module: String },

    /// A pipe embeds itself, directly or transitively
    #[error("cyclic sub-pipe reference: {}", chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    /// Sub-pipe nesting went deeper than allowed
    #[error("sub-pipe nesting exceeds {limit} levels at pipe '{pipe}'")]
    RecursionLimit { pipe: String, limit: usize },

    /// A module's parameters are invalid
    #[error("invalid config for module {module}: {message}")]
    ModuleConfig { module: String, message: String },

    /// An external source failed
    #[error("source error in module {module}: {message}")]
    Source { module: String, message: String },

    /// One iteration of a loop module failed
    #[error("loop module {module} failed on item {index}: {source}")]
    LoopItem {
        module: String,
        index: usize,
        #[source]
        source: Box<PipeError>,
    },

    #[error(transparent)]
    PathNotFound(#[from] PathNotFound),
}

impl PipeError {
    pub fn definition(message: impl Into<String>) -> Self {
        PipeError::Definition(message.into())
    }

    pub fn module_config(module: &str, message: impl Into<String>) -> Self {
        PipeError::ModuleConfig {
            module: module.to_string(),
            message: message.into(),
        }
    }

    pub fn source_failed(module: &str, message: impl Into<String>) -> Self {
        PipeError::Source {
            module: module.to_string(),
            message: message.into(),
        }
    }

    /// Whether the error is structural, i.e. raised before any item exists
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            PipeError::Definition(_)
                | PipeError::Decode(_)
                | PipeError::PipeNotFound(_)
                | PipeError::Cycle { .. }
                | PipeError::CyclicReference { .. }
                | PipeError::RecursionLimit { .. }
        )
    }
}
