//! Error types for the bridge.
//!
//! Each collaborator owns its error enum ([`ConfigurationError`], [`EngineError`],
//! [`MessagingError`]); [`BridgeError`] is the top-level type surfaced by the
//! supervisor and the binaries.

use thiserror::Error;

use crate::camunda::EngineError;
use crate::config::ConfigurationError;
use crate::messaging::MessagingError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Initialization failed during {stage}: {message}")]
    Initialization { stage: String, message: String },

    #[error("Worker supervisor has not been initialized")]
    NotInitialized,

    #[error("Worker supervisor has already been started")]
    AlreadyStarted,

    #[error("Worker supervisor has been shut down")]
    ShutDown,
}

impl BridgeError {
    /// Create an initialization error for the given startup stage
    pub fn initialization(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Initialization {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
