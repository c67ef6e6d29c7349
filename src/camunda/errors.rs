//! # Engine Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine request failed: {operation}: {message}")]
    Transport { operation: String, message: String },

    #[error("Engine returned HTTP {status} for {operation}: {body}")]
    Http {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode engine response for {operation}: {message}")]
    Decode { operation: String, message: String },

    #[error("Engine client configuration error: {message}")]
    Configuration { message: String },
}

impl EngineError {
    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn http(operation: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            operation: operation.into(),
            status,
            body: body.into(),
        }
    }

    pub fn decode(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Network-level failures worth retrying after backoff
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Decode { .. } | Self::Configuration { .. } => false,
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(EngineError::transport("fetchAndLock", "connection reset").is_transient());
        assert!(EngineError::http("fetchAndLock", 503, "").is_transient());
        assert!(!EngineError::http("failure", 404, "task not found").is_transient());
        assert!(!EngineError::decode("fetchAndLock", "expected array").is_transient());
    }

    #[test]
    fn test_http_error_display() {
        let err = EngineError::http("fetchAndLock", 500, "boom");
        assert_eq!(
            err.to_string(),
            "Engine returned HTTP 500 for fetchAndLock: boom"
        );
    }
}
