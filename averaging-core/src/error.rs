// averaging-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AveragingError {

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Communication error: {message}")]
    Communication {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Parameter buffer length mismatch (expected {expected}, got {got})")]
    Shape {
        expected: usize,
        got: usize,
    },

    #[error("Process group registry error: {message}")]
    Registry {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, AveragingError>;

// Convenience constructors
impl AveragingError {

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication {
            message: message.into(),
            source: None,
        }
    }

    pub fn communication_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Communication {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn shape(expected: usize, got: usize) -> Self {
        Self::Shape { expected, got }
    }

    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry {
            message: message.into(),
        }
    }
}
