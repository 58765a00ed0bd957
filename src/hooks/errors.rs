//! Error handling for the hook broker

use std::error::Error;
use std::fmt;

/// Result type for hook operations
pub type HookResult<T> = Result<T, HookError>;

/// Hook broker error types
#[derive(Debug)]
pub enum HookError {
    /// The callback cannot be resolved to a function, bound method or static method
    InvalidCallbackKind(String),

    /// Two different callback identities derived the same registration id
    RegistrationConflict {
        tag: String,
        priority: i32,
        id: String,
    },

    /// A callback signalled an error
    ExecutionFailed {
        handler: String,
        source: Box<dyn Error + Send + Sync>,
    },

    /// Invalid configuration
    InvalidConfiguration(String),

    /// Serialization/deserialization error
    SerializationError(serde_json::Error),

    /// IO error
    IoError(std::io::Error),

    /// Custom error
    Custom(String),
}

impl HookError {
    /// Create an invalid callback error
    pub fn invalid_callback(message: impl Into<String>) -> Self {
        Self::InvalidCallbackKind(message.into())
    }

    /// Create a registration conflict error
    pub fn conflict(tag: impl Into<String>, priority: i32, id: impl Into<String>) -> Self {
        Self::RegistrationConflict {
            tag: tag.into(),
            priority,
            id: id.into(),
        }
    }

    /// Create an execution failed error
    pub fn execution_failed(
        handler: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::ExecutionFailed {
            handler: handler.into(),
            source: source.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Create a custom error
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCallbackKind(msg) => write!(f, "Invalid callback: {}", msg),
            Self::RegistrationConflict { tag, priority, id } => write!(
                f,
                "Registration conflict on '{}' at priority {}: id '{}' already belongs to another callback",
                tag, priority, id
            ),
            Self::ExecutionFailed { handler, source } => {
                write!(f, "Hook callback '{}' failed: {}", handler, source)
            }
            Self::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Self::SerializationError(e) => write!(f, "Serialization error: {}", e),
            Self::IoError(e) => write!(f, "IO error: {}", e),
            Self::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl Error for HookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ExecutionFailed { source, .. } => Some(source.as_ref() as &(dyn Error + 'static)),
            Self::SerializationError(e) => Some(e),
            Self::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for HookError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError(error)
    }
}

impl From<std::io::Error> for HookError {
    fn from(error: std::io::Error) -> Self {
        Self::IoError(error)
    }
}

impl From<toml::de::Error> for HookError {
    fn from(error: toml::de::Error) -> Self {
        Self::InvalidConfiguration(error.to_string())
    }
}
