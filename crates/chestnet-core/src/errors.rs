//! Unified error system for chestnet
//!
//! A single error type shared by the codec, the chunked store, the registry and
//! the transfer engine. Every failure a caller can present to a user maps onto
//! one variant, so flows can show a short message and stay consistent.

use serde::{Deserialize, Serialize};

/// Unified error type for all chestnet operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ChestnetError {
    /// Referenced network or container does not exist
    #[error("Not found: {message}")]
    NotFound {
        /// What was looked up
        message: String,
    },

    /// A network with the derived id already exists
    #[error("Already exists: {message}")]
    AlreadyExists {
        /// The colliding identifier
        message: String,
    },

    /// A rename would collide with a different network
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the collision
        message: String,
    },

    /// Access gate rejected the password attempt
    #[error("Denied: {message}")]
    Denied {
        /// Which network refused access
        message: String,
    },

    /// Persisted or external data could not be decoded
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the malformed input
        message: String,
    },

    /// A bounded collection or destination is full
    #[error("Capacity exceeded: {message}")]
    CapacityExceeded {
        /// What ran out of room
        message: String,
    },

    /// Underlying record store failed
    #[error("Storage error: {message}")]
    Storage {
        /// Error reported by the storage handler
        message: String,
    },

    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },
}

impl ChestnetError {
    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an already exists error
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists {
            message: message.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a denied error
    pub fn denied(message: impl Into<String>) -> Self {
        Self::Denied {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a capacity exceeded error
    pub fn capacity_exceeded(message: impl Into<String>) -> Self {
        Self::CapacityExceeded {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Short label for user-facing messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not found",
            Self::AlreadyExists { .. } => "already exists",
            Self::Conflict { .. } => "conflict",
            Self::Denied { .. } => "wrong password",
            Self::Decode { .. } => "corrupt data",
            Self::CapacityExceeded { .. } => "full",
            Self::Storage { .. } => "storage failure",
            Self::Invalid { .. } => "invalid",
        }
    }
}

/// Standard Result type for chestnet operations
pub type Result<T> = std::result::Result<T, ChestnetError>;

impl From<std::io::Error> for ChestnetError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::storage(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for ChestnetError {
    fn from(err: toml::de::Error) -> Self {
        Self::invalid(format!("Invalid TOML: {err}"))
    }
}
