//! Access gate for password-protected networks
//!
//! Consulted once by every mutating registry operation before it touches
//! state. Passwords are stored and compared as plaintext for compatibility
//! with existing saves; the comparison itself is constant-time.

use subtle::ConstantTimeEq;

use chestnet_core::{ChestnetError, Result};

use crate::model::NetworkDefinition;

/// Outcome of a gate check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The network is open
    Open,
    /// The attempt matched the password
    Granted,
    /// The attempt was missing or wrong
    Deny(String),
}

impl AccessDecision {
    /// Check if access is allowed
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Deny(_))
    }

    /// Get denial reason if denied
    pub fn denial_reason(&self) -> Option<&str> {
        match self {
            Self::Deny(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Password check for network mutations
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGate;

impl AccessGate {
    /// Decide whether `attempt` unlocks `definition`
    pub fn check(definition: &NetworkDefinition, attempt: Option<&str>) -> AccessDecision {
        let Some(password) = definition.password.as_deref() else {
            return AccessDecision::Open;
        };
        match attempt {
            None => AccessDecision::Deny(format!("{} requires a password", definition.id)),
            Some(attempt) if bool::from(password.as_bytes().ct_eq(attempt.as_bytes())) => {
                AccessDecision::Granted
            }
            Some(_) => AccessDecision::Deny(format!("wrong password for {}", definition.id)),
        }
    }

    /// Whether `attempt` unlocks `definition`
    ///
    /// Networks without a password accept anything, including no attempt.
    pub fn verify(definition: &NetworkDefinition, attempt: Option<&str>) -> bool {
        Self::check(definition, attempt).is_allowed()
    }

    /// Like [`verify`](Self::verify), as a `Denied` error
    pub fn authorize(definition: &NetworkDefinition, attempt: Option<&str>) -> Result<()> {
        match Self::check(definition, attempt) {
            AccessDecision::Deny(reason) => {
                tracing::warn!(network = %definition.id, "access denied");
                Err(ChestnetError::denied(reason))
            }
            _ => Ok(()),
        }
    }
}
