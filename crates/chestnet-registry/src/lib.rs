//! # Chestnet Registry - Networks and Bindings
//!
//! **Purpose**: The authoritative catalogue of named networks and the role
//! each physical container plays in them.
//!
//! # Architecture Constraints
//!
//! - YES Network lifecycle (create, edit with rename migration, cascading delete)
//! - YES Container role exclusivity (input or output, never both)
//! - YES Password gate consulted by every gated mutation
//! - YES Remote tokens resolved against the live registry
//! - NO item movement (that's chestnet-transfer)
//! - NO record-size concerns (that's chestnet-store)
//!
//! Every successful mutation has been written through the store before it
//! returns. A failed write leaves the in-memory registry untouched.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Password check for network mutations
pub mod gate;

/// Networks, bindings and registry state
pub mod model;

/// Persisted record format
pub mod records;

/// The network registry
pub mod registry;

/// Portable container lists
pub mod token;

pub use gate::{AccessDecision, AccessGate};
pub use model::{Binding, ContainerBinding, NetworkDefinition, PasswordUpdate, RegistryState};
pub use records::{decode_state, encode_state};
pub use registry::{LoadOutcome, NetworkRegistry};
pub use token::{RemoteToken, ResolvedEntry, TokenEntry};
