//! # Chestnet Core - Foundation
//!
//! **Purpose**: Value types, key codec, unified errors and configuration shared
//! by every chestnet crate.
//!
//! # Architecture Constraints
//!
//! - YES Identifier value types (`ContainerKey`, `NetworkId`, `ColorTag`, `ItemType`)
//! - YES Reversible string encodings for keys and free-form fields
//! - YES Unified error type
//! - NO persistence (that's chestnet-store)
//! - NO registry invariants (that's chestnet-registry)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Container key and network id encodings
pub mod codec;

/// Configuration loading and validation
pub mod config;

/// Unified error types
pub mod errors;

/// Identifier value types
pub mod identifiers;

pub use codec::{
    check_container_key, decode_container_key, encode_container_key, encode_network_id,
    percent_decode, percent_decode_lenient, percent_encode, slugify, UNNAMED_SLUG,
};
pub use config::{ChestnetConfig, DecodeFailurePolicy, StorageConfig, TokenConfig};
pub use errors::{ChestnetError, Result};
pub use identifiers::{ColorTag, ContainerKey, ItemType, NetworkId, Role};
