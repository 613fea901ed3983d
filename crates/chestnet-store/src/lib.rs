//! # Chestnet Store - Persistence
//!
//! **Purpose**: The bounded record primitive and the chunking layer that lets
//! arbitrarily long payloads live on top of it.
//!
//! Records are capped in size, so the registry never writes them directly:
//! it hands a whole payload to [`ChunkedStore`], which fragments it on write
//! and reassembles it on read. A backend without a record cap can still be
//! used unchanged.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Chunked payload persistence
pub mod chunked;

/// Record store interface and errors
pub mod effects;

/// Filesystem record store
pub mod filesystem;

/// In-memory record store
pub mod memory;

pub use chunked::ChunkedStore;
pub use effects::{RecordStore, StorageError};
pub use filesystem::FilesystemRecordStore;
pub use memory::MemoryRecordStore;
