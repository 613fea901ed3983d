//! # Chestnet Transfer - Moving Items
//!
//! **Purpose**: Slot-level item moves and the network-wide views built on
//! them.
//!
//! # Architecture Constraints
//!
//! - YES Inventory and world lookup traits implemented by the host
//! - YES Conserving moves (items are never created or destroyed)
//! - YES Aggregation over Output containers only
//! - NO binding changes (that's chestnet-registry)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Network aggregation and withdrawal
pub mod aggregation;

/// Inventory model and world lookup
pub mod inventory;

/// Item transfer primitives
pub mod transfer;

pub use aggregation::AggregationEngine;
pub use inventory::{Inventory, ItemStack, MemoryWorld, SlotInventory, World};
pub use transfer::TransferEngine;
