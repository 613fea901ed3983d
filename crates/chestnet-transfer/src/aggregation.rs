//! Network aggregation
//!
//! Views a network as one large inventory made of its Output containers.
//! Input containers never contribute: they feed the network, they are not
//! part of its stock.

use std::collections::BTreeMap;

use chestnet_core::{ChestnetError, ContainerKey, ItemType, NetworkId, Result};
use chestnet_registry::NetworkRegistry;
use chestnet_store::RecordStore;

use crate::inventory::{Inventory, World};
use crate::transfer::TransferEngine;

/// Consolidated reads and withdrawals over a network's Output containers
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationEngine;

impl AggregationEngine {
    /// Units per item type across every Output container of `network_id`
    ///
    /// Containers that no longer exist contribute nothing.
    pub fn scan<S: RecordStore, W: World + ?Sized>(
        registry: &NetworkRegistry<S>,
        world: &W,
        network_id: &NetworkId,
    ) -> Result<BTreeMap<ItemType, u64>> {
        let mut totals = BTreeMap::new();
        for key in output_containers(registry, network_id)? {
            let Some(container) = world.container(&key) else {
                tracing::debug!(container = %key, network = %network_id, "bound container is missing");
                continue;
            };
            for (item, count) in container.totals() {
                *totals.entry(item).or_insert(0) += count;
            }
        }
        Ok(totals)
    }

    /// Output containers holding `item`, with how much each holds
    pub fn locate<S: RecordStore, W: World + ?Sized>(
        registry: &NetworkRegistry<S>,
        world: &W,
        network_id: &NetworkId,
        item: &ItemType,
    ) -> Result<Vec<(ContainerKey, u64)>> {
        Ok(output_containers(registry, network_id)?
            .into_iter()
            .filter_map(|key| {
                let count = world.container(&key)?.count_of(item);
                (count > 0).then_some((key, count))
            })
            .collect())
    }

    /// Move up to `amount` units of `item` out of the network
    ///
    /// Output containers are drained in key order. Returns the amount moved,
    /// which falls short when the network runs out or `destination` fills up.
    pub fn withdraw<S: RecordStore, W: World + ?Sized>(
        registry: &NetworkRegistry<S>,
        world: &mut W,
        network_id: &NetworkId,
        item: &ItemType,
        amount: u64,
        destination: &mut dyn Inventory,
    ) -> Result<u64> {
        let mut moved = 0u64;
        for key in output_containers(registry, network_id)? {
            if moved >= amount {
                break;
            }
            let Some(container) = world.container_mut(&key) else {
                tracing::debug!(container = %key, network = %network_id, "bound container is missing");
                continue;
            };

            let wanted = u32::try_from(amount - moved).unwrap_or(u32::MAX);
            let got = TransferEngine::move_item(container, item, wanted, destination);
            moved += u64::from(got);
            if got < wanted && container.count_of(item) > 0 {
                // the container still has stock, so the destination is full
                break;
            }
        }

        tracing::debug!(network = %network_id, %item, requested = amount, moved, "withdrew from network");
        Ok(moved)
    }

    /// Spread up to `quantity` units from `source[slot]` over the network
    ///
    /// Output containers are filled in key order. Returns the amount stored;
    /// the rest stays in the source slot.
    pub fn deposit<S: RecordStore, W: World + ?Sized>(
        registry: &NetworkRegistry<S>,
        world: &mut W,
        network_id: &NetworkId,
        source: &mut dyn Inventory,
        slot: usize,
        quantity: u32,
    ) -> Result<u32> {
        let mut stored = 0;
        for key in output_containers(registry, network_id)? {
            if stored >= quantity || source.slot(slot).is_none() {
                break;
            }
            let Some(container) = world.container_mut(&key) else {
                continue;
            };
            stored += TransferEngine::move_slot(source, slot, container, quantity - stored);
        }

        tracing::debug!(network = %network_id, slot, stored, "deposited into network");
        Ok(stored)
    }
}

fn output_containers<S: RecordStore>(
    registry: &NetworkRegistry<S>,
    network_id: &NetworkId,
) -> Result<Vec<ContainerKey>> {
    if registry.resolve(network_id).is_none() {
        return Err(ChestnetError::not_found(format!("network {network_id}")));
    }
    Ok(registry.outputs_of(network_id))
}
