//! Item transfer between inventories
//!
//! Moves never create or destroy items: whatever the destination cannot
//! accept stays in the source slot it came from.

use chestnet_core::{ChestnetError, ContainerKey, ItemType, Result};

use crate::inventory::{Inventory, ItemStack, World};

/// Slot-level move primitives
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferEngine;

impl TransferEngine {
    /// Move up to `quantity` units out of `from[slot]` into `to`
    ///
    /// Partial stacks of the same item are topped up first, then empty slots
    /// are filled. Returns the number of units moved.
    pub fn move_slot(
        from: &mut dyn Inventory,
        slot: usize,
        to: &mut dyn Inventory,
        quantity: u32,
    ) -> u32 {
        let Some(source) = from.slot(slot).cloned() else {
            return 0;
        };
        let wanted = quantity.min(source.count);
        if wanted == 0 {
            return 0;
        }

        let placed = place(to, &source.item, source.max_stack, wanted);
        let remaining = source.count - placed;
        from.set_slot(
            slot,
            (remaining > 0).then(|| ItemStack {
                count: remaining,
                ..source
            }),
        );
        placed
    }

    /// Move every occupied slot of `from` into `to`, in slot order
    ///
    /// Returns the number of slots that were fully emptied.
    pub fn move_all(from: &mut dyn Inventory, to: &mut dyn Inventory) -> usize {
        let mut emptied = 0;
        for slot in 0..from.slot_count() {
            let Some(count) = from.slot(slot).map(|s| s.count) else {
                continue;
            };
            Self::move_slot(from, slot, to, count);
            if from.slot(slot).is_none() {
                emptied += 1;
            }
        }
        tracing::debug!(emptied, "moved all slots");
        emptied
    }

    /// Move up to `quantity` units of `item` from any slots of `from`
    ///
    /// Stops once the destination refuses more.
    pub fn move_item(
        from: &mut dyn Inventory,
        item: &ItemType,
        quantity: u32,
        to: &mut dyn Inventory,
    ) -> u32 {
        let mut moved = 0;
        for slot in 0..from.slot_count() {
            if moved >= quantity {
                break;
            }
            if from.slot(slot).map(|s| &s.item) != Some(item) {
                continue;
            }
            let wanted = quantity - moved;
            let available = from.slot(slot).map_or(0, |s| s.count);
            let placed = Self::move_slot(from, slot, to, wanted);
            moved += placed;
            if placed < wanted.min(available) {
                break;
            }
        }
        moved
    }

    /// How many more units of `item` the inventory accepts
    ///
    /// `max_stack` applies to empty slots; occupied slots use their own limit.
    pub fn capacity_for(inventory: &dyn Inventory, item: &ItemType, max_stack: u32) -> u64 {
        (0..inventory.slot_count())
            .map(|i| match inventory.slot(i) {
                None => u64::from(max_stack.max(1)),
                Some(stack) if &stack.item == item => u64::from(stack.room()),
                Some(_) => 0,
            })
            .sum()
    }

    /// Move from a personal inventory slot into the container at `key`
    pub fn import<W: World + ?Sized>(
        world: &mut W,
        key: &ContainerKey,
        from: &mut dyn Inventory,
        slot: usize,
        quantity: u32,
    ) -> Result<u32> {
        let container = world
            .container_mut(key)
            .ok_or_else(|| ChestnetError::not_found(format!("container at {key}")))?;
        let moved = Self::move_slot(from, slot, container, quantity);
        tracing::debug!(container = %key, slot, moved, "imported into container");
        Ok(moved)
    }

    /// Move from a slot of the container at `key` into a personal inventory
    pub fn export<W: World + ?Sized>(
        world: &mut W,
        key: &ContainerKey,
        slot: usize,
        to: &mut dyn Inventory,
        quantity: u32,
    ) -> Result<u32> {
        let container = world
            .container_mut(key)
            .ok_or_else(|| ChestnetError::not_found(format!("container at {key}")))?;
        let moved = Self::move_slot(container, slot, to, quantity);
        tracing::debug!(container = %key, slot, moved, "exported from container");
        Ok(moved)
    }
}

/// Put up to `amount` units into `to`, returning how many fit
fn place(to: &mut dyn Inventory, item: &ItemType, max_stack: u32, amount: u32) -> u32 {
    let mut left = amount;

    for slot in 0..to.slot_count() {
        if left == 0 {
            return amount;
        }
        let Some(existing) = to.slot(slot).filter(|s| &s.item == item && s.room() > 0) else {
            continue;
        };
        let add = existing.room().min(left);
        let topped = ItemStack {
            count: existing.count + add,
            ..existing.clone()
        };
        to.set_slot(slot, Some(topped));
        left -= add;
    }

    for slot in 0..to.slot_count() {
        if left == 0 {
            break;
        }
        if to.slot(slot).is_some() {
            continue;
        }
        let add = max_stack.max(1).min(left);
        to.set_slot(slot, Some(ItemStack::new(item.clone(), add, max_stack)));
        left -= add;
    }

    amount - left
}
