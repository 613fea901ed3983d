//! Inventory model
//!
//! Containers and personal inventories are both a fixed number of optional
//! slots. The host world is reached through [`World`], which may report a
//! bound container as gone at any time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use chestnet_core::{ContainerKey, ItemType};

/// A quantity of one item type occupying a slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    /// Item type
    pub item: ItemType,
    /// Units in the slot
    pub count: u32,
    /// Most units one slot may hold for this item
    pub max_stack: u32,
}

impl ItemStack {
    /// Create a stack; `max_stack` is at least 1
    pub fn new(item: impl Into<ItemType>, count: u32, max_stack: u32) -> Self {
        Self {
            item: item.into(),
            count,
            max_stack: max_stack.max(1),
        }
    }

    /// Units this slot can still accept
    pub fn room(&self) -> u32 {
        self.max_stack.saturating_sub(self.count)
    }
}

/// Slot-addressed item storage
pub trait Inventory {
    /// Number of slots
    fn slot_count(&self) -> usize;

    /// Contents of a slot, `None` when empty or out of range
    fn slot(&self, index: usize) -> Option<&ItemStack>;

    /// Replace the contents of a slot
    ///
    /// Out-of-range indices are ignored. A zero-count stack empties the slot.
    fn set_slot(&mut self, index: usize, stack: Option<ItemStack>);

    /// Units of `item` held across all slots
    fn count_of(&self, item: &ItemType) -> u64 {
        (0..self.slot_count())
            .filter_map(|i| self.slot(i))
            .filter(|s| &s.item == item)
            .map(|s| u64::from(s.count))
            .sum()
    }

    /// Units held per item type
    fn totals(&self) -> BTreeMap<ItemType, u64> {
        let mut totals = BTreeMap::new();
        for stack in (0..self.slot_count()).filter_map(|i| self.slot(i)) {
            *totals.entry(stack.item.clone()).or_insert(0) += u64::from(stack.count);
        }
        totals
    }
}

/// Vec-backed inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInventory {
    slots: Vec<Option<ItemStack>>,
}

impl SlotInventory {
    /// Create an inventory with `size` empty slots
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
        }
    }

    /// Create an inventory from its slots
    pub fn from_slots(slots: Vec<Option<ItemStack>>) -> Self {
        Self {
            slots: slots
                .into_iter()
                .map(|s| s.filter(|s| s.count > 0))
                .collect(),
        }
    }

    /// All slots, in order
    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }
}

impl Inventory for SlotInventory {
    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, index: usize) -> Option<&ItemStack> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    fn set_slot(&mut self, index: usize, stack: Option<ItemStack>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = stack.filter(|s| s.count > 0);
        }
    }
}

/// Lookup of physical containers by location
pub trait World {
    /// Container at `key`, if it still exists
    fn container(&self, key: &ContainerKey) -> Option<&dyn Inventory>;

    /// Mutable container at `key`, if it still exists
    fn container_mut(&mut self, key: &ContainerKey) -> Option<&mut dyn Inventory>;
}

/// In-memory world of slot inventories
#[derive(Debug, Clone, Default)]
pub struct MemoryWorld {
    containers: BTreeMap<ContainerKey, SlotInventory>,
}

impl MemoryWorld {
    /// Create an empty world
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a container, returning the one it replaced
    pub fn insert(&mut self, key: ContainerKey, inventory: SlotInventory) -> Option<SlotInventory> {
        self.containers.insert(key, inventory)
    }

    /// Break a container
    pub fn remove(&mut self, key: &ContainerKey) -> Option<SlotInventory> {
        self.containers.remove(key)
    }

    /// Concrete container at `key`
    pub fn get(&self, key: &ContainerKey) -> Option<&SlotInventory> {
        self.containers.get(key)
    }
}

impl World for MemoryWorld {
    fn container(&self, key: &ContainerKey) -> Option<&dyn Inventory> {
        self.containers.get(key).map(|c| c as &dyn Inventory)
    }

    fn container_mut(&mut self, key: &ContainerKey) -> Option<&mut dyn Inventory> {
        self.containers
            .get_mut(key)
            .map(|c| c as &mut dyn Inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_count_empties_slot() {
        let mut inv = SlotInventory::new(2);
        inv.set_slot(0, Some(ItemStack::new("minecraft:iron_ingot", 0, 64)));
        assert!(inv.slot(0).is_none());

        inv.set_slot(5, Some(ItemStack::new("minecraft:iron_ingot", 1, 64)));
        assert_eq!(inv.totals().len(), 0);
    }

    #[test]
    fn test_totals_and_count() {
        let iron = ItemType::new("minecraft:iron_ingot");
        let inv = SlotInventory::from_slots(vec![
            Some(ItemStack::new("minecraft:iron_ingot", 10, 64)),
            None,
            Some(ItemStack::new("minecraft:coal", 3, 64)),
            Some(ItemStack::new("minecraft:iron_ingot", 64, 64)),
        ]);
        assert_eq!(inv.count_of(&iron), 74);
        assert_eq!(inv.totals()[&ItemType::new("minecraft:coal")], 3);
    }

    #[test]
    fn test_removed_container_is_gone() {
        let key = ContainerKey::new("minecraft:overworld", 0, 64, 0);
        let mut world = MemoryWorld::new();
        world.insert(key.clone(), SlotInventory::new(27));
        assert!(world.container(&key).is_some());
        world.remove(&key);
        assert!(world.container_mut(&key).is_none());
    }
}
