//! Transfers never create or destroy items

use chestnet_core::ItemType;
use chestnet_transfer::{Inventory, ItemStack, SlotInventory, TransferEngine};
use proptest::prelude::*;
use std::collections::BTreeMap;

const ITEMS: [&str; 3] = ["minecraft:iron_ingot", "minecraft:coal", "minecraft:ender_pearl"];

fn stack_strategy() -> impl Strategy<Value = Option<ItemStack>> {
    prop::option::of((0..ITEMS.len(), 1u32..=64).prop_map(|(item, count)| {
        let max_stack = if ITEMS[item] == "minecraft:ender_pearl" { 16 } else { 64 };
        ItemStack::new(ITEMS[item], count.min(max_stack), max_stack)
    }))
}

fn inventory_strategy() -> impl Strategy<Value = SlotInventory> {
    prop::collection::vec(stack_strategy(), 1..8).prop_map(SlotInventory::from_slots)
}

fn combined(a: &SlotInventory, b: &SlotInventory) -> BTreeMap<ItemType, u64> {
    let mut totals = a.totals();
    for (item, count) in b.totals() {
        *totals.entry(item).or_insert(0) += count;
    }
    totals
}

fn stacks_within_limits(inv: &SlotInventory) -> bool {
    inv.slots()
        .iter()
        .flatten()
        .all(|s| s.count > 0 && s.count <= s.max_stack)
}

proptest! {
    #[test]
    fn move_slot_conserves_items(
        mut from in inventory_strategy(),
        mut to in inventory_strategy(),
        slot in 0usize..8,
        quantity in 0u32..100,
    ) {
        let before = combined(&from, &to);
        let source_count = from.slot(slot).map_or(0, |s| s.count);

        let moved = TransferEngine::move_slot(&mut from, slot, &mut to, quantity);

        prop_assert!(moved <= quantity.min(source_count));
        prop_assert_eq!(combined(&from, &to), before);
        prop_assert!(stacks_within_limits(&from));
        prop_assert!(stacks_within_limits(&to));
    }

    #[test]
    fn move_all_conserves_items(
        mut from in inventory_strategy(),
        mut to in inventory_strategy(),
    ) {
        let before = combined(&from, &to);
        let occupied = from.slots().iter().flatten().count();

        let emptied = TransferEngine::move_all(&mut from, &mut to);

        prop_assert!(emptied <= occupied);
        prop_assert_eq!(from.slots().iter().flatten().count(), occupied - emptied);
        prop_assert_eq!(combined(&from, &to), before);
        prop_assert!(stacks_within_limits(&to));
    }

    #[test]
    fn capacity_matches_what_fits(
        mut to in inventory_strategy(),
        item in 0..ITEMS.len(),
    ) {
        let max_stack = if ITEMS[item] == "minecraft:ender_pearl" { 16 } else { 64 };
        let item_type = ItemType::new(ITEMS[item]);
        let capacity = TransferEngine::capacity_for(&to, &item_type, max_stack);

        let mut source = SlotInventory::from_slots(vec![
            Some(ItemStack::new(ITEMS[item], max_stack, max_stack));
            10
        ]);
        let moved = TransferEngine::move_item(&mut source, &item_type, u32::MAX, &mut to);

        prop_assert_eq!(u64::from(moved), capacity.min(u64::from(max_stack) * 10));
    }
}
