//! Fixed-capacity game state: flags, variables and inventory.
//!
//! Each table also knows how many ids the installed level declares. Ids past
//! that count read as zero/false and writes to them are dropped with a
//! warning, so a damaged script can never touch state the level did not ask
//! for.

pub const MAX_FLAGS: usize = 256;
pub const MAX_VARS: usize = 64;
pub const INVENTORY_SLOTS: usize = 8;

/// 256 boolean flags packed into bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagBits {
    bits: [u8; MAX_FLAGS / 8],
    declared: usize,
}

impl FlagBits {
    pub fn new(declared: u8) -> Self {
        Self {
            bits: [0; MAX_FLAGS / 8],
            declared: declared as usize,
        }
    }

    pub fn get(&self, id: u8) -> bool {
        let id = id as usize;
        id < self.declared && self.bits[id / 8] & (1 << (id % 8)) != 0
    }

    pub fn set(&mut self, id: u8, on: bool) {
        let idx = id as usize;
        if idx >= self.declared {
            log::warn!("flag {id} out of range (level declares {})", self.declared);
            return;
        }
        let mask = 1 << (idx % 8);
        if on {
            self.bits[idx / 8] |= mask;
        } else {
            self.bits[idx / 8] &= !mask;
        }
    }
}

/// Byte-sized variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarTable {
    values: [u8; MAX_VARS],
    declared: usize,
}

impl VarTable {
    pub fn new(declared: u8) -> Self {
        Self {
            values: [0; MAX_VARS],
            declared: (declared as usize).min(MAX_VARS),
        }
    }

    pub fn get(&self, id: u8) -> u8 {
        let id = id as usize;
        if id < self.declared { self.values[id] } else { 0 }
    }

    pub fn set(&mut self, id: u8, value: u8) {
        let idx = id as usize;
        if idx >= self.declared {
            log::warn!("var {id} out of range (level declares {})", self.declared);
            return;
        }
        self.values[idx] = value;
    }
}

/// Result of [`Inventory::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyHeld,
    /// No free slot; the item was dropped.
    Full,
}

/// Unordered set of at most eight item ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    slots: [u8; INVENTORY_SLOTS],
    len: usize,
}

impl Inventory {
    pub fn contains(&self, item: u8) -> bool {
        self.items().contains(&item)
    }

    pub fn add(&mut self, item: u8) -> AddOutcome {
        if self.contains(item) {
            return AddOutcome::AlreadyHeld;
        }
        if self.len == INVENTORY_SLOTS {
            log::warn!("inventory full; item {item} dropped");
            return AddOutcome::Full;
        }
        self.slots[self.len] = item;
        self.len += 1;
        AddOutcome::Added
    }

    /// Remove `item`; returns whether it was held.
    pub fn remove(&mut self, item: u8) -> bool {
        let Some(pos) = self.items().iter().position(|&i| i == item) else {
            return false;
        };
        self.slots.copy_within(pos + 1..self.len, pos);
        self.len -= 1;
        true
    }

    pub fn items(&self) -> &[u8] {
        &self.slots[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Everything scripts can read or change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub flags: FlagBits,
    pub vars: VarTable,
    pub inventory: Inventory,
    item_count: u8,
}

impl GameState {
    pub fn new(flag_count: u8, var_count: u8, item_count: u8) -> Self {
        Self {
            flags: FlagBits::new(flag_count),
            vars: VarTable::new(var_count),
            inventory: Inventory::default(),
            item_count,
        }
    }

    /// Start a new level: flags and vars reset, inventory is kept.
    pub fn reset_for_level(&mut self, flag_count: u8, var_count: u8, item_count: u8) {
        self.flags = FlagBits::new(flag_count);
        self.vars = VarTable::new(var_count);
        self.item_count = item_count;
    }

    pub fn has_item(&self, item: u8) -> bool {
        item < self.item_count && self.inventory.contains(item)
    }

    pub fn give(&mut self, item: u8) -> Option<AddOutcome> {
        if item >= self.item_count {
            log::warn!("item {item} out of range (level declares {})", self.item_count);
            return None;
        }
        Some(self.inventory.add(item))
    }

    pub fn take(&mut self, item: u8) -> bool {
        self.inventory.remove(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_respect_declared_count() {
        let mut f = FlagBits::new(10);
        f.set(3, true);
        f.set(9, true);
        f.set(10, true);
        assert!(f.get(3) && f.get(9));
        assert!(!f.get(10));
        f.set(3, false);
        assert!(!f.get(3));
    }

    #[test]
    fn full_flag_range() {
        let mut f = FlagBits::new(255);
        f.set(254, true);
        assert!(f.get(254));
        assert!(!f.get(255));
    }

    #[test]
    fn vars_respect_declared_count() {
        let mut v = VarTable::new(2);
        v.set(1, 7);
        v.set(2, 9);
        assert_eq!(v.get(1), 7);
        assert_eq!(v.get(2), 0);
        assert_eq!(VarTable::new(200).declared, MAX_VARS);
    }

    #[test]
    fn inventory_is_a_bounded_set() {
        let mut inv = Inventory::default();
        assert_eq!(inv.add(4), AddOutcome::Added);
        assert_eq!(inv.add(4), AddOutcome::AlreadyHeld);
        for item in 10..17 {
            assert_eq!(inv.add(item), AddOutcome::Added);
        }
        assert_eq!(inv.len(), INVENTORY_SLOTS);
        assert_eq!(inv.add(99), AddOutcome::Full);
        assert!(!inv.contains(99));

        assert!(inv.remove(4));
        assert!(!inv.remove(4));
        assert_eq!(inv.items(), &[10, 11, 12, 13, 14, 15, 16]);
        assert_eq!(inv.add(99), AddOutcome::Added);
    }

    #[test]
    fn reset_keeps_inventory() {
        let mut s = GameState::new(4, 4, 4);
        s.flags.set(1, true);
        s.vars.set(2, 5);
        s.give(3);
        s.reset_for_level(4, 4, 4);
        assert!(!s.flags.get(1));
        assert_eq!(s.vars.get(2), 0);
        assert!(s.has_item(3));
    }

    #[test]
    fn undeclared_items() {
        let mut s = GameState::new(0, 0, 2);
        assert_eq!(s.give(2), None);
        assert_eq!(s.give(1), Some(AddOutcome::Added));
        assert!(!s.has_item(2));
    }
}
