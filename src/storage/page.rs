//! Fixed-size record page.
//!
//! ```text
//! +----------------------+ offset 0
//! | occupancy bitmap (2) |  bit i of the LE u16 set <=> slot i holds a record
//! +----------------------+ offset 2
//! | slot 0 (254)         |
//! | slot 1 (254)         |
//! | ...                  |
//! | slot 15 (254)        |  empty slots are zero-filled
//! +----------------------+ offset 4066
//! | reserved (30)        |  always zero
//! +----------------------+ offset 4096
//! ```
//!
//! The heap organization places records anywhere. The sorted organization
//! keeps occupied slots packed into `0..count` in key order and uses the
//! prefix helpers at the bottom of this file.

use crate::storage::record::{Record, RECORD_SIZE};
use crate::types::{Result, StoreError};

/// Size of every page block in the data file.
pub const PAGE_SIZE: usize = 4096;
/// Number of record slots per page.
pub const SLOTS_PER_PAGE: usize = 16;
/// Bytes taken by the occupancy bitmap.
pub const BITMAP_SIZE: usize = SLOTS_PER_PAGE.div_ceil(8);
/// Trailing bytes left unused after the last slot.
pub const RESERVED_SIZE: usize = PAGE_SIZE - BITMAP_SIZE - SLOTS_PER_PAGE * RECORD_SIZE;

fn bit(slot: usize) -> u16 {
    1 << slot
}

/// In-memory image of one data page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    bitmap: u16,
    slots: [Option<Record>; SLOTS_PER_PAGE],
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    /// Creates an empty page.
    pub fn new() -> Self {
        Self {
            bitmap: 0,
            slots: std::array::from_fn(|_| None),
        }
    }

    fn check_slot(slot: usize) -> Result<()> {
        if slot >= SLOTS_PER_PAGE {
            return Err(StoreError::InvalidSlot(slot));
        }
        Ok(())
    }

    /// Returns whether the bitmap marks `slot` as used.
    pub fn is_slot_used(&self, slot: usize) -> Result<bool> {
        Self::check_slot(slot)?;
        Ok(self.bitmap & bit(slot) != 0)
    }

    /// Sets or clears the bitmap bit for `slot`.
    ///
    /// Clearing a bit also drops the record stored there. Marking an empty
    /// slot used gives it an all-zero record, which is what a decode of the
    /// encoded page would produce.
    pub fn set_slot_used(&mut self, slot: usize, used: bool) -> Result<()> {
        Self::check_slot(slot)?;
        if used {
            self.bitmap |= bit(slot);
            self.slots[slot].get_or_insert_with(Record::zeroed);
        } else {
            self.bitmap &= !bit(slot);
            self.slots[slot] = None;
        }
        Ok(())
    }

    /// Stores `record` in an unused slot.
    pub fn insert(&mut self, slot: usize, record: Record) -> Result<()> {
        if self.is_slot_used(slot)? {
            return Err(StoreError::SlotOccupied(slot));
        }
        self.slots[slot] = Some(record);
        self.bitmap |= bit(slot);
        Ok(())
    }

    /// Removes and returns the record in a used slot.
    pub fn delete(&mut self, slot: usize) -> Result<Record> {
        if !self.is_slot_used(slot)? {
            return Err(StoreError::SlotEmpty(slot));
        }
        self.bitmap &= !bit(slot);
        self.slots[slot]
            .take()
            .ok_or_else(|| StoreError::Corrupt(format!("slot {slot} marked used without a record")))
    }

    /// Borrows the record in a used slot.
    pub fn get(&self, slot: usize) -> Result<&Record> {
        if !self.is_slot_used(slot)? {
            return Err(StoreError::SlotEmpty(slot));
        }
        self.slots[slot]
            .as_ref()
            .ok_or_else(|| StoreError::Corrupt(format!("slot {slot} marked used without a record")))
    }

    /// Number of used slots.
    pub fn record_count(&self) -> usize {
        self.bitmap.count_ones() as usize
    }

    /// Number of unused slots.
    pub fn free_slots(&self) -> usize {
        SLOTS_PER_PAGE - self.record_count()
    }

    /// Returns true when every slot is used.
    pub fn is_full(&self) -> bool {
        self.record_count() == SLOTS_PER_PAGE
    }

    /// Returns true when no slot is used.
    pub fn is_empty(&self) -> bool {
        self.bitmap == 0
    }

    /// Lowest unused slot, first-fit.
    pub fn find_free_slot(&self) -> Option<usize> {
        (0..SLOTS_PER_PAGE).find(|&slot| self.bitmap & bit(slot) == 0)
    }

    /// First used slot (in slot order) holding `key`.
    pub fn find_key(&self, key: i32) -> Option<usize> {
        self.records()
            .find(|(_, record)| record.key() == key)
            .map(|(slot, _)| slot)
    }

    /// Iterates `(slot, record)` over used slots in slot order.
    pub fn records(&self) -> impl Iterator<Item = (usize, &Record)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(slot, _)| self.bitmap & bit(*slot) != 0)
            .filter_map(|(slot, record)| record.as_ref().map(|r| (slot, r)))
    }

    /// Serializes the full [`PAGE_SIZE`] block.
    pub fn encode(&self) -> Box<[u8; PAGE_SIZE]> {
        let mut out = Box::new([0u8; PAGE_SIZE]);
        out[..BITMAP_SIZE].copy_from_slice(&self.bitmap.to_le_bytes());
        for (slot, record) in self.records() {
            let start = BITMAP_SIZE + slot * RECORD_SIZE;
            out[start..start + RECORD_SIZE].copy_from_slice(&record.encode());
        }
        out
    }

    /// Parses a page block.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(StoreError::InvalidSize {
                what: "page",
                expected: PAGE_SIZE,
                actual: bytes.len(),
            });
        }
        let mut page = Page::new();
        page.bitmap = u16::from_le_bytes([bytes[0], bytes[1]]);
        for slot in 0..SLOTS_PER_PAGE {
            if page.bitmap & bit(slot) == 0 {
                continue;
            }
            let start = BITMAP_SIZE + slot * RECORD_SIZE;
            let record = Record::decode(&bytes[start..start + RECORD_SIZE]).map_err(|err| {
                StoreError::Corrupt(format!("failed to decode record at slot {slot}: {err}"))
            })?;
            page.slots[slot] = Some(record);
        }
        Ok(page)
    }

    /// One-line listing: keys for used slots, `X` for empty ones.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (slot, record) in self.slots.iter().enumerate() {
            if slot > 0 {
                out.push(',');
            }
            match record {
                Some(record) if self.bitmap & bit(slot) != 0 => {
                    out.push_str(&record.key().to_string());
                }
                _ => out.push('X'),
            }
        }
        out
    }

    // Sorted-prefix operations. These assume used slots are exactly
    // `0..record_count()` with keys in non-decreasing order.

    /// Returns true when used slots form the prefix `0..count` in key order.
    pub fn is_sorted_prefix(&self) -> bool {
        let packed = (u32::from(self.bitmap) + 1).is_power_of_two();
        packed
            && self
                .records()
                .map(|(_, record)| record.key())
                .collect::<Vec<_>>()
                .windows(2)
                .all(|pair| pair[0] <= pair[1])
    }

    fn prefix_key(&self, slot: usize) -> Result<i32> {
        self.get(slot).map(Record::key)
    }

    /// Key in slot 0, if any.
    pub fn first_key(&self) -> Result<Option<i32>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.prefix_key(0).map(Some)
    }

    /// Key in the last slot of the prefix, if any.
    pub fn last_key(&self) -> Result<Option<i32>> {
        match self.record_count() {
            0 => Ok(None),
            count => self.prefix_key(count - 1).map(Some),
        }
    }

    /// First prefix index whose key is `>= key`.
    pub fn lower_bound(&self, key: i32) -> Result<usize> {
        let (mut lo, mut hi) = (0, self.record_count());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.prefix_key(mid)? < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    /// First prefix index whose key is `> key`.
    pub fn upper_bound(&self, key: i32) -> Result<usize> {
        let (mut lo, mut hi) = (0, self.record_count());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.prefix_key(mid)? <= key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    /// Slot of the first record with exactly `key`.
    pub fn binary_search(&self, key: i32) -> Result<Option<usize>> {
        let idx = self.lower_bound(key)?;
        if idx < self.record_count() && self.prefix_key(idx)? == key {
            Ok(Some(idx))
        } else {
            Ok(None)
        }
    }

    /// Shifts `index..count` one slot to the right and stores `record` at `index`.
    pub fn shift_insert(&mut self, index: usize, record: Record) -> Result<()> {
        let count = self.record_count();
        if count == SLOTS_PER_PAGE {
            return Err(StoreError::SlotOccupied(SLOTS_PER_PAGE - 1));
        }
        if index > count {
            return Err(StoreError::InvalidSlot(index));
        }
        for slot in (index..count).rev() {
            let moved = self.delete(slot)?;
            self.insert(slot + 1, moved)?;
        }
        self.insert(index, record)
    }

    /// Removes the record at `index` and shifts the tail left, clearing the
    /// vacated last slot.
    pub fn remove_shift(&mut self, index: usize) -> Result<Record> {
        let count = self.record_count();
        let removed = self.delete(index)?;
        for slot in index + 1..count {
            let moved = self.delete(slot)?;
            self.insert(slot - 1, moved)?;
        }
        Ok(removed)
    }

    /// Removes the smallest record of the prefix.
    pub fn pop_front(&mut self) -> Result<Record> {
        self.remove_shift(0)
    }

    /// Removes the largest record of the prefix.
    pub fn pop_back(&mut self) -> Result<Record> {
        match self.record_count() {
            0 => Err(StoreError::SlotEmpty(0)),
            count => self.delete(count - 1),
        }
    }

    /// Appends after the last record of the prefix.
    pub fn push_back(&mut self, record: Record) -> Result<()> {
        let count = self.record_count();
        if count == SLOTS_PER_PAGE {
            return Err(StoreError::SlotOccupied(SLOTS_PER_PAGE - 1));
        }
        self.insert(count, record)
    }
}
