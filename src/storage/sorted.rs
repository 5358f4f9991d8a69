//! Key-ordered (sorted) file organization.
//!
//! Every page keeps its records packed into slots `0..count` in
//! non-decreasing key order, and pages follow each other in key order, so a
//! full scan in directory order yields a sorted sequence. There is no index:
//! lookups walk the directory and binary search inside each page.
//!
//! Inserts land in the page whose key range covers the new key. A full page
//! spills its largest record into the front of the next page, cascading
//! until some page has room. After every insert and delete a rebalancing
//! pass pulls records forward so that no page before a non-empty page is
//! left less than half full.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::storage::file::{PagedFile, RecordFile};
use crate::storage::options::FileOptions;
use crate::storage::page::{Page, SLOTS_PER_PAGE};
use crate::storage::record::Record;
use crate::storage::stats::IoStats;
use crate::types::{Result, StoreError};

/// Minimum fill the rebalancing pass restores on every page that has a
/// non-empty successor.
pub const HALF_FULL: usize = SLOTS_PER_PAGE / 2;

/// Sorted record file.
#[derive(Debug)]
pub struct SortedFile {
    file: PagedFile,
}

impl SortedFile {
    fn read_sorted(&self, index: usize) -> Result<Page> {
        let page = self.file.read_page(index)?;
        if !page.is_sorted_prefix() {
            return Err(StoreError::Corrupt(format!(
                "page {index} is not a packed, key-ordered page"
            )));
        }
        Ok(page)
    }

    fn is_empty_page(&self, index: usize) -> bool {
        self.file
            .directory()
            .get(index)
            .map_or(true, |entry| entry.used_slots() == 0)
    }

    /// Picks the page a new key belongs in.
    ///
    /// That is the first non-empty page whose last key exceeds `key`, else
    /// the last non-empty page. The page is returned already read when one
    /// was inspected.
    fn insert_target(&self, key: i32) -> Result<(usize, Option<Page>)> {
        let mut fallback = None;
        for index in 0..self.file.page_count() {
            if self.is_empty_page(index) {
                continue;
            }
            let page = self.read_sorted(index)?;
            match page.last_key()? {
                Some(last) if last > key => return Ok((index, Some(page))),
                Some(_) => fallback = Some((index, page)),
                None => {}
            }
        }
        Ok(match fallback {
            Some((index, page)) => (index, Some(page)),
            None => (0, None),
        })
    }

    /// Finds the first record with `key`, stopping once pages start above it.
    fn locate(&self, key: i32) -> Result<Option<(usize, Page, usize)>> {
        for index in 0..self.file.page_count() {
            if self.is_empty_page(index) {
                continue;
            }
            let page = self.read_sorted(index)?;
            if matches!(page.first_key()?, Some(first) if first > key) {
                break;
            }
            if let Some(slot) = page.binary_search(key)? {
                return Ok(Some((index, page, slot)));
            }
        }
        Ok(None)
    }

    /// Pulls records forward so each page with a non-empty successor holds
    /// at least [`HALF_FULL`] records. Returns how many records moved.
    ///
    /// Decisions use the cached free-slot counts; only pairs that need work
    /// are read.
    fn rebalance(&mut self) -> Result<usize> {
        let mut moved_total = 0;
        for left_index in 0..self.file.page_count().saturating_sub(1) {
            let right_index = left_index + 1;
            let (left_used, right_used) = match (
                self.file.directory().get(left_index),
                self.file.directory().get(right_index),
            ) {
                (Some(left), Some(right)) => (left.used_slots(), right.used_slots()),
                _ => break,
            };
            if left_used >= HALF_FULL || right_used == 0 {
                continue;
            }

            let mut left = self.read_sorted(left_index)?;
            let mut right = self.read_sorted(right_index)?;
            let mut moved = 0;
            while left.record_count() < HALF_FULL && !right.is_empty() {
                let record = right.pop_front()?;
                left.push_back(record)?;
                moved += 1;
            }
            if moved > 0 {
                self.file.write_page(left_index, &left)?;
                self.file.write_page(right_index, &right)?;
                debug!(left_index, right_index, moved, "pagestore.sorted.rebalance");
            } else {
                self.file.refresh_free_slots(left_index, &left)?;
                self.file.refresh_free_slots(right_index, &right)?;
            }
            moved_total += moved;
        }
        Ok(moved_total)
    }
}

impl RecordFile for SortedFile {
    fn open_with_options(
        data_path: impl AsRef<Path>,
        directory_path: impl AsRef<Path>,
        options: FileOptions,
    ) -> Result<Self> {
        let file = PagedFile::open(data_path.as_ref(), directory_path.as_ref(), options)?;
        Ok(Self { file })
    }

    fn insert(&mut self, record: Record) -> Result<()> {
        let (mut index, target) = self.insert_target(record.key())?;
        let mut page = match target {
            Some(page) => page,
            None if self.file.page_count() == 0 => {
                index = self.file.allocate_page();
                Page::new()
            }
            None => self.read_sorted(index)?,
        };

        let mut carry = record;
        loop {
            let pos = page.upper_bound(carry.key())?;
            if !page.is_full() {
                page.shift_insert(pos, carry)?;
                self.file.write_page(index, &page)?;
                break;
            }
            if pos < SLOTS_PER_PAGE {
                let evicted = page.pop_back()?;
                page.shift_insert(pos, carry)?;
                self.file.write_page(index, &page)?;
                carry = evicted;
            }
            index += 1;
            debug!(index, key = carry.key(), "pagestore.sorted.insert.overflow");
            page = if index < self.file.page_count() {
                self.read_sorted(index)?
            } else {
                index = self.file.allocate_page();
                Page::new()
            };
        }

        self.rebalance()?;
        self.file.persist_directory()
    }

    fn search(&self, key: i32) -> Result<Option<Record>> {
        self.locate(key)?
            .map(|(_, page, slot)| page.get(slot).cloned())
            .transpose()
    }

    fn delete(&mut self, key: i32) -> Result<bool> {
        let Some((index, mut page, slot)) = self.locate(key)? else {
            return Ok(false);
        };
        page.remove_shift(slot)?;
        self.file.write_page(index, &page)?;
        self.rebalance()?;
        self.file.persist_directory()?;
        debug!(key, index, slot, "pagestore.sorted.delete");
        Ok(true)
    }

    fn range_search(&self, lo: i32, hi: i32) -> Result<Vec<Record>> {
        let mut out = Vec::new();
        if lo > hi {
            return Ok(out);
        }
        for index in 0..self.file.page_count() {
            if self.is_empty_page(index) {
                continue;
            }
            let page = self.read_sorted(index)?;
            if matches!(page.first_key()?, Some(first) if first > hi) {
                break;
            }
            for slot in page.lower_bound(lo)?..page.record_count() {
                let record = page.get(slot)?;
                if record.key() > hi {
                    break;
                }
                out.push(record.clone());
            }
        }
        Ok(out)
    }

    fn dump(&self) -> Result<String> {
        self.file.dump()
    }

    fn stats(&self) -> &Arc<IoStats> {
        self.file.stats()
    }

    fn page_count(&self) -> usize {
        self.file.page_count()
    }
}
