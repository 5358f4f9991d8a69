//! Unordered (heap) file organization.
//!
//! Records go into the first free slot of the first page with room; lookups
//! scan every page. Keys carry no ordering guarantee.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::storage::file::{PagedFile, RecordFile};
use crate::storage::options::FileOptions;
use crate::storage::page::{Page, SLOTS_PER_PAGE};
use crate::storage::record::Record;
use crate::storage::stats::IoStats;
use crate::types::Result;

/// Heap-organized record file.
#[derive(Debug)]
pub struct HeapFile {
    file: PagedFile,
}

impl HeapFile {
    /// Finds the first page holding `key` and the slot it sits in.
    fn locate(&self, key: i32) -> Result<Option<(usize, Page, usize)>> {
        for (index, entry) in self.file.directory().entries().iter().enumerate() {
            if entry.free_slots as usize == SLOTS_PER_PAGE {
                continue;
            }
            let page = self.file.read_page(index)?;
            if let Some(slot) = page.find_key(key) {
                return Ok(Some((index, page, slot)));
            }
        }
        Ok(None)
    }
}

impl RecordFile for HeapFile {
    fn open_with_options(
        data_path: impl AsRef<Path>,
        directory_path: impl AsRef<Path>,
        options: FileOptions,
    ) -> Result<Self> {
        let file = PagedFile::open(data_path.as_ref(), directory_path.as_ref(), options)?;
        Ok(Self { file })
    }

    fn insert(&mut self, record: Record) -> Result<()> {
        let candidates: Vec<usize> = self
            .file
            .directory()
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.free_slots > 0)
            .map(|(index, _)| index)
            .collect();

        for index in candidates {
            let mut page = self.file.read_page(index)?;
            match page.find_free_slot() {
                Some(slot) => {
                    page.insert(slot, record)?;
                    self.file.write_page(index, &page)?;
                    self.file.persist_directory()?;
                    return Ok(());
                }
                None => {
                    // The cached count was stale; correct it and keep looking.
                    warn!(index, "pagestore.heap.insert.stale_free_count");
                    self.file.refresh_free_slots(index, &page)?;
                }
            }
        }

        let index = self.file.allocate_page();
        let mut page = Page::new();
        page.insert(0, record)?;
        self.file.write_page(index, &page)?;
        self.file.persist_directory()?;
        debug!(index, "pagestore.heap.insert.new_page");
        Ok(())
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
        page.delete(slot)?;
        self.file.write_page(index, &page)?;
        self.file.persist_directory()?;
        debug!(key, index, slot, "pagestore.heap.delete");
        Ok(true)
    }

    fn range_search(&self, lo: i32, hi: i32) -> Result<Vec<Record>> {
        let mut out = Vec::new();
        if lo > hi {
            return Ok(out);
        }
        for (index, entry) in self.file.directory().entries().iter().enumerate() {
            if entry.free_slots as usize == SLOTS_PER_PAGE {
                continue;
            }
            let page = self.file.read_page(index)?;
            out.extend(
                page.records()
                    .filter(|(_, record)| (lo..=hi).contains(&record.key()))
                    .map(|(_, record)| record.clone()),
            );
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
