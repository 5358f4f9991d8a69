//! Shared machinery behind the heap and sorted organizations.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::primitives::io;
use crate::storage::directory::{PageDirectory, PageInfo};
use crate::storage::options::FileOptions;
use crate::storage::page::{Page, PAGE_SIZE, SLOTS_PER_PAGE};
use crate::storage::record::Record;
use crate::storage::stats::IoStats;
use crate::types::{Result, StoreError};

/// Operations common to both file organizations.
pub trait RecordFile: Sized {
    /// Opens (or starts) a store backed by a data file and a directory file.
    ///
    /// A missing directory file means an empty store.
    fn open_with_options(
        data_path: impl AsRef<Path>,
        directory_path: impl AsRef<Path>,
        options: FileOptions,
    ) -> Result<Self>;

    /// Opens with [`FileOptions::default`].
    fn open(data_path: impl AsRef<Path>, directory_path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(data_path, directory_path, FileOptions::default())
    }

    /// Stores a record. Keys are not required to be unique.
    fn insert(&mut self, record: Record) -> Result<()>;

    /// Returns the first record found with `key`.
    fn search(&self, key: i32) -> Result<Option<Record>>;

    /// Removes one record with `key`. Returns false when none exists.
    fn delete(&mut self, key: i32) -> Result<bool>;

    /// Returns every record with `lo <= key <= hi`.
    fn range_search(&self, lo: i32, hi: i32) -> Result<Vec<Record>>;

    /// Human-readable listing, one `Page N: ...` line per page.
    fn dump(&self) -> Result<String>;

    /// Counter handle charged by this file.
    fn stats(&self) -> &Arc<IoStats>;

    /// Number of pages allocated in the data file.
    fn page_count(&self) -> usize;
}

/// Data file plus its in-memory page directory.
///
/// Pages are never cached: every access goes to the data file.
#[derive(Debug)]
pub(crate) struct PagedFile {
    data_path: PathBuf,
    directory_path: PathBuf,
    directory: PageDirectory,
    options: FileOptions,
}

impl PagedFile {
    pub(crate) fn open(
        data_path: &Path,
        directory_path: &Path,
        options: FileOptions,
    ) -> Result<Self> {
        let directory = match io::read_optional(directory_path)? {
            Some(bytes) => {
                options.stats.directory_read();
                PageDirectory::decode(&bytes)?
            }
            None => PageDirectory::new(),
        };

        let expected_len = directory.next_offset();
        // Once pages are listed the data file must exist; a missing one is `Io`.
        let data_len = if directory.is_empty() {
            io::file_len(data_path)?
        } else {
            fs::metadata(data_path)?.len()
        };
        if data_len < expected_len {
            return Err(StoreError::Corrupt(format!(
                "data file holds {data_len} bytes but the directory describes {} pages",
                directory.len()
            )));
        }
        if data_len > expected_len {
            warn!(
                data_len,
                expected_len, "pagestore.file.open.trailing_bytes_ignored"
            );
        }
        debug!(
            pages = directory.len(),
            data = %data_path.display(),
            "pagestore.file.open"
        );

        Ok(Self {
            data_path: data_path.to_path_buf(),
            directory_path: directory_path.to_path_buf(),
            directory,
            options,
        })
    }

    pub(crate) fn directory(&self) -> &PageDirectory {
        &self.directory
    }

    pub(crate) fn page_count(&self) -> usize {
        self.directory.len()
    }

    pub(crate) fn stats(&self) -> &Arc<IoStats> {
        &self.options.stats
    }

    fn entry(&self, index: usize) -> Result<PageInfo> {
        self.directory
            .get(index)
            .copied()
            .ok_or_else(|| StoreError::Corrupt(format!("page {index} is not in the directory")))
    }

    pub(crate) fn read_page(&self, index: usize) -> Result<Page> {
        let entry = self.entry(index)?;
        let mut buf = vec![0u8; PAGE_SIZE];
        io::read_block(&self.data_path, entry.offset, &mut buf)?;
        self.options.stats.page_read();
        Page::decode(&buf)
    }

    /// Writes the page back and refreshes its cached free-slot count.
    ///
    /// The directory itself is only written by [`PagedFile::persist_directory`].
    pub(crate) fn write_page(&mut self, index: usize, page: &Page) -> Result<()> {
        let mut entry = self.entry(index)?;
        io::write_block(
            &self.data_path,
            entry.offset,
            &page.encode()[..],
            self.options.sync_writes,
        )?;
        self.options.stats.page_written();
        entry.free_slots = page.free_slots() as u32;
        self.directory.update(entry);
        Ok(())
    }

    /// Corrects the cached free-slot count from a page that was read, without writing it.
    pub(crate) fn refresh_free_slots(&mut self, index: usize, page: &Page) -> Result<()> {
        let mut entry = self.entry(index)?;
        entry.free_slots = page.free_slots() as u32;
        self.directory.update(entry);
        Ok(())
    }

    /// Appends a directory entry for a new, empty page at the end of the data file.
    ///
    /// The page reaches the data file on its first [`PagedFile::write_page`].
    pub(crate) fn allocate_page(&mut self) -> usize {
        let offset = self.directory.next_offset();
        self.directory
            .append(PageInfo::new(offset, SLOTS_PER_PAGE as u32));
        let index = self.directory.len() - 1;
        debug!(index, offset, "pagestore.file.allocate_page");
        index
    }

    pub(crate) fn persist_directory(&self) -> Result<()> {
        io::replace_file(
            &self.directory_path,
            &self.directory.encode(),
            self.options.sync_writes,
        )?;
        self.options.stats.directory_written();
        Ok(())
    }

    pub(crate) fn dump(&self) -> Result<String> {
        let mut lines = Vec::with_capacity(self.directory.len());
        for index in 0..self.directory.len() {
            let page = self.read_page(index)?;
            lines.push(format!("Page {index}: {}", page.render()));
        }
        Ok(lines.join("\n"))
    }
}
