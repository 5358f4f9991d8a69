//! Record storage: page layout, page directory and the two file organizations.
//!
//! Both organizations share one on-disk format, a data file of 4096-byte
//! pages plus a directory file listing each page's offset and free-slot
//! count, and differ only in where records are placed.

/// Fixed-width record codec.
pub mod record;

/// 4096-byte slotted page with an occupancy bitmap.
pub mod page;

/// Page directory and its on-disk encoding.
pub mod directory;

mod file;
mod heap;
mod options;
mod sorted;
mod stats;

/// Operations shared by every file organization.
pub use file::RecordFile;

/// Unordered file organization.
pub use heap::HeapFile;

/// Key-ordered file organization.
pub use sorted::{SortedFile, HALF_FULL};

/// Open-time configuration.
pub use options::FileOptions;

/// I/O accounting.
pub use stats::{IoStats, IoStatsSnapshot};

pub use directory::{PageDirectory, PageInfo};
pub use page::{Page, PAGE_SIZE, SLOTS_PER_PAGE};
pub use record::{Record, DATA_SIZE, RECORD_SIZE};
