//! Page directory: which pages exist and how many free slots each one has.
//!
//! On disk:
//!
//! ```text
//! magic  b"PDIR"   4 bytes
//! count  u32 BE    4 bytes
//! count x (offset u64 BE, free_slots u32 BE)
//! crc32  u32 BE    4 bytes, over everything before it
//! ```

use crate::storage::page::{PAGE_SIZE, SLOTS_PER_PAGE};
use crate::types::{Result, StoreError};

/// Encoded size of one [`PageInfo`].
pub const PAGE_INFO_SIZE: usize = 12;

const MAGIC: &[u8; 4] = b"PDIR";
const HEADER_LEN: usize = 8;
const TRAILER_LEN: usize = 4;

/// CRC-32 (IEEE) stored in the trailer, over the framing and entries.
fn directory_crc32(body: &[u8]) -> u32 {
    crc32fast::hash(body)
}

/// Directory entry for a single page.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PageInfo {
    /// Byte offset of the page in the data file.
    pub offset: u64,
    /// Cached number of unused slots in the page.
    pub free_slots: u32,
}

impl PageInfo {
    /// Creates an entry.
    pub fn new(offset: u64, free_slots: u32) -> Self {
        Self { offset, free_slots }
    }

    /// Number of used slots implied by the cached free count.
    pub fn used_slots(&self) -> usize {
        SLOTS_PER_PAGE.saturating_sub(self.free_slots as usize)
    }

    /// Serializes to [`PAGE_INFO_SIZE`] bytes.
    pub fn encode(&self) -> [u8; PAGE_INFO_SIZE] {
        let mut out = [0u8; PAGE_INFO_SIZE];
        out[..8].copy_from_slice(&self.offset.to_be_bytes());
        out[8..].copy_from_slice(&self.free_slots.to_be_bytes());
        out
    }

    /// Parses exactly [`PAGE_INFO_SIZE`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PAGE_INFO_SIZE {
            return Err(StoreError::InvalidSize {
                what: "page info",
                expected: PAGE_INFO_SIZE,
                actual: bytes.len(),
            });
        }
        let mut offset = [0u8; 8];
        offset.copy_from_slice(&bytes[..8]);
        let mut free = [0u8; 4];
        free.copy_from_slice(&bytes[8..]);
        Ok(Self {
            offset: u64::from_be_bytes(offset),
            free_slots: u32::from_be_bytes(free),
        })
    }
}

/// Ordered list of page entries in allocation order.
///
/// Entry `i` always describes the page at byte offset `i * PAGE_SIZE`; pages
/// are only ever appended.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageDirectory {
    pages: Vec<PageInfo>,
}

impl PageDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pages described.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns true when no page has been allocated.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// All entries in directory order.
    pub fn entries(&self) -> &[PageInfo] {
        &self.pages
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Option<&PageInfo> {
        self.pages.get(index)
    }

    /// Offset the next allocated page will occupy.
    pub fn next_offset(&self) -> u64 {
        self.pages
            .last()
            .map_or(0, |last| last.offset + PAGE_SIZE as u64)
    }

    /// Adds the entry for a newly allocated page.
    pub fn append(&mut self, info: PageInfo) {
        self.pages.push(info);
    }

    /// Replaces the entry with the same offset. Returns false if none matched.
    pub fn update(&mut self, info: PageInfo) -> bool {
        match self.pages.iter_mut().find(|entry| entry.offset == info.offset) {
            Some(entry) => {
                *entry = info;
                true
            }
            None => false,
        }
    }

    /// Serializes the directory with its framing and checksum.
    pub fn encode(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(HEADER_LEN + self.pages.len() * PAGE_INFO_SIZE + TRAILER_LEN);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&(self.pages.len() as u32).to_be_bytes());
        for info in &self.pages {
            out.extend_from_slice(&info.encode());
        }
        let crc = directory_crc32(&out);
        out.extend_from_slice(&crc.to_be_bytes());
        out
    }

    /// Parses and validates an encoded directory.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let min = HEADER_LEN + TRAILER_LEN;
        if bytes.len() < min {
            return Err(StoreError::InvalidSize {
                what: "page directory",
                expected: min,
                actual: bytes.len(),
            });
        }
        if &bytes[..4] != MAGIC {
            return Err(StoreError::Corrupt("page directory magic mismatch".into()));
        }
        let count = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let expected_len = count
            .checked_mul(PAGE_INFO_SIZE)
            .and_then(|body| body.checked_add(min));
        if expected_len != Some(bytes.len()) {
            return Err(StoreError::Corrupt(format!(
                "page directory declares {count} entries but holds {} bytes",
                bytes.len()
            )));
        }
        let (body, trailer) = bytes.split_at(bytes.len() - TRAILER_LEN);
        let stored = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        if stored != directory_crc32(body) {
            return Err(StoreError::Corrupt("page directory checksum mismatch".into()));
        }

        let mut pages = Vec::with_capacity(count);
        for (index, chunk) in body[HEADER_LEN..].chunks_exact(PAGE_INFO_SIZE).enumerate() {
            let info = PageInfo::decode(chunk)?;
            let expected_offset = (index * PAGE_SIZE) as u64;
            if info.offset != expected_offset {
                return Err(StoreError::Corrupt(format!(
                    "page directory entry {index} has offset {} (expected {expected_offset})",
                    info.offset
                )));
            }
            if info.free_slots as usize > SLOTS_PER_PAGE {
                return Err(StoreError::Corrupt(format!(
                    "page directory entry {index} reports {} free slots",
                    info.free_slots
                )));
            }
            pages.push(info);
        }
        Ok(Self { pages })
    }
}
