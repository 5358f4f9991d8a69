#![forbid(unsafe_code)]
//! Shared error type for the record store.

/// Errors reported by the record store.
///
/// `InvalidSlot`, `SlotOccupied` and `SlotEmpty` are contract violations by the
/// caller of a page operation. `Io` and `Corrupt` come from the files on disk
/// and are never retried.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Underlying read or write failed, including a missing data file.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// Slot index outside `0..SLOTS_PER_PAGE`.
    #[error("invalid slot index {0}")]
    InvalidSlot(usize),
    /// Insert into a slot whose bitmap bit is already set.
    #[error("slot {0} is already occupied")]
    SlotOccupied(usize),
    /// Read or delete of a slot whose bitmap bit is clear.
    #[error("slot {0} is empty")]
    SlotEmpty(usize),
    /// Buffer length does not match the fixed encoding being decoded.
    #[error("invalid {what} size: expected {expected} bytes, got {actual}")]
    InvalidSize {
        /// Structure being decoded.
        what: &'static str,
        /// Required length in bytes.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },
    /// Bytes on disk do not describe a valid page or directory.
    #[error("corruption: {0}")]
    Corrupt(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
