//! Paged record store with heap and sorted file organizations.
//!
//! Records are fixed-width `(i32 key, 250-byte payload)` pairs stored in
//! 4096-byte pages of 16 slots. A [`HeapFile`] places records first-fit; a
//! [`SortedFile`] keeps them globally ordered by key. Both implement
//! [`RecordFile`].

#![warn(missing_docs)]

pub mod primitives;
pub mod storage;
pub mod types;

pub use storage::{
    FileOptions, HeapFile, IoStats, IoStatsSnapshot, Record, RecordFile, SortedFile,
};
pub use types::{Result, StoreError};
