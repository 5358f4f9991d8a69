use std::borrow::Cow;
use std::fmt;

use crate::types::{Result, StoreError};

/// Width of the payload carried by every record.
pub const DATA_SIZE: usize = 250;
/// Width of the big-endian key prefix.
pub const KEY_SIZE: usize = 4;
/// Encoded size of one record: key followed by payload.
pub const RECORD_SIZE: usize = KEY_SIZE + DATA_SIZE;

const PAD: u8 = b' ';

/// A keyed record with a fixed 250-byte payload.
///
/// The payload is normalized on construction: longer input is cut at the
/// 250th byte (which may split a multi-byte UTF-8 sequence) and shorter input
/// is right-padded with spaces.
#[derive(Clone, PartialEq, Eq)]
pub struct Record {
    key: i32,
    payload: [u8; DATA_SIZE],
}

impl Record {
    /// Builds a record, truncating or space-padding `data` to [`DATA_SIZE`] bytes.
    pub fn new(key: i32, data: impl AsRef<[u8]>) -> Self {
        let data = data.as_ref();
        let mut payload = [PAD; DATA_SIZE];
        let len = data.len().min(DATA_SIZE);
        payload[..len].copy_from_slice(&data[..len]);
        Self { key, payload }
    }

    pub(crate) fn zeroed() -> Self {
        Self {
            key: 0,
            payload: [0u8; DATA_SIZE],
        }
    }

    /// Record key.
    pub fn key(&self) -> i32 {
        self.key
    }

    /// All 250 stored payload bytes, padding included.
    pub fn payload(&self) -> &[u8; DATA_SIZE] {
        &self.payload
    }

    /// Payload bytes with trailing padding removed.
    pub fn data_bytes(&self) -> &[u8] {
        let end = self
            .payload
            .iter()
            .rposition(|&b| b != PAD)
            .map_or(0, |idx| idx + 1);
        &self.payload[..end]
    }

    /// Payload text with trailing padding removed.
    ///
    /// A character split by truncation decodes as U+FFFD.
    pub fn data(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.data_bytes())
    }

    /// Serializes to exactly [`RECORD_SIZE`] bytes.
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[..KEY_SIZE].copy_from_slice(&self.key.to_be_bytes());
        out[KEY_SIZE..].copy_from_slice(&self.payload);
        out
    }

    /// Writes the encoding into `dst`, which must be [`RECORD_SIZE`] bytes long.
    pub fn encode_into(&self, dst: &mut [u8]) -> Result<()> {
        if dst.len() != RECORD_SIZE {
            return Err(StoreError::InvalidSize {
                what: "record",
                expected: RECORD_SIZE,
                actual: dst.len(),
            });
        }
        dst.copy_from_slice(&self.encode());
        Ok(())
    }

    /// Parses a record from exactly [`RECORD_SIZE`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RECORD_SIZE {
            return Err(StoreError::InvalidSize {
                what: "record",
                expected: RECORD_SIZE,
                actual: bytes.len(),
            });
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&bytes[..KEY_SIZE]);
        let mut payload = [0u8; DATA_SIZE];
        payload.copy_from_slice(&bytes[KEY_SIZE..]);
        Ok(Self {
            key: i32::from_be_bytes(key),
            payload,
        })
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("key", &self.key)
            .field("data", &self.data())
            .finish()
    }
}
