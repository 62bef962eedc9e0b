use std::borrow::Cow;

/// Size of one storage block in bytes.
pub const BLOCK_SIZE: usize = 512;

/// Size of one persisted record in bytes.
pub const RECORD_SIZE: usize = 64;

/// Number of records that fit in one block.
pub const RECORDS_PER_BLOCK: usize = BLOCK_SIZE / RECORD_SIZE;

/// Width of the NUL-padded name field.
pub const NAME_LEN: usize = 55;

/// Highest rating a catalog entry may carry.
pub const MAX_RATING: u8 = 4;

// Byte offsets inside a record.
const LAT_OFFSET: usize = 0;
const LON_OFFSET: usize = 4;
const RATING_OFFSET: usize = 8;
const NAME_OFFSET: usize = 9;

/// A single point of interest as laid out on the block device.
///
/// Layout (little-endian): `lat: i32`, `lon: i32`, `rating: u8`,
/// `name: [u8; 55]`. The name is NUL-padded and always keeps at least one
/// trailing NUL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub lat: i32,
    pub lon: i32,
    pub rating: u8,
    name: [u8; NAME_LEN],
}

impl Default for Record {
    fn default() -> Self {
        Self {
            lat: 0,
            lon: 0,
            rating: 0,
            name: [0; NAME_LEN],
        }
    }
}

impl Record {
    /// Build a record, truncating `name` at a char boundary so it fits the
    /// name field with its terminating NUL.
    pub fn new(name: &str, lat: i32, lon: i32, rating: u8) -> Self {
        let mut field = [0u8; NAME_LEN];
        let mut end = name.len().min(NAME_LEN - 1);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        field[..end].copy_from_slice(&name.as_bytes()[..end]);
        Self {
            lat,
            lon,
            rating,
            name: field,
        }
    }

    /// The record name up to its first NUL.
    pub fn name(&self) -> Cow<'_, str> {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_LEN);
        String::from_utf8_lossy(&self.name[..end])
    }

    pub fn decode(bytes: &[u8; RECORD_SIZE]) -> Self {
        let word = |at: usize| {
            i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        let mut name = [0u8; NAME_LEN];
        name.copy_from_slice(&bytes[NAME_OFFSET..NAME_OFFSET + NAME_LEN]);
        Self {
            lat: word(LAT_OFFSET),
            lon: word(LON_OFFSET),
            rating: bytes[RATING_OFFSET],
            name,
        }
    }

    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[LAT_OFFSET..LAT_OFFSET + 4].copy_from_slice(&self.lat.to_le_bytes());
        out[LON_OFFSET..LON_OFFSET + 4].copy_from_slice(&self.lon.to_le_bytes());
        out[RATING_OFFSET] = self.rating;
        out[NAME_OFFSET..NAME_OFFSET + NAME_LEN].copy_from_slice(&self.name);
        out
    }
}

/// Decode every record slot of a raw block.
pub fn decode_block(block: &[u8; BLOCK_SIZE]) -> [Record; RECORDS_PER_BLOCK] {
    let mut records = [Record::default(); RECORDS_PER_BLOCK];
    for (slot, chunk) in records.iter_mut().zip(block.chunks_exact(RECORD_SIZE)) {
        let mut raw = [0u8; RECORD_SIZE];
        raw.copy_from_slice(chunk);
        *slot = Record::decode(&raw);
    }
    records
}
