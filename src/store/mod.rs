mod device;
mod record;

pub use device::{BlockDevice, FileBlockDevice};
#[cfg(test)]
pub use device::MemBlockDevice;
pub use record::{BLOCK_SIZE, MAX_RATING, NAME_LEN, RECORDS_PER_BLOCK, Record, decode_block};

use thiserror::Error;
use tracing::{debug, warn};

/// Magic bytes opening the header block of a packed catalog image.
pub const CATALOG_MAGIC: [u8; 8] = *b"POICAT\0\x01";

/// Errors raised while reading catalog records.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record index {index} out of range (catalog holds {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("block {block} unreadable after {attempts} attempts: {source}")]
    BlockRead {
        block: u32,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog header invalid: {0}")]
    BadHeader(String),
}

impl StoreError {
    /// Short message suitable for the status line.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::IndexOutOfRange { index, .. } => {
                format!("No catalog entry #{}", index)
            }
            StoreError::BlockRead { block, .. } => {
                format!("Storage fault at block {}, query aborted", block)
            }
            StoreError::BadHeader(msg) => format!("Unreadable catalog: {}", msg),
        }
    }
}

/// Header stored in block 0 of a packed catalog image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogHeader {
    pub record_count: u32,
    pub base_block: u32,
}

impl CatalogHeader {
    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut block = [0u8; BLOCK_SIZE];
        block[..8].copy_from_slice(&CATALOG_MAGIC);
        block[8..12].copy_from_slice(&self.record_count.to_le_bytes());
        block[12..16].copy_from_slice(&self.base_block.to_le_bytes());
        block
    }

    pub fn decode(block: &[u8; BLOCK_SIZE]) -> Result<Self, StoreError> {
        if block[..8] != CATALOG_MAGIC {
            return Err(StoreError::BadHeader("missing catalog magic".to_string()));
        }
        let record_count = u32::from_le_bytes([block[8], block[9], block[10], block[11]]);
        let base_block = u32::from_le_bytes([block[12], block[13], block[14], block[15]]);
        if base_block == 0 {
            return Err(StoreError::BadHeader(
                "records overlap the header block".to_string(),
            ));
        }
        Ok(Self {
            record_count,
            base_block,
        })
    }

    /// Number of blocks the records occupy.
    pub fn record_blocks(&self) -> u64 {
        (self.record_count as u64).div_ceil(RECORDS_PER_BLOCK as u64)
    }
}

/// The single in-memory copy of the most recently read block.
#[derive(Debug, Clone)]
struct CacheLine {
    block: Option<u32>,
    records: [Record; RECORDS_PER_BLOCK],
}

impl CacheLine {
    fn empty() -> Self {
        Self {
            block: None,
            records: [Record::default(); RECORDS_PER_BLOCK],
        }
    }
}

/// Serves catalog records by index through a one-block cache.
pub struct RecordStore<D> {
    device: D,
    base_block: u32,
    len: usize,
    read_attempts: u32,
    line: CacheLine,
    block_reads: u64,
}

impl<D: BlockDevice> RecordStore<D> {
    /// Fixed-layout store: `len` records starting at `base_block`.
    pub fn new(device: D, base_block: u32, len: usize, read_attempts: u32) -> Self {
        Self {
            device,
            base_block,
            len,
            read_attempts: read_attempts.max(1),
            line: CacheLine::empty(),
            block_reads: 0,
        }
    }

    /// Open a packed catalog image, taking layout from its header block.
    pub fn open(mut device: D, read_attempts: u32) -> Result<Self, StoreError> {
        let attempts = read_attempts.max(1);
        let mut raw = [0u8; BLOCK_SIZE];
        read_with_retry(&mut device, 0, attempts, &mut raw)?;
        let header = CatalogHeader::decode(&raw)?;

        // The last record block must be present on the device.
        if header.record_count > 0 {
            let last = u64::from(header.base_block) + header.record_blocks() - 1;
            let last = u32::try_from(last).map_err(|_| {
                StoreError::BadHeader("record blocks exceed device addressing".to_string())
            })?;
            read_with_retry(&mut device, last, attempts, &mut raw).map_err(|_| {
                StoreError::BadHeader(format!(
                    "image too short for {} records",
                    header.record_count
                ))
            })?;
        }

        debug!(
            records = header.record_count,
            base_block = header.base_block,
            "catalog header accepted"
        );
        Ok(Self::new(
            device,
            header.base_block,
            header.record_count as usize,
            attempts,
        ))
    }

    /// Number of records in the catalog.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Block reads issued so far (retries count once per attempt).
    pub fn block_reads(&self) -> u64 {
        self.block_reads
    }

    #[cfg(test)]
    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Fetch record `index`.
    ///
    /// Performs at most one block read (plus retries) and none at all when
    /// the record sits in the cached block. On failure the previous cache
    /// line stays valid.
    pub fn fetch(&mut self, index: usize) -> Result<Record, StoreError> {
        if index >= self.len {
            return Err(StoreError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }

        let block = self.base_block + (index / RECORDS_PER_BLOCK) as u32;
        if self.line.block != Some(block) {
            debug!(block, index, "cache miss");
            let mut raw = [0u8; BLOCK_SIZE];
            let attempts =
                read_with_retry(&mut self.device, block, self.read_attempts, &mut raw);
            self.block_reads += u64::from(match &attempts {
                Ok(n) => *n,
                Err(StoreError::BlockRead { attempts, .. }) => *attempts,
                Err(_) => 0,
            });
            attempts?;
            self.line = CacheLine {
                block: Some(block),
                records: decode_block(&raw),
            };
        }

        Ok(self.line.records[index % RECORDS_PER_BLOCK])
    }
}

/// Read one block, retrying up to `attempts` times. Returns the number of
/// attempts used.
fn read_with_retry<D: BlockDevice>(
    device: &mut D,
    block: u32,
    attempts: u32,
    buf: &mut [u8; BLOCK_SIZE],
) -> Result<u32, StoreError> {
    let mut attempt = 1;
    loop {
        match device.read_block(block, buf) {
            Ok(()) => return Ok(attempt),
            Err(e) if attempt >= attempts => {
                warn!(block, attempt, error = %e, "block read failed, giving up");
                return Err(StoreError::BlockRead {
                    block,
                    attempts: attempt,
                    source: e,
                });
            }
            Err(e) => {
                warn!(block, attempt, error = %e, "block read failed, retrying");
                attempt += 1;
            }
        }
    }
}
