use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::store::{BLOCK_SIZE, CatalogHeader, MAX_RATING, NAME_LEN, RECORDS_PER_BLOCK, Record};

/// First block holding records in a packed image; block 0 is the header.
pub const RECORDS_BASE_BLOCK: u32 = 1;

/// One catalog entry as prepared offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub lat: i32,
    pub lon: i32,
    pub rating: u8,
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("entry {index} ({name:?}) has rating {rating}, maximum is {max}")]
    RatingOutOfRange {
        index: usize,
        name: String,
        rating: u8,
        max: u8,
    },

    #[error("catalog holds {0} entries, more than an image can address")]
    TooManyEntries(usize),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Summary of a finished pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackReport {
    pub records: usize,
    pub blocks: u64,
    pub truncated_names: usize,
}

/// Encode `entries` into a block image written to `out`.
pub fn write_image<W: Write>(entries: &[CatalogEntry], out: W) -> Result<PackReport, CodecError> {
    for (index, entry) in entries.iter().enumerate() {
        if entry.rating > MAX_RATING {
            return Err(CodecError::RatingOutOfRange {
                index,
                name: entry.name.clone(),
                rating: entry.rating,
                max: MAX_RATING,
            });
        }
    }
    let record_count =
        u32::try_from(entries.len()).map_err(|_| CodecError::TooManyEntries(entries.len()))?;
    let header = CatalogHeader {
        record_count,
        base_block: RECORDS_BASE_BLOCK,
    };

    let mut writer = BufWriter::with_capacity(65536, out);
    writer.write_all(&header.encode())?;

    let mut truncated_names = 0;
    for chunk in entries.chunks(RECORDS_PER_BLOCK) {
        let mut block = [0u8; BLOCK_SIZE];
        for (slot, entry) in block.chunks_exact_mut(BLOCK_SIZE / RECORDS_PER_BLOCK).zip(chunk) {
            if entry.name.len() >= NAME_LEN {
                truncated_names += 1;
            }
            slot.copy_from_slice(&Record::new(&entry.name, entry.lat, entry.lon, entry.rating).encode());
        }
        writer.write_all(&block)?;
    }
    writer.flush()?;

    Ok(PackReport {
        records: entries.len(),
        blocks: 1 + header.record_blocks(),
        truncated_names,
    })
}

/// Read a JSON array of entries from `input_path` and pack it into an image
/// at `output_path`.
pub fn pack(input_path: &Path, output_path: &Path) -> Result<PackReport, CodecError> {
    let start = std::time::Instant::now();
    let reader = BufReader::new(File::open(input_path)?);
    let entries: Vec<CatalogEntry> = serde_json::from_reader(reader)?;

    let report = write_image(&entries, File::create(output_path)?)?;
    info!(
        records = report.records,
        blocks = report.blocks,
        truncated = report.truncated_names,
        elapsed = ?start.elapsed(),
        "catalog packed"
    );
    Ok(report)
}
