use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use super::record::BLOCK_SIZE;

/// A block-addressable storage device.
pub trait BlockDevice {
    /// Read block number `block` into `buf`.
    fn read_block(&mut self, block: u32, buf: &mut [u8; BLOCK_SIZE]) -> io::Result<()>;
}

impl<D: BlockDevice + ?Sized> BlockDevice for &mut D {
    fn read_block(&mut self, block: u32, buf: &mut [u8; BLOCK_SIZE]) -> io::Result<()> {
        (**self).read_block(block, buf)
    }
}

/// Block device backed by an image file on the host filesystem.
pub struct FileBlockDevice {
    file: File,
    blocks: u64,
}

impl FileBlockDevice {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let blocks = file.metadata()?.len() / BLOCK_SIZE as u64;
        Ok(Self { file, blocks })
    }

    /// Number of whole blocks in the image.
    pub fn block_count(&self) -> u64 {
        self.blocks
    }
}

impl BlockDevice for FileBlockDevice {
    fn read_block(&mut self, block: u32, buf: &mut [u8; BLOCK_SIZE]) -> io::Result<()> {
        if u64::from(block) >= self.blocks {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("block {block} past end of image ({} blocks)", self.blocks),
            ));
        }
        self.file
            .seek(SeekFrom::Start(u64::from(block) * BLOCK_SIZE as u64))?;
        self.file.read_exact(buf)
    }
}

/// In-memory block device that counts reads and can inject faults.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemBlockDevice {
    blocks: Vec<[u8; BLOCK_SIZE]>,
    reads: u64,
    failures_pending: u32,
}

#[cfg(test)]
impl MemBlockDevice {
    pub fn new(blocks: Vec<[u8; BLOCK_SIZE]>) -> Self {
        Self {
            blocks,
            reads: 0,
            failures_pending: 0,
        }
    }

    /// Build a device from a flat byte image, zero-padding the last block.
    pub fn from_image(image: &[u8]) -> Self {
        let blocks = image
            .chunks(BLOCK_SIZE)
            .map(|chunk| {
                let mut block = [0u8; BLOCK_SIZE];
                block[..chunk.len()].copy_from_slice(chunk);
                block
            })
            .collect();
        Self::new(blocks)
    }

    /// Successful and failed read attempts so far.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Make the next `count` reads fail with an I/O error.
    pub fn fail_next(&mut self, count: u32) {
        self.failures_pending = count;
    }
}

#[cfg(test)]
impl BlockDevice for MemBlockDevice {
    fn read_block(&mut self, block: u32, buf: &mut [u8; BLOCK_SIZE]) -> io::Result<()> {
        self.reads += 1;
        if self.failures_pending > 0 {
            self.failures_pending -= 1;
            return Err(io::Error::other("injected read fault"));
        }
        let data = self.blocks.get(block as usize).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("block {block} past end of device"),
            )
        })?;
        buf.copy_from_slice(data);
        Ok(())
    }
}
