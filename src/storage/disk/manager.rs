use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;
use parking_lot::Mutex;
use thiserror::Error;

use crate::storage::disk::block::BlockId;
use crate::storage::page::Page;

#[derive(Error, Debug)]
pub enum DiskManagerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for disk operations
pub type Result<T> = std::result::Result<T, DiskManagerError>;

/// DiskManager performs block-granular I/O against the files of one
/// database directory.
///
/// Every operation seeks to `block_number * block_size` and transfers one
/// whole block. Writes are followed by an fsync, so a successful `write`
/// means the bytes are on stable storage. A single mutex serializes all
/// disk access through this manager.
pub struct DiskManager {
    directory: PathBuf,
    block_size: usize,
    open_files: Mutex<HashMap<String, File>>,
}

impl DiskManager {
    /// Create a disk manager for the given database directory, creating the
    /// directory if needed and removing any temporary files left behind by
    /// a previous session.
    pub fn new(directory: impl AsRef<Path>, block_size: usize) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        std::fs::create_dir_all(&directory)?;

        for entry in std::fs::read_dir(&directory)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with("temp") {
                debug!("removing leftover temporary file {:?}", entry.path());
                std::fs::remove_file(entry.path())?;
            }
        }

        Ok(Self {
            directory,
            block_size,
            open_files: Mutex::new(HashMap::new()),
        })
    }

    /// The block size this manager was configured with.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Read the contents of a disk block into a page.
    ///
    /// A block that lies beyond the current end of the file reads as all
    /// zeroes; such blocks simply have not been materialized yet.
    pub fn read(&self, block: &BlockId, page: &mut Page) -> Result<()> {
        let mut files = self.open_files.lock();
        let file = Self::open_file(&self.directory, &mut files, block.filename())?;

        let offset = block.number() as u64 * self.block_size as u64;
        if offset >= file.metadata()?.len() {
            page.contents_mut().fill(0);
            return Ok(());
        }

        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(page.contents_mut())?;
        Ok(())
    }

    /// Write the contents of a page to a disk block and force it to disk.
    pub fn write(&self, block: &BlockId, page: &Page) -> Result<()> {
        let mut files = self.open_files.lock();
        let file = Self::open_file(&self.directory, &mut files, block.filename())?;

        let offset = block.number() as u64 * self.block_size as u64;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(page.contents())?;
        file.sync_all()?;
        Ok(())
    }

    /// Extend the file by one zeroed block and return its id.
    ///
    /// The new block number is derived from the current file length, and
    /// the zeroed block is written under the same mutex acquisition, so
    /// concurrent appends receive distinct blocks.
    pub fn append(&self, filename: &str) -> Result<BlockId> {
        let mut files = self.open_files.lock();
        let file = Self::open_file(&self.directory, &mut files, filename)?;

        let number = (file.metadata()?.len() / self.block_size as u64) as i32;
        let block = BlockId::new(filename, number);

        let zeroes = vec![0u8; self.block_size];
        file.seek(SeekFrom::Start(number as u64 * self.block_size as u64))?;
        file.write_all(&zeroes)?;
        file.sync_all()?;

        Ok(block)
    }

    /// The number of blocks in the specified file.
    pub fn size(&self, filename: &str) -> Result<i32> {
        let mut files = self.open_files.lock();
        let file = Self::open_file(&self.directory, &mut files, filename)?;
        Ok((file.metadata()?.len() / self.block_size as u64) as i32)
    }

    /// Retrieve the cached handle for `filename`, opening (and creating)
    /// the file on first use.
    fn open_file<'a>(
        directory: &Path,
        files: &'a mut HashMap<String, File>,
        filename: &str,
    ) -> Result<&'a mut File> {
        match files.entry(filename.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .open(directory.join(filename))?;
                Ok(entry.insert(file))
            }
        }
    }
}
