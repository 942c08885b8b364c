//! PostgreSQL relation file I/O.
//!
//! Provides [`RelFile`], the entry point for opening heap/index relation
//! segment files. The block size is auto-detected from the page header on
//! block 0 (the size lives in the high byte of `pd_pagesize_version`) and can
//! be forced when block 0 is too corrupted to trust. Blocks are read
//! sequentially; the final read may return a short block, which callers must
//! distinguish from EOF.
//!
//! A relation larger than one segment is split into `<filenode>`,
//! `<filenode>.1`, `<filenode>.2`, ... — the segment number is derived from
//! the file name suffix so checksum verification can account for the block
//! offset of earlier segments.

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use crate::pg::constants::*;
use crate::PgfdError;

/// Supertrait combining `Read + Seek` for type-erased readers.
pub(crate) trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// One block read from a relation file.
///
/// `data` always has the configured block size; `bytes_read` says how much of
/// it was actually obtained from the file. A partial block (`bytes_read <
/// data.len()`) happens only at a truncated end of file.
pub struct Block {
    /// Block number within the relation segment.
    pub number: u32,
    /// Byte offset of this block within the segment file.
    pub offset: u64,
    /// Raw block bytes, zero-padded past `bytes_read`.
    pub data: Vec<u8>,
    /// Number of bytes actually read from the file.
    pub bytes_read: usize,
}

impl Block {
    /// True when the whole block was present in the file.
    pub fn is_full(&self) -> bool {
        self.bytes_read == self.data.len()
    }
}

/// An open PostgreSQL relation segment file.
pub struct RelFile {
    reader: Box<dyn ReadSeek>,
    block_size: u32,
    next_block: u32,
    segment_number: u32,
}

impl RelFile {
    /// Open a relation file and auto-detect the block size from block 0.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PgfdError> {
        Self::open_inner(path.as_ref(), None)
    }

    /// Open with a forced block size, bypassing auto-detection.
    ///
    /// Useful when block 0's header is corrupt and reports a garbage size.
    pub fn open_with_block_size<P: AsRef<Path>>(
        path: P,
        block_size: u32,
    ) -> Result<Self, PgfdError> {
        Self::open_inner(path.as_ref(), Some(block_size))
    }

    fn open_inner(path: &Path, forced: Option<u32>) -> Result<Self, PgfdError> {
        let file = File::open(path)
            .map_err(|e| PgfdError::Io(format!("Cannot open {}: {}", path.display(), e)))?;
        let segment_number = segment_number_from_name(path);
        Self::init(Box::new(file), forced, segment_number)
    }

    /// Create a relation from an in-memory byte buffer with auto-detection.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, PgfdError> {
        Self::init(Box::new(Cursor::new(data)), None, 0)
    }

    /// Create a relation from an in-memory byte buffer with a forced block size.
    pub fn from_bytes_with_block_size(data: Vec<u8>, block_size: u32) -> Result<Self, PgfdError> {
        Self::init(Box::new(Cursor::new(data)), Some(block_size), 0)
    }

    /// Shared initialization: peek at block 0's header, then rewind.
    fn init(
        mut reader: Box<dyn ReadSeek>,
        forced: Option<u32>,
        segment_number: u32,
    ) -> Result<Self, PgfdError> {
        let block_size = match forced {
            Some(size) => size,
            None => detect_block_size(&mut reader)?,
        };
        if block_size == 0 {
            return Err(PgfdError::Argument("Block size of zero requested".to_string()));
        }

        reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| PgfdError::Io(format!("Cannot seek to start: {}", e)))?;

        Ok(RelFile {
            reader,
            block_size,
            next_block: 0,
            segment_number,
        })
    }

    /// Returns the detected or forced block size.
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Returns the segment number derived from the file name (or forced).
    pub fn segment_number(&self) -> u32 {
        self.segment_number
    }

    /// Force a segment number, overriding the file-name derivation.
    pub fn set_segment_number(&mut self, n: u32) {
        self.segment_number = n;
    }

    /// Seek so the next [`read_block`](Self::read_block) returns `block`.
    ///
    /// Seeking past EOF is not itself an error; the subsequent read reports
    /// EOF, matching ordinary file semantics.
    pub fn seek_to_block(&mut self, block: u32) -> Result<(), PgfdError> {
        let position = self.block_size as u64 * block as u64;
        self.reader
            .seek(SeekFrom::Start(position))
            .map_err(|e| PgfdError::Io(format!("Seek error before block {}: {}", block, e)))?;
        self.next_block = block;
        Ok(())
    }

    /// Read the next block in sequence.
    ///
    /// Returns `Ok(None)` at EOF. A short final block comes back with
    /// `bytes_read < block_size`; the remainder of `data` is zeroed. I/O
    /// failures are fatal.
    pub fn read_block(&mut self) -> Result<Option<Block>, PgfdError> {
        let size = self.block_size as usize;
        let mut data = vec![0u8; size];
        let mut bytes_read = 0;

        // Loop because short reads from pipes/interrupts are legal even
        // mid-file; only a zero return means EOF.
        while bytes_read < size {
            let n = self
                .reader
                .read(&mut data[bytes_read..])
                .map_err(|e| PgfdError::Io(format!("Cannot read block {}: {}", self.next_block, e)))?;
            if n == 0 {
                break;
            }
            bytes_read += n;
        }

        if bytes_read == 0 {
            return Ok(None);
        }

        let number = self.next_block;
        self.next_block += 1;
        Ok(Some(Block {
            number,
            offset: size as u64 * number as u64,
            data,
            bytes_read,
        }))
    }
}

/// Read the block size off of block 0's page header.
///
/// The page size occupies the high byte of `pd_pagesize_version`. A zero
/// result (all-zero or nonsense header) falls back to the 8 KiB default with
/// a notice, mirroring the behavior operators expect when pointing the tool
/// at a damaged file.
fn detect_block_size(reader: &mut Box<dyn ReadSeek>) -> Result<u32, PgfdError> {
    let mut header = [0u8; SIZE_PAGE_HEADER];
    reader
        .read_exact(&mut header)
        .map_err(|e| PgfdError::Io(format!("Unable to read full page header from block 0: {}", e)))?;

    let size_version = LittleEndian::read_u16(&header[PD_PAGESIZE_VERSION..]);
    let size = (size_version & 0xFF00) as u32;
    if size == 0 {
        eprintln!(
            "Notice: Block size determined from reading block 0 is zero, using default {} instead.",
            BLCKSZ_DEFAULT
        );
        eprintln!("Hint: Use -S <size> to specify the size manually.");
        return Ok(BLCKSZ_DEFAULT);
    }
    Ok(size)
}

/// Determine the segment number from a segment file name.
///
/// `/path/to/16384.7` yields 7; names without a numeric suffix yield 0.
pub fn segment_number_from_name(path: &Path) -> u32 {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return 0;
    };
    match name.rsplit_once('.') {
        Some((_, suffix)) if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) => {
            suffix.parse().unwrap_or(0)
        }
        _ => 0,
    }
}
