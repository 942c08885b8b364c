//! Out-of-line (TOAST) value reconstruction.
//!
//! An oversized attribute is replaced on the main page by an 18-byte external
//! pointer naming a value id and the side relation holding its chunks. Each
//! chunk is an ordinary heap tuple of `(value oid, chunk seq, bytea)` in a
//! file sitting next to the main one, named by the side relation's filenode.
//! Reconstruction reopens the block reader over that file, filters chunk
//! tuples by value id, accumulates payload bytes in arrival order (the format
//! stores them in ascending sequence), and stops as soon as the expected
//! external size has been gathered. A compressed value then passes through
//! pglz or LZ4 before the original type decoder sees it.
//!
//! Anything missing — the file, a chunk, matching ids — degrades to a
//! placeholder marker on the output row rather than aborting the outer scan.

use std::io::Write;

use byteorder::{ByteOrder, LittleEndian};

use crate::pg::constants::*;
use crate::pg::decode::{decompress_payload, Cursor};
use crate::pg::dump::{self, DumpConfig, ScanState};
use crate::pg::relfile::RelFile;
use crate::pg::tuple::HeapTuple;
use crate::{wprintln, PgfdError};

/// Parsed on-disk external pointer (the bytes after the 2 tag bytes).
#[derive(Debug, Clone, Copy)]
pub struct ToastPointer {
    /// Original data size, varlena header included.
    pub raw_size: i32,
    /// 30-bit external (possibly compressed) size plus 2-bit method.
    pub extinfo: u32,
    /// Unique id of the value within its side relation.
    pub value_id: u32,
    /// Filenode of the side relation holding the chunks.
    pub toast_relid: u32,
}

impl ToastPointer {
    /// Byte length of the pointer body.
    pub const SIZE: usize = 16;

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }
        Some(ToastPointer {
            raw_size: LittleEndian::read_i32(&data[0..]),
            extinfo: LittleEndian::read_u32(&data[4..]),
            value_id: LittleEndian::read_u32(&data[8..]),
            toast_relid: LittleEndian::read_u32(&data[12..]),
        })
    }

    /// Size of the value as stored externally.
    pub fn external_size(&self) -> u32 {
        self.extinfo & VARLENA_EXTSIZE_MASK
    }

    /// Compression method tag (meaningful only when compressed).
    pub fn method(&self) -> u32 {
        self.extinfo >> VARLENA_EXTSIZE_BITS
    }

    /// Compressed when the external size undercuts the raw data size.
    pub fn is_compressed(&self) -> bool {
        (self.external_size() as i64) < self.raw_size as i64 - VARHDRSZ as i64
    }

    /// Number of chunk tuples the external size implies.
    pub fn chunk_count(&self) -> u32 {
        if self.external_size() == 0 {
            0
        } else {
            (self.external_size() - 1) / TOAST_MAX_CHUNK_SIZE + 1
        }
    }
}

/// Accumulates chunk payloads for one external value during a side scan.
pub struct ToastCollector {
    pub value_id: u32,
    pub external_size: usize,
    pub data: Vec<u8>,
}

impl ToastCollector {
    pub fn new(value_id: u32, external_size: usize) -> Self {
        ToastCollector {
            value_id,
            external_size,
            data: Vec::with_capacity(external_size),
        }
    }

    /// True once the expected external size has been accumulated.
    pub fn is_complete(&self) -> bool {
        self.data.len() >= self.external_size
    }
}

/// Outcome of inspecting one side-relation tuple for chunk data.
pub enum ChunkOutcome {
    /// A chunk of the wanted value; sequence number and payload size.
    Collected { seq: u32, size: usize },
    /// A chunk belonging to some other value.
    OtherValue,
}

/// Decode one side-relation tuple as `(value oid, chunk seq, bytea)`.
///
/// Payload bytes for the wanted value are appended to the collector. Chunk
/// data is stored uncompressed and inline, so anything but a plain 4-byte
/// varlena is structural corruption, reported via `Err`.
pub fn chunk_decode(
    tuple_data: &[u8],
    collector: &mut ToastCollector,
) -> Result<ChunkOutcome, String> {
    let header = HeapTuple::parse(tuple_data)
        .ok_or_else(|| "chunk tuple too small for a heap tuple header".to_string())?;
    let hoff = header.hoff as usize;
    if hoff < SIZE_HEAP_TUPLE_HEADER || hoff > tuple_data.len() {
        return Err(format!("chunk tuple has bad header offset <{}>", hoff));
    }

    let mut cursor = Cursor::new(&tuple_data[hoff..]);

    let value_id = cursor
        .align_to(4)
        .and_then(|_| cursor.take(4))
        .map(LittleEndian::read_u32)
        .map_err(|e| format!("unable to decode chunk value id: {}", e))?;
    if value_id != collector.value_id {
        return Ok(ChunkOutcome::OtherValue);
    }

    let seq = cursor
        .align_to(4)
        .and_then(|_| cursor.take(4))
        .map(LittleEndian::read_u32)
        .map_err(|e| format!("unable to decode chunk sequence: {}", e))?;

    cursor
        .align_to(4)
        .map_err(|e| format!("unable to align chunk data: {}", e))?;
    let first = cursor
        .peek()
        .map_err(|e| format!("unable to read chunk data: {}", e))?;
    if first & 0x03 != 0x00 {
        return Err(format!(
            "chunk data is not a plain varlena (header byte 0x{:02x})",
            first
        ));
    }
    if cursor.remaining() < VARHDRSZ {
        return Err("chunk data varlena header truncated".to_string());
    }
    let len = (LittleEndian::read_u32(cursor.rest()) >> 2) as usize & 0x3FFF_FFFF;
    if len < VARHDRSZ || len > cursor.remaining() {
        return Err(format!("chunk data length {} out of bounds", len));
    }
    let payload = &cursor
        .take(len)
        .map_err(|e| format!("unable to read chunk data: {}", e))?[VARHDRSZ..];
    collector.data.extend_from_slice(payload);

    Ok(ChunkOutcome::Collected {
        seq,
        size: payload.len(),
    })
}

/// Reconstruct an external value by scanning its side relation.
///
/// Returns the raw (decompressed) value bytes, or `None` when the value
/// could not be recovered — every such path reports inline and marks the
/// scan failed, leaving the caller to emit a placeholder.
pub fn read_external(
    cfg: &DumpConfig,
    scan: &mut ScanState,
    ptr: &ToastPointer,
    writer: &mut dyn Write,
) -> Result<Option<Vec<u8>>, PgfdError> {
    wprintln!(
        writer,
        "  TOAST value. Raw size: {:8}, external size: {:8}, value id: {:6}, toast relation id: {:6}, chunks: {:6}",
        ptr.raw_size,
        ptr.external_size(),
        ptr.value_id,
        ptr.toast_relid,
        ptr.chunk_count()
    )?;

    let path = crate::util::fs::sibling_relation_path(&cfg.file, ptr.toast_relid);

    let mut rel = match RelFile::open(&path) {
        Ok(rel) => rel,
        Err(_) => {
            scan.failed = true;
            wprintln!(writer, "  Cannot open TOAST relation {}", path.display())?;
            return Ok(None);
        }
    };

    let toast_cfg = cfg.for_toast_scan(path.clone());
    let mut toast_scan = ScanState::new(true);
    let mut collector = ToastCollector::new(ptr.value_id, ptr.external_size() as usize);

    dump::dump_file_contents(&toast_cfg, &mut rel, &mut toast_scan, writer, Some(&mut collector))?;
    scan.failed |= toast_scan.failed;

    if !collector.is_complete() {
        scan.failed = true;
        wprintln!(
            writer,
            "  Error: expected {} bytes from TOAST relation {}, got {}",
            collector.external_size,
            path.display(),
            collector.data.len()
        )?;
        return Ok(None);
    }
    collector.data.truncate(collector.external_size);

    if !ptr.is_compressed() {
        return Ok(Some(collector.data));
    }

    // A compressed external value carries its own leading raw-size/method
    // word, independent of the pointer's copy.
    if collector.data.len() < VARHDRSZ {
        scan.failed = true;
        wprintln!(writer, "  WARNING: compressed TOAST value shorter than its header.")?;
        return Ok(None);
    }
    let tcinfo = LittleEndian::read_u32(&collector.data[0..]);
    let raw_size = (tcinfo & VARLENA_EXTSIZE_MASK) as usize;
    let method = tcinfo >> VARLENA_EXTSIZE_BITS;

    match decompress_payload(&collector.data[VARHDRSZ..], raw_size, method) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            scan.failed = true;
            wprintln!(writer, "  WARNING: Unable to decompress a TOAST value. Data is corrupted: {}", e)?;
            Ok(None)
        }
    }
}
