//! Shared builders for synthetic page images used by the integration tests.
#![allow(dead_code)]

use byteorder::{ByteOrder, LittleEndian};

pub const BLOCK_SIZE: usize = 8192;

const PD_LOWER: usize = 12;
const PD_UPPER: usize = 14;
const PD_SPECIAL: usize = 16;
const PD_PAGESIZE_VERSION: usize = 18;
const PD_LINP: usize = 24;
const SIZE_ITEM_ID: usize = 4;
const LP_NORMAL: u32 = 1;

const HEAP_T_XMIN: usize = 0;
const HEAP_T_CTID: usize = 12;
const HEAP_T_INFOMASK2: usize = 18;
const HEAP_T_INFOMASK: usize = 20;
const HEAP_T_HOFF: usize = 22;
const HEAP_T_BITS: usize = 23;
pub const HEAP_HASNULL: u16 = 0x0001;

pub fn maxalign(len: usize) -> usize {
    (len + 7) & !7
}

/// Build a heap tuple with the given attribute count, infomask, null bitmap,
/// and payload bytes.
pub fn heap_tuple(natts: u16, infomask: u16, bits: &[u8], payload: &[u8]) -> Vec<u8> {
    let bitmap_bytes = if infomask & HEAP_HASNULL != 0 {
        bits.len()
    } else {
        0
    };
    let hoff = maxalign(HEAP_T_BITS + bitmap_bytes);
    let mut t = vec![0u8; hoff];
    LittleEndian::write_u32(&mut t[HEAP_T_XMIN..], 100);
    LittleEndian::write_u16(&mut t[HEAP_T_CTID + 2..], 1);
    LittleEndian::write_u16(&mut t[HEAP_T_CTID + 4..], 1);
    LittleEndian::write_u16(&mut t[HEAP_T_INFOMASK2..], natts);
    LittleEndian::write_u16(&mut t[HEAP_T_INFOMASK..], infomask);
    t[HEAP_T_HOFF] = hoff as u8;
    t[HEAP_T_BITS..HEAP_T_BITS + bitmap_bytes].copy_from_slice(&bits[..bitmap_bytes]);
    t.extend_from_slice(payload);
    t
}

/// Build a block holding the given tuples as NORMAL items.
pub fn heap_block(tuples: &[Vec<u8>]) -> Vec<u8> {
    let mut data = vec![0u8; BLOCK_SIZE];
    let mut upper = BLOCK_SIZE;
    let mut lower = PD_LINP;

    for tuple in tuples {
        upper -= maxalign(tuple.len());
        data[upper..upper + tuple.len()].copy_from_slice(tuple);
        let word = (upper as u32) | (LP_NORMAL << 15) | ((tuple.len() as u32) << 17);
        LittleEndian::write_u32(&mut data[lower..], word);
        lower += SIZE_ITEM_ID;
    }

    LittleEndian::write_u16(&mut data[PD_LOWER..], lower as u16);
    LittleEndian::write_u16(&mut data[PD_UPPER..], upper as u16);
    LittleEndian::write_u16(&mut data[PD_SPECIAL..], BLOCK_SIZE as u16);
    LittleEndian::write_u16(
        &mut data[PD_PAGESIZE_VERSION..],
        (BLOCK_SIZE as u16) | 4,
    );
    data
}

/// A plain 4-byte-header varlena wrapping `payload`.
pub fn varlena_4b(payload: &[u8]) -> Vec<u8> {
    let mut v = vec![0u8; 4];
    LittleEndian::write_u32(&mut v[0..], ((payload.len() + 4) as u32) << 2);
    v.extend_from_slice(payload);
    v
}

/// A short 1-byte-header varlena wrapping `payload` (must stay under 127
/// total bytes).
pub fn varlena_short(payload: &[u8]) -> Vec<u8> {
    let total = payload.len() + 1;
    assert!(total < 0x80);
    let mut v = vec![((total as u8) << 1) | 1];
    v.extend_from_slice(payload);
    v
}

/// An 18-byte on-disk external TOAST pointer.
pub fn toast_pointer(raw_size: i32, extinfo: u32, value_id: u32, relid: u32) -> Vec<u8> {
    let mut v = vec![0x01u8, 18];
    let mut body = vec![0u8; 16];
    LittleEndian::write_i32(&mut body[0..], raw_size);
    LittleEndian::write_u32(&mut body[4..], extinfo);
    LittleEndian::write_u32(&mut body[8..], value_id);
    LittleEndian::write_u32(&mut body[12..], relid);
    v.extend_from_slice(&body);
    v
}

/// A TOAST chunk tuple: (value oid, chunk seq, bytea payload).
pub fn chunk_tuple(value_id: u32, seq: u32, payload: &[u8]) -> Vec<u8> {
    let mut body = vec![0u8; 8];
    LittleEndian::write_u32(&mut body[0..], value_id);
    LittleEndian::write_u32(&mut body[4..], seq);
    body.extend_from_slice(&varlena_4b(payload));
    heap_tuple(3, 0, &[], &body)
}

/// Compress a single-byte run with the pglz literal+match encoding.
///
/// Enough of a compressor to produce valid streams for round-trip tests:
/// one literal, then overlapping matches at offset 1. Match bytes pack the
/// length in the low nibble (3..17, or 18 plus an extension byte) and the
/// offset high bits in the high nibble.
pub fn pglz_compress_run(byte: u8, len: usize) -> Vec<u8> {
    assert!(len >= 4);
    let mut items: Vec<(bool, Vec<u8>)> = vec![(false, vec![byte])];
    let mut remaining = len - 1;
    while remaining > 0 {
        if remaining >= 18 {
            let take = remaining.min(18 + 255);
            items.push((true, vec![0x0F, 0x01, (take - 18) as u8]));
            remaining -= take;
        } else if remaining >= 3 {
            items.push((true, vec![(remaining - 3) as u8, 0x01]));
            remaining = 0;
        } else {
            items.push((false, vec![byte]));
            remaining -= 1;
        }
    }

    let mut out = Vec::new();
    for group in items.chunks(8) {
        let mut control = 0u8;
        for (i, (is_match, _)) in group.iter().enumerate() {
            if *is_match {
                control |= 1 << i;
            }
        }
        out.push(control);
        for (_, bytes) in group {
            out.extend_from_slice(bytes);
        }
    }
    out
}
