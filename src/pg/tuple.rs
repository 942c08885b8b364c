//! Item-level tuple interpretation.
//!
//! An item's bytes can hold one of several structures depending on what kind
//! of relation the block belongs to: a heap (data-row) tuple, an index entry,
//! an SP-GiST inner or leaf node, or — on GIN posting-tree leaves — a run of
//! item pointers, possibly varbyte-compressed. Each interpreter validates a
//! minimum-size floor before touching type-specific fields and cross-checks
//! the structure's self-reported size against the declared item length;
//! mismatches are reported by the caller, never fatal.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::pg::constants::*;

/// How to interpret an item's bytes.
///
/// Either forced by the user (`-x`/`-y`) or derived from the block's
/// classified special section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFormat {
    Heap,
    Index,
    SpGistInner,
    SpGistLeaf,
    /// GIN posting-tree leaf; true when the page is varbyte-compressed.
    GinPosting { compressed: bool },
}

/// A (block, offset) pair referencing one tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemPointer {
    pub block: u32,
    pub posid: u16,
}

impl ItemPointer {
    /// Parse a 6-byte item pointer (block hi/lo halves, then position).
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < SIZE_ITEM_POINTER {
            return None;
        }
        let hi = LittleEndian::read_u16(&data[0..]) as u32;
        let lo = LittleEndian::read_u16(&data[2..]) as u32;
        Some(ItemPointer {
            block: (hi << 16) | lo,
            posid: LittleEndian::read_u16(&data[4..]),
        })
    }
}

/// Parsed heap tuple header (23 fixed bytes + optional null bitmap).
#[derive(Debug, Clone, Serialize)]
pub struct HeapTuple {
    pub xmin: u32,
    pub xmax: u32,
    /// Command id or xvac, depending on the infomask.
    pub field3: u32,
    pub ctid: ItemPointer,
    pub infomask2: u16,
    pub infomask: u16,
    /// Offset to user data; always maxaligned in well-formed tuples.
    pub hoff: u8,
    /// Null bitmap bytes (empty unless HEAP_HASNULL).
    pub bits: Vec<u8>,
}

impl HeapTuple {
    /// Minimum item length for a heap tuple (maxaligned fixed header).
    pub const MIN_SIZE: usize = maxalign(SIZE_HEAP_TUPLE_HEADER);

    /// Parse a heap tuple header from an item's bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < SIZE_HEAP_TUPLE_HEADER {
            return None;
        }
        let infomask = LittleEndian::read_u16(&data[HEAP_T_INFOMASK..]);
        let infomask2 = LittleEndian::read_u16(&data[HEAP_T_INFOMASK2..]);
        let natts = (infomask2 & HEAP_NATTS_MASK) as usize;

        let bits = if infomask & HEAP_HASNULL != 0 {
            let len = bitmap_length(natts);
            data.get(HEAP_T_BITS..HEAP_T_BITS + len)?.to_vec()
        } else {
            Vec::new()
        };

        Some(HeapTuple {
            xmin: LittleEndian::read_u32(&data[HEAP_T_XMIN..]),
            xmax: LittleEndian::read_u32(&data[HEAP_T_XMAX..]),
            field3: LittleEndian::read_u32(&data[HEAP_T_FIELD3..]),
            ctid: ItemPointer::parse(&data[HEAP_T_CTID..])?,
            infomask2,
            infomask,
            hoff: data[HEAP_T_HOFF],
            bits,
        })
    }

    /// Declared attribute count (low bits of the second infomask).
    pub fn natts(&self) -> usize {
        (self.infomask2 & HEAP_NATTS_MASK) as usize
    }

    pub fn has_nulls(&self) -> bool {
        self.infomask & HEAP_HASNULL != 0
    }

    /// Header length implied by the flags, for the cross-check against hoff.
    pub fn computed_hoff(&self) -> usize {
        let bitmap = if self.has_nulls() {
            bitmap_length(self.natts())
        } else {
            0
        };
        maxalign(HEAP_T_BITS + bitmap)
    }

    /// True when the null bitmap marks attribute `attnum` (0-based) as null.
    ///
    /// A set bit means the attribute is present; a clear bit means null.
    pub fn att_is_null(&self, attnum: usize) -> bool {
        match self.bits.get(attnum >> 3) {
            Some(byte) => byte & (1 << (attnum & 0x07)) == 0,
            None => false,
        }
    }

    /// Readable names of the set infomask/infomask2 bits, pipe-joined.
    pub fn flag_names(&self) -> String {
        const MASK_NAMES: [(u16, &str); 15] = [
            (HEAP_HASNULL, "HASNULL"),
            (HEAP_HASVARWIDTH, "HASVARWIDTH"),
            (HEAP_HASEXTERNAL, "HASEXTERNAL"),
            (HEAP_XMAX_KEYSHR_LOCK, "XMAX_KEYSHR_LOCK"),
            (HEAP_COMBOCID, "COMBOCID"),
            (HEAP_XMAX_EXCL_LOCK, "XMAX_EXCL_LOCK"),
            (HEAP_XMAX_LOCK_ONLY, "XMAX_LOCK_ONLY"),
            (HEAP_XMIN_COMMITTED, "XMIN_COMMITTED"),
            (HEAP_XMIN_INVALID, "XMIN_INVALID"),
            (HEAP_XMAX_COMMITTED, "XMAX_COMMITTED"),
            (HEAP_XMAX_INVALID, "XMAX_INVALID"),
            (HEAP_XMAX_IS_MULTI, "XMAX_IS_MULTI"),
            (HEAP_UPDATED, "UPDATED"),
            (HEAP_MOVED_OFF, "MOVED_OFF"),
            (HEAP_MOVED_IN, "MOVED_IN"),
        ];
        const MASK2_NAMES: [(u16, &str); 3] = [
            (HEAP_KEYS_UPDATED, "KEYS_UPDATED"),
            (HEAP_HOT_UPDATED, "HOT_UPDATED"),
            (HEAP_ONLY_TUPLE, "HEAP_ONLY"),
        ];

        let mut names = Vec::new();
        for (mask, name) in MASK_NAMES {
            if self.infomask & mask != 0 {
                names.push(name);
            }
        }
        for (mask, name) in MASK2_NAMES {
            if self.infomask2 & mask != 0 {
                names.push(name);
            }
        }
        names.join("|")
    }
}

/// Length in bytes of a null bitmap covering `natts` attributes.
pub fn bitmap_length(natts: usize) -> usize {
    natts.div_ceil(8)
}

/// Parsed index tuple header (8 bytes).
#[derive(Debug, Clone, Serialize)]
pub struct IndexTuple {
    pub tid: ItemPointer,
    pub info: u16,
}

impl IndexTuple {
    /// Minimum item length for an index tuple (just the item pointer).
    pub const MIN_SIZE: usize = SIZE_ITEM_POINTER;

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < SIZE_INDEX_TUPLE_HEADER {
            return None;
        }
        Some(IndexTuple {
            tid: ItemPointer::parse(data)?,
            info: LittleEndian::read_u16(&data[SIZE_ITEM_POINTER..]),
        })
    }

    /// Self-reported total size (low 13 bits of t_info).
    pub fn size(&self) -> usize {
        (self.info & INDEX_SIZE_MASK) as usize
    }

    pub fn has_nulls(&self) -> bool {
        self.info & INDEX_NULL_MASK != 0
    }

    pub fn has_varwidths(&self) -> bool {
        self.info & INDEX_VAR_MASK != 0
    }
}

/// SP-GiST tuple states, shared by inner and leaf tuples.
pub const SPGIST_TUPSTATES: [&str; 4] = ["LIVE", "REDIRECT", "DEAD", "PLACEHOLDER"];

/// Parsed SP-GiST inner tuple header.
///
/// The first word packs `tupstate:2, allTheSame:1, nNodes:13, prefixSize:16`.
#[derive(Debug, Clone, Serialize)]
pub struct SpGistInnerTuple {
    pub tupstate: u8,
    pub all_the_same: bool,
    pub n_nodes: u16,
    pub prefix_size: u16,
    pub size: u16,
}

impl SpGistInnerTuple {
    pub const MIN_SIZE: usize = SGIT_HDR_SIZE;

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < SGIT_HDR_SIZE {
            return None;
        }
        let word = LittleEndian::read_u32(&data[0..]);
        Some(SpGistInnerTuple {
            tupstate: (word & 0x03) as u8,
            all_the_same: word & 0x04 != 0,
            n_nodes: ((word >> 3) & 0x1FFF) as u16,
            prefix_size: (word >> 16) as u16,
            size: LittleEndian::read_u16(&data[4..]),
        })
    }

    pub fn state_name(&self) -> &'static str {
        SPGIST_TUPSTATES[self.tupstate as usize]
    }

    /// Walk the node (downlink) list, calling `visit` per node.
    ///
    /// Nodes are index tuples laid out back to back after the prefix. The
    /// walk is bounded: it stops the instant a computed offset would exceed
    /// `data`, and after any node whose size loses max-alignment, since the
    /// remaining offsets would be garbage.
    pub fn for_each_node<F>(&self, data: &[u8], mut visit: F)
    where
        F: FnMut(usize, usize, &IndexTuple),
    {
        let mut off = SGIT_HDR_SIZE + self.prefix_size as usize;
        for i in 0..self.n_nodes as usize {
            if off + SGNT_HDR_SIZE > data.len() {
                break;
            }
            let Some(node) = IndexTuple::parse(&data[off..]) else {
                break;
            };
            visit(i, off, &node);
            if node.size() != maxalign(node.size()) {
                break;
            }
            off += node.size();
        }
    }
}

/// Parsed SP-GiST leaf tuple header.
///
/// The first word packs `tupstate:2, size:30`.
#[derive(Debug, Clone, Serialize)]
pub struct SpGistLeafTuple {
    pub tupstate: u8,
    pub size: u32,
    pub next_offset: u16,
    pub heap_ptr: ItemPointer,
}

impl SpGistLeafTuple {
    pub const MIN_SIZE: usize = SGLT_HDR_SIZE;

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < SGLT_HDR_SIZE {
            return None;
        }
        let word = LittleEndian::read_u32(&data[0..]);
        Some(SpGistLeafTuple {
            tupstate: (word & 0x03) as u8,
            size: word >> 2,
            next_offset: LittleEndian::read_u16(&data[4..]),
            heap_ptr: ItemPointer::parse(&data[6..])?,
        })
    }

    pub fn state_name(&self) -> &'static str {
        SPGIST_TUPSTATES[self.tupstate as usize]
    }
}

/// One segment of a compressed GIN posting list.
#[derive(Debug, Clone, Serialize)]
pub struct GinPostingSegment {
    /// First item pointer, stored in full.
    pub first: ItemPointer,
    /// Item pointers reconstructed from the varbyte deltas, `first` included.
    pub pointers: Vec<ItemPointer>,
    /// Bytes consumed from the item, including the segment header.
    pub consumed: usize,
}

fn itemptr_from_packed(val: u64) -> ItemPointer {
    ItemPointer {
        block: (val >> GIN_ITEMPTR_OFFSET_BITS) as u32,
        posid: (val & ((1 << GIN_ITEMPTR_OFFSET_BITS) - 1)) as u16,
    }
}

fn itemptr_to_packed(ptr: ItemPointer) -> u64 {
    ((ptr.block as u64) << GIN_ITEMPTR_OFFSET_BITS) | ptr.posid as u64
}

/// Decode one compressed posting-list segment.
///
/// Layout: a full 6-byte first pointer, a u16 byte count, then that many
/// bytes of 7-bit-group varints. Each varint is a delta added to the running
/// packed value of the previous pointer. Returns `None` when the declared
/// byte count overruns `data` or a varint is cut short.
pub fn decode_posting_segment(data: &[u8]) -> Option<GinPostingSegment> {
    if data.len() < SIZE_ITEM_POINTER + 2 {
        return None;
    }
    let first = ItemPointer::parse(data)?;
    let nbytes = LittleEndian::read_u16(&data[SIZE_ITEM_POINTER..]) as usize;
    let header = SIZE_ITEM_POINTER + 2;
    let bytes = data.get(header..header + nbytes)?;

    let mut pointers = vec![first];
    let mut val = itemptr_to_packed(first);
    let mut i = 0;
    while i < bytes.len() {
        let mut delta: u64 = 0;
        let mut shift = 0;
        loop {
            let b = *bytes.get(i)?;
            i += 1;
            delta |= ((b & 0x7F) as u64) << shift;
            if b & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift > 63 {
                return None;
            }
        }
        val = val.wrapping_add(delta);
        pointers.push(itemptr_from_packed(val));
    }

    Some(GinPostingSegment {
        first,
        pointers,
        consumed: header + nbytes,
    })
}

/// Decode an uncompressed posting array: back-to-back 6-byte item pointers.
pub fn decode_posting_array(data: &[u8]) -> Vec<ItemPointer> {
    data.chunks_exact(SIZE_ITEM_POINTER)
        .filter_map(ItemPointer::parse)
        .collect()
}
