/// PostgreSQL page and file structure constants.
///
/// These values are derived from the PostgreSQL source code headers:
/// - bufpage.h (page header, item identifiers)
/// - htup_details.h (heap tuple header, infomask bits)
/// - itup.h (index tuple header)
/// - nbtree.h / hash.h / gist.h / gin_private.h / spgist_private.h
///   (special-section layouts and page-id tags)
// Block sizes
pub const BLCKSZ_DEFAULT: u32 = 8192;
pub const RELSEG_SIZE: u32 = 131072; // blocks per segment file

// Page header (24 bytes total, layout version 4)
pub const SIZE_PAGE_HEADER: usize = 24;
pub const PD_LSN: usize = 0; // 8 bytes - LSN of last change (xlogid + xrecoff)
pub const PD_CHECKSUM: usize = 8; // 2 bytes - page checksum
pub const PD_FLAGS: usize = 10; // 2 bytes - flag bits
pub const PD_LOWER: usize = 12; // 2 bytes - offset to start of free space
pub const PD_UPPER: usize = 14; // 2 bytes - offset to end of free space
pub const PD_SPECIAL: usize = 16; // 2 bytes - offset to start of special section
pub const PD_PAGESIZE_VERSION: usize = 18; // 2 bytes - size (high byte) | layout version
pub const PD_PRUNE_XID: usize = 20; // 4 bytes - oldest prunable XID, or zero
pub const PD_LINP: usize = 24; // item identifier array begins here

/// Only page layout generation supported by this crate.
pub const PAGE_LAYOUT_VERSION: u16 = 4;

// pd_flags bits
pub const PD_HAS_FREE_LINES: u16 = 0x0001;
pub const PD_PAGE_FULL: u16 = 0x0002;
pub const PD_ALL_VISIBLE: u16 = 0x0004;

// Item identifiers (4 bytes: lp_off:15, lp_flags:2, lp_len:15)
pub const SIZE_ITEM_ID: usize = 4;
pub const LP_UNUSED: u8 = 0;
pub const LP_NORMAL: u8 = 1;
pub const LP_REDIRECT: u8 = 2;
pub const LP_DEAD: u8 = 3;

// Maximum alignment of the targeted generation (64-bit builds)
pub const MAXIMUM_ALIGNOF: usize = 8;

/// Round `len` up to the next multiple of [`MAXIMUM_ALIGNOF`].
pub const fn maxalign(len: usize) -> usize {
    (len + MAXIMUM_ALIGNOF - 1) & !(MAXIMUM_ALIGNOF - 1)
}

// Heap tuple header (23 bytes fixed part + null bitmap)
pub const SIZE_HEAP_TUPLE_HEADER: usize = 23;
pub const HEAP_T_XMIN: usize = 0; // 4 bytes - inserting transaction
pub const HEAP_T_XMAX: usize = 4; // 4 bytes - deleting/locking transaction
pub const HEAP_T_FIELD3: usize = 8; // 4 bytes - command id or xvac
pub const HEAP_T_CTID: usize = 12; // 6 bytes - current or newer tuple version
pub const HEAP_T_INFOMASK2: usize = 18; // 2 bytes - attribute count + flags
pub const HEAP_T_INFOMASK: usize = 20; // 2 bytes - flags
pub const HEAP_T_HOFF: usize = 22; // 1 byte - offset to user data
pub const HEAP_T_BITS: usize = 23; // null bitmap begins here when present

pub const HEAP_NATTS_MASK: u16 = 0x07FF;

// t_infomask bits
pub const HEAP_HASNULL: u16 = 0x0001;
pub const HEAP_HASVARWIDTH: u16 = 0x0002;
pub const HEAP_HASEXTERNAL: u16 = 0x0004;
pub const HEAP_XMAX_KEYSHR_LOCK: u16 = 0x0010;
pub const HEAP_COMBOCID: u16 = 0x0020;
pub const HEAP_XMAX_EXCL_LOCK: u16 = 0x0040;
pub const HEAP_XMAX_LOCK_ONLY: u16 = 0x0080;
pub const HEAP_XMIN_COMMITTED: u16 = 0x0100;
pub const HEAP_XMIN_INVALID: u16 = 0x0200;
pub const HEAP_XMAX_COMMITTED: u16 = 0x0400;
pub const HEAP_XMAX_INVALID: u16 = 0x0800;
pub const HEAP_XMAX_IS_MULTI: u16 = 0x1000;
pub const HEAP_UPDATED: u16 = 0x2000;
pub const HEAP_MOVED_OFF: u16 = 0x4000;
pub const HEAP_MOVED_IN: u16 = 0x8000;

// t_infomask2 bits
pub const HEAP_KEYS_UPDATED: u16 = 0x2000;
pub const HEAP_HOT_UPDATED: u16 = 0x4000;
pub const HEAP_ONLY_TUPLE: u16 = 0x8000;

// Index tuple header (6-byte item pointer + 2-byte t_info)
pub const SIZE_INDEX_TUPLE_HEADER: usize = 8;
pub const SIZE_ITEM_POINTER: usize = 6;
pub const INDEX_SIZE_MASK: u16 = 0x1FFF;
pub const INDEX_VAR_MASK: u16 = 0x4000;
pub const INDEX_NULL_MASK: u16 = 0x8000;

// Special-section sizes after maxalign (64-bit layout).
// Sequence/SP-GiST/GIN share 8 bytes; B-tree/hash/GiST share 16.
pub const SPEC_SIZE_SMALL: usize = 8;
pub const SPEC_SIZE_LARGE: usize = 16;

// Probe tags found in the last two bytes of a full block
pub const SEQUENCE_MAGIC: u32 = 0x1717;
pub const SPGIST_PAGE_ID: u16 = 0xFF82;
pub const GIST_PAGE_ID: u16 = 0xFF81;
pub const HASHO_PAGE_ID: u16 = 0xFFF0;
pub const MAX_BT_CYCLE_ID: u16 = 0xFF7F;

// B-tree special flags (btpo_flags)
pub const BTP_LEAF: u16 = 0x0001;
pub const BTP_ROOT: u16 = 0x0002;
pub const BTP_DELETED: u16 = 0x0004;
pub const BTP_META: u16 = 0x0008;
pub const BTP_HALF_DEAD: u16 = 0x0010;
pub const BTP_SPLIT_END: u16 = 0x0020;
pub const BTP_HAS_GARBAGE: u16 = 0x0040;
pub const BTP_INCOMPLETE_SPLIT: u16 = 0x0080;

pub const BTREE_MAGIC: u32 = 0x053162;
pub const SIZE_BTREE_META: usize = 24; // magic..fastlevel, excluding trailing cleanup fields

// Hash special flags (hasho_flag)
pub const LH_OVERFLOW_PAGE: u16 = 0x0001;
pub const LH_BUCKET_PAGE: u16 = 0x0002;
pub const LH_BITMAP_PAGE: u16 = 0x0004;
pub const LH_META_PAGE: u16 = 0x0008;

// GiST special flags
pub const F_LEAF: u16 = 0x0001;
pub const F_DELETED: u16 = 0x0002;
pub const F_TUPLES_DELETED: u16 = 0x0004;
pub const F_FOLLOW_RIGHT: u16 = 0x0008;
pub const F_HAS_GARBAGE: u16 = 0x0010;

// GIN special flags
pub const GIN_DATA: u16 = 0x0001;
pub const GIN_LEAF: u16 = 0x0002;
pub const GIN_DELETED: u16 = 0x0004;
pub const GIN_META: u16 = 0x0008;
pub const GIN_LIST: u16 = 0x0010;
pub const GIN_LIST_FULLROW: u16 = 0x0020;
pub const GIN_INCOMPLETE_SPLIT: u16 = 0x0040;
pub const GIN_COMPRESSED: u16 = 0x0080;

// SP-GiST special flags
pub const SPGIST_META: u16 = 0x0001;
pub const SPGIST_DELETED: u16 = 0x0002;
pub const SPGIST_LEAF: u16 = 0x0004;
pub const SPGIST_NULLS: u16 = 0x0008;

// SP-GiST tuple header sizes (maxaligned)
pub const SGIT_HDR_SIZE: usize = 8; // inner tuple header
pub const SGLT_HDR_SIZE: usize = 16; // leaf tuple header
pub const SGNT_HDR_SIZE: usize = 8; // node tuple header (an index tuple)

// GIN posting lists: item pointers pack into (block << 11) | offset
pub const GIN_ITEMPTR_OFFSET_BITS: u64 = 11;

// Varlena headers (little-endian storage)
pub const VARHDRSZ: usize = 4;
pub const VARHDRSZ_SHORT: usize = 1;
pub const VARHDRSZ_EXTERNAL: usize = 2;
pub const VARTAG_INDIRECT: u8 = 1;
pub const VARTAG_EXPANDED_RO: u8 = 2;
pub const VARTAG_EXPANDED_RW: u8 = 3;
pub const VARTAG_ONDISK: u8 = 18;

// va_extinfo / va_tcinfo: 30-bit size plus 2-bit compression method (PG14+)
pub const VARLENA_EXTSIZE_BITS: u32 = 30;
pub const VARLENA_EXTSIZE_MASK: u32 = (1 << VARLENA_EXTSIZE_BITS) - 1;
pub const TOAST_PGLZ_COMPRESSION_ID: u32 = 0;
pub const TOAST_LZ4_COMPRESSION_ID: u32 = 1;

/// Largest chunk payload stored in a TOAST relation (8 KiB blocks).
pub const TOAST_MAX_CHUNK_SIZE: u32 = 1996;

// Date/time storage: microsecond counts from the 2000-01-01 epoch
pub const POSTGRES_EPOCH_JDATE: i32 = 2451545;
pub const USECS_PER_DAY: i64 = 86_400_000_000;
pub const DT_NOBEGIN: i64 = i64::MIN;
pub const DT_NOEND: i64 = i64::MAX;

pub const NAMEDATALEN: usize = 64;

// pg_filenode.map decoding
pub const RELMAP_FILE_SIZE: usize = 512;
pub const RELMAP_MAGIC: u32 = 0x592717;
pub const RELMAP_MAX_MAPPINGS: usize = 62;

/// Bytes shown per hex dump line.
pub const BYTES_PER_LINE: usize = 16;
