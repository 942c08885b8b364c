//! Page header and item array parsing.
//!
//! Every PostgreSQL page begins with a 24-byte header ([`PageHeader`])
//! holding the LSN, checksum, flag bits, the lower/upper free-space
//! boundaries, the special-section offset, and the combined
//! page-size/layout-version word. The item identifier (line pointer) array
//! ([`ItemId`]) follows immediately and grows toward `pd_lower`.
//!
//! Header validation is deliberately non-fatal: a block that fails the sanity
//! checks still gets formatted so the operator can see the damage.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::pg::constants::*;

/// Parsed page header (24 bytes, present at the start of every page).
#[derive(Debug, Clone, Serialize)]
pub struct PageHeader {
    /// LSN of the last change to this page, split for display. Bytes 0-7.
    pub lsn_logid: u32,
    pub lsn_recoff: u32,
    /// Page checksum, zero when checksums are disabled. Bytes 8-9.
    pub checksum: u16,
    /// Flag bits (HAS_FREE_LINES, PAGE_FULL, ALL_VISIBLE). Bytes 10-11.
    pub flags: u16,
    /// Offset to the start of free space (end of the item array). Bytes 12-13.
    pub lower: u16,
    /// Offset to the end of free space. Bytes 14-15.
    pub upper: u16,
    /// Offset to the start of the special section. Bytes 16-17.
    pub special: u16,
    /// Page size in the high byte, layout version in the low byte. Bytes 18-19.
    pub pagesize_version: u16,
    /// Oldest prunable XID on the page, or zero. Bytes 20-23.
    pub prune_xid: u32,
}

impl PageHeader {
    /// Parse a page header from a byte slice.
    ///
    /// The slice must be at least SIZE_PAGE_HEADER (24) bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < SIZE_PAGE_HEADER {
            return None;
        }

        Some(PageHeader {
            lsn_logid: LittleEndian::read_u32(&data[PD_LSN..]),
            lsn_recoff: LittleEndian::read_u32(&data[PD_LSN + 4..]),
            checksum: LittleEndian::read_u16(&data[PD_CHECKSUM..]),
            flags: LittleEndian::read_u16(&data[PD_FLAGS..]),
            lower: LittleEndian::read_u16(&data[PD_LOWER..]),
            upper: LittleEndian::read_u16(&data[PD_UPPER..]),
            special: LittleEndian::read_u16(&data[PD_SPECIAL..]),
            pagesize_version: LittleEndian::read_u16(&data[PD_PAGESIZE_VERSION..]),
            prune_xid: LittleEndian::read_u32(&data[PD_PRUNE_XID..]),
        })
    }

    /// Page size recorded in the header (high byte of `pd_pagesize_version`).
    pub fn page_size(&self) -> u32 {
        (self.pagesize_version & 0xFF00) as u32
    }

    /// Page layout version (low byte of `pd_pagesize_version`).
    pub fn layout_version(&self) -> u16 {
        self.pagesize_version & 0x00FF
    }

    /// Number of item identifiers implied by `pd_lower`.
    ///
    /// Negative intermediate values (a `pd_lower` smaller than the header)
    /// come back as a negative count so callers can report corruption the
    /// same way the block's other bounds are reported.
    pub fn max_offset(&self) -> i32 {
        (self.lower as i32 - PD_LINP as i32) / SIZE_ITEM_ID as i32
    }

    /// Readable names of the set `pd_flags` bits, pipe-joined.
    pub fn flag_names(&self) -> String {
        let mut names = Vec::new();
        if self.flags & PD_HAS_FREE_LINES != 0 {
            names.push("HAS_FREE_LINES");
        }
        if self.flags & PD_PAGE_FULL != 0 {
            names.push("PAGE_FULL");
        }
        if self.flags & PD_ALL_VISIBLE != 0 {
            names.push("ALL_VISIBLE");
        }
        names.join("|")
    }

    /// Sanity-check the header fields against the block size.
    ///
    /// Returns true when everything holds: maximum item offset within range,
    /// supported layout version, and lower ≤ upper ≤ special ≤ block size
    /// with a lower that leaves room for the fixed header. Violations are the
    /// caller's to report; they never abort a scan.
    pub fn is_sane(&self, block_size: u32) -> bool {
        let max_offset = self.max_offset();
        !(max_offset < 0
            || max_offset > block_size as i32
            || self.layout_version() != PAGE_LAYOUT_VERSION
            || (self.upper as u32) > block_size
            || self.upper > self.special
            || (self.lower as usize) < SIZE_PAGE_HEADER - SIZE_ITEM_ID
            || (self.lower as u32) > block_size
            || self.upper < self.lower
            || (self.special as u32) > block_size)
    }
}

/// One entry of the item identifier (line pointer) array.
///
/// Packed into 4 bytes as `lp_off:15, lp_flags:2, lp_len:15`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ItemId {
    /// Byte offset of the item payload within the block.
    pub offset: u16,
    /// Item state: unused, normal, HOT redirect, or dead.
    pub flags: u8,
    /// Payload length in bytes.
    pub length: u16,
}

impl ItemId {
    /// Parse the item identifier at 1-based position `index`.
    ///
    /// Returns `None` when the array entry lies beyond `data`.
    pub fn parse(data: &[u8], index: usize) -> Option<Self> {
        let start = PD_LINP + (index - 1) * SIZE_ITEM_ID;
        if data.len() < start + SIZE_ITEM_ID {
            return None;
        }
        let word = LittleEndian::read_u32(&data[start..]);
        Some(ItemId {
            offset: (word & 0x7FFF) as u16,
            flags: ((word >> 15) & 0x03) as u8,
            length: ((word >> 17) & 0x7FFF) as u16,
        })
    }

    /// Readable name of the state flag; raw hex for impossible values.
    pub fn flag_name(&self) -> String {
        match self.flags {
            LP_UNUSED => "UNUSED".to_string(),
            LP_NORMAL => "NORMAL".to_string(),
            LP_REDIRECT => "REDIRECT".to_string(),
            LP_DEAD => "DEAD".to_string(),
            other => format!("0x{:02x}", other),
        }
    }
}

/// B-tree metapage contents (follows the page header on a meta page).
#[derive(Debug, Clone, Serialize)]
pub struct BtreeMeta {
    pub magic: u32,
    pub version: u32,
    pub root: u32,
    pub level: u32,
    pub fastroot: u32,
    pub fastlevel: u32,
}

impl BtreeMeta {
    /// Parse the metapage block that replaces items on a B-tree meta page.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let base = maxalign(SIZE_PAGE_HEADER);
        if data.len() < base + SIZE_BTREE_META {
            return None;
        }
        let meta = &data[base..];
        Some(BtreeMeta {
            magic: LittleEndian::read_u32(&meta[0..]),
            version: LittleEndian::read_u32(&meta[4..]),
            root: LittleEndian::read_u32(&meta[8..]),
            level: LittleEndian::read_u32(&meta[12..]),
            fastroot: LittleEndian::read_u32(&meta[16..]),
            fastlevel: LittleEndian::read_u32(&meta[20..]),
        })
    }
}

/// Check whether a fully read block is a B-tree meta page.
///
/// The special section must have the B-tree size, a believable cycle id, and
/// the BTP_META flag. The cycle-id ceiling check matters because hash and
/// GiST special sections are the same size.
pub fn is_btree_meta_page(data: &[u8], header: &PageHeader, block_size: u32, bytes_read: usize) -> bool {
    if bytes_read != block_size as usize {
        return false;
    }
    let special = header.special as usize;
    if (block_size as usize).checked_sub(special) != Some(SPEC_SIZE_LARGE)
        || data.len() < special + SPEC_SIZE_LARGE
    {
        return false;
    }
    let flags = LittleEndian::read_u16(&data[special + 12..]);
    let cycle_id = LittleEndian::read_u16(&data[special + 14..]);
    cycle_id <= MAX_BT_CYCLE_ID && flags & BTP_META != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_header_bytes(
        lsn: (u32, u32),
        checksum: u16,
        flags: u16,
        lower: u16,
        upper: u16,
        special: u16,
        pagesize_version: u16,
        prune_xid: u32,
    ) -> Vec<u8> {
        let mut buf = vec![0u8; SIZE_PAGE_HEADER];
        LittleEndian::write_u32(&mut buf[PD_LSN..], lsn.0);
        LittleEndian::write_u32(&mut buf[PD_LSN + 4..], lsn.1);
        LittleEndian::write_u16(&mut buf[PD_CHECKSUM..], checksum);
        LittleEndian::write_u16(&mut buf[PD_FLAGS..], flags);
        LittleEndian::write_u16(&mut buf[PD_LOWER..], lower);
        LittleEndian::write_u16(&mut buf[PD_UPPER..], upper);
        LittleEndian::write_u16(&mut buf[PD_SPECIAL..], special);
        LittleEndian::write_u16(&mut buf[PD_PAGESIZE_VERSION..], pagesize_version);
        LittleEndian::write_u32(&mut buf[PD_PRUNE_XID..], prune_xid);
        buf
    }

    #[test]
    fn test_header_parse() {
        let data = make_header_bytes(
            (7, 0x1234),
            0xBEEF,
            PD_ALL_VISIBLE,
            28,
            8000,
            8176,
            8192 | 4,
            99,
        );
        let hdr = PageHeader::parse(&data).unwrap();
        assert_eq!(hdr.lsn_logid, 7);
        assert_eq!(hdr.lsn_recoff, 0x1234);
        assert_eq!(hdr.checksum, 0xBEEF);
        assert_eq!(hdr.lower, 28);
        assert_eq!(hdr.upper, 8000);
        assert_eq!(hdr.special, 8176);
        assert_eq!(hdr.page_size(), 8192);
        assert_eq!(hdr.layout_version(), 4);
        assert_eq!(hdr.prune_xid, 99);
        assert_eq!(hdr.max_offset(), 1);
        assert_eq!(hdr.flag_names(), "ALL_VISIBLE");
    }

    #[test]
    fn test_header_too_short() {
        assert!(PageHeader::parse(&[0u8; 10]).is_none());
    }

    #[test]
    fn test_sane_header_passes() {
        // lower <= upper <= special <= block size, version 4
        let data = make_header_bytes((0, 0), 0, 0, 28, 8000, 8176, 8192 | 4, 0);
        let hdr = PageHeader::parse(&data).unwrap();
        assert!(hdr.is_sane(8192));
    }

    #[test]
    fn test_inverted_bounds_fail() {
        let data = make_header_bytes((0, 0), 0, 0, 8000, 28, 8176, 8192 | 4, 0);
        let hdr = PageHeader::parse(&data).unwrap();
        assert!(!hdr.is_sane(8192));
    }

    #[test]
    fn test_wrong_layout_version_fails() {
        let data = make_header_bytes((0, 0), 0, 0, 28, 8000, 8176, 8192 | 3, 0);
        let hdr = PageHeader::parse(&data).unwrap();
        assert!(!hdr.is_sane(8192));
    }

    #[test]
    fn test_special_past_block_fails() {
        let data = make_header_bytes((0, 0), 0, 0, 28, 8000, 9000, 8192 | 4, 0);
        let hdr = PageHeader::parse(&data).unwrap();
        assert!(!hdr.is_sane(8192));
    }

    #[test]
    fn test_item_id_parse() {
        let mut data = vec![0u8; PD_LINP + 8];
        // offset 8000, flags NORMAL, length 25
        let word: u32 = 8000 | ((LP_NORMAL as u32) << 15) | (25 << 17);
        LittleEndian::write_u32(&mut data[PD_LINP..], word);

        let item = ItemId::parse(&data, 1).unwrap();
        assert_eq!(item.offset, 8000);
        assert_eq!(item.flags, LP_NORMAL);
        assert_eq!(item.length, 25);
        assert_eq!(item.flag_name(), "NORMAL");
    }

    #[test]
    fn test_item_id_beyond_buffer() {
        let data = vec![0u8; PD_LINP + 4];
        assert!(ItemId::parse(&data, 1).is_some());
        assert!(ItemId::parse(&data, 2).is_none());
    }

    #[test]
    fn test_btree_meta_detection() {
        let block_size = 8192u32;
        let special = block_size as usize - SPEC_SIZE_LARGE;
        let mut data = vec![0u8; block_size as usize];
        LittleEndian::write_u16(&mut data[PD_SPECIAL..], special as u16);
        LittleEndian::write_u16(&mut data[PD_PAGESIZE_VERSION..], 8192 | 4);
        LittleEndian::write_u16(&mut data[special + 12..], BTP_META);
        LittleEndian::write_u16(&mut data[special + 14..], 0);

        let base = maxalign(SIZE_PAGE_HEADER);
        LittleEndian::write_u32(&mut data[base..], BTREE_MAGIC);
        LittleEndian::write_u32(&mut data[base + 4..], 4);
        LittleEndian::write_u32(&mut data[base + 8..], 3);

        let hdr = PageHeader::parse(&data).unwrap();
        assert!(is_btree_meta_page(&data, &hdr, block_size, block_size as usize));

        let meta = BtreeMeta::parse(&data).unwrap();
        assert_eq!(meta.magic, BTREE_MAGIC);
        assert_eq!(meta.version, 4);
        assert_eq!(meta.root, 3);

        // Partial block: never treated as a meta page
        assert!(!is_btree_meta_page(&data, &hdr, block_size, 100));
    }
}
