//! Special-section classification and parsing.
//!
//! The trailing region of a PostgreSQL page carries access-method metadata
//! whose shape depends on the index kind — and the region is not uniformly
//! self-describing. Classification therefore works by size class plus two
//! probe bytes at the very end of a fully read block: sequences carry a magic
//! word at the special offset, SP-GiST/GiST/hash pages carry a page-id tag in
//! the last two bytes, and B-tree pages are recognized by a vacuum cycle id
//! that never exceeds [`MAX_BT_CYCLE_ID`]. The probe order is load-bearing;
//! do not reorder the arms of [`classify`].

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::pg::constants::*;
use crate::pg::page::PageHeader;

/// Classified contents of a page's special section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpecialKind {
    /// No special section on the block.
    None,
    /// Sequence info in the special section.
    Sequence,
    /// B-tree index info in the special section.
    Btree,
    /// Hash index info in the special section.
    Hash,
    /// GiST index info in the special section.
    Gist,
    /// GIN index info in the special section.
    Gin,
    /// SP-GiST index info in the special section.
    SpGist,
    /// Size/tag combination matching no known kind.
    Unknown,
    /// Special offset points outside the block or the bytes actually read.
    ErrorBoundary,
}

/// Determine the contents of the special section on a block.
///
/// `bytes_read` is the number of bytes actually obtained for this block; the
/// trailing probe bytes are only examined when the block was fully read.
/// Several kinds share identical special-section sizes, so the
/// disambiguation order below is replicated exactly from the on-disk format
/// rules of the targeted generation.
pub fn classify(data: &[u8], header: &PageHeader, block_size: u32, bytes_read: usize) -> SpecialKind {
    // A partial header tells us nothing about the special section.
    if bytes_read <= SIZE_PAGE_HEADER {
        return SpecialKind::Unknown;
    }

    let special = header.special as usize;
    if special == 0 || special > block_size as usize || special > bytes_read {
        return SpecialKind::ErrorBoundary;
    }

    let size = block_size as usize - special;
    let full_block = bytes_read == block_size as usize;

    // Trailing two bytes of the page, used to identify several index kinds.
    let probe = if full_block && data.len() >= block_size as usize {
        LittleEndian::read_u16(&data[block_size as usize - 2..])
    } else {
        0
    };

    if size == 0 {
        return SpecialKind::None;
    }

    if size == SPEC_SIZE_SMALL {
        // Sequence, SP-GiST, and GIN all maxalign to the same size; the
        // sequence magic sits at the special offset, the SP-GiST page id in
        // the probe bytes, and GIN is what remains.
        if !full_block {
            return SpecialKind::Unknown;
        }
        let special_value = LittleEndian::read_u32(&data[special..]);
        if special_value == SEQUENCE_MAGIC {
            SpecialKind::Sequence
        } else if probe == SPGIST_PAGE_ID {
            SpecialKind::SpGist
        } else {
            SpecialKind::Gin
        }
    } else if size > 2 && full_block {
        // B-tree, hash, and GiST share the large size class; the last two
        // bytes of the section tell them apart.
        if probe <= MAX_BT_CYCLE_ID && size == SPEC_SIZE_LARGE {
            SpecialKind::Btree
        } else if probe == HASHO_PAGE_ID && size == SPEC_SIZE_LARGE {
            SpecialKind::Hash
        } else if probe == GIST_PAGE_ID && size == SPEC_SIZE_LARGE {
            SpecialKind::Gist
        } else {
            SpecialKind::Unknown
        }
    } else {
        SpecialKind::Unknown
    }
}

/// Parsed B-tree special section (16 bytes).
#[derive(Debug, Clone, Serialize)]
pub struct BtreeSpecial {
    pub prev: u32,
    pub next: u32,
    /// Tree level for live pages; next-xid for deleted ones.
    pub level_or_xact: u32,
    pub flags: u16,
    pub cycle_id: u16,
}

impl BtreeSpecial {
    pub fn parse(data: &[u8], special: usize) -> Option<Self> {
        let s = data.get(special..special + SPEC_SIZE_LARGE)?;
        Some(BtreeSpecial {
            prev: LittleEndian::read_u32(&s[0..]),
            next: LittleEndian::read_u32(&s[4..]),
            level_or_xact: LittleEndian::read_u32(&s[8..]),
            flags: LittleEndian::read_u16(&s[12..]),
            cycle_id: LittleEndian::read_u16(&s[14..]),
        })
    }

    pub fn is_deleted(&self) -> bool {
        self.flags & BTP_DELETED != 0
    }

    pub fn flag_names(&self) -> String {
        let mut names = Vec::new();
        if self.flags & BTP_LEAF != 0 {
            names.push("LEAF");
        }
        if self.flags & BTP_ROOT != 0 {
            names.push("ROOT");
        }
        if self.flags & BTP_DELETED != 0 {
            names.push("DELETED");
        }
        if self.flags & BTP_META != 0 {
            names.push("META");
        }
        if self.flags & BTP_HALF_DEAD != 0 {
            names.push("HALFDEAD");
        }
        if self.flags & BTP_SPLIT_END != 0 {
            names.push("SPLITEND");
        }
        if self.flags & BTP_HAS_GARBAGE != 0 {
            names.push("HASGARBAGE");
        }
        if self.flags & BTP_INCOMPLETE_SPLIT != 0 {
            names.push("INCOMPLETESPLIT");
        }
        names.join("|")
    }
}

/// Parsed hash special section (16 bytes).
#[derive(Debug, Clone, Serialize)]
pub struct HashSpecial {
    pub prev_blkno: u32,
    pub next_blkno: u32,
    pub bucket: u32,
    pub flags: u16,
    pub page_id: u16,
}

impl HashSpecial {
    pub fn parse(data: &[u8], special: usize) -> Option<Self> {
        let s = data.get(special..special + SPEC_SIZE_LARGE)?;
        Some(HashSpecial {
            prev_blkno: LittleEndian::read_u32(&s[0..]),
            next_blkno: LittleEndian::read_u32(&s[4..]),
            bucket: LittleEndian::read_u32(&s[8..]),
            flags: LittleEndian::read_u16(&s[12..]),
            page_id: LittleEndian::read_u16(&s[14..]),
        })
    }

    pub fn flag_names(&self) -> String {
        if self.flags == 0 {
            return "UNUSED".to_string();
        }
        let mut names = Vec::new();
        if self.flags & LH_OVERFLOW_PAGE != 0 {
            names.push("OVERFLOW");
        }
        if self.flags & LH_BUCKET_PAGE != 0 {
            names.push("BUCKET");
        }
        if self.flags & LH_BITMAP_PAGE != 0 {
            names.push("BITMAP");
        }
        if self.flags & LH_META_PAGE != 0 {
            names.push("META");
        }
        names.join("|")
    }
}

/// Parsed GiST special section (16 bytes).
#[derive(Debug, Clone, Serialize)]
pub struct GistSpecial {
    pub nsn_logid: u32,
    pub nsn_recoff: u32,
    pub rightlink: u32,
    pub flags: u16,
    pub page_id: u16,
}

impl GistSpecial {
    pub fn parse(data: &[u8], special: usize) -> Option<Self> {
        let s = data.get(special..special + SPEC_SIZE_LARGE)?;
        Some(GistSpecial {
            nsn_logid: LittleEndian::read_u32(&s[0..]),
            nsn_recoff: LittleEndian::read_u32(&s[4..]),
            rightlink: LittleEndian::read_u32(&s[8..]),
            flags: LittleEndian::read_u16(&s[12..]),
            page_id: LittleEndian::read_u16(&s[14..]),
        })
    }

    pub fn flag_names(&self) -> String {
        let mut names = Vec::new();
        if self.flags & F_LEAF != 0 {
            names.push("LEAF");
        }
        if self.flags & F_DELETED != 0 {
            names.push("DELETED");
        }
        if self.flags & F_TUPLES_DELETED != 0 {
            names.push("TUPLES_DELETED");
        }
        if self.flags & F_FOLLOW_RIGHT != 0 {
            names.push("FOLLOW_RIGHT");
        }
        if self.flags & F_HAS_GARBAGE != 0 {
            names.push("HAS_GARBAGE");
        }
        names.join("|")
    }
}

/// Parsed GIN special section (8 bytes).
#[derive(Debug, Clone, Serialize)]
pub struct GinSpecial {
    pub rightlink: u32,
    pub maxoff: u16,
    pub flags: u16,
}

impl GinSpecial {
    pub fn parse(data: &[u8], special: usize) -> Option<Self> {
        let s = data.get(special..special + SPEC_SIZE_SMALL)?;
        Some(GinSpecial {
            rightlink: LittleEndian::read_u32(&s[0..]),
            maxoff: LittleEndian::read_u16(&s[4..]),
            flags: LittleEndian::read_u16(&s[6..]),
        })
    }

    pub fn is_compressed_leaf(&self) -> bool {
        self.flags & GIN_DATA != 0 && self.flags & GIN_COMPRESSED != 0
    }

    pub fn flag_names(&self) -> String {
        let mut names = Vec::new();
        if self.flags & GIN_DATA != 0 {
            names.push("DATA");
        }
        if self.flags & GIN_LEAF != 0 {
            names.push("LEAF");
        }
        if self.flags & GIN_DELETED != 0 {
            names.push("DELETED");
        }
        if self.flags & GIN_META != 0 {
            names.push("META");
        }
        if self.flags & GIN_LIST != 0 {
            names.push("LIST");
        }
        if self.flags & GIN_LIST_FULLROW != 0 {
            names.push("FULLROW");
        }
        if self.flags & GIN_INCOMPLETE_SPLIT != 0 {
            names.push("INCOMPLETESPLIT");
        }
        if self.flags & GIN_COMPRESSED != 0 {
            names.push("COMPRESSED");
        }
        names.join("|")
    }
}

/// Parsed SP-GiST special section (8 bytes).
#[derive(Debug, Clone, Serialize)]
pub struct SpGistSpecial {
    pub flags: u16,
    pub n_redirection: u16,
    pub n_placeholder: u16,
    pub page_id: u16,
}

impl SpGistSpecial {
    pub fn parse(data: &[u8], special: usize) -> Option<Self> {
        let s = data.get(special..special + SPEC_SIZE_SMALL)?;
        Some(SpGistSpecial {
            flags: LittleEndian::read_u16(&s[0..]),
            n_redirection: LittleEndian::read_u16(&s[2..]),
            n_placeholder: LittleEndian::read_u16(&s[4..]),
            page_id: LittleEndian::read_u16(&s[6..]),
        })
    }

    pub fn is_leaf(&self) -> bool {
        self.flags & SPGIST_LEAF != 0
    }

    pub fn flag_names(&self) -> String {
        let mut names = Vec::new();
        if self.flags & SPGIST_META != 0 {
            names.push("META");
        }
        if self.flags & SPGIST_DELETED != 0 {
            names.push("DELETED");
        }
        if self.flags & SPGIST_LEAF != 0 {
            names.push("LEAF");
        }
        if self.flags & SPGIST_NULLS != 0 {
            names.push("NULLS");
        }
        names.join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BS: u32 = 8192;

    fn build_block(special_size: usize) -> (Vec<u8>, PageHeader) {
        let special = BS as usize - special_size;
        let mut data = vec![0u8; BS as usize];
        LittleEndian::write_u16(&mut data[PD_LOWER..], PD_LINP as u16);
        LittleEndian::write_u16(&mut data[PD_UPPER..], special as u16);
        LittleEndian::write_u16(&mut data[PD_SPECIAL..], special as u16);
        LittleEndian::write_u16(&mut data[PD_PAGESIZE_VERSION..], BS as u16 | 4);
        let header = PageHeader::parse(&data).unwrap();
        (data, header)
    }

    fn set_probe(data: &mut [u8], value: u16) {
        let at = data.len() - 2;
        LittleEndian::write_u16(&mut data[at..], value);
    }

    #[test]
    fn test_no_special_section() {
        let (data, header) = build_block(0);
        assert_eq!(classify(&data, &header, BS, BS as usize), SpecialKind::None);
    }

    #[test]
    fn test_boundary_error_offset_zero() {
        let (mut data, _) = build_block(0);
        LittleEndian::write_u16(&mut data[PD_SPECIAL..], 0);
        let header = PageHeader::parse(&data).unwrap();
        assert_eq!(
            classify(&data, &header, BS, BS as usize),
            SpecialKind::ErrorBoundary
        );
    }

    #[test]
    fn test_boundary_error_past_block() {
        let (mut data, _) = build_block(0);
        LittleEndian::write_u16(&mut data[PD_SPECIAL..], (BS + 8) as u16);
        let header = PageHeader::parse(&data).unwrap();
        assert_eq!(
            classify(&data, &header, BS, BS as usize),
            SpecialKind::ErrorBoundary
        );
    }

    #[test]
    fn test_boundary_error_past_bytes_read() {
        let (data, header) = build_block(16);
        // Special offset valid for the block size but beyond the short read
        assert_eq!(classify(&data, &header, BS, 4096), SpecialKind::ErrorBoundary);
    }

    #[test]
    fn test_sequence_magic() {
        let (mut data, header) = build_block(8);
        let special = BS as usize - 8;
        LittleEndian::write_u32(&mut data[special..], SEQUENCE_MAGIC);
        assert_eq!(
            classify(&data, &header, BS, BS as usize),
            SpecialKind::Sequence
        );
    }

    #[test]
    fn test_spgist_by_page_id() {
        let (mut data, header) = build_block(8);
        set_probe(&mut data, SPGIST_PAGE_ID);
        assert_eq!(
            classify(&data, &header, BS, BS as usize),
            SpecialKind::SpGist
        );
    }

    #[test]
    fn test_gin_is_small_class_fallback() {
        let (mut data, header) = build_block(8);
        set_probe(&mut data, 0x0001); // neither sequence magic nor SP-GiST tag
        assert_eq!(classify(&data, &header, BS, BS as usize), SpecialKind::Gin);
    }

    #[test]
    fn test_small_class_partial_read_is_unknown() {
        let (data, header) = build_block(8);
        // Bytes read stops exactly at the special offset: in-bounds, but the
        // probe bytes are unavailable.
        assert_eq!(
            classify(&data, &header, BS, BS as usize - 8),
            SpecialKind::Unknown
        );
    }

    #[test]
    fn test_btree_by_cycle_id_ceiling() {
        let (mut data, header) = build_block(16);
        set_probe(&mut data, 0x0012); // cycle id below the ceiling
        assert_eq!(classify(&data, &header, BS, BS as usize), SpecialKind::Btree);
    }

    #[test]
    fn test_hash_by_page_id() {
        let (mut data, header) = build_block(16);
        set_probe(&mut data, HASHO_PAGE_ID);
        assert_eq!(classify(&data, &header, BS, BS as usize), SpecialKind::Hash);
    }

    #[test]
    fn test_gist_by_page_id() {
        let (mut data, header) = build_block(16);
        set_probe(&mut data, GIST_PAGE_ID);
        assert_eq!(classify(&data, &header, BS, BS as usize), SpecialKind::Gist);
    }

    #[test]
    fn test_large_class_unmatched_tag_is_unknown() {
        let (mut data, header) = build_block(16);
        set_probe(&mut data, 0xFFAA); // above cycle ceiling, no known page id
        assert_eq!(
            classify(&data, &header, BS, BS as usize),
            SpecialKind::Unknown
        );
    }

    #[test]
    fn test_odd_size_is_unknown() {
        let (mut data, header) = build_block(40);
        set_probe(&mut data, GIST_PAGE_ID);
        assert_eq!(
            classify(&data, &header, BS, BS as usize),
            SpecialKind::Unknown
        );
    }

    #[test]
    fn test_btree_special_parse_and_flags() {
        let mut s = vec![0u8; 16];
        LittleEndian::write_u32(&mut s[0..], 3);
        LittleEndian::write_u32(&mut s[4..], 5);
        LittleEndian::write_u32(&mut s[8..], 1);
        LittleEndian::write_u16(&mut s[12..], BTP_LEAF | BTP_HAS_GARBAGE);
        LittleEndian::write_u16(&mut s[14..], 7);
        let parsed = BtreeSpecial::parse(&s, 0).unwrap();
        assert_eq!(parsed.prev, 3);
        assert_eq!(parsed.next, 5);
        assert_eq!(parsed.level_or_xact, 1);
        assert_eq!(parsed.cycle_id, 7);
        assert_eq!(parsed.flag_names(), "LEAF|HASGARBAGE");
        assert!(!parsed.is_deleted());
    }

    #[test]
    fn test_gin_special_compressed_leaf() {
        let mut s = vec![0u8; 8];
        LittleEndian::write_u32(&mut s[0..], 11);
        LittleEndian::write_u16(&mut s[4..], 20);
        LittleEndian::write_u16(&mut s[6..], GIN_DATA | GIN_LEAF | GIN_COMPRESSED);
        let parsed = GinSpecial::parse(&s, 0).unwrap();
        assert_eq!(parsed.rightlink, 11);
        assert_eq!(parsed.maxoff, 20);
        assert!(parsed.is_compressed_leaf());
        assert_eq!(parsed.flag_names(), "DATA|LEAF|COMPRESSED");
    }

    #[test]
    fn test_spgist_special_leaf() {
        let mut s = vec![0u8; 8];
        LittleEndian::write_u16(&mut s[0..], SPGIST_LEAF | SPGIST_NULLS);
        LittleEndian::write_u16(&mut s[2..], 2);
        LittleEndian::write_u16(&mut s[4..], 9);
        LittleEndian::write_u16(&mut s[6..], SPGIST_PAGE_ID);
        let parsed = SpGistSpecial::parse(&s, 0).unwrap();
        assert!(parsed.is_leaf());
        assert_eq!(parsed.n_redirection, 2);
        assert_eq!(parsed.n_placeholder, 9);
        assert_eq!(parsed.flag_names(), "LEAF|NULLS");
    }
}
