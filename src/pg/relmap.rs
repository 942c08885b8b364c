//! `pg_filenode.map` parsing.
//!
//! The relation mapper file is a fixed 512-byte blob: a magic word, a
//! mapping count, then up to 62 (catalog OID, filenode) pairs. The CRC and
//! padding at the tail are ignored on purpose — anyone inspecting this file
//! probably has a cluster too broken to trust them.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::pg::constants::{RELMAP_FILE_SIZE, RELMAP_MAGIC, RELMAP_MAX_MAPPINGS};

/// One catalog-to-filenode mapping.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RelMapping {
    pub oid: u32,
    pub filenode: u32,
}

/// Parsed relation map file.
#[derive(Debug, Clone, Serialize)]
pub struct RelMapFile {
    pub magic: u32,
    /// Count as stored, which may exceed what the file can hold.
    pub num_mappings: i32,
    pub mappings: Vec<RelMapping>,
}

impl RelMapFile {
    /// Parse a 512-byte relation map image.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < RELMAP_FILE_SIZE {
            return None;
        }

        let magic = LittleEndian::read_u32(&data[0..]);
        let num_mappings = LittleEndian::read_i32(&data[4..]);

        let count = num_mappings.clamp(0, RELMAP_MAX_MAPPINGS as i32) as usize;
        let mappings = (0..count)
            .map(|i| {
                let at = 8 + i * 8;
                RelMapping {
                    oid: LittleEndian::read_u32(&data[at..]),
                    filenode: LittleEndian::read_u32(&data[at + 4..]),
                }
            })
            .collect();

        Some(RelMapFile {
            magic,
            num_mappings,
            mappings,
        })
    }

    pub fn magic_ok(&self) -> bool {
        self.magic == RELMAP_MAGIC
    }

    /// True when the stored count had to be clamped to the file's capacity.
    pub fn count_clamped(&self) -> bool {
        self.num_mappings < 0 || self.num_mappings as usize > RELMAP_MAX_MAPPINGS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_relmap(magic: u32, mappings: &[(u32, u32)]) -> Vec<u8> {
        let mut data = vec![0u8; RELMAP_FILE_SIZE];
        LittleEndian::write_u32(&mut data[0..], magic);
        LittleEndian::write_i32(&mut data[4..], mappings.len() as i32);
        for (i, (oid, filenode)) in mappings.iter().enumerate() {
            let at = 8 + i * 8;
            LittleEndian::write_u32(&mut data[at..], *oid);
            LittleEndian::write_u32(&mut data[at + 4..], *filenode);
        }
        data
    }

    #[test]
    fn test_parse_valid_map() {
        let data = build_relmap(RELMAP_MAGIC, &[(1259, 16384), (1249, 16385)]);
        let map = RelMapFile::parse(&data).unwrap();
        assert!(map.magic_ok());
        assert!(!map.count_clamped());
        assert_eq!(map.num_mappings, 2);
        assert_eq!(map.mappings[0].oid, 1259);
        assert_eq!(map.mappings[1].filenode, 16385);
    }

    #[test]
    fn test_wrong_magic_detected() {
        let data = build_relmap(0x12345678, &[]);
        let map = RelMapFile::parse(&data).unwrap();
        assert!(!map.magic_ok());
    }

    #[test]
    fn test_oversized_count_is_clamped() {
        let mut data = build_relmap(RELMAP_MAGIC, &[]);
        LittleEndian::write_i32(&mut data[4..], 10_000);
        let map = RelMapFile::parse(&data).unwrap();
        assert!(map.count_clamped());
        assert_eq!(map.mappings.len(), RELMAP_MAX_MAPPINGS);
    }

    #[test]
    fn test_short_file_fails() {
        assert!(RelMapFile::parse(&[0u8; 100]).is_none());
    }
}
