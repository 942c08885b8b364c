//! Data page checksum computation and verification.
//!
//! PostgreSQL's page checksum runs an FNV-primed mix over 32 parallel lanes
//! of 4-byte words, folds the lanes together, mixes in the block number, and
//! reduces to a 16-bit value that is never zero. The stored checksum field
//! itself is treated as zero during computation. Block numbers are global to
//! the relation, so verifying a later segment file needs the block offset
//! contributed by the segments before it.

use byteorder::{ByteOrder, LittleEndian};

use crate::pg::constants::{PD_CHECKSUM, SIZE_PAGE_HEADER};

const N_SUMS: usize = 32;
const FNV_PRIME: u32 = 16777619;

/// Initial lane values; chosen once upstream and fixed by the format.
const CHECKSUM_BASE_OFFSETS: [u32; N_SUMS] = [
    0x5B1F36E9, 0xB8525960, 0x02AB50AA, 0x1DE66D2A, 0x79FF467A, 0x9BB9F8A3, 0x217E7CD2, 0x83E13D2C,
    0xF8D4474F, 0xE39EB970, 0x42C6AE16, 0x993216FA, 0x7B093B5D, 0x98DAFF3C, 0xF718902A, 0x0B1C9CDB,
    0xE58F764B, 0x187636BC, 0x5D7B3BB1, 0xE73DE7DE, 0x92BEC979, 0xCCA6C0B2, 0x304A0979, 0x85AA43D4,
    0x783125BB, 0x6CA8EAA2, 0xE407EAC6, 0x4B5CFC3E, 0x9FBF8C76, 0x15CA20BE, 0xF2CA9FD3, 0x959BD756,
];

#[inline]
fn checksum_comp(sum: u32, value: u32) -> u32 {
    let tmp = sum ^ value;
    tmp.wrapping_mul(FNV_PRIME) ^ (tmp >> 17)
}

/// Checksum a page image for the given global block number.
///
/// `page` must be a full block; the bytes at the checksum field are ignored.
pub fn checksum_page(page: &[u8], block_number: u32) -> u16 {
    let mut sums = CHECKSUM_BASE_OFFSETS;

    let words_per_row = N_SUMS;
    let rows = page.len() / (4 * words_per_row);
    for row in 0..rows {
        for lane in 0..N_SUMS {
            let offset = (row * words_per_row + lane) * 4;
            let mut value = LittleEndian::read_u32(&page[offset..]);
            // The stored checksum participates as zero; it sits in the low
            // half of the word at PD_CHECKSUM.
            if offset == PD_CHECKSUM {
                value &= 0xFFFF_0000;
            }
            sums[lane] = checksum_comp(sums[lane], value);
        }
    }

    // Two final rounds of zeroes flush every byte through the mix.
    for _ in 0..2 {
        for sum in sums.iter_mut() {
            *sum = checksum_comp(*sum, 0);
        }
    }

    let mut result: u32 = 0;
    for sum in sums {
        result ^= sum;
    }

    result ^= block_number;
    ((result % 65535) + 1) as u16
}

/// Result of verifying one page's stored checksum.
#[derive(Debug, Clone, Copy)]
pub struct ChecksumResult {
    pub stored: u16,
    pub calculated: u16,
}

impl ChecksumResult {
    pub fn is_valid(&self) -> bool {
        self.stored == self.calculated
    }
}

/// Verify a page against its stored checksum.
///
/// `block_in_file` is the block number within this segment file;
/// `segment_block_offset` is the number of blocks in all earlier segments
/// (`segment size / block size * segment number`).
pub fn verify_page(
    page: &[u8],
    block_in_file: u32,
    segment_block_offset: u32,
) -> Option<ChecksumResult> {
    if page.len() < SIZE_PAGE_HEADER || page.len() % (4 * N_SUMS) != 0 {
        return None;
    }
    let stored = LittleEndian::read_u16(&page[PD_CHECKSUM..]);
    let calculated = checksum_page(page, segment_block_offset + block_in_file);
    Some(ChecksumResult { stored, calculated })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page() -> Vec<u8> {
        let mut page = vec![0u8; 8192];
        for (i, byte) in page.iter_mut().enumerate() {
            *byte = (i * 7 % 251) as u8;
        }
        page
    }

    #[test]
    fn test_checksum_never_zero() {
        let page = vec![0u8; 8192];
        assert_ne!(checksum_page(&page, 0), 0);
    }

    #[test]
    fn test_checksum_depends_on_block_number() {
        let page = sample_page();
        assert_ne!(checksum_page(&page, 0), checksum_page(&page, 1));
    }

    #[test]
    fn test_checksum_ignores_stored_checksum_field() {
        let mut page = sample_page();
        let before = checksum_page(&page, 5);
        LittleEndian::write_u16(&mut page[PD_CHECKSUM..], 0xDEAD);
        assert_eq!(checksum_page(&page, 5), before);
    }

    #[test]
    fn test_checksum_detects_data_change() {
        let mut page = sample_page();
        let before = checksum_page(&page, 5);
        page[4000] ^= 0x01;
        assert_ne!(checksum_page(&page, 5), before);
    }

    #[test]
    fn test_verify_round_trip() {
        let mut page = sample_page();
        let checksum = checksum_page(&page, 3);
        LittleEndian::write_u16(&mut page[PD_CHECKSUM..], checksum);
        let result = verify_page(&page, 3, 0).unwrap();
        assert!(result.is_valid());

        // Same page attributed to a different block must fail
        let result = verify_page(&page, 4, 0).unwrap();
        assert!(!result.is_valid());
    }

    #[test]
    fn test_verify_with_segment_offset() {
        let mut page = sample_page();
        // Block 2 of segment 1 with 131072 blocks per segment
        let checksum = checksum_page(&page, 131072 + 2);
        LittleEndian::write_u16(&mut page[PD_CHECKSUM..], checksum);
        assert!(verify_page(&page, 2, 131072).unwrap().is_valid());
        assert!(!verify_page(&page, 2, 0).unwrap().is_valid());
    }

    #[test]
    fn test_verify_rejects_odd_sizes() {
        assert!(verify_page(&[0u8; 100], 0, 0).is_none());
    }
}
