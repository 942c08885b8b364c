//! Hex dump formatting utilities.
//!
//! Produces the traditional hex+ascii block dump: 16 bytes per line, hex
//! grouped in 4-byte columns, an ASCII sidebar with `.` for non-printables,
//! and a relative or absolute address column.

use crate::pg::constants::BYTES_PER_LINE;

/// Format a byte range of a block as hex and ascii lines.
///
/// `start` is the index of the first byte within the block (the address
/// column stays block-relative). With `absolute_base` set, the address
/// column shows the file-absolute position instead. A trailing blank line
/// separates the dump from whatever follows it.
pub fn format_binary(data: &[u8], start: usize, length: usize, absolute_base: Option<u64>) -> String {
    let mut out = String::new();
    if length == 0 {
        return out;
    }
    let last = (start + length).min(data.len());

    let mut index = start;
    while index < last {
        let stop = index + BYTES_PER_LINE;

        match absolute_base {
            Some(base) => out.push_str(&format!("  {:08x}: ", base + index as u64)),
            None => out.push_str(&format!("  {:04x}: ", index)),
        }

        for x in index..stop {
            if x < last {
                out.push_str(&format!("{:02x}", data[x]));
            } else {
                out.push_str("  ");
            }
            if x & 0x03 == 0x03 {
                out.push(' ');
            }
        }
        out.push(' ');

        for x in index..stop {
            if x < last {
                let c = data[x];
                out.push(if c.is_ascii_graphic() || c == b' ' {
                    c as char
                } else {
                    '.'
                });
            } else {
                out.push(' ');
            }
        }
        out.push('\n');

        index = stop;
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_addressing() {
        let data: Vec<u8> = (0..16).collect();
        let out = format_binary(&data, 0, 16, None);
        assert!(out.starts_with("  0000: "));
        assert!(out.contains("00010203 04050607 08090a0b 0c0d0e0f"));
    }

    #[test]
    fn test_absolute_addressing() {
        let data: Vec<u8> = (0..16).collect();
        let out = format_binary(&data, 0, 16, Some(0x4000));
        assert!(out.starts_with("  00004000: "));
    }

    #[test]
    fn test_ascii_sidebar() {
        let mut data = b"Hello, page!".to_vec();
        data.push(0x00);
        data.push(0x7f);
        let out = format_binary(&data, 0, data.len(), None);
        assert!(out.contains("Hello, page!.."));
    }

    #[test]
    fn test_partial_line_padding() {
        let data = vec![0xAB; 5];
        let out = format_binary(&data, 0, 5, None);
        let first_line = out.lines().next().unwrap();
        // Hex area keeps its width when fewer than 16 bytes remain
        assert!(first_line.contains("abababab ab"));
        assert!(first_line.trim_end().ends_with("....."));
    }

    #[test]
    fn test_start_offset_in_address_column() {
        let data = vec![0u8; 64];
        let out = format_binary(&data, 32, 16, None);
        assert!(out.starts_with("  0020: "));
    }

    #[test]
    fn test_zero_length_is_empty() {
        assert_eq!(format_binary(&[1, 2, 3], 0, 0, None), "");
    }

    #[test]
    fn test_length_clamped_to_data() {
        let data = vec![0x11; 8];
        let out = format_binary(&data, 0, 100, None);
        assert_eq!(out.lines().filter(|l| !l.is_empty()).count(), 1);
    }
}
