//! pglz decompression.
//!
//! PostgreSQL's historical varlena compression is a byte-oriented LZ family:
//! a control byte gates the next eight items, each either a literal byte or a
//! back-reference. Back-references pack a 3..18 byte length (with one
//! extension byte once the nibble saturates) and a 1..4095 byte offset into
//! two bytes. Matches copy bytewise, so a match may overlap its own output —
//! that is how runs are encoded.
//!
//! Only decompression is provided; this is a read-only tool.

use crate::PgfdError;

/// Decompress a pglz payload into exactly `raw_size` bytes.
///
/// Fails when the input is malformed, when a back-reference points before
/// the start of the output, or when the source and destination are not both
/// consumed exactly — the same strictness the server applies when it
/// verifies a decompressed datum.
pub fn decompress(src: &[u8], raw_size: usize) -> Result<Vec<u8>, PgfdError> {
    let mut dst: Vec<u8> = Vec::with_capacity(raw_size);
    let mut sp = 0;

    while sp < src.len() && dst.len() < raw_size {
        let ctrl = src[sp];
        sp += 1;

        for bit in 0..8 {
            if sp >= src.len() || dst.len() >= raw_size {
                break;
            }
            if ctrl & (1 << bit) != 0 {
                if sp + 1 >= src.len() {
                    return Err(PgfdError::Parse(
                        "pglz: truncated back-reference".to_string(),
                    ));
                }
                let mut len = ((src[sp] & 0x0F) as usize) + 3;
                let off = (((src[sp] & 0xF0) as usize) << 4) | src[sp + 1] as usize;
                sp += 2;
                if len == 18 {
                    if sp >= src.len() {
                        return Err(PgfdError::Parse(
                            "pglz: truncated length extension".to_string(),
                        ));
                    }
                    len += src[sp] as usize;
                    sp += 1;
                }
                if off == 0 || off > dst.len() {
                    return Err(PgfdError::Parse(format!(
                        "pglz: invalid back-reference offset {} at output position {}",
                        off,
                        dst.len()
                    )));
                }
                len = len.min(raw_size - dst.len());
                // Bytewise copy; the source region may overlap the bytes
                // being appended.
                for _ in 0..len {
                    let b = dst[dst.len() - off];
                    dst.push(b);
                }
            } else {
                dst.push(src[sp]);
                sp += 1;
            }
        }
    }

    if dst.len() != raw_size || sp != src.len() {
        return Err(PgfdError::Parse(format!(
            "pglz: decompressed {} of {} expected bytes ({} of {} input consumed)",
            dst.len(),
            raw_size,
            sp,
            src.len()
        )));
    }
    Ok(dst)
}
