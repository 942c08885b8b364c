//! Accumulator for one decoded output row.
//!
//! Decoded attribute values collect into a single reusable line that is
//! flushed behind the `COPY:` marker once the whole tuple has been
//! processed, or printed as partial data in an inline error. One accumulator
//! exists per scan context; the TOAST side-relation scan carries its own so
//! the outer row under construction is never clobbered.

use std::io::Write;

use crate::{wprintln, PgfdError};

/// Growable, reusable buffer assembling one tab-separated output row.
#[derive(Debug, Default)]
pub struct CopyLine {
    buf: String,
}

impl CopyLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one field, tab-separated from any previous field.
    pub fn append(&mut self, field: &str) {
        if !self.buf.is_empty() {
            self.buf.push('\t');
        }
        self.buf.push_str(field);
    }

    /// Append a field, escaping `\0 \r \n \t \\` the way COPY text does.
    ///
    /// The input may be arbitrary bytes from a corrupted file; anything that
    /// is not printable ASCII or valid UTF-8 passes through lossily.
    pub fn append_encoded(&mut self, raw: &[u8]) {
        let mut field = String::with_capacity(raw.len());
        for chunk in String::from_utf8_lossy(raw).chars() {
            match chunk {
                '\0' => field.push_str("\\0"),
                '\r' => field.push_str("\\r"),
                '\n' => field.push_str("\\n"),
                '\t' => field.push_str("\\t"),
                '\\' => field.push_str("\\\\"),
                c => field.push(c),
            }
        }
        self.append(&field);
    }

    /// The row accumulated so far (used for partial data in error reports).
    pub fn partial(&self) -> &str {
        &self.buf
    }

    /// Discard the accumulated row.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Print the accumulated row behind the COPY marker, then clear.
    pub fn flush(&mut self, writer: &mut dyn Write) -> Result<(), PgfdError> {
        wprintln!(writer, "COPY: {}", self.buf)?;
        self.clear();
        Ok(())
    }
}
