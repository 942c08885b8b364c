//! Attribute-level tuple decoding.
//!
//! Turns the bytes after a heap tuple's header into typed column values
//! according to a caller-declared, comma-separated type list, emitting one
//! tab-separated row per tuple behind the `COPY:` marker. The registry of
//! recognized type tags is fixed; an unknown tag is a configuration-time
//! fatal error, reported before any file is read.
//!
//! Decoders never touch raw offsets directly. A [`Cursor`] carries the
//! position and remaining length and exposes `align_to`/`take` with internal
//! bounds checks, so running off the end of a corrupted tuple surfaces as an
//! inline per-tuple report instead of a crash.

use std::io::Write;

use byteorder::{ByteOrder, LittleEndian};

use crate::pg::constants::*;
use crate::pg::dump::{DumpConfig, ScanState};
use crate::pg::toast::{self, ToastPointer};
use crate::pg::tuple::HeapTuple;
use crate::pg::pglz;
use crate::{wprintln, PgfdError};

/// One recognized attribute type tag.
///
/// Several SQL names share a decoder (all string-ish types store the same
/// varlena layout); the registry below maps every accepted spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    SmallInt,
    Int,
    UInt,
    BigInt,
    Time,
    TimeTz,
    Date,
    Timestamp,
    TimestampTz,
    Float4,
    Float8,
    Bool,
    Uuid,
    MacAddr,
    Name,
    Numeric,
    Char,
    VarString,
    /// `~`: consume and discard everything left in the tuple.
    Ignore,
}

/// Accepted type-list spellings, in the order shown to the user.
const TYPE_REGISTRY: &[(&str, AttrType)] = &[
    ("smallserial", AttrType::SmallInt),
    ("smallint", AttrType::SmallInt),
    ("int", AttrType::Int),
    ("oid", AttrType::UInt),
    ("xid", AttrType::UInt),
    ("serial", AttrType::Int),
    ("bigint", AttrType::BigInt),
    ("bigserial", AttrType::BigInt),
    ("time", AttrType::Time),
    ("timetz", AttrType::TimeTz),
    ("date", AttrType::Date),
    ("timestamp", AttrType::Timestamp),
    ("timestamptz", AttrType::TimestampTz),
    ("real", AttrType::Float4),
    ("float4", AttrType::Float4),
    ("float8", AttrType::Float8),
    ("float", AttrType::Float8),
    ("bool", AttrType::Bool),
    ("uuid", AttrType::Uuid),
    ("macaddr", AttrType::MacAddr),
    ("name", AttrType::Name),
    ("numeric", AttrType::Numeric),
    ("char", AttrType::Char),
    ("~", AttrType::Ignore),
    ("charn", AttrType::VarString),
    ("varchar", AttrType::VarString),
    ("varcharn", AttrType::VarString),
    ("text", AttrType::VarString),
    ("json", AttrType::VarString),
    ("xml", AttrType::VarString),
];

/// Parse an attribute type list like `"int,timestamp,bool,uuid"`.
///
/// Tags are case-insensitive; empty entries are ignored. An unknown tag is
/// fatal and the error text lists every accepted spelling.
pub fn parse_attribute_types(list: &str) -> Result<Vec<AttrType>, PgfdError> {
    let mut types = Vec::new();
    for tag in list.split(',') {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            continue;
        }
        match TYPE_REGISTRY.iter().find(|(name, _)| *name == tag) {
            Some((_, ty)) => types.push(*ty),
            None => {
                let known: Vec<&str> = TYPE_REGISTRY.iter().map(|(name, _)| *name).collect();
                return Err(PgfdError::Argument(format!(
                    "type <{}> doesn't exist or is not currently supported. Full list of known types: {}",
                    tag,
                    known.join(" ")
                )));
            }
        }
    }
    Ok(types)
}

/// Why a single attribute could not be decoded.
#[derive(Debug)]
pub enum AttrError {
    /// Alignment padding would run past the end of the tuple.
    Alignment,
    /// Fewer bytes remain than the type requires.
    TooShort,
    /// A varlena or numeric header made no sense.
    BadHeader(String),
}

impl std::fmt::Display for AttrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrError::Alignment => write!(f, "alignment past end of data"),
            AttrError::TooShort => write!(f, "not enough bytes left"),
            AttrError::BadHeader(what) => write!(f, "{}", what),
        }
    }
}

/// Bounds-checked view over a tuple's post-header bytes.
///
/// The base of the underlying slice is maxaligned on disk, so aligning the
/// logical position aligns the value the same way the server's macros align
/// raw pointers.
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// First unconsumed byte, without advancing.
    pub fn peek(&self) -> Result<u8, AttrError> {
        self.data.get(self.pos).copied().ok_or(AttrError::TooShort)
    }

    /// Advance to the next multiple of `n` bytes from the tuple data base.
    pub fn align_to(&mut self, n: usize) -> Result<(), AttrError> {
        let aligned = (self.pos + n - 1) & !(n - 1);
        if aligned > self.data.len() {
            return Err(AttrError::Alignment);
        }
        self.pos = aligned;
        Ok(())
    }

    /// Consume exactly `n` bytes or fail without moving.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], AttrError> {
        if self.remaining() < n {
            return Err(AttrError::TooShort);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Everything left, without consuming it.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Consume everything left.
    pub fn take_rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..];
        self.pos = self.data.len();
        slice
    }
}

/// How to render a varlena payload once its header has been unwrapped.
#[derive(Clone, Copy)]
enum ValueRender {
    Text,
    Numeric,
}

/// Decode one tuple against the configured type list and emit a COPY row.
///
/// Structural problems (bytes exhausted early, trailing bytes, undecodable
/// attribute) are reported inline with the partial row and mark the scan
/// failed; they never abort it.
pub fn decode_tuple(
    cfg: &DumpConfig,
    scan: &mut ScanState,
    tuple_data: &[u8],
    writer: &mut dyn Write,
) -> Result<(), PgfdError> {
    let Some(types) = cfg.decode_types.as_deref() else {
        return Ok(());
    };

    let Some(header) = HeapTuple::parse(tuple_data) else {
        scan.failed = true;
        return wprintln!(writer, "Error: unable to decode a tuple, item too small for a heap tuple header.");
    };
    let hoff = header.hoff as usize;
    if hoff < SIZE_HEAP_TUPLE_HEADER || hoff > tuple_data.len() {
        scan.failed = true;
        return wprintln!(
            writer,
            "Error: unable to decode a tuple, bad header offset <{}>.",
            hoff
        );
    }

    scan.copy.clear();
    let mut cursor = Cursor::new(&tuple_data[hoff..]);

    for (attr, ty) in types.iter().enumerate() {
        if header.has_nulls() && header.att_is_null(attr) {
            scan.copy.append("\\N");
            continue;
        }

        if cursor.is_empty() {
            scan.failed = true;
            return wprintln!(
                writer,
                "Error: unable to decode a tuple, no more bytes left. Partial data: {}",
                scan.copy.partial()
            );
        }

        if let Err(e) = decode_one(cfg, scan, &mut cursor, *ty, writer)? {
            scan.failed = true;
            return wprintln!(
                writer,
                "Error: unable to decode a tuple, attribute #{}: {}. Partial data: {}",
                attr + 1,
                e,
                scan.copy.partial()
            );
        }
    }

    if !cursor.is_empty() {
        scan.failed = true;
        return wprintln!(
            writer,
            "Error: unable to decode a tuple, {} bytes left, 0 expected. Partial data: {}",
            cursor.remaining(),
            scan.copy.partial()
        );
    }

    scan.copy.flush(writer)
}

/// Decode a single attribute, appending its text to the copy line.
///
/// The outer `Result` carries fatal I/O errors from inline reporting; the
/// inner one carries per-attribute decode failures the caller reports and
/// survives.
fn decode_one(
    cfg: &DumpConfig,
    scan: &mut ScanState,
    cursor: &mut Cursor,
    ty: AttrType,
    writer: &mut dyn Write,
) -> Result<Result<(), AttrError>, PgfdError> {
    match ty {
        AttrType::SmallInt => Ok(fixed(cursor, 2, 2).map(|b| {
            scan.copy.append(&LittleEndian::read_i16(b).to_string());
        })),
        AttrType::Int => Ok(fixed(cursor, 4, 4).map(|b| {
            scan.copy.append(&LittleEndian::read_i32(b).to_string());
        })),
        AttrType::UInt => Ok(fixed(cursor, 4, 4).map(|b| {
            scan.copy.append(&LittleEndian::read_u32(b).to_string());
        })),
        AttrType::BigInt => Ok(fixed(cursor, 8, 8).map(|b| {
            scan.copy.append(&LittleEndian::read_i64(b).to_string());
        })),
        AttrType::Float4 => Ok(fixed(cursor, 4, 4).map(|b| {
            scan.copy.append(&format!("{:.12}", LittleEndian::read_f32(b)));
        })),
        AttrType::Float8 => Ok(fixed(cursor, 8, 8).map(|b| {
            scan.copy.append(&format!("{:.12}", LittleEndian::read_f64(b)));
        })),
        AttrType::Bool => Ok(cursor.take(1).map(|b| {
            scan.copy.append(if b[0] != 0 { "t" } else { "f" });
        })),
        AttrType::Uuid => Ok(cursor.take(16).map(|b| {
            scan.copy.append(&format!(
                "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
                b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
                b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
            ));
        })),
        AttrType::MacAddr => Ok(fixed(cursor, 4, 6).map(|b| {
            scan.copy.append(&format!(
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                b[0], b[1], b[2], b[3], b[4], b[5]
            ));
        })),
        AttrType::Name => Ok(cursor.take(NAMEDATALEN).map(|b| {
            let len = b.iter().position(|&c| c == 0).unwrap_or(NAMEDATALEN);
            scan.copy.append_encoded(&b[..len]);
        })),
        AttrType::Char => Ok(cursor.take(1).map(|b| {
            scan.copy.append_encoded(b);
        })),
        AttrType::Time => Ok(fixed(cursor, 8, 8).map(|b| {
            scan.copy.append(&format_time(LittleEndian::read_i64(b)));
        })),
        AttrType::TimeTz => Ok(fixed(cursor, 8, 12).map(|b| {
            let time = LittleEndian::read_i64(b);
            let tz_sec = LittleEndian::read_i32(&b[8..]);
            let tz_min = -(tz_sec / 60);
            scan.copy.append(&format!(
                "{}{}{:02}:{:02}",
                format_time(time),
                if tz_min > 0 { '+' } else { '-' },
                (tz_min / 60).abs(),
                (tz_min % 60).abs()
            ));
        })),
        AttrType::Date => Ok(fixed(cursor, 4, 4).map(|b| {
            scan.copy.append(&format_date(LittleEndian::read_i32(b)));
        })),
        AttrType::Timestamp => Ok(fixed(cursor, 8, 8).map(|b| {
            scan.copy
                .append(&format_timestamp(LittleEndian::read_i64(b), false));
        })),
        AttrType::TimestampTz => Ok(fixed(cursor, 8, 8).map(|b| {
            scan.copy
                .append(&format_timestamp(LittleEndian::read_i64(b), true));
        })),
        AttrType::Numeric => decode_varlena(cfg, scan, cursor, ValueRender::Numeric, writer),
        AttrType::VarString => decode_varlena(cfg, scan, cursor, ValueRender::Text, writer),
        AttrType::Ignore => {
            cursor.take_rest();
            Ok(Ok(()))
        }
    }
}

/// Align then take — the common shape of every fixed-width decoder.
fn fixed<'a>(cursor: &mut Cursor<'a>, align: usize, size: usize) -> Result<&'a [u8], AttrError> {
    cursor.align_to(align)?;
    cursor.take(size)
}

/// Unwrap a varlena header, decompress when needed, and render the payload.
///
/// The four on-disk forms are handled the way the targeted generation writes
/// them: a short unaligned form, an unaligned out-of-line pointer, and the
/// int-aligned 4-byte uncompressed/compressed forms.
fn decode_varlena(
    cfg: &DumpConfig,
    scan: &mut ScanState,
    cursor: &mut Cursor,
    render: ValueRender,
    writer: &mut dyn Write,
) -> Result<Result<(), AttrError>, PgfdError> {
    let first = match cursor.peek() {
        Ok(b) => b,
        Err(e) => return Ok(Err(e)),
    };

    if first == 0x01 {
        // 1-byte length word, unaligned: an out-of-line pointer follows.
        let needed = VARHDRSZ_EXTERNAL + ToastPointer::SIZE;
        let bytes = match cursor.take(needed) {
            Ok(b) => b,
            Err(e) => return Ok(Err(e)),
        };
        let tag = bytes[1];
        if tag != VARTAG_ONDISK {
            // Indirect or expanded pointers only ever live in memory.
            scan.copy.append("(TOASTED IN MEMORY)");
            return Ok(Ok(()));
        }
        let Some(ptr) = ToastPointer::parse(&bytes[VARHDRSZ_EXTERNAL..]) else {
            return Ok(Err(AttrError::BadHeader("bad external pointer".to_string())));
        };

        if cfg.decode_toast {
            match toast::read_external(cfg, scan, &ptr, writer)? {
                Some(value) => render_value(scan, &value, render),
                None => scan.copy.append("(TOASTED,unavailable)"),
            }
        } else if ptr.is_compressed() {
            match ptr.method() {
                TOAST_PGLZ_COMPRESSION_ID => scan.copy.append("(TOASTED,pglz)"),
                TOAST_LZ4_COMPRESSION_ID => scan.copy.append("(TOASTED,lz4)"),
                _ => scan.copy.append("(TOASTED,unknown)"),
            }
        } else {
            scan.copy.append("(TOASTED,uncompressed)");
        }
        return Ok(Ok(()));
    }

    if first & 0x01 == 0x01 {
        // Short form: total length (header byte included) in the top bits.
        let len = ((first >> 1) & 0x7F) as usize;
        if len == 0 {
            return Ok(Err(AttrError::BadHeader("zero-length short varlena".to_string())));
        }
        let bytes = match cursor.take(len) {
            Ok(b) => b,
            Err(e) => return Ok(Err(e)),
        };
        render_value(scan, &bytes[VARHDRSZ_SHORT..], render);
        return Ok(Ok(()));
    }

    // 4-byte forms are int-aligned.
    if let Err(e) = cursor.align_to(4) {
        return Ok(Err(e));
    }
    let first = match cursor.peek() {
        Ok(b) => b,
        Err(e) => return Ok(Err(e)),
    };

    if first & 0x03 == 0x00 {
        // 4-byte length word, uncompressed data.
        if cursor.remaining() < VARHDRSZ {
            return Ok(Err(AttrError::TooShort));
        }
        let len = (LittleEndian::read_u32(cursor.rest()) >> 2) as usize & 0x3FFF_FFFF;
        if len < VARHDRSZ {
            return Ok(Err(AttrError::BadHeader(format!("varlena length {} below header size", len))));
        }
        let bytes = match cursor.take(len) {
            Ok(b) => b,
            Err(e) => return Ok(Err(e)),
        };
        render_value(scan, &bytes[VARHDRSZ..], render);
        return Ok(Ok(()));
    }

    if first & 0x03 == 0x02 {
        // 4-byte length word, compressed data: size word, then the
        // raw-size/method word, then the payload.
        if cursor.remaining() < 2 * VARHDRSZ {
            return Ok(Err(AttrError::TooShort));
        }
        let len = (LittleEndian::read_u32(cursor.rest()) >> 2) as usize & 0x3FFF_FFFF;
        if len < 2 * VARHDRSZ {
            return Ok(Err(AttrError::BadHeader(format!("compressed varlena length {} below header size", len))));
        }
        let bytes = match cursor.take(len) {
            Ok(b) => b,
            Err(e) => return Ok(Err(e)),
        };
        let tcinfo = LittleEndian::read_u32(&bytes[4..]);
        let raw_size = (tcinfo & VARLENA_EXTSIZE_MASK) as usize;
        let method = tcinfo >> VARLENA_EXTSIZE_BITS;
        let payload = &bytes[2 * VARHDRSZ..];

        match decompress_payload(payload, raw_size, method) {
            Ok(value) => render_value(scan, &value, render),
            Err(_) => {
                scan.failed = true;
                wprintln!(writer, "WARNING: Corrupted inline compressed data, unable to decompress.")?;
                scan.copy.append("(inline compressed, corrupted)");
            }
        }
        return Ok(Ok(()));
    }

    Ok(Err(AttrError::BadHeader(format!(
        "unrecognized varlena header byte 0x{:02x}",
        first
    ))))
}

/// Decompress per the 2-bit method tag of the targeted generation.
pub(crate) fn decompress_payload(
    payload: &[u8],
    raw_size: usize,
    method: u32,
) -> Result<Vec<u8>, PgfdError> {
    match method {
        TOAST_PGLZ_COMPRESSION_ID => pglz::decompress(payload, raw_size),
        TOAST_LZ4_COMPRESSION_ID => lz4_flex::block::decompress(payload, raw_size)
            .map_err(|e| PgfdError::Parse(format!("lz4: {}", e))),
        other => Err(PgfdError::Parse(format!(
            "unknown compression method {}",
            other
        ))),
    }
}

fn render_value(scan: &mut ScanState, data: &[u8], render: ValueRender) {
    match render {
        ValueRender::Text => scan.copy.append_encoded(data),
        ValueRender::Numeric => {
            let text = render_numeric(data)
                .unwrap_or_else(|| "(numeric, corrupted)".to_string());
            scan.copy.append(&text);
        }
    }
}

// Numeric header bits. The high two bits select positive/negative/short/
// special; specials spell NaN and the infinities.
const NUMERIC_SIGN_MASK: u16 = 0xC000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_SHORT: u16 = 0x8000;
const NUMERIC_SPECIAL: u16 = 0xC000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;
const NUMERIC_SHORT_SIGN_MASK: u16 = 0x2000;
const NUMERIC_SHORT_DSCALE_MASK: u16 = 0x1F80;
const NUMERIC_SHORT_DSCALE_SHIFT: u16 = 7;
const NUMERIC_SHORT_WEIGHT_SIGN_MASK: u16 = 0x0040;
const NUMERIC_SHORT_WEIGHT_MASK: u16 = 0x003F;
const NUMERIC_DSCALE_MASK: u16 = 0x3FFF;
const DEC_DIGITS: i32 = 4;

/// Render an arbitrary-precision numeric from its packed base-10000 digits.
///
/// Returns `None` when the value is too short to carry the header it claims.
fn render_numeric(data: &[u8]) -> Option<String> {
    if data.len() < 2 {
        return None;
    }
    let header = LittleEndian::read_u16(data);

    if header & NUMERIC_SIGN_MASK == NUMERIC_SPECIAL {
        return match header {
            NUMERIC_NAN => Some("NaN".to_string()),
            NUMERIC_PINF => Some("Infinity".to_string()),
            NUMERIC_NINF => Some("-Infinity".to_string()),
            _ => None,
        };
    }

    let is_short = header & NUMERIC_SHORT != 0;
    let header_size = if is_short { 2 } else { 4 };
    if data.len() < header_size {
        return None;
    }

    let (negative, weight, dscale) = if is_short {
        let weight = {
            let w = (header & NUMERIC_SHORT_WEIGHT_MASK) as i32;
            if header & NUMERIC_SHORT_WEIGHT_SIGN_MASK != 0 {
                w | !(NUMERIC_SHORT_WEIGHT_MASK as i32)
            } else {
                w
            }
        };
        (
            header & NUMERIC_SHORT_SIGN_MASK != 0,
            weight,
            ((header & NUMERIC_SHORT_DSCALE_MASK) >> NUMERIC_SHORT_DSCALE_SHIFT) as i32,
        )
    } else {
        (
            header & NUMERIC_SIGN_MASK == NUMERIC_NEG,
            LittleEndian::read_i16(&data[2..]) as i32,
            (header & NUMERIC_DSCALE_MASK) as i32,
        )
    };

    if data.len() == header_size {
        // No digits: a compressed zero.
        return Some("0".to_string());
    }

    let digits: Vec<i16> = data[header_size..]
        .chunks_exact(2)
        .map(LittleEndian::read_i16)
        .collect();
    let ndigits = digits.len() as i32;
    let digit_at = |d: i32| -> i32 {
        if d >= 0 && d < ndigits {
            digits[d as usize] as i32
        } else {
            0
        }
    };

    let mut out = String::new();
    if negative {
        out.push('-');
    }

    // Digits before the decimal point; the first group drops leading zeroes.
    let mut d;
    if weight < 0 {
        d = weight + 1;
        out.push('0');
    } else {
        d = 0;
        while d <= weight {
            let mut dig = digit_at(d);
            let mut putit = d > 0;
            let mut place = 1000;
            while place > 1 {
                let d1 = dig / place;
                dig -= d1 * place;
                putit |= d1 > 0;
                if putit {
                    out.push((b'0' + d1 as u8) as char);
                }
                place /= 10;
            }
            out.push((b'0' + dig as u8) as char);
            d += 1;
        }
    }

    // Digits after the decimal point, emitted in whole groups then truncated
    // to the display scale.
    if dscale > 0 {
        out.push('.');
        let start = out.len();
        let mut i = 0;
        while i < dscale {
            let mut dig = digit_at(d);
            let mut place = 1000;
            while place >= 1 {
                let d1 = dig / place;
                dig -= d1 * place;
                out.push((b'0' + d1 as u8) as char);
                place /= 10;
            }
            d += 1;
            i += DEC_DIGITS;
        }
        out.truncate(start + dscale as usize);
    }

    Some(out)
}

/// Convert a Julian day number to (year, month, day).
fn j2date(jd: i32) -> (i32, u32, u32) {
    let mut julian = jd as u32;
    julian = julian.wrapping_add(32044);
    let mut quad = julian / 146097;
    let extra = (julian - quad * 146097) * 4 + 3;
    julian = julian.wrapping_add(60 + quad * 3 + extra / 146097);
    quad = julian / 1461;
    julian -= quad * 1461;
    let mut y = (julian * 4 / 1461) as i32;
    julian = if y != 0 {
        (julian + 305) % 365
    } else {
        (julian + 306) % 366
    } + 123;
    y += (quad * 4) as i32;
    let year = y - 4800;
    quad = julian * 2141 / 65536;
    let day = julian - 7834 * quad / 256;
    let month = (quad + 10) % 12 + 1;
    (year, month, day)
}

fn format_date(d: i32) -> String {
    if d == i32::MIN {
        return "-infinity".to_string();
    }
    if d == i32::MAX {
        return "infinity".to_string();
    }
    let (year, month, day) = j2date(d.wrapping_add(POSTGRES_EPOCH_JDATE));
    format!(
        "{:04}-{:02}-{:02}{}",
        if year <= 0 { -year + 1 } else { year },
        month,
        day,
        if year <= 0 { " BC" } else { "" }
    )
}

fn format_time(t: i64) -> String {
    let sec = t / 1_000_000;
    format!(
        "{:02}:{:02}:{:02}.{:06}",
        sec / 3600,
        (sec / 60) % 60,
        sec % 60,
        t % 1_000_000
    )
}

fn format_timestamp(t: i64, with_timezone: bool) -> String {
    if t == DT_NOBEGIN {
        return "-infinity".to_string();
    }
    if t == DT_NOEND {
        return "infinity".to_string();
    }

    let mut t = t;
    let mut jd = t / USECS_PER_DAY;
    if jd != 0 {
        t -= jd * USECS_PER_DAY;
    }
    if t < 0 {
        t += USECS_PER_DAY;
        jd -= 1;
    }
    let (year, month, day) = j2date((jd as i32).wrapping_add(POSTGRES_EPOCH_JDATE));
    let sec = t / 1_000_000;

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}{}{}",
        if year <= 0 { -year + 1 } else { year },
        month,
        day,
        sec / 3600,
        (sec / 60) % 60,
        sec % 60,
        t % 1_000_000,
        if with_timezone { "+00" } else { "" },
        if year <= 0 { " BC" } else { "" }
    )
}
