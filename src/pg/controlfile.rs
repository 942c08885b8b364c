//! `pg_control` parsing.
//!
//! The control file is a single fixed struct written atomically by the
//! server, trailed by a CRC-32C over everything before the CRC field. This
//! module parses the PostgreSQL 14-generation layout (version tag 1300):
//! full-transaction-id checkpoint fields, no pre-11 previous-checkpoint slot.
//! Rendering (including timestamps) lives with the CLI; here is only the
//! fixed-offset parse and the CRC verification.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

/// Control-file version this parser understands.
pub const PG_CONTROL_VERSION: u32 = 1300;

/// Serialized struct length covered by the CRC (offset of the crc field).
pub const PG_CONTROL_CRC_OFFSET: usize = 288;

/// Minimum file prefix needed for a full parse.
pub const PG_CONTROL_DATA_SIZE: usize = PG_CONTROL_CRC_OFFSET + 4;

/// The float-format sample every valid control file stores.
pub const FLOATFORMAT_VALUE: f64 = 1234567.0;

/// Database cluster states, in on-disk order.
const DB_STATES: [&str; 7] = [
    "STARTUP",
    "SHUTDOWNED",
    "SHUTDOWNED_IN_RECOVERY",
    "SHUTDOWNING",
    "IN CRASH RECOVERY",
    "IN ARCHIVE RECOVERY",
    "IN PRODUCTION",
];

/// Checkpoint record embedded in the control file.
#[derive(Debug, Clone, Serialize)]
pub struct CheckPoint {
    pub redo: u64,
    pub this_timeline: u32,
    pub prev_timeline: u32,
    pub full_page_writes: bool,
    /// Full transaction id: epoch in the high 32 bits.
    pub next_xid: u64,
    pub next_oid: u32,
    pub next_multi: u32,
    pub next_multi_offset: u32,
    pub oldest_xid: u32,
    pub oldest_xid_db: u32,
    pub oldest_multi: u32,
    pub oldest_multi_db: u32,
    pub time: i64,
    pub oldest_commit_ts_xid: u32,
    pub newest_commit_ts_xid: u32,
    pub oldest_active_xid: u32,
}

impl CheckPoint {
    pub fn next_xid_epoch(&self) -> u32 {
        (self.next_xid >> 32) as u32
    }

    pub fn next_xid_value(&self) -> u32 {
        self.next_xid as u32
    }
}

/// Parsed control file contents.
#[derive(Debug, Clone, Serialize)]
pub struct ControlFile {
    pub system_identifier: u64,
    pub pg_control_version: u32,
    pub catalog_version_no: u32,
    pub state: u32,
    pub time: i64,
    pub checkpoint: u64,
    pub checkpoint_copy: CheckPoint,
    pub unlogged_lsn: u64,
    pub min_recovery_point: u64,
    pub min_recovery_point_tli: u32,
    pub backup_start_point: u64,
    pub backup_end_point: u64,
    pub backup_end_required: bool,
    pub wal_level: i32,
    pub wal_log_hints: bool,
    pub max_connections: i32,
    pub max_worker_processes: i32,
    pub max_wal_senders: i32,
    pub max_prepared_xacts: i32,
    pub max_locks_per_xact: i32,
    pub track_commit_timestamp: bool,
    pub max_align: u32,
    pub float_format: f64,
    pub blcksz: u32,
    pub relseg_size: u32,
    pub xlog_blcksz: u32,
    pub xlog_seg_size: u32,
    pub name_data_len: u32,
    pub index_max_keys: u32,
    pub toast_max_chunk_size: u32,
    pub loblksize: u32,
    pub float8_by_val: bool,
    pub data_checksum_version: u32,
    pub crc: u32,
    /// CRC-32C computed over the struct prefix, for comparison with `crc`.
    pub crc_computed: u32,
}

impl ControlFile {
    /// Parse a control file image.
    ///
    /// `data` must hold at least [`PG_CONTROL_DATA_SIZE`] bytes; the version
    /// field is the caller's to judge — garbage versions still parse so the
    /// damage can be shown.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < PG_CONTROL_DATA_SIZE {
            return None;
        }

        let checkpoint_copy = CheckPoint {
            redo: LittleEndian::read_u64(&data[40..]),
            this_timeline: LittleEndian::read_u32(&data[48..]),
            prev_timeline: LittleEndian::read_u32(&data[52..]),
            full_page_writes: data[56] != 0,
            next_xid: LittleEndian::read_u64(&data[64..]),
            next_oid: LittleEndian::read_u32(&data[72..]),
            next_multi: LittleEndian::read_u32(&data[76..]),
            next_multi_offset: LittleEndian::read_u32(&data[80..]),
            oldest_xid: LittleEndian::read_u32(&data[84..]),
            oldest_xid_db: LittleEndian::read_u32(&data[88..]),
            oldest_multi: LittleEndian::read_u32(&data[92..]),
            oldest_multi_db: LittleEndian::read_u32(&data[96..]),
            time: LittleEndian::read_i64(&data[104..]),
            oldest_commit_ts_xid: LittleEndian::read_u32(&data[112..]),
            newest_commit_ts_xid: LittleEndian::read_u32(&data[116..]),
            oldest_active_xid: LittleEndian::read_u32(&data[120..]),
        };

        Some(ControlFile {
            system_identifier: LittleEndian::read_u64(&data[0..]),
            pg_control_version: LittleEndian::read_u32(&data[8..]),
            catalog_version_no: LittleEndian::read_u32(&data[12..]),
            state: LittleEndian::read_u32(&data[16..]),
            time: LittleEndian::read_i64(&data[24..]),
            checkpoint: LittleEndian::read_u64(&data[32..]),
            checkpoint_copy,
            unlogged_lsn: LittleEndian::read_u64(&data[128..]),
            min_recovery_point: LittleEndian::read_u64(&data[136..]),
            min_recovery_point_tli: LittleEndian::read_u32(&data[144..]),
            backup_start_point: LittleEndian::read_u64(&data[152..]),
            backup_end_point: LittleEndian::read_u64(&data[160..]),
            backup_end_required: data[168] != 0,
            wal_level: LittleEndian::read_i32(&data[172..]),
            wal_log_hints: data[176] != 0,
            max_connections: LittleEndian::read_i32(&data[180..]),
            max_worker_processes: LittleEndian::read_i32(&data[184..]),
            max_wal_senders: LittleEndian::read_i32(&data[188..]),
            max_prepared_xacts: LittleEndian::read_i32(&data[192..]),
            max_locks_per_xact: LittleEndian::read_i32(&data[196..]),
            track_commit_timestamp: data[200] != 0,
            max_align: LittleEndian::read_u32(&data[204..]),
            float_format: LittleEndian::read_f64(&data[208..]),
            blcksz: LittleEndian::read_u32(&data[216..]),
            relseg_size: LittleEndian::read_u32(&data[220..]),
            xlog_blcksz: LittleEndian::read_u32(&data[224..]),
            xlog_seg_size: LittleEndian::read_u32(&data[228..]),
            name_data_len: LittleEndian::read_u32(&data[232..]),
            index_max_keys: LittleEndian::read_u32(&data[236..]),
            toast_max_chunk_size: LittleEndian::read_u32(&data[240..]),
            loblksize: LittleEndian::read_u32(&data[244..]),
            float8_by_val: data[248] != 0,
            data_checksum_version: LittleEndian::read_u32(&data[252..]),
            crc: LittleEndian::read_u32(&data[PG_CONTROL_CRC_OFFSET..]),
            crc_computed: crc32c::crc32c(&data[..PG_CONTROL_CRC_OFFSET]),
        })
    }

    /// True when the stored CRC matches the computed one.
    pub fn crc_ok(&self) -> bool {
        self.crc == self.crc_computed
    }

    /// True when the version tag matches the supported generation.
    pub fn version_ok(&self) -> bool {
        self.pg_control_version == PG_CONTROL_VERSION
    }

    /// True when the float-format sample decodes correctly.
    pub fn float_format_ok(&self) -> bool {
        self.float_format == FLOATFORMAT_VALUE
    }

    /// Readable database state name.
    pub fn state_name(&self) -> &'static str {
        DB_STATES
            .get(self.state as usize)
            .copied()
            .unwrap_or("UNKNOWN")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn build_control_file() -> Vec<u8> {
        let mut data = vec![0u8; 8192];
        LittleEndian::write_u64(&mut data[0..], 7_000_000_123);
        LittleEndian::write_u32(&mut data[8..], PG_CONTROL_VERSION);
        LittleEndian::write_u32(&mut data[12..], 202107181);
        LittleEndian::write_u32(&mut data[16..], 6); // IN PRODUCTION
        LittleEndian::write_i64(&mut data[24..], 1_700_000_000);
        LittleEndian::write_u64(&mut data[32..], 0x0100_0000_2000);
        LittleEndian::write_u64(&mut data[40..], 0x0100_0000_1000); // redo
        LittleEndian::write_u32(&mut data[48..], 1); // timeline
        LittleEndian::write_u64(&mut data[64..], (2u64 << 32) | 740); // next xid
        LittleEndian::write_u32(&mut data[72..], 24576); // next oid
        LittleEndian::write_u32(&mut data[76..], 1);
        LittleEndian::write_u32(&mut data[80..], 0);
        LittleEndian::write_i64(&mut data[104..], 1_700_000_100);
        LittleEndian::write_u32(&mut data[204..], 8); // max align
        LittleEndian::write_f64(&mut data[208..], FLOATFORMAT_VALUE);
        LittleEndian::write_u32(&mut data[216..], 8192);
        LittleEndian::write_u32(&mut data[220..], 131072);
        LittleEndian::write_u32(&mut data[224..], 8192);
        LittleEndian::write_u32(&mut data[228..], 16 * 1024 * 1024);
        LittleEndian::write_u32(&mut data[232..], 64);
        LittleEndian::write_u32(&mut data[236..], 32);
        LittleEndian::write_u32(&mut data[240..], 1996);
        let crc = crc32c::crc32c(&data[..PG_CONTROL_CRC_OFFSET]);
        LittleEndian::write_u32(&mut data[PG_CONTROL_CRC_OFFSET..], crc);
        data
    }

    #[test]
    fn test_parse_round_trip() {
        let data = build_control_file();
        let ctl = ControlFile::parse(&data).unwrap();
        assert_eq!(ctl.system_identifier, 7_000_000_123);
        assert!(ctl.version_ok());
        assert!(ctl.crc_ok());
        assert!(ctl.float_format_ok());
        assert_eq!(ctl.state_name(), "IN PRODUCTION");
        assert_eq!(ctl.checkpoint_copy.next_xid_epoch(), 2);
        assert_eq!(ctl.checkpoint_copy.next_xid_value(), 740);
        assert_eq!(ctl.blcksz, 8192);
        assert_eq!(ctl.toast_max_chunk_size, 1996);
    }

    #[test]
    fn test_crc_detects_corruption() {
        let mut data = build_control_file();
        data[100] ^= 0xFF;
        let ctl = ControlFile::parse(&data).unwrap();
        assert!(!ctl.crc_ok());
    }

    #[test]
    fn test_short_file_fails() {
        assert!(ControlFile::parse(&[0u8; 64]).is_none());
    }

    #[test]
    fn test_unknown_state_name() {
        let mut data = build_control_file();
        LittleEndian::write_u32(&mut data[16..], 99);
        let crc = crc32c::crc32c(&data[..PG_CONTROL_CRC_OFFSET]);
        LittleEndian::write_u32(&mut data[PG_CONTROL_CRC_OFFSET..], crc);
        let ctl = ControlFile::parse(&data).unwrap();
        assert_eq!(ctl.state_name(), "UNKNOWN");
    }
}
