//! Integration tests for the `control` subcommand.

use byteorder::{ByteOrder, LittleEndian};
use std::fs;
use tempfile::TempDir;

use pgfd::cli::control::{execute, ControlOptions};
use pgfd::pg::controlfile::{PG_CONTROL_CRC_OFFSET, PG_CONTROL_VERSION};

fn build_control_image() -> Vec<u8> {
    let mut data = vec![0u8; 8192];
    LittleEndian::write_u64(&mut data[0..], 7_123_456_789_012);
    LittleEndian::write_u32(&mut data[8..], PG_CONTROL_VERSION);
    LittleEndian::write_u32(&mut data[12..], 202107181);
    LittleEndian::write_u32(&mut data[16..], 6); // IN PRODUCTION
    LittleEndian::write_i64(&mut data[24..], 1_700_000_000);
    LittleEndian::write_u64(&mut data[32..], 0x0100_0000_2000);
    LittleEndian::write_u64(&mut data[40..], 0x0100_0000_1000); // redo
    LittleEndian::write_u32(&mut data[48..], 1); // timeline
    LittleEndian::write_u64(&mut data[64..], (2u64 << 32) | 740); // next xid
    LittleEndian::write_u32(&mut data[72..], 24576); // next oid
    LittleEndian::write_i64(&mut data[104..], 1_700_000_100); // checkpoint time
    LittleEndian::write_u32(&mut data[204..], 8); // max align
    LittleEndian::write_f64(&mut data[208..], 1234567.0);
    LittleEndian::write_u32(&mut data[216..], 8192); // blcksz
    LittleEndian::write_u32(&mut data[220..], 131072); // relseg
    LittleEndian::write_u32(&mut data[224..], 8192); // xlog blcksz
    LittleEndian::write_u32(&mut data[228..], 16 * 1024 * 1024); // xlog seg
    LittleEndian::write_u32(&mut data[232..], 64); // namedatalen
    LittleEndian::write_u32(&mut data[236..], 32); // index max keys
    LittleEndian::write_u32(&mut data[240..], 1996); // toast chunk
    let crc = crc32c::crc32c(&data[..PG_CONTROL_CRC_OFFSET]);
    LittleEndian::write_u32(&mut data[PG_CONTROL_CRC_OFFSET..], crc);
    data
}

fn run(opts: &ControlOptions) -> (String, bool) {
    let mut out = Vec::new();
    let outcome = execute(opts, &mut out).expect("control dump should not fail fatally");
    (String::from_utf8(out).unwrap(), outcome.failed)
}

#[test]
fn dumps_control_contents_with_correct_crc() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pg_control");
    fs::write(&path, build_control_image()).unwrap();

    let opts = ControlOptions {
        file: path.to_str().unwrap().to_string(),
        formatted: false,
        json: false,
    };
    let (out, failed) = run(&opts);
    assert!(out.contains("CRC: Correct"));
    assert!(out.contains("State: IN PRODUCTION"));
    assert!(out.contains("Next XID: 2/740"));
    assert!(out.contains("Database Block Size: 8192"));
    assert!(out.contains("TOAST Chunk Size: 1996"));
    assert!(out.contains("2023")); // both timestamps fall in 2023
    assert!(!failed);
}

#[test]
fn corrupted_crc_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pg_control");
    let mut image = build_control_image();
    image[50] ^= 0xFF;
    fs::write(&path, image).unwrap();

    let opts = ControlOptions {
        file: path.to_str().unwrap().to_string(),
        formatted: false,
        json: false,
    };
    let (out, failed) = run(&opts);
    assert!(out.contains("CRC: Not Correct"));
    assert!(failed);
}

#[test]
fn json_output_carries_parsed_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pg_control");
    fs::write(&path, build_control_image()).unwrap();

    let opts = ControlOptions {
        file: path.to_str().unwrap().to_string(),
        formatted: false,
        json: true,
    };
    let (out, failed) = run(&opts);
    let json_start = out.find('{').expect("json object in output");
    let parsed: serde_json::Value = serde_json::from_str(&out[json_start..]).unwrap();
    assert_eq!(parsed["blcksz"], 8192);
    assert_eq!(parsed["pg_control_version"], PG_CONTROL_VERSION);
    assert_eq!(parsed["checkpoint_copy"]["next_oid"], 24576);
    assert!(!failed);
}

#[test]
fn short_file_forces_formatted_dump() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pg_control");
    fs::write(&path, vec![0xAAu8; 64]).unwrap();

    let opts = ControlOptions {
        file: path.to_str().unwrap().to_string(),
        formatted: false,
        json: false,
    };
    let (out, failed) = run(&opts);
    assert!(out.contains("pg_control file size incorrect"));
    assert!(out.contains("<pg_control Formatted Dump>"));
    assert!(out.contains("aaaaaaaa"));
    assert!(failed);
}
