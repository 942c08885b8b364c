//! Integration tests for TOAST value reconstruction across a side relation.

mod common;

use byteorder::{ByteOrder, LittleEndian};
use std::fs;
use tempfile::TempDir;

use common::*;
use pgfd::cli::dump::{execute, DumpOptions};

const TOAST_MAX_CHUNK_SIZE: usize = 1996;
const EXTSIZE_BITS: u32 = 30;

fn opts(file: &str, toast: bool) -> DumpOptions {
    DumpOptions {
        file: file.to_string(),
        absolute: false,
        binary: false,
        raw: false,
        formatted: false,
        item_detail: false,
        checksums: false,
        skip_old: false,
        toast,
        verbose: false,
        decode: Some("int,text".to_string()),
        range: None,
        block_size: None,
        segment_size: None,
        segment_number: None,
        index: false,
        heap: false,
    }
}

fn run(opts: &DumpOptions) -> (String, bool) {
    let mut out = Vec::new();
    let outcome = execute(opts, &mut out).expect("dump should not fail fatally");
    (String::from_utf8(out).unwrap(), outcome.failed)
}

/// Write a main file whose single row is (42, <external pointer>) and a side
/// relation holding `external` split into chunk tuples.
fn write_toasted_pair(
    dir: &TempDir,
    raw_size: i32,
    extinfo: u32,
    value_id: u32,
    relid: u32,
    external: &[u8],
) -> String {
    let mut payload = vec![0u8; 4];
    LittleEndian::write_i32(&mut payload[0..], 42);
    payload.extend_from_slice(&toast_pointer(raw_size, extinfo, value_id, relid));
    let main_tuple = heap_tuple(2, 0, &[], &payload);
    let main_path = dir.path().join("16384");
    fs::write(&main_path, heap_block(&[main_tuple])).unwrap();

    let chunks: Vec<Vec<u8>> = external
        .chunks(TOAST_MAX_CHUNK_SIZE)
        .enumerate()
        .map(|(seq, chunk)| chunk_tuple(value_id, seq as u32, chunk))
        .collect();
    let side_path = dir.path().join(relid.to_string());
    fs::write(&side_path, heap_block(&chunks)).unwrap();

    main_path.to_str().unwrap().to_string()
}

#[test]
fn uncompressed_value_reassembles_across_chunks() {
    let dir = TempDir::new().unwrap();
    let value: Vec<u8> = std::iter::repeat(b"pagebytes".to_vec())
        .flatten()
        .take(5000)
        .collect();

    // Uncompressed: external size == raw size - header
    let main = write_toasted_pair(&dir, value.len() as i32 + 4, value.len() as u32, 99, 16400, &value);

    let (out, failed) = run(&opts(&main, true));
    let expected = format!("COPY: 42\t{}", String::from_utf8(value).unwrap());
    assert!(out.contains(&expected), "reassembled value missing from output");
    assert!(out.contains("TOAST value. Raw size:"));
    assert!(!failed);
}

#[test]
fn compressed_value_decompresses_to_original_bytes() {
    let dir = TempDir::new().unwrap();
    let raw_len = 3000usize;
    let stream = pglz_compress_run(b'Z', raw_len);

    // External data: 4-byte raw-size/method word, then the pglz stream
    let mut external = vec![0u8; 4];
    LittleEndian::write_u32(&mut external[0..], raw_len as u32); // method 0 = pglz
    external.extend_from_slice(&stream);

    let extinfo = external.len() as u32; // compressed: extsize < rawsize - 4
    let main = write_toasted_pair(&dir, raw_len as i32 + 4, extinfo, 7, 16402, &external);

    let (out, failed) = run(&opts(&main, true));
    let expected = format!("COPY: 42\t{}", "Z".repeat(raw_len));
    assert!(out.contains(&expected), "decompressed value missing from output");
    assert!(!failed);
}

#[test]
fn lz4_compressed_value_decompresses() {
    let dir = TempDir::new().unwrap();
    let value = b"forensic page decoding ".repeat(200);
    let stream = lz4_flex::block::compress(&value);

    let mut external = vec![0u8; 4];
    LittleEndian::write_u32(
        &mut external[0..],
        value.len() as u32 | (1 << EXTSIZE_BITS), // method 1 = lz4
    );
    external.extend_from_slice(&stream);

    let extinfo = external.len() as u32 | (1 << EXTSIZE_BITS);
    let main = write_toasted_pair(&dir, value.len() as i32 + 4, extinfo, 8, 16404, &external);

    let (out, failed) = run(&opts(&main, true));
    let expected = format!("COPY: 42\t{}", String::from_utf8(value).unwrap());
    assert!(out.contains(&expected));
    assert!(!failed);
}

#[test]
fn missing_side_relation_degrades_to_placeholder() {
    let dir = TempDir::new().unwrap();
    let mut payload = vec![0u8; 4];
    LittleEndian::write_i32(&mut payload[0..], 42);
    payload.extend_from_slice(&toast_pointer(5004, 5000, 99, 55555));
    let main_path = dir.path().join("16384");
    fs::write(&main_path, heap_block(&[heap_tuple(2, 0, &[], &payload)])).unwrap();

    let (out, failed) = run(&opts(main_path.to_str().unwrap(), true));
    assert!(out.contains("Cannot open TOAST relation"));
    assert!(out.contains("(TOASTED,unavailable)"));
    assert!(failed);
}

#[test]
fn incomplete_chunks_degrade_to_placeholder() {
    let dir = TempDir::new().unwrap();
    let value = vec![b'q'; 5000];
    // Side relation only carries the first chunk of three
    let main = {
        let mut payload = vec![0u8; 4];
        LittleEndian::write_i32(&mut payload[0..], 42);
        payload.extend_from_slice(&toast_pointer(5004, 5000, 99, 16406));
        let main_path = dir.path().join("16384");
        fs::write(&main_path, heap_block(&[heap_tuple(2, 0, &[], &payload)])).unwrap();
        let side_path = dir.path().join("16406");
        fs::write(
            &side_path,
            heap_block(&[chunk_tuple(99, 0, &value[..TOAST_MAX_CHUNK_SIZE])]),
        )
        .unwrap();
        main_path.to_str().unwrap().to_string()
    };

    let (out, failed) = run(&opts(&main, true));
    assert!(out.contains("(TOASTED,unavailable)"));
    assert!(failed);
}

#[test]
fn without_toast_flag_pointer_renders_as_marker() {
    let dir = TempDir::new().unwrap();
    let value = vec![b'q'; 5000];
    let main = write_toasted_pair(&dir, 5004, 5000, 99, 16408, &value);

    // Uncompressed pointer, no -t
    let (out, failed) = run(&opts(&main, false));
    assert!(out.contains("COPY: 42\t(TOASTED,uncompressed)"));
    assert!(!failed);

    // Compressed pglz pointer, no -t
    let main = write_toasted_pair(&dir, 90004, 5000, 99, 16410, &value);
    let (out, _) = run(&opts(&main, false));
    assert!(out.contains("COPY: 42\t(TOASTED,pglz)"));

    // Compressed lz4 pointer, no -t
    let main = write_toasted_pair(&dir, 90004, 5000 | (1 << EXTSIZE_BITS), 99, 16412, &value);
    let (out, _) = run(&opts(&main, false));
    assert!(out.contains("COPY: 42\t(TOASTED,lz4)"));
}

#[test]
fn chunks_for_other_values_are_ignored() {
    let dir = TempDir::new().unwrap();
    let value = vec![b'v'; 100];

    let mut payload = vec![0u8; 4];
    LittleEndian::write_i32(&mut payload[0..], 42);
    payload.extend_from_slice(&toast_pointer(104, 100, 99, 16414));
    let main_path = dir.path().join("16384");
    fs::write(&main_path, heap_block(&[heap_tuple(2, 0, &[], &payload)])).unwrap();

    // Side relation interleaves a foreign value's chunks before ours
    let side_path = dir.path().join("16414");
    fs::write(
        &side_path,
        heap_block(&[
            chunk_tuple(11, 0, &[b'x'; 50]),
            chunk_tuple(99, 0, &value),
            chunk_tuple(11, 1, &[b'x'; 50]),
        ]),
    )
    .unwrap();

    let (out, failed) = run(&opts(main_path.to_str().unwrap(), true));
    let expected = format!("COPY: 42\t{}", "v".repeat(100));
    assert!(out.contains(&expected));
    assert!(!failed);
}
