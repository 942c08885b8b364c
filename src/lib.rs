//! PostgreSQL file analysis toolkit.
//!
//! The `pgpage-utils` crate (library name `pgfd`) provides Rust types and
//! functions for parsing and inspecting the on-disk page format of PostgreSQL
//! heap (data) files, index files, `pg_control`, and `pg_filenode.map` —
//! without a running server. It is a read-only forensic tool: nothing is ever
//! written back to the files being inspected.
//!
//! # CLI Reference
//!
//! Install the `pgfd` binary and use its subcommands to work with PostgreSQL
//! data files from the command line.
//!
//! ## Subcommands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | [`pgfd dump`](cli::app::Commands::Dump) | Formatted dump of heap/index file blocks, items, and special sections |
//! | [`pgfd control`](cli::app::Commands::Control) | Dump `pg_control` contents with CRC verification |
//! | [`pgfd relmap`](cli::app::Commands::Relmap) | Dump `pg_filenode.map` OID/filenode mappings |
//!
//! All subcommands accept `--color <auto|always|never>` and `--output <file>`.
//! `pgfd dump` supports tuple decoding (`-D int,text,...`), TOAST
//! reconstruction (`-t`), checksum verification (`-k`), block ranges (`-R`),
//! hex+ascii dumps (`-f`), and raw binary output (`-b`).
//!
//! # Library API
//!
//! ## Quick example
//!
//! ```no_run
//! use pgfd::pg::relfile::RelFile;
//! use pgfd::pg::page::PageHeader;
//!
//! // Open a heap file (block size is auto-detected from block 0)
//! let mut rel = RelFile::open("16384").unwrap();
//!
//! // Read and inspect the first block
//! let block = rel.read_block().unwrap().unwrap();
//! let header = PageHeader::parse(&block.data).unwrap();
//! println!("lower={} upper={} special={}", header.lower, header.upper, header.special);
//! ```
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`pg::relfile`] | File I/O, block size detection, sequential block reads |
//! | [`pg::page`] | Page header and item (line pointer) array parsing |
//! | [`pg::special`] | Special-section classification (B-tree, hash, GiST, GIN, SP-GiST, sequence) |
//! | [`pg::tuple`] | Heap/index/SP-GiST tuple interpretation and GIN posting lists |
//! | [`pg::decode`] | Attribute-level tuple decoding into COPY-style text rows |
//! | [`pg::toast`] | Out-of-line (TOAST) value reconstruction from side relations |
//! | [`pg::pglz`] | pglz decompression for compressed varlena values |
//! | [`pg::checksum`] | Data page checksum computation and verification |
//! | [`pg::controlfile`] | `pg_control` parsing with CRC-32C verification |
//! | [`pg::relmap`] | `pg_filenode.map` parsing |
//! | [`pg::dump`] | The block-by-block formatting engine used by `pgfd dump` |
//!
//! # Format generation
//!
//! One on-disk generation is targeted explicitly: page layout version 4 as
//! written by PostgreSQL 14–16 on little-endian hosts with 8-byte maximum
//! alignment. This covers the varlena compressed-header bit layout (2-bit
//! compression method), numeric NaN/±Infinity sentinels, and the pg_control
//! layout with full-transaction-id checkpoint fields. Files from other
//! generations are reported rather than silently misread.

#[cfg(feature = "cli")]
pub mod cli;
pub mod pg;
pub mod util;

use thiserror::Error;

/// Errors returned by `pgfd` operations.
///
/// Only genuinely fatal conditions surface here (cannot open a file, cannot
/// read the initial header, invalid configuration). Structural anomalies found
/// while formatting a possibly-corrupted block are reported inline on the
/// output stream and the scan continues — see [`pg::dump::ScanState`].
#[derive(Error, Debug)]
pub enum PgfdError {
    /// An I/O error occurred (file open, read, or seek failure).
    #[error("I/O error: {0}")]
    Io(String),

    /// A parse error occurred (malformed binary data or unexpected values).
    #[error("Parse error: {0}")]
    Parse(String),

    /// An invalid argument was supplied (bad type list, bad range, etc.).
    #[error("Invalid argument: {0}")]
    Argument(String),
}

/// Write a line to the given writer, converting io::Error to PgfdError.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err(|e| $crate::PgfdError::Io(e.to_string()))
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err(|e| $crate::PgfdError::Io(e.to_string()))
    };
}

/// Write (without newline) to the given writer, converting io::Error to PgfdError.
macro_rules! wprint {
    ($w:expr, $($arg:tt)*) => {
        write!($w, $($arg)*).map_err(|e| $crate::PgfdError::Io(e.to_string()))
    };
}

pub(crate) use wprint;
pub(crate) use wprintln;
