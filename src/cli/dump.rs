//! The `pgfd dump` subcommand: formatted dump of heap/index file blocks.

use std::io::Write;
use std::path::PathBuf;

use crate::cli::{parse_range, ExecOutcome};
use crate::pg::decode::parse_attribute_types;
use crate::pg::dump::{dump_file_contents, DumpConfig, ForcedFormat, ScanState};
use crate::pg::relfile::RelFile;
use crate::PgfdError;

pub struct DumpOptions {
    pub file: String,
    pub absolute: bool,
    pub binary: bool,
    pub raw: bool,
    pub formatted: bool,
    pub item_detail: bool,
    pub checksums: bool,
    pub skip_old: bool,
    pub toast: bool,
    pub verbose: bool,
    pub decode: Option<String>,
    pub range: Option<String>,
    pub block_size: Option<u32>,
    pub segment_size: Option<u32>,
    pub segment_number: Option<u32>,
    pub index: bool,
    pub heap: bool,
}

/// Translate CLI options into an immutable [`DumpConfig`].
///
/// All configuration errors (bad type list, bad range) surface here, before
/// the input file is opened — a bad flag must not produce partial output.
fn build_config(opts: &DumpOptions) -> Result<DumpConfig, PgfdError> {
    let mut cfg = DumpConfig::new(PathBuf::from(&opts.file));

    cfg.absolute_addressing = opts.absolute;
    cfg.binary_dump = opts.binary;
    cfg.no_interpret = opts.raw;
    cfg.format_binary = opts.formatted;
    cfg.item_detail = opts.item_detail;
    cfg.verify_checksums = opts.checksums;
    cfg.ignore_old = opts.skip_old;
    cfg.decode_toast = opts.toast;
    cfg.verbose = opts.verbose;
    cfg.block_size = opts.block_size;
    cfg.segment_number = opts.segment_number;
    if let Some(size) = opts.segment_size {
        if size == 0 {
            return Err(PgfdError::Argument("Invalid segment size requested <0>.".to_string()));
        }
        cfg.segment_size = size;
    }
    if let Some(types) = &opts.decode {
        cfg.decode_types = Some(parse_attribute_types(types)?);
    }
    if let Some(range) = &opts.range {
        cfg.range = Some(parse_range(range)?);
    }
    if opts.index {
        cfg.format_override = Some(ForcedFormat::Index);
    } else if opts.heap {
        cfg.format_override = Some(ForcedFormat::Heap);
    }

    // A binary or non-interpreted dump turns off the interpretation options
    // it cannot honour.
    if cfg.binary_dump {
        cfg.no_interpret = false;
        cfg.format_binary = false;
        cfg.item_detail = false;
        cfg.decode_types = None;
        cfg.decode_toast = false;
    } else if cfg.no_interpret {
        cfg.item_detail = false;
        cfg.decode_types = None;
        cfg.decode_toast = false;
    }

    Ok(cfg)
}

pub fn execute(opts: &DumpOptions, writer: &mut dyn Write) -> Result<ExecOutcome, PgfdError> {
    let cfg = build_config(opts)?;

    let mut rel = match cfg.block_size {
        Some(size) => RelFile::open_with_block_size(&cfg.file, size)?,
        None => RelFile::open(&cfg.file)?,
    };

    let mut scan = ScanState::new(false);
    dump_file_contents(&cfg, &mut rel, &mut scan, writer, None)?;

    Ok(ExecOutcome { failed: scan.failed })
}
