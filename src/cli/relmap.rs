//! The `pgfd relmap` subcommand: dump `pg_filenode.map` mappings.

use std::io::Write;

use crate::cli::ExecOutcome;
use crate::pg::constants::{RELMAP_FILE_SIZE, RELMAP_MAX_MAPPINGS};
use crate::pg::relmap::RelMapFile;
use crate::{wprintln, PgfdError};

pub struct RelmapOptions {
    pub file: String,
}

pub fn execute(opts: &RelmapOptions, writer: &mut dyn Write) -> Result<ExecOutcome, PgfdError> {
    let data = std::fs::read(&opts.file)
        .map_err(|e| PgfdError::Io(format!("Cannot open {}: {}", opts.file, e)))?;

    let mut outcome = ExecOutcome::default();

    let Some(map) = RelMapFile::parse(&data) else {
        wprintln!(
            writer,
            "Read {} bytes, expected {}",
            data.len(),
            RELMAP_FILE_SIZE
        )?;
        outcome.failed = true;
        return Ok(outcome);
    };

    wprintln!(
        writer,
        "Magic Number: 0x{:x} ({})",
        map.magic,
        if map.magic_ok() { "CORRECT" } else { "INCORRECT" }
    )?;
    if !map.magic_ok() {
        outcome.failed = true;
    }

    wprintln!(writer, "Num Mappings: {}", map.num_mappings)?;
    wprintln!(writer, "Detailed Mappings list:")?;
    if map.count_clamped() {
        wprintln!(
            writer,
            "  NOTE: listing has been limited to the first {} mappings",
            RELMAP_MAX_MAPPINGS
        )?;
        wprintln!(
            writer,
            "        (perhaps your file is not a valid pg_filenode.map file?)"
        )?;
    }
    for mapping in &map.mappings {
        wprintln!(writer, "OID: {}\tFilenode: {}", mapping.oid, mapping.filenode)?;
    }

    Ok(outcome)
}
