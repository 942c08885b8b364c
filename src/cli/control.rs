//! The `pgfd control` subcommand: dump `pg_control` contents.

use std::io::Write;

use crate::cli::ExecOutcome;
use crate::pg::controlfile::{ControlFile, PG_CONTROL_DATA_SIZE, PG_CONTROL_VERSION};
use crate::util::hex::format_binary;
use crate::{wprint, wprintln, PgfdError};

pub struct ControlOptions {
    pub file: String,
    pub formatted: bool,
    pub json: bool,
}

/// Render a unix timestamp the way `ctime` does.
fn format_pg_time(t: i64) -> String {
    match chrono::DateTime::from_timestamp(t, 0) {
        Some(ts) => ts.format("%a %b %e %H:%M:%S %Y").to_string(),
        None => format!("<invalid time {}>", t),
    }
}

pub fn execute(opts: &ControlOptions, writer: &mut dyn Write) -> Result<ExecOutcome, PgfdError> {
    let data = std::fs::read(&opts.file)
        .map_err(|e| PgfdError::Io(format!("Cannot open {}: {}", opts.file, e)))?;

    let mut outcome = ExecOutcome::default();

    wprintln!(
        writer,
        "\n<pg_control Contents> *********************************************\n"
    )?;

    match ControlFile::parse(&data) {
        Some(ctl) => {
            if opts.json {
                let rendered = serde_json::to_string_pretty(&ctl)
                    .map_err(|e| PgfdError::Parse(format!("Cannot serialize control data: {}", e)))?;
                wprintln!(writer, "{}", rendered)?;
                outcome.failed = !ctl.crc_ok();
                return Ok(outcome);
            }

            let checkpoint = &ctl.checkpoint_copy;
            wprintln!(writer, "                          CRC: {}", if ctl.crc_ok() { "Correct" } else { "Not Correct" })?;
            wprintln!(
                writer,
                "           pg_control Version: {}{}",
                ctl.pg_control_version,
                if ctl.version_ok() { "" } else { " (Not Correct!)" }
            )?;
            wprintln!(writer, "              Catalog Version: {}", ctl.catalog_version_no)?;
            wprintln!(writer, "            System Identifier: {}", ctl.system_identifier)?;
            wprintln!(writer, "                        State: {}", ctl.state_name())?;
            wprintln!(writer, "                Last Mod Time: {}", format_pg_time(ctl.time))?;
            wprintln!(
                writer,
                "       Last Checkpoint Record: Log File ({}) Offset (0x{:08x})",
                ctl.checkpoint >> 32,
                ctl.checkpoint as u32
            )?;
            wprintln!(
                writer,
                "  Last Checkpoint Record Redo: Log File ({}) Offset (0x{:08x})",
                checkpoint.redo >> 32,
                checkpoint.redo as u32
            )?;
            wprintln!(writer, "             |-    TimeLineID: {}", checkpoint.this_timeline)?;
            wprintln!(
                writer,
                "             |-      Next XID: {}/{}",
                checkpoint.next_xid_epoch(),
                checkpoint.next_xid_value()
            )?;
            wprintln!(writer, "             |-      Next OID: {}", checkpoint.next_oid)?;
            wprintln!(writer, "             |-    Next Multi: {}", checkpoint.next_multi)?;
            wprintln!(writer, "             |- Next MultiOff: {}", checkpoint.next_multi_offset)?;
            wprintln!(writer, "             |-          Time: {}", format_pg_time(checkpoint.time))?;
            wprintln!(
                writer,
                "       Minimum Recovery Point: Log File ({}) Offset (0x{:08x})",
                ctl.min_recovery_point >> 32,
                ctl.min_recovery_point as u32
            )?;
            wprintln!(writer, "       Maximum Data Alignment: {}", ctl.max_align)?;
            wprintln!(
                writer,
                "        Floating-Point Sample: {:.7}{}",
                ctl.float_format,
                if ctl.float_format_ok() { "" } else { " (Not Correct!)" }
            )?;
            wprintln!(writer, "          Database Block Size: {}", ctl.blcksz)?;
            wprintln!(writer, "           Blocks Per Segment: {}", ctl.relseg_size)?;
            wprintln!(writer, "              XLOG Block Size: {}", ctl.xlog_blcksz)?;
            wprintln!(writer, "            XLOG Segment Size: {}", ctl.xlog_seg_size)?;
            wprintln!(writer, "    Maximum Identifier Length: {}", ctl.name_data_len)?;
            wprintln!(writer, "           Maximum Index Keys: {}", ctl.index_max_keys)?;
            wprintln!(writer, "             TOAST Chunk Size: {}\n", ctl.toast_max_chunk_size)?;

            if !ctl.crc_ok() {
                outcome.failed = true;
            }
            if !ctl.version_ok() {
                wprintln!(
                    writer,
                    "pg_control version {} differs from the supported {}; fields beyond the common prefix may be misread.\n",
                    ctl.pg_control_version,
                    PG_CONTROL_VERSION
                )?;
            }

            if opts.formatted {
                wprintln!(
                    writer,
                    "<pg_control Formatted Dump> ***************************************\n"
                )?;
                wprint!(writer, "{}", format_binary(&data, 0, data.len(), None))?;
            }
        }
        None => {
            outcome.failed = true;
            wprintln!(
                writer,
                " Error: pg_control file size incorrect.\n        Size: Correct <{}>  Received <{}>.\n",
                PG_CONTROL_DATA_SIZE,
                data.len()
            )?;
            // Force a formatted dump so the damage is visible.
            wprintln!(
                writer,
                "<pg_control Formatted Dump> ***************************************\n"
            )?;
            wprint!(writer, "{}", format_binary(&data, 0, data.len(), None))?;
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pg_time() {
        // 2021-11-14 ~22:13:20 UTC
        let text = format_pg_time(1_636_928_000);
        assert!(text.contains("2021"));
        assert!(text.contains("Nov"));
    }
}
