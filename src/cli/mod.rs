//! CLI subcommand implementations for the `pgfd` binary.
//!
//! CLI argument parsing uses clap derive macros, with the top-level
//! [`app::Cli`] struct and [`app::Commands`] enum defined in [`app`]. Each
//! subcommand module follows the same pattern: an `Options` struct holding
//! the parsed arguments and a `pub fn execute(opts, writer) -> Result<(),
//! PgfdError>` entry point. The `writer: &mut dyn Write` parameter allows
//! output to be captured in tests or redirected to a file via the global
//! `--output` flag.
//!
//! | Command | Module | Purpose |
//! |---------|--------|---------|
//! | `pgfd dump` | [`dump`] | Formatted block dump with item/tuple interpretation |
//! | `pgfd control` | [`control`] | `pg_control` dump with CRC verification |
//! | `pgfd relmap` | [`relmap`] | `pg_filenode.map` dump |
//!
//! Recoverable structural anomalies print inline and surface as a non-zero
//! exit status via [`ExecOutcome::failed`]; fatal problems (unopenable file,
//! invalid configuration) come back as `Err` before any output is produced.

pub mod app;
pub mod control;
pub mod dump;
pub mod relmap;

use crate::PgfdError;

/// What a subcommand run reports back to `main`.
#[derive(Debug, Default)]
pub struct ExecOutcome {
    /// Structural anomalies were reported inline; exit non-zero.
    pub failed: bool,
}

/// Parse a `-R START[:END]` range argument.
pub(crate) fn parse_range(range: &str) -> Result<(u32, u32), PgfdError> {
    let (start, end) = match range.split_once(':') {
        Some((start, end)) => (start, Some(end)),
        None => (range, None),
    };
    let start: u32 = start
        .trim()
        .parse()
        .map_err(|_| PgfdError::Argument(format!("Invalid range start identifier <{}>.", start)))?;
    let end: u32 = match end {
        Some(end) => end
            .trim()
            .parse()
            .map_err(|_| PgfdError::Argument(format!("Invalid range end identifier <{}>.", end)))?,
        None => start,
    };
    if start > end {
        return Err(PgfdError::Argument(format!(
            "Requested block range start <{}> is greater than end <{}>.",
            start, end
        )));
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_single_block() {
        assert_eq!(parse_range("7").unwrap(), (7, 7));
    }

    #[test]
    fn test_parse_range_span() {
        assert_eq!(parse_range("2:9").unwrap(), (2, 9));
    }

    #[test]
    fn test_parse_range_inverted_rejected() {
        assert!(parse_range("9:2").is_err());
    }

    #[test]
    fn test_parse_range_garbage_rejected() {
        assert!(parse_range("abc").is_err());
        assert!(parse_range("1:xyz").is_err());
    }
}
