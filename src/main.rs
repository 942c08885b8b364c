#[cfg(not(feature = "cli"))]
compile_error!("The `pgfd` binary requires the `cli` feature. Build with `--features cli`.");

use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::Write;
use std::process;

use pgfd::cli;
use pgfd::cli::app::{Cli, ColorMode, Commands};
use pgfd::cli::ExecOutcome;
use pgfd::PgfdError;

fn main() {
    let cli = Cli::parse();

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {} // colored auto-detects tty
    }

    let writer_result: Result<Box<dyn Write>, PgfdError> = match &cli.output {
        Some(path) => File::create(path)
            .map(|f| Box::new(f) as Box<dyn Write>)
            .map_err(|e| PgfdError::Io(format!("Cannot create {}: {}", path, e))),
        None => Ok(Box::new(std::io::stdout()) as Box<dyn Write>),
    };

    let mut writer = match writer_result {
        Ok(w) => w,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<ExecOutcome, PgfdError> = match cli.command {
        Commands::Dump {
            file,
            absolute,
            binary,
            raw,
            formatted,
            item_detail,
            checksums,
            skip_old,
            toast,
            verbose,
            decode,
            range,
            block_size,
            segment_size,
            segment_number,
            index,
            heap,
        } => cli::dump::execute(
            &cli::dump::DumpOptions {
                file,
                absolute,
                binary,
                raw,
                formatted,
                item_detail,
                checksums,
                skip_old,
                toast,
                verbose,
                decode,
                range,
                block_size,
                segment_size,
                segment_number,
                index,
                heap,
            },
            &mut writer,
        ),

        Commands::Control { file, formatted, json } => cli::control::execute(
            &cli::control::ControlOptions { file, formatted, json },
            &mut writer,
        ),

        Commands::Relmap { file } => {
            cli::relmap::execute(&cli::relmap::RelmapOptions { file }, &mut writer)
        }
    };

    match result {
        Ok(outcome) => {
            let _ = writer.flush();
            process::exit(if outcome.failed { 1 } else { 0 });
        }
        Err(e) => {
            let _ = writer.flush();
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}
