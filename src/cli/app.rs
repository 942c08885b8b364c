use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "pgfd")]
#[command(about = "PostgreSQL heap/index/control file analysis toolkit")]
#[command(version)]
pub struct Cli {
    /// Control colored output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Formatted dump of heap/index file blocks
    Dump {
        /// Path to the relation segment file
        file: String,

        /// Display absolute addresses when formatting
        #[arg(short = 'a', long)]
        absolute: bool,

        /// Output raw binary block images (turns off all formatting)
        #[arg(short = 'b', long)]
        binary: bool,

        /// Hex+ascii dump only, without interpretation
        #[arg(short = 'd', long = "raw")]
        raw: bool,

        /// Hex+ascii dumps alongside the interpreted output
        #[arg(short = 'f', long)]
        formatted: bool,

        /// Display interpreted item details
        #[arg(short = 'i', long = "items")]
        item_detail: bool,

        /// Verify block checksums
        #[arg(short = 'k', long)]
        checksums: bool,

        /// Report tuples removed by a committed delete instead of decoding
        #[arg(short = 'o', long = "skip-old")]
        skip_old: bool,

        /// Reconstruct TOASTed values from the side relation
        #[arg(short = 't', long)]
        toast: bool,

        /// Show TOAST scan detail
        #[arg(short = 'v', long)]
        verbose: bool,

        /// Decode tuples using a comma separated list of types
        /// (e.g. "int,text,~"; see the README for the full registry)
        #[arg(short = 'D', long = "decode", value_name = "TYPES")]
        decode: Option<String>,

        /// Block range to dump: START or START:END, indexed from 0
        #[arg(short = 'R', long, value_name = "RANGE")]
        range: Option<String>,

        /// Force block size instead of detecting it from block 0
        #[arg(short = 'S', long = "block-size")]
        block_size: Option<u32>,

        /// Force segment size in bytes
        #[arg(short = 's', long = "segment-size")]
        segment_size: Option<u32>,

        /// Force segment number instead of deriving it from the file name
        #[arg(short = 'n', long = "segment-number")]
        segment_number: Option<u32>,

        /// Force interpretation of block items as index items
        #[arg(short = 'x', long = "index", conflicts_with = "heap")]
        index: bool,

        /// Force interpretation of block items as heap items
        #[arg(short = 'y', long = "heap", conflicts_with = "index")]
        heap: bool,
    },

    /// Dump pg_control contents with CRC verification
    Control {
        /// Path to the pg_control file
        file: String,

        /// Hex+ascii dump alongside the interpretation
        #[arg(short = 'f', long)]
        formatted: bool,

        /// Output the parsed contents as JSON
        #[arg(long)]
        json: bool,
    },

    /// Dump pg_filenode.map OID/filenode mappings
    Relmap {
        /// Path to the pg_filenode.map file
        file: String,
    },
}
