//! CLI argument definitions for `tts`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use tts_standards::StandardFamily;

#[derive(Parser)]
#[command(
    name = "tts",
    version,
    about = "Transformer Test Studio - inspect module stores and insulation tables",
    long_about = "Inspect and edit the module stores of Transformer Test Studio.\n\n\
                  Reads and writes the backend data API, falling back to local\n\
                  storage when the backend is unreachable, and lists the IEC, NBR\n\
                  and IEEE insulation levels."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConnectionArgs {
    /// Config file (default: platform config directory).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Data API base URL, e.g. http://localhost:8000/api/data.
    #[arg(long = "base-url", value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Directory for the local fallback store.
    #[arg(long = "local-dir", value_name = "DIR", global = true)]
    pub local_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check that the backend is reachable.
    Health,

    /// List the stores known to the backend.
    Stores,

    /// Print a store's value.
    Get {
        #[arg(value_name = "STORE")]
        store: String,
    },

    /// Merge a JSON object into a store.
    Update {
        #[arg(value_name = "STORE")]
        store: String,
        #[arg(value_name = "JSON")]
        json: String,
    },

    /// Replace a store's value with a JSON object.
    Set {
        #[arg(value_name = "STORE")]
        store: String,
        #[arg(value_name = "JSON")]
        json: String,
    },

    /// Clear a module's data, or every store with --all.
    Clear(ClearArgs),

    /// Print a store export (store id, data, timestamp).
    Export {
        #[arg(value_name = "STORE")]
        store: String,
    },

    /// Import a store from a JSON file.
    Import {
        #[arg(value_name = "STORE")]
        store: String,
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Write a backup of every store to a file.
    Backup {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Restore stores from a backup file.
    Restore {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// List the voltage classes of a standard.
    Classes {
        #[arg(long = "standard", value_enum, default_value = "iec")]
        standard: StandardArg,
    },

    /// Show the insulation levels of one voltage class.
    Levels {
        #[arg(long = "standard", value_enum, default_value = "iec")]
        standard: StandardArg,

        /// Voltage class (Um) in kV.
        #[arg(long = "um", value_name = "KV")]
        um: f64,
    },
}

#[derive(Args)]
pub struct ClearArgs {
    /// Module name (losses, applied_voltage, history, ...) or store id.
    #[arg(value_name = "MODULE", required_unless_present = "all", conflicts_with = "all")]
    pub module: Option<String>,

    /// Clear every store.
    #[arg(long = "all")]
    pub all: bool,
}

/// CLI standard choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum StandardArg {
    Iec,
    Nbr,
    Ieee,
}

impl From<StandardArg> for StandardFamily {
    fn from(arg: StandardArg) -> Self {
        match arg {
            StandardArg::Iec => Self::Iec,
            StandardArg::Nbr => Self::Nbr,
            StandardArg::Ieee => Self::Ieee,
        }
    }
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
